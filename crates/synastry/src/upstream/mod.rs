//! Outbound calls to the astrology API and everything layered on them.

pub mod cache;
pub mod client;
pub mod failure;
pub mod geo;
pub mod search;
pub mod transport;

pub use client::{Endpoint, RetrievalError, SynastryClient, CARDS_PATH, SYNASTRY_PATH};
pub use failure::{FailureAction, FailureKind, FailureView};
pub use geo::{City, GEO_SEARCH_PATH};
pub use search::{CityLookup, CitySearchSession, SearchOutcome};
pub use transport::{HttpTransport, TransportError, TransportResponse, UpstreamTransport};
