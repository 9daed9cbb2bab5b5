//! Debounced city search for one input field.
//!
//! Every keystroke takes a ticket from a generation counter. A keystroke whose
//! ticket is overtaken during the debounce never reaches upstream; one that is
//! overtaken while its lookup runs resolves as [`SearchOutcome::Stale`].

use super::client::{RetrievalError, SynastryClient};
use super::geo::City;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Shorter inputs clear the suggestions without a lookup.
pub const SEARCH_MIN_QUERY_CHARS: usize = 3;

#[async_trait]
pub trait CityLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<City>, RetrievalError>;
}

#[async_trait]
impl CityLookup for SynastryClient {
    async fn lookup(&self, query: &str) -> Result<Vec<City>, RetrievalError> {
        self.search_cities(query).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Suggestions for the latest input.
    Fresh(Vec<City>),
    /// A newer keystroke arrived during the debounce; nothing was fetched.
    Superseded,
    /// A newer keystroke arrived while fetching; the result must be dropped.
    Stale,
}

pub struct CitySearchSession {
    lookup: Arc<dyn CityLookup>,
    debounce: Duration,
    generation: AtomicU64,
}

impl CitySearchSession {
    pub fn new(lookup: Arc<dyn CityLookup>, debounce: Duration) -> Self {
        Self {
            lookup,
            debounce,
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation() == ticket
    }

    pub async fn keystroke(&self, query: &str) -> Result<SearchOutcome, RetrievalError> {
        let ticket = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tokio::time::sleep(self.debounce).await;

        if !self.is_current(ticket) {
            trace!(ticket, "keystroke superseded during debounce");
            return Ok(SearchOutcome::Superseded);
        }
        if query.chars().count() < SEARCH_MIN_QUERY_CHARS {
            return Ok(SearchOutcome::Fresh(Vec::new()));
        }

        let result = self.lookup.lookup(query).await;
        if !self.is_current(ticket) {
            trace!(ticket, "discarding stale city results");
            return Ok(SearchOutcome::Stale);
        }
        result.map(SearchOutcome::Fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLookup {
        delay: Duration,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CityLookup for RecordingLookup {
        async fn lookup(&self, query: &str) -> Result<Vec<City>, RetrievalError> {
            self.queries
                .lock()
                .expect("queries mutex")
                .push(query.to_string());
            tokio::time::sleep(self.delay).await;
            Ok(vec![City {
                name: query.to_string(),
                country: "FR".to_string(),
                lat: 0.0,
                lng: 0.0,
                timezone: None,
            }])
        }
    }

    fn session(lookup: Arc<RecordingLookup>) -> CitySearchSession {
        CitySearchSession::new(lookup, Duration::from_millis(400))
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_fetches_only_the_last_query() {
        let lookup = Arc::new(RecordingLookup::default());
        let session = session(lookup.clone());

        let (first, second) = tokio::join!(session.keystroke("Lon"), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            session.keystroke("Lond").await
        });

        assert_eq!(first.expect("first"), SearchOutcome::Superseded);
        match second.expect("second") {
            SearchOutcome::Fresh(cities) => assert_eq!(cities[0].name, "Lond"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(*lookup.queries.lock().expect("queries mutex"), vec!["Lond"]);
        assert_eq!(session.generation(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn results_overtaken_mid_flight_are_stale() {
        let lookup = Arc::new(RecordingLookup {
            delay: Duration::from_secs(1),
            ..RecordingLookup::default()
        });
        let session = session(lookup.clone());

        let (first, second) = tokio::join!(session.keystroke("Par"), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            session.keystroke("Pari").await
        });

        assert_eq!(first.expect("first"), SearchOutcome::Stale);
        assert!(matches!(second.expect("second"), SearchOutcome::Fresh(_)));
        assert_eq!(lookup.queries.lock().expect("queries mutex").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn short_queries_skip_the_lookup() {
        let lookup = Arc::new(RecordingLookup::default());
        let session = session(lookup.clone());

        let outcome = session.keystroke("Pa").await.expect("outcome");
        assert_eq!(outcome, SearchOutcome::Fresh(Vec::new()));
        assert!(lookup.queries.lock().expect("queries mutex").is_empty());
    }
}
