pub mod config;
pub mod error;
pub mod normalize;
pub mod report;
pub mod request;
pub mod share;
pub mod telemetry;
pub mod upstream;
