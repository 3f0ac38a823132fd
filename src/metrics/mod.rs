//! Outcome aggregation and the streaming latency histogram.
mod aggregator;
mod histogram;
mod types;


pub use aggregator::{Aggregator, setup_aggregator};
pub use histogram::{Bin, StreamingHistogram};
pub use types::{LatencySummary, Outcome, Report};
