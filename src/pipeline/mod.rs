// Aggregation pipeline: fetch, normalize, filter and merge listings

pub mod aggregator;

pub use aggregator::{AggregateReport, Aggregator, SourceReport, SourceStatus};
