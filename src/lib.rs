pub mod apis;
pub mod common;
pub mod config;
pub mod domain;
pub mod observability;
pub mod pipeline;
pub mod temporal;

pub use common::error::{ConfigError, ParseError, SourceError};
pub use temporal::{normalize, Confidence, NormalizedInstant, Normalizer, RawTemporalInput};
