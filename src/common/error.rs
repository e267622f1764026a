use thiserror::Error;

/// Why a raw date/time fragment could not be normalized.
///
/// Malformed input is routine with dozens of uncontrolled sources, so every
/// failure is a value the caller can match on and skip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty date text")]
    EmptyInput,

    #[error("Unrecognized date format: '{text}'")]
    UnrecognizedFormat { text: String },

    #[error("Ambiguous timezone{}", describe_token(.token))]
    AmbiguousTimezone { token: Option<String> },

    #[error("Invalid range: end {end} precedes start {start}")]
    InvalidRange { start: String, end: String },

    #[error("Year {year} is out of bounds")]
    YearOutOfBounds { year: i32 },

    #[error("Invalid time of day: '{text}'")]
    InvalidTime { text: String },
}

fn describe_token(token: &Option<String>) -> String {
    token.as_ref().map(|t| format!(": '{t}'")).unwrap_or_default()
}

impl ParseError {
    /// Stable label used in logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::EmptyInput => "empty_input",
            ParseError::UnrecognizedFormat { .. } => "unrecognized_format",
            ParseError::AmbiguousTimezone { .. } => "ambiguous_timezone",
            ParseError::InvalidRange { .. } => "invalid_range",
            ParseError::YearOutOfBounds { .. } => "year_out_of_bounds",
            ParseError::InvalidTime { .. } => "invalid_time",
        }
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error reading feed '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source error: {message}")]
    Source { message: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_timezone_message() {
        let err = ParseError::AmbiguousTimezone { token: Some("XYZ".into()) };
        assert_eq!(err.to_string(), "Ambiguous timezone: 'XYZ'");

        let err = ParseError::AmbiguousTimezone { token: None };
        assert_eq!(err.to_string(), "Ambiguous timezone");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ParseError::EmptyInput.kind(), "empty_input");
        assert_eq!(ParseError::YearOutOfBounds { year: 26 }.kind(), "year_out_of_bounds");
    }
}
