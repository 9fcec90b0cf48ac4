//! Error taxonomy for the fetch/resolve/normalize path.
//!
//! None of these variants is fatal: the aggregator maps every failure to
//! "serve the previous cached document, or nothing". Unresolved station and
//! line references are not errors at all; they are dropped at the resolver
//! with a debug log. A single malformed feed entry is skipped inside its
//! adapter and never surfaces here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-2xx response, connection failure, or timeout from an upstream
    /// feed. Timeouts are deliberately indistinguishable from bad statuses.
    #[error("upstream unavailable ({source_name}): {message}")]
    Upstream {
        source_name: &'static str,
        message: String,
    },

    /// The upstream responded but the payload could not be decoded
    /// (invalid protobuf, unparseable JSON document, empty scrape).
    #[error("decode failure ({source_name}): {message}")]
    Decode {
        source_name: &'static str,
        message: String,
    },

    /// No API key / feed URL / station data configured for a system.
    /// That system serves `None`; other systems are unaffected.
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),
}

impl FetchError {
    pub fn upstream(source_name: &'static str, message: impl Into<String>) -> Self {
        FetchError::Upstream {
            source_name,
            message: message.into(),
        }
    }

    pub fn decode(source_name: &'static str, message: impl Into<String>) -> Self {
        FetchError::Decode {
            source_name,
            message: message.into(),
        }
    }
}
