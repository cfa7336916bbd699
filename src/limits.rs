use crate::error::ConfigError;

/// Default per-part header line limit.
pub const DEFAULT_MAX_HEADER_COUNT: usize = 64;
/// Default per-part header block size limit in bytes.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

/// Resource limits enforced while decoding a multipart entity.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of header lines in one part.
    pub max_header_count: Option<usize>,
    /// Maximum size in bytes of one part's header block before its blank line.
    pub max_header_size: Option<usize>,
    /// Maximum number of parts in one entity.
    pub max_parts: Option<usize>,
    /// Maximum total body bytes held in memory when strictifying.
    pub max_strict_size: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_count: Some(DEFAULT_MAX_HEADER_COUNT),
            max_header_size: Some(DEFAULT_MAX_HEADER_SIZE),
            max_parts: None,
            max_strict_size: None,
        }
    }
}

impl Limits {
    /// Creates the default limits configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with every limit disabled.
    pub fn unbounded() -> Self {
        Self {
            max_header_count: None,
            max_header_size: None,
            max_parts: None,
            max_strict_size: None,
        }
    }

    /// Validates that every configured limit is greater than zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_header_count == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_header_count",
            });
        }
        if self.max_header_size == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_header_size",
            });
        }
        if self.max_parts == Some(0) {
            return Err(ConfigError::InvalidLimitValue { limit: "max_parts" });
        }
        if self.max_strict_size == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_strict_size",
            });
        }

        Ok(())
    }
}
