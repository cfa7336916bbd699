use crate::{error::ConfigError, limits::Limits};

/// Top-level decoder configuration model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParserConfig {
    /// Resource limits.
    pub limits: Limits,
    /// Reject form-data parts without a non-empty `name` disposition parameter.
    ///
    /// Off by default: unnamed parts are passed through with `name() == None`.
    pub require_form_data_name: bool,
}

impl ParserConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()
    }
}
