use crate::{config::ParserConfig, error::ConfigError, limits::Limits, MultipartParser};

/// Builder for configuring a [`MultipartParser`].
#[derive(Debug, Clone, Default)]
pub struct ParserBuilder {
    config: ParserConfig,
}

impl ParserBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current builder configuration snapshot.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Replaces the full builder configuration.
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets all resource limits at once.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Sets the per-part header line limit.
    pub fn max_header_count(mut self, max_header_count: usize) -> Self {
        self.config.limits.max_header_count = Some(max_header_count);
        self
    }

    /// Sets the per-part header block size limit in bytes.
    pub fn max_header_size(mut self, max_header_size: usize) -> Self {
        self.config.limits.max_header_size = Some(max_header_size);
        self
    }

    /// Sets the maximum number of parts per entity.
    pub fn max_parts(mut self, max_parts: usize) -> Self {
        self.config.limits.max_parts = Some(max_parts);
        self
    }

    /// Sets the byte ceiling used when strictifying an entity.
    pub fn max_strict_size(mut self, max_strict_size: u64) -> Self {
        self.config.limits.max_strict_size = Some(max_strict_size);
        self
    }

    /// Toggles rejection of form-data parts that carry no `name`.
    pub fn require_form_data_name(mut self, require: bool) -> Self {
        self.config.require_form_data_name = require;
        self
    }

    /// Validates builder configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    /// Finalizes and returns validated configuration.
    pub fn build_config(self) -> Result<ParserConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalizes the builder into a parser.
    pub fn build(self) -> Result<MultipartParser, ConfigError> {
        MultipartParser::with_config(self.build_config()?)
    }
}
