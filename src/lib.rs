#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Streaming decoder for `multipart/*` entities.
//!
//! A [`Multipart`] splits an entity body into [`BodyPart`]s whose bodies are
//! read lazily, in wire order. [`FormData`] and [`ByteRanges`] add the
//! `form-data` and `byteranges` semantics on top, and every view can be
//! drained into memory under a time and size bound.

/// Fluent builder API.
pub mod builder;
/// `multipart/byteranges` view.
pub mod byte_ranges;
/// Decoder configuration.
pub mod config;
/// Error types exposed by this crate.
pub mod error;
/// `multipart/form-data` view.
pub mod form_data;
/// Resource limits.
pub mod limits;
/// High-level multipart stream type.
pub mod multipart;
/// Low-level parser components.
pub mod parser;
/// Body part API.
pub mod part;
/// Strict (fully buffered) views.
pub mod strict;

#[cfg(feature = "hyper")]
pub mod hyper;

use std::time::Duration;

use bytes::Bytes;
use futures::Stream;

pub use builder::ParserBuilder;
pub use byte_ranges::{ByteRanges, ByteRangesPart, StrictByteRanges, StrictByteRangesPart};
pub use config::ParserConfig;
pub use error::{ConfigError, MultipartError, ParseError};
pub use form_data::{FormData, FormDataPart, StrictFormData, StrictFormDataPart};
pub use limits::Limits;
pub use multipart::Multipart;
pub use parser::{
    extract_multipart_boundary, BodyStream, ContentDisposition, ContentRange, PartHeader,
    PartHeaders, RawHeader,
};
pub use part::{BodyPart, StrictBodyPart};
pub use strict::StrictMultipart;

/// Main `multiview` entry point: turns a `Content-Type` and an entity body into a multipart view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartParser {
    config: ParserConfig,
}

impl MultipartParser {
    /// Creates a parser with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with explicit validated configuration.
    pub fn with_config(config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates a fluent builder with default configuration.
    pub fn builder() -> ParserBuilder {
        ParserBuilder::default()
    }

    /// Returns an immutable reference to the active configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Decodes an entity with a `multipart/*` content type.
    pub fn parse<S>(&self, content_type: &str, stream: S) -> Result<Multipart, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        Multipart::from_content_type_with_config(content_type, stream, self.config.clone())
    }

    /// Decodes an entity as `multipart/form-data`.
    pub fn parse_form_data<S>(
        &self,
        content_type: &str,
        stream: S,
    ) -> Result<FormData, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        self.parse(content_type, stream).map(Multipart::into_form_data)
    }

    /// Decodes an entity as `multipart/byteranges`.
    pub fn parse_byte_ranges<S>(
        &self,
        content_type: &str,
        stream: S,
    ) -> Result<ByteRanges, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        self.parse(content_type, stream).map(Multipart::into_byte_ranges)
    }

    /// Decodes and fully buffers an entity within `timeout`.
    pub async fn parse_strict<S>(
        &self,
        content_type: &str,
        stream: S,
        timeout: Duration,
    ) -> Result<StrictMultipart, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        self.parse(content_type, stream)?.to_strict(timeout).await
    }
}
