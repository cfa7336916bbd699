use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};

use crate::{
    byte_ranges::ByteRanges,
    config::ParserConfig,
    form_data::FormData,
    parser::{boundary, stream::MultipartStream},
    part::BodyPart,
    strict::{self, SizeBudget, StrictMultipart},
    MultipartError, ParseError,
};

/// Default content type of a part without a `Content-Type` header.
pub const DEFAULT_PART_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

/// Streamed `multipart/*` entity: a single-consumption sequence of [`BodyPart`]s.
#[derive(Debug)]
pub struct Multipart {
    media_type: mime::Mime,
    default_content_type: mime::Mime,
    config: ParserConfig,
    inner: MultipartStream,
}

impl Multipart {
    /// Creates a `multipart/mixed` stream from a known boundary and a chunk source.
    pub fn new<S>(boundary: impl Into<String>, stream: S) -> Result<Self, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        Self::with_config(boundary, stream, ParserConfig::default())
    }

    /// Creates a `multipart/mixed` stream with explicit configuration.
    pub fn with_config<S>(
        boundary: impl Into<String>,
        stream: S,
        config: ParserConfig,
    ) -> Result<Self, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        let boundary = boundary.into();
        boundary::validate_boundary(&boundary)?;
        let media_type = format!("multipart/mixed; boundary=\"{boundary}\"")
            .parse::<mime::Mime>()
            .map_err(|_| ParseError::new("invalid multipart boundary"))?;

        Self::from_parts(media_type, &boundary, stream, config)
    }

    /// Creates a stream from a `multipart/*` `Content-Type` value and the entity body.
    pub fn from_content_type<S>(content_type: &str, stream: S) -> Result<Self, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        Self::from_content_type_with_config(content_type, stream, ParserConfig::default())
    }

    /// Like [`Multipart::from_content_type`] with explicit configuration.
    pub fn from_content_type_with_config<S>(
        content_type: &str,
        stream: S,
        config: ParserConfig,
    ) -> Result<Self, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        let (media_type, boundary) = boundary::extract_multipart_boundary(content_type)?;
        Self::from_parts(media_type, &boundary, stream, config)
    }

    /// Creates a stream over an in-memory entity body.
    pub fn from_bytes(content_type: &str, body: impl Into<Bytes>) -> Result<Self, MultipartError> {
        let body = body.into();
        Self::from_content_type(content_type, stream::once(async move { Ok(body) }))
    }

    pub(crate) fn from_parts<S>(
        media_type: mime::Mime,
        boundary: &str,
        stream: S,
        config: ParserConfig,
    ) -> Result<Self, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        config.validate()?;
        let default_content_type = DEFAULT_PART_CONTENT_TYPE
            .parse::<mime::Mime>()
            .map_err(|_| ParseError::new("invalid default part Content-Type"))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            media_type = %media_type,
            boundary,
            "multipart: decoding entity"
        );

        Ok(Self {
            inner: MultipartStream::new(boundary, stream, config.limits.clone())?,
            media_type,
            default_content_type,
            config,
        })
    }

    /// Returns the entity media type, including its boundary parameter.
    pub fn media_type(&self) -> &mime::Mime {
        &self.media_type
    }

    /// Returns the content type given to parts without a `Content-Type` header.
    pub fn default_content_type(&self) -> &mime::Mime {
        &self.default_content_type
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub(crate) fn set_default_content_type(&mut self, content_type: mime::Mime) {
        self.default_content_type = content_type;
    }

    /// Reads the next part, skipping whatever the previous body left unread.
    pub async fn next_part(&mut self) -> Result<Option<BodyPart>, MultipartError> {
        self.next().await.transpose()
    }

    /// Drains the entity into memory within `timeout`.
    ///
    /// Bodies count against [`Limits::max_strict_size`](crate::Limits::max_strict_size).
    pub async fn to_strict(mut self, timeout: Duration) -> Result<StrictMultipart, MultipartError> {
        let media_type = self.media_type.clone();
        let mut budget = SizeBudget::new(self.config.limits.max_strict_size);

        strict::within(timeout, async move {
            let mut parts = Vec::new();
            while let Some(part) = self.next_part().await? {
                parts.push(part.into_strict(&mut budget).await?);
            }
            Ok(StrictMultipart::new(media_type, parts))
        })
        .await
    }

    /// Views the entity as `multipart/form-data`.
    pub fn into_form_data(self) -> FormData {
        FormData::new(self)
    }

    /// Views the entity as `multipart/byteranges`.
    pub fn into_byte_ranges(self) -> ByteRanges {
        ByteRanges::new(self)
    }
}

impl Stream for Multipart {
    type Item = Result<BodyPart, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(parsed))) => Poll::Ready(Some(Ok(BodyPart::from_parsed(
                parsed,
                &self.default_content_type,
            )))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
