use std::io;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::{
    parser::{
        headers::{ContentDisposition, PartHeaders},
        stream::{BodyStream, ParsedPart},
    },
    strict::SizeBudget,
    MultipartError, ParseError,
};

/// Streamed multipart body part.
#[derive(Debug)]
pub struct BodyPart {
    headers: PartHeaders,
    content_type: mime::Mime,
    body: Option<BodyStream>,
}

impl BodyPart {
    /// Creates a high-level part from a low-level parsed part.
    pub(crate) fn from_parsed(parsed: ParsedPart, default_content_type: &mime::Mime) -> Self {
        let content_type = parsed
            .headers
            .content_type()
            .cloned()
            .unwrap_or_else(|| default_content_type.clone());

        Self {
            headers: parsed.headers,
            content_type,
            body: Some(parsed.body),
        }
    }

    /// Returns parsed part headers.
    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }

    /// Returns the effective content type of the part.
    pub fn content_type(&self) -> &mime::Mime {
        &self.content_type
    }

    /// Returns the parsed `Content-Disposition`, if any.
    pub fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.headers.content_disposition()
    }

    /// Returns `true` once the body was handed out.
    pub fn is_consumed(&self) -> bool {
        self.body.is_none()
    }

    /// Reads the full part body as bytes.
    pub async fn bytes(&mut self) -> Result<Bytes, MultipartError> {
        let mut body = self.take_body()?;
        collect_body(&mut body, None).await
    }

    /// Reads the full part body and decodes it as UTF-8 text.
    pub async fn text(&mut self) -> Result<String, MultipartError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ParseError::new("part body is not valid UTF-8").into())
    }

    /// Returns the one-shot body stream for this part.
    pub fn stream(&mut self) -> Result<BodyStream, MultipartError> {
        self.take_body()
    }

    /// Returns the body as an [`AsyncRead`].
    pub fn into_async_read(mut self) -> Result<impl AsyncRead + Send + Unpin, MultipartError> {
        let body = self
            .take_body()?
            .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err)));
        Ok(StreamReader::new(body))
    }

    /// Drains the body into memory, charging `budget` for every byte.
    pub(crate) async fn into_strict(
        mut self,
        budget: &mut SizeBudget,
    ) -> Result<StrictBodyPart, MultipartError> {
        let mut body = self.take_body()?;
        let body = collect_body(&mut body, Some(budget)).await?;

        Ok(StrictBodyPart {
            headers: self.headers,
            content_type: self.content_type,
            body,
        })
    }

    fn take_body(&mut self) -> Result<BodyStream, MultipartError> {
        self.body
            .take()
            .ok_or_else(|| ParseError::new("part body was already consumed").into())
    }
}

async fn collect_body<S>(
    body: &mut S,
    mut budget: Option<&mut SizeBudget>,
) -> Result<Bytes, MultipartError>
where
    S: Stream<Item = Result<Bytes, MultipartError>> + Unpin,
{
    let mut buffer = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if let Some(budget) = budget.as_deref_mut() {
            budget.charge(chunk.len())?;
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

/// Fully buffered multipart body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictBodyPart {
    headers: PartHeaders,
    content_type: mime::Mime,
    body: Bytes,
}

impl StrictBodyPart {
    /// Creates a strict part from its components.
    pub fn new(headers: PartHeaders, content_type: mime::Mime, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            content_type,
            body: body.into(),
        }
    }

    /// Returns parsed part headers.
    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }

    /// Returns the effective content type of the part.
    pub fn content_type(&self) -> &mime::Mime {
        &self.content_type
    }

    /// Returns the parsed `Content-Disposition`, if any.
    pub fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.headers.content_disposition()
    }

    /// Returns the buffered body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decodes the body as UTF-8 text.
    pub fn text(&self) -> Result<&str, ParseError> {
        std::str::from_utf8(&self.body).map_err(|_| ParseError::new("part body is not valid UTF-8"))
    }

    /// Splits the part into headers, content type and body.
    pub fn into_parts(self) -> (PartHeaders, mime::Mime, Bytes) {
        (self.headers, self.content_type, self.body)
    }
}
