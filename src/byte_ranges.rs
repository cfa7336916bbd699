use std::{
    pin::Pin,
    task::{ready, Context, Poll},
    time::Duration,
};

use futures::{Stream, StreamExt};
use pin_project::pin_project;

use crate::{
    multipart::Multipart,
    parser::range::ContentRange,
    part::{BodyPart, StrictBodyPart},
    strict::{self, SizeBudget},
    MultipartError, ParseError,
};

/// `multipart/byteranges` view over a [`Multipart`] entity.
///
/// Every part must carry a valid `Content-Range` header.
#[pin_project]
#[derive(Debug)]
pub struct ByteRanges {
    #[pin]
    inner: Multipart,
    failed: bool,
}

impl ByteRanges {
    pub(crate) fn new(inner: Multipart) -> Self {
        Self {
            inner,
            failed: false,
        }
    }

    /// Returns the entity media type.
    pub fn media_type(&self) -> &mime::Mime {
        self.inner.media_type()
    }

    /// Reads the next range part.
    pub async fn next_part(&mut self) -> Result<Option<ByteRangesPart>, MultipartError> {
        self.next().await.transpose()
    }

    /// Drains every range into memory within `timeout`.
    pub async fn to_strict(mut self, timeout: Duration) -> Result<StrictByteRanges, MultipartError> {
        let mut budget = SizeBudget::new(self.inner.config().limits.max_strict_size);

        strict::within(timeout, async move {
            let mut parts = Vec::new();
            while let Some(range) = self.next_part().await? {
                let ByteRangesPart {
                    content_range,
                    part,
                } = range;
                parts.push(StrictByteRangesPart {
                    content_range,
                    part: part.into_strict(&mut budget).await?,
                });
            }
            Ok(StrictByteRanges { parts })
        })
        .await
    }
}

impl Stream for ByteRanges {
    type Item = Result<ByteRangesPart, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.failed {
            return Poll::Ready(None);
        }

        let item =
            ready!(this.inner.poll_next(cx)).map(|result| result.and_then(ByteRangesPart::new));
        if matches!(item, Some(Err(_))) {
            *this.failed = true;
        }
        Poll::Ready(item)
    }
}

/// One part of a `multipart/byteranges` entity.
#[derive(Debug)]
pub struct ByteRangesPart {
    content_range: ContentRange,
    part: BodyPart,
}

impl ByteRangesPart {
    fn new(part: BodyPart) -> Result<Self, MultipartError> {
        if let Some(content_range) = part.headers().content_range().copied() {
            return Ok(Self {
                content_range,
                part,
            });
        }

        let err = match part.headers().get("content-range") {
            Some(raw) => ParseError::new(format!(
                "invalid Content-Range header `{}` in multipart/byteranges part",
                raw.value()
            )),
            None => ParseError::new("multipart/byteranges part must contain a Content-Range header"),
        };
        Err(err.into())
    }

    /// Returns the decoded `Content-Range`.
    pub fn content_range(&self) -> &ContentRange {
        &self.content_range
    }

    /// Returns the underlying body part.
    pub fn part(&self) -> &BodyPart {
        &self.part
    }

    /// Returns the underlying body part mutably, for reading its body.
    pub fn part_mut(&mut self) -> &mut BodyPart {
        &mut self.part
    }

    /// Consumes the range and returns the underlying body part.
    pub fn into_part(self) -> BodyPart {
        self.part
    }
}

/// Fully buffered byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictByteRangesPart {
    content_range: ContentRange,
    part: StrictBodyPart,
}

impl StrictByteRangesPart {
    /// Returns the decoded `Content-Range`.
    pub fn content_range(&self) -> &ContentRange {
        &self.content_range
    }

    /// Returns the buffered part.
    pub fn part(&self) -> &StrictBodyPart {
        &self.part
    }
}

/// Fully buffered `multipart/byteranges` entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StrictByteRanges {
    parts: Vec<StrictByteRangesPart>,
}

impl StrictByteRanges {
    /// Returns the ranges in wire order.
    pub fn parts(&self) -> &[StrictByteRangesPart] {
        &self.parts
    }

    /// Number of ranges.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` when the entity carried no ranges.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
