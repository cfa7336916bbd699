//! Draining of streamed multipart entities into memory.

use std::{future::Future, time::Duration};

use crate::{part::StrictBodyPart, MultipartError};

/// Byte ceiling shared by every part drained in one strictification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SizeBudget {
    max_strict_size: Option<u64>,
    used: u64,
}

impl SizeBudget {
    pub(crate) fn new(max_strict_size: Option<u64>) -> Self {
        Self {
            max_strict_size,
            used: 0,
        }
    }

    pub(crate) fn charge(&mut self, bytes: usize) -> Result<(), MultipartError> {
        self.used = self.used.saturating_add(bytes as u64);
        match self.max_strict_size {
            Some(max_strict_size) if self.used > max_strict_size => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    max_strict_size,
                    used = self.used,
                    "strict: size ceiling exceeded"
                );
                Err(MultipartError::StrictSizeExceeded { max_strict_size })
            }
            _ => Ok(()),
        }
    }
}

/// Runs a drain future under a time bound.
pub(crate) async fn within<T, F>(timeout: Duration, drain: F) -> Result<T, MultipartError>
where
    F: Future<Output = Result<T, MultipartError>>,
{
    match tokio::time::timeout(timeout, drain).await {
        Ok(result) => result,
        Err(_) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(?timeout, "strict: drain timed out");
            Err(MultipartError::StrictTimeout { timeout })
        }
    }
}

/// Fully buffered general multipart entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictMultipart {
    media_type: mime::Mime,
    parts: Vec<StrictBodyPart>,
}

impl StrictMultipart {
    /// Creates a strict entity from its media type and parts.
    pub fn new(media_type: mime::Mime, parts: Vec<StrictBodyPart>) -> Self {
        Self { media_type, parts }
    }

    /// Returns the entity media type, including its boundary parameter.
    pub fn media_type(&self) -> &mime::Mime {
        &self.media_type
    }

    /// Returns the parts in wire order.
    pub fn parts(&self) -> &[StrictBodyPart] {
        &self.parts
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` when the entity carried no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Consumes the entity and returns its parts.
    pub fn into_parts(self) -> Vec<StrictBodyPart> {
        self.parts
    }
}
