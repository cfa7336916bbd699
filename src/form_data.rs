use std::{
    pin::Pin,
    task::{ready, Context, Poll},
    time::Duration,
};

use futures::{Stream, StreamExt};
use pin_project::pin_project;

use crate::{
    multipart::Multipart,
    parser::headers::ContentDisposition,
    part::{BodyPart, StrictBodyPart},
    strict::{self, SizeBudget},
    MultipartError, ParseError,
};

/// `multipart/form-data` view over a [`Multipart`] entity.
///
/// Parts without an explicit `Content-Type` default to `application/octet-stream`.
#[pin_project]
#[derive(Debug)]
pub struct FormData {
    #[pin]
    inner: Multipart,
    require_name: bool,
    failed: bool,
}

impl FormData {
    pub(crate) fn new(mut inner: Multipart) -> Self {
        inner.set_default_content_type(mime::APPLICATION_OCTET_STREAM);
        let require_name = inner.config().require_form_data_name;
        Self {
            inner,
            require_name,
            failed: false,
        }
    }

    /// Returns the entity media type.
    pub fn media_type(&self) -> &mime::Mime {
        self.inner.media_type()
    }

    /// Reads the next form-data part.
    pub async fn next_part(&mut self) -> Result<Option<FormDataPart>, MultipartError> {
        self.next().await.transpose()
    }

    /// Drains every field into memory within `timeout`.
    pub async fn to_strict(mut self, timeout: Duration) -> Result<StrictFormData, MultipartError> {
        let mut budget = SizeBudget::new(self.inner.config().limits.max_strict_size);

        strict::within(timeout, async move {
            let mut parts = Vec::new();
            while let Some(field) = self.next_part().await? {
                let FormDataPart {
                    name,
                    filename,
                    part,
                } = field;
                parts.push(StrictFormDataPart {
                    name,
                    filename,
                    part: part.into_strict(&mut budget).await?,
                });
            }
            Ok(StrictFormData { parts })
        })
        .await
    }
}

impl Stream for FormData {
    type Item = Result<FormDataPart, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.failed {
            return Poll::Ready(None);
        }

        let require_name = *this.require_name;
        let item = ready!(this.inner.poll_next(cx))
            .map(|result| result.and_then(|part| FormDataPart::new(part, require_name)));
        if matches!(item, Some(Err(_))) {
            *this.failed = true;
        }
        Poll::Ready(item)
    }
}

/// One form-data field.
#[derive(Debug)]
pub struct FormDataPart {
    name: Option<String>,
    filename: Option<String>,
    part: BodyPart,
}

impl FormDataPart {
    fn new(part: BodyPart, require_name: bool) -> Result<Self, MultipartError> {
        let (name, filename) = disposition_names(part.content_disposition());

        if require_name && name.as_deref().map_or(true, str::is_empty) {
            return Err(ParseError::new(
                "form-data Content-Disposition must include non-empty `name`",
            )
            .into());
        }

        Ok(Self {
            name,
            filename,
            part,
        })
    }

    /// Returns the field name from the `form-data` disposition.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the optional file name from the `form-data` disposition.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the underlying body part.
    pub fn part(&self) -> &BodyPart {
        &self.part
    }

    /// Returns the underlying body part mutably, for reading its body.
    pub fn part_mut(&mut self) -> &mut BodyPart {
        &mut self.part
    }

    /// Consumes the field and returns the underlying body part.
    pub fn into_part(self) -> BodyPart {
        self.part
    }
}

fn disposition_names(disposition: Option<&ContentDisposition>) -> (Option<String>, Option<String>) {
    match disposition {
        Some(disposition) if disposition.is_form_data() => {
            (disposition.name.clone(), disposition.filename.clone())
        }
        _ => (None, None),
    }
}

/// Fully buffered form-data field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictFormDataPart {
    name: Option<String>,
    filename: Option<String>,
    part: StrictBodyPart,
}

impl StrictFormDataPart {
    /// Returns the field name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the optional file name.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the buffered part.
    pub fn part(&self) -> &StrictBodyPart {
        &self.part
    }
}

/// Fully buffered `multipart/form-data` entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StrictFormData {
    parts: Vec<StrictFormDataPart>,
}

impl StrictFormData {
    /// Returns the fields in wire order.
    pub fn parts(&self) -> &[StrictFormDataPart] {
        &self.parts
    }

    /// First field with the given name.
    pub fn get(&self, name: &str) -> Option<&StrictFormDataPart> {
        self.parts.iter().find(|part| part.name() == Some(name))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` when the entity carried no fields.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
