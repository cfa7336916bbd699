use std::{
    fmt,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{ready, Context, Poll},
};

use bytes::{Bytes, BytesMut};
use futures::Stream;

use crate::{
    limits::Limits,
    parser::{
        headers::{parse_header_block, HeaderBlock, PartHeaders},
        scanner::{BoundaryScanner, ScanEvent},
    },
    MultipartError, ParseError,
};

/// Boxed entity byte source consumed by the decoder.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, MultipartError>> + Send + 'static>>;

/// Parsed part head produced by [`MultipartStream`], with its still-unread body.
#[derive(Debug)]
pub struct ParsedPart {
    /// Parsed part headers.
    pub headers: PartHeaders,
    /// Lazy part body.
    pub body: BodyStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Boundary,
    Headers,
    Body,
    End,
    Failed,
}

struct Decoder {
    source: Option<ByteStream>,
    scanner: BoundaryScanner,
    limits: Limits,
    stage: Stage,
    head: BytesMut,
    leftover: Option<Bytes>,
    part_index: usize,
    failure: Option<MultipartError>,
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("source", &self.source.as_ref().map(|_| "<stream>"))
            .field("scanner", &self.scanner)
            .field("stage", &self.stage)
            .field("part_index", &self.part_index)
            .finish()
    }
}

impl Decoder {
    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Result<ScanEvent, MultipartError>> {
        loop {
            let eof = self.source.is_none();
            if let Some(event) = self.scanner.next_event(eof)? {
                return Poll::Ready(Ok(event));
            }

            let Some(source) = self.source.as_mut() else {
                return Poll::Ready(Err(MultipartError::IncompleteStream));
            };

            match source.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => self.scanner.feed(&chunk),
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Err(err)),
                Poll::Ready(None) => self.source = None,
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    fn poll_next_part(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<(PartHeaders, usize), MultipartError>>> {
        loop {
            match self.stage {
                Stage::End => return Poll::Ready(None),
                Stage::Failed => return Poll::Ready(self.failure.take().map(Err)),
                Stage::Body => {
                    // The previous body was dropped or only partly read; skip the rest.
                    self.leftover = None;
                    match ready!(self.poll_event(cx)) {
                        Ok(ScanEvent::Data(_)) => {}
                        Ok(ScanEvent::PartEnd) => self.stage = Stage::Boundary,
                        Ok(event) => return Poll::Ready(Some(Err(self.fail(unexpected(&event))))),
                        Err(err) => return Poll::Ready(Some(Err(self.fail(err)))),
                    }
                }
                Stage::Boundary => match ready!(self.poll_event(cx)) {
                    Ok(ScanEvent::PartStart) => {
                        if let Some(max_parts) = self.limits.max_parts {
                            if self.part_index == max_parts {
                                let err = MultipartError::PartsLimitExceeded { max_parts };
                                return Poll::Ready(Some(Err(self.fail(err))));
                            }
                        }
                        self.part_index += 1;
                        self.head.clear();
                        self.leftover = None;
                        self.stage = Stage::Headers;
                    }
                    Ok(ScanEvent::End) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(parts = self.part_index, "multipart: close delimiter reached");
                        self.stage = Stage::End;
                        self.source = None;
                        return Poll::Ready(None);
                    }
                    Ok(event) => return Poll::Ready(Some(Err(self.fail(unexpected(&event))))),
                    Err(err) => return Poll::Ready(Some(Err(self.fail(err)))),
                },
                Stage::Headers => {
                    let segment_complete = match ready!(self.poll_event(cx)) {
                        Ok(ScanEvent::Data(chunk)) => {
                            self.head.extend_from_slice(&chunk);
                            false
                        }
                        Ok(ScanEvent::PartEnd) => true,
                        Ok(event) => return Poll::Ready(Some(Err(self.fail(unexpected(&event))))),
                        Err(err) => return Poll::Ready(Some(Err(self.fail(err)))),
                    };

                    match parse_header_block(&self.head, segment_complete, &self.limits) {
                        Ok(HeaderBlock::Incomplete) => {}
                        Ok(HeaderBlock::Complete {
                            headers,
                            body_offset,
                        }) => {
                            let body = self.head.split_off(body_offset).freeze();
                            self.head.clear();
                            self.leftover = (!body.is_empty()).then_some(body);
                            self.stage = if segment_complete {
                                Stage::Boundary
                            } else {
                                Stage::Body
                            };

                            #[cfg(feature = "tracing")]
                            tracing::trace!(
                                part = self.part_index,
                                headers = headers.len(),
                                "multipart: part headers parsed"
                            );

                            return Poll::Ready(Some(Ok((headers, self.part_index))));
                        }
                        Err(err) => return Poll::Ready(Some(Err(self.fail(err)))),
                    }
                }
            }
        }
    }

    fn poll_body(
        &mut self,
        index: usize,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, MultipartError>>> {
        if index != self.part_index {
            return Poll::Ready(None);
        }

        if let Some(chunk) = self.leftover.take() {
            return Poll::Ready(Some(Ok(chunk)));
        }

        if self.stage != Stage::Body {
            return Poll::Ready(None);
        }

        match ready!(self.poll_event(cx)) {
            Ok(ScanEvent::Data(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Ok(ScanEvent::PartEnd) => {
                self.stage = Stage::Boundary;
                Poll::Ready(None)
            }
            Ok(event) => {
                let err = self.fail(unexpected(&event));
                self.failure = Some(err.clone());
                Poll::Ready(Some(Err(err)))
            }
            Err(err) => {
                let err = self.fail(err);
                self.failure = Some(err.clone());
                Poll::Ready(Some(Err(err)))
            }
        }
    }

    fn fail(&mut self, err: MultipartError) -> MultipartError {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            part = self.part_index,
            error = %err,
            "multipart: aborting part sequence"
        );

        self.stage = Stage::Failed;
        self.source = None;
        self.head.clear();
        self.leftover = None;
        err
    }
}

fn unexpected(event: &ScanEvent) -> MultipartError {
    ParseError::new(format!("unexpected multipart scanner event {event:?}")).into()
}

fn lock(shared: &Mutex<Decoder>) -> MutexGuard<'_, Decoder> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Incremental multipart decoder over a chunked byte stream.
///
/// Yields one [`ParsedPart`] per boundary-delimited segment. A part's body is
/// read lazily through the shared decoder; pulling the next part skips
/// whatever the previous body left unread.
#[derive(Debug)]
pub struct MultipartStream {
    shared: Arc<Mutex<Decoder>>,
}

impl MultipartStream {
    /// Creates a new streaming parser for a known multipart boundary.
    pub fn new<S>(boundary: &str, stream: S, limits: Limits) -> Result<Self, ParseError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
    {
        let decoder = Decoder {
            source: Some(Box::pin(stream)),
            scanner: BoundaryScanner::new(boundary)?,
            limits,
            stage: Stage::Boundary,
            head: BytesMut::new(),
            leftover: None,
            part_index: 0,
            failure: None,
        };

        Ok(Self {
            shared: Arc::new(Mutex::new(decoder)),
        })
    }
}

impl Stream for MultipartStream {
    type Item = Result<ParsedPart, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = lock(&self.shared).poll_next_part(cx);
        polled.map(|item| {
            item.map(|result| {
                result.map(|(headers, index)| ParsedPart {
                    headers,
                    body: BodyStream {
                        shared: Some(Arc::clone(&self.shared)),
                        index,
                    },
                })
            })
        })
    }
}

/// Lazy, single-consumption body of one part.
///
/// Ends when the delimiter closing the part is reached. Once the owning
/// sequence moves on to a later part, the stream yields nothing more.
#[derive(Debug)]
pub struct BodyStream {
    shared: Option<Arc<Mutex<Decoder>>>,
    index: usize,
}

impl Stream for BodyStream {
    type Item = Result<Bytes, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let index = self.index;
        let Some(shared) = self.shared.as_ref() else {
            return Poll::Ready(None);
        };

        let polled = lock(shared).poll_body(index, cx);
        if let Poll::Ready(None) = polled {
            self.shared = None;
        }
        polled
    }
}
