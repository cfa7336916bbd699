use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem::Finder;

use crate::{MultipartError, ParseError};

/// Message reported when a delimiter line is followed by unexpected bytes.
pub const ILLEGAL_BOUNDARY: &str = "Illegal multipart boundary in message content";

/// Event produced by [`BoundaryScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A delimiter line was consumed and a new segment begins.
    PartStart,
    /// Raw bytes of the current segment.
    Data(Bytes),
    /// The current segment ended at a delimiter line.
    PartEnd,
    /// The close delimiter was consumed, or the entity was empty.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Preamble,
    SegmentStart,
    Segment,
    Delimited { last: bool },
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelimiterTail {
    Pending,
    Next(usize),
    Close(usize),
    Illegal,
}

/// Incremental splitter of a multipart entity into boundary-delimited segments.
///
/// Input is pushed with [`feed`](Self::feed) and events are pulled with
/// [`next_event`](Self::next_event). Only the unresolved suffix that could still
/// start a delimiter is held back between calls.
#[derive(Debug, Clone)]
pub struct BoundaryScanner {
    finder: Finder<'static>,
    buffer: BytesMut,
    state: ScanState,
    received_input: bool,
}

impl BoundaryScanner {
    /// Creates a scanner for the given boundary token.
    pub fn new(boundary: &str) -> Result<Self, ParseError> {
        if boundary.is_empty() {
            return Err(ParseError::new("multipart boundary cannot be empty"));
        }

        if boundary.contains('\r') || boundary.contains('\n') {
            return Err(ParseError::new("multipart boundary cannot contain CRLF"));
        }

        let needle = format!("\r\n--{boundary}");

        // The entity start counts as a line start for the first delimiter.
        let mut buffer = BytesMut::with_capacity(needle.len() * 2);
        buffer.extend_from_slice(b"\r\n");

        Ok(Self {
            finder: Finder::new(needle.as_bytes()).into_owned(),
            buffer,
            state: ScanState::Preamble,
            received_input: false,
        })
    }

    /// Appends a chunk of entity bytes.
    pub fn feed(&mut self, chunk: &[u8]) {
        if chunk.is_empty() || matches!(self.state, ScanState::Done | ScanState::Failed) {
            return;
        }

        self.received_input = true;
        self.buffer.extend_from_slice(chunk);
    }

    /// Returns the number of bytes currently held back.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` once the close delimiter was consumed.
    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }

    /// Pulls the next event out of the buffered input.
    ///
    /// `Ok(None)` means more input is required. With `eof` set the scanner never
    /// asks for more input: it either produces an event or fails.
    pub fn next_event(&mut self, eof: bool) -> Result<Option<ScanEvent>, MultipartError> {
        loop {
            match self.state {
                ScanState::Preamble => {
                    let needle_len = self.finder.needle().len();
                    let Some(at) = self.finder.find(&self.buffer) else {
                        let keep = partial_needle_suffix(&self.buffer, self.finder.needle());
                        let discard = self.buffer.len() - keep;
                        self.buffer.advance(discard);

                        if !eof {
                            return Ok(None);
                        }
                        if self.received_input {
                            return self.fail(MultipartError::IncompleteStream);
                        }
                        self.finish();
                        return Ok(Some(ScanEvent::End));
                    };

                    match classify_tail(&self.buffer[at + needle_len..], eof) {
                        DelimiterTail::Pending => {
                            self.buffer.advance(at);
                            return self.pending(eof);
                        }
                        DelimiterTail::Illegal => {
                            // A preamble line that merely starts with the dash-boundary.
                            self.buffer.advance(at + 2);
                        }
                        DelimiterTail::Next(tail) => {
                            self.buffer.advance(at + needle_len + tail);
                            self.state = ScanState::SegmentStart;
                            return Ok(Some(ScanEvent::PartStart));
                        }
                        DelimiterTail::Close(_) => {
                            self.finish();
                            return Ok(Some(ScanEvent::End));
                        }
                    }
                }
                ScanState::SegmentStart => {
                    // The CRLF ending the previous delimiter line also opens this one.
                    let dash_boundary = &self.finder.needle()[2..];

                    if self.buffer.starts_with(dash_boundary) {
                        let dash_len = dash_boundary.len();
                        return match classify_tail(&self.buffer[dash_len..], eof) {
                            DelimiterTail::Pending => self.pending(eof),
                            DelimiterTail::Illegal => {
                                self.fail(ParseError::new(ILLEGAL_BOUNDARY).into())
                            }
                            DelimiterTail::Next(tail) => {
                                self.buffer.advance(dash_len + tail);
                                self.state = ScanState::Delimited { last: false };
                                Ok(Some(ScanEvent::PartEnd))
                            }
                            DelimiterTail::Close(tail) => {
                                self.buffer.advance(dash_len + tail);
                                self.state = ScanState::Delimited { last: true };
                                Ok(Some(ScanEvent::PartEnd))
                            }
                        };
                    }

                    if !eof
                        && self.buffer.len() < dash_boundary.len()
                        && dash_boundary.starts_with(&self.buffer)
                    {
                        return Ok(None);
                    }

                    self.state = ScanState::Segment;
                }
                ScanState::Segment => {
                    let needle_len = self.finder.needle().len();
                    match self.finder.find(&self.buffer) {
                        Some(0) => {
                            return match classify_tail(&self.buffer[needle_len..], eof) {
                                DelimiterTail::Pending => self.pending(eof),
                                DelimiterTail::Illegal => {
                                    self.fail(ParseError::new(ILLEGAL_BOUNDARY).into())
                                }
                                DelimiterTail::Next(tail) => {
                                    self.buffer.advance(needle_len + tail);
                                    self.state = ScanState::Delimited { last: false };
                                    Ok(Some(ScanEvent::PartEnd))
                                }
                                DelimiterTail::Close(tail) => {
                                    self.buffer.advance(needle_len + tail);
                                    self.state = ScanState::Delimited { last: true };
                                    Ok(Some(ScanEvent::PartEnd))
                                }
                            };
                        }
                        Some(at) => {
                            return Ok(Some(ScanEvent::Data(self.buffer.split_to(at).freeze())));
                        }
                        None => {
                            let keep = partial_needle_suffix(&self.buffer, self.finder.needle());
                            let emit = self.buffer.len() - keep;
                            if emit == 0 {
                                return self.pending(eof);
                            }
                            return Ok(Some(ScanEvent::Data(self.buffer.split_to(emit).freeze())));
                        }
                    }
                }
                ScanState::Delimited { last: true } => {
                    self.finish();
                    return Ok(Some(ScanEvent::End));
                }
                ScanState::Delimited { last: false } => {
                    self.state = ScanState::SegmentStart;
                    return Ok(Some(ScanEvent::PartStart));
                }
                ScanState::Done => return Ok(Some(ScanEvent::End)),
                ScanState::Failed => {
                    return Err(ParseError::new("multipart scanner already failed").into());
                }
            }
        }
    }

    fn pending(&mut self, eof: bool) -> Result<Option<ScanEvent>, MultipartError> {
        if eof {
            return self.fail(MultipartError::IncompleteStream);
        }
        Ok(None)
    }

    fn fail(&mut self, err: MultipartError) -> Result<Option<ScanEvent>, MultipartError> {
        self.state = ScanState::Failed;
        self.buffer.clear();
        Err(err)
    }

    fn finish(&mut self) {
        self.state = ScanState::Done;
        self.buffer.clear();
    }
}

/// Classifies the bytes following a `--boundary` token.
fn classify_tail(tail: &[u8], eof: bool) -> DelimiterTail {
    let (close, rest) = match tail {
        [b'-', b'-', rest @ ..] => (true, rest),
        [] | [b'-'] if !eof => return DelimiterTail::Pending,
        _ => (false, tail),
    };

    let padding = rest
        .iter()
        .take_while(|byte| matches!(byte, b' ' | b'\t'))
        .count();
    let consumed = if close { 2 + padding } else { padding };

    match &rest[padding..] {
        [b'\r', b'\n', ..] if close => DelimiterTail::Close(consumed + 2),
        [b'\r', b'\n', ..] => DelimiterTail::Next(consumed + 2),
        [] | [b'\r'] if close && eof => DelimiterTail::Close(tail.len()),
        [] | [b'\r'] => DelimiterTail::Pending,
        _ => DelimiterTail::Illegal,
    }
}

/// Length of the longest proper prefix of `needle` that `haystack` ends with.
fn partial_needle_suffix(haystack: &[u8], needle: &[u8]) -> usize {
    let max = needle.len().saturating_sub(1).min(haystack.len());
    (1..=max)
        .rev()
        .find(|&len| haystack.ends_with(&needle[..len]))
        .unwrap_or(0)
}
