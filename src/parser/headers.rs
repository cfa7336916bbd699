use std::fmt;

use http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::{error::ParseError, limits::Limits, parser::range::ContentRange, MultipartError};

/// Message reported when a part repeats its `Content-Type` header.
pub const DUPLICATE_CONTENT_TYPE: &str =
    "multipart part must not contain more than one Content-Type header";

const CONTENT_TRANSFER_ENCODING: &str = "content-transfer-encoding";

/// Parsed `Content-Disposition` metadata for a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lower-cased (for example `form-data` or `attachment`).
    pub disposition: String,
    /// Parsed field name (`name` parameter).
    pub name: Option<String>,
    /// Parsed file name (`filename`/`filename*` parameter).
    pub filename: Option<String>,
    /// Remaining parameters in wire order, keys lower-cased.
    pub params: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Returns `true` for a `form-data` disposition.
    pub fn is_form_data(&self) -> bool {
        self.disposition == "form-data"
    }

    /// Looks up an additional parameter by case-insensitive key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disposition)?;
        if let Some(name) = &self.name {
            write!(f, "; name={}", Quoted(name))?;
        }
        if let Some(filename) = &self.filename {
            write!(f, "; filename={}", Quoted(filename))?;
        }
        for (key, value) in &self.params {
            write!(f, "; {key}={}", Quoted(value))?;
        }
        Ok(())
    }
}

struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for ch in self.0.chars() {
            if matches!(ch, '"' | '\\') {
                f.write_str("\\")?;
            }
            write!(f, "{ch}")?;
        }
        f.write_str("\"")
    }
}

/// Header line exactly as received, name case preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// Header name as sent on the wire.
    pub name: String,
    /// Trimmed header value.
    pub value: String,
}

impl RawHeader {
    /// Creates a raw header.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// One part header: a recognised, validated variant or the raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartHeader {
    /// `Content-Type`.
    ContentType(mime::Mime),
    /// `Content-Disposition`.
    ContentDisposition(ContentDisposition),
    /// `Content-Range`.
    ContentRange(ContentRange),
    /// `Content-Transfer-Encoding`, lower-cased.
    ContentTransferEncoding(String),
    /// `Content-Length`.
    ContentLength(u64),
    /// `Age`, in seconds.
    Age(u64),
    /// Any other header, or a recognised header whose value did not parse.
    Raw(RawHeader),
}

impl PartHeader {
    /// Returns the header name.
    pub fn name(&self) -> &str {
        match self {
            Self::ContentType(_) => "Content-Type",
            Self::ContentDisposition(_) => "Content-Disposition",
            Self::ContentRange(_) => "Content-Range",
            Self::ContentTransferEncoding(_) => "Content-Transfer-Encoding",
            Self::ContentLength(_) => "Content-Length",
            Self::Age(_) => "Age",
            Self::Raw(raw) => &raw.name,
        }
    }

    /// Renders the header value.
    pub fn value(&self) -> String {
        match self {
            Self::ContentType(mime) => mime.to_string(),
            Self::ContentDisposition(disposition) => disposition.to_string(),
            Self::ContentRange(range) => range.to_string(),
            Self::ContentTransferEncoding(encoding) => encoding.clone(),
            Self::ContentLength(length) => length.to_string(),
            Self::Age(age) => age.to_string(),
            Self::Raw(raw) => raw.value.clone(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }
}

/// Ordered header list of one multipart part.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartHeaders {
    entries: Vec<PartHeader>,
}

impl PartHeaders {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the part carried no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates headers in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, PartHeader> {
        self.entries.iter()
    }

    /// First header with the given name.
    pub fn get(&self, name: &str) -> Option<&PartHeader> {
        self.entries.iter().find(|entry| entry.is(name))
    }

    /// All headers with the given name, in wire order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PartHeader> + 'a {
        self.entries.iter().filter(move |entry| entry.is(name))
    }

    /// Explicit, valid `Content-Type`.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.entries.iter().find_map(|entry| match entry {
            PartHeader::ContentType(mime) => Some(mime),
            _ => None,
        })
    }

    /// Valid `Content-Disposition`.
    pub fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.entries.iter().find_map(|entry| match entry {
            PartHeader::ContentDisposition(disposition) => Some(disposition),
            _ => None,
        })
    }

    /// Valid `Content-Range`.
    pub fn content_range(&self) -> Option<&ContentRange> {
        self.entries.iter().find_map(|entry| match entry {
            PartHeader::ContentRange(range) => Some(range),
            _ => None,
        })
    }

    /// Valid `Content-Transfer-Encoding`.
    pub fn content_transfer_encoding(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            PartHeader::ContentTransferEncoding(encoding) => Some(encoding.as_str()),
            _ => None,
        })
    }

    /// Valid `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.entries.iter().find_map(|entry| match entry {
            PartHeader::ContentLength(length) => Some(*length),
            _ => None,
        })
    }

    /// Converts the list into an `http` header map.
    pub fn to_header_map(&self) -> Result<HeaderMap, ParseError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            let name = HeaderName::from_bytes(entry.name().as_bytes())
                .map_err(|_| ParseError::new("invalid part header name"))?;
            let value = HeaderValue::from_str(&entry.value())
                .map_err(|_| ParseError::new("invalid part header value"))?;
            map.append(name, value);
        }
        Ok(map)
    }

    fn push(&mut self, header: PartHeader) {
        self.entries.push(header);
    }
}

impl<'a> IntoIterator for &'a PartHeaders {
    type Item = &'a PartHeader;
    type IntoIter = std::slice::Iter<'a, PartHeader>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<PartHeader> for PartHeaders {
    fn from_iter<T: IntoIterator<Item = PartHeader>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Outcome of [`parse_header_block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderBlock {
    /// The blank line ending the header block has not arrived yet.
    Incomplete,
    /// Headers are parsed; the body starts at `body_offset` within the segment.
    Complete {
        /// Parsed headers.
        headers: PartHeaders,
        /// Offset of the first body byte.
        body_offset: usize,
    },
}

/// Parses the header block at the head of a segment.
///
/// `segment_complete` signals that the segment was already closed by a
/// delimiter; a header block without its blank line is then accepted with an
/// empty body.
pub fn parse_header_block(
    segment: &[u8],
    segment_complete: bool,
    limits: &Limits,
) -> Result<HeaderBlock, MultipartError> {
    if segment.starts_with(b"\r\n") {
        return Ok(HeaderBlock::Complete {
            headers: PartHeaders::new(),
            body_offset: 2,
        });
    }

    if let Some(end) = memchr::memmem::find(segment, b"\r\n\r\n") {
        check_header_size(end, limits)?;
        return Ok(HeaderBlock::Complete {
            headers: parse_header_lines(&segment[..end], limits)?,
            body_offset: end + 4,
        });
    }

    if segment_complete {
        let block = segment.strip_suffix(b"\r\n").unwrap_or(segment);
        check_header_size(block.len(), limits)?;
        return Ok(HeaderBlock::Complete {
            headers: parse_header_lines(block, limits)?,
            body_offset: segment.len(),
        });
    }

    check_header_size(segment.len(), limits)?;
    Ok(HeaderBlock::Incomplete)
}

fn check_header_size(size: usize, limits: &Limits) -> Result<(), MultipartError> {
    match limits.max_header_size {
        Some(max_header_size) if size > max_header_size => {
            Err(MultipartError::HeaderSizeLimitExceeded { max_header_size })
        }
        _ => Ok(()),
    }
}

fn parse_header_lines(block: &[u8], limits: &Limits) -> Result<PartHeaders, MultipartError> {
    let text =
        std::str::from_utf8(block).map_err(|_| ParseError::new("part headers must be UTF-8"))?;

    let mut lines: Vec<(HeaderName, RawHeader)> = Vec::new();
    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }

        if line.starts_with(|ch: char| ch == ' ' || ch == '\t') {
            let Some((_, previous)) = lines.last_mut() else {
                return Err(ParseError::new("part header block starts with a continuation line").into());
            };
            previous.value.push(' ');
            previous.value.push_str(line.trim());
            continue;
        }

        if let Some(max_header_count) = limits.max_header_count {
            if lines.len() == max_header_count {
                return Err(MultipartError::HeaderCountLimitExceeded { max_header_count });
            }
        }

        let Some((raw_name, raw_value)) = line.split_once(':') else {
            return Err(ParseError::new("invalid part header line").into());
        };

        let raw_name = raw_name.trim();
        let name = HeaderName::from_bytes(raw_name.as_bytes())
            .map_err(|_| ParseError::new("invalid part header name"))?;
        lines.push((name, RawHeader::new(raw_name, raw_value.trim())));
    }

    let mut headers = PartHeaders::new();
    let mut seen_content_type = false;
    for (name, raw) in lines {
        HeaderValue::from_str(&raw.value)
            .map_err(|_| ParseError::new("invalid part header value"))?;

        if name == header::CONTENT_TYPE {
            if seen_content_type {
                return Err(ParseError::new(DUPLICATE_CONTENT_TYPE).into());
            }
            seen_content_type = true;
        }

        headers.push(classify_header(&name, raw));
    }

    Ok(headers)
}

fn classify_header(name: &HeaderName, raw: RawHeader) -> PartHeader {
    let parsed = if *name == header::CONTENT_TYPE {
        raw.value
            .parse::<mime::Mime>()
            .map(PartHeader::ContentType)
            .map_err(|_| ParseError::new("invalid part Content-Type header"))
    } else if *name == header::CONTENT_DISPOSITION {
        parse_content_disposition(&raw.value).map(PartHeader::ContentDisposition)
    } else if *name == header::CONTENT_RANGE {
        raw.value.parse::<ContentRange>().map(PartHeader::ContentRange)
    } else if *name == header::CONTENT_LENGTH {
        parse_number(&raw.value).map(PartHeader::ContentLength)
    } else if *name == header::AGE {
        parse_number(&raw.value).map(PartHeader::Age)
    } else if name.as_str() == CONTENT_TRANSFER_ENCODING {
        parse_token(&raw.value).map(PartHeader::ContentTransferEncoding)
    } else {
        return PartHeader::Raw(raw);
    };

    match parsed {
        Ok(header) => header,
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                header = raw.name.as_str(),
                value = raw.value.as_str(),
                error = %_err,
                "multipart: keeping unparseable part header as raw"
            );
            PartHeader::Raw(raw)
        }
    }
}

fn parse_number(value: &str) -> Result<u64, ParseError> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ParseError::new("invalid numeric header value"));
    }
    value
        .parse()
        .map_err(|_| ParseError::new("numeric header value out of range"))
}

fn parse_token(value: &str) -> Result<String, ParseError> {
    if value.is_empty() || !value.bytes().all(is_token_byte) {
        return Err(ParseError::new("invalid header token"));
    }
    Ok(value.to_ascii_lowercase())
}

fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte)
}

/// Parses a multipart part `Content-Disposition` value.
pub fn parse_content_disposition(value: &str) -> Result<ContentDisposition, ParseError> {
    let mut segments = split_semicolon_aware(value).into_iter();
    let disposition = segments
        .next()
        .map(|segment| segment.trim().to_ascii_lowercase())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ParseError::new("invalid Content-Disposition header"))?;

    let mut name: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut filename_star: Option<String> = None;
    let mut params = Vec::new();

    for segment in segments {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = trimmed.split_once('=') else {
            return Err(ParseError::new(
                "invalid Content-Disposition parameter format",
            ));
        };

        let key = raw_key.trim().to_ascii_lowercase();
        let decoded = parse_parameter_value(raw_value.trim())?;

        match key.as_str() {
            "name" => name = Some(decoded),
            "filename" => filename = Some(parse_filename_value(&decoded)),
            "filename*" => filename_star = Some(parse_rfc5987_value(&decoded)?),
            _ => params.push((key, decoded)),
        }
    }

    Ok(ContentDisposition {
        disposition,
        name,
        filename: filename_star.or(filename),
        params,
    })
}

fn parse_parameter_value(raw: &str) -> Result<String, ParseError> {
    if let Some(stripped) = raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        return unescape_quoted_string(stripped);
    }

    if raw.contains('"') {
        return Err(ParseError::new("invalid quoted parameter value"));
    }

    Ok(raw.trim().to_owned())
}

fn unescape_quoted_string(value: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let escaped = chars
                .next()
                .ok_or_else(|| ParseError::new("dangling escape in quoted parameter"))?;
            out.push(escaped);
            continue;
        }
        out.push(ch);
    }

    Ok(out)
}

fn parse_rfc5987_value(value: &str) -> Result<String, ParseError> {
    let Some((charset, encoded)) = split_rfc5987(value) else {
        return Err(ParseError::new("invalid filename* parameter encoding"));
    };

    if !charset.eq_ignore_ascii_case("utf-8") {
        return Err(ParseError::new("only UTF-8 filename* charset is supported"));
    }

    percent_decode_utf8(
        encoded,
        "invalid percent-encoding in filename*",
        "filename* is not valid UTF-8",
    )
}

fn split_rfc5987(value: &str) -> Option<(&str, &str)> {
    let (charset, rest) = value.split_once('\'')?;
    let (_, encoded) = rest.split_once('\'')?;
    Some((charset, encoded))
}

fn parse_filename_value(value: &str) -> String {
    if !value.as_bytes().contains(&b'%') {
        return value.to_owned();
    }

    // A literal `%` in a plain filename is kept as sent.
    percent_decode_utf8(
        value,
        "invalid percent-encoding in filename",
        "filename is not valid UTF-8",
    )
    .unwrap_or_else(|_| value.to_owned())
}

fn percent_decode_utf8(
    value: &str,
    invalid_encoding_message: &'static str,
    invalid_utf8_message: &'static str,
) -> Result<String, ParseError> {
    let mut bytes = Vec::with_capacity(value.len());
    let raw = value.as_bytes();
    let mut index = 0;

    while index < raw.len() {
        if raw[index] == b'%' {
            if index + 2 >= raw.len() {
                return Err(ParseError::new(invalid_encoding_message));
            }
            let hi = hex_value(raw[index + 1], invalid_encoding_message)?;
            let lo = hex_value(raw[index + 2], invalid_encoding_message)?;
            bytes.push((hi << 4) | lo);
            index += 3;
            continue;
        }

        bytes.push(raw[index]);
        index += 1;
    }

    String::from_utf8(bytes).map_err(|_| ParseError::new(invalid_utf8_message))
}

fn hex_value(byte: u8, invalid_encoding_message: &'static str) -> Result<u8, ParseError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(ParseError::new(invalid_encoding_message)),
    }
}

fn split_semicolon_aware(value: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => {
                segments.push(current);
                current = String::new();
            }
            _ => current.push(ch),
        }
    }

    segments.push(current);
    segments
}
