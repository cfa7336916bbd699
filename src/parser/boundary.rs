use crate::error::ParseError;

const MAX_BOUNDARY_LEN: usize = 70;

/// Extracts and validates the `boundary` parameter from a `multipart/*` `Content-Type` value.
///
/// Returns the parsed media type together with the boundary token, used verbatim.
pub fn extract_multipart_boundary(content_type: &str) -> Result<(mime::Mime, String), ParseError> {
    let mime = content_type
        .trim()
        .parse::<mime::Mime>()
        .map_err(|_| ParseError::new("invalid Content-Type header"))?;

    if mime.type_() != mime::MULTIPART {
        return Err(ParseError::new("Content-Type must be multipart/*"));
    }

    let boundary = mime
        .get_param(mime::BOUNDARY)
        .map(|value| value.as_str().to_owned())
        .ok_or_else(|| ParseError::new("missing multipart boundary parameter"))?;

    validate_boundary(&boundary)?;
    Ok((mime, boundary))
}

/// Checks a boundary token against the RFC 2046 `bchars` grammar.
pub fn validate_boundary(boundary: &str) -> Result<(), ParseError> {
    if boundary.is_empty() {
        return Err(ParseError::new("multipart boundary cannot be empty"));
    }

    if boundary.len() > MAX_BOUNDARY_LEN {
        return Err(ParseError::new("multipart boundary cannot exceed 70 characters"));
    }

    if boundary.ends_with(' ') {
        return Err(ParseError::new(
            "multipart boundary cannot end with whitespace",
        ));
    }

    if !boundary.chars().all(is_boundary_char) {
        return Err(ParseError::new(
            "multipart boundary contains invalid characters",
        ));
    }

    Ok(())
}

fn is_boundary_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?' | ' '
        )
}
