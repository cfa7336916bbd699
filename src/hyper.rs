//! Hyper integration helpers.

use bytes::Bytes;
use futures::StreamExt;
use http_body_util::BodyExt;
use hyper::{header, Request};

use crate::{parser::stream::ByteStream, Multipart, MultipartError, MultipartParser, ParseError};

/// Extracts the raw `Content-Type` header from a Hyper request.
pub fn content_type_from_request<B>(request: &Request<B>) -> Result<&str, MultipartError> {
    let value = request
        .headers()
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| ParseError::new("missing Content-Type header"))?;
    value
        .to_str()
        .map_err(|_| ParseError::new("Content-Type header must be ASCII").into())
}

/// Maps a Hyper body into the stream shape expected by `multiview`.
pub fn map_body_stream<B>(body: B) -> ByteStream
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let stream = body
        .into_data_stream()
        .map(hyper_item_to_multipart::<B::Error>);
    Box::pin(stream)
}

/// Decodes the multipart view of a Hyper request.
pub fn multipart_from_request<B>(
    parser: &MultipartParser,
    request: Request<B>,
) -> Result<Multipart, MultipartError>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let content_type = content_type_from_request(&request)?.to_owned();
    parser.parse(&content_type, map_body_stream(request.into_body()))
}

fn hyper_item_to_multipart<E>(item: Result<Bytes, E>) -> Result<Bytes, MultipartError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    item.map_err(|err| ParseError::new(format!("hyper body stream error: {err}")).into())
}
