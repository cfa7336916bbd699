#![allow(missing_docs)]

use bytes::Bytes;
use futures::{stream, TryStreamExt};
use multiview::{Multipart, MultipartError, PartHeader, StrictBodyPart};
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn exposes_metadata_accessors() {
    let body = concat!(
        "--BOUND\r\n",
        "Content-Disposition: form-data; name=\"avatar\"; filename=\"face.png\"\r\n",
        "Content-Type: image/png\r\n",
        "Content-Length: 3\r\n",
        "\r\n",
        "abc\r\n",
        "--BOUND--\r\n"
    );

    let mut multipart = Multipart::new("BOUND", bytes_stream(body)).expect("boundary should be valid");
    let part = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part expected");

    assert_eq!(part.content_type().essence_str(), "image/png");
    assert_eq!(part.headers().content_length(), Some(3));
    assert_eq!(
        part.headers()
            .get("content-disposition")
            .map(PartHeader::value)
            .as_deref(),
        Some("form-data; name=\"avatar\"; filename=\"face.png\"")
    );
    let disposition = part.content_disposition().expect("disposition expected");
    assert_eq!(disposition.name.as_deref(), Some("avatar"));
    assert!(!part.is_consumed());
}

#[tokio::test]
async fn parts_without_content_type_default_to_utf8_text() {
    let body = "--BOUND\r\nX-Note: hi\r\n\r\nhello\r\n--BOUND--\r\n";
    let mut multipart = Multipart::new("BOUND", bytes_stream(body)).expect("boundary should be valid");

    let part = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part expected");
    assert_eq!(part.content_type(), multipart.default_content_type());
    assert_eq!(part.content_type().to_string(), "text/plain; charset=UTF-8");
    assert_eq!(part.headers().content_type(), None);
}

#[tokio::test]
async fn bytes_are_single_pass() {
    let body = "--BOUND\r\nContent-Disposition: form-data; name=\"field\"\r\n\r\nhello\r\n--BOUND--\r\n";
    let mut multipart = Multipart::new("BOUND", bytes_stream(body)).expect("boundary should be valid");
    let mut part = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part expected");

    let payload = part.bytes().await.expect("bytes should be readable");
    assert_eq!(payload, Bytes::from_static(b"hello"));
    assert!(part.is_consumed());

    let err = part.bytes().await.expect_err("second read must fail");
    assert_already_consumed(err);
    let err = part.stream().expect_err("stream after read must fail");
    assert_already_consumed(err);
}

#[tokio::test]
async fn text_rejects_invalid_utf8() {
    let mut body = b"--BOUND\r\n\r\n".to_vec();
    body.extend_from_slice(&[0xff, 0xfe]);
    body.extend_from_slice(b"\r\n--BOUND--");
    let mut multipart =
        Multipart::new("BOUND", stream::iter([Ok::<Bytes, MultipartError>(Bytes::from(body))]))
            .expect("boundary should be valid");

    let mut part = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part expected");
    let err = part.text().await.expect_err("must fail");
    assert_err_contains(&err.to_string(), "UTF-8");
}

#[tokio::test]
async fn stream_yields_body_chunks() {
    let body = "--BOUND\r\n\r\nstreamed body\r\n--BOUND--";
    let mut multipart = Multipart::new("BOUND", bytes_stream(body)).expect("boundary should be valid");
    let mut part = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part expected");

    let chunks: Vec<Bytes> = part
        .stream()
        .expect("stream should be available")
        .try_collect()
        .await
        .expect("body should stream");
    assert_eq!(chunks.concat(), b"streamed body");
}

#[tokio::test]
async fn into_async_read_exposes_body_as_reader() {
    let body = "--BOUND\r\nContent-Type: text/csv\r\n\r\na,b\r\n1,2\r\n--BOUND--\r\n";
    let mut multipart = Multipart::new("BOUND", bytes_stream(body)).expect("boundary should be valid");
    let part = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part expected");

    let mut reader = part.into_async_read().expect("reader should be available");
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .await
        .expect("reader should drain");
    assert_eq!(text, "a,b\r\n1,2");
}

#[tokio::test]
async fn strict_part_keeps_headers_and_body() {
    let body = concat!(
        "--BOUND\r\n",
        "Content-Type: application/json\r\n",
        "\r\n",
        "{\"a\": 1}\r\n",
        "--BOUND--"
    );
    let multipart = Multipart::new("BOUND", bytes_stream(body)).expect("boundary should be valid");
    let strict = multipart
        .to_strict(std::time::Duration::from_secs(1))
        .await
        .expect("entity should buffer");

    let part: &StrictBodyPart = &strict.parts()[0];
    assert_eq!(part.content_type(), &mime::APPLICATION_JSON);
    assert_eq!(part.text().expect("utf-8"), "{\"a\": 1}");

    let (headers, content_type, payload) = part.clone().into_parts();
    assert_eq!(headers.len(), 1);
    assert_eq!(content_type, mime::APPLICATION_JSON);
    assert_eq!(payload, Bytes::from_static(b"{\"a\": 1}"));
}

fn bytes_stream(body: &'static str) -> impl futures::Stream<Item = Result<Bytes, MultipartError>> {
    stream::iter([Ok(Bytes::from_static(body.as_bytes()))])
}

fn assert_already_consumed(err: MultipartError) {
    assert_err_contains(&err.to_string(), "already consumed");
}

fn assert_err_contains(actual: &str, expected_fragment: &str) {
    assert!(
        actual.contains(expected_fragment),
        "expected `{actual}` to contain `{expected_fragment}`"
    );
}
