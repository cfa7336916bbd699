#![allow(missing_docs)]

use std::time::Duration;

use bytes::Bytes;
use futures::{stream, StreamExt};
use multiview::{MultipartError, MultipartParser};

const FORM: &str = concat!(
    "--XYZABC\r\n",
    "Content-Disposition: form-data; name=\"email\"\r\n",
    "\r\n",
    "test@there.com\r\n",
    "--XYZABC\r\n",
    "Content-Disposition: form-data; name=\"userfile\"; filename=\"test.dat\"\r\n",
    "Content-Transfer-Encoding: binary\r\n",
    "\r\n",
    "filecontent\r\n",
    "--XYZABC--"
);

const CONTENT_TYPE: &str = "multipart/form-data; boundary=XYZABC";

#[tokio::test]
async fn yields_named_fields_with_octet_stream_default() {
    let mut form = MultipartParser::new()
        .parse_form_data(CONTENT_TYPE, bytes_stream(FORM))
        .expect("form should initialize");
    assert_eq!(form.media_type().subtype(), mime::FORM_DATA);

    let mut email = form
        .next_part()
        .await
        .expect("field should parse")
        .expect("field expected");
    assert_eq!(email.name(), Some("email"));
    assert_eq!(email.filename(), None);
    assert_eq!(email.part().content_type(), &mime::APPLICATION_OCTET_STREAM);
    assert_eq!(
        email.part_mut().text().await.expect("body"),
        "test@there.com"
    );

    let file = form
        .next_part()
        .await
        .expect("field should parse")
        .expect("field expected");
    assert_eq!(file.name(), Some("userfile"));
    assert_eq!(file.filename(), Some("test.dat"));
    assert_eq!(
        file.part().headers().content_transfer_encoding(),
        Some("binary")
    );
    let mut part = file.into_part();
    assert_eq!(part.bytes().await.expect("body"), Bytes::from_static(b"filecontent"));

    assert!(form.next_part().await.expect("close").is_none());
}

#[tokio::test]
async fn strict_form_data_looks_up_fields_by_name() {
    let form = MultipartParser::new()
        .parse_form_data(CONTENT_TYPE, bytes_stream(FORM))
        .expect("form should initialize");

    let strict = form
        .to_strict(Duration::from_secs(1))
        .await
        .expect("form should buffer");
    assert_eq!(strict.len(), 2);

    let email = strict.get("email").expect("email field");
    assert_eq!(email.part().text().expect("utf-8"), "test@there.com");

    let file = strict.get("userfile").expect("file field");
    assert_eq!(file.filename(), Some("test.dat"));
    assert_eq!(file.part().body(), &Bytes::from_static(b"filecontent"));
    assert!(strict.get("missing").is_none());
}

#[tokio::test]
async fn explicit_content_type_wins_over_default() {
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"doc\"\r\n",
        "Content-Type: application/pdf\r\n",
        "\r\n",
        "%PDF\r\n",
        "--B--"
    );
    let mut form = MultipartParser::new()
        .parse_form_data("multipart/form-data; boundary=B", bytes_stream(body))
        .expect("form should initialize");

    let field = form
        .next_part()
        .await
        .expect("field should parse")
        .expect("field expected");
    assert_eq!(field.part().content_type().essence_str(), "application/pdf");
}

#[tokio::test]
async fn literal_percent_in_filename_keeps_field_name() {
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"100% done.txt\"\r\n",
        "\r\n",
        "done\r\n",
        "--B--"
    );
    let mut form = MultipartParser::new()
        .parse_form_data("multipart/form-data; boundary=B", bytes_stream(body))
        .expect("form should initialize");

    let mut field = form
        .next_part()
        .await
        .expect("field should parse")
        .expect("field expected");
    assert_eq!(field.name(), Some("file"));
    assert_eq!(field.filename(), Some("100% done.txt"));
    assert_eq!(field.part_mut().text().await.expect("body"), "done");
}

#[tokio::test]
async fn unnamed_parts_pass_through_by_default() {
    let body = "--B\r\nContent-Disposition: attachment; filename=\"x.txt\"\r\n\r\nx\r\n--B\r\n\r\ny\r\n--B--";
    let mut form = MultipartParser::new()
        .parse_form_data("multipart/form-data; boundary=B", bytes_stream(body))
        .expect("form should initialize");

    let attachment = form
        .next_part()
        .await
        .expect("field should parse")
        .expect("field expected");
    assert_eq!(attachment.name(), None);
    assert_eq!(attachment.filename(), None);
    assert!(attachment.part().content_disposition().is_some());

    let bare = form
        .next_part()
        .await
        .expect("field should parse")
        .expect("field expected");
    assert_eq!(bare.name(), None);
    assert!(form.next_part().await.expect("close").is_none());
}

#[tokio::test]
async fn require_name_rejects_unnamed_parts() {
    let body = "--B\r\nContent-Disposition: form-data; name=\"\"\r\n\r\nx\r\n--B--";
    let parser = MultipartParser::builder()
        .require_form_data_name(true)
        .build()
        .expect("builder config should validate");
    let mut form = parser
        .parse_form_data("multipart/form-data; boundary=B", bytes_stream(body))
        .expect("form should initialize");

    let err = form.next_part().await.expect_err("unnamed part must fail");
    assert_eq!(
        err.to_string(),
        "form-data Content-Disposition must include non-empty `name`"
    );
    assert!(form.next().await.is_none());
}

#[tokio::test]
async fn decoding_errors_surface_through_form_view() {
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"a\"\r\n",
        "Content-Type: text/plain\r\n",
        "Content-Type: application/json\r\n",
        "\r\n",
        "{}\r\n",
        "--B--"
    );
    let form = MultipartParser::new()
        .parse_form_data("multipart/form-data; boundary=B", bytes_stream(body))
        .expect("form should initialize");

    let err = form
        .to_strict(Duration::from_secs(1))
        .await
        .expect_err("duplicate Content-Type must fail");
    assert_eq!(
        err.to_string(),
        "multipart part must not contain more than one Content-Type header"
    );
}

fn bytes_stream(body: &'static str) -> impl futures::Stream<Item = Result<Bytes, MultipartError>> {
    stream::iter([Ok(Bytes::from_static(body.as_bytes()))])
}
