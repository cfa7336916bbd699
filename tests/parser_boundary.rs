#![allow(missing_docs)]

use multiview::parser::boundary::{extract_multipart_boundary, validate_boundary};

#[test]
fn extracts_boundary_from_content_type() {
    let (media_type, boundary) = extract_multipart_boundary("multipart/form-data; boundary=abc123")
        .expect("boundary should parse");
    assert_eq!(boundary, "abc123");
    assert_eq!(media_type.subtype(), mime::FORM_DATA);
}

#[test]
fn extracts_quoted_boundary() {
    let (_, boundary) = extract_multipart_boundary("multipart/mixed; boundary=\"my-boundary\"")
        .expect("quoted boundary should parse");
    assert_eq!(boundary, "my-boundary");
}

#[test]
fn accepts_any_multipart_subtype() {
    for subtype in ["mixed", "alternative", "byteranges", "related"] {
        let header = format!("multipart/{subtype}; boundary=xyz");
        let (media_type, boundary) =
            extract_multipart_boundary(&header).expect("multipart subtype should parse");
        assert_eq!(media_type.subtype().as_str(), subtype);
        assert_eq!(boundary, "xyz");
    }
}

#[test]
fn keeps_percent_signs_in_boundary_verbatim() {
    let err = extract_multipart_boundary("multipart/mixed; boundary=\"abc%2D123\"")
        .expect_err("`%` is not a boundary character");
    assert_err_contains(&err.to_string(), "invalid characters");
}

#[test]
fn rejects_non_multipart_content_type() {
    let err = extract_multipart_boundary("application/json").expect_err("must fail");
    assert_err_contains(&err.to_string(), "multipart/*");
}

#[test]
fn rejects_missing_boundary_parameter() {
    let err = extract_multipart_boundary("multipart/form-data").expect_err("must fail");
    assert_err_contains(&err.to_string(), "missing multipart boundary");
}

#[test]
fn rejects_invalid_boundary_characters() {
    let err = extract_multipart_boundary("multipart/form-data; boundary=abc@123")
        .expect_err("must fail");
    assert_err_contains(&err.to_string(), "invalid");
}

#[test]
fn rejects_boundary_that_is_too_long() {
    let long_boundary = "a".repeat(71);
    let header = format!("multipart/form-data; boundary={long_boundary}");
    let err = extract_multipart_boundary(&header).expect_err("must fail");
    assert_err_contains(&err.to_string(), "cannot exceed 70");
}

#[test]
fn validates_bare_boundaries() {
    validate_boundary("gc0p4Jq0M2Yt08jU534c0p").expect("boundary should be valid");
    validate_boundary("a b'c(d)e+f_g,h-i.j/k:l=m?n").expect("boundary should be valid");

    let err = validate_boundary("").expect_err("must fail");
    assert_err_contains(&err.to_string(), "cannot be empty");

    let err = validate_boundary("trailing ").expect_err("must fail");
    assert_err_contains(&err.to_string(), "whitespace");
}

fn assert_err_contains(actual: &str, expected_fragment: &str) {
    assert!(
        actual.contains(expected_fragment),
        "expected `{actual}` to contain `{expected_fragment}`"
    );
}
