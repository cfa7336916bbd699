/// Multipart boundary parsing helpers.
pub mod boundary;
/// Multipart part header parsing helpers.
pub mod headers;
/// `Content-Range` value codec.
pub mod range;
/// Incremental boundary scanner.
pub mod scanner;
/// Streaming part assembler.
pub mod stream;

pub use boundary::{extract_multipart_boundary, validate_boundary};
pub use headers::{
    parse_content_disposition, parse_header_block, ContentDisposition, HeaderBlock, PartHeader,
    PartHeaders, RawHeader,
};
pub use range::ContentRange;
pub use scanner::{BoundaryScanner, ScanEvent};
pub use stream::{BodyStream, ByteStream, MultipartStream, ParsedPart};
