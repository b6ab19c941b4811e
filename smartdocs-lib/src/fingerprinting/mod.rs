pub mod extractor;
pub mod headers;

pub use extractor::{fingerprint, from_request, resolve_client_address, RequestFingerprint};
pub use headers::{forwarded, names};
