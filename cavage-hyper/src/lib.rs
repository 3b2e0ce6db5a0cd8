//! # cavage-hyper
//!
//! `cavage-hyper` extends hyper's http request and response messages with the
//! ability to sign and verify them per draft-cavage-http-signatures-12, and to
//! set and verify the `Digest` header over their bodies.
//!
//! Signing writes the `Digest` header (when the resolved key calculates
//! digests) before the canonical string is built, then writes the `Signature`
//! header; verification collects the body, resolves the key the signature
//! declares, checks the digest, and runs the engine's verification. The
//! engine itself never mutates messages; all mutation happens here.

mod error;
mod hyper_content_digest;
mod hyper_http;

/// `Digest` header name
pub(crate) const DIGEST_HEADER: &str = "digest";
/// `Signature` header name
pub(crate) const SIGNATURE_HEADER: &str = "signature";

pub use cavage::prelude;
pub use error::{HyperSigError, HyperSigResult};
pub use hyper_content_digest::{ContentDigest, RequestContentDigest, ResponseContentDigest};
pub use hyper_http::{RequestMessage, RequestMessageSignature, ResponseMessage, ResponseMessageSignature};

/* ----------------------------------------------------------------- */
