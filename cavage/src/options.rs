use crate::error::{ConfigurationError, SigResult};
use indexmap::IndexMap;

/// Pseudo-header carrying the lower-cased method and verbatim path
pub const REQUEST_TARGET_HEADER: &str = "(request-target)";
/// Pseudo-header carrying the signature creation timestamp
pub const CREATED_HEADER: &str = "(created)";
/// Pseudo-header carrying the signature expiry timestamp
pub const EXPIRES_HEADER: &str = "(expires)";
/// Header carrying the keyed body digest
pub const DIGEST_HEADER: &str = "digest";

/* ---------------------------------------- */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Role of a header within the signature exchange
pub enum HeaderRole {
  /// Included when signing outgoing messages only
  Sign,
  /// Required in the peer's signed set when verifying only
  Verify,
  /// Both of the above
  Both,
}

impl HeaderRole {
  /// True if the header is included in the signed header list
  pub fn signed(&self) -> bool {
    matches!(self, Self::Sign | Self::Both)
  }

  /// True if the header must appear in the peer's signed set
  pub fn required(&self) -> bool {
    matches!(self, Self::Verify | Self::Both)
  }
}

/// Ordered header-name-to-role mapping. Signing emits headers in insertion order.
pub type HeaderRoles = IndexMap<String, HeaderRole>;

/* ---------------------------------------- */
#[derive(Debug, Clone)]
/// Effective signature options after merging per-key overrides with the base record
pub struct SignatureOptions {
  /// Roles of request headers
  pub request_headers: HeaderRoles,
  /// Roles of response headers
  pub response_headers: HeaderRoles,
  /// Whether signing appends a `digest` header requirement and
  /// verification requires the peer to have signed `digest`
  pub calculate_digest: bool,
}

#[derive(Debug, Clone, Default)]
/// Partial option record. `None` fields defer to the next layer in the merge.
pub struct SignatureOptionsOverride {
  pub request_headers: Option<HeaderRoles>,
  pub response_headers: Option<HeaderRoles>,
  pub calculate_digest: Option<bool>,
}

impl SignatureOptionsOverride {
  /// Fully populated partial carrying the default option values:
  /// request headers `{(request-target): both, host: both}`, no response
  /// headers, digest calculation on.
  pub fn defaults() -> Self {
    Self {
      request_headers: Some(HeaderRoles::from_iter([
        (REQUEST_TARGET_HEADER.to_string(), HeaderRole::Both),
        ("host".to_string(), HeaderRole::Both),
      ])),
      response_headers: Some(HeaderRoles::new()),
      calculate_digest: Some(true),
    }
  }

  /// Layer `self` over `base`, field by field
  pub fn or(&self, base: &Self) -> Self {
    Self {
      request_headers: self.request_headers.clone().or_else(|| base.request_headers.clone()),
      response_headers: self.response_headers.clone().or_else(|| base.response_headers.clone()),
      calculate_digest: self.calculate_digest.or(base.calculate_digest),
    }
  }
}

/// Resolve the effective options: for each option the first defined of
/// (per-key override, base) wins. The option set is closed and small, so the
/// merge enumerates fields by name. Any option still undefined afterwards is
/// a configuration error.
pub(crate) fn merge_options(
  overrides: &SignatureOptionsOverride,
  base: &SignatureOptionsOverride,
) -> SigResult<SignatureOptions> {
  let merged = overrides.or(base);
  Ok(SignatureOptions {
    request_headers: merged
      .request_headers
      .ok_or(ConfigurationError::MissingOption("requestHeaders"))?,
    response_headers: merged
      .response_headers
      .ok_or(ConfigurationError::MissingOption("responseHeaders"))?,
    calculate_digest: merged
      .calculate_digest
      .ok_or(ConfigurationError::MissingOption("calculateDigest"))?,
  })
}
