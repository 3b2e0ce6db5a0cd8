use crate::{
  error::{SigResult, VerificationError},
  message::HttpMessage,
  options::{CREATED_HEADER, EXPIRES_HEADER, REQUEST_TARGET_HEADER},
  signature_params::{format_timestamp, format_timestamp_secs},
};
use std::time::SystemTime;

/// `Authorization` scheme prefix under which a signature may travel
const AUTHORIZATION_SCHEME_PREFIX: &str = "Signature ";

/* ---------------------------------------- */
/// View over one HTTP message for canonicalization and signature extraction.
///
/// Pseudo-headers `(request-target)`, `(created)` and `(expires)` are
/// synthesized from the adapter's request target and from the instance
/// timestamps; every other name is lower-cased and forwarded to the adapter.
pub struct MessageContext<'a, M: HttpMessage + ?Sized> {
  message: &'a M,
  created: Option<SystemTime>,
  expires: Option<SystemTime>,
}

impl<'a, M: HttpMessage + ?Sized> MessageContext<'a, M> {
  pub fn new(message: &'a M) -> Self {
    Self {
      message,
      created: None,
      expires: None,
    }
  }

  /// Set the instant backing the `(created)` pseudo-header
  pub fn with_created(mut self, created: SystemTime) -> Self {
    self.created = Some(created);
    self
  }

  /// Set the instant backing the `(expires)` pseudo-header
  pub fn with_expires(mut self, expires: SystemTime) -> Self {
    self.expires = Some(expires);
    self
  }

  pub fn created(&self) -> Option<SystemTime> {
    self.created
  }

  pub fn expires(&self) -> Option<SystemTime> {
    self.expires
  }

  /// Same message, different instance timestamps. Verification uses this to
  /// rebuild the canonical string under the signature's declared instants.
  pub(crate) fn timestamped(&self, created: Option<SystemTime>, expires: Option<SystemTime>) -> Self {
    Self {
      message: self.message,
      created,
      expires,
    }
  }

  /// Values of one (pseudo-)header, already lower-cased for lookup
  fn values(&self, lower_name: &str) -> Option<Vec<String>> {
    match lower_name {
      REQUEST_TARGET_HEADER => self
        .message
        .request_target()
        .map(|t| vec![format!("{} {}", t.method.to_ascii_lowercase(), t.path)]),
      CREATED_HEADER => self.created.map(|t| vec![format_timestamp_secs(&t)]),
      EXPIRES_HEADER => self.expires.map(|t| vec![format_timestamp(&t)]),
      name => self.message.header(name),
    }
  }

  /// Build the canonical string over the given ordered header list.
  ///
  /// One line per name: `"{lower-name}: {value1}, {value2}"`, right-trimmed,
  /// joined with `\n` and no trailing newline. A name without values on the
  /// message fails verification.
  pub fn canonical_string(&self, header_names: &[String]) -> SigResult<String> {
    let lines = header_names
      .iter()
      .map(|name| {
        let lower_name = name.to_ascii_lowercase();
        let values = self
          .values(&lower_name)
          .ok_or_else(|| VerificationError::MissingHeader(lower_name.clone()))?;
        Ok(format!("{}: {}", lower_name, values.join(", ")).trim_end().to_string())
      })
      .collect::<SigResult<Vec<_>>>()?;
    Ok(lines.join("\n"))
  }

  /// Retrieve the signature parameter string carried by the message, if any.
  ///
  /// Candidates are every `signature` header value plus every
  /// `authorization` value carrying the `Signature` scheme. More than one
  /// candidate is ambiguous and fails verification.
  pub fn signature_header(&self) -> SigResult<Option<String>> {
    let mut candidates = self.message.header("signature").unwrap_or_default();
    if let Some(authorization) = self.message.header("authorization") {
      candidates.extend(
        authorization
          .iter()
          .filter_map(|v| v.strip_prefix(AUTHORIZATION_SCHEME_PREFIX).map(str::to_string)),
      );
    }
    match candidates.len() {
      0 => Ok(None),
      1 => Ok(candidates.pop()),
      _ => Err(VerificationError::MultipleSignatures.into()),
    }
  }
}

/* ---------------------------------------- */
