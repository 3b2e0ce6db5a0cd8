use crate::{
  crypto::SignatureScheme,
  error::{SigResult, VerificationError},
  options::CREATED_HEADER,
  trace::*,
};
use base64::{engine::general_purpose, Engine as _};
use rustc_hash::FxHashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Tolerance for `created` timestamps lying in the future
pub const CREATED_SLACK: Duration = Duration::from_millis(60_000);
/// Tolerance for `expires` timestamps lying in the past
pub const EXPIRES_SLACK: Duration = Duration::from_millis(60_000);

/* ---------------------------------------- */
#[derive(Debug, Clone)]
/// Validated record of one `Signature` header parameter list.
///
/// Invariants: `signature` is non-empty, `headers` has at least one entry
/// (defaulting to `(created)` when the parameter is omitted), and the source
/// string carried no duplicate parameter names.
pub struct SignatureParams {
  /// Opaque identifier the peer uses to locate the matching key
  pub key_id: String,
  /// Raw signature bytes decoded from base64
  pub signature: Vec<u8>,
  /// Ordered list of lower-cased signed header names
  pub headers: Vec<String>,
  /// Declared signature scheme, if any
  pub algorithm: Option<SignatureScheme>,
  /// Signature creation instant, whole seconds
  pub created: Option<SystemTime>,
  /// Signature expiry instant, subsecond precision allowed
  pub expires: Option<SystemTime>,
  /// Instant the signature was observed, used by the slack windows
  pub observed_at: SystemTime,
}

impl SignatureParams {
  /// Parse a `Signature` header parameter list observed at the given instant.
  /// Production callers go through [`TryFrom<&str>`]; tests inject
  /// `observed_at` explicitly.
  pub fn parse_at(value: &str, observed_at: SystemTime) -> SigResult<Self> {
    let mut key_id = None;
    let mut signature = None;
    let mut headers = None;
    let mut algorithm = None;
    let mut created = None;
    let mut expires = None;

    let mut seen = FxHashSet::default();
    for part in value.split(',') {
      if part.is_empty() {
        return Err(malformed("empty parameter in list").into());
      }
      let Some((name, raw)) = part.split_once('=') else {
        return Err(malformed(&format!("parameter without value: {part}")).into());
      };
      if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(malformed(&format!("invalid parameter name: {name:?}")).into());
      }
      if !seen.insert(name.to_string()) {
        return Err(malformed(&format!("duplicate parameter: {name}")).into());
      }
      match name {
        "keyId" => key_id = Some(unquote(raw)?.to_string()),
        "signature" => signature = Some(decode_signature(unquote(raw)?)?),
        "headers" => headers = Some(split_headers(unquote(raw)?)?),
        "algorithm" => algorithm = Some(unquote(raw)?.parse::<SignatureScheme>()?),
        "created" => created = Some(parse_created(raw)?),
        "expires" => expires = Some(parse_expires(raw)?),
        unknown => {
          debug!("Ignore unknown signature parameter: {unknown}");
        }
      }
    }

    let Some(key_id) = key_id else {
      return Err(malformed("missing keyId parameter").into());
    };
    let Some(signature) = signature else {
      return Err(malformed("missing signature parameter").into());
    };

    Ok(Self {
      key_id,
      signature,
      headers: headers.unwrap_or_else(|| vec![CREATED_HEADER.to_string()]),
      algorithm,
      created,
      expires,
      observed_at,
    })
  }

  /// True unless `created` lies in the future by at least [`CREATED_SLACK`].
  /// An absent timestamp is vacuously valid.
  pub fn valid_creation(&self) -> bool {
    let Some(created) = self.created else {
      return true;
    };
    match created.duration_since(self.observed_at) {
      Ok(ahead) => ahead < CREATED_SLACK,
      Err(_) => true,
    }
  }

  /// True unless `expires` lies in the past by at least [`EXPIRES_SLACK`].
  /// An absent timestamp is vacuously valid.
  pub fn valid_expires(&self) -> bool {
    let Some(expires) = self.expires else {
      return true;
    };
    match self.observed_at.duration_since(expires) {
      Ok(behind) => behind < EXPIRES_SLACK,
      Err(_) => true,
    }
  }
}

impl TryFrom<&str> for SignatureParams {
  type Error = crate::error::SignatureError;

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    Self::parse_at(value, SystemTime::now())
  }
}

impl std::fmt::Display for SignatureParams {
  /// Emit the wire form: `keyId`, `algorithm`, `headers`, `signature` in
  /// fixed order, no whitespace around commas, then `created`/`expires`
  /// when present. Re-parsing the output yields an equivalent record.
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "keyId=\"{}\"", self.key_id)?;
    if let Some(algorithm) = &self.algorithm {
      write!(f, ",algorithm=\"{algorithm}\"")?;
    }
    write!(
      f,
      ",headers=\"{}\",signature=\"{}\"",
      self.headers.join(" "),
      general_purpose::STANDARD.encode(&self.signature)
    )?;
    if let Some(created) = &self.created {
      write!(f, ",created={}", format_timestamp_secs(created))?;
    }
    if let Some(expires) = &self.expires {
      write!(f, ",expires={}", format_timestamp(expires))?;
    }
    Ok(())
  }
}

/* ---------------------------------------- */
/// Whole seconds since the epoch; `created` carries no fraction
pub(crate) fn format_timestamp_secs(t: &SystemTime) -> String {
  t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs().to_string()
}

/// Seconds since the epoch as a decimal literal, fraction trimmed
pub(crate) fn format_timestamp(t: &SystemTime) -> String {
  let d = t.duration_since(UNIX_EPOCH).unwrap_or_default();
  if d.subsec_nanos() == 0 {
    d.as_secs().to_string()
  } else {
    let mut s = format!("{}.{:09}", d.as_secs(), d.subsec_nanos());
    while s.ends_with('0') {
      s.pop();
    }
    s
  }
}

fn malformed(reason: &str) -> VerificationError {
  VerificationError::MalformedSignatureHeader(reason.to_string())
}

/// Strip the surrounding double quotes. Inner quote escaping is not supported.
fn unquote(raw: &str) -> SigResult<&str> {
  let quoted = raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"');
  if !quoted {
    return Err(malformed(&format!("expected quoted string: {raw}")).into());
  }
  let inner = &raw[1..raw.len() - 1];
  if inner.contains('"') {
    return Err(malformed(&format!("stray quote inside quoted string: {raw}")).into());
  }
  Ok(inner)
}

/// `created` is a bare non-negative integer, no leading zero, no fraction
fn parse_created(raw: &str) -> SigResult<SystemTime> {
  if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
    return Err(malformed(&format!("invalid created value: {raw}")).into());
  }
  if raw.len() > 1 && raw.starts_with('0') {
    return Err(malformed(&format!("leading zero in created value: {raw}")).into());
  }
  let secs = raw
    .parse::<u64>()
    .map_err(|_| malformed(&format!("created value out of range: {raw}")))?;
  Ok(UNIX_EPOCH + Duration::from_secs(secs))
}

/// `expires` is a bare non-negative decimal, at most one point, neither
/// leading nor trailing, no leading zero except `0` or `0.…`
fn parse_expires(raw: &str) -> SigResult<SystemTime> {
  if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
    return Err(malformed(&format!("invalid expires value: {raw}")).into());
  }
  if raw.starts_with('.') || raw.ends_with('.') || raw.bytes().filter(|b| *b == b'.').count() > 1 {
    return Err(malformed(&format!("invalid decimal point in expires value: {raw}")).into());
  }
  let (int_part, fraction) = match raw.split_once('.') {
    Some((i, f)) => (i, Some(f)),
    None => (raw, None),
  };
  if int_part.len() > 1 && int_part.starts_with('0') {
    return Err(malformed(&format!("leading zero in expires value: {raw}")).into());
  }
  let secs = int_part
    .parse::<u64>()
    .map_err(|_| malformed(&format!("expires value out of range: {raw}")))?;
  let nanos = match fraction {
    Some(f) => {
      let mut digits = f.as_bytes().to_vec();
      digits.truncate(9);
      digits.resize(9, b'0');
      // digits are ASCII by the charset check above
      String::from_utf8(digits).unwrap().parse::<u32>().unwrap()
    }
    None => 0,
  };
  Ok(UNIX_EPOCH + Duration::new(secs, nanos))
}

/// `headers` splits on a single U+0020; no leading, trailing, or consecutive
/// spaces, and no other whitespace anywhere
fn split_headers(raw: &str) -> SigResult<Vec<String>> {
  if raw.is_empty() {
    return Err(malformed("empty headers list").into());
  }
  if raw.starts_with(' ') || raw.ends_with(' ') || raw.contains("  ") {
    return Err(malformed(&format!("stray space in headers list: {raw:?}")).into());
  }
  raw
    .split(' ')
    .map(|name| {
      if name.chars().any(char::is_whitespace) {
        return Err(malformed(&format!("whitespace in header name: {name:?}")).into());
      }
      Ok(name.to_ascii_lowercase())
    })
    .collect()
}

/// Base64-decode the `signature` value and cross-check the decoded length
/// against the unpadded input length
fn decode_signature(raw: &str) -> SigResult<Vec<u8>> {
  let decoded = general_purpose::STANDARD.decode(raw).map_err(VerificationError::Base64Decode)?;
  let unpadded_len = raw.trim_end_matches('=').len();
  if decoded.is_empty() || unpadded_len * 3 / 4 != decoded.len() {
    return Err(malformed(&format!("invalid signature length: {raw}")).into());
  }
  Ok(decoded)
}

/* ---------------------------------------- */
