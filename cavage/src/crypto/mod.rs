mod asymmetric;
mod symmetric;

use crate::error::{SigResult, VerificationError};
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

pub use asymmetric::{EcdsaEncoding, KeyPairAlgorithm, KeyPairConfig, RsaPadding};
pub use symmetric::SharedKey;

/* -------------------------------- */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Digest algorithms for the `Digest` header
pub enum DigestAlgorithm {
  #[default]
  Sha256,
  Sha512,
}

impl DigestAlgorithm {
  /// Wire name used verbatim as the `Digest` header prefix
  pub fn as_str(&self) -> &'static str {
    match self {
      DigestAlgorithm::Sha256 => "SHA-256",
      DigestAlgorithm::Sha512 => "SHA-512",
    }
  }

  /// Hash the given body
  pub fn digest(&self, body: &[u8]) -> Vec<u8> {
    match self {
      DigestAlgorithm::Sha256 => {
        let mut hasher = Sha256::new();
        hasher.update(body);
        hasher.finalize().to_vec()
      }
      DigestAlgorithm::Sha512 => {
        let mut hasher = Sha512::new();
        hasher.update(body);
        hasher.finalize().to_vec()
      }
    }
  }

  /// Build a `Digest` header value, `<wire-name>=<base64-of-hash>`
  pub fn digest_header(&self, body: &[u8]) -> String {
    format!("{}={}", self.as_str(), general_purpose::STANDARD.encode(self.digest(body)))
  }

  /// Verify a `Digest` header value against the message body. The header is
  /// split on the first `=` only; the algorithm token must match
  /// case-insensitively; the reference digest is recomputed over `body` and
  /// compared in constant time. Every mismatch is an error, never a silent
  /// false.
  pub fn verify_digest_header(&self, body: &[u8], header: &str) -> SigResult<()> {
    let Some((token, value)) = header.split_once('=') else {
      return Err(VerificationError::DigestMismatch(format!("malformed digest header: {header}")).into());
    };
    if !token.eq_ignore_ascii_case(self.as_str()) {
      return Err(
        VerificationError::DigestMismatch(format!(
          "digest algorithm mismatch: expected {}, found {token}",
          self.as_str()
        ))
        .into(),
      );
    }
    let given = general_purpose::STANDARD
      .decode(value)
      .map_err(VerificationError::Base64Decode)?;
    let expected = self.digest(body);
    let matches = expected.len() == given.len() && bool::from(expected.ct_eq(&given));
    if !matches {
      return Err(VerificationError::DigestMismatch("digest does not match message body".to_string()).into());
    }
    Ok(())
  }
}

impl std::fmt::Display for DigestAlgorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for DigestAlgorithm {
  type Err = VerificationError;

  /// Algorithm tokens on incoming `Digest` headers match case-insensitively
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.eq_ignore_ascii_case("sha-256") {
      Ok(Self::Sha256)
    } else if s.eq_ignore_ascii_case("sha-512") {
      Ok(Self::Sha512)
    } else {
      Err(VerificationError::DigestMismatch(format!("unknown digest algorithm: {s}")))
    }
  }
}

/* -------------------------------- */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// MAC algorithms for symmetric-secret keys
pub enum MacAlgorithm {
  HmacSha256,
  HmacSha512,
}

impl MacAlgorithm {
  /// Wire name used verbatim for the `algorithm` parameter
  pub fn as_str(&self) -> &'static str {
    match self {
      MacAlgorithm::HmacSha256 => "hmac-sha256",
      MacAlgorithm::HmacSha512 => "hmac-sha512",
    }
  }
}

impl std::fmt::Display for MacAlgorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/* -------------------------------- */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Signature schemes carried in the `algorithm` parameter. `hs2019` leaves
/// the concrete primitive free; the legacy names pin it.
pub enum SignatureScheme {
  Hs2019,
  HmacSha256,
  RsaSha256,
  EcdsaSha256,
}

impl SignatureScheme {
  pub fn as_str(&self) -> &'static str {
    match self {
      SignatureScheme::Hs2019 => "hs2019",
      SignatureScheme::HmacSha256 => "hmac-sha256",
      SignatureScheme::RsaSha256 => "rsa-sha256",
      SignatureScheme::EcdsaSha256 => "ecdsa-sha256",
    }
  }
}

impl std::fmt::Display for SignatureScheme {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for SignatureScheme {
  type Err = VerificationError;

  /// Parses the `algorithm` parameter of an incoming signature, hence the
  /// verification-kind error on unknown values
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "hs2019" => Ok(Self::Hs2019),
      "hmac-sha256" => Ok(Self::HmacSha256),
      "rsa-sha256" => Ok(Self::RsaSha256),
      "ecdsa-sha256" => Ok(Self::EcdsaSha256),
      _ => Err(VerificationError::UnsupportedScheme(s.to_string())),
    }
  }
}

/* -------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;
  use std::str::FromStr;

  #[test]
  fn digest_header_round_trip() {
    let body = br#"{"foo":"bar"}"#;
    let header = DigestAlgorithm::Sha256.digest_header(body);
    assert_eq!(header, "SHA-256=eji/gfOD9pQzrW6QDTWz4jhVk/dqe3q11DVbi6Qe4ks=");
    assert!(DigestAlgorithm::Sha256.verify_digest_header(body, &header).is_ok());
  }

  #[test]
  fn digest_algorithm_token_case_insensitive() {
    let body = b"hello";
    let header = DigestAlgorithm::Sha256.digest_header(body);
    let lowered = header.replacen("SHA-256", "sha-256", 1);
    assert!(DigestAlgorithm::Sha256.verify_digest_header(body, &lowered).is_ok());
  }

  #[test]
  fn digest_algorithm_mismatch_fails() {
    let body = b"hello";
    let header = DigestAlgorithm::Sha512.digest_header(body);
    let res = DigestAlgorithm::Sha256.verify_digest_header(body, &header);
    assert!(res.is_err());
  }

  #[test]
  fn digest_tampered_body_fails() {
    let header = DigestAlgorithm::Sha256.digest_header(b"hello");
    let res = DigestAlgorithm::Sha256.verify_digest_header(b"hellp", &header);
    assert!(res.is_err());
  }

  #[test]
  fn digest_length_mismatch_is_error_not_panic() {
    // SHA-512 sized value against a SHA-256 configuration, same token
    let value = base64::engine::general_purpose::STANDARD.encode([0u8; 64]);
    let res = DigestAlgorithm::Sha256.verify_digest_header(b"hello", &format!("SHA-256={value}"));
    assert!(res.is_err());
  }

  #[test]
  fn scheme_wire_names() {
    for s in ["hs2019", "hmac-sha256", "rsa-sha256", "ecdsa-sha256"] {
      assert_eq!(SignatureScheme::from_str(s).unwrap().as_str(), s);
    }
    assert!(SignatureScheme::from_str("rsa-sha512").is_err());
  }
}
