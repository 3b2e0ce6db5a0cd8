use super::MacAlgorithm;
use crate::{
  error::{SigResult, VerificationError},
  trace::*,
};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};

type HmacSha256 = Hmac<sha2::Sha256>;
type HmacSha512 = Hmac<sha2::Sha512>;

/* -------------------------------- */
#[derive(Debug, Clone)]
/// Shared key owning the HMAC primitive for one signing context
pub enum SharedKey {
  HmacSha256(Vec<u8>),
  HmacSha512(Vec<u8>),
}

impl SharedKey {
  /// Create a new shared key from raw secret bytes
  pub fn new(alg: &MacAlgorithm, secret: &[u8]) -> Self {
    match alg {
      MacAlgorithm::HmacSha256 => SharedKey::HmacSha256(secret.to_vec()),
      MacAlgorithm::HmacSha512 => SharedKey::HmacSha512(secret.to_vec()),
    }
  }

  /// Create a new shared key from a base64 encoded secret
  pub fn from_base64(alg: &MacAlgorithm, key: &str) -> SigResult<Self> {
    debug!("Create SharedKey from base64 string");
    let key = general_purpose::STANDARD.decode(key).map_err(VerificationError::Base64Decode)?;
    Ok(Self::new(alg, &key))
  }

  /// MAC the data
  pub fn sign(&self, data: &[u8]) -> Vec<u8> {
    match self {
      SharedKey::HmacSha256(key) => {
        let mut mac = HmacSha256::new_from_slice(key).unwrap();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
      }
      SharedKey::HmacSha512(key) => {
        let mut mac = HmacSha512::new_from_slice(key).unwrap();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
      }
    }
  }

  /// Verify the mac in constant time. A length mismatch is an ordinary
  /// verification failure, never a panic or a short-circuit.
  pub fn verify(&self, data: &[u8], expected_mac: &[u8]) -> SigResult<()> {
    match self {
      SharedKey::HmacSha256(key) => {
        let mut mac = HmacSha256::new_from_slice(key).unwrap();
        mac.update(data);
        mac.verify_slice(expected_mac).map_err(|_| VerificationError::SignatureMismatch)?;
      }
      SharedKey::HmacSha512(key) => {
        let mut mac = HmacSha512::new_from_slice(key).unwrap();
        mac.update(data);
        mac.verify_slice(expected_mac).map_err(|_| VerificationError::SignatureMismatch)?;
      }
    }
    Ok(())
  }

  /// MAC algorithm backing this key
  pub fn alg(&self) -> MacAlgorithm {
    match self {
      SharedKey::HmacSha256(_) => MacAlgorithm::HmacSha256,
      SharedKey::HmacSha512(_) => MacAlgorithm::HmacSha512,
    }
  }
}
