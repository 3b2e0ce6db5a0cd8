use crate::{
  crypto::{DigestAlgorithm, KeyPairConfig, MacAlgorithm, SharedKey, SignatureScheme},
  error::{ConfigurationError, SigResult, VerificationError},
  message::HttpMessage,
  options::{merge_options, HeaderRoles, SignatureOptions, SignatureOptionsOverride, DIGEST_HEADER},
  signature_base::MessageContext,
  signature_params::SignatureParams,
  trace::*,
};
use std::time::SystemTime;

/* ---------------------------------------- */
#[derive(Debug, Clone)]
/// Key material backing one signing/verification context
pub enum KeyMaterial {
  /// Symmetric secret for the HMAC family
  Secret { mac: MacAlgorithm, secret: Vec<u8> },
  /// Reserved keypair form; validated but not yet operational
  KeyPair(KeyPairConfig),
}

#[derive(Debug, Clone)]
/// Configuration of one key as registered with the key manager
pub struct KeyConfig {
  /// Signature scheme the key signs and accepts
  pub scheme: SignatureScheme,
  /// Digest algorithm for `hs2019`; the legacy `hmac-sha256` scheme forces SHA-256
  pub digest: Option<DigestAlgorithm>,
  /// Key material
  pub material: KeyMaterial,
  /// Per-key option overrides, merged over the manager's base record
  pub options: SignatureOptionsOverride,
}

impl KeyConfig {
  /// Symmetric-secret configuration with default options
  pub fn hmac(scheme: SignatureScheme, mac: MacAlgorithm, secret: &[u8]) -> Self {
    Self {
      scheme,
      digest: None,
      material: KeyMaterial::Secret {
        mac,
        secret: secret.to_vec(),
      },
      options: SignatureOptionsOverride::default(),
    }
  }
}

/* ---------------------------------------- */
/// A resolved signing/verification context: identifier, merged options,
/// digest algorithm and the signing primitive. Stateless beyond
/// configuration; concurrent operations construct their own buffers and MAC
/// contexts.
pub struct SignatureKey {
  key_id: String,
  scheme: SignatureScheme,
  digest: DigestAlgorithm,
  options: SignatureOptions,
  shared: SharedKey,
}

impl SignatureKey {
  /// Build a key from its configuration, applying the scheme-to-key coercion
  /// rules and merging per-key option overrides over the base record.
  pub(crate) fn try_new(key_id: &str, config: KeyConfig, base: &SignatureOptionsOverride) -> SigResult<Self> {
    let options = merge_options(&config.options, base)?;
    let (digest, shared) = match config.scheme {
      SignatureScheme::Hs2019 => match config.material {
        KeyMaterial::Secret { mac, secret } => (config.digest.unwrap_or_default(), SharedKey::new(&mac, &secret)),
        KeyMaterial::KeyPair(keypair) => {
          keypair.validate()?;
          return Err(ConfigurationError::KeyPairUnsupported.into());
        }
      },
      SignatureScheme::HmacSha256 => match config.material {
        KeyMaterial::Secret { secret, .. } => (
          DigestAlgorithm::Sha256,
          SharedKey::new(&MacAlgorithm::HmacSha256, &secret),
        ),
        KeyMaterial::KeyPair(_) => {
          return Err(ConfigurationError::KeyTypeMismatch("hmac-sha256 requires a shared secret".to_string()).into());
        }
      },
      SignatureScheme::RsaSha256 | SignatureScheme::EcdsaSha256 => {
        if let KeyMaterial::KeyPair(keypair) = &config.material {
          keypair.validate()?;
        }
        return Err(ConfigurationError::KeyPairUnsupported.into());
      }
    };
    Ok(Self {
      key_id: key_id.to_string(),
      scheme: config.scheme,
      digest,
      options,
      shared,
    })
  }

  pub fn key_id(&self) -> &str {
    &self.key_id
  }

  pub fn scheme(&self) -> SignatureScheme {
    self.scheme
  }

  pub fn digest_algorithm(&self) -> DigestAlgorithm {
    self.digest
  }

  pub fn options(&self) -> &SignatureOptions {
    &self.options
  }

  /* ----- digest ----- */
  /// Build the `Digest` header value for the given body
  pub fn create_digest_header(&self, body: &[u8]) -> String {
    self.digest.digest_header(body)
  }

  /// Verify a `Digest` header value against the given body in constant time
  pub fn verify_digest_header(&self, body: &[u8], header: &str) -> SigResult<()> {
    self.digest.verify_digest_header(body, header)
  }

  /* ----- signing ----- */
  /// Sign a request context, returning the `Signature` parameter string
  pub fn sign_request<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>) -> SigResult<String> {
    self.sign_with(ctx, &self.options.request_headers)
  }

  /// Sign a response context, returning the `Signature` parameter string
  pub fn sign_response<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>) -> SigResult<String> {
    self.sign_with(ctx, &self.options.response_headers)
  }

  fn sign_with<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>, roles: &HeaderRoles) -> SigResult<String> {
    let mut headers = roles
      .iter()
      .filter(|(_, role)| role.signed())
      .map(|(name, _)| name.to_ascii_lowercase())
      .collect::<Vec<_>>();
    if self.options.calculate_digest && !headers.iter().any(|name| name == DIGEST_HEADER) {
      headers.push(DIGEST_HEADER.to_string());
    }

    // the canonical string is committed before the MAC runs
    let canonical = ctx.canonical_string(&headers)?;
    debug!("Sign canonical string of {} headers with {}", headers.len(), self.scheme);
    let signature = self.shared.sign(canonical.as_bytes());

    let params = SignatureParams {
      key_id: self.key_id.clone(),
      signature,
      headers,
      algorithm: Some(self.scheme),
      created: ctx.created(),
      expires: ctx.expires(),
      observed_at: SystemTime::now(),
    };
    Ok(params.to_string())
  }

  /* ----- verification ----- */
  /// Verify the signature carried by a request context
  pub fn verify_request<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>) -> SigResult<()> {
    self.verify_with(ctx, &self.options.request_headers)
  }

  /// Verify the signature carried by a response context
  pub fn verify_response<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>) -> SigResult<()> {
    self.verify_with(ctx, &self.options.response_headers)
  }

  fn verify_with<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>, roles: &HeaderRoles) -> SigResult<()> {
    let raw = ctx.signature_header()?.ok_or(VerificationError::MissingSignature)?;
    let params = SignatureParams::try_from(raw.as_str())?;

    // algorithm agreement comes before any MAC work
    if let Some(declared) = params.algorithm {
      if declared != self.scheme {
        return Err(
          VerificationError::AlgorithmMismatch {
            expected: self.scheme.to_string(),
            found: declared.to_string(),
          }
          .into(),
        );
      }
    }

    // the canonical string is rebuilt over the signature's declared header
    // list, under the signature's declared timestamps
    let ctx = ctx.timestamped(params.created, params.expires);
    let canonical = ctx.canonical_string(&params.headers)?;
    self.shared.verify(canonical.as_bytes(), &params.signature)?;

    let mut missing = roles
      .iter()
      .filter(|(_, role)| role.required())
      .map(|(name, _)| name.to_ascii_lowercase())
      .filter(|name| !params.headers.contains(name))
      .collect::<Vec<_>>();
    if self.options.calculate_digest
      && !params.headers.iter().any(|name| name == DIGEST_HEADER)
      && !missing.iter().any(|name| name == DIGEST_HEADER)
    {
      missing.push(DIGEST_HEADER.to_string());
    }
    if !missing.is_empty() {
      return Err(VerificationError::MissingSignedHeaders(missing).into());
    }

    if !params.valid_creation() {
      return Err(VerificationError::CreatedInFuture.into());
    }
    if !params.valid_expires() {
      return Err(VerificationError::Expired.into());
    }
    debug!("Signature by key {} verified", params.key_id);
    Ok(())
  }
}

/* ---------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    crypto::{EcdsaEncoding, KeyPairAlgorithm},
    error::SignatureError,
    options::HeaderRole,
    testing::TestMessage,
  };

  const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

  fn hs2019_key() -> SignatureKey {
    let config = KeyConfig::hmac(SignatureScheme::Hs2019, MacAlgorithm::HmacSha256, SECRET);
    SignatureKey::try_new("test-key", config, &SignatureOptionsOverride::defaults()).unwrap()
  }

  fn signed_request(key: &SignatureKey) -> TestMessage {
    let mut message = TestMessage::new(&[("host", &["example.org"])], Some(("POST", "/foo?param=value")));
    let body = br#"{"hello":"world"}"#;
    message.set("digest", &key.create_digest_header(body));
    let signature = key.sign_request(&MessageContext::new(&message)).unwrap();
    message.set("signature", &signature);
    message
  }

  #[test]
  fn sign_then_verify_round_trips() {
    let key = hs2019_key();
    let message = signed_request(&key);
    assert!(key.verify_request(&MessageContext::new(&message)).is_ok());
  }

  #[test]
  fn emitted_signature_wire_format() {
    let key = hs2019_key();
    let message = signed_request(&key);
    let signature = message.header("signature").unwrap().pop().unwrap();
    assert!(signature.starts_with(r##"keyId="test-key",algorithm="hs2019",headers="(request-target) host digest",signature=""##));
  }

  #[test]
  fn tampered_header_fails() {
    let key = hs2019_key();
    let mut message = signed_request(&key);
    message.set("host", "attacker.example.org");
    assert!(key.verify_request(&MessageContext::new(&message)).is_err());
  }

  #[test]
  fn tampered_mac_fails() {
    let key = hs2019_key();
    let mut message = signed_request(&key);
    let signature = message.header("signature").unwrap().pop().unwrap();
    let mut params = SignatureParams::try_from(signature.as_str()).unwrap();
    params.signature[0] ^= 0x01;
    message.set("signature", &params.to_string());
    assert!(key.verify_request(&MessageContext::new(&message)).is_err());
  }

  #[test]
  fn missing_signature_fails() {
    let key = hs2019_key();
    let message = TestMessage::new(&[("host", &["example.org"])], Some(("GET", "/")));
    let res = key.verify_request(&MessageContext::new(&message));
    assert!(matches!(
      res,
      Err(SignatureError::Verification(VerificationError::MissingSignature))
    ));
  }

  #[test]
  fn algorithm_disagreement_fails_before_mac() {
    let key = hs2019_key();
    let mut message = signed_request(&key);
    let signature = message.header("signature").unwrap().pop().unwrap();
    message.set("signature", &signature.replacen("hs2019", "rsa-sha256", 1));
    let res = key.verify_request(&MessageContext::new(&message));
    assert!(matches!(
      res,
      Err(SignatureError::Verification(VerificationError::AlgorithmMismatch { .. }))
    ));
  }

  #[test]
  fn signature_without_algorithm_is_accepted() {
    let key = hs2019_key();
    let mut message = signed_request(&key);
    let signature = message.header("signature").unwrap().pop().unwrap();
    message.set("signature", &signature.replacen(r##"algorithm="hs2019","##, "", 1));
    // the MAC was computed over the same canonical string, so stripping the
    // optional algorithm parameter alone must not break verification
    assert!(key.verify_request(&MessageContext::new(&message)).is_ok());
  }

  #[test]
  fn locally_required_header_must_be_signed() {
    let signer_config = KeyConfig {
      options: SignatureOptionsOverride {
        request_headers: Some(HeaderRoles::from_iter([
          ("(request-target)".to_string(), HeaderRole::Both),
          ("host".to_string(), HeaderRole::Both),
        ])),
        calculate_digest: Some(false),
        ..Default::default()
      },
      ..KeyConfig::hmac(SignatureScheme::Hs2019, MacAlgorithm::HmacSha256, SECRET)
    };
    let signer = SignatureKey::try_new("test-key", signer_config, &SignatureOptionsOverride::defaults()).unwrap();

    let mut message = TestMessage::new(
      &[("host", &["example.org"]), ("date", &["Tue, 07 Jun 2014 20:51:35 GMT"])],
      Some(("GET", "/")),
    );
    let signature = signer.sign_request(&MessageContext::new(&message)).unwrap();
    message.set("signature", &signature);

    // the verifier additionally demands date and digest
    let verifier_config = KeyConfig {
      options: SignatureOptionsOverride {
        request_headers: Some(HeaderRoles::from_iter([
          ("host".to_string(), HeaderRole::Both),
          ("date".to_string(), HeaderRole::Verify),
        ])),
        ..Default::default()
      },
      ..KeyConfig::hmac(SignatureScheme::Hs2019, MacAlgorithm::HmacSha256, SECRET)
    };
    let verifier = SignatureKey::try_new("test-key", verifier_config, &SignatureOptionsOverride::defaults()).unwrap();
    let res = verifier.verify_request(&MessageContext::new(&message));
    assert!(matches!(
      res,
      Err(SignatureError::Verification(VerificationError::MissingSignedHeaders(names)))
        if names == vec!["date".to_string(), "digest".to_string()]
    ));
  }

  #[test]
  fn response_signing_uses_response_roles() {
    let config = KeyConfig {
      options: SignatureOptionsOverride {
        response_headers: Some(HeaderRoles::from_iter([("date".to_string(), HeaderRole::Both)])),
        calculate_digest: Some(false),
        ..Default::default()
      },
      ..KeyConfig::hmac(SignatureScheme::Hs2019, MacAlgorithm::HmacSha256, SECRET)
    };
    let key = SignatureKey::try_new("test-key", config, &SignatureOptionsOverride::defaults()).unwrap();

    let mut message = TestMessage::new(&[("date", &["Tue, 07 Jun 2014 20:51:35 GMT"])], None);
    let signature = key.sign_response(&MessageContext::new(&message)).unwrap();
    assert!(signature.contains(r##"headers="date""##));
    message.set("signature", &signature);
    assert!(key.verify_response(&MessageContext::new(&message)).is_ok());
  }

  #[test]
  fn legacy_scheme_forces_sha256_digest() {
    let config = KeyConfig {
      digest: Some(DigestAlgorithm::Sha512),
      ..KeyConfig::hmac(SignatureScheme::HmacSha256, MacAlgorithm::HmacSha512, SECRET)
    };
    let key = SignatureKey::try_new("legacy", config, &SignatureOptionsOverride::defaults()).unwrap();
    assert_eq!(key.digest_algorithm(), DigestAlgorithm::Sha256);
    assert!(key.create_digest_header(b"x").starts_with("SHA-256="));
  }

  #[test]
  fn keypair_schemes_are_rejected() {
    let keypair = KeyPairConfig {
      algorithm: KeyPairAlgorithm::Ecdsa,
      hash: "sha256".to_string(),
      public_key: b"-----BEGIN PUBLIC KEY-----".to_vec(),
      private_key: None,
      padding: None,
      salt_length: None,
      dsa_encoding: Some(EcdsaEncoding::Der),
    };
    let config = KeyConfig {
      scheme: SignatureScheme::EcdsaSha256,
      digest: None,
      material: KeyMaterial::KeyPair(keypair),
      options: SignatureOptionsOverride::default(),
    };
    let res = SignatureKey::try_new("test-key", config, &SignatureOptionsOverride::defaults());
    assert!(matches!(
      res,
      Err(SignatureError::Configuration(ConfigurationError::KeyPairUnsupported))
    ));
  }

  #[test]
  fn keypair_validation_runs_before_rejection() {
    let keypair = KeyPairConfig {
      algorithm: KeyPairAlgorithm::Rsa,
      hash: "md5".to_string(),
      public_key: b"-----BEGIN PUBLIC KEY-----".to_vec(),
      private_key: None,
      padding: None,
      salt_length: None,
      dsa_encoding: None,
    };
    let config = KeyConfig {
      scheme: SignatureScheme::RsaSha256,
      digest: None,
      material: KeyMaterial::KeyPair(keypair),
      options: SignatureOptionsOverride::default(),
    };
    let res = SignatureKey::try_new("test-key", config, &SignatureOptionsOverride::defaults());
    assert!(matches!(
      res,
      Err(SignatureError::Configuration(ConfigurationError::UnsupportedHash(hash))) if hash == "md5"
    ));
  }

  #[test]
  fn secret_required_for_legacy_scheme() {
    let keypair = KeyPairConfig {
      algorithm: KeyPairAlgorithm::Rsa,
      hash: "sha256".to_string(),
      public_key: b"-----BEGIN PUBLIC KEY-----".to_vec(),
      private_key: None,
      padding: None,
      salt_length: None,
      dsa_encoding: None,
    };
    let config = KeyConfig {
      scheme: SignatureScheme::HmacSha256,
      digest: None,
      material: KeyMaterial::KeyPair(keypair),
      options: SignatureOptionsOverride::default(),
    };
    let res = SignatureKey::try_new("test-key", config, &SignatureOptionsOverride::defaults());
    assert!(matches!(
      res,
      Err(SignatureError::Configuration(ConfigurationError::KeyTypeMismatch(_)))
    ));
  }

  #[test]
  fn digest_disabled_drops_requirement() {
    let config = KeyConfig {
      options: SignatureOptionsOverride {
        calculate_digest: Some(false),
        ..Default::default()
      },
      ..KeyConfig::hmac(SignatureScheme::Hs2019, MacAlgorithm::HmacSha256, SECRET)
    };
    let key = SignatureKey::try_new("test-key", config, &SignatureOptionsOverride::defaults()).unwrap();

    let mut message = TestMessage::new(&[("host", &["example.org"])], Some(("GET", "/")));
    let signature = key.sign_request(&MessageContext::new(&message)).unwrap();
    assert!(!signature.contains("digest"));
    message.set("signature", &signature);
    assert!(key.verify_request(&MessageContext::new(&message)).is_ok());
  }
}
