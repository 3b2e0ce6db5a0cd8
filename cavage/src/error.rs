use thiserror::Error;

/// Result type for signature operations
pub type SigResult<T> = std::result::Result<T, SignatureError>;

/// Error type for signature operations.
///
/// Exactly two failure kinds exist: [`ConfigurationError`] for structurally
/// invalid input from the programmer, and [`VerificationError`] for messages
/// failing any part of the signature check. Both bubble to the caller
/// unchanged; adapters map verification failures to 403 and everything else
/// to 500.
#[derive(Error, Debug)]
pub enum SignatureError {
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),

  #[error(transparent)]
  Verification(#[from] VerificationError),
}

impl SignatureError {
  /// True if the error is a verification failure rather than a programmer error
  pub fn is_verification(&self) -> bool {
    matches!(self, Self::Verification(_))
  }
}

/// Raised at construction or during a call when the input is structurally
/// invalid. Indicates a programmer error and is not recoverable at runtime.
#[derive(Error, Debug)]
pub enum ConfigurationError {
  /// Signature wire version other than the single supported one
  #[error("unsupported signature version: {0}")]
  UnsupportedVersion(String),

  /// Keypair schemes are reserved in the type model but not shipped
  #[error("key pair algorithms are not yet supported")]
  KeyPairUnsupported,

  /// Key material does not match the declared scheme
  #[error("key type does not match signature scheme: {0}")]
  KeyTypeMismatch(String),

  /// Hash name outside the platform-supported set
  #[error("unsupported hash algorithm: {0}")]
  UnsupportedHash(String),

  /// Signing requested on a public-key-only keypair
  #[error("signing requires a private key: {0}")]
  MissingPrivateKey(String),

  /// An option was still undefined after merging per-key overrides with the base
  #[error("signature option '{0}' is not defined")]
  MissingOption(&'static str),

  /// The injected key lookup failed or was cancelled
  #[error("key lookup failed: {0}")]
  KeyLookupFailed(String),
}

/// Raised when a message fails any part of the signature check
#[derive(Error, Debug)]
pub enum VerificationError {
  /// Signature parameter string deviates from the strict grammar
  #[error("malformed signature header: {0}")]
  MalformedSignatureHeader(String),

  /// Signature or digest value is not valid base64
  #[error("bad base64 value: {0}")]
  Base64Decode(#[from] base64::DecodeError),

  /// `algorithm` parameter outside the closed scheme set
  #[error("unsupported signature scheme: {0}")]
  UnsupportedScheme(String),

  /// No signature present on the message
  #[error("no signature found on message")]
  MissingSignature,

  /// More than one signature candidate on the message
  #[error("multiple signatures present on message")]
  MultipleSignatures,

  /// A header named in the signed header list has no value on the message
  #[error("attempted to sign/verify missing header '{0}'")]
  MissingHeader(String),

  /// The key manager has no key under the requested id
  #[error("key {0} not found")]
  KeyNotFound(String),

  /// Incoming signature declares a scheme other than the key's
  #[error("signature algorithm '{found}' does not match key algorithm '{expected}'")]
  AlgorithmMismatch { expected: String, found: String },

  /// MAC comparison failed, including length mismatches
  #[error("signature does not match")]
  SignatureMismatch,

  /// Digest header comparison failed
  #[error("digest verification failed: {0}")]
  DigestMismatch(String),

  /// Locally required headers absent from the signature's declared set
  #[error("signature is missing required headers: {}", .0.join(", "))]
  MissingSignedHeaders(Vec<String>),

  /// `created` lies in the future beyond the allowed slack
  #[error("signature created timestamp is in the future")]
  CreatedInFuture,

  /// `expires` lies in the past beyond the allowed slack
  #[error("signature has expired")]
  Expired,
}
