use cavage::prelude::SignatureError;
use http::StatusCode;
use thiserror::Error;

/// Result type for http signature handling over hyper messages
pub type HyperSigResult<T> = std::result::Result<T, HyperSigError>;

/// Error type for http signature handling over hyper messages
#[derive(Error, Debug)]
pub enum HyperSigError {
  /// Inherited from the signature engine
  #[error("Signature error: {0}")]
  Signature(#[from] SignatureError),

  /// Http body error
  #[error("Http body error: {0}")]
  HttpBodyError(String),

  /// Failed to stringify a header value
  #[error("Failed to stringify header value: {0}")]
  FailedToStrHeader(#[from] http::header::ToStrError),

  /// Failed to build a header value
  #[error("Failed to build header value: {0}")]
  InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
}

impl HyperSigError {
  /// Status a server adapter should answer with: verification failures are
  /// the peer's fault (403), everything else is ours (500)
  pub fn status_code(&self) -> StatusCode {
    match self {
      Self::Signature(e) if e.is_verification() => StatusCode::FORBIDDEN,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}
