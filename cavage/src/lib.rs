//! # cavage
//!
//! Signature engine for [draft-cavage-http-signatures-12](https://datatracker.ietf.org/doc/html/draft-cavage-http-signatures-12):
//! canonicalization of HTTP messages, strict parsing of the `Signature`
//! header parameter list, HMAC signing and verification with constant-time
//! comparison, keyed body digests, and a key manager resolving `keyId`s to
//! configured signing contexts.
//!
//! The engine is a pure library. It consumes messages through the narrow
//! [`prelude::HttpMessage`] contract and never touches sockets or a concrete
//! HTTP framework; see the companion `cavage-hyper` crate for the hyper
//! adapter.

mod crypto;
mod error;
mod key;
mod manager;
mod message;
mod options;
mod signature_base;
mod signature_params;
#[cfg(test)]
mod testing;
mod trace;

pub mod prelude {
  pub use crate::{
    crypto::{
      DigestAlgorithm, EcdsaEncoding, KeyPairAlgorithm, KeyPairConfig, MacAlgorithm, RsaPadding, SharedKey,
      SignatureScheme,
    },
    error::{ConfigurationError, SigResult, SignatureError, VerificationError},
    key::{KeyConfig, KeyMaterial, SignatureKey},
    manager::{KeyLookup, LookupFn, SignatureKeyManager, SUPPORTED_VERSION},
    message::{HttpMessage, RequestTarget},
    options::{HeaderRole, HeaderRoles, SignatureOptions, SignatureOptionsOverride},
    signature_base::MessageContext,
    signature_params::{SignatureParams, CREATED_SLACK, EXPIRES_SLACK},
  };
}

/* ----------------------------------------------------------------- */
