use crate::{
  error::{ConfigurationError, SigResult, VerificationError},
  key::{KeyConfig, SignatureKey},
  message::HttpMessage,
  options::SignatureOptionsOverride,
  signature_base::MessageContext,
  signature_params::SignatureParams,
  trace::*,
};
use futures::future::BoxFuture;
use std::sync::Arc;

/// The single supported wire version
pub const SUPPORTED_VERSION: &str = "draft-cavage-http-signatures-12";

/* ---------------------------------------- */
/// Application-provided resolver from `keyId` to a key configuration.
///
/// The lookup is the engine's sole suspension point; trivial lookups resolve
/// immediately. A resolver that fails or is cancelled reports
/// [`ConfigurationError::KeyLookupFailed`]; an unknown id is `Ok(None)`.
pub trait KeyLookup: Send + Sync {
  fn lookup<'a>(&'a self, key_id: &'a str) -> BoxFuture<'a, SigResult<Option<KeyConfig>>>;
}

/// Adapter turning a plain function into an immediately-resolving [`KeyLookup`]
pub struct LookupFn<F>(pub F);

impl<F> KeyLookup for LookupFn<F>
where
  F: Fn(&str) -> SigResult<Option<KeyConfig>> + Send + Sync,
{
  fn lookup<'a>(&'a self, key_id: &'a str) -> BoxFuture<'a, SigResult<Option<KeyConfig>>> {
    Box::pin(futures::future::ready((self.0)(key_id)))
  }
}

enum KeySource {
  Fixed { key_id: String, config: KeyConfig },
  Lookup(Arc<dyn KeyLookup>),
}

/* ---------------------------------------- */
/// Resolves `keyId`s to signature keys and runs the signing and verification
/// flows end to end.
///
/// Immutable after construction: the base option record is frozen, so
/// concurrent operations against one manager need no locking.
pub struct SignatureKeyManager {
  base_options: SignatureOptionsOverride,
  source: KeySource,
}

impl SignatureKeyManager {
  /// Manager bound to a single `(keyId, config)` pair. Lookups with any
  /// other id resolve to absent.
  pub fn with_fixed_key(
    version: &str,
    key_id: &str,
    config: KeyConfig,
    options: SignatureOptionsOverride,
  ) -> SigResult<Self> {
    Ok(Self {
      base_options: base_options(version, options)?,
      source: KeySource::Fixed {
        key_id: key_id.to_string(),
        config,
      },
    })
  }

  /// Manager backed by an injected resolver
  pub fn with_key_lookup(version: &str, lookup: impl KeyLookup + 'static, options: SignatureOptionsOverride) -> SigResult<Self> {
    Ok(Self {
      base_options: base_options(version, options)?,
      source: KeySource::Lookup(Arc::new(lookup)),
    })
  }

  /// Resolve a key or report it absent
  pub async fn try_get_key(&self, key_id: &str) -> SigResult<Option<SignatureKey>> {
    let config = match &self.source {
      KeySource::Fixed { key_id: fixed, config } => (fixed == key_id).then(|| config.clone()),
      KeySource::Lookup(lookup) => {
        debug!("Resolve key {key_id} through the injected lookup");
        lookup.lookup(key_id).await?
      }
    };
    config
      .map(|config| SignatureKey::try_new(key_id, config, &self.base_options))
      .transpose()
  }

  /// Resolve a key or fail verification
  pub async fn get_key(&self, key_id: &str) -> SigResult<SignatureKey> {
    self
      .try_get_key(key_id)
      .await?
      .ok_or_else(|| VerificationError::KeyNotFound(key_id.to_string()).into())
  }

  /* ----- end-to-end flows ----- */
  /// Sign a request context under the named key
  pub async fn sign_request<M: HttpMessage + ?Sized>(
    &self,
    key_id: &str,
    ctx: &MessageContext<'_, M>,
  ) -> SigResult<String> {
    self.get_key(key_id).await?.sign_request(ctx)
  }

  /// Sign a response context under the named key
  pub async fn sign_response<M: HttpMessage + ?Sized>(
    &self,
    key_id: &str,
    ctx: &MessageContext<'_, M>,
  ) -> SigResult<String> {
    self.get_key(key_id).await?.sign_response(ctx)
  }

  /// Verify the signature on a request context, resolving the key the
  /// signature itself declares. Returns the verified key id.
  pub async fn verify_request<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>) -> SigResult<String> {
    let key = self.declared_key(ctx).await?;
    key.verify_request(ctx)?;
    Ok(key.key_id().to_string())
  }

  /// Verify the signature on a response context. Returns the verified key id.
  pub async fn verify_response<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>) -> SigResult<String> {
    let key = self.declared_key(ctx).await?;
    key.verify_response(ctx)?;
    Ok(key.key_id().to_string())
  }

  async fn declared_key<M: HttpMessage + ?Sized>(&self, ctx: &MessageContext<'_, M>) -> SigResult<SignatureKey> {
    let raw = ctx.signature_header()?.ok_or(VerificationError::MissingSignature)?;
    let params = SignatureParams::try_from(raw.as_str())?;
    self.get_key(&params.key_id).await
  }
}

fn base_options(version: &str, options: SignatureOptionsOverride) -> SigResult<SignatureOptionsOverride> {
  if version != SUPPORTED_VERSION {
    return Err(ConfigurationError::UnsupportedVersion(version.to_string()).into());
  }
  Ok(options.or(&SignatureOptionsOverride::defaults()))
}

/* ---------------------------------------- */
