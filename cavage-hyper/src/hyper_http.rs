use crate::{
  error::{HyperSigError, HyperSigResult},
  hyper_content_digest::collect_body,
  DIGEST_HEADER, SIGNATURE_HEADER,
};
use bytes::Bytes;
use cavage::prelude::{
  HttpMessage, MessageContext, RequestTarget, SignatureError, SignatureKeyManager, SignatureParams, VerificationError,
};
use http::{HeaderMap, Request, Response};
use http_body::Body;
use http_body_util::Full;
use std::future::Future;

/// A type alias for the verified key id
type KeyId = String;

/* --------------------------------------- */
/// View of a hyper request through the engine's message contract
pub struct RequestMessage<'a, B>(pub &'a Request<B>);

/// View of a hyper response through the engine's message contract
pub struct ResponseMessage<'a, B>(pub &'a Response<B>);

fn header_values(headers: &HeaderMap, name: &str) -> Option<Vec<String>> {
  let values = headers
    .get_all(name)
    .iter()
    .filter_map(|v| v.to_str().ok().map(str::to_string))
    .collect::<Vec<_>>();
  (!values.is_empty()).then_some(values)
}

impl<B> HttpMessage for RequestMessage<'_, B> {
  fn header(&self, name: &str) -> Option<Vec<String>> {
    header_values(self.0.headers(), name)
  }

  fn request_target(&self) -> Option<RequestTarget> {
    let path = self
      .0
      .uri()
      .path_and_query()
      .map_or_else(|| self.0.uri().path().to_string(), |pq| pq.as_str().to_string());
    Some(RequestTarget {
      method: self.0.method().as_str().to_string(),
      path,
    })
  }
}

impl<B> HttpMessage for ResponseMessage<'_, B> {
  fn header(&self, name: &str) -> Option<Vec<String>> {
    header_values(self.0.headers(), name)
  }
}

/* --------------------------------------- */
/// Sign and verify hyper requests through a [`SignatureKeyManager`]
pub trait RequestMessageSignature {
  type Error;

  /// Sign the request under the named key. When the key calculates digests
  /// and no `Digest` header is present, one is written onto the message
  /// before the canonical string is built, so the peer sees the signed value.
  fn sign_message(
    self,
    manager: &SignatureKeyManager,
    key_id: &str,
  ) -> impl Future<Output = Result<Request<Full<Bytes>>, Self::Error>> + Send
  where
    Self: Sized;

  /// Verify the signature the request carries, resolving the key it
  /// declares. The `Digest` header, when present, is checked against the
  /// collected body under the key's digest algorithm. Returns the
  /// reassembled request and the verified key id.
  fn verify_message(
    self,
    manager: &SignatureKeyManager,
  ) -> impl Future<Output = Result<(Request<Full<Bytes>>, KeyId), Self::Error>> + Send
  where
    Self: Sized;

  /// Check if the request carries a signature candidate
  fn has_message_signature(&self) -> bool;
}

impl<B> RequestMessageSignature for Request<B>
where
  B: Body + Send + Sync,
  B::Data: Send,
  B::Error: std::fmt::Display,
{
  type Error = HyperSigError;

  async fn sign_message(self, manager: &SignatureKeyManager, key_id: &str) -> HyperSigResult<Request<Full<Bytes>>> {
    let key = manager.get_key(key_id).await?;
    let (mut parts, body) = self.into_parts();
    let body_bytes = collect_body(body).await?;
    if key.options().calculate_digest && !parts.headers.contains_key(DIGEST_HEADER) {
      parts
        .headers
        .insert(DIGEST_HEADER, key.create_digest_header(&body_bytes).parse()?);
    }
    let req = Request::from_parts(parts, Full::new(body_bytes));
    let message = RequestMessage(&req);
    let signature = key.sign_request(&MessageContext::new(&message))?;

    let (mut parts, body) = req.into_parts();
    parts.headers.insert(SIGNATURE_HEADER, signature.parse()?);
    Ok(Request::from_parts(parts, body))
  }

  async fn verify_message(self, manager: &SignatureKeyManager) -> HyperSigResult<(Request<Full<Bytes>>, KeyId)> {
    let (parts, body) = self.into_parts();
    let body_bytes = collect_body(body).await?;
    let req = Request::from_parts(parts, Full::new(body_bytes.clone()));
    let message = RequestMessage(&req);

    let key_id = declared_key_id(&MessageContext::new(&message))?;
    let key = manager.get_key(&key_id).await?;
    if let Some(digest) = req.headers().get(DIGEST_HEADER) {
      key.verify_digest_header(&body_bytes, digest.to_str()?)?;
    }
    key.verify_request(&MessageContext::new(&message))?;
    Ok((req, key_id))
  }

  fn has_message_signature(&self) -> bool {
    has_signature_candidate(self.headers())
  }
}

/* --------------------------------------- */
/// Sign and verify hyper responses through a [`SignatureKeyManager`]
pub trait ResponseMessageSignature {
  type Error;

  fn sign_message(
    self,
    manager: &SignatureKeyManager,
    key_id: &str,
  ) -> impl Future<Output = Result<Response<Full<Bytes>>, Self::Error>> + Send
  where
    Self: Sized;

  fn verify_message(
    self,
    manager: &SignatureKeyManager,
  ) -> impl Future<Output = Result<(Response<Full<Bytes>>, KeyId), Self::Error>> + Send
  where
    Self: Sized;

  fn has_message_signature(&self) -> bool;
}

impl<B> ResponseMessageSignature for Response<B>
where
  B: Body + Send + Sync,
  B::Data: Send,
  B::Error: std::fmt::Display,
{
  type Error = HyperSigError;

  async fn sign_message(self, manager: &SignatureKeyManager, key_id: &str) -> HyperSigResult<Response<Full<Bytes>>> {
    let key = manager.get_key(key_id).await?;
    let (mut parts, body) = self.into_parts();
    let body_bytes = collect_body(body).await?;
    if key.options().calculate_digest && !parts.headers.contains_key(DIGEST_HEADER) {
      parts
        .headers
        .insert(DIGEST_HEADER, key.create_digest_header(&body_bytes).parse()?);
    }
    let res = Response::from_parts(parts, Full::new(body_bytes));
    let message = ResponseMessage(&res);
    let signature = key.sign_response(&MessageContext::new(&message))?;

    let (mut parts, body) = res.into_parts();
    parts.headers.insert(SIGNATURE_HEADER, signature.parse()?);
    Ok(Response::from_parts(parts, body))
  }

  async fn verify_message(self, manager: &SignatureKeyManager) -> HyperSigResult<(Response<Full<Bytes>>, KeyId)> {
    let (parts, body) = self.into_parts();
    let body_bytes = collect_body(body).await?;
    let res = Response::from_parts(parts, Full::new(body_bytes.clone()));
    let message = ResponseMessage(&res);

    let key_id = declared_key_id(&MessageContext::new(&message))?;
    let key = manager.get_key(&key_id).await?;
    if let Some(digest) = res.headers().get(DIGEST_HEADER) {
      key.verify_digest_header(&body_bytes, digest.to_str()?)?;
    }
    key.verify_response(&MessageContext::new(&message))?;
    Ok((res, key_id))
  }

  fn has_message_signature(&self) -> bool {
    has_signature_candidate(self.headers())
  }
}

/* --------------------------------------- */
fn declared_key_id<M: HttpMessage + ?Sized>(ctx: &MessageContext<'_, M>) -> HyperSigResult<KeyId> {
  let raw = ctx
    .signature_header()?
    .ok_or_else(|| SignatureError::from(VerificationError::MissingSignature))?;
  let params = SignatureParams::try_from(raw.as_str())?;
  Ok(params.key_id)
}

fn has_signature_candidate(headers: &HeaderMap) -> bool {
  headers.contains_key(SIGNATURE_HEADER)
    || headers
      .get_all(http::header::AUTHORIZATION)
      .iter()
      .any(|v| v.to_str().map(|v| v.starts_with("Signature ")).unwrap_or(false))
}
