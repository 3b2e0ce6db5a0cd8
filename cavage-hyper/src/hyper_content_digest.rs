use crate::{
  error::{HyperSigError, HyperSigResult},
  DIGEST_HEADER,
};
use bytes::Bytes;
use cavage::prelude::DigestAlgorithm;
use http::{Request, Response};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use std::future::Future;

/* --------------------------------------- */
/// Collects a message body into memory so it can be digested and re-attached
pub trait ContentDigest: http_body::Body {
  /// Returns the bytes object of the body
  fn into_bytes(self) -> impl Future<Output = Result<Bytes, Self::Error>> + Send
  where
    Self: Sized + Send,
    Self::Data: Send,
  {
    async { Ok(self.collect().await?.to_bytes()) }
  }
}

impl<T: ?Sized> ContentDigest for T where T: http_body::Body {}

/* --------------------------------------- */
/// Set or verify the `Digest` header on a hyper request
pub trait RequestContentDigest {
  type Error;

  fn set_digest_header(
    self,
    alg: &DigestAlgorithm,
  ) -> impl Future<Output = Result<Request<Full<Bytes>>, Self::Error>> + Send
  where
    Self: Sized;

  /// Checks the present `Digest` header against the body, returning the
  /// reassembled request on success
  fn verify_digest_header(self) -> impl Future<Output = Result<Request<Full<Bytes>>, Self::Error>> + Send
  where
    Self: Sized;
}

/// Set or verify the `Digest` header on a hyper response
pub trait ResponseContentDigest {
  type Error;

  fn set_digest_header(
    self,
    alg: &DigestAlgorithm,
  ) -> impl Future<Output = Result<Response<Full<Bytes>>, Self::Error>> + Send
  where
    Self: Sized;

  fn verify_digest_header(self) -> impl Future<Output = Result<Response<Full<Bytes>>, Self::Error>> + Send
  where
    Self: Sized;
}

impl<B> RequestContentDigest for Request<B>
where
  B: Body + Send,
  B::Data: Send,
  B::Error: std::fmt::Display,
{
  type Error = HyperSigError;

  async fn set_digest_header(self, alg: &DigestAlgorithm) -> HyperSigResult<Request<Full<Bytes>>> {
    let (mut parts, body) = self.into_parts();
    let body_bytes = collect_body(body).await?;
    parts
      .headers
      .insert(DIGEST_HEADER, alg.digest_header(&body_bytes).parse()?);
    Ok(Request::from_parts(parts, Full::new(body_bytes)))
  }

  async fn verify_digest_header(self) -> HyperSigResult<Request<Full<Bytes>>> {
    let (parts, body) = self.into_parts();
    let body_bytes = collect_body(body).await?;
    verify_digest(&parts.headers, &body_bytes)?;
    Ok(Request::from_parts(parts, Full::new(body_bytes)))
  }
}

impl<B> ResponseContentDigest for Response<B>
where
  B: Body + Send,
  B::Data: Send,
  B::Error: std::fmt::Display,
{
  type Error = HyperSigError;

  async fn set_digest_header(self, alg: &DigestAlgorithm) -> HyperSigResult<Response<Full<Bytes>>> {
    let (mut parts, body) = self.into_parts();
    let body_bytes = collect_body(body).await?;
    parts
      .headers
      .insert(DIGEST_HEADER, alg.digest_header(&body_bytes).parse()?);
    Ok(Response::from_parts(parts, Full::new(body_bytes)))
  }

  async fn verify_digest_header(self) -> HyperSigResult<Response<Full<Bytes>>> {
    let (parts, body) = self.into_parts();
    let body_bytes = collect_body(body).await?;
    verify_digest(&parts.headers, &body_bytes)?;
    Ok(Response::from_parts(parts, Full::new(body_bytes)))
  }
}

/* --------------------------------------- */
pub(crate) async fn collect_body<B>(body: B) -> HyperSigResult<Bytes>
where
  B: Body + Send,
  B::Data: Send,
  B::Error: std::fmt::Display,
{
  body
    .into_bytes()
    .await
    .map_err(|e| HyperSigError::HttpBodyError(e.to_string()))
}

/// The algorithm to check against is the one the header itself names
pub(crate) fn verify_digest(headers: &http::HeaderMap, body: &[u8]) -> HyperSigResult<()> {
  use cavage::prelude::VerificationError;
  let Some(header) = headers.get(DIGEST_HEADER) else {
    return Err(
      cavage::prelude::SignatureError::from(VerificationError::DigestMismatch(
        "no digest header on message".to_string(),
      ))
      .into(),
    );
  };
  let header = header.to_str()?;
  let alg = header
    .split_once('=')
    .map(|(token, _)| token)
    .unwrap_or(header)
    .parse::<DigestAlgorithm>()
    .map_err(cavage::prelude::SignatureError::from)?;
  alg.verify_digest_header(body, header)?;
  Ok(())
}

/* --------------------------------------- */
