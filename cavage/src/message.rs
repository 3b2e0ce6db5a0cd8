/// Method and path of an HTTP request, as supplied by the framework adapter.
/// The path is carried verbatim, including any query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
  pub method: String,
  pub path: String,
}

/// The narrow contract the engine consumes from a framework adapter.
///
/// The engine never mutates the message; for outbound signing the caller
/// writes the returned `Signature` string (and the `Digest` string, if any)
/// onto the concrete message itself.
pub trait HttpMessage {
  /// All values of the named header, case-insensitive on the name, in
  /// arrival order. Absent headers yield `None`; an empty vector is not a
  /// valid result.
  fn header(&self, name: &str) -> Option<Vec<String>>;

  /// Method and path for requests. Responses return `None`.
  fn request_target(&self) -> Option<RequestTarget> {
    None
  }
}
