use crate::message::{HttpMessage, RequestTarget};

/// In-memory message for exercising the engine without a framework adapter
pub(crate) struct TestMessage {
  headers: Vec<(String, Vec<String>)>,
  target: Option<RequestTarget>,
}

impl TestMessage {
  pub(crate) fn new(headers: &[(&str, &[&str])], target: Option<(&str, &str)>) -> Self {
    Self {
      headers: headers
        .iter()
        .map(|(n, vs)| (n.to_string(), vs.iter().map(|v| v.to_string()).collect()))
        .collect(),
      target: target.map(|(method, path)| RequestTarget {
        method: method.to_string(),
        path: path.to_string(),
      }),
    }
  }

  pub(crate) fn set(&mut self, name: &str, value: &str) {
    match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
      Some((_, vs)) => *vs = vec![value.to_string()],
      None => self.headers.push((name.to_string(), vec![value.to_string()])),
    }
  }
}

impl HttpMessage for TestMessage {
  fn header(&self, name: &str) -> Option<Vec<String>> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, vs)| vs.clone())
  }

  fn request_target(&self) -> Option<RequestTarget> {
    self.target.clone()
  }
}
