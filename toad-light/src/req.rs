#[doc(inline)]
pub use toad::req::Method;

/// A request as handed to a [`Context`](crate::transport::Context):
/// method, target URI, Uri-Query arguments and payload.
///
/// ```
/// use toad_light::req::{Method, Req};
///
/// let mut req = Req::put("coap://[::1]/api/v1/state");
/// req.add_query("auth=secret");
/// req.set_payload(r#"{"on":{"value":true}}"#);
///
/// assert_eq!(req.method(), Method::PUT);
/// assert_eq!(req.query(), &["auth=secret".to_string()]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Req {
  method: Method,
  uri: String,
  query: Vec<String>,
  payload: Vec<u8>,
}

impl Req {
  /// Create a request with no query and no payload
  pub fn new(method: Method, uri: impl Into<String>) -> Self {
    Self { method,
           uri: uri.into(),
           query: Vec::new(),
           payload: Vec::new() }
  }

  /// Creates a GET request
  pub fn get(uri: impl Into<String>) -> Self {
    Self::new(Method::GET, uri)
  }

  /// Creates a PUT request
  pub fn put(uri: impl Into<String>) -> Self {
    Self::new(Method::PUT, uri)
  }

  /// Creates a POST request
  pub fn post(uri: impl Into<String>) -> Self {
    Self::new(Method::POST, uri)
  }

  /// Append a `key=value` Uri-Query argument
  pub fn add_query(&mut self, arg: impl Into<String>) {
    self.query.push(arg.into());
  }

  /// Set the payload of the request
  pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
    self.payload = payload.into();
  }

  /// Get the request method
  pub fn method(&self) -> Method {
    self.method
  }

  /// Get the target URI
  pub fn uri(&self) -> &str {
    &self.uri
  }

  /// Get the Uri-Query arguments
  pub fn query(&self) -> &[String] {
    &self.query
  }

  /// Get the payload
  pub fn payload(&self) -> &[u8] {
    &self.payload
  }
}

/// Name of a request method as it appears in logs
pub(crate) fn method_name(method: Method) -> String {
  match method {
    | Method::GET => "GET".into(),
    | Method::POST => "POST".into(),
    | Method::PUT => "PUT".into(),
    | Method::DELETE => "DELETE".into(),
    | other => other.code().to_string(),
  }
}
