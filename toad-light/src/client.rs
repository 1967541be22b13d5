use core::fmt;
use core::ops::{Deref, DerefMut};

use serde::Deserialize;

use crate::error::Error;
use crate::outcome::Outcome;
use crate::req::{method_name, Method, Req};
use crate::transport::{Context, Transport};
use crate::uri;

/// Where a device lives and how to prove we may talk to it.
///
/// Both values are stored verbatim. The token is masked when debug-printed.
///
/// ```
/// use toad_light::Endpoint;
///
/// let endpoint = Endpoint::new("fe80::1", "secret");
/// assert_eq!(format!("{:?}", endpoint),
///            r#"Endpoint { ipv6_address: "fe80::1", access_token: "******" }"#);
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
  ipv6_address: String,
  access_token: String,
}

impl Endpoint {
  /// Create an endpoint
  pub fn new(ipv6_address: impl Into<String>, access_token: impl Into<String>) -> Self {
    Self { ipv6_address: ipv6_address.into(),
           access_token: access_token.into() }
  }

  /// The device's IPv6 address, without brackets
  pub fn ipv6_address(&self) -> &str {
    &self.ipv6_address
  }

  /// The bearer token sent with every request
  pub fn access_token(&self) -> &str {
    &self.access_token
  }

  /// The Uri-Query argument carrying the access token.
  ///
  /// The token travels in cleartext; devices only accept it this way.
  pub fn auth_query(&self) -> String {
    format!("auth={}", self.access_token)
  }
}

impl fmt::Debug for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let masked = "*".repeat(self.access_token.chars().count());
    f.debug_struct("Endpoint")
     .field("ipv6_address", &self.ipv6_address)
     .field("access_token", &masked)
     .finish()
  }
}

/// A client controlling one device over CoAP
///
/// Requests need an open session. Either pair [`DeviceClient::open`] with
/// [`DeviceClient::close`], or use [`DeviceClient::session`] to get a guard
/// that closes the session when it goes out of scope.
///
/// Every request performs exactly one exchange, blocking until the
/// transport yields a response or gives up. Exchange failures are reported
/// as [`Outcome::Failure`]; only a missing session is an [`Error`].
///
/// ```no_run
/// use toad_light::udp::Udp;
/// use toad_light::DeviceClient;
///
/// let mut client = DeviceClient::new(Udp::default(), "fe80::1234:5678:90ab:cdef%3", "token");
/// let mut session = client.session().unwrap();
///
/// let info = session.get("/api/v1/info").unwrap();
/// println!("{}", serde_json::to_string(&info).unwrap());
/// ```
pub struct DeviceClient<T: Transport> {
  endpoint: Endpoint,
  transport: T,
  ctx: Option<T::Context>,
}

impl<T: Transport> fmt::Debug for DeviceClient<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DeviceClient")
     .field("endpoint", &self.endpoint)
     .field("open", &self.is_open())
     .finish()
  }
}

impl<T: Transport> DeviceClient<T> {
  /// Create a client. Performs no I/O and opens no session.
  pub fn new(transport: T, ipv6_address: impl Into<String>, access_token: impl Into<String>) -> Self {
    Self::from_endpoint(transport, Endpoint::new(ipv6_address, access_token))
  }

  /// Create a client for an existing [`Endpoint`]
  pub fn from_endpoint(transport: T, endpoint: Endpoint) -> Self {
    Self { endpoint,
           transport,
           ctx: None }
  }

  /// The device this client talks to
  pub fn endpoint(&self) -> &Endpoint {
    &self.endpoint
  }

  /// Is a session currently open?
  pub fn is_open(&self) -> bool {
    self.ctx.is_some()
  }

  /// Acquire a transport context.
  ///
  /// If a session is already open it is closed first.
  pub fn open(&mut self) -> Result<(), Error> {
    self.close();

    let ctx = self.transport
                  .open()
                  .map_err(|e| Error::Open(e.to_string()))?;

    log::debug!("opened session with [{}]", self.endpoint.ipv6_address);
    self.ctx = Some(ctx);
    Ok(())
  }

  /// Open a session that is closed when the returned guard is dropped
  pub fn session(&mut self) -> Result<Session<'_, T>, Error> {
    self.open()?;
    Ok(Session { client: self })
  }

  /// Release the transport context, if one is held
  pub fn close(&mut self) {
    if let Some(ctx) = self.ctx.take() {
      match ctx.close() {
        | Ok(()) => log::debug!("closed session with [{}]", self.endpoint.ipv6_address),
        | Err(e) => log::warn!("error closing session with [{}]: {}",
                               self.endpoint.ipv6_address,
                               e),
      }
    }
  }

  /// Build the URI of a resource on this device
  ///
  /// ```
  /// use toad_light::udp::Udp;
  /// use toad_light::DeviceClient;
  ///
  /// let client = DeviceClient::new(Udp::default(), "fe80::1234:5678:90ab:cdef", "token");
  /// assert_eq!(client.build_uri("/api/v1/info"),
  ///            "coap://[fe80::1234:5678:90ab:cdef]/api/v1/info");
  /// ```
  pub fn build_uri(&self, path: &str) -> String {
    uri::build(&self.endpoint.ipv6_address, path)
  }

  /// Send a GET request
  pub fn get(&mut self, path: &str) -> Result<Outcome, Error> {
    self.request(Method::GET, path, "")
  }

  /// Send a PUT request with a UTF-8 payload
  pub fn put(&mut self, path: &str, payload: &str) -> Result<Outcome, Error> {
    self.request(Method::PUT, path, payload)
  }

  /// Send a POST request with a UTF-8 payload
  pub fn post(&mut self, path: &str, payload: &str) -> Result<Outcome, Error> {
    self.request(Method::POST, path, payload)
  }

  fn request(&mut self, method: Method, path: &str, payload: &str) -> Result<Outcome, Error> {
    let uri = self.build_uri(path);
    let ctx = self.ctx.as_mut().ok_or(Error::SessionNotInitialized)?;

    let mut req = Req::new(method, uri);
    req.add_query(self.endpoint.auth_query());
    req.set_payload(payload.as_bytes());

    log::debug!("{} [{}]{}",
                method_name(method),
                self.endpoint.ipv6_address,
                path);

    let outcome = ctx.send(req)
                     .and_then(|token| nb::block!(ctx.poll_resp(token)))
                     .map(Outcome::from)
                     .unwrap_or_else(|e| {
                       log::debug!("{} [{}]{} failed: {}",
                                   method_name(method),
                                   self.endpoint.ipv6_address,
                                   path,
                                   e);
                       Outcome::failure(e.to_string())
                     });

    Ok(outcome)
  }
}

impl<T: Transport> Drop for DeviceClient<T> {
  fn drop(&mut self) {
    self.close();
  }
}

/// An open session, closed when dropped.
///
/// Derefs to the [`DeviceClient`] that opened it.
#[must_use = "the session is closed as soon as this guard is dropped"]
pub struct Session<'a, T: Transport> {
  client: &'a mut DeviceClient<T>,
}

impl<'a, T: Transport> Session<'a, T> {
  /// Close the session now
  pub fn close(self) {}
}

impl<'a, T: Transport> fmt::Debug for Session<'a, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Session").field(&self.client).finish()
  }
}

impl<'a, T: Transport> Deref for Session<'a, T> {
  type Target = DeviceClient<T>;

  fn deref(&self) -> &DeviceClient<T> {
    self.client
  }
}

impl<'a, T: Transport> DerefMut for Session<'a, T> {
  fn deref_mut(&mut self) -> &mut DeviceClient<T> {
    self.client
  }
}

impl<'a, T: Transport> Drop for Session<'a, T> {
  fn drop(&mut self) {
    self.client.close();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use toad_msg::Code;
  use crate::test::{MockError, MockTransport};

  const HOST: &str = "fe80::1234:5678:90ab:cdef";
  const TOKEN: &str = "s3cr3t";

  fn client() -> (DeviceClient<MockTransport>, MockTransport) {
    let mock = MockTransport::new(TOKEN);
    (DeviceClient::new(mock.clone(), HOST, TOKEN), mock)
  }

  #[test]
  fn new_does_nothing() {
    let (client, mock) = client();
    assert!(!client.is_open());
    assert_eq!(client.endpoint().ipv6_address(), HOST);
    assert_eq!(client.endpoint().access_token(), TOKEN);
    assert_eq!(mock.state().opened, 0);
  }

  #[test]
  fn build_uri() {
    let (client, _) = client();
    assert_eq!(client.build_uri("/api/v1/info"),
               "coap://[fe80::1234:5678:90ab:cdef]/api/v1/info");
  }

  #[test]
  fn requests_need_a_session() {
    let (mut client, mock) = client();

    for path in ["/api/v1/info", "/api/v1/state", "", "/nope"] {
      assert_eq!(client.get(path), Err(Error::SessionNotInitialized));
      assert_eq!(client.put(path, "{}"), Err(Error::SessionNotInitialized));
      assert_eq!(client.post(path, ""), Err(Error::SessionNotInitialized));
    }

    client.open().unwrap();
    client.close();
    assert_eq!(client.get("/api/v1/info"), Err(Error::SessionNotInitialized));

    assert!(mock.state().sent.is_empty());
  }

  #[test]
  fn close_without_open() {
    let (mut client, mock) = client();
    client.close();
    client.close();
    assert_eq!(mock.state().closed, 0);
  }

  #[test]
  fn get_returns_configured_response() {
    let (mut client, mock) = client();
    mock.respond("/api/v1/info", Code::new(2, 5), r#"{"name":"Downlight"}"#);

    let mut session = client.session().unwrap();
    let outcome = session.get("/api/v1/info").unwrap();

    assert_eq!(outcome,
               Outcome::success(Code::new(2, 5), r#"{"name":"Downlight"}"#));
  }

  #[test]
  fn auth_query_is_attached() {
    let (mut client, mock) = client();
    client.open().unwrap();
    client.get("/api/v1/info").unwrap();
    client.put("/api/v1/state", "{}").unwrap();

    let state = mock.state();
    assert_eq!(state.sent.len(), 2);
    for req in state.sent.iter() {
      assert_eq!(req.query(), &["auth=s3cr3t".to_string()]);
    }

    assert_eq!(state.sent[0].method(), Method::GET);
    assert_eq!(state.sent[0].uri(),
               "coap://[fe80::1234:5678:90ab:cdef]/api/v1/info");
    assert!(state.sent[0].payload().is_empty());

    assert_eq!(state.sent[1].method(), Method::PUT);
    assert_eq!(state.sent[1].payload(), b"{}");
  }

  #[test]
  fn put_then_get_reflects_state() {
    let (mut client, _) = client();
    let mut session = client.session().unwrap();

    let put = session.put("/api/v1/state", r#"{"on":{"value":true}}"#)
                     .unwrap();
    assert_eq!(put.code(), Some(Code::new(2, 4)));

    let got = session.get("/api/v1/state").unwrap();
    let state: serde_json::Value = got.json().unwrap().unwrap();
    assert_eq!(state["on"]["value"], true);
  }

  #[test]
  fn post_sends_payload() {
    let (mut client, mock) = client();
    client.open().unwrap();

    let outcome = client.post("/api/v1/identify", "blink").unwrap();
    assert_eq!(outcome.code(), Some(Code::new(2, 1)));
    assert_eq!(mock.state().sent[0].method(), Method::POST);
    assert_eq!(mock.state().sent[0].payload(), b"blink");
  }

  #[test]
  fn wrong_token_is_still_a_response() {
    let mock = MockTransport::new("right");
    let mut client = DeviceClient::new(mock, HOST, "wrong");
    client.open().unwrap();

    let outcome = client.get("/api/v1/info").unwrap();
    assert_eq!(outcome.code(), Some(Code::new(4, 1)));
  }

  #[test]
  fn transport_errors_become_failures() {
    for err in [MockError::Timeout, MockError::Unreachable, MockError::Malformed] {
      let (mut client, mock) = client();
      client.open().unwrap();
      mock.fail_with(err);

      let outcome = client.get("/api/v1/info").unwrap();
      let message = outcome.error().unwrap();
      assert!(!message.is_empty());
      assert_eq!(message, err.to_string());
    }
  }

  #[test]
  fn send_errors_become_failures() {
    let (mut client, mock) = client();
    client.open().unwrap();
    mock.fail_send_with(MockError::Unreachable);

    let outcome = client.put("/api/v1/state", "{}").unwrap();
    assert_eq!(outcome, Outcome::failure(MockError::Unreachable.to_string()));
  }

  #[test]
  fn non_utf8_payload_is_a_failure() {
    let (mut client, mock) = client();
    mock.respond("/bin", Code::new(2, 5), vec![0xFF, 0xFE]);
    client.open().unwrap();

    assert!(!client.get("/bin").unwrap().is_success());
  }

  #[test]
  fn one_exchange_per_call() {
    let (mut client, mock) = client();
    mock.respond("/api/v1/info", Code::new(2, 5), "{}");
    client.open().unwrap();

    client.get("/api/v1/info").unwrap();
    client.get("/api/v1/info").unwrap();
    assert_eq!(mock.state().sent.len(), 2);
  }

  #[test]
  fn waits_for_pending_response() {
    let (mut client, mock) = client();
    mock.respond("/api/v1/info", Code::new(2, 5), "late");
    mock.block_polls(3);
    client.open().unwrap();

    assert_eq!(client.get("/api/v1/info").unwrap().payload(), Some("late"));
    assert_eq!(mock.state().polls, 4);
  }

  #[test]
  fn session_guard_closes() {
    let (mut client, mock) = client();

    {
      let session = client.session().unwrap();
      assert!(session.is_open());
    }

    assert!(!client.is_open());
    assert_eq!(mock.state().opened, 1);
    assert_eq!(mock.state().closed, 1);

    client.session().unwrap().close();
    assert_eq!(mock.state().closed, 2);
  }

  #[test]
  fn session_guard_closes_on_early_return() {
    fn fails_halfway(client: &mut DeviceClient<MockTransport>) -> Result<Outcome, Error> {
      let mut session = client.session()?;
      session.get("/api/v1/info")?;
      Err(Error::Open("bail".into()))
    }

    let (mut client, mock) = client();
    assert!(fails_halfway(&mut client).is_err());
    assert!(!client.is_open());
    assert_eq!(mock.state().closed, 1);
  }

  #[test]
  fn reopen_closes_previous_context() {
    let (mut client, mock) = client();
    client.open().unwrap();
    client.open().unwrap();

    assert_eq!(mock.state().opened, 2);
    assert_eq!(mock.state().closed, 1);
  }

  #[test]
  fn open_failure() {
    let (mut client, mock) = client();
    mock.fail_open();

    assert!(matches!(client.open(), Err(Error::Open(_))));
    assert!(!client.is_open());
    assert_eq!(client.get("/api/v1/info"), Err(Error::SessionNotInitialized));
  }

  #[test]
  fn dropping_client_closes_session() {
    let (mut client, mock) = client();
    client.open().unwrap();
    drop(client);
    assert_eq!(mock.state().closed, 1);
  }
}
