use std::string::FromUtf8Error;

use toad::platform::PlatformTypes;
use toad_msg::Code;

/// A response to a [`Req`](crate::req::Req): status code and payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resp {
  code: Code,
  payload: Vec<u8>,
}

impl Resp {
  /// Create a response
  pub fn new(code: Code, payload: impl Into<Vec<u8>>) -> Self {
    Self { code,
           payload: payload.into() }
  }

  /// Get the response code
  pub fn code(&self) -> Code {
    self.code
  }

  /// Get the payload's raw bytes
  pub fn payload(&self) -> &[u8] {
    &self.payload
  }

  /// Read the payload as a UTF-8 string
  pub fn payload_string(&self) -> Result<String, FromUtf8Error> {
    String::from_utf8(self.payload.clone())
  }
}

impl<P: PlatformTypes> From<toad::resp::Resp<P>> for Resp {
  fn from(resp: toad::resp::Resp<P>) -> Self {
    Self { code: resp.code(),
           payload: resp.payload().copied().collect() }
  }
}
