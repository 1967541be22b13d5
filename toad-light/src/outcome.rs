use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use toad_msg::Code;
use crate::resp::Resp;

/// The result of one request/response exchange with a device.
///
/// Serializes to the JSON records
/// `{"status":"success","code":<int>,"payload":<string>}` and
/// `{"status":"error","error":<string>}`, where `code` is the raw
/// CoAP code byte (2.05 Content is `69`).
///
/// ```
/// use toad_msg::Code;
/// use toad_light::Outcome;
///
/// let ok = Outcome::success(Code::new(2, 5), "{}");
/// assert_eq!(serde_json::to_string(&ok).unwrap(),
///            r#"{"status":"success","code":69,"payload":"{}"}"#);
///
/// let err = Outcome::failure("timed out");
/// assert_eq!(serde_json::to_string(&err).unwrap(),
///            r#"{"status":"error","error":"timed out"}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
  /// The device responded
  Success {
    /// response code, whatever its class
    #[serde(with = "code_byte")]
    code: Code,
    /// response body, empty if the response had none
    payload: String,
  },
  /// The exchange failed
  #[serde(rename = "error")]
  Failure {
    /// human-readable description of what went wrong
    error: String,
  },
}

impl Outcome {
  /// Create a [`Outcome::Success`]
  pub fn success(code: Code, payload: impl Into<String>) -> Self {
    Outcome::Success { code,
                       payload: payload.into() }
  }

  /// Create a [`Outcome::Failure`].
  ///
  /// The message is never empty; an empty description is replaced
  /// with a generic one.
  pub fn failure(error: impl Into<String>) -> Self {
    let error = error.into();
    let error = if error.trim().is_empty() {
      String::from("request failed for an unknown reason")
    } else {
      error
    };

    Outcome::Failure { error }
  }

  /// Did the device respond?
  pub fn is_success(&self) -> bool {
    matches!(self, Outcome::Success { .. })
  }

  /// The response code, if the device responded
  pub fn code(&self) -> Option<Code> {
    match self {
      | Outcome::Success { code, .. } => Some(*code),
      | Outcome::Failure { .. } => None,
    }
  }

  /// The response body, if the device responded
  pub fn payload(&self) -> Option<&str> {
    match self {
      | Outcome::Success { payload, .. } => Some(payload),
      | Outcome::Failure { .. } => None,
    }
  }

  /// The failure description, if the exchange failed
  pub fn error(&self) -> Option<&str> {
    match self {
      | Outcome::Failure { error } => Some(error),
      | Outcome::Success { .. } => None,
    }
  }

  /// Parse the response body as JSON.
  ///
  /// Yields `None` for failed exchanges.
  pub fn json<T: DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
    self.payload().map(serde_json::from_str::<T>)
  }
}

impl From<Resp> for Outcome {
  fn from(resp: Resp) -> Self {
    match resp.payload_string() {
      | Ok(payload) => Outcome::success(resp.code(), payload),
      | Err(e) => Outcome::failure(format!("{} response payload is not valid UTF-8: {}",
                                           resp.code().to_string(),
                                           e)),
    }
  }
}

mod code_byte {
  use serde::{Deserialize, Deserializer, Serializer};

  use toad_msg::Code;

  pub(super) fn serialize<S: Serializer>(code: &Code, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8((*code).into())
  }

  pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Code, D::Error> {
    u8::deserialize(d).map(Code::from)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_resp() {
    let resp = Resp::new(Code::new(2, 5), "hello");
    assert_eq!(Outcome::from(resp), Outcome::success(Code::new(2, 5), "hello"));

    let empty = Resp::new(Code::new(2, 4), vec![]);
    assert_eq!(Outcome::from(empty).payload(), Some(""));
  }

  #[test]
  fn error_codes_are_still_responses() {
    let resp = Resp::new(Code::new(4, 1), "unauthorized");
    let outcome = Outcome::from(resp);
    assert!(outcome.is_success());
    assert_eq!(outcome.code(), Some(Code::new(4, 1)));
  }

  #[test]
  fn invalid_utf8_is_a_failure() {
    let resp = Resp::new(Code::new(2, 5), vec![0xC3, 0x28]);
    let outcome = Outcome::from(resp);
    assert!(!outcome.is_success());
    assert!(outcome.error().unwrap().contains("UTF-8"));
  }

  #[test]
  fn failure_message_is_never_empty() {
    assert!(!Outcome::failure("").error().unwrap().is_empty());
    assert!(!Outcome::failure("  ").error().unwrap().is_empty());
  }

  #[test]
  fn json_shape() {
    let ok: serde_json::Value =
      serde_json::to_value(Outcome::success(Code::new(2, 4), "")).unwrap();
    assert_eq!(ok, serde_json::json!({"status": "success", "code": 68, "payload": ""}));

    let parsed: Outcome =
      serde_json::from_str(r#"{"status":"error","error":"no route to host"}"#).unwrap();
    assert_eq!(parsed, Outcome::failure("no route to host"));

    let parsed: Outcome =
      serde_json::from_str(r#"{"status":"success","code":69,"payload":"x"}"#).unwrap();
    assert_eq!(parsed.code(), Some(Code::new(2, 5)));
  }

  #[test]
  fn json_payload() {
    let outcome = Outcome::success(Code::new(2, 5), r#"{"on":{"value":true}}"#);
    let value: serde_json::Value = outcome.json().unwrap().unwrap();
    assert_eq!(value["on"]["value"], true);

    assert!(Outcome::failure("nope").json::<serde_json::Value>().is_none());
  }
}
