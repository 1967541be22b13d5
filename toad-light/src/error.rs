/// Errors yielded by [`DeviceClient`](crate::DeviceClient).
///
/// Failures of an exchange itself (timeouts, unreachable devices,
/// malformed responses) are not errors; they come back as
/// [`Outcome::Failure`](crate::Outcome::Failure).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// A request was attempted without an open session
  #[error("client session not initialized; open a session before sending requests")]
  SessionNotInitialized,
  /// The transport could not create a context
  #[error("failed to open transport context: {0}")]
  Open(String),
  /// A lighting state value was outside of what the device accepts
  #[error("{field} must be between {min} and {max}, got {value}")]
  OutOfRange {
    /// state field being set
    field: &'static str,
    /// rejected value
    value: u32,
    /// smallest accepted value
    min: u32,
    /// largest accepted value
    max: u32,
  },
}
