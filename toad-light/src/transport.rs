//! The seam between [`DeviceClient`](crate::DeviceClient) and whatever
//! actually speaks CoAP on the wire.
//!
//! A [`Transport`] hands out [`Context`]s; a context owns the network
//! endpoint for the lifetime of one client session.
//!
//! Sending is split into [`Context::send`] and [`Context::poll_resp`] so
//! that waiting for the response is a single non-blocking poll, which the
//! client drives with [`nb::block!`].

use core::fmt;

use toad_msg::Token;

use crate::req::Req;
use crate::resp::Resp;

/// Something that can open a transport context
pub trait Transport {
  /// The live network endpoint yielded by [`Transport::open`]
  type Context: Context;
  /// The error yielded when opening fails
  type Error: fmt::Debug + fmt::Display;

  /// Acquire a new context
  fn open(&mut self) -> Result<Self::Context, Self::Error>;
}

/// A live network endpoint, able to perform request/response exchanges
pub trait Context {
  /// The error yielded by exchanges
  type Error: fmt::Debug + fmt::Display;

  /// Send a request, yielding the token that identifies its exchange
  fn send(&mut self, req: Req) -> Result<Token, Self::Error>;

  /// Poll for the response to the request identified by `token`.
  ///
  /// Returns `nb::Error::WouldBlock` while the exchange is in flight.
  /// Once this yields `Ok` or `Err(nb::Error::Other)`, the exchange is
  /// finished and the token is no longer valid.
  fn poll_resp(&mut self, token: Token) -> nb::Result<Resp, Self::Error>;

  /// Release the context
  fn close(self) -> Result<(), Self::Error>;
}
