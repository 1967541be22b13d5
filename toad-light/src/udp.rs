//! The default [`Transport`]: CoAP over UDP, driven by the [`toad`] runtime.
//!
//! Every request goes out as a CON message. Message ids, tokens,
//! retransmission, duplicate ACK handling and response matching are done
//! by toad's [`Runtime`] steps; this module binds the socket, turns a
//! [`Req`] into a toad message, acknowledges separate CON responses and
//! gives up on an exchange once its deadline passes.

use std::fmt::Debug;
use std::io;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::time::{Duration, Instant};

use embedded_time::duration::Milliseconds;
use toad::config::Config;
use toad::net::Addrd;
use toad::platform::{Alloc, Platform};
use toad::step::runtime::Runtime;
use toad_msg::{Id, MessageOptions, Payload, Token, Type};

use crate::logging::msg_summary;
use crate::net::{self, DeviceSocket};
use crate::req::Req;
use crate::resp::Resp;
use crate::transport::{Context, Transport};
use crate::uri::{self, UriError};

/// [`toad::platform::PlatformTypes`] of the UDP transport
pub type Types = Alloc<toad::std::Clock, DeviceSocket>;

/// The toad steps every message sent or received goes through
pub type Steps = Runtime<Types, naan::hkt::Vec, naan::hkt::BTreeMap>;

type Message = toad::platform::toad_msg::Message<Types>;

/// Errors encounterable while exchanging messages over UDP
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// The socket or the toad runtime failed, or the device sent
  /// something that is not a CoAP message
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
  /// The request URI could not be understood
  #[error(transparent)]
  Uri(#[from] UriError),
  /// The request could not be turned into a CoAP message
  #[error("invalid request: {0}")]
  Request(String),
  /// Neither a response nor a Reset arrived in time
  #[error("no response after {0:?}")]
  Timeout(Duration),
  /// The device rejected the request with a Reset
  #[error("device reset the exchange")]
  Reset,
  /// [`Context::poll_resp`] was invoked with a token not yielded by
  /// [`Context::send`], or one whose exchange already finished
  #[error("no exchange in flight with token {0:?}")]
  UnknownToken(Token),
}

/// How long toad may keep retransmitting a CON request: every unacknowledged
/// attempt, then every attempt after it was acknowledged.
///
/// ```
/// use std::time::Duration;
///
/// use embedded_time::duration::Milliseconds;
/// use toad::config::Config;
/// use toad::retry::{Attempts, Strategy};
///
/// let mut config = Config::default();
/// config.msg.con.unacked_retry_strategy = Strategy::Delay { min: Milliseconds(100),
///                                                           max: Milliseconds(100) };
/// config.msg.con.acked_retry_strategy = Strategy::Delay { min: Milliseconds(500),
///                                                         max: Milliseconds(500) };
/// config.msg.con.max_attempts = Attempts(4);
///
/// assert_eq!(toad_light::udp::exchange_lifetime(&config),
///            Duration::from_millis(4 * 100 + 4 * 500));
/// ```
pub fn exchange_lifetime(config: &Config) -> Duration {
  let con = config.msg.con;
  let Milliseconds(unacked) = con.unacked_retry_strategy.max_time(con.max_attempts);
  let Milliseconds(acked) = con.acked_retry_strategy.max_time(con.max_attempts);

  Duration::from_millis(unacked + acked)
}

/// Opens UDP sockets running the toad runtime
#[derive(Debug, Clone, Copy)]
pub struct Udp {
  bind_addr: SocketAddr,
  config: Config,
  timeout: Option<Duration>,
}

impl Default for Udp {
  fn default() -> Self {
    Self::new(Config::default())
  }
}

impl Udp {
  /// Create a transport with a custom runtime config, binding to `[::]:0`
  pub fn new(config: Config) -> Self {
    Self { bind_addr: SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0)),
           config,
           timeout: None }
  }

  /// Bind sockets to `addr` instead
  pub fn bind_to(mut self, addr: SocketAddr) -> Self {
    self.bind_addr = addr;
    self
  }

  /// Give up on an exchange after `timeout` instead of [`exchange_lifetime`]
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  /// Get the runtime config sockets are opened with
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// How long an exchange may take before it fails with [`Error::Timeout`]
  pub fn exchange_timeout(&self) -> Duration {
    self.timeout
        .unwrap_or_else(|| exchange_lifetime(&self.config))
  }
}

impl Transport for Udp {
  type Context = UdpContext;
  type Error = Error;

  fn open(&mut self) -> Result<UdpContext, Error> {
    let socket = DeviceSocket::bind(self.bind_addr)?;
    log::trace!("bound {:?}", socket.std_local_addr());

    Ok(UdpContext { platform: UdpPlatform { steps: Steps::default(),
                                            config: self.config,
                                            socket,
                                            clock: toad::std::Clock::new() },
                    timeout: self.exchange_timeout(),
                    exchanges: Vec::new() })
  }
}

struct UdpPlatform {
  steps: Steps,
  config: Config,
  socket: DeviceSocket,
  clock: toad::std::Clock,
}

impl Debug for UdpPlatform {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UdpPlatform")
     .field("config", &self.config)
     .field("socket", &self.socket)
     .finish_non_exhaustive()
  }
}

impl Platform<Steps> for UdpPlatform {
  type Types = Types;
  type Error = io::Error;

  fn log(&self, level: log::Level, msg: toad::todo::String<1000>) -> Result<(), io::Error> {
    log::log!(target: "toad", level, "{}", msg.as_str());
    Ok(())
  }

  fn config(&self) -> Config {
    self.config
  }

  fn steps(&self) -> &Steps {
    &self.steps
  }

  fn socket(&self) -> &DeviceSocket {
    &self.socket
  }

  fn clock(&self) -> &toad::std::Clock {
    &self.clock
  }
}

#[derive(Debug, Clone, Copy)]
struct Exchange {
  token: Token,
  addr: no_std_net::SocketAddr,
  deadline: Instant,
}

/// A bound socket, the toad runtime state and the exchanges in flight
#[derive(Debug)]
pub struct UdpContext {
  platform: UdpPlatform,
  timeout: Duration,
  exchanges: Vec<Exchange>,
}

/// Scope ids only mean something for link-local unicast addresses; responses
/// from anything else arrive with scope id 0 and must match the address the
/// request went to.
fn without_needless_scope(addr: SocketAddr) -> SocketAddr {
  match addr {
    | SocketAddr::V6(a) if a.ip().segments()[0] & 0xffc0 != 0xfe80 => {
      SocketAddr::V6(SocketAddrV6::new(*a.ip(), a.port(), a.flowinfo(), 0))
    },
    | other => other,
  }
}

fn invalid(e: impl Debug) -> Error {
  Error::Request(format!("{:?}", e))
}

impl UdpContext {
  fn build(req: &Req, target: &uri::Target) -> Result<Message, Error> {
    let mut msg = Message::new(Type::Con,
                               req.method().code(),
                               Id(0),
                               Token(Default::default()));

    if !target.path.is_empty() {
      msg.set_path(target.path.join("/")).map_err(invalid)?;
    }

    target.query
          .iter()
          .chain(req.query())
          .try_for_each(|arg| msg.add_query(arg))
          .map_err(invalid)?;

    msg.payload = Payload(req.payload().to_vec());
    Ok(msg)
  }

  fn finish(&self, resp: toad::resp::Resp<Types>, from: no_std_net::SocketAddr) -> Result<Resp, Error> {
    log::trace!("recvd {} <- {}", msg_summary(resp.msg()), net::to_std(from));

    match resp.msg_type() {
      | Type::Reset => Err(Error::Reset),
      | Type::Con => {
        let ack = resp.msg().ack(resp.msg_id());
        if let Err(e) = nb::block!(self.platform.send_msg(Addrd(ack.clone(), from))) {
          log::warn!("failed to acknowledge response <- {}: {}", net::to_std(from), e);
        }
        Ok(Resp::from(resp))
      },
      | _ => Ok(Resp::from(resp)),
    }
  }
}

impl Context for UdpContext {
  type Error = Error;

  fn send(&mut self, req: Req) -> Result<Token, Error> {
    let target = uri::parse(req.uri())?;
    let addr = net::to_no_std(without_needless_scope(target.addr));
    let msg = Self::build(&req, &target)?;

    log::trace!("sending {} -> {}", msg_summary(&msg), net::to_std(addr));
    let (_, token) = nb::block!(self.platform.send_msg(Addrd(msg.clone(), addr)))?;

    self.exchanges.push(Exchange { token,
                                   addr,
                                   deadline: Instant::now() + self.timeout });
    Ok(token)
  }

  fn poll_resp(&mut self, token: Token) -> nb::Result<Resp, Error> {
    let ix = self.exchanges
                 .iter()
                 .position(|ex| ex.token == token)
                 .ok_or(nb::Error::Other(Error::UnknownToken(token)))?;
    let ex = self.exchanges[ix];

    let result = match self.platform.poll_resp(token, ex.addr) {
      | Ok(Addrd(resp, from)) => self.finish(resp, from),
      | Err(nb::Error::WouldBlock) if Instant::now() >= ex.deadline => {
        log::debug!("{:?} timed out after {:?}", token, self.timeout);
        Err(Error::Timeout(self.timeout))
      },
      | Err(nb::Error::WouldBlock) => return Err(nb::Error::WouldBlock),
      | Err(nb::Error::Other(e)) => Err(Error::Io(e)),
    };

    self.exchanges.remove(ix);
    result.map_err(nb::Error::Other)
  }

  fn close(self) -> Result<(), Error> {
    if !self.exchanges.is_empty() {
      log::debug!("closing with {} exchanges in flight", self.exchanges.len());
    }

    Ok(())
  }
}
