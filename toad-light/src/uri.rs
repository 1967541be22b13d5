use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};

/// Default port for unsecured CoAP
pub const DEFAULT_PORT: u16 = 5683;

const SCHEME: &str = "coap://";

/// Build the URI of a resource on a device addressed by a bare IPv6 literal.
///
/// The address is inserted between brackets as-is and the path is appended
/// verbatim; neither is escaped or percent-encoded.
///
/// ```
/// assert_eq!(toad_light::uri::build("fe80::1234:5678:90ab:cdef", "/api/v1/info"),
///            "coap://[fe80::1234:5678:90ab:cdef]/api/v1/info");
/// ```
pub fn build(host: &str, path: &str) -> String {
  format!("{}[{}]{}", SCHEME, host, path)
}

/// Errors encounterable while parsing a `coap://` URI
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
  /// URI did not start with `coap://`
  #[error("`{0}` does not use the coap:// scheme")]
  Scheme(String),
  /// Host was not a bracketed IPv6 literal
  #[error("`{0}` does not have a bracketed IPv6 host")]
  Host(String),
  /// Text between the brackets was not an IPv6 address
  #[error("`{0}` is not a valid IPv6 address")]
  Address(String),
  /// Zone identifier was neither an interface index nor the name of a
  /// network interface on this host
  #[error("zone `{0}` does not name a network interface")]
  Zone(String),
  /// Port was not a 16-bit integer
  #[error("`{0}` is not a valid port")]
  Port(String),
}

/// The parts of a `coap://` URI a request is sent with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  /// Where the request datagram goes
  pub addr: SocketAddr,
  /// Uri-Path segments, without separators
  pub path: Vec<String>,
  /// Uri-Query arguments found in the URI itself, without separators
  pub query: Vec<String>,
}

/// Split a `coap://[ipv6(%zone)?](:port)?/path(?query)?` URI into the parts
/// needed to address a request.
///
/// Zones may be an interface index or, on unix, an interface name.
///
/// ```
/// use toad_light::uri;
///
/// let target = uri::parse("coap://[fe80::1%2]/api/v1/state").unwrap();
/// assert_eq!(target.addr.to_string(), "[fe80::1%2]:5683");
/// assert_eq!(target.path, vec!["api", "v1", "state"]);
/// ```
pub fn parse(uri: &str) -> Result<Target, UriError> {
  let rest = uri.strip_prefix(SCHEME)
                .ok_or_else(|| UriError::Scheme(uri.to_string()))?;

  let (host, rest) = rest.strip_prefix('[')
                         .and_then(|r| r.split_once(']'))
                         .ok_or_else(|| UriError::Host(uri.to_string()))?;

  let (ip, scope) = match host.split_once('%') {
    | Some((ip, zone)) => (ip, scope_id(zone)?),
    | None => (host, 0),
  };
  let ip = ip.parse::<Ipv6Addr>()
             .map_err(|_| UriError::Address(ip.to_string()))?;

  let (authority_rest, query) = match rest.split_once('?') {
    | Some((before, query)) => (before, query),
    | None => (rest, ""),
  };

  let (port, path) = match authority_rest.strip_prefix(':') {
    | Some(port_path) => {
      let (port, path) = port_path.find('/')
                                  .map(|ix| port_path.split_at(ix))
                                  .unwrap_or((port_path, ""));
      let port = port.parse::<u16>()
                     .map_err(|_| UriError::Port(port.to_string()))?;
      (port, path)
    },
    | None => (DEFAULT_PORT, authority_rest),
  };

  Ok(Target { addr: SocketAddr::V6(SocketAddrV6::new(ip, port, 0, scope)),
              path: segments(path),
              query: query.split('&')
                          .filter(|q| !q.is_empty())
                          .map(String::from)
                          .collect() })
}

/// Resolve an IPv6 zone (`3`, `wpan0`, `lo`) to an interface index
pub fn scope_id(zone: &str) -> Result<u32, UriError> {
  match zone.parse::<u32>() {
    | Ok(ix) => Ok(ix),
    | Err(_) => interface_index(zone).ok_or_else(|| UriError::Zone(zone.to_string())),
  }
}

#[cfg(unix)]
fn interface_index(name: &str) -> Option<u32> {
  nix::net::if_::if_nametoindex(name).ok()
                                     .filter(|ix| *ix != 0)
}

#[cfg(not(unix))]
fn interface_index(_: &str) -> Option<u32> {
  None
}

fn segments(path: &str) -> Vec<String> {
  match path.strip_prefix('/').unwrap_or(path) {
    | "" => vec![],
    | p => p.split('/').map(String::from).collect(),
  }
}
