use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, UdpSocket};

use toad::net::{Addrd, Socket};

/// Largest datagram a [`DeviceSocket`] will receive.
///
/// One byte more than any UDP payload can be, so a full buffer always means
/// the datagram did not fit.
pub const MAX_DGRAM: usize = 65_536;

/// A non-blocking [`UdpSocket`] that keeps IPv6 scope ids intact and refuses
/// to hand out truncated datagrams.
#[derive(Debug)]
pub struct DeviceSocket(UdpSocket);

impl DeviceSocket {
  /// Bind a non-blocking socket
  pub fn bind(addr: SocketAddr) -> io::Result<Self> {
    let sock = UdpSocket::bind(addr)?;
    sock.set_nonblocking(true)?;
    Ok(Self(sock))
  }

  /// The local address of the socket
  pub fn std_local_addr(&self) -> io::Result<SocketAddr> {
    self.0.local_addr()
  }
}

fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

impl Socket for DeviceSocket {
  type Error = io::Error;
  type Dgram = Vec<u8>;

  fn local_addr(&self) -> no_std_net::SocketAddr {
    self.0
        .local_addr()
        .map(to_no_std)
        .unwrap_or_else(|_| to_no_std(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)))
  }

  fn empty_dgram() -> Vec<u8> {
    vec![0u8; MAX_DGRAM]
  }

  fn bind_raw<A: no_std_net::ToSocketAddrs>(addr: A) -> io::Result<Self> {
    let addrs = addr.to_socket_addrs()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{:?}", e)))?
                    .map(to_std)
                    .collect::<Vec<_>>();

    let sock = UdpSocket::bind(addrs.as_slice())?;
    sock.set_nonblocking(true)?;
    Ok(Self(sock))
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), io::Error> {
    self.0
        .send_to(msg.data(), to_std(msg.addr()))
        .map(|_| ())
        .map_err(io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, io::Error> {
    let (n, addr) = self.0.recv_from(buffer).map_err(io_to_nb)?;

    if n == buffer.len() {
      log::warn!("dropping {}b+ datagram <- {}: does not fit in receive buffer",
                 n,
                 addr);
      return Err(nb::Error::Other(io::Error::new(io::ErrorKind::InvalidData,
                                                 format!("datagram from {} was truncated to {} bytes",
                                                         addr, n))));
    }

    Ok(Addrd(n, to_no_std(addr)))
  }

  fn peek(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, io::Error> {
    self.0
        .peek_from(buffer)
        .map(|(n, addr)| Addrd(n, to_no_std(addr)))
        .map_err(io_to_nb)
  }

  fn join_multicast(&self, addr: no_std_net::IpAddr) -> io::Result<()> {
    match to_std(no_std_net::SocketAddr::new(addr, 0)).ip() {
      | IpAddr::V4(ip) => self.0.join_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED),
      | IpAddr::V6(ip) => self.0.join_multicast_v6(&ip, 0),
    }
  }
}

/// Convert a `std` socket address to the `no_std_net` one the runtime uses,
/// keeping flow info and scope id.
pub fn to_no_std(addr: SocketAddr) -> no_std_net::SocketAddr {
  match addr {
    | SocketAddr::V4(a) => {
      no_std_net::SocketAddr::V4(no_std_net::SocketAddrV4::new(a.ip().octets().into(), a.port()))
    },
    | SocketAddr::V6(a) => {
      no_std_net::SocketAddr::V6(no_std_net::SocketAddrV6::new(a.ip().octets().into(),
                                                               a.port(),
                                                               a.flowinfo(),
                                                               a.scope_id()))
    },
  }
}

/// Convert a `no_std_net` socket address back to `std`
pub fn to_std(addr: no_std_net::SocketAddr) -> SocketAddr {
  match addr {
    | no_std_net::SocketAddr::V4(a) => {
      SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from(a.ip().octets()), a.port()))
    },
    | no_std_net::SocketAddr::V6(a) => {
      let ip = Ipv6Addr::from(a.ip().octets());
      SocketAddr::V6(SocketAddrV6::new(ip, a.port(), a.flowinfo(), a.scope_id()))
    },
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[test]
  fn conversion_keeps_scope() {
    let addr: SocketAddr = SocketAddr::V6(SocketAddrV6::new("fe80::1".parse().unwrap(), 5683, 7, 3));
    let no_std = to_no_std(addr);

    match no_std {
      | no_std_net::SocketAddr::V6(a) => {
        assert_eq!(a.scope_id(), 3);
        assert_eq!(a.flowinfo(), 7);
        assert_eq!(a.port(), 5683);
      },
      | other => panic!("expected v6, got {:?}", other),
    }

    assert_eq!(to_std(no_std), addr);

    let v4: SocketAddr = "10.0.0.2:5683".parse().unwrap();
    assert_eq!(to_std(to_no_std(v4)), v4);
  }

  #[test]
  fn recv_would_block_when_empty() {
    let sock = DeviceSocket::bind("[::1]:0".parse().unwrap()).unwrap();
    let mut buf = DeviceSocket::empty_dgram();

    assert!(matches!(sock.recv(&mut buf), Err(nb::Error::WouldBlock)));
    assert!(matches!(sock.poll(), Ok(None)));
  }

  #[test]
  fn datagrams_that_do_not_fit_are_errors() {
    let sock = DeviceSocket::bind("[::1]:0".parse().unwrap()).unwrap();
    let peer = UdpSocket::bind("[::1]:0").unwrap();
    peer.send_to(&[1u8; 32], sock.std_local_addr().unwrap())
        .unwrap();

    let mut small = [0u8; 16];
    let err = loop {
      match sock.recv(&mut small) {
        | Err(nb::Error::WouldBlock) => std::thread::sleep(Duration::from_millis(1)),
        | other => break other,
      }
    };

    match err {
      | Err(nb::Error::Other(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
      | other => panic!("expected a truncation error, got {:?}", other),
    }
  }

  #[test]
  fn large_datagrams_arrive_whole() {
    let sock = DeviceSocket::bind("[::1]:0".parse().unwrap()).unwrap();
    let peer = UdpSocket::bind("[::1]:0").unwrap();
    peer.send_to(&[7u8; 2000], sock.std_local_addr().unwrap())
        .unwrap();

    let dgram = loop {
      match sock.poll().unwrap() {
        | Some(dgram) => break dgram,
        | None => std::thread::sleep(Duration::from_millis(1)),
      }
    };

    assert_eq!(dgram.data().len(), 2000);
    assert_eq!(to_std(dgram.addr()), peer.local_addr().unwrap());
  }
}
