//! `toad-light` is a minimal CoAP client for controlling networked
//! lighting devices (panels, bulbs and strips that expose a small
//! RESTful API over CoAP, usually on a Thread mesh).
//!
//! ## Devices
//! A device is addressed by its IPv6 address and authenticates requests
//! with an access token, sent as the `auth=<token>` Uri-Query argument
//! of every request.
//!
//! Devices expose:
//! - `GET /api/v1/info`: device metadata, as JSON
//! - `GET /api/v1/state`: lighting state, as JSON
//! - `PUT /api/v1/state`: partial lighting state update, as JSON
//!
//! ## Usage
//! ```no_run
//! use toad_light::state::StateUpdate;
//! use toad_light::udp::Udp;
//! use toad_light::DeviceClient;
//!
//! let mut client = DeviceClient::new(Udp::default(), "fe80::1234:5678:90ab:cdef%3", "token");
//! let mut session = client.session().unwrap();
//!
//! println!("{:?}", session.info().unwrap());
//!
//! let update = StateUpdate::new().on(true).brightness(60).unwrap();
//! session.set_state(&update).unwrap();
//! ```
//!
//! ## Outcomes
//! Every request yields an [`Outcome`]: either the device's response
//! (whatever its code) or a description of why the exchange failed.
//! Both serialize to a small JSON record, suitable for handing to other
//! programs.
//!
//! ## Transports
//! [`DeviceClient`] is generic over a [`Transport`](transport::Transport).
//! [`udp::Udp`] runs the [`toad`] CoAP runtime over a UDP socket and is
//! what you want unless you are testing or tunneling.

// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(missing_copy_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]


pub(crate) mod logging;

/// building & parsing `coap://` URIs
pub mod uri;

/// requests
pub mod req;

/// responses
pub mod resp;

pub mod transport;

/// network primitives for the UDP transport
pub mod net;

pub mod udp;

/// client errors
pub mod error;

/// request outcomes
pub mod outcome;

/// device client & session lifecycle
pub mod client;

pub mod state;

pub use client::{DeviceClient, Endpoint, Session};
pub use error::Error;
pub use outcome::Outcome;
