// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # portnet - connection arbitration for robotics publish/subscribe
//!
//! portnet is the connection-negotiation core of a distributed
//! publish/subscribe middleware: it establishes, tears down, and inspects
//! data links between named endpoints ("ports") using a pluggable set of
//! transport protocols ("carriers"). Given a source name, a destination
//! name, and an optional desired carrier, it decides which peer should
//! initiate the link, which carrier to use, whether the operation is
//! recorded persistently in the name service, and whether a virtual
//! aggregation point ("topic") is involved - then drives the remote
//! administration dialogue to realize that decision.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portnet::{ContactStyle, Network};
//!
//! fn main() -> portnet::Result<()> {
//!     // Bring the library up; dropping the guard tears it down again.
//!     let _net = Network::new();
//!
//!     // Link two ports, letting arbitration pick direction and carrier.
//!     portnet::connect("/camera", "/viewer", &ContactStyle::default())?;
//!
//!     // Probe and undo.
//!     assert!(portnet::is_connected("/camera", "/viewer", &ContactStyle::default()));
//!     portnet::disconnect("/camera", "/viewer", &ContactStyle::default())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Caller (application / CLI)                 |
//! +--------------------------------------------------------------------+
//! |                      Arbitration engine (network)                  |
//! |   name sanity | topicality | resolution | carrier choice | push/pull|
//! +--------------------------------------------------------------------+
//! |  Name-space facade (name)   |   Carrier registry (carrier)         |
//! |  resolve/register/topics    |   capability probes, prototypes      |
//! +--------------------------------------------------------------------+
//! |                    Administrative RPC client (admin)               |
//! |        command lists | text codec | escape tags | timeouts         |
//! +--------------------------------------------------------------------+
//! |                      Peer port / name server                       |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Contact`] | Parsed endpoint: name, carrier (+params), host, port |
//! | [`ContactStyle`] | Per-operation configuration (carrier, timeout, ...) |
//! | [`Carrier`] | Transport plugin capability interface |
//! | [`NameSpace`] | Name-service operations consumed by the core |
//! | [`Runtime`] | An explicit, injectable instance of the whole stack |
//! | [`Network`] | RAII guard for global library init/fini |
//!
//! ## Modules Overview
//!
//! - [`network`] - connect/disconnect/probe entry points (start here)
//! - [`contact`] - endpoint model and operation styles
//! - [`carrier`] - carrier trait, registry, built-in prototypes
//! - [`name`] - name-space facade and in-process name store
//! - [`admin`] - administrative command model and RPC client
//! - [`runtime`] - library lifecycle and ambient services

// Clippy: No blanket suppressions. Fix issues properly or use inline #[allow] with justification.

/// Administrative command model and RPC client.
pub mod admin;
/// Carrier trait, capability record, and registry of prototypes.
pub mod carrier;
/// Clock selection (system / custom) for the library's notion of time.
pub mod clock;
/// Ambient configuration read from the environment at init.
pub mod config;
/// Endpoint (contact) model, operation styles, and name validation.
pub mod contact;
/// Compile-time configurable logging system (zero-cost when disabled).
pub mod logging;
/// Name-space facade: uniform view over the name service(s).
pub mod name;
/// Connection arbitration and enactment engine.
pub mod network;
/// Reference-counted library lifecycle and the global runtime.
pub mod runtime;

pub use admin::{Ack, Channel, Connector, Message, TcpConnector, Value};
pub use carrier::{Carrier, CarrierRegistry};
pub use contact::{is_valid_port_name, Contact, ContactStyle, Mode};
pub use name::{MemoryNameSpace, NameSpace, NameSpaceHandle, NameStore};
pub use network::{
    connect, disconnect, exists, is_connected, query_name, register_contact, register_name,
    unregister_contact, unregister_name, Error, QosStyle, Result,
};
pub use runtime::{auto_init, fini, init, initialized, Network, Runtime, RuntimeBuilder};

/// portnet version string.
pub const VERSION: &str = "0.2.0";
