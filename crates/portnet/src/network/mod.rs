// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Connection arbitration API
//!
//! The entry points of the crate: [`connect`], [`disconnect`],
//! [`is_connected`], [`exists`], plus the name-space delegation surface.
//! Free functions operate on the global [`Runtime`]; every operation is
//! also available as a method on an explicitly built runtime, which is
//! how the test suite injects its name store and byte channels.
//!
//! The decision procedure itself lives in the private `arbitrate`
//! submodule: direction of initiation, carrier choice, topic dispatch,
//! and the compensating disconnect for stateless senders.

mod arbitrate;
mod qos;

pub use qos::QosStyle;

use std::fmt;
use std::io;

use crate::admin::{self, Message, Value};
use crate::carrier::CarrierFactory;
use crate::contact::{is_valid_port_name, Contact, ContactStyle, Mode};
use crate::runtime::Runtime;

/// Errors surfaced by the arbitration core.
///
/// Diagnostics are additionally printed through the logging macros
/// unless the operation's [`ContactStyle::quiet`] is set.
#[derive(Debug)]
pub enum Error {
    /// Syntactic rejection of an endpoint string.
    InvalidName(String),
    /// The name service failed to map a dynamic endpoint.
    Unresolved {
        /// Which side failed ("source", "destination", "target").
        role: &'static str,
        /// The unresolvable port name.
        name: String,
    },
    /// The requested carrier is incompatible with a non-competent peer's
    /// registered carrier.
    CarrierConflict(String, String),
    /// The administrative channel of the named port cannot be reached;
    /// the endpoint has been marked stale in the name space.
    Unreachable(String),
    /// The peer replied with a failure code or an unrecognized shape.
    ProtocolDenied(String),
    /// The requested combination is not supported.
    Unsupported(&'static str),
    /// No actor in the competence/direction case analysis can initiate.
    NoRoute {
        /// Source endpoint string as given by the caller.
        src: String,
        /// Destination endpoint string as given by the caller.
        dest: String,
    },
    /// Channel-level failure.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidName(name) => write!(f, "invalid port name '{}'", name),
            Error::Unresolved { role, name } => {
                write!(f, "could not find {} port {}", role, name)
            }
            Error::CarrierConflict(requested, constraint) => {
                write!(f, "conflict between {} and {}", requested, constraint)
            }
            Error::Unreachable(name) => write!(f, "cannot reach port {}", name),
            Error::ProtocolDenied(msg) => write!(f, "denied by peer: {}", msg),
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            Error::NoRoute { src, dest } => {
                write!(f, "no way to make connection {}->{}", src, dest)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for results using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Runtime {
    /// Establish a link from `src` to `dest` according to `style`.
    pub fn connect(&self, src: &str, dest: &str, style: &ContactStyle) -> Result<()> {
        arbitrate::meta_connect(self, src, dest, style, Mode::Connect)
    }

    /// [`connect`](Self::connect) with just a carrier override.
    pub fn connect_with_carrier(
        &self,
        src: &str,
        dest: &str,
        carrier: &str,
        quiet: bool,
    ) -> Result<()> {
        let style = ContactStyle {
            quiet,
            carrier: carrier.to_string(),
            ..ContactStyle::default()
        };
        self.connect(src, dest, &style)
    }

    /// Tear down the link from `src` to `dest`.
    pub fn disconnect(&self, src: &str, dest: &str, style: &ContactStyle) -> Result<()> {
        arbitrate::meta_connect(self, src, dest, style, Mode::Disconnect)
    }

    /// Probe whether a link from `src` to `dest` exists (and, when the
    /// style names a carrier, that it uses that carrier).
    pub fn is_connected(&self, src: &str, dest: &str, style: &ContactStyle) -> bool {
        match arbitrate::meta_connect(self, src, dest, style, Mode::Exists) {
            Ok(()) => true,
            Err(_) => {
                if !style.quiet {
                    crate::info!("No connection from {} to {} found", src, dest);
                }
                false
            }
        }
    }

    /// Probe whether a port is alive by running the version dialogue on
    /// its administrative channel. A native server answers `ver ...`, a
    /// foreign one a dictionary; anything else counts as absent.
    pub fn exists(&self, port: &str, style: &ContactStyle) -> bool {
        let contact = Contact::from_text(port);
        if !is_valid_port_name(contact.name()) {
            if !style.quiet {
                crate::warn!("Failure: invalid port name '{}'", contact.name());
            }
            return false;
        }

        let probe_style = ContactStyle {
            admin: true,
            ..style.clone()
        };
        let mut cmd = Message::new();
        cmd.add_vocab("ver");
        let mut reply = Message::new();
        if self.write(&contact, &cmd, &mut reply, &probe_style).is_err() {
            return false;
        }
        let first = reply.get(0).map(Value::as_text).unwrap_or_default();
        first == "ver" || first == "dict"
    }

    /// Resolve a port name to a static contact. Strings that already
    /// carry an address parse directly, without a name-service query.
    pub fn query_name(&self, name: &str) -> Option<Contact> {
        crate::debug!("query name {}", name);
        let parsed = Contact::from_text(name);
        if parsed.is_valid() {
            return Some(parsed);
        }
        self.namespace().query_name(name)
    }

    /// Register a name with the name service.
    pub fn register_name(&self, name: &str) -> Result<Contact> {
        crate::debug!("register name {}", name);
        self.namespace().register_name(name)
    }

    /// Register a contact with the name service.
    pub fn register_contact(&self, contact: &Contact) -> Result<Contact> {
        crate::debug!("register contact {}", contact);
        self.namespace().register_contact(contact)
    }

    /// Remove a registration by name.
    pub fn unregister_name(&self, name: &str) -> Result<Contact> {
        self.namespace().unregister_name(name)
    }

    /// Remove a registration by contact.
    pub fn unregister_contact(&self, contact: &Contact) -> Result<Contact> {
        self.namespace().unregister_contact(contact)
    }

    /// Send a command to a port's administrative channel.
    pub fn write(
        &self,
        contact: &Contact,
        cmd: &Message,
        reply: &mut Message,
        style: &ContactStyle,
    ) -> Result<()> {
        admin::write(
            self.namespace(),
            self.carriers(),
            self.connector(),
            contact,
            cmd,
            reply,
            style,
        )
    }

    /// Raw administrative dialogue with the name server, honoring the
    /// query bypass.
    pub fn write_to_name_server(
        &self,
        cmd: &Message,
        reply: &mut Message,
        style: &ContactStyle,
    ) -> bool {
        self.namespace().write_to_name_server(cmd, reply, style)
    }

    /// Install a carrier prototype.
    pub fn register_carrier(&self, name: &str, factory: std::sync::Arc<CarrierFactory>) -> bool {
        self.carriers().register(name, factory)
    }

    /// True iff port numbers are allocated locally rather than by the
    /// name server.
    pub fn local_network_allocation(&self) -> bool {
        !self.namespace().server_allocates_port_numbers()
    }

    /// Probe whether the name service is reachable.
    pub fn check_network(&self) -> bool {
        self.namespace().check_network()
    }

    /// Mark an endpoint stale ("dud") in the name space, best effort, so
    /// queries avoid it until it re-registers.
    pub(crate) fn note_dud(&self, contact: &Contact) -> bool {
        if let Some(store) = self.namespace().query_bypass() {
            return store.announce(contact.name(), false);
        }
        let mut cmd = Message::new();
        cmd.add_str("announce").add_str(contact.name()).add_int(0);
        let mut reply = Message::new();
        self.namespace()
            .write_to_name_server(&cmd, &mut reply, &ContactStyle::default())
    }
}

// =======================================================================
// Free functions on the global runtime
// =======================================================================

/// [`Runtime::connect`] on the global runtime.
pub fn connect(src: &str, dest: &str, style: &ContactStyle) -> Result<()> {
    Runtime::global().connect(src, dest, style)
}

/// [`Runtime::disconnect`] on the global runtime.
pub fn disconnect(src: &str, dest: &str, style: &ContactStyle) -> Result<()> {
    Runtime::global().disconnect(src, dest, style)
}

/// [`Runtime::is_connected`] on the global runtime.
pub fn is_connected(src: &str, dest: &str, style: &ContactStyle) -> bool {
    Runtime::global().is_connected(src, dest, style)
}

/// [`Runtime::exists`] on the global runtime.
pub fn exists(port: &str, style: &ContactStyle) -> bool {
    Runtime::global().exists(port, style)
}

/// [`Runtime::query_name`] on the global runtime.
pub fn query_name(name: &str) -> Option<Contact> {
    Runtime::global().query_name(name)
}

/// [`Runtime::register_name`] on the global runtime.
pub fn register_name(name: &str) -> Result<Contact> {
    Runtime::global().register_name(name)
}

/// [`Runtime::register_contact`] on the global runtime.
pub fn register_contact(contact: &Contact) -> Result<Contact> {
    Runtime::global().register_contact(contact)
}

/// [`Runtime::unregister_name`] on the global runtime.
pub fn unregister_name(name: &str) -> Result<Contact> {
    Runtime::global().unregister_name(name)
}

/// [`Runtime::unregister_contact`] on the global runtime.
pub fn unregister_contact(contact: &Contact) -> Result<Contact> {
    Runtime::global().unregister_contact(contact)
}
