// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint (contact) model.
//!
//! A [`Contact`] is the parsed form of an endpoint string:
//!
//! ```text
//! /name[ carrier[+p1.v1+p2.v2...][ host:port]]
//! ```
//!
//! `name` is a hierarchical identifier beginning with `/` (or the wildcard
//! `...`, accepted only by name-registration paths). The carrier token may
//! carry a `+key.value` parameter suffix; a bare `+...` token attaches
//! parameters without choosing a carrier. When `host:port` is absent the
//! contact is *dynamic* and requires name-service resolution before use.
//!
//! This module also holds [`ContactStyle`] (per-operation configuration)
//! and [`Mode`] (connect / disconnect / exists).

use std::fmt;
use std::time::Duration;

/// Wildcard name accepted by name-registration paths and rejected elsewhere.
pub const WILDCARD_NAME: &str = "...";

/// Reserved carrier tag marking a virtual aggregation point.
pub const TOPIC_CARRIER: &str = "topic";

/// A parsed endpoint: name, carrier (possibly with `+params`), host, port.
///
/// Contacts are value types, created per call from user strings or from
/// resolver replies. A contact with a positive port number is *static*
/// (directly reachable); anything else is *dynamic*.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    name: String,
    carrier: String,
    host: String,
    port: Option<u16>,
}

impl Contact {
    /// An empty, invalid contact.
    pub fn new() -> Self {
        Self::default()
    }

    /// A dynamic contact carrying only a name.
    pub fn from_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// A fully specified contact.
    pub fn from_parts(name: &str, carrier: &str, host: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            carrier: carrier.to_string(),
            host: host.to_string(),
            port: Some(port),
        }
    }

    /// Parse the canonical string form.
    ///
    /// Parsing never fails; missing pieces are left empty and surface
    /// later through [`is_valid`](Self::is_valid) or name validation.
    /// A `+` inside the name token starts the parameter suffix, so
    /// `/cam+in.stream` is the port `/cam` with carrier params
    /// `+in.stream` and no carrier choice.
    pub fn from_text(text: &str) -> Self {
        let mut contact = Self::default();
        for token in text.split_whitespace() {
            if contact.name.is_empty() && contact.carrier.is_empty() && contact.host.is_empty() {
                if token == WILDCARD_NAME {
                    contact.name = token.to_string();
                } else {
                    match token.find('+') {
                        Some(at) => {
                            contact.name = token[..at].to_string();
                            contact.carrier = token[at..].to_string();
                        }
                        None => contact.name = token.to_string(),
                    }
                }
            } else if let Some((host, port)) = split_socket(token) {
                contact.host = host.to_string();
                contact.port = Some(port);
            } else if contact.carrier.is_empty() {
                contact.carrier = token.to_string();
            }
        }
        contact
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Carrier tag, possibly suffixed with `+key.value` parameters.
    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    /// Host address, empty for dynamic contacts.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port number, if assigned.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Replace the carrier tag.
    pub fn set_carrier(&mut self, carrier: &str) {
        self.carrier = carrier.to_string();
    }

    /// Replace the socket address.
    pub fn set_socket(&mut self, host: &str, port: u16) {
        self.host = host.to_string();
        self.port = Some(port);
    }

    /// A contact is valid once it carries a positive port number.
    pub fn is_valid(&self) -> bool {
        matches!(self.port, Some(p) if p > 0)
    }

    /// Canonical string form; parses back to an equal contact.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.carrier.is_empty() {
            write!(f, " {}", self.carrier)?;
        }
        if let Some(port) = self.port {
            if !self.host.is_empty() {
                write!(f, " {}:{}", self.host, port)?;
            }
        }
        Ok(())
    }
}

/// Split a `host:port` token; `None` if the token is not of that shape.
fn split_socket(token: &str) -> Option<(&str, u16)> {
    let (host, port) = token.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    port.parse::<u16>().ok().map(|p| (host, p))
}

/// Validity rule for port names.
///
/// A name is valid iff it is the wildcard `...`, or it is non-empty,
/// begins with `/`, does not end with `/`, and contains no whitespace.
pub fn is_valid_port_name(name: &str) -> bool {
    if name == WILDCARD_NAME {
        return true;
    }
    !name.is_empty()
        && name.starts_with('/')
        && !name.ends_with('/')
        && !name.contains(char::is_whitespace)
}

/// Bare carrier name: everything before the first `+`.
pub fn carrier_base(carrier: &str) -> &str {
    match carrier.find('+') {
        Some(at) => &carrier[..at],
        None => carrier,
    }
}

/// Carrier parameter suffix: everything from the first `+` on, or empty.
pub fn carrier_params(carrier: &str) -> &str {
    match carrier.find('+') {
        Some(at) => &carrier[at..],
        None => "",
    }
}

/// Operation mode driven through the arbitration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Establish a link.
    Connect,
    /// Tear a link down.
    Disconnect,
    /// Probe whether a link exists.
    Exists,
}

impl Mode {
    /// Human-readable tag for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Exists => "check",
        }
    }
}

/// Configuration of one connect/disconnect/probe operation.
#[derive(Debug, Clone)]
pub struct ContactStyle {
    /// Target the peer's administrative channel.
    pub admin: bool,
    /// Suppress human-readable diagnostics.
    pub quiet: bool,
    /// Emit success lines when not quiet.
    pub verbose_on_success: bool,
    /// Per-step timeout; `None` means the operation may block indefinitely.
    pub timeout: Option<Duration>,
    /// Desired transport, possibly with `+params`.
    pub carrier: String,
    /// Read back a reply body after the command.
    pub expect_reply: bool,
    /// Record the link centrally and reinstate it as endpoints appear.
    pub persistent: bool,
}

impl Default for ContactStyle {
    fn default() -> Self {
        Self {
            admin: false,
            quiet: false,
            verbose_on_success: true,
            timeout: None,
            carrier: String::new(),
            expect_reply: true,
            persistent: false,
        }
    }
}

impl ContactStyle {
    /// A style with diagnostics suppressed.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    /// The style used for the administrative dialogues the engine issues:
    /// admin mode on, quiet/timeout inherited, everything else default.
    pub(crate) fn admin_rpc(of: &Self) -> Self {
        Self {
            admin: true,
            quiet: of.quiet,
            timeout: of.timeout,
            ..Self::default()
        }
    }
}
