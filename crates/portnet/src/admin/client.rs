// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Administrative RPC client.
//!
//! [`write`] sends one command to a port's administrative channel and
//! optionally reads back a reply. Two paths exist, selected by the
//! name-space's port-allocation policy:
//!
//! 1. the name service does **not** allocate port numbers centrally: a
//!    transient local port (single outgoing link, destroyed on return)
//!    carries the exchange;
//! 2. otherwise the target is resolved through the name space and a
//!    transport is opened for just this call.
//!
//! Byte transport is behind the [`Connector`] seam; [`TcpConnector`] is
//! the default. Tests inject scripted connectors.

use std::io::{self, BufRead, BufReader, Write as _};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::message::{Message, Value};
use crate::carrier::CarrierRegistry;
use crate::config;
use crate::contact::{Contact, ContactStyle};
use crate::name::NameSpaceHandle;
use crate::network::{Error, Result};

/// A line-oriented byte channel to one peer, owned by a single call.
pub trait Channel: Send {
    /// Send one line (terminator added by the channel).
    fn send_line(&mut self, line: &str) -> io::Result<()>;

    /// Receive one line, stripped of its terminator.
    fn recv_line(&mut self) -> io::Result<String>;
}

/// Opens byte channels to static contacts.
pub trait Connector: Send + Sync {
    /// Open a channel to `address`, honoring `timeout` on connect and on
    /// each subsequent I/O operation.
    fn open(&self, address: &Contact, timeout: Option<Duration>) -> io::Result<Box<dyn Channel>>;
}

/// Send `cmd` to the administrative channel of `contact`.
///
/// On success the peer's reply (if `style.expect_reply`) is left in
/// `reply`. Any I/O failure, resolution failure, or protocol-level
/// `fail` reply surfaces as an error; resources opened during the call
/// are released on every exit path.
pub fn write(
    namespace: &NameSpaceHandle,
    carriers: &CarrierRegistry,
    connector: &dyn Connector,
    contact: &Contact,
    cmd: &Message,
    reply: &mut Message,
    style: &ContactStyle,
) -> Result<()> {
    if !namespace.server_allocates_port_numbers() {
        return write_via_transient_port(namespace, carriers, connector, contact, cmd, reply, style);
    }

    let mut address = contact.clone();
    if !address.is_valid() {
        address = namespace.query_name(contact.name()).unwrap_or_default();
    }
    if !address.is_valid() {
        if !style.quiet {
            crate::error!("cannot find port {}", contact.name());
        }
        return Err(Error::Unresolved {
            role: "target",
            name: contact.name().to_string(),
        });
    }

    exchange(
        carriers,
        connector,
        &address,
        contact.name(),
        config::ADMIN_ROUTE_NAME,
        cmd,
        reply,
        style,
    )
}

/// The pre-allocation path: a transient local port in admin mode stands
/// in for a full port object, holding a single outgoing link for the
/// duration of the exchange.
fn write_via_transient_port(
    namespace: &NameSpaceHandle,
    carriers: &CarrierRegistry,
    connector: &dyn Connector,
    contact: &Contact,
    cmd: &Message,
    reply: &mut Message,
    style: &ContactStyle,
) -> Result<()> {
    let mut target = contact.clone();
    if !style.carrier.is_empty() {
        target.set_carrier(&style.carrier);
    }

    let mut address = target.clone();
    if !address.is_valid() {
        if let Some(found) = namespace.query_name(target.name()) {
            address = found;
        }
    }
    if !address.is_valid() {
        if !style.quiet {
            crate::error!("cannot make connection to '{}'", target);
        }
        return Err(Error::Unreachable(target.name().to_string()));
    }

    exchange(
        carriers,
        connector,
        &address,
        target.name(),
        config::TRANSIENT_ROUTE_NAME,
        cmd,
        reply,
        style,
    )
}

/// One request/reply exchange over a freshly opened channel.
#[allow(clippy::too_many_arguments)]
fn exchange(
    carriers: &CarrierRegistry,
    connector: &dyn Connector,
    address: &Contact,
    target_name: &str,
    route_name: &str,
    cmd: &Message,
    reply: &mut Message,
    style: &ContactStyle,
) -> Result<()> {
    let route_carrier = if style.carrier.is_empty() {
        config::FALLBACK_ROUTE_CARRIER
    } else {
        style.carrier.as_str()
    };

    let mut channel = connector.open(address, style.timeout).map_err(|e| {
        if !style.quiet {
            crate::error!("cannot connect to port {}: {}", target_name, e);
        }
        Error::Unreachable(target_name.to_string())
    })?;

    channel.send_line(&format!("{} {} {}", route_name, target_name, route_carrier))?;

    // The escape tag distinguishes administrative from data traffic; it
    // only exists on carriers whose stream admits it.
    let capability_carrier = if style.carrier.is_empty() {
        address.carrier()
    } else {
        style.carrier.as_str()
    };
    let can_escape = carriers
        .choose(capability_carrier)
        .map_or(true, |c| c.can_escape());
    if can_escape {
        channel.send_line(if style.admin { "a" } else { "d" })?;
    }

    channel.send_line(&cmd.to_text())?;

    if style.expect_reply {
        let line = channel.recv_line()?;
        *reply = Message::from_text(&line);
        if reply.get(0).and_then(Value::as_str) == Some("fail") {
            return Err(Error::ProtocolDenied(reply.to_text()));
        }
    }
    Ok(())
}

/// Default connector: one TCP stream per exchange.
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn open(&self, address: &Contact, timeout: Option<Duration>) -> io::Result<Box<dyn Channel>> {
        let port = address
            .port()
            .filter(|p| *p > 0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address has no port"))?;

        let stream = match timeout {
            Some(limit) => {
                let addr = (address.host(), port)
                    .to_socket_addrs()?
                    .next()
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::AddrNotAvailable, "unresolvable host")
                    })?;
                TcpStream::connect_timeout(&addr, limit)?
            }
            None => TcpStream::connect((address.host(), port))?,
        };

        stream.set_nodelay(true).ok();
        stream.set_read_timeout(timeout).ok();
        stream.set_write_timeout(timeout).ok();

        let reader = BufReader::new(stream.try_clone()?);
        Ok(Box::new(TcpChannel {
            reader,
            writer: stream,
        }))
    }
}

struct TcpChannel {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Channel for TcpChannel {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    fn recv_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed",
            ));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}
