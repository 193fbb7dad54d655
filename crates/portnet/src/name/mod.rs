// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Name-space facade.
//!
//! The arbitration engine sees the name service only through the
//! [`NameSpace`] trait: resolution, registration, persistent-subscription
//! storage, topic operations, and a raw escape hatch to the server. The
//! concrete wire client lives outside this crate; what ships here is
//!
//! - [`NameSpaceHandle`]: the process-wide facade, including the query
//!   bypass used by tests and embedded name servers,
//! - [`MemoryNameSpace`]: an in-process name service for local mode.

mod memory;
mod space;

pub use memory::{MemoryNameSpace, Subscription};
pub use space::NameSpaceHandle;

use crate::admin::Message;
use crate::contact::{Contact, ContactStyle};
use crate::network::Result;

/// Operations the core consumes from a name service.
///
/// Implementations must be thread-safe: concurrent arbitration calls on
/// disjoint endpoint pairs issue overlapping reads.
pub trait NameSpace: Send + Sync {
    /// Resolve a port name to a static contact. `None` when unknown.
    fn query_name(&self, name: &str) -> Option<Contact>;

    /// Register a name, letting the service fill in the address. The
    /// wildcard `...` asks the service to pick a name too.
    fn register_name(&self, name: &str) -> Result<Contact>;

    /// Register a (possibly partial) contact, returning the completed one.
    fn register_contact(&self, contact: &Contact) -> Result<Contact>;

    /// Remove a registration by name.
    fn unregister_name(&self, name: &str) -> Result<Contact>;

    /// Remove a registration by contact.
    fn unregister_contact(&self, contact: &Contact) -> Result<Contact>;

    /// Record a port-to-port subscription to be reinstated as its
    /// endpoints appear.
    fn connect_port_to_port_persistently(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool;

    /// Remove a recorded port-to-port subscription.
    fn disconnect_port_to_port_persistently(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool;

    /// Link a topic's fan-out to a receiving port.
    fn connect_topic_to_port(&self, src: &Contact, dest: &Contact, style: &ContactStyle) -> bool;

    /// Undo [`connect_topic_to_port`](Self::connect_topic_to_port).
    fn disconnect_topic_from_port(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool;

    /// Link a publishing port into a topic's fan-in.
    fn connect_port_to_topic(&self, src: &Contact, dest: &Contact, style: &ContactStyle) -> bool;

    /// Undo [`connect_port_to_topic`](Self::connect_port_to_topic).
    fn disconnect_port_from_topic(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool;

    /// Raw administrative dialogue with the name server.
    fn write_to_name_server(&self, cmd: &Message, reply: &mut Message, style: &ContactStyle)
        -> bool;

    /// True iff this name space never leaves the local process/host.
    fn local_only(&self) -> bool {
        false
    }

    /// True iff the server assigns port numbers centrally.
    fn server_allocates_port_numbers(&self) -> bool {
        true
    }

    /// True iff connection records carry endpoint names directly, making
    /// resolution unnecessary for topical operations.
    fn connection_has_name_of_endpoints(&self) -> bool {
        true
    }

    /// Probe whether the name service is reachable at all.
    fn check_network(&self) -> bool {
        true
    }
}

/// In-process resolution override installed via
/// [`NameSpaceHandle::set_query_bypass`].
///
/// When a store is installed it is authoritative: queries, dud
/// announcements, and raw name-server writes all short-circuit here
/// without touching the network.
pub trait NameStore: Send + Sync {
    /// Resolve a name.
    fn query(&self, name: &str) -> Option<Contact>;

    /// Mark a name active or stale ("dud"). Stale entries are skipped by
    /// queries until re-registered.
    fn announce(&self, name: &str, active: bool) -> bool;

    /// Handle a raw name-server command.
    fn process(&self, cmd: &Message, reply: &mut Message) -> bool;
}
