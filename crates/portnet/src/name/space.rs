// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide name-space facade.
//!
//! One handle per runtime. Reads are lock-cheap (`parking_lot` RwLock,
//! clone-out of `Arc`s) because concurrent arbitration calls hit the
//! facade from many threads.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{NameSpace, NameStore};
use crate::admin::Message;
use crate::contact::{Contact, ContactStyle};
use crate::network::{Error, Result};

/// Uniform view over the installed name service plus the optional
/// in-process query bypass.
pub struct NameSpaceHandle {
    inner: RwLock<Option<Arc<dyn NameSpace>>>,
    bypass: RwLock<Option<Arc<dyn NameStore>>>,
}

impl NameSpaceHandle {
    /// A handle with nothing installed.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
            bypass: RwLock::new(None),
        }
    }

    /// Install (or replace) the backing name service.
    pub fn install(&self, namespace: Arc<dyn NameSpace>) {
        *self.inner.write() = Some(namespace);
    }

    /// Drop the backing name service (library teardown).
    pub fn clear(&self) {
        *self.inner.write() = None;
        *self.bypass.write() = None;
    }

    /// The installed name service, if any.
    pub fn namespace(&self) -> Option<Arc<dyn NameSpace>> {
        self.inner.read().clone()
    }

    /// Override resolution with an in-process store (tests, embedded name
    /// servers). `None` removes the override.
    pub fn set_query_bypass(&self, store: Option<Arc<dyn NameStore>>) {
        *self.bypass.write() = store;
    }

    /// The installed bypass store, if any.
    pub fn query_bypass(&self) -> Option<Arc<dyn NameStore>> {
        self.bypass.read().clone()
    }

    /// Resolve a name. The bypass store, when installed, is authoritative.
    pub fn query_name(&self, name: &str) -> Option<Contact> {
        if let Some(store) = self.query_bypass() {
            return store.query(name);
        }
        self.namespace().and_then(|ns| ns.query_name(name))
    }

    /// Register a name with the service.
    pub fn register_name(&self, name: &str) -> Result<Contact> {
        match self.namespace() {
            Some(ns) => ns.register_name(name),
            None => Err(Error::Unsupported("no name space configured")),
        }
    }

    /// Register a contact with the service.
    pub fn register_contact(&self, contact: &Contact) -> Result<Contact> {
        match self.namespace() {
            Some(ns) => ns.register_contact(contact),
            None => Err(Error::Unsupported("no name space configured")),
        }
    }

    /// Unregister a name.
    pub fn unregister_name(&self, name: &str) -> Result<Contact> {
        match self.namespace() {
            Some(ns) => ns.unregister_name(name),
            None => Err(Error::Unsupported("no name space configured")),
        }
    }

    /// Unregister a contact.
    pub fn unregister_contact(&self, contact: &Contact) -> Result<Contact> {
        match self.namespace() {
            Some(ns) => ns.unregister_contact(contact),
            None => Err(Error::Unsupported("no name space configured")),
        }
    }

    /// Record a persistent port-to-port subscription.
    pub fn connect_port_to_port_persistently(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.namespace()
            .map_or(false, |ns| ns.connect_port_to_port_persistently(src, dest, style))
    }

    /// Remove a persistent port-to-port subscription.
    pub fn disconnect_port_to_port_persistently(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.namespace()
            .map_or(false, |ns| ns.disconnect_port_to_port_persistently(src, dest, style))
    }

    /// Link a topic to a receiving port.
    pub fn connect_topic_to_port(&self, src: &Contact, dest: &Contact, style: &ContactStyle) -> bool {
        self.namespace()
            .map_or(false, |ns| ns.connect_topic_to_port(src, dest, style))
    }

    /// Unlink a topic from a receiving port.
    pub fn disconnect_topic_from_port(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.namespace()
            .map_or(false, |ns| ns.disconnect_topic_from_port(src, dest, style))
    }

    /// Link a publishing port into a topic.
    pub fn connect_port_to_topic(&self, src: &Contact, dest: &Contact, style: &ContactStyle) -> bool {
        self.namespace()
            .map_or(false, |ns| ns.connect_port_to_topic(src, dest, style))
    }

    /// Unlink a publishing port from a topic.
    pub fn disconnect_port_from_topic(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.namespace()
            .map_or(false, |ns| ns.disconnect_port_from_topic(src, dest, style))
    }

    /// Raw name-server dialogue, honoring the bypass store.
    pub fn write_to_name_server(
        &self,
        cmd: &Message,
        reply: &mut Message,
        style: &ContactStyle,
    ) -> bool {
        if let Some(store) = self.query_bypass() {
            return store.process(cmd, reply);
        }
        self.namespace()
            .map_or(false, |ns| ns.write_to_name_server(cmd, reply, style))
    }

    /// True iff the name space never leaves the local host.
    pub fn local_only(&self) -> bool {
        self.namespace().map_or(true, |ns| ns.local_only())
    }

    /// True iff the server assigns port numbers centrally.
    pub fn server_allocates_port_numbers(&self) -> bool {
        self.namespace()
            .map_or(true, |ns| ns.server_allocates_port_numbers())
    }

    /// True iff connection records carry endpoint names directly.
    pub fn connection_has_name_of_endpoints(&self) -> bool {
        self.namespace()
            .map_or(true, |ns| ns.connection_has_name_of_endpoints())
    }

    /// Probe whether the name service is reachable.
    pub fn check_network(&self) -> bool {
        self.namespace().map_or(false, |ns| ns.check_network())
    }
}

impl Default for NameSpaceHandle {
    fn default() -> Self {
        Self::new()
    }
}
