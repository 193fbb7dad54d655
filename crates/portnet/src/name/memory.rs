// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process name service.
//!
//! Backs local mode, the query bypass, and the test suite: a registry of
//! name to contact, persistent subscriptions, and topic link tables, with
//! the port allocator seeded from the configured port-range hint.

use std::sync::atomic::{AtomicU16, AtomicU32, AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::{NameSpace, NameStore};
use crate::admin::{Message, Value};
use crate::config;
use crate::contact::{Contact, ContactStyle, WILDCARD_NAME};
use crate::network::Result;

/// A recorded persistent subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Source port name.
    pub src: String,
    /// Destination port name.
    pub dest: String,
    /// Carrier recorded for reinstatement, possibly empty.
    pub carrier: String,
}

#[derive(Debug, Clone)]
struct Entry {
    contact: Contact,
    active: bool,
}

#[derive(Debug, Default)]
struct TopicLinks {
    publishers: Vec<String>,
    subscribers: Vec<String>,
}

/// In-process [`NameSpace`] + [`NameStore`].
///
/// Entries marked stale by `announce(name, false)` are skipped by queries
/// until the name is registered or announced again.
pub struct MemoryNameSpace {
    entries: DashMap<String, Entry>,
    subscriptions: Mutex<Vec<Subscription>>,
    topics: DashMap<String, TopicLinks>,
    next_port: AtomicU16,
    next_generated: AtomicU32,
    persistent_calls: AtomicUsize,
    host: String,
}

impl MemoryNameSpace {
    /// An empty store allocating ports from the configured range hint.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            subscriptions: Mutex::new(Vec::new()),
            topics: DashMap::new(),
            next_port: AtomicU16::new(config::default_port_range()),
            next_generated: AtomicU32::new(1),
            persistent_calls: AtomicUsize::new(0),
            host: "127.0.0.1".to_string(),
        }
    }

    /// Seed the store with a fully specified contact.
    pub fn insert(&self, contact: Contact) {
        self.entries.insert(
            contact.name().to_string(),
            Entry {
                contact,
                active: true,
            },
        );
    }

    /// Snapshot of the recorded persistent subscriptions.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.lock().clone()
    }

    /// Snapshot of one topic's links: `(publishers, subscribers)`.
    pub fn topic_links(&self, topic: &str) -> Option<(Vec<String>, Vec<String>)> {
        self.topics
            .get(topic)
            .map(|links| (links.publishers.clone(), links.subscribers.clone()))
    }

    /// Number of persistent connect/disconnect operations handled.
    pub fn persistent_call_count(&self) -> usize {
        self.persistent_calls.load(Ordering::Relaxed)
    }

    fn allocate_port(&self) -> u16 {
        self.next_port.fetch_add(1, Ordering::Relaxed)
    }

    fn generate_name(&self) -> String {
        let n = self.next_generated.fetch_add(1, Ordering::Relaxed);
        format!("/tmp/port/{}", n)
    }

    fn remove(&self, name: &str) -> Contact {
        match self.entries.remove(name) {
            Some((_, entry)) => entry.contact,
            None => Contact::from_name(name),
        }
    }

    fn retain_subscriptions(&self, src: &str, dest: &str) -> bool {
        let mut subs = self.subscriptions.lock();
        let before = subs.len();
        subs.retain(|s| !(s.src == src && s.dest == dest));
        subs.len() != before
    }
}

impl Default for MemoryNameSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl NameSpace for MemoryNameSpace {
    fn query_name(&self, name: &str) -> Option<Contact> {
        self.entries
            .get(name)
            .filter(|entry| entry.active)
            .map(|entry| entry.contact.clone())
    }

    fn register_name(&self, name: &str) -> Result<Contact> {
        let name = if name == WILDCARD_NAME {
            self.generate_name()
        } else {
            name.to_string()
        };
        self.register_contact(&Contact::from_name(&name))
    }

    fn register_contact(&self, contact: &Contact) -> Result<Contact> {
        let mut completed = contact.clone();
        if !completed.is_valid() {
            let host = if completed.host().is_empty() {
                self.host.clone()
            } else {
                completed.host().to_string()
            };
            completed.set_socket(&host, self.allocate_port());
        }
        self.insert(completed.clone());
        Ok(completed)
    }

    fn unregister_name(&self, name: &str) -> Result<Contact> {
        Ok(self.remove(name))
    }

    fn unregister_contact(&self, contact: &Contact) -> Result<Contact> {
        Ok(self.remove(contact.name()))
    }

    fn connect_port_to_port_persistently(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.persistent_calls.fetch_add(1, Ordering::Relaxed);
        // Re-subscribing replaces the old record (carrier may change).
        self.retain_subscriptions(src.name(), dest.name());
        self.subscriptions.lock().push(Subscription {
            src: src.name().to_string(),
            dest: dest.name().to_string(),
            carrier: style.carrier.clone(),
        });
        true
    }

    fn disconnect_port_to_port_persistently(
        &self,
        src: &Contact,
        dest: &Contact,
        _style: &ContactStyle,
    ) -> bool {
        self.persistent_calls.fetch_add(1, Ordering::Relaxed);
        self.retain_subscriptions(src.name(), dest.name());
        true
    }

    fn connect_topic_to_port(&self, src: &Contact, dest: &Contact, _style: &ContactStyle) -> bool {
        let mut links = self.topics.entry(src.name().to_string()).or_default();
        if !links.subscribers.iter().any(|s| s == dest.name()) {
            links.subscribers.push(dest.name().to_string());
        }
        true
    }

    fn disconnect_topic_from_port(
        &self,
        src: &Contact,
        dest: &Contact,
        _style: &ContactStyle,
    ) -> bool {
        match self.topics.get_mut(src.name()) {
            Some(mut links) => {
                let before = links.subscribers.len();
                links.subscribers.retain(|s| s != dest.name());
                links.subscribers.len() != before
            }
            None => false,
        }
    }

    fn connect_port_to_topic(&self, src: &Contact, dest: &Contact, _style: &ContactStyle) -> bool {
        let mut links = self.topics.entry(dest.name().to_string()).or_default();
        if !links.publishers.iter().any(|p| p == src.name()) {
            links.publishers.push(src.name().to_string());
        }
        true
    }

    fn disconnect_port_from_topic(
        &self,
        src: &Contact,
        dest: &Contact,
        _style: &ContactStyle,
    ) -> bool {
        match self.topics.get_mut(dest.name()) {
            Some(mut links) => {
                let before = links.publishers.len();
                links.publishers.retain(|p| p != src.name());
                links.publishers.len() != before
            }
            None => false,
        }
    }

    fn write_to_name_server(
        &self,
        cmd: &Message,
        reply: &mut Message,
        _style: &ContactStyle,
    ) -> bool {
        self.process(cmd, reply)
    }

    fn local_only(&self) -> bool {
        true
    }
}

impl NameStore for MemoryNameSpace {
    fn query(&self, name: &str) -> Option<Contact> {
        NameSpace::query_name(self, name)
    }

    fn announce(&self, name: &str, active: bool) -> bool {
        match self.entries.get_mut(name) {
            Some(mut entry) => {
                entry.active = active;
                true
            }
            None => false,
        }
    }

    fn process(&self, cmd: &Message, reply: &mut Message) -> bool {
        reply.clear();
        let verb = cmd.get(0).map(Value::as_text).unwrap_or_default();
        match verb.as_str() {
            "announce" => {
                let name = cmd.get(1).map(Value::as_text).unwrap_or_default();
                let active = cmd.get(2).map_or(true, Value::as_bool);
                let known = self.announce(&name, active);
                reply.add_str(if known { "ok" } else { "fail" });
                known
            }
            "query" => {
                let name = cmd.get(1).map(Value::as_text).unwrap_or_default();
                match NameStore::query(self, &name) {
                    Some(contact) => {
                        reply.add_str("ok").add_str(&contact.to_text());
                        true
                    }
                    None => {
                        reply.add_str("fail");
                        false
                    }
                }
            }
            "register" => {
                let name = cmd.get(1).map(Value::as_text).unwrap_or_default();
                match self.register_name(&name) {
                    Ok(contact) => {
                        reply.add_str("ok").add_str(&contact.to_text());
                        true
                    }
                    Err(_) => {
                        reply.add_str("fail");
                        false
                    }
                }
            }
            "unregister" => {
                let name = cmd.get(1).map(Value::as_text).unwrap_or_default();
                let removed = self.remove(&name);
                reply.add_str("ok").add_str(&removed.to_text());
                true
            }
            _ => {
                reply.add_str("fail");
                false
            }
        }
    }
}
