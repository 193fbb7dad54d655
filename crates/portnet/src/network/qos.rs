// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-connection quality-of-service properties.
//!
//! Connection units are configured through the `prop set <unit>` /
//! `prop get <unit>` administrative commands, carrying scheduling and
//! packet-priority groups:
//!
//! ```text
//! prop set /dest (sched ((priority 30) (policy 1))) (qos ((tos 16)))
//! prop get /dest
//! ```

use std::time::Duration;

use super::Runtime;
use crate::admin::{Message, Value};
use crate::contact::{Contact, ContactStyle};

/// Scheduling and packet-priority settings of one connection side.
///
/// `-1` everywhere means "leave as is"; such a style is skipped entirely
/// when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosStyle {
    /// Thread priority for the connection's worker.
    pub thread_priority: i32,
    /// Scheduling policy for the connection's worker.
    pub thread_policy: i32,
    /// IP type-of-service byte for outgoing packets.
    pub packet_priority_tos: i32,
}

impl Default for QosStyle {
    fn default() -> Self {
        Self {
            thread_priority: -1,
            thread_policy: -1,
            packet_priority_tos: -1,
        }
    }
}

impl QosStyle {
    /// True iff every field is left at "leave as is".
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl Runtime {
    /// Configure both sides of the `src` -> `dest` connection.
    ///
    /// Each endpoint is told about the unit on its far side; sides whose
    /// style is all-default are skipped.
    pub fn set_connection_qos(
        &self,
        src: &str,
        dest: &str,
        src_style: &QosStyle,
        dest_style: &QosStyle,
        quiet: bool,
    ) -> bool {
        if !src_style.is_default() && !self.set_port_qos(src, dest, src_style, quiet) {
            return false;
        }
        if !dest_style.is_default() && !self.set_port_qos(dest, src, dest_style, quiet) {
            return false;
        }
        true
    }

    /// Read back the properties of both sides of `src` -> `dest`.
    pub fn get_connection_qos(&self, src: &str, dest: &str, quiet: bool) -> Option<(QosStyle, QosStyle)> {
        let src_style = self.get_port_qos(src, dest, quiet)?;
        let dest_style = self.get_port_qos(dest, src, quiet)?;
        Some((src_style, dest_style))
    }

    fn set_port_qos(&self, port: &str, unit: &str, qos: &QosStyle, quiet: bool) -> bool {
        let mut cmd = Message::new();
        cmd.add_str("prop").add_str("set").add_str(unit);
        cmd.add_list(vec![
            Value::Str("sched".to_string()),
            Value::List(vec![
                pair("priority", qos.thread_priority),
                pair("policy", qos.thread_policy),
            ]),
        ]);
        cmd.add_list(vec![
            Value::Str("qos".to_string()),
            Value::List(vec![pair("tos", qos.packet_priority_tos)]),
        ]);

        let mut reply = Message::new();
        let contact = Contact::from_text(port);
        if self.write(&contact, &cmd, &mut reply, &prop_style(quiet)).is_err() {
            if !quiet {
                crate::warn!("Cannot write to '{}'", port);
            }
            return false;
        }
        if reply.get(0).and_then(Value::as_str) != Some("ok") {
            if !quiet {
                crate::warn!(
                    "Cannot set qos properties of '{}'. ({})",
                    port,
                    reply.to_text()
                );
            }
            return false;
        }
        true
    }

    fn get_port_qos(&self, port: &str, unit: &str, quiet: bool) -> Option<QosStyle> {
        let mut cmd = Message::new();
        cmd.add_str("prop").add_str("get").add_str(unit);

        let mut reply = Message::new();
        let contact = Contact::from_text(port);
        if self.write(&contact, &cmd, &mut reply, &prop_style(quiet)).is_err() {
            if !quiet {
                crate::warn!("Cannot write to '{}'", port);
            }
            return None;
        }
        if reply.is_empty() {
            if !quiet {
                crate::warn!("Cannot get qos properties of '{}'", port);
            }
            return None;
        }

        let sched = reply.find("sched").and_then(as_pairs);
        let packet = reply.find("qos").and_then(as_pairs);
        Some(QosStyle {
            thread_priority: sched.and_then(|p| pair_value(p, "priority")).unwrap_or(-1),
            thread_policy: sched.and_then(|p| pair_value(p, "policy")).unwrap_or(-1),
            packet_priority_tos: packet.and_then(|p| pair_value(p, "tos")).unwrap_or(-1),
        })
    }
}

fn prop_style(quiet: bool) -> ContactStyle {
    ContactStyle {
        admin: true,
        quiet,
        timeout: Some(Duration::from_secs(2)),
        ..ContactStyle::default()
    }
}

fn pair(key: &str, value: i32) -> Value {
    Value::List(vec![Value::Str(key.to_string()), Value::Int(value)])
}

fn as_pairs(value: &Value) -> Option<&[Value]> {
    match value {
        Value::List(items) => Some(items.as_slice()),
        _ => None,
    }
}

fn pair_value(pairs: &[Value], key: &str) -> Option<i32> {
    pairs.iter().find_map(|value| match value {
        Value::List(pair) if pair.first().and_then(Value::as_str) == Some(key) => {
            pair.get(1).and_then(Value::as_int)
        }
        _ => None,
    })
}
