// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::module_name_repetitions)] // Test modules
#![allow(clippy::needless_pass_by_value)] // Test helpers
#![allow(clippy::wildcard_imports)] // Test utility imports

//! End-to-end arbitration scenarios.
//!
//! Each test drives a [`Runtime`] built with a scripted connector (every
//! administrative exchange is recorded and answered from a canned reply
//! queue) and an in-process name space, so the whole decision procedure
//! runs without touching the network.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portnet::config::AmbientConfig;
use portnet::contact::carrier_base;
use portnet::name::NameSpace;
use portnet::{
    Carrier, Channel, Connector, Contact, ContactStyle, Error, MemoryNameSpace, Message, Mode,
    Runtime, Value,
};

// ======================================================================
// Harness
// ======================================================================

/// One recorded administrative exchange: where it went, what was sent.
#[derive(Debug, Clone)]
struct Exchange {
    address: String,
    lines: Vec<String>,
}

impl Exchange {
    /// The command line (everything after route and escape tag).
    fn command(&self) -> Message {
        Message::from_text(self.lines.last().map(String::as_str).unwrap_or(""))
    }

    fn verb(&self) -> String {
        self.command().get(0).map(Value::as_text).unwrap_or_default()
    }
}

/// Connector answering each opened channel from a canned reply queue.
struct ScriptedConnector {
    replies: Mutex<VecDeque<String>>,
    exchanges: Arc<Mutex<Vec<Exchange>>>,
}

impl ScriptedConnector {
    fn new(replies: &[&str]) -> (Arc<Self>, Arc<Mutex<Vec<Exchange>>>) {
        let exchanges = Arc::new(Mutex::new(Vec::new()));
        let connector = Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            exchanges: exchanges.clone(),
        });
        (connector, exchanges)
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, address: &Contact, _timeout: Option<Duration>) -> io::Result<Box<dyn Channel>> {
        let reply = self.replies.lock().unwrap().pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::ConnectionRefused, "peer not reachable")
        })?;
        let mut exchanges = self.exchanges.lock().unwrap();
        exchanges.push(Exchange {
            address: address.to_text(),
            lines: Vec::new(),
        });
        let index = exchanges.len() - 1;
        Ok(Box::new(ScriptedChannel {
            reply: Some(reply),
            index,
            exchanges: self.exchanges.clone(),
        }))
    }
}

struct ScriptedChannel {
    reply: Option<String>,
    index: usize,
    exchanges: Arc<Mutex<Vec<Exchange>>>,
}

impl Channel for ScriptedChannel {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.exchanges.lock().unwrap()[self.index]
            .lines
            .push(line.to_string());
        Ok(())
    }

    fn recv_line(&mut self) -> io::Result<String> {
        self.reply
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no reply scripted"))
    }
}

fn runtime_with(replies: &[&str]) -> (Runtime, Arc<MemoryNameSpace>, Arc<Mutex<Vec<Exchange>>>) {
    let store = Arc::new(MemoryNameSpace::new());
    let (connector, exchanges) = ScriptedConnector::new(replies);
    let runtime = Runtime::builder()
        .name_space(store.clone())
        .connector(connector)
        .config(AmbientConfig::default())
        .build();
    (runtime, store, exchanges)
}

fn register(store: &MemoryNameSpace, name: &str, carrier: &str, port: u16) {
    store.insert(Contact::from_parts(name, carrier, "127.0.0.1", port));
}

fn quiet() -> ContactStyle {
    ContactStyle::quiet()
}

/// A pull carrier that cannot bootstrap the handshake itself.
struct MjpegCarrier {
    calls: Arc<Mutex<Vec<(String, String, String, bool)>>>,
}

impl Carrier for MjpegCarrier {
    fn name(&self) -> &str {
        "mjpeg"
    }

    fn bootstrap_carrier_name(&self) -> &str {
        ""
    }

    fn is_push(&self) -> bool {
        false
    }

    fn connect(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
        _mode: Mode,
        reversed: bool,
    ) -> Option<portnet::Result<()>> {
        self.calls.lock().unwrap().push((
            src.name().to_string(),
            dest.name().to_string(),
            style.carrier.clone(),
            reversed,
        ));
        Some(Ok(()))
    }
}

/// A competent pull carrier (reverse handshake over tcp).
struct PullCarrier;

impl Carrier for PullCarrier {
    fn name(&self) -> &str {
        "pullc"
    }

    fn is_push(&self) -> bool {
        false
    }
}

// ======================================================================
// E1: plain connect, source initiates
// ======================================================================

#[test]
fn connect_picks_ground_carrier_and_source_initiates() {
    let (rt, store, exchanges) = runtime_with(&[
        "",                              // list out /b: no existing connection
        "0 \"Added connection /a->/b\"", // add
    ]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    rt.connect("/a", "/b", &quiet()).unwrap();

    let log = exchanges.lock().unwrap();
    assert_eq!(log.len(), 2);
    // Both dialogues go to the source port, which initiates.
    assert!(log[0].address.contains("127.0.0.1:10001"));
    assert!(log[1].address.contains("127.0.0.1:10001"));
    assert_eq!(log[0].command().to_text(), "[list] [out] /b");
    // Chosen carrier is tcp, riding on the destination endpoint string.
    assert_eq!(log[1].command().to_text(), "[add] \"/b tcp\"");
}

#[test]
fn connect_survives_legacy_ack_line() {
    let (rt, store, _exchanges) =
        runtime_with(&["", "\"Added connection from /a to /b\""]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    assert!(rt.connect("/a", "/b", &quiet()).is_ok());
}

#[test]
fn failed_connect_marks_destination_dud() {
    let (rt, store, _exchanges) = runtime_with(&["", "-1 \"No such port\""]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    let outcome = rt.connect("/a", "/b", &quiet());
    assert!(matches!(outcome, Err(Error::ProtocolDenied(_))));
    // The destination was marked stale; queries skip it now.
    assert!(NameSpace::query_name(store.as_ref(), "/b").is_none());
    assert!(NameSpace::query_name(store.as_ref(), "/a").is_some());
}

#[test]
fn unreachable_initiator_marks_source_dud() {
    // Empty script: the very first channel open fails.
    let (rt, store, _exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    let outcome = rt.connect("/a", "/b", &quiet());
    assert!(matches!(outcome, Err(Error::Unreachable(name)) if name == "/a"));
    assert!(NameSpace::query_name(store.as_ref(), "/a").is_none());
}

// ======================================================================
// E2: non-competent destination, carrier hook, reversed initiative
// ======================================================================

#[test]
fn constraint_carrier_collects_params_and_reverses() {
    let (rt, store, exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "mjpeg", 10002);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let hook_calls = calls.clone();
    rt.carriers().register(
        "mjpeg",
        Arc::new(move || {
            Box::new(MjpegCarrier {
                calls: hook_calls.clone(),
            })
        }),
    );

    rt.connect("/a", "/b+in.stream", &quiet()).unwrap();

    // No admin dialogue: the carrier's own connect method handled it.
    assert!(exchanges.lock().unwrap().is_empty());
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (initiator, argument, carrier, reversed) = calls[0].clone();
    // The destination initiates, with the source as argument.
    assert_eq!(initiator, "/b");
    assert_eq!(argument, "/a");
    assert_eq!(carrier, "mjpeg+in.stream");
    assert!(reversed);
}

#[test]
fn pull_carrier_with_competent_destination_reverses_dialogue() {
    let (rt, store, exchanges) = runtime_with(&["", "0 \"Added connection\""]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "pullc", 10002);
    rt.carriers().register("pullc", Arc::new(|| Box::new(PullCarrier)));

    rt.connect("/a", "/b", &quiet()).unwrap();

    let log = exchanges.lock().unwrap();
    assert_eq!(log.len(), 2);
    // The destination port runs both dialogues, asking about its inputs.
    assert!(log[0].address.contains("127.0.0.1:10002"));
    assert_eq!(log[0].command().to_text(), "[list] [in] /a");
    assert_eq!(log[1].command().to_text(), "[add] \"/a pullc\"");
}

// ======================================================================
// E3 / property 6: persistent operations bypass the peers entirely
// ======================================================================

#[test]
fn persistent_connect_goes_to_subscription_store_only() {
    let (rt, store, exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    let style = ContactStyle {
        persistent: true,
        ..quiet()
    };
    rt.connect("/a", "/b", &style).unwrap();

    assert!(exchanges.lock().unwrap().is_empty());
    assert_eq!(store.persistent_call_count(), 1);
    let subs = store.subscriptions();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].src, "/a");
    assert_eq!(subs[0].dest, "/b");
}

#[test]
fn persistent_disconnect_is_one_store_call_no_rpc() {
    let (rt, store, exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    let style = ContactStyle {
        persistent: true,
        ..quiet()
    };
    rt.connect("/a", "/b", &style).unwrap();
    rt.disconnect("/a", "/b", &style).unwrap();

    assert!(exchanges.lock().unwrap().is_empty());
    assert_eq!(store.persistent_call_count(), 2);
    assert!(store.subscriptions().is_empty());
}

#[test]
fn persistent_exists_is_unsupported() {
    let (rt, store, _exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    let style = ContactStyle {
        persistent: true,
        ..quiet()
    };
    assert!(!rt.is_connected("/a", "/b", &style));
}

// ======================================================================
// E4: exists probe compares carriers, never mutates
// ======================================================================

#[test]
fn exists_check_fails_on_carrier_mismatch() {
    let (rt, store, exchanges) = runtime_with(&["(carrier tcp)"]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    let style = ContactStyle {
        carrier: "udp".to_string(),
        ..quiet()
    };
    assert!(!rt.is_connected("/a", "/b", &style));

    // The probe is the only dialogue; no add/del was issued.
    let log = exchanges.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].verb(), "list");
}

#[test]
fn exists_check_matches_reported_carrier() {
    let (rt, store, _exchanges) = runtime_with(&["(carrier tcp)"]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    assert!(rt.is_connected("/a", "/b", &quiet()));
}

#[test]
fn exists_check_reports_absent_connection() {
    let (rt, store, _exchanges) = runtime_with(&[""]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    assert!(!rt.is_connected("/a", "/b", &quiet()));
}

// ======================================================================
// E5: topics are installed by the name server
// ======================================================================

#[test]
fn topic_source_delegates_to_name_server() {
    let (rt, store, exchanges) = runtime_with(&[]);
    register(&store, "/topic@/bus", "topic", 10099);
    register(&store, "/b", "tcp", 10002);

    rt.connect("/topic@/bus", "/b", &quiet()).unwrap();

    // No carrier probing, no peer dialogue.
    assert!(exchanges.lock().unwrap().is_empty());
    let (_, subscribers) = store.topic_links("/topic@/bus").unwrap();
    assert_eq!(subscribers, vec!["/b".to_string()]);

    rt.disconnect("/topic@/bus", "/b", &quiet()).unwrap();
    let (_, subscribers) = store.topic_links("/topic@/bus").unwrap();
    assert!(subscribers.is_empty());
}

#[test]
fn topic_destination_uses_port_to_topic_link() {
    let (rt, store, exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/bus", "topic", 10099);

    rt.connect("/a", "/bus", &quiet()).unwrap();

    assert!(exchanges.lock().unwrap().is_empty());
    let (publishers, _) = store.topic_links("/bus").unwrap();
    assert_eq!(publishers, vec!["/a".to_string()]);
}

// ======================================================================
// E6: resolution misses
// ======================================================================

#[test]
fn missing_source_fails_unless_persistent() {
    let (rt, store, _exchanges) = runtime_with(&[]);
    register(&store, "/b", "tcp", 10002);

    let outcome = rt.connect("/a", "/b", &quiet());
    match outcome {
        Err(Error::Unresolved { role, name }) => {
            assert_eq!(role, "source");
            assert_eq!(name, "/a");
        }
        other => panic!("expected Unresolved, got {:?}", other),
    }

    // Persistent operations proceed with the dynamic form.
    let style = ContactStyle {
        persistent: true,
        ..quiet()
    };
    rt.connect("/a", "/b", &style).unwrap();
    assert_eq!(store.subscriptions().len(), 1);
}

#[test]
fn invalid_names_are_rejected_before_any_lookup() {
    let (rt, _store, exchanges) = runtime_with(&[]);

    assert!(matches!(
        rt.connect("nope", "/b", &quiet()),
        Err(Error::InvalidName(_))
    ));
    assert!(matches!(
        rt.connect("/a", "/b/", &quiet()),
        Err(Error::InvalidName(_))
    ));
    assert!(exchanges.lock().unwrap().is_empty());
}

// ======================================================================
// Property 5: carrier conflict
// ======================================================================

#[test]
fn requested_carrier_conflicts_with_constraint() {
    let (rt, store, exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "mjpeg", 10002);

    let calls = Arc::new(Mutex::new(Vec::new()));
    rt.carriers().register(
        "mjpeg",
        Arc::new(move || Box::new(MjpegCarrier { calls: calls.clone() })),
    );

    let style = ContactStyle {
        carrier: "udp".to_string(),
        ..quiet()
    };
    match rt.connect("/a", "/b", &style) {
        Err(Error::CarrierConflict(requested, constraint)) => {
            assert_eq!(requested, "udp");
            assert_eq!(constraint, "mjpeg");
        }
        other => panic!("expected CarrierConflict, got {:?}", other),
    }
    assert!(exchanges.lock().unwrap().is_empty());
}

#[test]
fn matching_constraint_with_params_is_no_conflict() {
    let (rt, store, _exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "mjpeg", 10002);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let hook_calls = calls.clone();
    rt.carriers().register(
        "mjpeg",
        Arc::new(move || {
            Box::new(MjpegCarrier {
                calls: hook_calls.clone(),
            })
        }),
    );

    // Same bare carrier, params differ: the request stands.
    let style = ContactStyle {
        carrier: "mjpeg+q.80".to_string(),
        ..quiet()
    };
    rt.connect("/a", "/b", &style).unwrap();
    assert_eq!(carrier_base(&calls.lock().unwrap()[0].2), "mjpeg");
}

// ======================================================================
// Property 7: compensating disconnect for stateless senders
// ======================================================================

#[test]
fn connectionless_pull_link_gets_compensating_disconnect() {
    let (rt, store, exchanges) = runtime_with(&[
        "(carrier udp) (push 0) (connectionless 1)", // probe
        "0 \"Removed\"",                             // compensating del (reverse direction)
        "0 \"Added connection\"",                    // add
    ]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    rt.connect("/a", "/b", &quiet()).unwrap();

    let log = exchanges.lock().unwrap();
    assert_eq!(log.len(), 3);
    // Probe to the source...
    assert!(log[0].address.contains("127.0.0.1:10001"));
    assert_eq!(log[0].verb(), "list");
    // ...then exactly one del, in the reverse direction (to /b, about /a)...
    assert!(log[1].address.contains("127.0.0.1:10002"));
    assert_eq!(log[1].command().to_text(), "[del] /a");
    // ...and only then the add.
    assert!(log[2].address.contains("127.0.0.1:10001"));
    assert_eq!(log[2].verb(), "add");
}

#[test]
fn session_oriented_link_needs_no_compensation() {
    let (rt, store, exchanges) = runtime_with(&[
        "(carrier tcp) (push 1) (connectionless 0)",
        "0 \"Added connection\"",
    ]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    rt.connect("/a", "/b", &quiet()).unwrap();
    assert_eq!(exchanges.lock().unwrap().len(), 2);
}

#[test]
fn compensation_failure_is_swallowed() {
    // The compensating del is refused by the peer; the primary connect
    // still succeeds.
    let (rt, store, exchanges) = runtime_with(&[
        "(carrier udp) (push 0) (connectionless 1)",
        "-1 \"no such connection\"",
        "0 \"Added connection\"",
    ]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    rt.connect("/a", "/b", &quiet()).unwrap();
    assert_eq!(exchanges.lock().unwrap().len(), 3);
}

// ======================================================================
// Port liveness probe
// ======================================================================

#[test]
fn exists_accepts_native_and_foreign_version_replies() {
    let (rt, store, _exchanges) = runtime_with(&["ver 1 2"]);
    register(&store, "/a", "tcp", 10001);
    assert!(rt.exists("/a", &quiet()));

    let (rt, store, _exchanges) = runtime_with(&["dict (code 1)"]);
    register(&store, "/a", "tcp", 10001);
    assert!(rt.exists("/a", &quiet()));

    let (rt, store, _exchanges) = runtime_with(&["huh"]);
    register(&store, "/a", "tcp", 10001);
    assert!(!rt.exists("/a", &quiet()));

    // Unreachable port: channel open fails.
    let (rt, store, _exchanges) = runtime_with(&[]);
    register(&store, "/a", "tcp", 10001);
    assert!(!rt.exists("/a", &quiet()));
}

// ======================================================================
// Connection QoS properties
// ======================================================================

#[test]
fn connection_qos_round_trip() {
    let (rt, store, exchanges) = runtime_with(&[
        "ok", // prop set on /a
        "ok", // prop set on /b
        "(sched ((priority 30) (policy 1))) (qos ((tos 16)))", // prop get on /a
        "(sched ((priority -1) (policy -1))) (qos ((tos 0)))", // prop get on /b
    ]);
    register(&store, "/a", "tcp", 10001);
    register(&store, "/b", "tcp", 10002);

    let qos = portnet::QosStyle {
        thread_priority: 30,
        thread_policy: 1,
        packet_priority_tos: 16,
    };
    assert!(rt.set_connection_qos("/a", "/b", &qos, &qos, true));

    let (src_qos, dest_qos) = rt.get_connection_qos("/a", "/b", true).unwrap();
    assert_eq!(src_qos.thread_priority, 30);
    assert_eq!(src_qos.packet_priority_tos, 16);
    assert_eq!(dest_qos.thread_priority, -1);
    assert_eq!(dest_qos.packet_priority_tos, 0);

    let log = exchanges.lock().unwrap();
    assert_eq!(log.len(), 4);
    // Each endpoint is told about the unit on its far side.
    assert!(log[0].command().to_text().starts_with("prop set /b"));
    assert!(log[1].command().to_text().starts_with("prop set /a"));
}

// ======================================================================
// Transient-port path (locally allocated port numbers)
// ======================================================================

/// A name space whose server does not allocate port numbers, forcing the
/// admin client onto the transient-port path.
struct LocalAllocNameSpace(MemoryNameSpace);

impl NameSpace for LocalAllocNameSpace {
    fn query_name(&self, name: &str) -> Option<Contact> {
        self.0.query_name(name)
    }
    fn register_name(&self, name: &str) -> portnet::Result<Contact> {
        self.0.register_name(name)
    }
    fn register_contact(&self, contact: &Contact) -> portnet::Result<Contact> {
        self.0.register_contact(contact)
    }
    fn unregister_name(&self, name: &str) -> portnet::Result<Contact> {
        self.0.unregister_name(name)
    }
    fn unregister_contact(&self, contact: &Contact) -> portnet::Result<Contact> {
        self.0.unregister_contact(contact)
    }
    fn connect_port_to_port_persistently(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.0.connect_port_to_port_persistently(src, dest, style)
    }
    fn disconnect_port_to_port_persistently(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.0.disconnect_port_to_port_persistently(src, dest, style)
    }
    fn connect_topic_to_port(&self, src: &Contact, dest: &Contact, style: &ContactStyle) -> bool {
        self.0.connect_topic_to_port(src, dest, style)
    }
    fn disconnect_topic_from_port(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.0.disconnect_topic_from_port(src, dest, style)
    }
    fn connect_port_to_topic(&self, src: &Contact, dest: &Contact, style: &ContactStyle) -> bool {
        self.0.connect_port_to_topic(src, dest, style)
    }
    fn disconnect_port_from_topic(
        &self,
        src: &Contact,
        dest: &Contact,
        style: &ContactStyle,
    ) -> bool {
        self.0.disconnect_port_from_topic(src, dest, style)
    }
    fn write_to_name_server(
        &self,
        cmd: &Message,
        reply: &mut Message,
        style: &ContactStyle,
    ) -> bool {
        self.0.write_to_name_server(cmd, reply, style)
    }
    fn local_only(&self) -> bool {
        true
    }
    fn server_allocates_port_numbers(&self) -> bool {
        false
    }
}

#[test]
fn local_allocation_uses_transient_port_route() {
    let store = MemoryNameSpace::new();
    store.insert(Contact::from_parts("/peer", "tcp", "127.0.0.1", 10077));
    let (connector, exchanges) = ScriptedConnector::new(&["0 ok"]);

    let rt = Runtime::builder()
        .name_space(Arc::new(LocalAllocNameSpace(store)))
        .connector(connector)
        .config(AmbientConfig::default())
        .build();
    assert!(rt.local_network_allocation());

    let mut cmd = Message::new();
    cmd.add_vocab("ver");
    let mut reply = Message::new();
    let style = ContactStyle {
        admin: true,
        ..quiet()
    };
    rt.write(&Contact::from_name("/peer"), &cmd, &mut reply, &style)
        .unwrap();

    let log = exchanges.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert!(log[0].lines[0].starts_with("network_write /peer"));
}
