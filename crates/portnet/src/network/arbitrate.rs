// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The decision procedure.
//!
//! Connecting two ports is a case analysis over endpoint validity,
//! carrier capability, push vs pull, connectionless vs session-oriented,
//! topic vs normal, and connect vs disconnect vs probe:
//!
//! 1. normally the source port is asked to reach out to the destination;
//! 2. a source that cannot initiate hands the initiative to the
//!    destination when the carrier can reverse (`reversed = true`);
//! 3. topics are entirely virtual - the name server installs those links
//!    and no peer dialogue happens at all;
//! 4. persistent links go to the name server's subscription store.
//!
//! [`enact_connection`] then drives the administrative dialogue with
//! whichever peer won the initiative.

use super::{Error, Result};
use crate::admin::{Ack, Message, Value};
use crate::config;
use crate::contact::{
    carrier_base, carrier_params, is_valid_port_name, Contact, ContactStyle, Mode, TOPIC_CARRIER,
};
use crate::runtime::Runtime;

/// Arbitrate and enact one operation between two endpoint strings.
pub(crate) fn meta_connect(
    rt: &Runtime,
    src: &str,
    dest: &str,
    style: &ContactStyle,
    mode: Mode,
) -> Result<()> {
    crate::debug!("working on connection {} to {} ({})", src, dest, mode.as_str());

    // Expressed contacts, without name-server input.
    let dynamic_src = Contact::from_text(src);
    let dynamic_dest = Contact::from_text(dest);

    if !is_valid_port_name(dynamic_src.name()) {
        if !style.quiet {
            crate::warn!(
                "Failure: no way to make connection, invalid source '{}'",
                dynamic_src.name()
            );
        }
        return Err(Error::InvalidName(dynamic_src.name().to_string()));
    }
    if !is_valid_port_name(dynamic_dest.name()) {
        if !style.quiet {
            crate::warn!(
                "Failure: no way to make connection, invalid destination '{}'",
                dynamic_dest.name()
            );
        }
        return Err(Error::InvalidName(dynamic_dest.name().to_string()));
    }

    let mut style = style.clone();

    let topical = style.persistent
        || dynamic_src.carrier() == TOPIC_CARRIER
        || dynamic_dest.carrier() == TOPIC_CARRIER;
    let topical_needs_lookup = !rt.namespace().connection_has_name_of_endpoints();

    // Completed contacts from the name server, where needed.
    let mut static_src = resolve_side(
        rt,
        &dynamic_src,
        "source",
        &style,
        topical,
        topical_needs_lookup,
    )?;
    let mut static_dest = resolve_side(
        rt,
        &dynamic_dest,
        "destination",
        &style,
        topical,
        topical_needs_lookup,
    )?;

    if static_src.carrier().is_empty() {
        static_src.set_carrier(config::GROUND_CARRIER);
    }
    if static_dest.carrier().is_empty() {
        static_dest.set_carrier(config::GROUND_CARRIER);
    }

    // Two RPC-only endpoints cannot link directly; assume the source is a
    // native port and fall back to the ground transport.
    if static_src.carrier() == "xmlrpc"
        && (static_dest.carrier() == "xmlrpc" || static_dest.carrier().starts_with("rossrv"))
        && mode == Mode::Connect
    {
        static_src.set_carrier(config::GROUND_CARRIER);
        static_dest.set_carrier(config::GROUND_CARRIER);
    }

    let src_is_topic = static_src.carrier() == TOPIC_CARRIER;
    let dest_is_topic = static_dest.carrier() == TOPIC_CARRIER;

    // Persistent links that involve no topic go straight to the name
    // server's subscription store; no peer dialogue, no carrier probing.
    if style.persistent && !src_is_topic && !dest_is_topic {
        return persistent_operation(rt, &static_src, &dynamic_dest, &style, mode);
    }

    // Capability probe: a side whose carrier cannot bootstrap the
    // handshake constrains the connection to that carrier.
    let mut carrier_constraint = String::new();
    let mut src_competent = false;
    let mut dest_competent = false;
    if !src_is_topic && !topical && !static_src.carrier().is_empty() {
        if let Some(carrier) = rt.carriers().choose(static_src.carrier()) {
            if carrier.is_competent() {
                src_competent = true;
            } else {
                carrier_constraint = static_src.carrier().to_string();
            }
        }
    }
    if !dest_is_topic && !topical && !static_dest.carrier().is_empty() {
        if let Some(carrier) = rt.carriers().choose(static_dest.carrier()) {
            if carrier.is_competent() {
                dest_competent = true;
            } else {
                carrier_constraint = static_dest.carrier().to_string();
            }
        }
    }

    // Topics are installed by the name server, not by peer dialogue.
    if src_is_topic || dest_is_topic {
        return topic_operation(rt, &static_src, &static_dest, src_is_topic, &style, mode);
    }

    // Carrier selection. A dynamic carrier with a bare name is a user
    // choice; a bare `+params` suffix only contributes parameters.
    if !carrier_base(dynamic_src.carrier()).is_empty() {
        style.carrier = dynamic_src.carrier().to_string();
    } else if !carrier_base(dynamic_dest.carrier()).is_empty() {
        style.carrier = dynamic_dest.carrier().to_string();
    }

    if !style.carrier.is_empty() && !carrier_constraint.is_empty() {
        let requested = carrier_base(&style.carrier);
        let constrained = carrier_base(&carrier_constraint);
        if requested != constrained {
            if !style.quiet {
                crate::warn!("Failure: conflict between {} and {}", requested, constrained);
            }
            return Err(Error::CarrierConflict(
                requested.to_string(),
                constrained.to_string(),
            ));
        }
    }

    if !carrier_constraint.is_empty() && carrier_base(&style.carrier).is_empty() {
        // One side is not competent; its registered carrier wins, plus
        // whatever parameters the user attached for that carrier.
        let mut chosen = carrier_constraint.clone();
        append_params(&mut chosen, dynamic_src.carrier());
        append_params(&mut chosen, dynamic_dest.carrier());
        style.carrier = chosen;
    }
    if carrier_base(&style.carrier).is_empty() {
        // Both sides competent, no user choice: the destination's
        // registered carrier, plus matching parameters from the source.
        let mut chosen = static_dest.carrier().to_string();
        append_params(&mut chosen, static_src.carrier());
        style.carrier = chosen;
    }
    if style.carrier.is_empty() {
        style.carrier = static_src.carrier().to_string();
    }

    // Direction decision on the chosen carrier's push/pull flag. The
    // probe instance drops at the end of this scope.
    let chosen_carrier = if style.carrier != TOPIC_CARRIER && !style.carrier.is_empty() {
        rt.carriers().choose(&style.carrier)
    } else {
        None
    };
    let connection_is_push = chosen_carrier.as_ref().map_or(false, |c| c.is_push());
    let connection_is_pull = chosen_carrier.as_ref().map_or(false, |c| !c.is_push());

    if (src_competent && connection_is_push) || topical {
        // Classic case: the source initiates toward the destination.
        return enact_connection(rt, &static_src, &dynamic_dest, &style, mode, false);
    }
    if dest_competent && connection_is_pull {
        return enact_connection(rt, &static_dest, &dynamic_src, &style, mode, true);
    }

    if let Some(carrier) = chosen_carrier {
        // Neither peer can run the standard dialogue; the carrier itself
        // may still know how to realize the link.
        let outcome = if connection_is_pull {
            carrier.connect(&static_dest, &dynamic_src, &style, mode, true)
        } else {
            carrier.connect(&static_src, &dynamic_dest, &style, mode, false)
        };
        if let Some(result) = outcome {
            if !style.quiet {
                match &result {
                    Ok(()) if style.verbose_on_success => {
                        crate::info!(
                            "Success: connection handled by the {} carrier",
                            carrier_base(&style.carrier)
                        );
                    }
                    Err(_) => {
                        crate::warn!("Failure: custom carrier method did not work");
                    }
                    Ok(()) => {}
                }
            }
            return result;
        }
    }

    if mode != Mode::Disconnect && !style.quiet {
        crate::warn!("Failure: no way to make connection {}->{}", src, dest);
    }
    Err(Error::NoRoute {
        src: src.to_string(),
        dest: dest.to_string(),
    })
}

/// Resolve one side through the name space when its dynamic form needs
/// lookup. On a persistent operation a resolution miss falls back to the
/// dynamic form; otherwise it is an error.
fn resolve_side(
    rt: &Runtime,
    dynamic: &Contact,
    role: &'static str,
    style: &ContactStyle,
    topical: bool,
    topical_needs_lookup: bool,
) -> Result<Contact> {
    if !(needs_lookup(dynamic) && (topical_needs_lookup || !topical)) {
        return Ok(dynamic.clone());
    }
    match rt.query_name(dynamic.name()) {
        Some(found) if found.is_valid() => Ok(found),
        _ if style.persistent => Ok(dynamic.clone()),
        _ => {
            if !style.quiet {
                crate::warn!("Failure: could not find {} port {}", role, dynamic.name());
            }
            Err(Error::Unresolved {
                role,
                name: dynamic.name().to_string(),
            })
        }
    }
}

fn needs_lookup(contact: &Contact) -> bool {
    contact.host().is_empty() && contact.carrier() != TOPIC_CARRIER
}

/// Append `candidate`'s `+params` to `chosen` when they are addressed to
/// it: either the bare names match, or the candidate is parameters-only.
fn append_params(chosen: &mut String, candidate: &str) {
    let params = carrier_params(candidate);
    if params.is_empty() {
        return;
    }
    let base = carrier_base(candidate);
    if base.is_empty() || base == carrier_base(chosen) {
        chosen.push_str(params);
    }
}

/// Route a persistent operation to the name server's subscription store.
fn persistent_operation(
    rt: &Runtime,
    src: &Contact,
    dest: &Contact,
    style: &ContactStyle,
    mode: Mode,
) -> Result<()> {
    let ok = match mode {
        Mode::Connect => rt
            .namespace()
            .connect_port_to_port_persistently(src, dest, style),
        Mode::Disconnect => rt
            .namespace()
            .disconnect_port_to_port_persistently(src, dest, style),
        Mode::Exists => {
            if !style.quiet {
                crate::warn!("Failure: cannot check subscriptions yet");
            }
            return Err(Error::Unsupported("cannot check a persistent subscription"));
        }
    };
    if !ok {
        return Err(Error::ProtocolDenied(
            "name server refused persistent operation".to_string(),
        ));
    }
    if !style.quiet && style.verbose_on_success {
        crate::info!(
            "Success: port-to-port persistent connection {}.",
            if mode == Mode::Connect { "added" } else { "removed" }
        );
    }
    Ok(())
}

/// Route a topic operation to the name server.
fn topic_operation(
    rt: &Runtime,
    static_src: &Contact,
    static_dest: &Contact,
    src_is_topic: bool,
    style: &ContactStyle,
    mode: Mode,
) -> Result<()> {
    let ns = rt.namespace();
    let ok = match (src_is_topic, mode) {
        (true, Mode::Connect) => ns.connect_topic_to_port(static_src, static_dest, style),
        (true, Mode::Disconnect) => ns.disconnect_topic_from_port(static_src, static_dest, style),
        (false, Mode::Connect) => ns.connect_port_to_topic(static_src, static_dest, style),
        (false, Mode::Disconnect) => ns.disconnect_port_from_topic(static_src, static_dest, style),
        (_, Mode::Exists) => {
            if !style.quiet {
                crate::warn!("Failure: cannot check subscriptions yet");
            }
            return Err(Error::Unsupported("cannot check a topic subscription"));
        }
    };
    if !ok {
        return Err(Error::ProtocolDenied(
            "name server refused topic operation".to_string(),
        ));
    }
    if !style.quiet && style.verbose_on_success {
        crate::info!(
            "Success: connection to topic {}.",
            if mode == Mode::Connect { "added" } else { "removed" }
        );
    }
    Ok(())
}

/// Drive the administrative dialogue with the initiating peer.
///
/// `src` is the initiator; `dest` is the argument of the dialogue. With
/// `reversed` the responder side initiated, so the probe asks about the
/// peer's inputs rather than its outputs.
pub(crate) fn enact_connection(
    rt: &Runtime,
    src: &Contact,
    dest: &Contact,
    style: &ContactStyle,
    mode: Mode,
    reversed: bool,
) -> Result<()> {
    if style.persistent {
        return persistent_operation(rt, src, dest, style, mode);
    }

    let rpc = ContactStyle::admin_rpc(style);

    let mut cmd = Message::new();
    cmd.add_vocab("list")
        .add_vocab(if reversed { "in" } else { "out" })
        .add_str(dest.name());
    crate::debug!("asking {}: {}", src, cmd.to_text());

    let mut reply = Message::new();
    if rt.write(src, &cmd, &mut reply, &rpc).is_err() {
        rt.note_dud(src);
        return Err(Error::Unreachable(src.name().to_string()));
    }

    if let Some(existing) = reply.find("carrier").map(Value::as_text) {
        if !style.quiet {
            crate::info!(
                "Connection found between {} and {} using carrier {}",
                src.name(),
                dest.name(),
                existing
            );
        }
        if mode == Mode::Exists {
            return if carrier_base(&existing) == carrier_base(&style.carrier) {
                Ok(())
            } else {
                Err(Error::ProtocolDenied(format!(
                    "connection uses carrier {}, not {}",
                    existing, style.carrier
                )))
            };
        }

        // The current link is being replaced or removed. A connectionless
        // sender never notices the session closing on the far side and
        // would keep transmitting; tell it to stop explicitly first.
        let current_is_push = reply.find("push").map_or(true, Value::as_bool);
        let current_is_connectionless = reply.find("connectionless").map_or(false, Value::as_bool);
        if current_is_connectionless
            && ((reversed && current_is_push) || (!reversed && !current_is_push))
        {
            compensating_disconnect(rt, dest, src, &rpc);
        }
    } else if mode == Mode::Exists {
        return Err(Error::ProtocolDenied(format!(
            "no connection between {} and {}",
            src.name(),
            dest.name()
        )));
    }

    // Ask the initiator to add or remove the link. The carrier chosen by
    // arbitration rides on the destination contact.
    let mut cmd = Message::new();
    let mut target = dest.clone();
    if !style.carrier.is_empty() {
        target.set_carrier(&style.carrier);
    }
    if mode == Mode::Disconnect {
        cmd.add_vocab("del").add_str(target.name());
    } else {
        cmd.add_vocab("add").add_str(&target.to_text());
    }

    let mut initiator = src.clone();
    if !initiator.is_valid() {
        if let Some(found) = rt.query_name(initiator.name()) {
            initiator = found;
        }
    }
    crate::debug!("asking {}: {}", initiator, cmd.to_text());

    let mut reply = Message::new();
    if rt.write(&initiator, &cmd, &mut reply, &rpc).is_err() {
        rt.note_dud(src);
        return Err(Error::Unreachable(src.name().to_string()));
    }

    let ack = Ack::from_reply(&reply);
    let ok = ack.is_success();
    let message = if mode == Mode::Disconnect && !ok {
        "no such connection".to_string()
    } else {
        ack.message().to_string()
    };
    if mode == Mode::Connect && !ok {
        rt.note_dud(dest);
    }
    if !style.quiet && (style.verbose_on_success || !ok) {
        if ok {
            crate::info!("Success: {}", message);
        } else {
            crate::warn!("Failure: {}", message);
        }
    }
    if ok {
        Ok(())
    } else {
        Err(Error::ProtocolDenied(message))
    }
}

/// Explicit pre-step for stateless senders: one `del` in the reversed
/// direction, best effort, with no probe and no further compensation.
fn compensating_disconnect(rt: &Runtime, initiator: &Contact, victim: &Contact, rpc: &ContactStyle) {
    let mut cmd = Message::new();
    cmd.add_vocab("del").add_str(victim.name());

    let mut target = initiator.clone();
    if !target.is_valid() {
        if let Some(found) = rt.query_name(target.name()) {
            target = found;
        }
    }
    let mut reply = Message::new();
    let _ = rt.write(&target, &cmd, &mut reply, rpc);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_lookup() {
        assert!(needs_lookup(&Contact::from_name("/a")));
        assert!(!needs_lookup(&Contact::from_parts("/a", "tcp", "10.0.0.1", 80)));
        assert!(!needs_lookup(&Contact::from_text("/bus topic")));
    }

    #[test]
    fn test_append_params_on_matching_base() {
        let mut chosen = "udp".to_string();
        append_params(&mut chosen, "udp+mtu.1400");
        assert_eq!(chosen, "udp+mtu.1400");
    }

    #[test]
    fn test_append_params_ignores_other_carriers() {
        let mut chosen = "udp".to_string();
        append_params(&mut chosen, "tcp+tos.3");
        append_params(&mut chosen, "mjpeg");
        assert_eq!(chosen, "udp");
    }

    #[test]
    fn test_append_params_accepts_bare_suffix() {
        let mut chosen = "mjpeg".to_string();
        append_params(&mut chosen, "+in.stream");
        append_params(&mut chosen, "+q.80");
        assert_eq!(chosen, "mjpeg+in.stream+q.80");
    }
}
