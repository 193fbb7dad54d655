// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in carrier prototypes.
//!
//! These describe the ground transports every deployment has. They carry
//! capability flags only; the actual wire formats live with the peers.

use super::Carrier;

/// The ground transport: connection-oriented, push, competent.
pub struct TcpCarrier;

impl Carrier for TcpCarrier {
    fn name(&self) -> &str {
        "tcp"
    }
}

/// Datagram transport: connectionless push, bootstrapped over tcp.
pub struct UdpCarrier;

impl Carrier for UdpCarrier {
    fn name(&self) -> &str {
        "udp"
    }

    fn is_connectionless(&self) -> bool {
        true
    }
}

/// Human-readable transport used for administrative dialogues.
pub struct TextCarrier;

impl Carrier for TextCarrier {
    fn name(&self) -> &str {
        "text"
    }

    fn is_text_mode(&self) -> bool {
        true
    }
}
