// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Carrier trait and registry.
//!
//! A carrier is a named transport plugin. The arbitration engine never
//! touches a carrier's wire format; it only asks capability questions:
//!
//! - *competence*: can this carrier run the initiator side of the
//!   standard handshake? (non-empty [`bootstrap_carrier_name`])
//! - *push vs pull*: does data flow from initiator to responder?
//! - *connectionless*: is there no session to tear down implicitly?
//! - *escape*: can administrative tags be injected into the stream?
//!
//! A carrier may also take over connection establishment entirely via
//! [`Carrier::connect`], used by carriers that are purely
//! name-service-driven or have custom handshakes.
//!
//! [`bootstrap_carrier_name`]: Carrier::bootstrap_carrier_name

mod builtin;
mod registry;

pub use builtin::{TcpCarrier, TextCarrier, UdpCarrier};
pub use registry::{CarrierFactory, CarrierRegistry};

use crate::contact::{Contact, ContactStyle, Mode};

/// Capability interface of a transport plugin.
///
/// Instances are created per decision by the registry and dropped at the
/// end of the probing scope; implementations should be cheap to construct.
pub trait Carrier: Send + Sync {
    /// The carrier's registered name, without parameters.
    fn name(&self) -> &str;

    /// Name of the carrier that performs the initial handshake on this
    /// carrier's behalf. Empty means this carrier cannot initiate at all.
    fn bootstrap_carrier_name(&self) -> &str {
        "tcp"
    }

    /// True iff data flows from the initiator to the responder.
    fn is_push(&self) -> bool {
        true
    }

    /// True iff the carrier maintains no session.
    fn is_connectionless(&self) -> bool {
        false
    }

    /// True iff administrative escape tags can be injected into the stream.
    fn can_escape(&self) -> bool {
        true
    }

    /// True iff the wire format is human-readable text.
    fn is_text_mode(&self) -> bool {
        false
    }

    /// A carrier is competent iff it can bootstrap the standard handshake.
    fn is_competent(&self) -> bool {
        !self.bootstrap_carrier_name().is_empty()
    }

    /// Custom connection hook, bypassing the default admin-RPC dialogue.
    ///
    /// `None` means "not handled here"; the engine then reports that no
    /// route exists. `Some(result)` is the final outcome of the operation.
    fn connect(
        &self,
        _src: &Contact,
        _dest: &Contact,
        _style: &ContactStyle,
        _mode: Mode,
        _reversed: bool,
    ) -> Option<crate::network::Result<()>> {
        None
    }
}
