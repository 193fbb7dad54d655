// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry of carrier prototypes.
//!
//! The registry maps bare carrier names to factories. [`choose`] strips
//! any `+params` suffix before lookup and hands back a fresh instance
//! owned by the caller, so capability probes are naturally scoped: the
//! instance drops at the end of the probing block.
//!
//! [`choose`]: CarrierRegistry::choose

use std::sync::Arc;

use dashmap::DashMap;

use super::builtin::{TcpCarrier, TextCarrier, UdpCarrier};
use super::Carrier;
use crate::contact::carrier_base;

/// Factory producing carrier instances for one registered name.
pub type CarrierFactory = dyn Fn() -> Box<dyn Carrier> + Send + Sync;

/// Thread-safe map of carrier name to prototype factory.
///
/// The registry is additive; registering a name twice overwrites the
/// earlier prototype.
pub struct CarrierRegistry {
    prototypes: DashMap<String, Arc<CarrierFactory>>,
}

impl CarrierRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            prototypes: DashMap::new(),
        }
    }

    /// A registry preloaded with the built-in prototypes (`tcp`, `udp`,
    /// `text`).
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register("tcp", Arc::new(|| Box::new(TcpCarrier)));
        registry.register("udp", Arc::new(|| Box::new(UdpCarrier)));
        registry.register("text", Arc::new(|| Box::new(TextCarrier)));
        registry
    }

    /// Install a prototype under `name`.
    ///
    /// The factory is validated by constructing one instance and checking
    /// that it reports a non-empty name. Returns `false` (and logs) when
    /// the factory is unusable.
    pub fn register(&self, name: &str, factory: Arc<CarrierFactory>) -> bool {
        if name.is_empty() {
            crate::error!("cannot register carrier with empty name");
            return false;
        }
        let probe = (*factory)();
        if probe.name().is_empty() {
            crate::error!("invalid factory for carrier {}", name);
            return false;
        }
        self.prototypes.insert(name.to_string(), factory);
        true
    }

    /// Look up a prototype by name and produce a fresh instance.
    ///
    /// Any `+params` suffix on the input is stripped before lookup. The
    /// returned instance is owned by the caller.
    pub fn choose(&self, name: &str) -> Option<Box<dyn Carrier>> {
        let base = carrier_base(name);
        let factory = self.prototypes.get(base)?;
        Some((**factory)())
    }

    /// Number of registered prototypes.
    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    /// True iff no prototype is registered.
    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}

impl Default for CarrierRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::Carrier;

    struct FakeCarrier {
        name: &'static str,
    }

    impl Carrier for FakeCarrier {
        fn name(&self) -> &str {
            self.name
        }

        fn bootstrap_carrier_name(&self) -> &str {
            ""
        }
    }

    #[test]
    fn test_defaults_present() {
        let registry = CarrierRegistry::with_defaults();
        assert!(registry.choose("tcp").is_some());
        assert!(registry.choose("udp").is_some());
        assert!(registry.choose("text").is_some());
        assert!(registry.choose("nonexistent").is_none());
    }

    #[test]
    fn test_choose_strips_params() {
        let registry = CarrierRegistry::with_defaults();
        let carrier = registry.choose("tcp+tos.3").map(|c| c.name().to_string());
        assert_eq!(carrier.as_deref(), Some("tcp"));
    }

    #[test]
    fn test_register_and_overwrite() {
        let registry = CarrierRegistry::new();
        assert!(registry.register("mjpeg", Arc::new(|| Box::new(FakeCarrier { name: "mjpeg" }))));
        assert_eq!(registry.len(), 1);

        // Duplicate names overwrite.
        assert!(registry.register("mjpeg", Arc::new(|| Box::new(FakeCarrier { name: "mjpeg" }))));
        assert_eq!(registry.len(), 1);

        let carrier = registry.choose("mjpeg").map(|c| c.is_competent());
        assert_eq!(carrier, Some(false));
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let registry = CarrierRegistry::new();
        assert!(!registry.register("", Arc::new(|| Box::new(FakeCarrier { name: "x" }))));
        assert!(registry.is_empty());
    }
}
