// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Library lifecycle and the global runtime.
//!
//! A [`Runtime`] owns the whole stack: carrier registry, name-space
//! handle, byte connector, and the ambient configuration. Embedders (and
//! the test suite) build their own with [`Runtime::builder`]; everything
//! else goes through the process-wide instance behind a reference
//! counter:
//!
//! - [`init`] / [`fini`] pair explicitly; the 1 -> 0 transition tears all
//!   singletons down and restores the system clock.
//! - [`auto_init`] steps the library up when first needed (at most once
//!   per process); its reference is reclaimed at process exit.
//! - [`Network`] is the RAII form: init on construction, fini on drop.
//!
//! One process-wide mutex guards bring-up and tear-down. Broken pipes
//! need no special handling here: the Rust runtime already ignores
//! SIGPIPE, so they surface as ordinary I/O errors.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::admin::{Connector, TcpConnector};
use crate::carrier::CarrierRegistry;
use crate::clock::{self, ClockSource};
use crate::config::AmbientConfig;
use crate::name::{MemoryNameSpace, NameSpace, NameSpaceHandle, NameStore};

/// One complete instance of the arbitration stack.
pub struct Runtime {
    carriers: CarrierRegistry,
    namespace: NameSpaceHandle,
    connector: Arc<dyn Connector>,
    config: AmbientConfig,
}

impl Runtime {
    /// Start building an explicit runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The carrier registry.
    pub fn carriers(&self) -> &CarrierRegistry {
        &self.carriers
    }

    /// The name-space facade.
    pub fn namespace(&self) -> &NameSpaceHandle {
        &self.namespace
    }

    /// The byte-channel connector.
    pub fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    /// The ambient configuration this runtime was built with.
    pub fn config(&self) -> &AmbientConfig {
        &self.config
    }

    /// The process-wide runtime, stepping the library up if needed.
    pub fn global() -> Arc<Runtime> {
        let mut state = STATE.lock();
        if state.refcount == 0 && !state.auto_active {
            state.auto_active = true;
            init_locked(&mut state);
        }
        match state.runtime.clone() {
            Some(runtime) => runtime,
            None => {
                // Explicitly torn down past the auto reference; recreate
                // lazily without touching the counter.
                let runtime = Arc::new(Runtime::builder().build());
                state.runtime = Some(runtime.clone());
                runtime
            }
        }
    }
}

/// Builder for an explicit [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    carriers: Option<CarrierRegistry>,
    namespace: Option<Arc<dyn NameSpace>>,
    bypass: Option<Arc<dyn NameStore>>,
    connector: Option<Arc<dyn Connector>>,
    config: Option<AmbientConfig>,
}

impl RuntimeBuilder {
    /// Use a custom carrier registry instead of the default prototypes.
    pub fn carriers(mut self, registry: CarrierRegistry) -> Self {
        self.carriers = Some(registry);
        self
    }

    /// Install a name service (default: an in-process
    /// [`MemoryNameSpace`]).
    pub fn name_space(mut self, namespace: Arc<dyn NameSpace>) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Install a query-bypass store.
    pub fn query_bypass(mut self, store: Arc<dyn NameStore>) -> Self {
        self.bypass = Some(store);
        self
    }

    /// Use a custom byte-channel connector (default: [`TcpConnector`]).
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Use a fixed configuration instead of reading the environment.
    pub fn config(mut self, config: AmbientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Assemble the runtime.
    pub fn build(self) -> Runtime {
        let config = self.config.unwrap_or_else(AmbientConfig::from_env);
        let namespace = NameSpaceHandle::new();
        namespace.install(
            self.namespace
                .unwrap_or_else(|| Arc::new(MemoryNameSpace::new())),
        );
        if let Some(store) = self.bypass {
            namespace.set_query_bypass(Some(store));
        }
        Runtime {
            carriers: self.carriers.unwrap_or_default(),
            namespace,
            connector: self.connector.unwrap_or_else(|| Arc::new(TcpConnector)),
            config,
        }
    }
}

// =======================================================================
// Global lifecycle
// =======================================================================

struct LifecycleState {
    refcount: u32,
    auto_active: bool,
    runtime: Option<Arc<Runtime>>,
}

static STATE: Mutex<LifecycleState> = Mutex::new(LifecycleState {
    refcount: 0,
    auto_active: false,
    runtime: None,
});

fn init_locked(state: &mut LifecycleState) {
    if state.refcount == 0 {
        let config = AmbientConfig::from_env();

        #[cfg(feature = "logging")]
        {
            use crate::logging::{init_logger, ConsoleOutput, LogLevel};
            let level = LogLevel::from_verbosity(config.verbosity);
            init_logger(Arc::new(ConsoleOutput::new(level)), level);
        }

        if let Some(size) = config.stack_size {
            crate::info!("default stack size set to {}", size);
        }
        match &config.clock {
            ClockSource::System => clock::use_system_clock(),
            ClockSource::Network(source) => {
                // The time source attaches later, through
                // `clock::install_clock`; system time serves meanwhile.
                crate::info!("network clock requested from {}", source);
            }
        }

        state.runtime = Some(Arc::new(Runtime::builder().config(config).build()));
    }
    state.refcount += 1;
}

/// Step the library up. Every `init` must be paired with a [`fini`].
pub fn init() {
    let mut state = STATE.lock();
    init_locked(&mut state);
}

/// Step the library down. On the last reference all singletons are torn
/// down and the system clock is restored. Unpaired calls are ignored.
pub fn fini() {
    let mut state = STATE.lock();
    if state.refcount == 1 {
        state.runtime = None;
        clock::use_system_clock();
    }
    if state.refcount > 0 {
        state.refcount -= 1;
    }
}

/// Step the library up when first needed. Fires at most once per
/// process; callers that want paired teardown use [`init`]/[`fini`].
pub fn auto_init() {
    let mut state = STATE.lock();
    if state.refcount == 0 && !state.auto_active {
        state.auto_active = true;
        init_locked(&mut state);
    }
}

/// True iff the library is currently initialized.
pub fn initialized() -> bool {
    STATE.lock().refcount > 0
}

/// RAII guard for the global library: [`init`] on construction,
/// [`fini`] on drop.
///
/// ```rust,no_run
/// let _net = portnet::Network::new();
/// // the library is up until the guard drops
/// ```
pub struct Network {
    _private: (),
}

impl Network {
    /// Initialize the library.
    pub fn new() -> Self {
        init();
        Self { _private: () }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        fini();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let runtime = Runtime::builder().build();
        assert!(!runtime.carriers().is_empty());
        assert!(runtime.namespace().namespace().is_some());
        assert!(!runtime.local_network_allocation());
    }

    // All lifecycle assertions live in one test: the counter is process
    // global and concurrent tests would race on it.
    #[test]
    fn test_lifecycle_counter() {
        let was_initialized = initialized();

        // Property: N inits followed by N finis restore the pre-state,
        // whatever the interleaving.
        init();
        init();
        assert!(initialized());
        fini();
        assert!(initialized());
        init();
        fini();
        fini();
        assert_eq!(initialized(), was_initialized);

        // RAII guard behaves like an init/fini pair.
        {
            let _guard = Network::new();
            assert!(initialized());
        }
        assert_eq!(initialized(), was_initialized);

        // Unpaired fini is ignored.
        fini();
        assert_eq!(initialized(), was_initialized);
    }
}
