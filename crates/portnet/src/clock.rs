// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Library clock selection.
//!
//! All of the crate's notion of "now" goes through [`now`], so a
//! deployment can substitute a user-supplied clock (simulation time,
//! replay). The active clock is swapped atomically; teardown restores
//! the system clock.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;

static ACTIVE: ArcSwapOption<Box<dyn Clock>> = ArcSwapOption::const_empty();

/// A time source.
pub trait Clock: Send + Sync {
    /// Time since the Unix epoch according to this source.
    fn now(&self) -> Duration;

    /// Sleep for `duration` of this source's time.
    fn delay(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Wall-clock time source.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Which time source the library should run on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClockSource {
    /// Wall-clock time.
    #[default]
    System,
    /// A networked time source, identified by the name of the port
    /// publishing it. Attaching the source is the embedder's job via
    /// [`install_clock`]; until then the system clock serves.
    Network(String),
}

/// Install a custom clock as the library-wide time source.
pub fn install_clock(clock: Box<dyn Clock>) {
    ACTIVE.store(Some(Arc::new(clock)));
}

/// Restore the system clock.
pub fn use_system_clock() {
    ACTIVE.store(None);
}

/// True iff no custom clock is installed.
pub fn is_system_clock() -> bool {
    ACTIVE.load().is_none()
}

/// Time since the Unix epoch according to the active clock.
pub fn now() -> Duration {
    match ACTIVE.load_full() {
        Some(clock) => clock.now(),
        None => SystemClock.now(),
    }
}

/// Sleep on the active clock.
pub fn delay(duration: Duration) {
    match ACTIVE.load_full() {
        Some(clock) => clock.delay(duration),
        None => SystemClock.delay(duration),
    }
}
