//! Test utilities and mock types for Motive development.
//!
//! Provides a mock [`HandleBinding`] that logs every notification, the
//! [`RecordingStorage`] fixture that mirrors the slot layout in a tag array
//! while recording every hook call, and a tracing setup for tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;

use motive_core::{HandleBinding, HandleId, SlotIndex};
use tracing_subscriber::EnvFilter;

pub use fixtures::{HookCall, RecordingStorage};

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; defaults to `debug` for the motive crates. Safe to
/// call from every test: only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("motive_slots=debug,motive_processor=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// One notification received by [`MockBinding`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingEvent {
    Relocated(HandleId, SlotIndex),
    Invalidated(HandleId),
}

/// Mock implementation of [`HandleBinding`].
///
/// Backed by a `HashMap<HandleId, SlotIndex>`. Seed it with
/// [`bind`](MockBinding::bind), pass it to code under test, then inspect
/// [`events`](MockBinding::events).
#[derive(Debug, Default)]
pub struct MockBinding {
    bound: HashMap<HandleId, SlotIndex>,
    events: Vec<BindingEvent>,
}

impl MockBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-bind `handle` to `index`.
    pub fn bind(&mut self, handle: HandleId, index: SlotIndex) {
        self.bound.insert(handle, index);
    }

    /// Notifications in the order they arrived.
    pub fn events(&self) -> &[BindingEvent] {
        &self.events
    }
}

impl HandleBinding for MockBinding {
    fn notify_relocated(&mut self, handle: HandleId, new_index: SlotIndex) {
        self.bound.insert(handle, new_index);
        self.events.push(BindingEvent::Relocated(handle, new_index));
    }

    fn notify_invalidated(&mut self, handle: HandleId) {
        self.bound.remove(&handle);
        self.events.push(BindingEvent::Invalidated(handle));
    }

    fn bound_index(&self, handle: HandleId) -> Option<SlotIndex> {
        self.bound.get(&handle).copied()
    }
}
