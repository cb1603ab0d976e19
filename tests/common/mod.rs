//! Shared helpers for integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use eventide::clock::{SettleContext, WorldTime};
use eventide::error::BoxError;
use eventide::event::{EventBuilder, EventRecord, Gate, TransitionHooks};

/// Builder for a test record owned by the rig and armed at the epoch.
pub fn make_event(id: &str) -> EventBuilder {
    EventRecord::builder(id)
        .owner("test:rig")
        .armed_at(WorldTime::ZERO)
}

/// Routes engine logs through the test harness when `RUST_LOG` is set.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Gate switches shared between a [`ProbeHooks`] and its handle.
#[derive(Default)]
pub struct Holds {
    pub initiate: AtomicBool,
    pub activate: AtomicBool,
    pub expire: AtomicBool,
}

/// Test-side view of a probe: the invocation log and the gate switches.
pub struct ProbeHandle {
    log: Arc<Mutex<Vec<String>>>,
    pub holds: Arc<Holds>,
}

impl ProbeHandle {
    /// Returns the invocations recorded so far, oldest first, as
    /// `"<hook>@<seconds>"` entries.
    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn hold_initiation(&self, hold: bool) {
        self.holds.initiate.store(hold, Ordering::SeqCst);
    }

    pub fn hold_activation(&self, hold: bool) {
        self.holds.activate.store(hold, Ordering::SeqCst);
    }

    pub fn hold_expiration(&self, hold: bool) {
        self.holds.expire.store(hold, Ordering::SeqCst);
    }
}

/// Hook set that records every invocation in order and answers each
/// pre-hook from a switchable gate.
pub struct ProbeHooks {
    log: Arc<Mutex<Vec<String>>>,
    holds: Arc<Holds>,
}

impl ProbeHooks {
    pub fn new() -> (Self, ProbeHandle) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let holds = Arc::new(Holds::default());
        (
            Self {
                log: Arc::clone(&log),
                holds: Arc::clone(&holds),
            },
            ProbeHandle { log, holds },
        )
    }

    fn note(&self, point: &str, ctx: &SettleContext<'_>) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{point}@{}", ctx.now().as_secs()));
    }

    fn gate(&self, held: &AtomicBool) -> Gate {
        if held.load(Ordering::SeqCst) {
            Gate::Hold
        } else {
            Gate::Proceed
        }
    }
}

#[async_trait]
impl TransitionHooks for ProbeHooks {
    fn name(&self) -> &'static str {
        "probe"
    }

    async fn pre_initiate(
        &self,
        _record: &EventRecord,
        ctx: &SettleContext<'_>,
    ) -> Result<Gate, BoxError> {
        self.note("pre_initiate", ctx);
        Ok(self.gate(&self.holds.initiate))
    }

    async fn on_initiate(
        &self,
        _record: &EventRecord,
        ctx: &SettleContext<'_>,
    ) -> Result<(), BoxError> {
        self.note("on_initiate", ctx);
        Ok(())
    }

    async fn pre_activate(
        &self,
        _record: &EventRecord,
        ctx: &SettleContext<'_>,
    ) -> Result<Gate, BoxError> {
        self.note("pre_activate", ctx);
        Ok(self.gate(&self.holds.activate))
    }

    async fn on_activate(
        &self,
        _record: &EventRecord,
        ctx: &SettleContext<'_>,
    ) -> Result<(), BoxError> {
        self.note("on_activate", ctx);
        Ok(())
    }

    async fn pre_expire(
        &self,
        _record: &EventRecord,
        ctx: &SettleContext<'_>,
    ) -> Result<Gate, BoxError> {
        self.note("pre_expire", ctx);
        Ok(self.gate(&self.holds.expire))
    }

    async fn on_expire(
        &self,
        _record: &EventRecord,
        ctx: &SettleContext<'_>,
    ) -> Result<(), BoxError> {
        self.note("on_expire", ctx);
        Ok(())
    }
}
