// src/engine/gate.rs
//
// Global conversion gate: bounds the number of conversions decoding,
// resizing, or encoding at the same time. Decoded RGBA buffers for a
// 10000x10000 input run to 400MB, so unbounded parallelism under load is an
// OOM kill waiting to happen.
//
// **Permit Count Calculation**:
// - Uses std::thread::available_parallelism() to respect cgroup/CPU quota
// - Overridable via the RECAST_MAX_CONVERSIONS environment variable
// - Fallback is MIN_PERMITS when detection fails
//
// The gate is initialized lazily on first use; changes to the environment
// after initialization have no effect.

use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, OnceLock};

const MIN_PERMITS: usize = 1;

/// Counting semaphore guarding concurrent heavy conversions.
#[derive(Debug)]
pub struct ConversionGate {
    capacity: usize,
    state: Mutex<usize>, // available permits
    cvar: Condvar,
}

/// RAII permit; releases its slot on drop.
#[derive(Debug)]
pub struct GatePermit {
    gate: Arc<ConversionGate>,
}

impl ConversionGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_PERMITS);
        Self {
            capacity,
            state: Mutex::new(capacity),
            cvar: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until a permit is available.
    pub fn acquire(self: &Arc<Self>) -> GatePermit {
        let mut available = self.state.lock();
        while *available == 0 {
            self.cvar.wait(&mut available);
        }
        *available -= 1;
        GatePermit {
            gate: Arc::clone(self),
        }
    }

    fn release(&self) {
        let mut available = self.state.lock();
        *available = (*available + 1).min(self.capacity);
        self.cvar.notify_one();
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

fn configured_permits() -> usize {
    if let Ok(raw) = std::env::var("RECAST_MAX_CONVERSIONS") {
        if let Ok(parsed) = raw.parse::<usize>() {
            return parsed.max(MIN_PERMITS);
        }
        tracing::warn!(raw = %raw, "ignoring unparseable RECAST_MAX_CONVERSIONS");
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_PERMITS)
}

static GLOBAL_CONVERSION_GATE: OnceLock<Arc<ConversionGate>> = OnceLock::new();

/// Get the process-wide conversion gate.
pub fn conversion_gate() -> Arc<ConversionGate> {
    GLOBAL_CONVERSION_GATE
        .get_or_init(|| Arc::new(ConversionGate::new(configured_permits())))
        .clone()
}
