//! Simulation clock, lifecycle state machine, and state hashing.
//!
//! The driver owns a [`SimState`]: the tick counter is the single source of
//! truth for time, and every derived quantity (node age, decay) is a function
//! of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Driver lifecycle: `Idle → Running → (Paused ⇄ Running) → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimStatus {
    /// Constructed, no run started yet. Single steps are allowed.
    Idle,
    /// Executing ticks.
    Running,
    /// Suspended. Single steps are allowed, `run` executes nothing.
    Paused,
    /// Terminal. No further ticks are accepted.
    Stopped,
}

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Start,
    Pause,
    Resume,
    Stop,
}

impl SimStatus {
    /// The status after applying `action`, or `None` if the transition is
    /// not allowed from this status.
    pub fn apply(self, action: Lifecycle) -> Option<SimStatus> {
        use Lifecycle::*;
        use SimStatus::*;
        match (self, action) {
            (Idle, Start) => Some(Running),
            (Running, Pause) => Some(Paused),
            (Paused, Resume) => Some(Running),
            (Idle | Running | Paused, Stop) => Some(Stopped),
            _ => None,
        }
    }

    /// Whether this status accepts further ticks.
    pub fn accepts_ticks(self) -> bool {
        self != SimStatus::Stopped
    }
}

impl fmt::Display for SimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimStatus::Idle => "idle",
            SimStatus::Running => "running",
            SimStatus::Paused => "paused",
            SimStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Start => "start",
            Lifecycle::Pause => "pause",
            Lifecycle::Resume => "resume",
            Lifecycle::Stop => "stop",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable simulation state tracked by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    /// Current tick counter. Incremented by 1 at the start of each tick.
    pub tick: Ticks,

    /// Current lifecycle status.
    pub status: SimStatus,
}

impl SimState {
    /// Create a new simulation state at tick 0 in [`SimStatus::Idle`].
    pub fn new() -> Self {
        Self {
            tick: 0,
            status: SimStatus::Idle,
        }
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for divergence detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed a u64 into the hash.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a u32 into the hash.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed an f64 into the hash by its exact bit pattern.
    pub fn write_f64(&mut self, v: f64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
