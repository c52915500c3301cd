use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-flight gate over command execution: the robot executes one command
/// at a time, and anything arriving while it is busy is dropped rather than
/// queued. Mirrors how a voice robot ignores speech mid-maneuver.
#[derive(Clone, Default)]
pub struct CommandGate {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of one command; releases the gate on drop.
pub struct CommandGuard {
    busy: Arc<AtomicBool>,
}

impl CommandGate {
    /// Creates an idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the gate. Returns `None` when a command is already in flight.
    #[must_use]
    pub fn try_begin(&self) -> Option<CommandGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CommandGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Whether a command is currently executing.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for CommandGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
