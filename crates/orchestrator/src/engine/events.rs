//! Run-scoped event emitter.
//!
//! Sequence numbers are assigned by the [`EventBus`] itself, so clones of
//! one emitter used from concurrent fix tasks still produce a total order.

use events::{Event, EventBus, RunKind};
use tribunal_core::{Phase, RunStatus};
use uuid::Uuid;

/// Event emitter bound to a single run.
#[derive(Clone)]
pub struct RunEmitter {
    bus: EventBus,
    run_id: Uuid,
}

impl RunEmitter {
    pub fn new(bus: EventBus, run_id: Uuid) -> Self {
        Self { bus, run_id }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Get a reference to the underlying event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn emit(&self, event: Event) {
        self.bus.publish(event);
    }

    pub fn run_start(&self, kind: RunKind, subject: impl Into<String>) {
        self.emit(Event::DebateStart {
            run_id: self.run_id,
            kind,
            subject: subject.into(),
        });
    }

    pub fn run_end(&self, status: RunStatus, error: Option<String>) {
        self.emit(Event::DebateEnd {
            run_id: self.run_id,
            status,
            error,
        });
    }

    pub fn phase_start(&self, phase: Phase) {
        self.emit(Event::PhaseStart {
            run_id: self.run_id,
            phase,
        });
    }

    pub fn phase_end(&self, phase: Phase, success: bool) {
        self.emit(Event::PhaseEnd {
            run_id: self.run_id,
            phase,
            success,
        });
    }

    /// Publishes `phase:end` with the outcome's success and passes it through.
    pub fn end_phase<T, E>(&self, phase: Phase, outcome: Result<T, E>) -> Result<T, E> {
        self.phase_end(phase, outcome.is_ok());
        outcome
    }

    pub fn round_start(&self, round: u32, total: u32) {
        self.emit(Event::RoundStart {
            run_id: self.run_id,
            round,
            total,
        });
    }

    pub fn round_end(&self, round: u32, duration_ms: u64) {
        self.emit(Event::RoundEnd {
            run_id: self.run_id,
            round,
            duration_ms,
        });
    }

    pub fn error(&self, message: impl Into<String>, phase: Option<Phase>, fatal: bool) {
        self.emit(Event::Error {
            run_id: Some(self.run_id),
            message: message.into(),
            phase,
            fatal,
        });
    }
}
