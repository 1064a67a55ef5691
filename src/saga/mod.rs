//! Saga coordinator for multi-item writes.
//!
//! The store has no cross-item transaction, so compound writes run as an
//! ordered list of steps, each pairing a forward action with an optional
//! compensating action. Steps execute left-to-right; when a step fails,
//! completed steps compensate right-to-left from the failure point.
//!
//! Two failure modes exist because not every compound write wants rollback:
//! - `Compensate`: the write must appear atomic (founder membership).
//! - `Tolerate`: the step is a best-effort denormalization (recency
//!   timestamps); its failure is logged and the saga continues.

use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use crate::services::ServiceError;

pub mod flows;

/// A deferred step action. Boxed so steps over different services compose
/// into one saga.
pub type StepFuture = BoxFuture<'static, Result<(), ServiceError>>;
pub type StepAction = Box<dyn Fn() -> StepFuture + Send + Sync>;

/// What the coordinator does when this step's forward action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Roll back all completed steps and fail the saga.
    Compensate,
    /// Log and continue; the saga can still commit.
    Tolerate,
}

/// One step of a saga: a forward action and an optional compensation.
pub struct SagaStep {
    name: &'static str,
    mode: FailureMode,
    forward: StepAction,
    compensate: Option<StepAction>,
}

impl SagaStep {
    /// A step whose effect can be undone.
    pub fn compensable(name: &'static str, forward: StepAction, compensate: StepAction) -> Self {
        Self {
            name,
            mode: FailureMode::Compensate,
            forward,
            compensate: Some(compensate),
        }
    }

    /// A step that must succeed for the saga to proceed but has no undo of
    /// its own (typically the first step).
    pub fn pivotal(name: &'static str, forward: StepAction) -> Self {
        Self {
            name,
            mode: FailureMode::Compensate,
            forward,
            compensate: None,
        }
    }

    /// A best-effort step; failure degrades to staleness, never rollback.
    pub fn tolerant(name: &'static str, forward: StepAction) -> Self {
        Self {
            name,
            mode: FailureMode::Tolerate,
            forward,
            compensate: None,
        }
    }
}

/// Terminal state of one saga run.
#[derive(Debug)]
pub enum SagaOutcome {
    /// Every required step succeeded.
    Committed,
    /// A step failed and all completed steps compensated cleanly; the store
    /// holds nothing from this saga.
    Failed {
        step: &'static str,
        error: ServiceError,
    },
    /// A step failed and at least one compensation also failed: the store
    /// is left in a detectable inconsistent state requiring out-of-band
    /// repair. Already logged at error level when returned.
    Orphaned {
        step: &'static str,
        error: ServiceError,
        compensation_failures: Vec<(&'static str, ServiceError)>,
    },
}

/// An ordered list of steps run as one logical write.
pub struct Saga {
    name: &'static str,
    steps: Vec<SagaStep>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: SagaStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Run steps left-to-right. Compensation runs right-to-left over the
    /// completed compensable steps; it is attempted once per step, not
    /// retried indefinitely.
    pub async fn run(self) -> SagaOutcome {
        let mut completed: Vec<&SagaStep> = Vec::new();

        for step in &self.steps {
            debug!(saga = self.name, step = step.name, "running saga step");
            match (step.forward)().await {
                Ok(()) => completed.push(step),
                Err(err) => match step.mode {
                    FailureMode::Tolerate => {
                        warn!(
                            saga = self.name,
                            step = step.name,
                            error = %err,
                            "saga step failed; tolerated, continuing"
                        );
                    }
                    FailureMode::Compensate => {
                        return self.compensate_from(completed, step.name, err).await;
                    }
                },
            }
        }

        debug!(saga = self.name, "saga committed");
        SagaOutcome::Committed
    }

    async fn compensate_from(
        &self,
        completed: Vec<&SagaStep>,
        failed_step: &'static str,
        error: ServiceError,
    ) -> SagaOutcome {
        warn!(
            saga = self.name,
            step = failed_step,
            error = %error,
            "saga step failed; compensating"
        );

        let mut compensation_failures = Vec::new();
        for step in completed.iter().rev() {
            let Some(compensate) = &step.compensate else {
                continue;
            };
            if let Err(err) = compensate().await {
                error!(
                    saga = self.name,
                    step = step.name,
                    error = %err,
                    "saga compensation failed; store left inconsistent, manual repair required"
                );
                compensation_failures.push((step.name, err));
            }
        }

        if compensation_failures.is_empty() {
            SagaOutcome::Failed {
                step: failed_step,
                error,
            }
        } else {
            SagaOutcome::Orphaned {
                step: failed_step,
                error,
                compensation_failures,
            }
        }
    }
}
