// src/engine/runtime.rs

use std::fmt;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

use crate::dispatch::{DispatchCoordinator, ProcessStarter};
use crate::errors::Result;
use crate::evaluator::{EvaluationStep, ReadinessEvaluator};
use crate::protocol::{EventListener, Incoming, ListenerEvent};
use crate::registry::Resolution;

use super::{RunOutcome, RunSummary, RuntimeOptions};

/// Drives the readiness evaluator from the supervisord event stream and
/// hands eligible services to the dispatch coordinator.
///
/// All startup semantics live in [`ReadinessEvaluator`] and
/// [`DispatchCoordinator`]; this struct only does the IO: READY, read,
/// evaluate, dispatch, acknowledge.
pub struct StartupRuntime<S, R, W> {
    evaluator: ReadinessEvaluator,
    coordinator: DispatchCoordinator<S>,
    listener: EventListener<R, W>,
    options: RuntimeOptions,
}

impl<S, R, W> fmt::Debug for StartupRuntime<S, R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupRuntime")
            .field("evaluator", &self.evaluator)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S, R, W> StartupRuntime<S, R, W>
where
    S: ProcessStarter,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        evaluator: ReadinessEvaluator,
        coordinator: DispatchCoordinator<S>,
        listener: EventListener<R, W>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            evaluator,
            coordinator,
            listener,
            options,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches services that are eligible before any event.
    /// - Then handles one event at a time until every managed service is
    ///   resolved (or, with `exit_when_complete = false`, until the source
    ///   closes).
    pub async fn run(mut self) -> Result<RunSummary> {
        let managed = self.evaluator.graph().managed().count();
        info!(
            services = self.evaluator.graph().len(),
            managed, "dependent startup runtime started"
        );

        let step = self.evaluator.initial_step();
        self.apply(step).await;

        if self.should_exit() {
            info!("no services left to start; exiting without listening");
            return Ok(self.summary(RunOutcome::Completed));
        }

        let outcome = loop {
            self.listener.ready().await?;

            match self.listener.next().await? {
                Incoming::Closed => {
                    let outcome = if self.evaluator.is_complete() {
                        RunOutcome::Completed
                    } else {
                        RunOutcome::SourceClosed
                    };
                    info!(?outcome, "event source closed");
                    break outcome;
                }
                Incoming::Malformed(reason) => {
                    warn!(%reason, "discarding malformed event");
                }
                Incoming::Event(ListenerEvent::Other { eventname }) => {
                    trace!(%eventname, "ignoring non process-state event");
                }
                Incoming::Event(ListenerEvent::ProcessState(change)) => {
                    let step = self
                        .evaluator
                        .on_event(&change.process, change.from, change.to);
                    self.apply(step).await;
                }
            }

            self.listener.ack().await?;

            if self.should_exit() {
                info!("all dependent services resolved; ignoring further events");
                break RunOutcome::Completed;
            }
        };

        Ok(self.summary(outcome))
    }

    fn should_exit(&self) -> bool {
        self.options.exit_when_complete && self.evaluator.is_complete()
    }

    /// Dispatch the eligible services of one step, in order.
    async fn apply(&mut self, step: EvaluationStep) {
        if !step.newly_blocked.is_empty() {
            debug!(blocked = ?step.blocked_names(), "services blocked in this step");
        }

        for ready in step.eligible {
            let Some(service) = self.evaluator.service_mut(ready.id) else {
                continue;
            };
            let outcome = self.coordinator.try_dispatch(service).await;
            debug!(service = %ready.name, ?outcome, "dispatch result");
        }
    }

    fn summary(&self, outcome: RunOutcome) -> RunSummary {
        let mut summary = RunSummary {
            outcome,
            failed: self.coordinator.failed().to_vec(),
            ..RunSummary::default()
        };

        for service in self.evaluator.graph().managed() {
            let name = service.name().to_string();
            match service.resolution() {
                Resolution::Dispatched => summary.dispatched.push(name),
                Resolution::Blocked => summary.blocked.push(name),
                Resolution::Pending => summary.unresolved.push(name),
            }
        }

        if !summary.unresolved.is_empty() {
            warn!(unresolved = ?summary.unresolved, "services never became eligible");
        }
        summary
    }
}
