// src/dispatch/coordinator.rs

use tracing::{debug, error, info, warn};

use crate::dispatch::starter::ProcessStarter;
use crate::errors::StartupError;
use crate::registry::Service;

/// Result of [`DispatchCoordinator::try_dispatch`].
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The start call was accepted.
    Started,
    /// The start call failed on every attempt. The service stays dispatched.
    Failed(StartupError),
    /// Already dispatched or blocked; nothing was done.
    Skipped,
}

impl DispatchOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, DispatchOutcome::Started)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DispatchOutcome::Skipped)
    }
}

/// One-shot dispatch of services through a [`ProcessStarter`].
pub struct DispatchCoordinator<S> {
    starter: S,
    /// Extra attempts after a failed start call (0 = no retry).
    start_retries: u32,
    /// Services whose start call ultimately failed, in dispatch order.
    failed: Vec<String>,
}

impl<S: ProcessStarter> DispatchCoordinator<S> {
    pub fn new(starter: S) -> Self {
        Self {
            starter,
            start_retries: 0,
            failed: Vec::new(),
        }
    }

    pub fn with_start_retries(mut self, retries: u32) -> Self {
        self.start_retries = retries;
        self
    }

    pub fn starter(&self) -> &S {
        &self.starter
    }

    pub fn into_starter(self) -> S {
        self.starter
    }

    /// Names of services whose start call failed.
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// Start `service` unless it is already resolved.
    ///
    /// The service is marked dispatched *before* the start call, so a slow
    /// or failing call can never lead to a second dispatch.
    pub async fn try_dispatch(&mut self, service: &mut Service) -> DispatchOutcome {
        if !service.mark_dispatched() {
            debug!(
                service = %service.name(),
                resolution = ?service.resolution(),
                "service already resolved; not dispatching"
            );
            return DispatchOutcome::Skipped;
        }

        let target = service.start_target().clone();
        info!(
            service = %service.name(),
            target = %target,
            priority = service.effective_priority(),
            "starting service"
        );

        let mut attempt = 0;
        loop {
            match self.starter.start(&target).await {
                Ok(()) => return DispatchOutcome::Started,
                Err(e) if attempt < self.start_retries => {
                    attempt += 1;
                    warn!(
                        service = %service.name(),
                        target = %target,
                        attempt,
                        error = %e,
                        "start call failed; retrying"
                    );
                }
                Err(e) => {
                    let err = StartupError::Dispatch {
                        target: target.to_string(),
                        source: Box::new(e),
                    };
                    error!(service = %service.name(), error = %err, "start call failed");
                    self.failed.push(service.name().to_string());
                    return DispatchOutcome::Failed(err);
                }
            }
        }
    }
}
