use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use dependent_startup::dispatch::ProcessStarter;
use dependent_startup::errors::{Result, StartupError};
use dependent_startup::group::StartTarget;

/// Shared record of every start call, in call order.
pub type StartLog = Arc<Mutex<Vec<StartTarget>>>;

/// A fake starter that:
/// - records every start call (including failing ones)
/// - fails calls for configured targets with a supervisord-like fault.
#[derive(Default)]
pub struct FakeStarter {
    log: StartLog,
    /// Remaining failures per target name; `u32::MAX` means always.
    failures: HashMap<String, u32>,
}

impl FakeStarter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the call log; stays valid after the starter is moved.
    pub fn log(&self) -> StartLog {
        Arc::clone(&self.log)
    }

    /// Every call for `target` fails.
    pub fn failing(mut self, target: &str) -> Self {
        self.failures.insert(target.to_string(), u32::MAX);
        self
    }

    /// The first `times` calls for `target` fail.
    pub fn failing_times(mut self, target: &str, times: u32) -> Self {
        self.failures.insert(target.to_string(), times);
        self
    }
}

impl ProcessStarter for FakeStarter {
    fn start<'a>(
        &'a mut self,
        target: &'a StartTarget,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            {
                let mut guard = self.log.lock().unwrap();
                guard.push(target.clone());
            }

            if let Some(remaining) = self.failures.get_mut(target.name()) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(StartupError::Rpc {
                        code: 50,
                        message: format!("SPAWN_ERROR: {}", target.name()),
                    });
                }
            }
            Ok(())
        })
    }
}

/// Names of the targets in a start log.
pub fn started_names(log: &StartLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .map(|t| t.name().to_string())
        .collect()
}
