// src/dispatch/starter.rs

//! Pluggable start-operation abstraction.
//!
//! The coordinator talks to a `ProcessStarter` instead of an RPC client
//! directly. Production code uses
//! [`SupervisorClient`](crate::rpc::SupervisorClient); tests can provide a
//! fake that records which targets were started.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::group::StartTarget;

/// Trait abstracting how a service is started.
pub trait ProcessStarter: Send {
    /// Ask the process manager to start `target`.
    ///
    /// Resolves once the request has been accepted or rejected; it does not
    /// wait for the process to reach RUNNING.
    fn start<'a>(
        &'a mut self,
        target: &'a StartTarget,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
