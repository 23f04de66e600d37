// src/rpc/client.rs

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info};

use crate::dispatch::ProcessStarter;
use crate::errors::{Result, StartupError};
use crate::group::StartTarget;
use crate::rpc::transport::{ServerUrl, post_xml};
use crate::rpc::xmlrpc::{self, Value};

/// supervisord XML-RPC client.
#[derive(Debug, Clone)]
pub struct SupervisorClient {
    url: ServerUrl,
}

impl SupervisorClient {
    pub fn new(url: ServerUrl) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &ServerUrl {
        &self.url
    }

    /// Issue one call and decode the result.
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        debug!(method, url = %self.url, "rpc call");
        let body = xmlrpc::encode_call(method, params);
        let response = post_xml(&self.url, &body).await?;
        xmlrpc::decode_response(&response)
    }

    /// `supervisor.getAPIVersion`, used to check the connection.
    pub async fn api_version(&self) -> Result<String> {
        let value = self.call("supervisor.getAPIVersion", &[]).await?;
        Ok(value.to_string())
    }

    /// `supervisor.startProcess(name, wait=false)`.
    pub async fn start_process(&self, name: &str) -> Result<()> {
        let value = self
            .call(
                "supervisor.startProcess",
                &[Value::Str(name.to_string()), Value::Bool(false)],
            )
            .await?;
        match value.as_bool() {
            Some(false) => Err(StartupError::Rpc {
                code: 0,
                message: format!("startProcess({name}) returned false"),
            }),
            _ => Ok(()),
        }
    }

    /// `supervisor.startProcessGroup(name, wait=false)`.
    pub async fn start_process_group(&self, group: &str) -> Result<()> {
        self.call(
            "supervisor.startProcessGroup",
            &[Value::Str(group.to_string()), Value::Bool(false)],
        )
        .await?;
        Ok(())
    }
}

impl ProcessStarter for SupervisorClient {
    fn start<'a>(
        &'a mut self,
        target: &'a StartTarget,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            match target {
                StartTarget::Process(name) => self.start_process(name).await?,
                StartTarget::Group(group) => self.start_process_group(group).await?,
            }
            info!(target = %target, "start requested");
            Ok(())
        })
    }
}
