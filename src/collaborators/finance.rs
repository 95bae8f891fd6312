use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::collaborators::JsonEndpoint;
use crate::error::CollaboratorError;
use crate::models::driver::DriverId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub job_id: Uuid,
    pub driver_id: Option<DriverId>,
    pub amount: f64,
    pub is_express: bool,
}

// The finance service owns the revenue split; its reply is passed through untouched.
#[async_trait]
pub trait FinanceGateway: Send + Sync {
    async fn process_invoice(&self, request: &InvoiceRequest) -> Result<Value, CollaboratorError>;
}

#[derive(Debug, Clone)]
pub struct HttpFinanceClient {
    endpoint: JsonEndpoint,
}

impl HttpFinanceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            endpoint: JsonEndpoint::new("finance service", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl FinanceGateway for HttpFinanceClient {
    async fn process_invoice(&self, request: &InvoiceRequest) -> Result<Value, CollaboratorError> {
        self.endpoint.post("process_invoice", request).await
    }
}
