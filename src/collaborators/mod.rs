pub mod finance;
pub mod legal;

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CollaboratorError;

#[derive(Debug, Clone)]
pub(crate) struct JsonEndpoint {
    client: Client,
    base_url: String,
    service: &'static str,
}

impl JsonEndpoint {
    pub(crate) fn new(
        service: &'static str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| CollaboratorError::Unreachable { service, source })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
        })
    }

    pub(crate) async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, CollaboratorError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let service = self.service;
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path.trim_start_matches('/')))
            .json(body)
            .send()
            .await
            .map_err(|source| CollaboratorError::Unreachable { service, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Failed {
                service,
                status: status.as_u16(),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|source| CollaboratorError::InvalidResponse { service, source })
    }
}
