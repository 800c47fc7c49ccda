//! Liveness probe for the collaborator service.

use crate::client::{ServiceHealth, StoreClient};
use std::sync::Arc;

/// Checks whether the vector service answers `/health`.
///
/// Never raises and never retries: a transport error, a non-success status and a
/// timeout all read as "not healthy". Callers decide whether that is fatal.
#[derive(Clone)]
pub struct StoreProbe {
    client: Arc<dyn StoreClient>,
}

impl StoreProbe {
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }

    pub async fn is_healthy(&self) -> bool {
        self.health_details().await.is_some()
    }

    /// Health body when the service is live, for status reports.
    pub async fn health_details(&self) -> Option<ServiceHealth> {
        match self.client.health().await {
            Ok(health) => Some(health),
            Err(e) => {
                tracing::debug!(
                    target: "helen::probe",
                    service = self.client.base_url(),
                    error = %e,
                    "Vector service health check failed"
                );
                None
            }
        }
    }

    pub fn service_url(&self) -> &str {
        self.client.base_url()
    }
}
