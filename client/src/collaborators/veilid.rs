use async_trait::async_trait;
use parking_lot::Mutex;
use veilid_core::{RouteId, VeilidAPI};

use super::traits::CircuitBuilder;
use crate::error::ServiceError;

/// Circuit builder backed by Veilid private routes.
///
/// Each build allocates a fresh private route and releases the one it
/// replaces, so at most one route from this builder is alive at a time.
pub struct VeilidCircuitBuilder {
    api: VeilidAPI,
    current_route: Mutex<Option<RouteId>>,
}

impl VeilidCircuitBuilder {
    pub fn new(api: VeilidAPI) -> Self {
        Self {
            api,
            current_route: Mutex::new(None),
        }
    }

    /// Route currently held, if any.
    pub fn route_id(&self) -> Option<RouteId> {
        self.current_route.lock().clone()
    }
}

#[async_trait]
impl CircuitBuilder for VeilidCircuitBuilder {
    async fn build_new_paths(&self) -> Result<(), ServiceError> {
        let route_blob = self
            .api
            .new_private_route()
            .await
            .map_err(|e| ServiceError::Circuit(format!("new_private_route: {e}")))?;

        // Swap under the lock, release outside it.
        let previous = self
            .current_route
            .lock()
            .replace(route_blob.route_id.clone());
        if let Some(old) = previous {
            if let Err(e) = self.api.release_private_route(old) {
                tracing::warn!(error = %e, "failed to release previous private route");
            }
        }

        tracing::info!(
            route_id = %route_blob.route_id,
            blob_len = route_blob.blob.len(),
            "private route allocated"
        );
        Ok(())
    }
}
