//! In-memory monitor for tests, demos, and local development.
//!
//! [`RecordingMonitor`] stands in for the engine: it records every request
//! it receives and answers from planned responses, planned rejections, or
//! a predictable default formula. Assertions then read the recorded
//! requests back instead of scraping logs.

use crate::monitor::{
    MonitorError, RegisterResourceRequest, RegisterResourceResponse, ResourceMonitor,
};
use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde_json::Map;
use strata_core::resource::{ExternalId, Urn};

#[derive(Debug)]
enum Planned {
    Respond(RegisterResourceResponse),
    Reject(String),
}

/// [`ResourceMonitor`] that never leaves the process.
///
/// Unplanned registrations succeed with the default formula: URN
/// `urn:<type>::<name>`, external identifier `id-<name>` for primitives,
/// and an empty output bag.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    requests: Mutex<Vec<RegisterResourceRequest>>,
    planned: Mutex<HashMap<String, Planned>>,
}

impl RecordingMonitor {
    /// An empty monitor; every registration gets the default formula.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans a specific response for the resource named `name`.
    pub fn respond_with(&self, name: impl Into<String>, response: RegisterResourceResponse) {
        self.planned
            .lock()
            .insert(name.into(), Planned::Respond(response));
    }

    /// Plans a rejection for the resource named `name`.
    pub fn fail_with(&self, name: impl Into<String>, reason: impl Into<String>) {
        self.planned
            .lock()
            .insert(name.into(), Planned::Reject(reason.into()));
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RegisterResourceRequest> {
        self.requests.lock().clone()
    }

    /// The request received for the resource named `name`, if any.
    #[must_use]
    pub fn request_for(&self, name: &str) -> Option<RegisterResourceRequest> {
        self.requests
            .lock()
            .iter()
            .find(|request| request.name == name)
            .cloned()
    }

    /// The response an unplanned registration would get.
    #[must_use]
    pub fn default_response(request: &RegisterResourceRequest) -> RegisterResourceResponse {
        RegisterResourceResponse {
            urn: Urn::new(format!("urn:{}::{}", request.type_token, request.name)),
            id: request
                .primitive
                .then(|| ExternalId::new(format!("id-{}", request.name))),
            object: Map::new(),
        }
    }
}

#[async_trait]
impl ResourceMonitor for RecordingMonitor {
    async fn register_resource(
        &self,
        request: RegisterResourceRequest,
    ) -> Result<RegisterResourceResponse, MonitorError> {
        let planned = self.planned.lock().remove(&request.name);
        let default = Self::default_response(&request);
        self.requests.lock().push(request);
        match planned {
            Some(Planned::Respond(response)) => Ok(response),
            Some(Planned::Reject(reason)) => Err(MonitorError::Rejected(reason)),
            None => Ok(default),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────
