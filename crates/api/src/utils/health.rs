//! Health report returned by `GET /health`

use serde::{Deserialize, Serialize};

/// Overall health of the service.
///
/// # Example
/// ```
/// use callslot_api::utils::health::{ComponentHealth, HealthStatus};
///
/// let status = HealthStatus::at(1_741_000_000)
///     .add_component(ComponentHealth::healthy("database"))
///     .add_component(ComponentHealth::unhealthy("payments", "keys missing"))
///     .finish();
///
/// assert!(!status.is_healthy);
/// assert_eq!(status.score, 0.5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub is_healthy: bool,

    /// Share of healthy components, 0.0 to 1.0.
    pub score: f64,

    pub components: Vec<ComponentHealth>,

    /// Unix seconds.
    pub timestamp: i64,
}

impl HealthStatus {
    pub fn at(timestamp: i64) -> Self {
        Self { is_healthy: true, score: 1.0, components: Vec::new(), timestamp }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Compute the score. Every component must be healthy for the service
    /// to report healthy.
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(mut self) -> Self {
        if self.components.is_empty() {
            return self;
        }
        let healthy = self.components.iter().filter(|c| c.is_healthy).count();
        self.score = healthy as f64 / self.components.len() as f64;
        self.is_healthy = healthy == self.components.len();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    /// Component identifier, e.g. `"database"`.
    pub name: String,
    pub is_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    /// Healthy, with an informational note.
    pub fn healthy_with(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: Some(message.into()) }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }
}
