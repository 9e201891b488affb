use crate::bitstring::BitString;
use crate::registry::Identified;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Grouping used by `metrics_by_category`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Basic,
    Statistical,
    Runs,
    Transitions,
    Compression,
    Patterns,
    Correlation,
    Ideality,
    Custom,
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MetricCategory::Basic => "basic",
            MetricCategory::Statistical => "statistical",
            MetricCategory::Runs => "runs",
            MetricCategory::Transitions => "transitions",
            MetricCategory::Compression => "compression",
            MetricCategory::Patterns => "patterns",
            MetricCategory::Correlation => "correlation",
            MetricCategory::Ideality => "ideality",
            MetricCategory::Custom => "custom",
        };
        f.write_str(label)
    }
}

/// Shared metric computation
pub type ComputeFn = Arc<dyn Fn(&BitString) -> anyhow::Result<f64> + Send + Sync>;

/// Named computation producing one number from a bit string
#[derive(Clone)]
pub struct MetricDefinition {
    pub id: String,
    pub display_name: String,
    pub category: MetricCategory,
    pub compute: ComputeFn,
}

impl MetricDefinition {
    /// Fallible metric
    pub fn new<F>(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: MetricCategory,
        compute: F,
    ) -> Self
    where
        F: Fn(&BitString) -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category,
            compute: Arc::new(compute),
        }
    }

    /// Metric that cannot fail
    pub fn infallible<F>(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: MetricCategory,
        compute: F,
    ) -> Self
    where
        F: Fn(&BitString) -> f64 + Send + Sync + 'static,
    {
        Self::new(id, display_name, category, move |bits| Ok(compute(bits)))
    }
}

impl Identified for MetricDefinition {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for MetricDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricDefinition")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}
