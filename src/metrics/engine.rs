use crate::bitstring::BitString;
use crate::config::{AnalysisConfig, DEFAULT_CORE_METRICS};
use crate::error::{panic_message, AnalysisError, Result};
use crate::metrics::cache::MetricCache;
use crate::metrics::catalog::MetricRegistry;
use crate::metrics::definition::{MetricCategory, MetricDefinition};
use crate::registry::SubscriptionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of evaluating one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricOutcome {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A metric that failed during a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFailure {
    pub id: String,
    pub message: String,
}

/// Output of [`MetricsEngine::calculate_all_metrics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Always true once the batch ran; unit failures are listed in `errors`
    pub success: bool,
    pub metrics: BTreeMap<String, f64>,
    /// Failed metrics, in registration order
    pub errors: Vec<MetricFailure>,
    /// Every core metric is registered and succeeded
    pub core_metrics_computed: bool,
}

/// Evaluates registered metrics with per-metric failure isolation
///
/// A metric whose computation returns an error, panics or produces a
/// non-finite value is a unit failure: `calculate_metric` reports it in the
/// outcome and `calculate_all_metrics` lists it in `errors`.
///
/// # Example
/// ```
/// use bitscope::{config::AnalysisConfig, metrics::MetricsEngine, BitString};
///
/// let engine = MetricsEngine::from_config(&AnalysisConfig::default()).unwrap();
/// let report = engine.calculate_all_metrics(&BitString::parse("11110000").unwrap());
/// assert!(report.core_metrics_computed);
/// assert_eq!(report.metrics["entropy"], 1.0);
/// ```
pub struct MetricsEngine {
    registry: Arc<MetricRegistry>,
    core: Vec<String>,
    cache: Option<Arc<MetricCache>>,
    subscription: Option<SubscriptionId>,
}

impl MetricsEngine {
    /// Engine without a cache, using the default core set
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self {
            registry,
            core: DEFAULT_CORE_METRICS.iter().map(|id| id.to_string()).collect(),
            cache: None,
            subscription: None,
        }
    }

    /// Built-in catalog, core set and cache as configured
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let registry = Arc::new(MetricRegistry::with_builtin_metrics(config)?);
        let engine = Self::new(registry).with_core_metrics(config.metrics.core.clone());
        Ok(if config.metrics.cache {
            engine.with_cache(config.metrics.cache_capacity)
        } else {
            engine
        })
    }

    /// Cache results; entries of a metric are dropped whenever the registry
    /// reports a change to that id
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.detach_cache();

        let cache = Arc::new(MetricCache::new(capacity));
        let observed = Arc::clone(&cache);
        self.subscription = Some(self.registry.subscribe(move |event| {
            observed.invalidate_metric(event.id());
        }));
        self.cache = Some(cache);
        self
    }

    pub fn with_core_metrics(mut self, core: Vec<String>) -> Self {
        self.core = core;
        self
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> Option<&Arc<MetricCache>> {
        self.cache.as_ref()
    }

    pub fn core_metrics(&self) -> &[String] {
        &self.core
    }

    /// Evaluate one metric
    ///
    /// Fails only with [`AnalysisError::MetricNotFound`]; computation
    /// failures are reported in the outcome.
    pub fn calculate_metric(&self, id: &str, bits: &BitString) -> Result<MetricOutcome> {
        let definition = self
            .registry
            .get(id)
            .ok_or_else(|| AnalysisError::MetricNotFound(id.to_string()))?;

        Ok(match self.evaluate(&definition, bits) {
            Ok(value) => MetricOutcome {
                id: id.to_string(),
                success: true,
                value: Some(value),
                error: None,
            },
            Err(err) => {
                warn!(metric = %id, error = %err, "metric failed");
                MetricOutcome {
                    id: id.to_string(),
                    success: false,
                    value: None,
                    error: Some(err.to_string()),
                }
            }
        })
    }

    /// Evaluate every registered metric
    ///
    /// Uses the registry snapshot taken at the start of the call.
    pub fn calculate_all_metrics(&self, bits: &BitString) -> MetricsReport {
        let snapshot = self.registry.snapshot();

        #[cfg(feature = "parallel")]
        let results: Vec<(&str, Result<f64>)> = snapshot
            .par_iter()
            .map(|definition| (definition.id.as_str(), self.evaluate(definition, bits)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<(&str, Result<f64>)> = snapshot
            .iter()
            .map(|definition| (definition.id.as_str(), self.evaluate(definition, bits)))
            .collect();

        let mut metrics = BTreeMap::new();
        let mut errors = Vec::new();
        for (id, result) in results {
            match result {
                Ok(value) => {
                    metrics.insert(id.to_string(), value);
                }
                Err(err) => {
                    warn!(metric = %id, error = %err, "metric failed, continuing batch");
                    errors.push(MetricFailure {
                        id: id.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let core_metrics_computed = self.core.iter().all(|id| metrics.contains_key(id));
        debug!(
            bits = bits.len(),
            computed = metrics.len(),
            failed = errors.len(),
            core_metrics_computed,
            "metric batch complete"
        );

        MetricsReport {
            success: true,
            metrics,
            errors,
            core_metrics_computed,
        }
    }

    /// Registered metric ids grouped by category, in registration order
    pub fn metrics_by_category(&self) -> BTreeMap<MetricCategory, Vec<String>> {
        let mut groups: BTreeMap<MetricCategory, Vec<String>> = BTreeMap::new();
        for definition in self.registry.snapshot().iter() {
            groups
                .entry(definition.category)
                .or_default()
                .push(definition.id.clone());
        }
        groups
    }

    fn evaluate(&self, definition: &MetricDefinition, bits: &BitString) -> Result<f64> {
        let key = bits.content_key();
        if let Some(value) = self.cache.as_ref().and_then(|c| c.get(key, &definition.id)) {
            return Ok(value);
        }

        let failure = |message: String| AnalysisError::MetricCompute {
            id: definition.id.clone(),
            message,
        };

        let value = panic::catch_unwind(AssertUnwindSafe(|| (definition.compute)(bits)))
            .map_err(|payload| failure(format!("panicked: {}", panic_message(payload.as_ref()))))?
            .map_err(|err| failure(format!("{:#}", err)))?;

        if !value.is_finite() {
            return Err(failure(format!("non-finite value {}", value)));
        }

        if let Some(cache) = &self.cache {
            // A replacement is either visible in the registry by now or its
            // invalidation runs after this insert
            let stored =
                cache.insert_if(key, &definition.id, value, || self.is_registered(definition));
            if !stored {
                debug!(metric = %definition.id, "definition changed during evaluation, result not cached");
            }
        }
        Ok(value)
    }

    /// `definition` is the entry currently registered under its id
    fn is_registered(&self, definition: &MetricDefinition) -> bool {
        self.registry
            .get(&definition.id)
            .map_or(false, |current| std::ptr::eq(Arc::as_ptr(&current), definition))
    }

    fn detach_cache(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.registry.unsubscribe(subscription);
        }
        self.cache = None;
    }
}

impl Drop for MetricsEngine {
    fn drop(&mut self) {
        self.detach_cache();
    }
}

impl std::fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("registry", &self.registry)
            .field("core", &self.core)
            .field("cache", &self.cache)
            .finish()
    }
}
