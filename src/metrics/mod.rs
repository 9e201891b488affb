// Metric catalog and batch evaluation
//
// `MetricDefinition`s live in a copy-on-write `Registry`. The built-in catalog
// covers counts, distribution statistics, runs, transitions, compressibility,
// pattern diversity, autocorrelation and ideality; callers may register more
// at runtime. `MetricsEngine` evaluates one metric or the whole catalog, with
// every metric isolated from the failures of the others.

mod cache;
mod catalog;
mod definition;
mod engine;

pub use cache::{CacheStats, MetricCache};
pub use catalog::{builtin_metrics, MetricRegistry};
pub use definition::{ComputeFn, MetricCategory, MetricDefinition};
pub use engine::{MetricFailure, MetricOutcome, MetricsEngine, MetricsReport};
