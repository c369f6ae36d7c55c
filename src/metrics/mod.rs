//! Periodic resource sampling and fan-out to live observers.

mod broadcast;
mod registry;
mod sampler;

pub use broadcast::{MetricsLoop, SampleView, latest_samples};
pub use registry::{OBSERVER_BUFFER, ObserverId, ObserverRegistry};
pub use sampler::{MetricReading, Sampler, SystemSampler};
