//! Background job scheduler and job implementations.

mod pool_metrics;
mod release_commissions;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use release_commissions::ReleaseCommissionsJob;
pub use scheduler::{run_once, Job, JobScheduler};
