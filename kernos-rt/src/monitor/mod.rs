//! Supervision hooks: behavior reports, anomalies, interventions.

pub mod supervisor;
pub mod types;

pub use supervisor::{NoopSupervisor, Supervisor, ThresholdSupervisor};
pub use types::{AnomalyKind, BehaviorReport, Intervention};
