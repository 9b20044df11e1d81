//! The kernel facade: configuration, the context record, diagnostics.

pub mod config;
pub mod context;
pub mod report;

pub use config::{KernelConfig, DEFAULT_MODULE_CHECK_INTERVAL};
pub use context::Kernel;
pub use report::{KernelReport, KernelStatus, ModuleSummary};
