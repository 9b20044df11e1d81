//! # kernos-mods - Hot-Swappable Modules and the Sandbox Engine
//!
//! The module half of the kernos core: relocatable module images with a
//! bit-exact header format, a registry that loads, unloads, and hot-swaps
//! them through a strict pipeline, a flat global symbol table, and a
//! capability-based sandbox bound 1:1 to every module.
//!
//! # Quick Start
//!
//! ```rust
//! use kernos_mods::prelude::*;
//!
//! let mut kernel = Kernel::boot(KernelConfig::default()).unwrap();
//!
//! let image = ImageBuilder::new("mod_hello", 1)
//!     .module_type(ModuleType::Custom)
//!     .code(&[0x90, 0xc3])
//!     .export("hello", 0, 2)
//!     .build();
//!
//! let id = kernel.load_module(&image, LoadOptions::default()).unwrap();
//! assert_eq!(kernel.registry().state_of(id), Some(ModuleState::Loaded));
//!
//! // Gated call through the sandbox; "hello" needs no capability.
//! let addr = kernel.call_module("hello").unwrap();
//! assert_ne!(addr, 0);
//!
//! kernel.unload_module(id).unwrap();
//! ```
//!
//! # Security Model
//!
//! Every module owns a [`sandbox::Sandbox`]: a granted mask and a denied
//! mask (denied wins), per-resource limits, and a bounded violation ring.
//! Checks never panic and never terminate the module; strict enforcement
//! escalates repeat offenders to the terminal `Quarantine` level, from
//! which only a privileged kernel operation can restore them.
//!
//! # Module Organization
//!
//! - [`image`] - bit-exact image layout, validation, checksum, builder
//! - [`registry`] - module table, load/unload/hot-swap, symbol resolution
//! - [`sandbox`] - capabilities, limits, violations, quarantine
//! - [`kernel`] - the kernel context owning scheduler + registry

pub mod error;
pub mod ids;
pub mod image;
pub mod kernel;
pub mod prelude;
pub mod registry;
pub mod sandbox;

// Re-export commonly used types
pub use error::{ImageError, KernelError, ModuleError, SandboxError};
pub use ids::ModuleId;
pub use image::{ImageBuilder, ModuleFlags, ModuleImage, ModuleType};
pub use kernel::{Kernel, KernelConfig, KernelStatus};
pub use registry::{LoadOptions, ModuleHooks, ModuleRegistry, ModuleState};
pub use sandbox::{CapSet, Capability, ResourceType, Sandbox, SecurityLevel, ViolationKind};
