//! Compile-time hook insertion.
//!
//! The pass looks for one function of a module (by default
//! `__x64_sys_newuname`) and inserts, before its first instruction, a call to a
//! hook taking no argument and returning nothing (by default
//! `kernel_tools_hook_test`), declared with the `fastcc` calling convention.
//! The hook itself is defined elsewhere, usually in the runtime the module is
//! linked with, and must use the same calling convention.
//!
//! The transformation ([`transform::HookTransform`]) is shared by the two pass
//! managers of [`ktpass`]:
//! - the legacy manager finds it under `legacy-kthook` and runs it at the end
//!   of the per-module and link-time pipelines
//!   ([`adapters::legacy::LegacyHookPass`]);
//! - the new manager loads this crate as a plugin, finds it under `kthook` and
//!   runs it at the same two points ([`adapters::modern::HookPass`]).
//!
//! Failures never abort compilation: they are logged and the module is left
//! unchanged.

pub mod adapters;
pub mod config;
pub mod error;
pub mod instrument;
pub mod locator;
pub mod magic;
pub mod resolver;
pub mod transform;

pub use config::HookConfig;
pub use transform::{HookOutcome, HookTransform};

ktpass::define_pass_plugin!(adapters::modern::plugin_info());
