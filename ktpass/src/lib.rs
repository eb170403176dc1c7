//! Pass-manager host for [`ktinstr`] modules.
//!
//! Two generations of pass managers live side by side, mirroring how compiler
//! toolchains evolved: the [`legacy`] manager, where passes are registered
//! statically under an argument name and attached to extension points of a
//! [`legacy::PassManagerBuilder`], and the [`modern`] manager, where a
//! [`modern::PassBuilder`] collects callbacks (usually from a loaded
//! [`plugin`]) and textual pipelines are parsed into a
//! [`modern::ModulePassManager`]. Both report changes through the
//! [`analysis`] layer.

pub mod analysis;
pub mod legacy;
pub mod magic;
pub mod modern;
pub mod passes;
pub mod plugin;
pub mod utils;

pub extern crate inventory;
