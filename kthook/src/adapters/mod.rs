//! Bindings of [`HookTransform`](crate::transform::HookTransform) to the two
//! pass-manager generations. Both only delegate; neither adds logic of its own.

pub mod legacy;
pub mod modern;
