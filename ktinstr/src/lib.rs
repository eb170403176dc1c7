//! Intermediate representation used by the kernel-tools passes.
//!
//! A [`modules::Module`] owns functions, global variables and the symbol
//! table binding names to them. Passes mutate modules in place; the textual
//! form produced by `Display` can be parsed back with
//! [`modules::parser::parse_module`].

pub mod modules;
pub mod types;
pub mod utils;
