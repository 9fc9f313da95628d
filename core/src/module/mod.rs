// go_flow/src/module/mod.rs

//! Named, reusable bundles of registrations and the table that holds them.

pub mod definition;
pub mod registry;

pub use definition::Module;
pub use registry::ModuleRegistry;
