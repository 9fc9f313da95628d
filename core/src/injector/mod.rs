// go_flow/src/injector/mod.rs

//! The dependency-resolution engine and the registry it resolves against.

pub mod provider;
pub mod resolve;

pub use provider::{ProviderDef, ProviderDescriptor, ProviderRegistry, PROVIDER_SUFFIX};
pub use resolve::{Injector, DELEGATE, INJECTOR, PROVIDE};
