//! Native-module loading and dispatch (spec §4.6): the `#[repr(C)]` ABI a
//! shared library links against, the on-disk search/naming convention, and
//! the `ModuleRegistry` the interpreter calls through for every
//! `system_call` instruction.

pub mod abi;
pub mod call_context;
pub mod config;
pub mod math;
pub mod registry;
pub mod symbol_hash;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::registry::{ModuleLoadError, ModuleRegistry};
    pub use crate::symbol_hash::SymbolHash;
}
