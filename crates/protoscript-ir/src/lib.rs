//! The JSON intermediate representation ProtoScript modules are compiled to,
//! and the loader that turns a JSON document into an immutable, stable-
//! address in-memory [`Module`].
//!
//! This crate never runs a module; `protoscript-vm` does. It only parses and
//! validates the shape a front end (out of scope here) is expected to
//! produce.

pub mod instr;
pub mod loader;
pub mod model;

pub use instr::Instr;
pub use loader::{load_from_str, load_from_value};
pub use model::{
    Block, Function, Group, GroupMember, InstrNode, Literal, Module, Param, Proto, ProtoField,
    ProtoMethod, StdStream,
};
