//! The C-compatible ABI a native module shared library links against.
//!
//! Shape is grounded on `original_source/include/ps/ps_api.h`: an
//! `ps_module_init` entry symbol fills in a `PS_Module` descriptor (name,
//! ABI version, a flat `PS_NativeFnDesc` table); each native function
//! receives the values the interpreter already evaluated and reports its
//! result through an out-parameter plus a status code, exactly like a
//! native function anywhere else in the original runtime's call
//! convention (spec §4.6). Everything here is `#[repr(C)]` / `extern "C"`
//! so a module compiled against this header in a systems language other
//! than Rust links unchanged, per spec §9's re-architecture guidance.

use std::os::raw::{c_char, c_void};

/// The ABI version this build of the interpreter implements. A module
/// whose `abi_version` does not match is rejected rather than loaded with
/// guessed-at compatibility (spec §4.6: "validate that its reported ABI
/// version equals the process's").
pub const PS_ABI_VERSION: u32 = 1;

/// The symbol every native module shared library must export.
pub const PS_MODULE_INIT_SYMBOL: &[u8] = b"ps_module_init";

/// Discriminant for [`PsFfiValue`]'s payload, mirroring `Value`'s scalar
/// subset — the ABI only ever marshals scalars and UTF-8 strings across
/// the FFI boundary; lists/maps/objects stay host-side (spec §4.6: a
/// native function receives "the Context and an argument array").
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
pub enum PsTypeTag {
    Void = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    Byte = 4,
    Glyph = 5,
    String = 6,
    /// Any value kind, used for parameter descriptors that accept whatever
    /// the caller passes (the interpreter still narrows at the call site).
    Any = 7,
}

/// A value crossing the FFI boundary. Only one field of the union below is
/// meaningful, selected by `tag`. Strings are a borrowed UTF-8 pointer +
/// byte length; the callee must not retain it past the call.
///
/// `tag` is stored as a raw `u8` rather than `PsTypeTag` itself: this struct
/// is read back after a dynamically loaded, non-Rust-verified library has
/// written into it, so the discriminant is untrusted input and must be
/// validated with [`PsTypeTag::try_from`] (via `num_enum`) rather than
/// transmuted directly — an out-of-range byte here would otherwise be
/// instant undefined behavior on every `match`.
#[repr(C)]
pub struct PsFfiValue {
    pub tag: u8,
    pub as_bool: bool,
    pub as_int: i64,
    pub as_float: f64,
    pub as_byte: u8,
    pub as_glyph: u32,
    pub str_ptr: *const u8,
    pub str_len: usize,
}

impl PsFfiValue {
    pub const VOID: PsFfiValue = PsFfiValue {
        tag: PsTypeTag::Void as u8,
        as_bool: false,
        as_int: 0,
        as_float: 0.0,
        as_byte: 0,
        as_glyph: 0,
        str_ptr: std::ptr::null(),
        str_len: 0,
    };
}

/// Opaque handle standing in for `protoscript_core::context::Context` on
/// the native side of the boundary. A module never dereferences this
/// itself; it is threaded back into host-provided callbacks (none are
/// exposed yet beyond the call itself — see `DESIGN.md`).
#[repr(C)]
pub struct PsContextHandle {
    _private: [u8; 0],
}

/// `0` on success; nonzero means the callee has set an error on the
/// Context (or, for a typed module error, has written a `sys:`/`fs:`/`io:`
/// prefixed message) and `out` must be ignored.
pub type PsStatus = i32;

pub const PS_OK: PsStatus = 0;
pub const PS_ERR: PsStatus = 1;

/// A single native function entry: fixed name/arity/type-tag metadata
/// alongside the function pointer the interpreter actually calls through.
/// `arity < 0` marks a variadic function (spec §4.6: "arity (or variadic
/// marker)").
#[repr(C)]
pub struct PsNativeFnDesc {
    pub name: *const c_char,
    pub arity: i32,
    pub return_type: PsTypeTag,
    pub param_types: *const PsTypeTag,
    pub param_count: usize,
    pub flags: u32,
    pub func: PsNativeFn,
}

pub type PsNativeFn = unsafe extern "C" fn(
    ctx: *mut PsContextHandle,
    args: *const PsFfiValue,
    arg_count: usize,
    out: *mut PsFfiValue,
) -> PsStatus;

/// One prototype (object or exception type) a native module contributes,
/// looked up via the module's `ps_ir_find_proto`-equivalent when the
/// module-local IR has no matching declaration (spec §4.6).
#[repr(C)]
pub struct PsProtoDesc {
    pub name: *const c_char,
    pub parent: *const c_char,
    pub is_sealed: bool,
    pub field_names: *const *const c_char,
    pub field_count: usize,
}

/// The descriptor a module's `ps_module_init` fills in. Zeroed by the
/// loader before the call (spec §4.6: "call it with a zeroed module
/// descriptor").
#[repr(C)]
pub struct PsModuleDesc {
    pub name: *const c_char,
    pub abi_version: u32,
    pub functions: *const PsNativeFnDesc,
    pub function_count: usize,
    pub protos: *const PsProtoDesc,
    pub proto_count: usize,
}

impl Default for PsModuleDesc {
    fn default() -> Self {
        // SAFETY: every field is a plain-old-data pointer/integer; an
        // all-zero bit pattern is a valid (empty) descriptor, matching the
        // "zeroed module descriptor" a module's init function receives.
        unsafe { std::mem::zeroed() }
    }
}

/// The entry point every native module shared library exports.
pub type PsModuleInitFn = unsafe extern "C" fn(out: *mut PsModuleDesc) -> PsStatus;

/// Marker so a future host callback table can hand a module a function
/// pointer back into the runtime without naming `protoscript-vm` types in
/// this `#[repr(C)]` layer.
pub type PsHostCallback = unsafe extern "C" fn(ctx: *mut PsContextHandle) -> *mut c_void;
