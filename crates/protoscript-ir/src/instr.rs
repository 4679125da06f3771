//! The instruction set a [`crate::model::Block`] is made of.
//!
//! Variant names and the instruction families they fall into (variable
//! binding, try/catch control, member access, control flow, calls,
//! arithmetic/comparison, collection construction) are grounded on the
//! original runtime's `parse_instr`/`exec_function` dispatch, which switched
//! on the same operation names via string comparison. Here the dispatch is
//! a Rust `match` over a tagged enum instead, decided once at JSON-load time
//! rather than re-parsed on every step.

use crate::model::Literal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instr {
    Nop,

    /// Declares a named local with its default-for-type value.
    VarDecl {
        name: String,
        #[serde(rename = "type", default)]
        type_name: Option<String>,
    },

    /// Materializes a literal into a named temporary/local.
    Const { dst: String, literal: Literal },

    /// Pushes a try-handler frame; control resumes at `target` if an
    /// exception is raised before the matching `pop_handler`.
    PushHandler { target: String },

    PopHandler,

    /// Reads the currently-pending exception, lazily synthesizing one from
    /// the last runtime error if none is set yet.
    GetException { dst: String },

    /// Re-raises the currently-pending exception; an error if none is set.
    Rethrow,

    /// Tests whether `src` (an exception value) matches `type_name` via
    /// subsumption (`"Exception"`, `"RuntimeException"`, exact name, or a
    /// declared-parent-chain walk).
    ExceptionIs {
        dst: String,
        src: String,
        type_name: String,
    },

    LoadVar { dst: String, name: String },
    StoreVar { name: String, src: String },
    Copy { dst: String, src: String },

    MemberGet {
        dst: String,
        obj: String,
        name: String,
    },
    MemberSet {
        obj: String,
        name: String,
        src: String,
    },

    Jump { target: String },

    BranchIf {
        cond: String,
        target_true: String,
        target_false: String,
    },

    Ret { src: String },
    RetVoid,

    /// Raises `src` (must evaluate to an exception value) as the active
    /// exception, stamping the current source location onto it first.
    Throw { src: String },

    /// Calls a function declared at module scope by name.
    Call {
        #[serde(default)]
        dst: Option<String>,
        callee: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// Calls a named method on a declared prototype, resolved statically
    /// against the IR module (constructors, instance methods).
    CallStatic {
        #[serde(default)]
        dst: Option<String>,
        proto: String,
        method: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// Calls into a native module function.
    SystemCall {
        #[serde(default)]
        dst: Option<String>,
        module: String,
        function: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// Field is `op_kind`, not `op` — the latter names the enum's own
    /// internal tag discriminant and would be swallowed by it.
    BinOp {
        dst: String,
        op_kind: BinOpKind,
        lhs: String,
        rhs: String,
    },

    UnOp {
        dst: String,
        op: UnOpKind,
        src: String,
    },

    NewList {
        dst: String,
        #[serde(default)]
        items: Vec<String>,
    },
    NewMap { dst: String },
    NewObject { dst: String, proto: String },

    IndexGet {
        dst: String,
        target: String,
        index: String,
    },
    IndexSet {
        target: String,
        index: String,
        src: String,
    },

    /// Converts `src` to its canonical string form (the runtime's built-in
    /// `tostring`-equivalent fallback, used by string interpolation and
    /// explicit `to_string` calls alike).
    #[serde(rename = "call_builtin_tostring")]
    ToString { dst: String, src: String },

    /// Writes `src`'s display form to stdout, matching the original
    /// runtime's `print` builtin.
    CallBuiltinPrint { src: String },

    /// Pre-validates `rhs` before a division/modulo `BinOp`, raising
    /// `R1004 RUNTIME_DIVIDE_BY_ZERO` up front rather than inline at the
    /// arithmetic site. Emitted ahead of a `div`/`mod` `BinOp` by the
    /// front end when it cannot already prove `rhs != 0`.
    CheckDivZero { rhs: String },

    /// Pre-validates that negating `src` does not overflow (`i64::MIN`
    /// has no positive counterpart).
    CheckIntOverflowUnaryMinus { src: String },

    /// Pre-validates that `op` applied to `lhs`/`rhs` does not overflow
    /// `i64`.
    CheckIntOverflow {
        op: BinOpKind,
        lhs: String,
        rhs: String,
    },

    /// Pre-validates a shift amount is within `0..64`.
    CheckShiftRange { shift: String },

    /// Pre-validates `index` is in bounds for `target` (list, string or
    /// bytes) ahead of an `IndexGet`/`IndexSet`.
    CheckIndexBounds { target: String, index: String },

    /// Pre-validates that `view` has not been invalidated by a structural
    /// mutation of its backing source since it was created.
    CheckViewBounds { view: String },

    /// Pre-validates that `map` contains `key`, raising
    /// `R1003 RUNTIME_MISSING_KEY` ahead of an access that requires it.
    CheckMapHasKey { map: String, key: String },

    /// Builds a bounded view over `source` (a list or string) spanning
    /// `[offset, offset + len)`, snapshotting the source's current
    /// version for later validity checks.
    MakeView {
        dst: String,
        source: String,
        offset: String,
        len: String,
    },

    /// Ternary value selection without branching: `dst = cond ?
    /// when_true : when_false`.
    Select {
        dst: String,
        cond: String,
        when_true: String,
        when_false: String,
    },

    /// Begins iteration over `src` (list, map, string glyphs, bytes or a
    /// view), producing an opaque iterator value. `mode` distinguishes a
    /// `for x of src` from a `for x in src` loop; it only changes what a
    /// map iterator yields (values vs. keys) and is ignored for every other
    /// source kind.
    IterBegin {
        dst: String,
        src: String,
        #[serde(default)]
        mode: Option<IterModeKind>,
    },

    /// Branches to `target_true` if `iter` has another element, otherwise
    /// `target_false`. Also re-checks validity for a view-backed
    /// iterator, raising `R1012 RUNTIME_VIEW_INVALID` if the view's
    /// source was mutated since iteration began.
    BranchIterHasNext {
        iter: String,
        target_true: String,
        target_false: String,
    },

    /// Advances `iter` and materializes its next element into `dst`.
    IterNext { dst: String, iter: String },

    /// Dispatches a built-in method by name against `receiver`'s runtime
    /// tag (length/push/pop/substring/... — the fixed primitive-method
    /// table every value kind exposes), as distinct from `CallStatic`'s
    /// IR-declared prototype methods.
    CallMethodStatic {
        #[serde(default)]
        dst: Option<String>,
        receiver: String,
        method: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnOpKind {
    Neg,
    Not,
    BitNot,
}

/// `for x of src` (yields values) vs. `for x in src` (yields keys for
/// maps); spec §3/§4.5 "mode is 'of' (yields values) or 'in' (yields keys
/// for maps)".
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IterModeKind {
    Of,
    In,
}
