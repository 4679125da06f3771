//! Plain data types mirroring the JSON IR schema. These are intentionally
//! dumb containers — all interpretation lives in `protoscript-vm`.

use crate::instr::Instr;
use serde::Deserialize;

/// A literal constant embedded directly in a `const` instruction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Literal {
    Void,
    Bool { value: bool },
    Int { value: i64 },
    Float { value: f64 },
    Byte { value: u8 },
    Glyph { value: char },
    String { value: String },
    /// Resolves against the current module's group table at `const`-time
    /// (spec §4.5 Literals: `"group"` resolves against current module).
    Group { group: String, member: String },
    /// Resolves to the stdin/stdout/stderr singleton on the active
    /// `Context` (spec §4.5 Literals: `"file"` resolves stdin/stdout/
    /// stderr singleton).
    File { stream: StdStream },
    /// Resolves to the `Context`'s cached EOF sentinel.
    Eof,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl Literal {
    /// Converts every literal kind that needs no module/context lookup.
    /// `Group`, `File` and `Eof` are resolved by the interpreter instead,
    /// since they need the current IR module or `Context` respectively;
    /// calling this on one of them is a loader/interpreter mismatch.
    pub fn to_value(&self) -> protoscript_core::value::Value {
        use protoscript_core::value::Value;
        match self {
            Literal::Void => Value::Void,
            Literal::Bool { value } => Value::Bool(*value),
            Literal::Int { value } => Value::Int(*value),
            Literal::Float { value } => Value::Float(*value),
            Literal::Byte { value } => Value::Byte(*value),
            Literal::Glyph { value } => Value::Glyph(*value),
            Literal::String { value } => {
                Value::String(std::rc::Rc::new(protoscript_core::value::PsString::new(
                    value.clone(),
                )))
            }
            Literal::Group { .. } | Literal::File { .. } | Literal::Eof => unreachable!(
                "group/file/eof literals are resolved by the interpreter, not Literal::to_value"
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub variadic: bool,
}

/// One instruction plus the source location it was compiled from, used to
/// stamp `file`/`line`/`column` onto an exception raised while executing
/// it (spec §4.4: an exception records the location active when it was
/// thrown). All three are optional since not every producer emits full
/// debug info; when absent the frame simply keeps whatever location was
/// last recorded.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrNode {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(flatten)]
    pub instr: Instr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub label: String,
    pub instrs: Vec<InstrNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub locals: Vec<Param>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtoField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtoMethod {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(rename = "returnType", default)]
    pub return_type: Option<String>,
}

/// An object or exception prototype declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct Proto {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub fields: Vec<ProtoField>,
    #[serde(default)]
    pub methods: Vec<ProtoMethod>,
    #[serde(default)]
    pub is_sealed: bool,
    /// Set for prototypes declared as exception types, distinguishing the
    /// exception field-slot convention from a plain object prototype.
    #[serde(default)]
    pub is_exception: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupMember {
    pub name: String,
    #[serde(default)]
    pub value: Option<Literal>,
}

/// An enum-like declared constant set.
#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(rename = "baseType", default)]
    pub base_type: Option<String>,
    pub members: Vec<GroupMember>,
}

/// A fully loaded IR module. Every field is public and immutable once
/// constructed; `protoscript-vm` holds this behind an `Arc` so prototype and
/// group lookups hand out addresses that stay stable for the lifetime of a
/// `Context`, per the runtime's IR contract.
#[derive(Debug, Clone, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub module_name: Option<String>,
    pub functions: Vec<Function>,
    #[serde(rename = "prototypes", default)]
    pub protos: Vec<Proto>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Module {
    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_proto(&self, name: &str) -> Option<&Proto> {
        self.protos.iter().find(|p| p.name == name)
    }

    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }
}

impl Proto {
    /// Walks the declared parent chain to decide whether `self` is `ancestor`
    /// or a descendant of it, bounded to avoid looping on a malformed (but
    /// already-validated-elsewhere) cyclic chain. Grounded on the original
    /// runtime's `proto_is_subtype_meta`, which caps the walk at 64 levels.
    pub fn is_subtype_of(&self, ancestor: &str, module: &Module) -> bool {
        const MAX_DEPTH: u32 = 64;
        let mut current = self.name.as_str();
        for _ in 0..MAX_DEPTH {
            if current == ancestor {
                return true;
            }
            match module.find_proto(current).and_then(|p| p.parent.as_deref()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

impl Function {
    pub fn find_block(&self, label: &str) -> Option<(usize, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.label == label)
    }
}
