//! Loads a [`Module`] from JSON text, performing the structural validation
//! the runtime expects an IR producer to already have done (every block
//! label referenced by a jump/branch must exist, every prototype's declared
//! parent must exist), catching the otherwise-silent cost of a malformed
//! module at load time instead of at the first instruction that trips over
//! it. Grounded on the original runtime's `ps_ir_load_json`.

use crate::instr::Instr;
use crate::model::Module;
use protoscript_core::diagnostics::Diagnostic;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid ir json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(Diagnostic),
}

pub fn load_from_str(json: &str) -> Result<Arc<Module>, LoadError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    load_from_value(value)
}

pub fn load_from_value(value: serde_json::Value) -> Result<Arc<Module>, LoadError> {
    let module_value = unwrap_envelope(value);
    let module: Module = serde_json::from_value(module_value)?;
    validate(&module)?;
    Ok(Arc::new(module))
}

/// Accepts either a bare module object or the full wire envelope
/// (`{"ir_version": ..., "format": "ProtoScriptIR", "module": {...}}`)
/// described in spec §6, unwrapping the latter down to the module object
/// the rest of the loader expects. The envelope's `ir_version`/`format`
/// fields are not currently checked against anything — there is only one
/// IR version in circulation — but the shape is accepted so producers
/// that emit the full envelope load unchanged.
fn unwrap_envelope(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut obj) if obj.contains_key("module") => {
            obj.remove("module").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

fn validate(module: &Module) -> Result<(), LoadError> {
    for proto in &module.protos {
        if let Some(parent) = &proto.parent {
            if parent != "Exception" && module.find_proto(parent).is_none() {
                return Err(LoadError::Invalid(Diagnostic::error(format!(
                    "prototype {} declares unknown parent {}",
                    proto.name, parent
                ))));
            }
        }
    }

    for function in &module.functions {
        let labels: rustc_hash::FxHashSet<&str> =
            function.blocks.iter().map(|b| b.label.as_str()).collect();
        for block in &function.blocks {
            for node in &block.instrs {
                let targets = jump_targets(&node.instr);
                for target in targets {
                    if !labels.contains(target) {
                        return Err(LoadError::Invalid(Diagnostic::error(format!(
                            "function {} jumps to undeclared block {}",
                            function.name, target
                        ))));
                    }
                }
            }
        }
    }
    Ok(())
}

fn jump_targets(instr: &Instr) -> Vec<&str> {
    match instr {
        Instr::Jump { target } => vec![target.as_str()],
        Instr::BranchIf {
            target_true,
            target_false,
            ..
        } => vec![target_true.as_str(), target_false.as_str()],
        Instr::PushHandler { target } => vec![target.as_str()],
        Instr::BranchIterHasNext {
            target_true,
            target_false,
            ..
        } => vec![target_true.as_str(), target_false.as_str()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD: &str = r#"{
        "functions": [{
            "name": "main",
            "blocks": [{
                "label": "entry",
                "instrs": [
                    {"op": "const", "dst": "t0", "literal": {"kind": "string", "value": "hello" }},
                    {"op": "ret", "src": "t0"}
                ]
            }]
        }]
    }"#;

    #[test]
    fn loads_well_formed_module() {
        let module = load_from_str(HELLO_WORLD).unwrap();
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[0].name, "main");
    }

    #[test]
    fn rejects_jump_to_missing_block() {
        let bad = r#"{
            "functions": [{
                "name": "main",
                "blocks": [{
                    "label": "entry",
                    "instrs": [{"op": "jump", "target": "nowhere"}]
                }]
            }]
        }"#;
        assert!(matches!(
            load_from_str(bad),
            Err(LoadError::Invalid(_))
        ));
    }

    #[test]
    fn loads_wire_envelope_wrapped_module() {
        let wrapped = r#"{
            "ir_version": 1,
            "format": "ProtoScriptIR",
            "module": {
                "functions": [{
                    "name": "main",
                    "blocks": [{
                        "label": "entry",
                        "instrs": [
                            {"op": "const", "dst": "t0", "literal": {"kind": "int", "value": 1}},
                            {"op": "ret", "src": "t0"}
                        ]
                    }]
                }]
            }
        }"#;
        let module = load_from_str(wrapped).unwrap();
        assert_eq!(module.functions[0].name, "main");
    }

    #[test]
    fn rejects_proto_with_unknown_parent() {
        let bad = r#"{
            "functions": [],
            "prototypes": [{"name": "Foo", "parent": "Bar"}]
        }"#;
        assert!(matches!(load_from_str(bad), Err(LoadError::Invalid(_))));
    }
}
