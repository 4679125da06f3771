//! End-to-end scenarios driving the full load → interpret pipeline through
//! the root facade, one per documented runtime behavior: a plain return,
//! list sort-then-fold, exception fields surfacing through `try`/`catch`,
//! view invalidation, an unhandled user exception, and a native module
//! call. Each program is hand-written IR JSON, the same shape an IR
//! loader test or a front end's golden-file test would exercise.

use protoscript::{run_loaded_module, NoNativeModules, RunOutcome};
use protoscript_ir::load_from_str;
use protoscript_modules::prelude::ModuleRegistry;

fn run(json: &str, function: &str) -> RunOutcome {
    let module = load_from_str(json).expect("ir should load");
    let mut dispatch = NoNativeModules;
    run_loaded_module(module, function, Vec::new(), &mut dispatch)
}

#[test]
fn hello_world_prints_and_returns_the_greeting() {
    let outcome = run(
        r#"{
            "functions": [{
                "name": "main",
                "blocks": [{
                    "label": "entry",
                    "instrs": [
                        {"op": "const", "dst": "msg", "literal": {"kind": "string", "value": "Hello"}},
                        {"op": "call_builtin_print", "src": "msg"},
                        {"op": "ret", "src": "msg"}
                    ]
                }]
            }]
        }"#,
        "main",
    );
    match outcome {
        RunOutcome::Returned(value) => assert_eq!(value.as_str(), Some("Hello")),
        RunOutcome::Unhandled(exc) => panic!("unexpected exception: {}", exc.borrow().message),
    }
}

#[test]
fn sort_then_fold_sums_to_forty_four() {
    let outcome = run(
        r#"{
            "functions": [{
                "name": "main",
                "blocks": [
                    {"label": "entry", "instrs": [
                        {"op": "const", "dst": "c0", "literal": {"kind": "int", "value": 3}},
                        {"op": "const", "dst": "c1", "literal": {"kind": "int", "value": 1}},
                        {"op": "const", "dst": "c2", "literal": {"kind": "int", "value": 4}},
                        {"op": "const", "dst": "c3", "literal": {"kind": "int", "value": 1}},
                        {"op": "const", "dst": "c4", "literal": {"kind": "int", "value": 5}},
                        {"op": "const", "dst": "c5", "literal": {"kind": "int", "value": 9}},
                        {"op": "const", "dst": "c6", "literal": {"kind": "int", "value": 2}},
                        {"op": "const", "dst": "c7", "literal": {"kind": "int", "value": 6}},
                        {"op": "const", "dst": "c8", "literal": {"kind": "int", "value": 5}},
                        {"op": "const", "dst": "c9", "literal": {"kind": "int", "value": 3}},
                        {"op": "const", "dst": "c10", "literal": {"kind": "int", "value": 5}},
                        {"op": "new_list", "dst": "list",
                         "items": ["c0","c1","c2","c3","c4","c5","c6","c7","c8","c9","c10"]},
                        {"op": "call_method_static", "receiver": "list", "method": "sort", "args": []},
                        {"op": "const", "dst": "acc", "literal": {"kind": "int", "value": 0}},
                        {"op": "iter_begin", "dst": "it", "src": "list"},
                        {"op": "jump", "target": "loop_head"}
                    ]},
                    {"label": "loop_head", "instrs": [
                        {"op": "branch_iter_has_next", "iter": "it",
                         "target_true": "loop_body", "target_false": "done"}
                    ]},
                    {"label": "loop_body", "instrs": [
                        {"op": "iter_next", "dst": "item", "iter": "it"},
                        {"op": "bin_op", "dst": "acc", "op_kind": "add", "lhs": "acc", "rhs": "item"},
                        {"op": "jump", "target": "loop_head"}
                    ]},
                    {"label": "done", "instrs": [
                        {"op": "call_builtin_tostring", "dst": "acc_str", "src": "acc"},
                        {"op": "call_builtin_print", "src": "acc_str"},
                        {"op": "ret", "src": "acc"}
                    ]}
                ]
            }]
        }"#,
        "main",
    );
    match outcome {
        RunOutcome::Returned(value) => assert_eq!(value.as_int(), Some(44)),
        RunOutcome::Unhandled(exc) => panic!("unexpected exception: {}", exc.borrow().message),
    }
}

#[test]
fn division_by_zero_is_caught_and_reports_code_and_category() {
    let outcome = run(
        r#"{
            "functions": [{
                "name": "main",
                "blocks": [
                    {"label": "entry", "instrs": [
                        {"op": "const", "dst": "a", "literal": {"kind": "int", "value": 10}},
                        {"op": "const", "dst": "b", "literal": {"kind": "int", "value": 0}},
                        {"op": "push_handler", "target": "handler"},
                        {"op": "check_div_zero", "rhs": "b"},
                        {"op": "bin_op", "dst": "r", "op_kind": "div", "lhs": "a", "rhs": "b"},
                        {"op": "pop_handler"},
                        {"op": "ret", "src": "r"}
                    ]},
                    {"label": "handler", "instrs": [
                        {"op": "get_exception", "dst": "exc"},
                        {"op": "member_get", "dst": "code", "obj": "exc", "name": "code"},
                        {"op": "const", "dst": "sep", "literal": {"kind": "string", "value": " "}},
                        {"op": "bin_op", "dst": "code_sep", "op_kind": "add", "lhs": "code", "rhs": "sep"},
                        {"op": "member_get", "dst": "cat", "obj": "exc", "name": "category"},
                        {"op": "bin_op", "dst": "line", "op_kind": "add", "lhs": "code_sep", "rhs": "cat"},
                        {"op": "call_builtin_print", "src": "line"},
                        {"op": "ret", "src": "line"}
                    ]}
                ]
            }]
        }"#,
        "main",
    );
    match outcome {
        RunOutcome::Returned(value) => {
            assert_eq!(value.as_str(), Some("R1004 RUNTIME_DIVIDE_BY_ZERO"))
        }
        RunOutcome::Unhandled(exc) => panic!("unexpected exception: {}", exc.borrow().message),
    }
}

#[test]
fn pushing_onto_a_list_invalidates_its_view() {
    let outcome = run(
        r#"{
            "functions": [{
                "name": "main",
                "blocks": [{
                    "label": "entry",
                    "instrs": [
                        {"op": "const", "dst": "c0", "literal": {"kind": "int", "value": 1}},
                        {"op": "const", "dst": "c1", "literal": {"kind": "int", "value": 2}},
                        {"op": "const", "dst": "c2", "literal": {"kind": "int", "value": 3}},
                        {"op": "new_list", "dst": "list", "items": ["c0", "c1", "c2"]},
                        {"op": "const", "dst": "zero", "literal": {"kind": "int", "value": 0}},
                        {"op": "const", "dst": "len3", "literal": {"kind": "int", "value": 3}},
                        {"op": "make_view", "dst": "view", "source": "list", "offset": "zero", "len": "len3"},
                        {"op": "const", "dst": "four", "literal": {"kind": "int", "value": 4}},
                        {"op": "call_method_static", "receiver": "list", "method": "push", "args": ["four"]},
                        {"op": "check_view_bounds", "view": "view"},
                        {"op": "index_get", "dst": "first", "target": "view", "index": "zero"},
                        {"op": "ret", "src": "first"}
                    ]
                }]
            }]
        }"#,
        "main",
    );
    match outcome {
        RunOutcome::Unhandled(exc) => {
            let exc = exc.borrow();
            assert_eq!(exc.code, Some("R1012"));
            assert_eq!(exc.category, Some("RUNTIME_VIEW_INVALID"));
        }
        RunOutcome::Returned(value) => panic!("expected a view-invalid exception, got {value:?}"),
    }
}

#[test]
fn an_unhandled_user_exception_carries_its_declared_type_and_location() {
    let outcome = run(
        r#"{
            "prototypes": [
                {"name": "MyErr", "parent": "Exception", "is_exception": true,
                 "fields": [{"name": "detail", "type": "int"}]}
            ],
            "functions": [{
                "name": "main",
                "blocks": [{
                    "label": "entry",
                    "instrs": [
                        {"op": "new_object", "dst": "e", "proto": "MyErr"},
                        {"op": "const", "dst": "msg", "literal": {"kind": "string", "value": "something broke"}},
                        {"op": "member_set", "obj": "e", "name": "message", "src": "msg"},
                        {"op": "const", "dst": "ln", "literal": {"kind": "int", "value": 42}},
                        {"op": "member_set", "obj": "e", "name": "line", "src": "ln"},
                        {"op": "const", "dst": "col", "literal": {"kind": "int", "value": 1}},
                        {"op": "member_set", "obj": "e", "name": "column", "src": "col"},
                        {"op": "throw", "src": "e"}
                    ]
                }]
            }]
        }"#,
        "main",
    );
    match outcome {
        RunOutcome::Unhandled(exc) => {
            let exc = exc.borrow();
            assert_eq!(exc.type_name.as_ref(), "MyErr");
            assert_eq!(exc.parent_name.as_deref(), Some("Exception"));
            assert!(!exc.is_runtime);
            assert_eq!(exc.message.as_ref(), "something broke");
            assert_eq!(exc.line, 42);
        }
        RunOutcome::Returned(value) => panic!("expected MyErr to escape uncaught, got {value:?}"),
    }
}

#[test]
fn map_in_mode_iterates_keys_while_of_mode_iterates_values() {
    let outcome = run(
        r#"{
            "functions": [{
                "name": "main",
                "blocks": [
                    {"label": "entry", "instrs": [
                        {"op": "new_map", "dst": "m"},
                        {"op": "const", "dst": "ka", "literal": {"kind": "string", "value": "a"}},
                        {"op": "const", "dst": "va", "literal": {"kind": "int", "value": 1}},
                        {"op": "index_set", "target": "m", "index": "ka", "src": "va"},
                        {"op": "const", "dst": "kb", "literal": {"kind": "string", "value": "b"}},
                        {"op": "const", "dst": "vb", "literal": {"kind": "int", "value": 2}},
                        {"op": "index_set", "target": "m", "index": "kb", "src": "vb"},
                        {"op": "const", "dst": "acc", "literal": {"kind": "string", "value": ""}},
                        {"op": "iter_begin", "dst": "it", "src": "m", "mode": "in"},
                        {"op": "jump", "target": "loop_head"}
                    ]},
                    {"label": "loop_head", "instrs": [
                        {"op": "branch_iter_has_next", "iter": "it",
                         "target_true": "loop_body", "target_false": "done"}
                    ]},
                    {"label": "loop_body", "instrs": [
                        {"op": "iter_next", "dst": "key", "iter": "it"},
                        {"op": "bin_op", "dst": "acc", "op_kind": "add", "lhs": "acc", "rhs": "key"},
                        {"op": "jump", "target": "loop_head"}
                    ]},
                    {"label": "done", "instrs": [
                        {"op": "ret", "src": "acc"}
                    ]}
                ]
            }]
        }"#,
        "main",
    );
    match outcome {
        RunOutcome::Returned(value) => assert_eq!(value.as_str(), Some("ab")),
        RunOutcome::Unhandled(exc) => panic!("unexpected exception: {}", exc.borrow().message),
    }
}

#[test]
fn sorting_a_list_of_objects_dispatches_to_compare_to() {
    let outcome = run(
        r#"{
            "prototypes": [
                {"name": "Box", "fields": [{"name": "n", "type": "int"}]}
            ],
            "functions": [
                {
                    "name": "Box::compareTo",
                    "params": [{"name": "self"}, {"name": "other"}],
                    "blocks": [{
                        "label": "entry",
                        "instrs": [
                            {"op": "member_get", "dst": "a", "obj": "self", "name": "n"},
                            {"op": "member_get", "dst": "b", "obj": "other", "name": "n"},
                            {"op": "bin_op", "dst": "r", "op_kind": "sub", "lhs": "a", "rhs": "b"},
                            {"op": "ret", "src": "r"}
                        ]
                    }]
                },
                {
                    "name": "main",
                    "blocks": [{
                        "label": "entry",
                        "instrs": [
                            {"op": "new_object", "dst": "x", "proto": "Box"},
                            {"op": "const", "dst": "three", "literal": {"kind": "int", "value": 3}},
                            {"op": "member_set", "obj": "x", "name": "n", "src": "three"},
                            {"op": "new_object", "dst": "y", "proto": "Box"},
                            {"op": "const", "dst": "one", "literal": {"kind": "int", "value": 1}},
                            {"op": "member_set", "obj": "y", "name": "n", "src": "one"},
                            {"op": "new_list", "dst": "list", "items": ["x", "y"]},
                            {"op": "call_method_static", "receiver": "list", "method": "sort", "args": []},
                            {"op": "index_get", "dst": "first", "target": "list", "index": "one"},
                            {"op": "member_get", "dst": "first_n", "obj": "first", "name": "n"},
                            {"op": "ret", "src": "first_n"}
                        ]
                    }]
                }
            ]
        }"#,
        "main",
    );
    match outcome {
        RunOutcome::Returned(value) => assert_eq!(value.as_int(), Some(3)),
        RunOutcome::Unhandled(exc) => panic!("unexpected exception: {}", exc.borrow().message),
    }
}

#[test]
fn math_sqrt_round_trips_through_to_string() {
    let module = load_from_str(
        r#"{
            "functions": [{
                "name": "main",
                "blocks": [{
                    "label": "entry",
                    "instrs": [
                        {"op": "const", "dst": "two", "literal": {"kind": "float", "value": 2.0}},
                        {"op": "system_call", "dst": "root", "module": "Math", "function": "sqrt", "args": ["two"]},
                        {"op": "call_method_static", "dst": "as_str", "receiver": "root", "method": "toString", "args": []},
                        {"op": "call_builtin_print", "src": "as_str"},
                        {"op": "ret", "src": "as_str"}
                    ]
                }]
            }]
        }"#,
    )
    .expect("ir should load");
    let mut registry = ModuleRegistry::with_default_config();
    let outcome = run_loaded_module(module, "main", Vec::new(), &mut registry);
    match outcome {
        RunOutcome::Returned(value) => {
            let text = value.as_str().expect("toString should return a String");
            assert!(
                text.starts_with("1.4142135623730951"),
                "expected sqrt(2) prefix, got {text}"
            );
        }
        RunOutcome::Unhandled(exc) => panic!("unexpected exception: {}", exc.borrow().message),
    }
}
