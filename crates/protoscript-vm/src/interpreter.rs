//! The instruction dispatch loop.

use crate::dispatch::NativeCallDispatch;
use crate::exception_support::{exception_get_field, exception_matches, exception_set_field};
use crate::format::to_display_string;
use crate::frame::{Frame, TryFrame};
use crate::ops::{eval_bin_op, eval_un_op};
use crate::unwind::Unwind;
use protoscript_core::context::Context;
use protoscript_core::error::RuntimeError;
use protoscript_core::value::{
    GroupScalar, PsException, PsGroup, PsIter, PsList, PsMap, PsObject, PsString, PsView, Value,
};
use protoscript_ir::instr::{BinOpKind, Instr};
use protoscript_ir::model::{Function, Module, ProtoField, StdStream};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// What a single instruction did.
enum Step {
    Continue,
    Jump(String),
    Return(Value),
}

/// Either an already-built exception value (a `throw`) or a raw runtime
/// failure that still needs turning into one (everything else).
enum Raise {
    Value(Rc<RefCell<PsException>>),
    Error(RuntimeError),
}

impl From<RuntimeError> for Raise {
    fn from(err: RuntimeError) -> Self {
        Raise::Error(err)
    }
}

/// Executes functions from one loaded [`Module`].
pub struct Interpreter {
    module: Arc<Module>,
}

impl Interpreter {
    pub fn new(module: Arc<Module>) -> Self {
        Interpreter { module }
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Invokes `function_name` with `args`, returning either its result or
    /// the exception that escaped every try-handler in the call.
    pub fn call_function(
        &self,
        function_name: &str,
        args: Vec<Value>,
        ctx: &mut Context,
        dispatch: &mut dyn NativeCallDispatch,
    ) -> Result<Value, Unwind> {
        let function = self.module.find_function(function_name).ok_or_else(|| {
            Unwind::Exception(Rc::new(RefCell::new(PsException::from_runtime_error(
                format!("no such function: {function_name}"),
                None,
            ))))
        })?;
        self.exec_function(function, args, ctx, dispatch)
    }

    fn exec_function(
        &self,
        function: &Function,
        args: Vec<Value>,
        ctx: &mut Context,
        dispatch: &mut dyn NativeCallDispatch,
    ) -> Result<Value, Unwind> {
        let mut frame = Frame::new(self.module.module_name.clone().unwrap_or_default());
        self.bind_params(function, args, &mut frame);

        let span = tracing::info_span!("call", function = %function.name);
        let _entered = span.enter();

        let mut block_idx = match function.blocks.first() {
            Some(_) => 0usize,
            None => return Ok(Value::Void),
        };
        let mut ip = 0usize;

        loop {
            let block = &function.blocks[block_idx];
            if ip >= block.instrs.len() {
                block_idx += 1;
                ip = 0;
                if block_idx >= function.blocks.len() {
                    return Ok(Value::Void);
                }
                continue;
            }
            let node = &block.instrs[ip];
            if let Some(file) = &node.file {
                frame.file = file.clone();
            }
            if let Some(line) = node.line {
                frame.line = line;
            }
            if let Some(column) = node.column {
                frame.column = column;
            }
            if ctx.trace_ir {
                tracing::event!(tracing::Level::TRACE, op = ?node.instr, "instr");
            }

            match self.step(&node.instr, &mut frame, ctx, dispatch) {
                Ok(Step::Continue) => ip += 1,
                Ok(Step::Jump(label)) => {
                    let (idx, _) = function.find_block(&label).ok_or_else(|| {
                        Unwind::Exception(Rc::new(RefCell::new(
                            PsException::from_runtime_error(
                                format!("jump to undeclared block {label}"),
                                None,
                            ),
                        )))
                    })?;
                    block_idx = idx;
                    ip = 0;
                }
                Ok(Step::Return(value)) => return Ok(value),
                Err(raise) => {
                    let exc = self.materialize(raise, ctx, &frame);
                    if let Some(TryFrame { handler_block }) = frame.tries.pop() {
                        frame.current_exception = Some(exc);
                        ctx.clear_error();
                        match function.find_block(&handler_block) {
                            Some((idx, _)) => {
                                block_idx = idx;
                                ip = 0;
                            }
                            None => return Err(Unwind::Exception(frame.current_exception.take().unwrap())),
                        }
                    } else {
                        return Err(Unwind::Exception(exc));
                    }
                }
            }
        }
    }

    fn bind_params(&self, function: &Function, args: Vec<Value>, frame: &mut Frame) {
        let variadic_at = function.params.iter().position(|p| p.variadic);
        let fixed_count = variadic_at.unwrap_or(function.params.len());
        let mut args = args.into_iter();
        for param in function.params.iter().take(fixed_count) {
            frame.set(param.name.clone(), args.next().unwrap_or(Value::Void));
        }
        if let Some(pos) = variadic_at {
            let rest: Vec<Value> = args.collect();
            let view = protoscript_core::value::PsView::over_borrowed(Rc::from(
                rest.into_boxed_slice(),
            ));
            frame.set(
                function.params[pos].name.clone(),
                Value::View(Rc::new(view)),
            );
        }
        for local in &function.locals {
            frame.set(local.name.clone(), default_value_for_type(local.type_name.as_deref()));
        }
    }

    fn materialize(
        &self,
        raise: Raise,
        ctx: &mut Context,
        frame: &Frame,
    ) -> Rc<RefCell<PsException>> {
        let exc = match raise {
            Raise::Value(exc) => exc,
            Raise::Error(err) => {
                let exception = match &err {
                    RuntimeError::TypedModuleError {
                        type_name, message, ..
                    } => PsException::from_typed_module_error(type_name.clone(), message.clone()),
                    other => {
                        let message = other.to_string();
                        if let Some(typed) = RuntimeError::parse_typed_module_error(&message) {
                            if let RuntimeError::TypedModuleError {
                                type_name, message, ..
                            } = typed
                            {
                                PsException::from_typed_module_error(type_name, message)
                            } else {
                                unreachable!()
                            }
                        } else {
                            PsException::from_runtime_error(message, other.classify())
                        }
                    }
                };
                Rc::new(RefCell::new(exception))
            }
        };
        ctx.clear_error();
        exc.borrow_mut().set_location(frame.file.clone(), frame.line, frame.column);
        exc
    }

    fn step(
        &self,
        instr: &Instr,
        frame: &mut Frame,
        ctx: &mut Context,
        dispatch: &mut dyn NativeCallDispatch,
    ) -> Result<Step, Raise> {
        match instr {
            Instr::Nop => Ok(Step::Continue),

            Instr::VarDecl { name, type_name } => {
                frame.set(name.clone(), default_value_for_type(type_name.as_deref()));
                Ok(Step::Continue)
            }

            Instr::Const { dst, literal } => {
                let value = match literal {
                    protoscript_ir::model::Literal::Group { group, member } => {
                        let group_decl = self.module.find_group(group).ok_or_else(|| {
                            RuntimeError::Internal(format!("no such group: {group}"))
                        })?;
                        let decl_member =
                            group_decl.members.iter().find(|m| &m.name == member).ok_or_else(
                                || {
                                    RuntimeError::Internal(format!(
                                        "group {group} has no member {member}"
                                    ))
                                },
                            )?;
                        let scalar = match decl_member.value.as_ref().map(|l| l.to_value()) {
                            Some(Value::Bool(b)) => GroupScalar::Bool(b),
                            Some(Value::Int(i)) => GroupScalar::Int(i),
                            Some(Value::Float(f)) => GroupScalar::Float(f),
                            Some(Value::Byte(b)) => GroupScalar::Byte(b),
                            Some(Value::Glyph(c)) => GroupScalar::Glyph(c),
                            Some(Value::String(s)) => GroupScalar::String(s.as_str().into()),
                            None => GroupScalar::Int(0),
                            _ => {
                                return Err(RuntimeError::Internal(format!(
                                    "group member {group}::{member} has a non-scalar value"
                                ))
                                .into())
                            }
                        };
                        Value::Group(Rc::new(PsGroup::new(group.clone(), member.clone(), scalar)))
                    }
                    protoscript_ir::model::Literal::File { stream } => match stream {
                        StdStream::Stdin => ctx.stdin_value(),
                        StdStream::Stdout => ctx.stdout_value(),
                        StdStream::Stderr => ctx.stderr_value(),
                    },
                    protoscript_ir::model::Literal::Eof => ctx.eof_sentinel(),
                    other => other.to_value(),
                };
                frame.set(dst.clone(), value);
                Ok(Step::Continue)
            }

            Instr::PushHandler { target } => {
                frame.tries.push(TryFrame {
                    handler_block: target.clone(),
                });
                Ok(Step::Continue)
            }

            Instr::PopHandler => {
                frame.tries.pop();
                Ok(Step::Continue)
            }

            Instr::GetException { dst } => {
                let exc = match frame.current_exception.clone() {
                    Some(exc) => exc,
                    None => {
                        let synthesized = self.materialize(
                            Raise::Error(
                                ctx.take_last_error()
                                    .unwrap_or(RuntimeError::Internal("no active exception".into())),
                            ),
                            ctx,
                            frame,
                        );
                        frame.current_exception = Some(synthesized.clone());
                        synthesized
                    }
                };
                frame.set(dst.clone(), Value::Exception(exc));
                Ok(Step::Continue)
            }

            Instr::Rethrow => match frame.current_exception.clone() {
                Some(exc) => Err(Raise::Value(exc)),
                None => Err(Raise::Error(RuntimeError::Internal(
                    "rethrow with no active exception".into(),
                ))),
            },

            Instr::ExceptionIs {
                dst,
                src,
                type_name,
            } => {
                let value = self.get(frame, src)?;
                let matched = match value {
                    Value::Exception(exc) => {
                        exception_matches(&self.module, &exc.borrow(), type_name)
                    }
                    _ => false,
                };
                frame.set(dst.clone(), Value::Bool(matched));
                Ok(Step::Continue)
            }

            Instr::LoadVar { dst, name } => {
                let value = self.get(frame, name)?;
                frame.set(dst.clone(), value);
                Ok(Step::Continue)
            }

            Instr::StoreVar { name, src } => {
                let value = self.get(frame, src)?;
                frame.set(name.clone(), value);
                Ok(Step::Continue)
            }

            Instr::Copy { dst, src } => {
                let value = self.get(frame, src)?;
                frame.set(dst.clone(), value);
                Ok(Step::Continue)
            }

            Instr::MemberGet { dst, obj, name } => {
                let value = self.get(frame, obj)?;
                let result = match &value {
                    Value::Exception(exc) => exception_get_field(&exc.borrow(), name)?,
                    Value::Object(obj) => obj.borrow().get(name),
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "{} has no members",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                frame.set(dst.clone(), result);
                Ok(Step::Continue)
            }

            Instr::MemberSet { obj, name, src } => {
                let target = self.get(frame, obj)?;
                let value = self.get(frame, src)?;
                match &target {
                    Value::Exception(exc) => exception_set_field(&mut exc.borrow_mut(), name, value)?,
                    Value::Object(obj) => obj.borrow_mut().set(name, value)?,
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "{} has no members",
                            other.type_name()
                        ))
                        .into())
                    }
                }
                Ok(Step::Continue)
            }

            Instr::Jump { target } => Ok(Step::Jump(target.clone())),

            Instr::BranchIf {
                cond,
                target_true,
                target_false,
            } => {
                let cond = self.get(frame, cond)?;
                Ok(Step::Jump(if cond.is_truthy() {
                    target_true.clone()
                } else {
                    target_false.clone()
                }))
            }

            Instr::Ret { src } => Ok(Step::Return(self.get(frame, src)?)),
            Instr::RetVoid => Ok(Step::Return(Value::Void)),

            Instr::Throw { src } => {
                let value = self.get(frame, src)?;
                match value {
                    Value::Exception(exc) => Err(Raise::Value(exc)),
                    other => Err(RuntimeError::TypeError(format!(
                        "cannot throw a {}",
                        other.type_name()
                    ))
                    .into()),
                }
            }

            Instr::Call { dst, callee, args } => {
                let arg_values = self.collect_args(frame, args)?;
                let function = self.module.find_function(callee).ok_or_else(|| {
                    Raise::Error(RuntimeError::Internal(format!("no such function: {callee}")))
                })?;
                let mut inner = Frame::new(frame.file.clone());
                self.bind_params(function, arg_values, &mut inner);
                let result = self.run_nested(function, inner, ctx, dispatch)?;
                if let Some(dst) = dst {
                    frame.set(dst.clone(), result);
                }
                Ok(Step::Continue)
            }

            Instr::CallStatic {
                dst,
                proto,
                method,
                args,
            } => {
                let arg_values = self.collect_args(frame, args)?;
                let qualified = format!("{proto}::{method}");
                let function = self.module.find_function(&qualified).ok_or_else(|| {
                    Raise::Error(RuntimeError::Internal(format!(
                        "no such method: {qualified}"
                    )))
                })?;
                let mut inner = Frame::new(frame.file.clone());
                self.bind_params(function, arg_values, &mut inner);
                let result = self.run_nested(function, inner, ctx, dispatch)?;
                if let Some(dst) = dst {
                    frame.set(dst.clone(), result);
                }
                Ok(Step::Continue)
            }

            Instr::SystemCall {
                dst,
                module,
                function,
                args,
            } => {
                let arg_values = self.collect_args(frame, args)?;
                let result = dispatch.call(module, function, &arg_values, ctx)?;
                if let Some(dst) = dst {
                    frame.set(dst.clone(), result);
                }
                Ok(Step::Continue)
            }

            Instr::BinOp { dst, op, lhs, rhs } => {
                let lhs = self.get(frame, lhs)?;
                let rhs = self.get(frame, rhs)?;
                let result = eval_bin_op(*op, &lhs, &rhs)?;
                frame.set(dst.clone(), result);
                Ok(Step::Continue)
            }

            Instr::UnOp { dst, op, src } => {
                let value = self.get(frame, src)?;
                let result = eval_un_op(*op, &value)?;
                frame.set(dst.clone(), result);
                Ok(Step::Continue)
            }

            Instr::NewList { dst, items } => {
                let values = self.collect_args(frame, items)?;
                frame.set(
                    dst.clone(),
                    Value::List(Rc::new(RefCell::new(PsList::from_vec(values)))),
                );
                Ok(Step::Continue)
            }

            Instr::NewMap { dst } => {
                frame.set(dst.clone(), Value::Map(Rc::new(RefCell::new(PsMap::new()))));
                Ok(Step::Continue)
            }

            Instr::NewObject { dst, proto } => {
                let proto_def = self.module.find_proto(proto);
                let is_exception_type = proto_def
                    .map(|p| {
                        p.is_exception
                            || p.name == "Exception"
                            || p.is_subtype_of("Exception", &self.module)
                    })
                    .unwrap_or(false);
                let value = if is_exception_type {
                    let mut exc = PsException::new(proto.as_str(), "");
                    exc.parent_name = proto_def
                        .and_then(|p| p.parent.clone())
                        .map(Box::from)
                        .or_else(|| Some(Box::from("Exception")));
                    for field in self.collect_fields(proto) {
                        exc.fields.declare(field.name.as_str());
                    }
                    Value::Exception(Rc::new(RefCell::new(exc)))
                } else {
                    let mut object = PsObject::new(proto.as_str());
                    for field in self.collect_fields(proto) {
                        object.declare(field.name.as_str());
                    }
                    Value::Object(Rc::new(RefCell::new(object)))
                };
                frame.set(dst.clone(), value);
                Ok(Step::Continue)
            }

            Instr::IndexGet { dst, target, index } => {
                let target = self.get(frame, target)?;
                let index = self.get(frame, index)?;
                let result = index_get(&target, &index)?;
                frame.set(dst.clone(), result);
                Ok(Step::Continue)
            }

            Instr::IndexSet { target, index, src } => {
                let target = self.get(frame, target)?;
                let index = self.get(frame, index)?;
                let value = self.get(frame, src)?;
                index_set(&target, &index, value)?;
                Ok(Step::Continue)
            }

            Instr::ToString { dst, src } => {
                let value = self.get(frame, src)?;
                frame.set(
                    dst.clone(),
                    Value::String(Rc::new(PsString::new(to_display_string(&value)))),
                );
                Ok(Step::Continue)
            }

            Instr::CallBuiltinPrint { src } => {
                let value = self.get(frame, src)?;
                let mut stdout = ctx.stdout_value();
                if let Value::File(file) = &mut stdout {
                    let mut text = to_display_string(&value);
                    text.push('\n');
                    file.borrow_mut()
                        .write_all(text.as_bytes())
                        .map_err(RuntimeError::from)?;
                }
                Ok(Step::Continue)
            }

            Instr::CheckDivZero { rhs } => {
                let rhs = self.get(frame, rhs)?;
                let is_zero = matches!(rhs, Value::Int(0)) || matches!(rhs, Value::Float(f) if f == 0.0);
                if is_zero {
                    Err(RuntimeError::DivideByZero.into())
                } else {
                    Ok(Step::Continue)
                }
            }

            Instr::CheckIntOverflowUnaryMinus { src } => {
                let value = self.get(frame, src)?;
                match value {
                    Value::Int(i64::MIN) => Err(RuntimeError::IntOverflow.into()),
                    _ => Ok(Step::Continue),
                }
            }

            Instr::CheckIntOverflow { op, lhs, rhs } => {
                let lhs = self.get(frame, lhs)?;
                let rhs = self.get(frame, rhs)?;
                match (&lhs, &rhs) {
                    (Value::Int(a), Value::Int(b)) => {
                        let overflowed = match op {
                            BinOpKind::Add => a.checked_add(*b).is_none(),
                            BinOpKind::Sub => a.checked_sub(*b).is_none(),
                            BinOpKind::Mul => a.checked_mul(*b).is_none(),
                            _ => false,
                        };
                        if overflowed {
                            Err(RuntimeError::IntOverflow.into())
                        } else {
                            Ok(Step::Continue)
                        }
                    }
                    _ => Ok(Step::Continue),
                }
            }

            Instr::CheckShiftRange { shift } => {
                let shift = self.get(frame, shift)?;
                match shift.as_int() {
                    Some(n) if !(0..64).contains(&n) => Err(RuntimeError::ShiftRange.into()),
                    _ => Ok(Step::Continue),
                }
            }

            Instr::CheckIndexBounds { target, index } => {
                let target = self.get(frame, target)?;
                let index = self.get(frame, index)?;
                let idx = index
                    .as_int()
                    .ok_or_else(|| RuntimeError::TypeError("index must be an Int".into()))?;
                let len = match &target {
                    Value::List(list) => list.borrow().len(),
                    Value::String(s) => s.glyph_len(),
                    Value::Bytes(b) => b.len(),
                    Value::View(view) => {
                        if !view.is_valid() {
                            return Err(RuntimeError::ViewInvalid.into());
                        }
                        view.len
                    }
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "{} is not indexable",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                let real = if idx < 0 { idx + len as i64 } else { idx };
                if real < 0 || real as usize >= len {
                    Err(RuntimeError::IndexOutOfBounds.into())
                } else {
                    Ok(Step::Continue)
                }
            }

            Instr::CheckViewBounds { view } => {
                let value = self.get(frame, view)?;
                match value {
                    Value::View(view) if !view.is_valid() => Err(RuntimeError::ViewInvalid.into()),
                    Value::View(_) => Ok(Step::Continue),
                    other => Err(RuntimeError::TypeError(format!(
                        "{} is not a view",
                        other.type_name()
                    ))
                    .into()),
                }
            }

            Instr::CheckMapHasKey { map, key } => {
                let map = self.get(frame, map)?;
                let key = self.get(frame, key)?;
                match map {
                    Value::Map(map) if map.borrow().contains_key(&key) => Ok(Step::Continue),
                    Value::Map(_) => Err(RuntimeError::MissingKey.into()),
                    other => Err(RuntimeError::TypeError(format!(
                        "{} is not a map",
                        other.type_name()
                    ))
                    .into()),
                }
            }

            Instr::MakeView {
                dst,
                source,
                offset,
                len,
            } => {
                let source = self.get(frame, source)?;
                let offset = self
                    .get(frame, offset)?
                    .as_int()
                    .ok_or_else(|| RuntimeError::TypeError("view offset must be an Int".into()))?;
                let len = self
                    .get(frame, len)?
                    .as_int()
                    .ok_or_else(|| RuntimeError::TypeError("view length must be an Int".into()))?;
                if offset < 0 || len < 0 {
                    return Err(RuntimeError::ViewInvalid.into());
                }
                let (offset, len) = (offset as usize, len as usize);
                let view = match source {
                    Value::List(list) => {
                        if offset + len > list.borrow().len() {
                            return Err(RuntimeError::ViewInvalid.into());
                        }
                        PsView::over_list(list, offset, len, false)
                    }
                    Value::String(s) => {
                        if offset + len > s.glyph_len() {
                            return Err(RuntimeError::ViewInvalid.into());
                        }
                        PsView::over_string(s, offset, len)
                    }
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "cannot make a view over {}",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                frame.set(dst.clone(), Value::View(Rc::new(view)));
                Ok(Step::Continue)
            }

            Instr::Select {
                dst,
                cond,
                when_true,
                when_false,
            } => {
                let cond = self.get(frame, cond)?;
                let chosen = if cond.is_truthy() { when_true } else { when_false };
                let value = self.get(frame, chosen)?;
                frame.set(dst.clone(), value);
                Ok(Step::Continue)
            }

            Instr::IterBegin { dst, src, mode } => {
                let value = self.get(frame, src)?;
                let map_mode = match mode {
                    Some(protoscript_ir::instr::IterModeKind::In) => {
                        protoscript_core::value::MapIterMode::In
                    }
                    _ => protoscript_core::value::MapIterMode::Of,
                };
                let iter_mode = match value {
                    Value::List(list) => protoscript_core::value::IterMode::List(list),
                    Value::Map(map) => protoscript_core::value::IterMode::Map(map, map_mode),
                    Value::String(s) => protoscript_core::value::IterMode::StringGlyphs(s),
                    Value::Bytes(b) => protoscript_core::value::IterMode::Bytes(b),
                    Value::View(view) => protoscript_core::value::IterMode::View(view),
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "{} is not iterable",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                frame.set(
                    dst.clone(),
                    Value::Iter(Rc::new(RefCell::new(PsIter::new(iter_mode)))),
                );
                Ok(Step::Continue)
            }

            Instr::BranchIterHasNext {
                iter,
                target_true,
                target_false,
            } => {
                let value = self.get(frame, iter)?;
                let iter = match value {
                    Value::Iter(iter) => iter,
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "{} is not an iterator",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                let has_next = iter.borrow().has_next()?;
                Ok(Step::Jump(if has_next {
                    target_true.clone()
                } else {
                    target_false.clone()
                }))
            }

            Instr::IterNext { dst, iter } => {
                let value = self.get(frame, iter)?;
                let iter = match value {
                    Value::Iter(iter) => iter,
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "{} is not an iterator",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                let next = iter
                    .borrow_mut()
                    .next()?
                    .ok_or_else(|| RuntimeError::Internal("iter_next past end".into()))?;
                frame.set(dst.clone(), next);
                Ok(Step::Continue)
            }

            Instr::CallMethodStatic {
                dst,
                receiver,
                method,
                args,
            } => {
                let receiver_value = self.get(frame, receiver)?;
                let arg_values = self.collect_args(frame, args)?;
                let result = if method == "sort" {
                    if let Value::List(list) = &receiver_value {
                        if list.borrow().as_slice().iter().any(|v| matches!(v, Value::Object(_))) {
                            self.sort_objects_by_compare_to(list, frame.file.clone(), ctx, dispatch)?;
                            Value::Void
                        } else {
                            call_builtin_method(&receiver_value, method, &arg_values, ctx)?
                        }
                    } else {
                        call_builtin_method(&receiver_value, method, &arg_values, ctx)?
                    }
                } else {
                    call_builtin_method(&receiver_value, method, &arg_values, ctx)?
                };
                if let Some(dst) = dst {
                    frame.set(dst.clone(), result);
                }
                Ok(Step::Continue)
            }
        }
    }

    fn run_nested(
        &self,
        function: &Function,
        frame: Frame,
        ctx: &mut Context,
        dispatch: &mut dyn NativeCallDispatch,
    ) -> Result<Value, Raise> {
        self.exec_with_frame(function, frame, ctx, dispatch)
            .map_err(|unwind| match unwind {
                Unwind::Exception(exc) => Raise::Value(exc),
            })
    }

    /// Entry point shared by `exec_function` and nested calls: runs a
    /// function body given an already-bound frame.
    fn exec_with_frame(
        &self,
        function: &Function,
        mut frame: Frame,
        ctx: &mut Context,
        dispatch: &mut dyn NativeCallDispatch,
    ) -> Result<Value, Unwind> {
        let mut block_idx = match function.blocks.first() {
            Some(_) => 0usize,
            None => return Ok(Value::Void),
        };
        let mut ip = 0usize;
        loop {
            let block = &function.blocks[block_idx];
            if ip >= block.instrs.len() {
                block_idx += 1;
                ip = 0;
                if block_idx >= function.blocks.len() {
                    return Ok(Value::Void);
                }
                continue;
            }
            let node = &block.instrs[ip];
            if let Some(file) = &node.file {
                frame.file = file.clone();
            }
            if let Some(line) = node.line {
                frame.line = line;
            }
            if let Some(column) = node.column {
                frame.column = column;
            }
            match self.step(&node.instr, &mut frame, ctx, dispatch) {
                Ok(Step::Continue) => ip += 1,
                Ok(Step::Jump(label)) => {
                    let (idx, _) = function
                        .find_block(&label)
                        .expect("loader validated jump targets");
                    block_idx = idx;
                    ip = 0;
                }
                Ok(Step::Return(value)) => return Ok(value),
                Err(raise) => {
                    let exc = self.materialize(raise, ctx, &frame);
                    if let Some(TryFrame { handler_block }) = frame.tries.pop() {
                        frame.current_exception = Some(exc);
                        ctx.clear_error();
                        let (idx, _) = function
                            .find_block(&handler_block)
                            .expect("loader validated jump targets");
                        block_idx = idx;
                        ip = 0;
                    } else {
                        return Err(Unwind::Exception(exc));
                    }
                }
            }
        }
    }

    fn get(&self, frame: &Frame, name: &str) -> Result<Value, Raise> {
        frame
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal(format!("undefined binding {name}")).into())
    }

    fn collect_args(&self, frame: &Frame, names: &[String]) -> Result<Vec<Value>, Raise> {
        names.iter().map(|n| self.get(frame, n)).collect()
    }

    /// Resolves `compareTo` through the prototype parent chain (spec §4.1:
    /// "for objects, ordering delegates to a user-defined `compareTo(T) :
    /// int` method resolved via prototype parents"), mirroring how
    /// `CallStatic` resolves a mangled `Proto::method` name.
    fn resolve_compare_to(&self, proto_name: &str) -> Option<&Function> {
        let mut current = Some(proto_name);
        while let Some(name) = current {
            let qualified = format!("{name}::compareTo");
            if let Some(function) = self.module.find_function(&qualified) {
                return Some(function);
            }
            current = self.module.find_proto(name).and_then(|p| p.parent.as_deref());
        }
        None
    }

    /// Sorts a list of objects in place using each element's `compareTo`
    /// method (spec §4.3: "object elements require `compareTo` via
    /// prototype resolution; failure of `compareTo` propagates"). Uses a
    /// stable insertion sort so a raised exception leaves the comparator
    /// count bounded and the sort itself stable on equal keys, matching the
    /// `sort_with`/`sort_numeric` stability contract.
    fn sort_objects_by_compare_to(
        &self,
        list: &Rc<RefCell<PsList>>,
        file: String,
        ctx: &mut Context,
        dispatch: &mut dyn NativeCallDispatch,
    ) -> Result<(), Raise> {
        let mut items = list.borrow().as_slice().to_vec();
        for i in 1..items.len() {
            let mut j = i;
            while j > 0 && self.compare_objects(&items[j - 1], &items[j], &file, ctx, dispatch)? == std::cmp::Ordering::Greater
            {
                items.swap(j - 1, j);
                j -= 1;
            }
        }
        list.borrow_mut().set_sorted(items);
        Ok(())
    }

    fn compare_objects(
        &self,
        a: &Value,
        b: &Value,
        file: &str,
        ctx: &mut Context,
        dispatch: &mut dyn NativeCallDispatch,
    ) -> Result<std::cmp::Ordering, Raise> {
        let proto_name = match a {
            Value::Object(obj) => obj.borrow().proto_name().to_string(),
            _ => {
                return Err(RuntimeError::TypeError(
                    "sort: elements must all be numeric, all strings, or all objects".into(),
                )
                .into())
            }
        };
        let function = self.resolve_compare_to(&proto_name).ok_or_else(|| {
            Raise::Error(RuntimeError::TypeError(format!(
                "{proto_name} has no compareTo method"
            )))
        })?;
        let mut inner = Frame::new(file.to_string());
        self.bind_params(function, vec![a.clone(), b.clone()], &mut inner);
        let result = self.run_nested(function, inner, ctx, dispatch)?;
        match result.as_int() {
            Some(n) if n < 0 => Ok(std::cmp::Ordering::Less),
            Some(0) => Ok(std::cmp::Ordering::Equal),
            Some(_) => Ok(std::cmp::Ordering::Greater),
            None => Err(RuntimeError::TypeError("compareTo must return an Int".into()).into()),
        }
    }

    fn collect_fields(&self, proto_name: &str) -> Vec<ProtoField> {
        let mut chain = Vec::new();
        let mut current = Some(proto_name);
        while let Some(name) = current {
            match self.module.find_proto(name) {
                Some(proto) => {
                    chain.push(proto);
                    current = proto.parent.as_deref();
                }
                None => break,
            }
        }
        chain.reverse();
        chain.into_iter().flat_map(|p| p.fields.clone()).collect()
    }
}

/// Dispatches the fixed primitive-method table every value kind exposes
/// (length/push/substring/... ), keyed by the receiver's runtime tag. This
/// is distinct from `CallStatic`, which resolves an IR-declared prototype
/// method; these names are never user-declared.
fn call_builtin_method(
    receiver: &Value,
    method: &str,
    args: &[Value],
    ctx: &mut Context,
) -> Result<Value, Raise> {
    fn arg_int(args: &[Value], i: usize) -> Result<i64, Raise> {
        args.get(i)
            .and_then(Value::as_int)
            .ok_or_else(|| RuntimeError::TypeError(format!("argument {i} must be an Int")).into())
    }
    fn arg_str<'a>(args: &'a [Value], i: usize) -> Result<&'a str, Raise> {
        args.get(i)
            .and_then(Value::as_str)
            .ok_or_else(|| RuntimeError::TypeError(format!("argument {i} must be a String")).into())
    }

    match receiver {
        Value::List(list) => match method {
            "length" => Ok(Value::Int(list.borrow().len() as i64)),
            "push" => {
                list.borrow_mut().push(args[0].clone());
                Ok(Value::Void)
            }
            "pop" => Ok(list.borrow_mut().pop()?),
            "insert" => {
                list.borrow_mut().insert(arg_int(args, 0)?, args[1].clone())?;
                Ok(Value::Void)
            }
            "removeAt" => Ok(list.borrow_mut().remove(arg_int(args, 0)?)?),
            "reverse" => {
                list.borrow_mut().reverse();
                Ok(Value::Void)
            }
            "sort" => {
                let is_numeric = list
                    .borrow()
                    .as_slice()
                    .iter()
                    .all(|v| matches!(v, Value::Int(_) | Value::Float(_)));
                if is_numeric {
                    list.borrow_mut().sort_numeric()?;
                } else {
                    list.borrow_mut().sort_with(|a, b| match (a, b) {
                        (Value::String(a), Value::String(b)) => {
                            Ok(a.as_str().cmp(b.as_str()))
                        }
                        _ => Err(RuntimeError::TypeError(
                            "sort: elements must all be numeric or all strings".into(),
                        )),
                    })?;
                }
                Ok(Value::Void)
            }
            other => Err(RuntimeError::TypeError(format!("List has no method {other}")).into()),
        },

        Value::Map(map) => match method {
            "length" => Ok(Value::Int(map.borrow().len() as i64)),
            "containsKey" => Ok(Value::Bool(map.borrow().contains_key(&args[0]))),
            "remove" => Ok(map.borrow_mut().remove(&args[0])?),
            "keys" => Ok(Value::List(Rc::new(RefCell::new(PsList::from_vec(
                map.borrow().keys().cloned().collect(),
            ))))),
            "values" => Ok(Value::List(Rc::new(RefCell::new(PsList::from_vec(
                map.borrow().iter().map(|(_, v)| v.clone()).collect(),
            ))))),
            other => Err(RuntimeError::TypeError(format!("Map has no method {other}")).into()),
        },

        Value::String(s) => match method {
            "length" => Ok(Value::Int(s.glyph_len() as i64)),
            "substring" => Ok(Value::String(Rc::new(
                s.substring(arg_int(args, 0)?, arg_int(args, 1)?)?,
            ))),
            "indexOf" => Ok(Value::Int(s.index_of(arg_str(args, 0)?))),
            "lastIndexOf" => Ok(Value::Int(s.last_index_of(arg_str(args, 0)?))),
            "startsWith" => Ok(Value::Bool(s.starts_with(arg_str(args, 0)?))),
            "endsWith" => Ok(Value::Bool(s.ends_with(arg_str(args, 0)?))),
            "contains" => Ok(Value::Bool(s.contains(arg_str(args, 0)?))),
            "split" => Ok(Value::List(Rc::new(RefCell::new(PsList::from_vec(
                s.split(arg_str(args, 0)?)
                    .into_iter()
                    .map(|piece| Value::String(Rc::new(piece)))
                    .collect(),
            ))))),
            "replaceAll" => Ok(Value::String(Rc::new(
                s.replace_all(arg_str(args, 0)?, arg_str(args, 1)?)?,
            ))),
            "trim" => Ok(Value::String(Rc::new(s.trim()))),
            "trimStart" => Ok(Value::String(Rc::new(s.trim_start()))),
            "trimEnd" => Ok(Value::String(Rc::new(s.trim_end()))),
            "padStart" => Ok(Value::String(Rc::new(
                s.pad_start(arg_int(args, 0)? as usize, arg_str(args, 1)?)?,
            ))),
            "padEnd" => Ok(Value::String(Rc::new(
                s.pad_end(arg_int(args, 0)? as usize, arg_str(args, 1)?)?,
            ))),
            "repeat" => Ok(Value::String(Rc::new(s.repeat(arg_int(args, 0)? as usize)))),
            "toUpper" => Ok(Value::String(Rc::new(s.to_ascii_upper()))),
            "toLower" => Ok(Value::String(Rc::new(s.to_ascii_lower()))),
            "toUtf8Bytes" => Ok(Value::Bytes(Rc::from(s.to_utf8_bytes().into_boxed_slice()))),
            other => Err(RuntimeError::TypeError(format!("String has no method {other}")).into()),
        },

        Value::Bytes(bytes) => match method {
            "length" => Ok(Value::Int(bytes.len() as i64)),
            "toUtf8String" => Ok(Value::String(Rc::new(
                PsString::from_utf8(bytes).map_err(RuntimeError::from)?,
            ))),
            other => Err(RuntimeError::TypeError(format!("Bytes has no method {other}")).into()),
        },

        Value::Int(i) => match method {
            "toFloat" => Ok(Value::Float(*i as f64)),
            "toString" => Ok(Value::String(Rc::new(PsString::new(i.to_string())))),
            other => Err(RuntimeError::TypeError(format!("Int has no method {other}")).into()),
        },

        Value::Float(f) => match method {
            "toInt" => Ok(Value::Int(*f as i64)),
            "isNaN" => Ok(Value::Bool(f.is_nan())),
            "isInfinite" => Ok(Value::Bool(f.is_infinite())),
            "toString" => Ok(Value::String(Rc::new(PsString::new(to_display_string(
                receiver,
            ))))),
            other => Err(RuntimeError::TypeError(format!("Float has no method {other}")).into()),
        },

        Value::File(file) => match method {
            "read" => {
                let bytes = file.borrow_mut().read_to_end().map_err(RuntimeError::from)?;
                if bytes.is_empty() {
                    Ok(ctx.eof_sentinel())
                } else {
                    Ok(Value::Bytes(Rc::from(bytes.into_boxed_slice())))
                }
            }
            "write" => {
                let bytes = match &args[0] {
                    Value::Bytes(b) => b.to_vec(),
                    Value::String(s) => s.to_utf8_bytes(),
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "write: cannot write a {}",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                file.borrow_mut().write_all(&bytes).map_err(RuntimeError::from)?;
                Ok(Value::Void)
            }
            "close" => {
                file.borrow_mut().close()?;
                Ok(Value::Void)
            }
            other => Err(RuntimeError::TypeError(format!("File has no method {other}")).into()),
        },

        Value::View(view) => match method {
            "length" => {
                if !view.is_valid() {
                    return Err(RuntimeError::ViewInvalid.into());
                }
                Ok(Value::Int(view.len as i64))
            }
            other => Err(RuntimeError::TypeError(format!("View has no method {other}")).into()),
        },

        other => Err(RuntimeError::TypeError(format!(
            "{} has no method {method}",
            other.type_name()
        ))
        .into()),
    }
}

fn default_value_for_type(type_name: Option<&str>) -> Value {
    match type_name {
        Some("Int") => Value::Int(0),
        Some("Float") => Value::Float(0.0),
        Some("Bool") => Value::Bool(false),
        Some("Byte") => Value::Byte(0),
        Some("Glyph") => Value::Glyph('\0'),
        Some("String") => Value::String(Rc::new(protoscript_core::value::PsString::new(""))),
        Some("Bytes") => Value::Bytes(Rc::from(Vec::new().into_boxed_slice())),
        Some("List") => Value::List(Rc::new(RefCell::new(PsList::new()))),
        Some("Map") => Value::Map(Rc::new(RefCell::new(PsMap::new()))),
        _ => Value::Void,
    }
}

fn index_get(target: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match target {
        Value::List(list) => {
            let idx = index
                .as_int()
                .ok_or_else(|| RuntimeError::TypeError("list index must be an Int".into()))?;
            list.borrow().get(idx).cloned()
        }
        Value::Map(map) => map.borrow().get(index).cloned(),
        Value::View(view) => {
            let idx = index
                .as_int()
                .ok_or_else(|| RuntimeError::TypeError("view index must be an Int".into()))?;
            view.get(idx)
        }
        Value::String(s) => {
            let idx = index
                .as_int()
                .ok_or_else(|| RuntimeError::TypeError("string index must be an Int".into()))?;
            let real = if idx < 0 {
                idx + s.glyph_len() as i64
            } else {
                idx
            };
            if real < 0 || real as usize >= s.glyph_len() {
                return Err(RuntimeError::StringIndexOutOfBounds);
            }
            Ok(Value::Glyph(s.glyph_at(real as usize).unwrap()))
        }
        Value::Bytes(bytes) => {
            let idx = index
                .as_int()
                .ok_or_else(|| RuntimeError::TypeError("bytes index must be an Int".into()))?;
            let real = if idx < 0 { idx + bytes.len() as i64 } else { idx };
            if real < 0 || real as usize >= bytes.len() {
                return Err(RuntimeError::IndexOutOfBounds);
            }
            Ok(Value::Byte(bytes[real as usize]))
        }
        other => Err(RuntimeError::TypeError(format!(
            "{} is not indexable",
            other.type_name()
        ))),
    }
}

fn index_set(target: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match target {
        Value::List(list) => {
            let idx = index
                .as_int()
                .ok_or_else(|| RuntimeError::TypeError("list index must be an Int".into()))?;
            list.borrow_mut().set(idx, value)
        }
        Value::Map(map) => {
            map.borrow_mut().set(index.clone(), value);
            Ok(())
        }
        Value::View(view) => {
            let idx = index
                .as_int()
                .ok_or_else(|| RuntimeError::TypeError("view index must be an Int".into()))?;
            view.set(idx, value)
        }
        other => Err(RuntimeError::TypeError(format!(
            "{} does not support index assignment",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NoNativeModules;
    use protoscript_ir::load_from_str;

    fn load(json: &str) -> Arc<Module> {
        load_from_str(json).unwrap()
    }

    #[test]
    fn hello_world_returns_constant_string() {
        let module = load(
            r#"{
                "functions": [{
                    "name": "main",
                    "blocks": [{
                        "label": "entry",
                        "instrs": [
                            {"op": "const", "dst": "t0", "literal": {"kind": "string", "value": "hello"}},
                            {"op": "ret", "src": "t0"}
                        ]
                    }]
                }]
            }"#,
        );
        let interp = Interpreter::new(module);
        let mut ctx = Context::new();
        let mut dispatch = NoNativeModules;
        let result = interp
            .call_function("main", Vec::new(), &mut ctx, &mut dispatch)
            .ok()
            .unwrap();
        assert_eq!(result.as_str(), Some("hello"));
    }

    #[test]
    fn divide_by_zero_is_caught_by_try_handler() {
        let module = load(
            r#"{
                "functions": [{
                    "name": "main",
                    "blocks": [
                        {"label": "entry", "instrs": [
                            {"op": "const", "dst": "a", "literal": {"kind": "int", "value": 1}},
                            {"op": "const", "dst": "b", "literal": {"kind": "int", "value": 0}},
                            {"op": "push_handler", "target": "handler"},
                            {"op": "bin_op", "dst": "r", "op_kind": "div", "lhs": "a", "rhs": "b"},
                            {"op": "pop_handler"},
                            {"op": "jump", "target": "done"}
                        ]},
                        {"label": "handler", "instrs": [
                            {"op": "const", "dst": "r", "literal": {"kind": "int", "value": -1}},
                            {"op": "jump", "target": "done"}
                        ]},
                        {"label": "done", "instrs": [
                            {"op": "ret", "src": "r"}
                        ]}
                    ]
                }]
            }"#,
        );
        let interp = Interpreter::new(module);
        let mut ctx = Context::new();
        let mut dispatch = NoNativeModules;
        let result = interp
            .call_function("main", Vec::new(), &mut ctx, &mut dispatch)
            .ok()
            .unwrap();
        assert_eq!(result.as_int(), Some(-1));
    }

    #[test]
    fn unhandled_exception_propagates() {
        let module = load(
            r#"{
                "functions": [{
                    "name": "main",
                    "blocks": [{
                        "label": "entry",
                        "instrs": [
                            {"op": "const", "dst": "a", "literal": {"kind": "int", "value": 1}},
                            {"op": "const", "dst": "b", "literal": {"kind": "int", "value": 0}},
                            {"op": "bin_op", "dst": "r", "op_kind": "div", "lhs": "a", "rhs": "b"},
                            {"op": "ret", "src": "r"}
                        ]
                    }]
                }]
            }"#,
        );
        let interp = Interpreter::new(module);
        let mut ctx = Context::new();
        let mut dispatch = NoNativeModules;
        let outcome = interp.call_function("main", Vec::new(), &mut ctx, &mut dispatch);
        match outcome {
            Err(Unwind::Exception(exc)) => {
                assert_eq!(exc.borrow().code, Some("R1004"));
            }
            _ => panic!("expected an unhandled exception"),
        }
    }

    #[test]
    fn new_object_of_an_exception_proto_is_throwable() {
        let module = load(
            r#"{
                "prototypes": [
                    {"name": "MyErr", "parent": "Exception", "is_exception": true,
                     "fields": [{"name": "detail"}]}
                ],
                "functions": [{
                    "name": "main",
                    "blocks": [{
                        "label": "entry",
                        "instrs": [
                            {"op": "new_object", "dst": "e", "proto": "MyErr"},
                            {"op": "const", "dst": "msg", "literal": {"kind": "string", "value": "boom"}},
                            {"op": "member_set", "obj": "e", "name": "message", "src": "msg"},
                            {"op": "throw", "src": "e"}
                        ]
                    }]
                }]
            }"#,
        );
        let interp = Interpreter::new(module);
        let mut ctx = Context::new();
        let mut dispatch = NoNativeModules;
        let outcome = interp.call_function("main", Vec::new(), &mut ctx, &mut dispatch);
        match outcome {
            Err(Unwind::Exception(exc)) => {
                let exc = exc.borrow();
                assert_eq!(exc.type_name.as_ref(), "MyErr");
                assert_eq!(exc.parent_name.as_deref(), Some("Exception"));
                assert_eq!(exc.message.as_ref(), "boom");
                assert!(!exc.is_runtime);
            }
            _ => panic!("expected MyErr to propagate as an exception"),
        }
    }

    #[test]
    fn exception_is_recognizes_user_declared_subtype() {
        let module = load(
            r#"{
                "prototypes": [
                    {"name": "MyErr", "parent": "Exception", "is_exception": true}
                ],
                "functions": [{
                    "name": "main",
                    "blocks": [{
                        "label": "entry",
                        "instrs": [
                            {"op": "new_object", "dst": "e", "proto": "MyErr"},
                            {"op": "exception_is", "dst": "is_my_err", "src": "e", "type_name": "MyErr"},
                            {"op": "exception_is", "dst": "is_exception", "src": "e", "type_name": "Exception"},
                            {"op": "exception_is", "dst": "is_runtime", "src": "e", "type_name": "RuntimeException"},
                            {"op": "ret", "src": "is_my_err"}
                        ]
                    }]
                }]
            }"#,
        );
        let interp = Interpreter::new(module);
        let mut ctx = Context::new();
        let mut dispatch = NoNativeModules;
        let result = interp
            .call_function("main", Vec::new(), &mut ctx, &mut dispatch)
            .ok()
            .unwrap();
        assert_eq!(result.as_bool(), Some(true));
    }
}
