//! Expression, l-value and condition lowering.
//!
//! L-values lower to slot pointers. Local access indexes the current frame
//! directly; non-local access walks the static-link chain, one load per
//! lexical level. A by-reference slot dereferences once more to reach the
//! object; indexing then chains `getelementptr`s, stepping through the
//! array type for inline arrays and advancing the element pointer directly
//! for parameters with an unspecified outer dimension.
//!
//! Conditions produce `i1` values. `and`/`or` short-circuit through a small
//! diamond joined by a phi carrying the result bit.

use inkwell::types::BasicTypeEnum;
use inkwell::values::{BasicMetadataValueEnum, IntValue, PointerValue};
use inkwell::IntPredicate;

use grace_ast::{BinOp, Cond, Expr, FuncCall, LValue, RelOp, UnOp};

use crate::diagnostics::{Diagnostic, DiagnosticResult};

use super::frames::{Entry, SlotEntry};
use super::{CodeGen, FnCtx};

/// The address of an object an l-value denotes, together with the object's
/// IR type.
pub(crate) struct Place<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: BasicTypeEnum<'ctx>,
    /// `ty` is the element type behind an unspecified outer dimension; the
    /// next index advances the pointer directly.
    pub unknown_size: bool,
}

impl<'ctx> CodeGen<'ctx> {
    /// The frame pointer of the activation at `target_scope`, reached from
    /// the current frame by loading the static link once per level.
    pub(crate) fn frame_at(&self, target_scope: usize) -> DiagnosticResult<PointerValue<'ctx>> {
        let (mut level, mut fp) = {
            let frames = self.frames.borrow();
            let cur = frames.current_scope_no();
            let fp = frames
                .frame_ptr(cur)
                .ok_or_else(|| Diagnostic::bug("no frame pointer for the current scope"))?;
            (cur, fp)
        };
        while level > target_scope {
            {
                let frames = self.frames.borrow();
                frames
                    .frame_ty(level)
                    .ok_or_else(|| Diagnostic::bug("missing frame type on the static chain"))?;
                frames
                    .frame_ty(level - 1)
                    .ok_or_else(|| Diagnostic::bug("missing frame type on the static chain"))?;
            }
            let link_slot = self.builder.build_struct_gep(fp, 0, "frame.link")?;
            fp = self.builder.build_load(link_slot, "frame.up")?.into_pointer_value();
            level -= 1;
        }
        Ok(fp)
    }

    /// Pointer to the frame slot a name is bound to.
    fn slot_ptr(
        &self,
        entry: &SlotEntry<'ctx>,
        name: &str,
    ) -> DiagnosticResult<PointerValue<'ctx>> {
        self.frames
            .borrow()
            .frame_ty(entry.scope_no)
            .ok_or_else(|| Diagnostic::bug("slot owner has no frame type"))?;
        let fp = self.frame_at(entry.scope_no)?;
        Ok(self
            .builder
            .build_struct_gep(fp, entry.frame_slot, name)?)
    }

    /// Lowers an l-value to the address and type of the object it denotes.
    pub(crate) fn lower_lvalue_addr(
        &self,
        lv: &LValue,
        fcx: &FnCtx<'ctx>,
    ) -> DiagnosticResult<Place<'ctx>> {
        match lv {
            LValue::Ident(name) => {
                let entry = self.frames.borrow().lookup(name);
                match entry {
                    Some(Entry::Slot(slot)) => {
                        let p = self.slot_ptr(&slot, name)?;
                        if slot.is_ref {
                            let obj = self
                                .builder
                                .build_load(slot.slot_ty, p, &format!("{}.addr", name))?
                                .into_pointer_value();
                            Ok(Place {
                                ptr: obj,
                                ty: slot.object_ty,
                                unknown_size: slot.unknown_size,
                            })
                        } else {
                            Ok(Place { ptr: p, ty: slot.slot_ty, unknown_size: false })
                        }
                    }
                    Some(Entry::Func(_)) => Err(Diagnostic::bug(format!(
                        "`{}` names a function, not a storable location",
                        name
                    ))),
                    None => Err(Diagnostic::bug(format!(
                        "unknown variable `{}` during lowering",
                        name
                    ))),
                }
            }
            LValue::Str(bytes) => Ok(Place {
                ptr: self.intern_string_literal(bytes),
                ty: self.i8_t.array_type(bytes.len() as u32 + 1).into(),
                unknown_size: false,
            }),
            LValue::Index(base, index) => {
                let base = self.lower_lvalue_addr(base, fcx)?;
                let idx = self.lower_expr(index, fcx)?;
                if base.unknown_size {
                    // the concrete dimension was never materialized; advance
                    // the element pointer directly
                    let ptr =
                        unsafe { self.builder.build_gep(base.ty, base.ptr, &[idx], "arrayidx")? };
                    Ok(Place { ptr, ty: base.ty, unknown_size: false })
                } else {
                    let arr = match base.ty {
                        BasicTypeEnum::ArrayType(a) => a,
                        _ => {
                            return Err(Diagnostic::bug(
                                "indexing stripped the array part of a non-array",
                            ))
                        }
                    };
                    let zero = self.i64_t.const_zero();
                    let ptr = unsafe {
                        self.builder.build_gep(arr, base.ptr, &[zero, idx], "arrayidx")?
                    };
                    Ok(Place { ptr, ty: arr.get_element_type(), unknown_size: false })
                }
            }
        }
    }

    pub(crate) fn lower_expr(
        &self,
        expr: &Expr,
        fcx: &FnCtx<'ctx>,
    ) -> DiagnosticResult<IntValue<'ctx>> {
        match expr {
            Expr::IntLit(v) => Ok(self.i64_t.const_int(*v, false)),
            Expr::CharLit(c) => Ok(self.i8_t.const_int(*c as u64, false)),
            Expr::LValue(lv) => {
                let place = self.lower_lvalue_addr(lv, fcx)?;
                let loaded = self.builder.build_load(place.ty, place.ptr, "load")?;
                self.expect_int(loaded, "scalar load")
            }
            Expr::Unary(op, inner) => {
                let v = self.lower_expr(inner, fcx)?;
                match op {
                    UnOp::Plus => Ok(v),
                    UnOp::Minus => Ok(self.builder.build_int_neg(v, "neg")?),
                }
            }
            Expr::Binary(lhs, op, rhs) => {
                let l = self.lower_expr(lhs, fcx)?;
                let r = self.lower_expr(rhs, fcx)?;
                Ok(match op {
                    BinOp::Add => self.builder.build_int_add(l, r, "add")?,
                    BinOp::Sub => self.builder.build_int_sub(l, r, "sub")?,
                    BinOp::Mul => self.builder.build_int_mul(l, r, "mul")?,
                    BinOp::Div => self.builder.build_int_signed_div(l, r, "quot")?,
                    BinOp::Mod => self.builder.build_int_signed_rem(l, r, "rem")?,
                })
            }
            Expr::Call(call) => self.lower_call(call, fcx)?.ok_or_else(|| {
                Diagnostic::bug(format!("call to `{}` produced no value", call.name))
            }),
        }
    }

    /// Lowers a call. User functions receive the frame of the function whose
    /// scope declared the callee as a hidden first argument; runtime
    /// functions receive none. Pointer-typed formals take the materialized
    /// address of an l-value actual.
    pub(crate) fn lower_call(
        &self,
        call: &FuncCall,
        fcx: &FnCtx<'ctx>,
    ) -> DiagnosticResult<Option<IntValue<'ctx>>> {
        let callee = match self.frames.borrow().lookup(&call.name) {
            Some(Entry::Func(f)) => f,
            Some(Entry::Slot(_)) => {
                return Err(Diagnostic::bug(format!(
                    "`{}` names a variable, not a function",
                    call.name
                )))
            }
            None => {
                return Err(Diagnostic::bug(format!(
                    "call to unknown function `{}`",
                    call.name
                )))
            }
        };
        if callee.param_types.len() != call.args.len() {
            return Err(Diagnostic::bug(format!(
                "arity mismatch lowering call to `{}`",
                call.name
            )));
        }

        let mut args: Vec<BasicMetadataValueEnum<'ctx>> =
            Vec::with_capacity(call.args.len() + 1);
        if !callee.is_runtime {
            args.push(self.frame_at(callee.scope_no)?.into());
        }

        for (actual, formal_ty) in call.args.iter().zip(callee.param_types.iter()) {
            if formal_ty.is_pointer_type() {
                let want = formal_ty.into_pointer_type();
                let lv = match actual {
                    Expr::LValue(lv) => lv,
                    _ => {
                        return Err(Diagnostic::semantic(format!(
                            "arguments passed by reference to `{}` must be l-values",
                            call.name
                        )))
                    }
                };
                let place = self.lower_lvalue_addr(lv, fcx)?;
                let addr = if place.ptr.get_type() == want {
                    place.ptr
                } else {
                    self.builder.build_pointer_cast(place.ptr, want, "argcast")?
                };
                args.push(addr.into());
            } else {
                args.push(self.lower_expr(actual, fcx)?.into());
            }
        }

        let produces_value = callee.value.get_type().get_return_type().is_some();
        let site = self
            .builder
            .build_call(callee.value, &args, if produces_value { "call" } else { "" })?;
        match site.try_as_basic_value().basic() {
            Some(value) => Ok(Some(self.expect_int(value, "call result")?)),
            None => Ok(None),
        }
    }

    pub(crate) fn lower_cond(
        &self,
        cond: &Cond,
        fcx: &FnCtx<'ctx>,
    ) -> DiagnosticResult<IntValue<'ctx>> {
        match cond {
            Cond::Rel(lhs, op, rhs) => {
                let l = self.lower_expr(lhs, fcx)?;
                let r = self.lower_expr(rhs, fcx)?;
                // chars compare unsigned, ints signed
                let char_operands = l.get_type().get_bit_width() == 8;
                let pred = match (op, char_operands) {
                    (RelOp::Eq, _) => IntPredicate::EQ,
                    (RelOp::Neq, _) => IntPredicate::NE,
                    (RelOp::Lt, false) => IntPredicate::SLT,
                    (RelOp::Lt, true) => IntPredicate::ULT,
                    (RelOp::Gt, false) => IntPredicate::SGT,
                    (RelOp::Gt, true) => IntPredicate::UGT,
                    (RelOp::Leq, false) => IntPredicate::SLE,
                    (RelOp::Leq, true) => IntPredicate::ULE,
                    (RelOp::Geq, false) => IntPredicate::SGE,
                    (RelOp::Geq, true) => IntPredicate::UGE,
                };
                Ok(self.builder.build_int_compare(pred, l, r, "cmp")?)
            }
            Cond::Not(inner) => {
                let v = self.lower_cond(inner, fcx)?;
                Ok(self.builder.build_not(v, "not")?)
            }
            Cond::And(lhs, rhs) => self.lower_short_circuit(lhs, rhs, true, fcx),
            Cond::Or(lhs, rhs) => self.lower_short_circuit(lhs, rhs, false, fcx),
        }
    }

    /// `and`/`or` with short-circuit evaluation: the right-hand side runs in
    /// its own block, and a phi at the join carries the result bit.
    fn lower_short_circuit(
        &self,
        lhs: &Cond,
        rhs: &Cond,
        is_and: bool,
        fcx: &FnCtx<'ctx>,
    ) -> DiagnosticResult<IntValue<'ctx>> {
        let label = if is_and { "and" } else { "or" };

        let l = self.lower_cond(lhs, fcx)?;
        let lhs_end = self
            .builder
            .get_insert_block()
            .ok_or_else(|| Diagnostic::bug("builder has no insertion block"))?;

        let rhs_bb = self
            .context
            .append_basic_block(fcx.function, &format!("{}.rhs", label));
        let end_bb = self
            .context
            .append_basic_block(fcx.function, &format!("{}.end", label));
        if is_and {
            self.builder.build_conditional_branch(l, rhs_bb, end_bb)?;
        } else {
            self.builder.build_conditional_branch(l, end_bb, rhs_bb)?;
        }

        self.builder.position_at_end(rhs_bb);
        let r = self.lower_cond(rhs, fcx)?;
        let rhs_end = self
            .builder
            .get_insert_block()
            .ok_or_else(|| Diagnostic::bug("builder has no insertion block"))?;
        self.builder.build_unconditional_branch(end_bb)?;

        self.builder.position_at_end(end_bb);
        let phi = self
            .builder
            .build_phi(self.bool_t, &format!("{}.value", label))?;
        phi.add_incoming(&[(&l, lhs_end), (&r, rhs_end)]);
        Ok(phi.as_basic_value().into_int_value())
    }
}
