//! Statement lowering.
//!
//! `if` lowers to a then/else diamond joined at `if.end`; `while` to a
//! header block that recomputes the condition on every iteration. `return`
//! emits its terminator and then opens a fresh dump block so that any
//! statements after it remain well-formed; unreached blocks are closed by
//! the fall-through return emitted at the end of function lowering.

use grace_ast::{Block, Stmt};

use crate::diagnostics::DiagnosticResult;

use super::{CodeGen, FnCtx};

impl<'ctx> CodeGen<'ctx> {
    pub(crate) fn lower_block(&self, block: &Block, fcx: &FnCtx<'ctx>) -> DiagnosticResult<()> {
        for stmt in &block.stmts {
            self.lower_stmt(stmt, fcx)?;
        }
        Ok(())
    }

    pub(crate) fn lower_stmt(&self, stmt: &Stmt, fcx: &FnCtx<'ctx>) -> DiagnosticResult<()> {
        match stmt {
            Stmt::Empty => Ok(()),
            Stmt::Assign(target, value) => {
                let place = self.lower_lvalue_addr(target, fcx)?;
                let v = self.lower_expr(value, fcx)?;
                self.builder.build_store(place.ptr, v)?;
                Ok(())
            }
            Stmt::Call(call) => {
                self.lower_call(call, fcx)?;
                Ok(())
            }
            Stmt::If { cond, then_branch, else_branch } => {
                let c = self.lower_cond(cond, fcx)?;
                let then_bb = self.context.append_basic_block(fcx.function, "if.then");
                let else_bb = else_branch
                    .as_ref()
                    .map(|_| self.context.append_basic_block(fcx.function, "if.else"));
                let end_bb = self.context.append_basic_block(fcx.function, "if.end");

                self.builder
                    .build_conditional_branch(c, then_bb, else_bb.unwrap_or(end_bb))?;

                self.builder.position_at_end(then_bb);
                self.lower_stmt(then_branch, fcx)?;
                self.ensure_unconditional_branch(end_bb)?;

                if let (Some(else_bb), Some(else_stmt)) = (else_bb, else_branch) {
                    self.builder.position_at_end(else_bb);
                    self.lower_stmt(else_stmt, fcx)?;
                    self.ensure_unconditional_branch(end_bb)?;
                }

                self.builder.position_at_end(end_bb);
                Ok(())
            }
            Stmt::While(cond, body) => {
                let header_bb = self.context.append_basic_block(fcx.function, "while.header");
                let body_bb = self.context.append_basic_block(fcx.function, "while.body");
                let end_bb = self.context.append_basic_block(fcx.function, "while.end");

                self.builder.build_unconditional_branch(header_bb)?;

                self.builder.position_at_end(header_bb);
                let c = self.lower_cond(cond, fcx)?;
                self.builder.build_conditional_branch(c, body_bb, end_bb)?;

                self.builder.position_at_end(body_bb);
                self.lower_stmt(body, fcx)?;
                self.ensure_unconditional_branch(header_bb)?;

                self.builder.position_at_end(end_bb);
                Ok(())
            }
            Stmt::Return(value) => {
                match value {
                    None => self.emit_default_return(fcx)?,
                    Some(e) => {
                        let v = self.lower_expr(e, fcx)?;
                        // the program entry returns i64 whatever was declared
                        let v = if fcx.outermost && v.get_type().get_bit_width() != 64 {
                            self.builder.build_int_z_extend(v, self.i64_t, "retwide")?
                        } else {
                            v
                        };
                        self.builder.build_return(Some(&v))?;
                    }
                }
                let dump = self.context.append_basic_block(fcx.function, "ret.dump");
                self.builder.position_at_end(dump);
                Ok(())
            }
            Stmt::Block(block) => self.lower_block(block, fcx),
        }
    }
}
