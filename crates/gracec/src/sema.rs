//! Semantic analysis for Grace.
//!
//! A single traversal over the AST that enforces scoping, typing and call
//! conventions. Analysis stops at the first offence; the returned diagnostic
//! is rendered by the driver. On success the symbol table has been fully
//! wound down again, every pushed scope matched by a pop.

use grace_ast::*;

use crate::diagnostics::{Diagnostic, DiagnosticResult};
use crate::types::{condense, flatten_groups, FparGroup, Symbol, SymbolTable};

/// Checks a whole program against the language rules.
pub fn analyze(program: &Program) -> DiagnosticResult<()> {
    let mut analyzer = Analyzer { table: SymbolTable::with_runtime() };
    analyzer.func_def(&program.entry, true)?;
    if analyzer.table.depth() != 1 {
        return Err(Diagnostic::bug("scope stack not rewound after analysis"));
    }
    Ok(())
}

struct Analyzer {
    table: SymbolTable,
}

impl Analyzer {
    fn func_def(&mut self, def: &FuncDef, outermost: bool) -> DiagnosticResult<()> {
        self.check_header(&def.header)?;
        if outermost && !def.header.params.is_empty() {
            return Err(Diagnostic::semantic(format!(
                "the program entry function `{}` cannot take parameters",
                def.header.name
            )));
        }

        let groups = condense(&def.header.params);
        self.table.insert(
            &def.header.name,
            Symbol::Function { ret: def.header.ret, params: groups },
            false,
        )?;

        self.table.set_owner(def.header.ret);
        self.table.push_scope();

        // formal parameters bind as ordinary variables inside the body; an
        // unspecified outer dimension is opaque to it
        for param in &def.header.params {
            let ty = param.ty.materialize();
            for name in &param.names {
                self.table
                    .insert(name, Symbol::Variable { ty: ty.clone() }, false)?;
            }
        }

        for local in &def.locals {
            self.local_def(local)?;
        }
        self.block(&def.body)?;

        self.table.pop_scope()
    }

    fn local_def(&mut self, local: &LocalDef) -> DiagnosticResult<()> {
        match local {
            LocalDef::Var(var) => {
                self.check_var_dims(&var.ty)?;
                for name in &var.names {
                    self.table
                        .insert(name, Symbol::Variable { ty: var.ty.clone() }, false)?;
                }
                Ok(())
            }
            LocalDef::Decl(header) => {
                self.check_header(header)?;
                self.table.insert(
                    &header.name,
                    Symbol::Function { ret: header.ret, params: condense(&header.params) },
                    true,
                )
            }
            LocalDef::Func(def) => self.func_def(def, false),
        }
    }

    fn check_header(&self, header: &Header) -> DiagnosticResult<()> {
        for param in &header.params {
            for &d in &param.ty.dims {
                if d == 0 {
                    return Err(Diagnostic::semantic(format!(
                        "array dimension of parameter `{}` in `{}` must be positive",
                        param.names[0], header.name
                    )));
                }
            }
            if param.ty.is_array_like() && !param.by_ref {
                return Err(Diagnostic::semantic_with_note(
                    format!(
                        "array parameter `{}` of `{}` must be passed by reference",
                        param.names[0], header.name
                    ),
                    "arrays cannot be copied; add `ref`",
                ));
            }
        }
        Ok(())
    }

    fn check_var_dims(&self, ty: &GraceType) -> DiagnosticResult<()> {
        for &d in &ty.dims {
            if d == 0 {
                return Err(Diagnostic::semantic(
                    "array dimensions must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn block(&mut self, block: &Block) -> DiagnosticResult<()> {
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> DiagnosticResult<()> {
        match stmt {
            Stmt::Empty => Ok(()),
            Stmt::Assign(target, value) => {
                let target_ty = self.lvalue_type(target)?;
                if !target_ty.is_scalar() {
                    return Err(Diagnostic::semantic(format!(
                        "cannot assign to a value of array type {}",
                        target_ty
                    )));
                }
                let value_ty = self.expr_type(value)?;
                if value_ty != target_ty {
                    return Err(Diagnostic::semantic(format!(
                        "assignment type mismatch: target is {}, value is {}",
                        target_ty, value_ty
                    )));
                }
                Ok(())
            }
            Stmt::Call(call) => {
                self.check_call(call)?;
                Ok(())
            }
            Stmt::If { cond, then_branch, else_branch } => {
                self.cond(cond)?;
                self.stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While(cond, body) => {
                self.cond(cond)?;
                self.stmt(body)
            }
            Stmt::Return(value) => {
                let expected = self.table.current_owner_rettype()?;
                match (expected, value) {
                    (RetType::Nothing, None) => Ok(()),
                    (RetType::Nothing, Some(_)) => Err(Diagnostic::semantic(
                        "cannot return a value from a function returning nothing".to_string(),
                    )),
                    (RetType::Data(_), None) => Err(Diagnostic::semantic(
                        "this function must return a value".to_string(),
                    )),
                    (RetType::Data(dt), Some(e)) => {
                        let ty = self.expr_type(e)?;
                        if ty != GraceType::scalar(dt) {
                            return Err(Diagnostic::semantic(format!(
                                "return type mismatch: expected {}, found {}",
                                dt, ty
                            )));
                        }
                        Ok(())
                    }
                }
            }
            Stmt::Block(block) => self.block(block),
        }
    }

    fn cond(&mut self, cond: &Cond) -> DiagnosticResult<()> {
        match cond {
            Cond::Rel(lhs, _, rhs) => {
                let lt = self.expr_type(lhs)?;
                let rt = self.expr_type(rhs)?;
                if !lt.is_scalar() || lt != rt {
                    return Err(Diagnostic::semantic(format!(
                        "comparison operands must share a scalar type, found {} and {}",
                        lt, rt
                    )));
                }
                Ok(())
            }
            Cond::Not(inner) => self.cond(inner),
            Cond::And(lhs, rhs) | Cond::Or(lhs, rhs) => {
                self.cond(lhs)?;
                self.cond(rhs)
            }
        }
    }

    fn expr_type(&mut self, expr: &Expr) -> DiagnosticResult<GraceType> {
        match expr {
            Expr::IntLit(_) => Ok(GraceType::scalar(DataType::Int)),
            Expr::CharLit(_) => Ok(GraceType::scalar(DataType::Char)),
            Expr::LValue(lv) => self.lvalue_type(lv),
            Expr::Unary(_, operand) => {
                let ty = self.expr_type(operand)?;
                if ty != GraceType::scalar(DataType::Int) {
                    return Err(Diagnostic::semantic(format!(
                        "unary sign requires an int operand, found {}",
                        ty
                    )));
                }
                Ok(ty)
            }
            Expr::Binary(lhs, _, rhs) => {
                let lt = self.expr_type(lhs)?;
                let rt = self.expr_type(rhs)?;
                let int = GraceType::scalar(DataType::Int);
                if lt != int || rt != int {
                    return Err(Diagnostic::semantic(format!(
                        "arithmetic requires int operands, found {} and {}",
                        lt, rt
                    )));
                }
                Ok(int)
            }
            Expr::Call(call) => match self.check_call(call)? {
                RetType::Data(dt) => Ok(GraceType::scalar(dt)),
                RetType::Nothing => Err(Diagnostic::semantic(format!(
                    "call to `{}`, which returns nothing, cannot be used as a value",
                    call.name
                ))),
            },
        }
    }

    fn lvalue_type(&mut self, lv: &LValue) -> DiagnosticResult<GraceType> {
        match lv {
            LValue::Ident(name) => match self.table.lookup(name)? {
                Symbol::Variable { ty } => Ok(ty.clone()),
                Symbol::Function { .. } => Err(Diagnostic::semantic(format!(
                    "`{}` is a function, not a variable",
                    name
                ))),
            },
            // the terminating NUL is part of the type
            LValue::Str(bytes) => Ok(GraceType {
                data: DataType::Char,
                dims: vec![bytes.len() as u64 + 1],
            }),
            LValue::Index(base, index) => {
                let index_ty = self.expr_type(index)?;
                if index_ty != GraceType::scalar(DataType::Int) {
                    return Err(Diagnostic::semantic(format!(
                        "array index must be int, found {}",
                        index_ty
                    )));
                }
                let base_ty = self.lvalue_type(base)?;
                base_ty.indexed().ok_or_else(|| {
                    Diagnostic::semantic(format!("cannot index a value of type {}", base_ty))
                })
            }
        }
    }

    /// Checks a call's arity and argument compatibility; returns the callee
    /// return type.
    fn check_call(&mut self, call: &FuncCall) -> DiagnosticResult<RetType> {
        let (ret, groups): (RetType, Vec<FparGroup>) = match self.table.lookup(&call.name)? {
            Symbol::Function { ret, params } => (*ret, params.clone()),
            Symbol::Variable { .. } => {
                return Err(Diagnostic::semantic(format!(
                    "`{}` is a variable, not a function",
                    call.name
                )))
            }
        };

        let formals = flatten_groups(&groups);
        if formals.len() != call.args.len() {
            return Err(Diagnostic::semantic(format!(
                "`{}` expects {} argument(s), found {}",
                call.name,
                formals.len(),
                call.args.len()
            )));
        }

        for (i, ((formal, _by_ref), actual)) in formals.iter().zip(&call.args).enumerate() {
            let actual_ty = self.expr_type(actual)?;
            if !fpar_compatible(formal, &actual_ty) {
                return Err(Diagnostic::semantic(format!(
                    "argument {} of `{}` has type {}, expected {}",
                    i + 1,
                    call.name,
                    actual_ty,
                    formal
                )));
            }
        }
        Ok(ret)
    }
}

/// A formal with an unspecified outer dimension accepts any actual matching
/// after that dimension is dropped; otherwise types must match structurally.
fn fpar_compatible(formal: &FparType, actual: &GraceType) -> bool {
    if formal.data != actual.data {
        return false;
    }
    if formal.unknown_first {
        !actual.dims.is_empty() && actual.dims[1..] == formal.dims[..]
    } else {
        actual.dims == formal.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_src(src: &str) -> Result<(), String> {
        let program = grace_parser::parse_program(src).map_err(|e| e.message)?;
        analyze(&program).map_err(|d| d.message.clone())
    }

    #[test]
    fn accepts_a_well_typed_program() {
        analyze_src(
            "fun main() : nothing \
               var x : int; \
               fun double(n : int) : int { return n * 2; } \
             { x <- double(21); writeInteger(x); }",
        )
        .unwrap();
    }

    #[test]
    fn unknown_dimension_compatibility() {
        analyze_src(
            "fun main() : nothing \
               var s : char[10]; \
             { readString(9, s); writeString(s); }",
        )
        .unwrap();

        let err = analyze_src(
            "fun main() : nothing \
               var n : int[10]; \
             { writeString(n); }",
        )
        .unwrap_err();
        assert!(err.contains("argument 1"), "{}", err);
    }

    #[test]
    fn argument_dimension_mismatch() {
        let err = analyze_src(
            "fun main() : nothing \
               var m : int[2][3]; \
               fun f(ref a : int[][4]) : nothing {} \
             { f(m); }",
        )
        .unwrap_err();
        assert!(err.contains("expected int[][4]"), "{}", err);
    }

    #[test]
    fn rejects_scalar_where_array_expected() {
        let err = analyze_src(
            "fun main() : nothing \
               var x : int; \
               fun f(ref a : int[]) : nothing {} \
             { f(x); }",
        )
        .unwrap_err();
        assert!(err.contains("argument 1"), "{}", err);
    }
}
