//! Grace AST definitions
//!
//! This crate defines the abstract syntax tree (AST) for the Grace language.
//! It serves as the contract between the parser and the compiler core. Nodes
//! are plain tagged variants; semantic analysis and lowering are implemented
//! as traversals over them, not as methods on the nodes themselves.

use std::fmt;

/// Scalar data types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int,
    /// 8-bit character.
    Char,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Char => write!(f, "char"),
        }
    }
}

/// A complete variable type: a scalar with zero or more array dimensions.
///
/// `dims` is ordered outermost-first: `int[3][4]` has `dims == [3, 4]`.
/// Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceType {
    pub data: DataType,
    pub dims: Vec<u64>,
}

impl GraceType {
    pub fn scalar(data: DataType) -> Self {
        GraceType { data, dims: Vec::new() }
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// The type obtained by indexing once, if this is an array type.
    pub fn indexed(&self) -> Option<GraceType> {
        if self.dims.is_empty() {
            return None;
        }
        Some(GraceType {
            data: self.data,
            dims: self.dims[1..].to_vec(),
        })
    }
}

impl fmt::Display for GraceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)?;
        for d in &self.dims {
            write!(f, "[{}]", d)?;
        }
        Ok(())
    }
}

/// A formal-parameter type: a `GraceType` whose outermost dimension may be
/// left unspecified (`int[]`, `char[][5]`, ...). Such parameters are only
/// legal by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FparType {
    pub data: DataType,
    /// The outermost dimension is unspecified.
    pub unknown_first: bool,
    /// The remaining, known dimensions (all of them when `unknown_first` is
    /// false).
    pub dims: Vec<u64>,
}

impl FparType {
    pub fn scalar(data: DataType) -> Self {
        FparType { data, unknown_first: false, dims: Vec::new() }
    }

    pub fn is_array_like(&self) -> bool {
        self.unknown_first || !self.dims.is_empty()
    }

    /// The variable type a parameter of this type binds to inside the
    /// function body. An unspecified outer dimension is recorded as `[1]`;
    /// the body never observes the concrete size.
    pub fn materialize(&self) -> GraceType {
        let mut dims = Vec::with_capacity(self.dims.len() + 1);
        if self.unknown_first {
            dims.push(1);
        }
        dims.extend_from_slice(&self.dims);
        GraceType { data: self.data, dims }
    }
}

impl fmt::Display for FparType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)?;
        if self.unknown_first {
            write!(f, "[]")?;
        }
        for d in &self.dims {
            write!(f, "[{}]", d)?;
        }
        Ok(())
    }
}

/// Function return types. Arrays cannot be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetType {
    Nothing,
    Data(DataType),
}

impl fmt::Display for RetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetType::Nothing => write!(f, "nothing"),
            RetType::Data(d) => write!(f, "{}", d),
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Minus,
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Relational operators used in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
}

/// Expressions.
#[derive(Debug, Clone)]
pub enum Expr {
    IntLit(u64),
    CharLit(u8),
    LValue(LValue),
    Unary(UnOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Call(FuncCall),
}

/// Assignable places: identifiers, string literals and index chains.
#[derive(Debug, Clone)]
pub enum LValue {
    Ident(String),
    /// String literal bytes, without the terminating NUL (appended during
    /// lowering).
    Str(Vec<u8>),
    Index(Box<LValue>, Box<Expr>),
}

/// Boolean conditions. Conditions and expressions are distinct syntactic
/// categories; a condition never produces a storable value.
#[derive(Debug, Clone)]
pub enum Cond {
    Rel(Box<Expr>, RelOp, Box<Expr>),
    Not(Box<Cond>),
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
}

/// A function call, usable both as an expression and as a statement.
#[derive(Debug, Clone)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<Expr>,
}

/// Statements.
#[derive(Debug, Clone)]
pub enum Stmt {
    Empty,
    Assign(LValue, Expr),
    Call(FuncCall),
    If {
        cond: Cond,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While(Cond, Box<Stmt>),
    Return(Option<Expr>),
    Block(Block),
}

/// A braced statement list.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

/// One formal-parameter group: `[ref] a, b, c : fpar-type`.
#[derive(Debug, Clone)]
pub struct FparDef {
    pub by_ref: bool,
    pub names: Vec<String>,
    pub ty: FparType,
}

/// A function header: name, parameter groups and return type.
#[derive(Debug, Clone)]
pub struct Header {
    pub name: String,
    pub params: Vec<FparDef>,
    pub ret: RetType,
}

/// A variable definition: `var a, b : type;`.
#[derive(Debug, Clone)]
pub struct VarDef {
    pub names: Vec<String>,
    pub ty: GraceType,
}

/// Local definitions preceding a function body.
#[derive(Debug, Clone)]
pub enum LocalDef {
    Var(VarDef),
    /// A forward declaration (`header ;`), owed a definition in the same
    /// scope.
    Decl(Header),
    Func(FuncDef),
}

/// A full function definition.
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub header: Header,
    pub locals: Vec<LocalDef>,
    pub body: Block,
}

/// A Grace program: a single top-level function definition, the program
/// entry point.
#[derive(Debug, Clone)]
pub struct Program {
    pub entry: FuncDef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_equality_is_structural() {
        let a = GraceType { data: DataType::Int, dims: vec![3, 4] };
        let b = GraceType { data: DataType::Int, dims: vec![3, 4] };
        let c = GraceType { data: DataType::Int, dims: vec![4, 3] };
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, GraceType::scalar(DataType::Int));
    }

    #[test]
    fn indexing_drops_the_outer_dimension() {
        let m = GraceType { data: DataType::Int, dims: vec![3, 4] };
        let row = m.indexed().unwrap();
        assert_eq!(row.dims, vec![4]);
        let cell = row.indexed().unwrap();
        assert!(cell.is_scalar());
        assert_eq!(cell.indexed(), None);
    }

    #[test]
    fn unknown_dimension_materializes_as_one() {
        let p = FparType { data: DataType::Char, unknown_first: true, dims: vec![] };
        assert!(p.is_array_like());
        assert_eq!(p.materialize().dims, vec![1]);

        let q = FparType { data: DataType::Int, unknown_first: true, dims: vec![5] };
        assert_eq!(q.materialize().dims, vec![1, 5]);
    }

    #[test]
    fn display_forms() {
        let t = GraceType { data: DataType::Int, dims: vec![2] };
        assert_eq!(t.to_string(), "int[2]");
        let p = FparType { data: DataType::Char, unknown_first: true, dims: vec![] };
        assert_eq!(p.to_string(), "char[]");
        assert_eq!(RetType::Nothing.to_string(), "nothing");
    }
}
