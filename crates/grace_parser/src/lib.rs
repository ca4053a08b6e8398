//! Grace parser
//!
//! A hand-written recursive-descent parser over the token stream produced by
//! [`tokenizer`]. The only place the grammar is not LL(1) is the condition
//! `( cond )` versus the expression `( expr )`; that case is resolved by
//! saving the cursor and backtracking when the condition reading fails.

use grace_ast::*;

pub mod tokenizer;

use tokenizer::{Token, TokenKind};

/// A syntax error with the byte offset of the offending token.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a complete Grace program.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenizer::tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let entry = parser.func_def()?;
    parser.expect(TokenKind::Eof)?;
    Ok(Program { entry })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_second(&self) -> &TokenKind {
        let i = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].offset
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.peek() == &kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                kind.describe(),
                self.peek().describe()
            )))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            TokenKind::Ident(_) => match self.advance() {
                TokenKind::Ident(name) => Ok(name),
                _ => unreachable!(),
            },
            other => Err(self.error(format!("expected identifier, found {}", other.describe()))),
        }
    }

    fn expect_int_const(&mut self) -> Result<u64, ParseError> {
        match self.peek() {
            TokenKind::IntConst(_) => match self.advance() {
                TokenKind::IntConst(n) => Ok(n),
                _ => unreachable!(),
            },
            other => Err(self.error(format!(
                "expected integer constant, found {}",
                other.describe()
            ))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError { message: message.into(), offset: self.offset() }
    }

    // --- declarations ---

    fn func_def(&mut self) -> Result<FuncDef, ParseError> {
        let header = self.header()?;
        self.func_def_with_header(header)
    }

    /// Parses the local definitions and body of a function whose header has
    /// already been consumed; a `fun` header followed by `;` is a forward
    /// declaration, anything else continues as a nested definition.
    fn func_def_with_header(&mut self, header: Header) -> Result<FuncDef, ParseError> {
        let mut locals = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Var => locals.push(LocalDef::Var(self.var_def()?)),
                TokenKind::Fun => {
                    let inner = self.header()?;
                    if self.eat(&TokenKind::Semicolon) {
                        locals.push(LocalDef::Decl(inner));
                    } else {
                        let nested = self.func_def_with_header(inner)?;
                        locals.push(LocalDef::Func(nested));
                    }
                }
                _ => break,
            }
        }
        let body = self.block()?;
        Ok(FuncDef { header, locals, body })
    }

    fn header(&mut self) -> Result<Header, ParseError> {
        self.expect(TokenKind::Fun)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.peek() != &TokenKind::RParen {
            params.push(self.fpar_def()?);
            while self.eat(&TokenKind::Semicolon) {
                params.push(self.fpar_def()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let ret = self.ret_type()?;
        Ok(Header { name, params, ret })
    }

    fn fpar_def(&mut self) -> Result<FparDef, ParseError> {
        let by_ref = self.eat(&TokenKind::Ref);
        let mut names = vec![self.expect_ident()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        self.expect(TokenKind::Colon)?;
        let ty = self.fpar_type()?;
        Ok(FparDef { by_ref, names, ty })
    }

    fn data_type(&mut self) -> Result<DataType, ParseError> {
        match self.peek() {
            TokenKind::Int => {
                self.advance();
                Ok(DataType::Int)
            }
            TokenKind::Char => {
                self.advance();
                Ok(DataType::Char)
            }
            other => Err(self.error(format!(
                "expected `int` or `char`, found {}",
                other.describe()
            ))),
        }
    }

    fn fpar_type(&mut self) -> Result<FparType, ParseError> {
        let data = self.data_type()?;
        let mut unknown_first = false;
        if self.peek() == &TokenKind::LBracket && self.peek_second() == &TokenKind::RBracket {
            self.advance();
            self.advance();
            unknown_first = true;
        }
        let mut dims = Vec::new();
        while self.eat(&TokenKind::LBracket) {
            dims.push(self.expect_int_const()?);
            self.expect(TokenKind::RBracket)?;
        }
        Ok(FparType { data, unknown_first, dims })
    }

    fn var_type(&mut self) -> Result<GraceType, ParseError> {
        let data = self.data_type()?;
        let mut dims = Vec::new();
        while self.eat(&TokenKind::LBracket) {
            dims.push(self.expect_int_const()?);
            self.expect(TokenKind::RBracket)?;
        }
        Ok(GraceType { data, dims })
    }

    fn ret_type(&mut self) -> Result<RetType, ParseError> {
        if self.eat(&TokenKind::Nothing) {
            Ok(RetType::Nothing)
        } else {
            Ok(RetType::Data(self.data_type()?))
        }
    }

    fn var_def(&mut self) -> Result<VarDef, ParseError> {
        self.expect(TokenKind::Var)?;
        let mut names = vec![self.expect_ident()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        self.expect(TokenKind::Colon)?;
        let ty = self.var_type()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(VarDef { names, ty })
    }

    // --- statements ---

    fn block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while self.peek() != &TokenKind::RBrace {
            if self.peek() == &TokenKind::Eof {
                return Err(self.error("unterminated block: expected `}`"));
            }
            stmts.push(self.stmt()?);
        }
        self.advance();
        Ok(Block { stmts })
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty)
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.block()?)),
            TokenKind::If => {
                self.advance();
                let cond = self.cond()?;
                self.expect(TokenKind::Then)?;
                let then_branch = Box::new(self.stmt()?);
                let else_branch = if self.eat(&TokenKind::Else) {
                    Some(Box::new(self.stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If { cond, then_branch, else_branch })
            }
            TokenKind::While => {
                self.advance();
                let cond = self.cond()?;
                self.expect(TokenKind::Do)?;
                let body = Box::new(self.stmt()?);
                Ok(Stmt::While(cond, body))
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.peek() == &TokenKind::Semicolon {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return(value))
            }
            TokenKind::Ident(_) if self.peek_second() == &TokenKind::LParen => {
                let call = self.func_call()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Call(call))
            }
            TokenKind::Ident(_) | TokenKind::StringConst(_) => {
                let target = self.l_value()?;
                self.expect(TokenKind::Assign)?;
                let value = self.expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Assign(target, value))
            }
            other => Err(self.error(format!("expected statement, found {}", other.describe()))),
        }
    }

    fn func_call(&mut self) -> Result<FuncCall, ParseError> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.peek() != &TokenKind::RParen {
            args.push(self.expr()?);
            while self.eat(&TokenKind::Comma) {
                args.push(self.expr()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(FuncCall { name, args })
    }

    fn l_value(&mut self) -> Result<LValue, ParseError> {
        let mut lv = match self.peek() {
            TokenKind::Ident(_) => LValue::Ident(self.expect_ident()?),
            TokenKind::StringConst(_) => match self.advance() {
                TokenKind::StringConst(bytes) => LValue::Str(bytes),
                _ => unreachable!(),
            },
            other => Err(self.error(format!(
                "expected l-value, found {}",
                other.describe()
            )))?,
        };
        while self.eat(&TokenKind::LBracket) {
            let index = self.expr()?;
            self.expect(TokenKind::RBracket)?;
            lv = LValue::Index(Box::new(lv), Box::new(index));
        }
        Ok(lv)
    }

    // --- expressions ---

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Div => BinOp::Div,
                TokenKind::Mod => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.factor()?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            TokenKind::Plus => {
                self.advance();
                Ok(Expr::Unary(UnOp::Plus, Box::new(self.factor()?)))
            }
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::Unary(UnOp::Minus, Box::new(self.factor()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            TokenKind::IntConst(_) => Ok(Expr::IntLit(self.expect_int_const()?)),
            TokenKind::CharConst(_) => match self.advance() {
                TokenKind::CharConst(c) => Ok(Expr::CharLit(c)),
                _ => unreachable!(),
            },
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(_) if self.peek_second() == &TokenKind::LParen => {
                Ok(Expr::Call(self.func_call()?))
            }
            TokenKind::Ident(_) | TokenKind::StringConst(_) => {
                Ok(Expr::LValue(self.l_value()?))
            }
            other => Err(self.error(format!(
                "expected expression, found {}",
                other.describe()
            ))),
        }
    }

    // --- conditions ---

    fn cond(&mut self) -> Result<Cond, ParseError> {
        let mut lhs = self.and_cond()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.and_cond()?;
            lhs = Cond::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_cond(&mut self) -> Result<Cond, ParseError> {
        let mut lhs = self.not_cond()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.not_cond()?;
            lhs = Cond::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_cond(&mut self) -> Result<Cond, ParseError> {
        if self.eat(&TokenKind::Not) {
            Ok(Cond::Not(Box::new(self.not_cond()?)))
        } else {
            self.atom_cond()
        }
    }

    fn atom_cond(&mut self) -> Result<Cond, ParseError> {
        // `(` may open either a parenthesized condition or the left
        // expression of a relation; try the condition reading first and
        // rewind on failure.
        if self.peek() == &TokenKind::LParen {
            let saved = self.pos;
            self.advance();
            if let Ok(inner) = self.cond() {
                if self.eat(&TokenKind::RParen) {
                    return Ok(inner);
                }
            }
            self.pos = saved;
        }
        let lhs = self.expr()?;
        let op = match self.peek() {
            TokenKind::Eq => RelOp::Eq,
            TokenKind::Hash => RelOp::Neq,
            TokenKind::Less => RelOp::Lt,
            TokenKind::Greater => RelOp::Gt,
            TokenKind::Leq => RelOp::Leq,
            TokenKind::Geq => RelOp::Geq,
            other => {
                return Err(self.error(format!(
                    "expected relational operator, found {}",
                    other.describe()
                )))
            }
        };
        self.advance();
        let rhs = self.expr()?;
        Ok(Cond::Rel(Box::new(lhs), op, Box::new(rhs)))
    }
}
