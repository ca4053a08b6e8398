//! Grammar coverage over whole programs: escapes, comments, l-value
//! chains, precedence, and the parse errors the driver surfaces.

mod common;

use common::analyze_source;
use grace_ast::*;
use grace_parser::parse_program;

fn entry_of(src: &str) -> FuncDef {
    parse_program(src).unwrap().entry
}

#[test]
fn escapes_reach_the_ast_as_bytes() {
    let entry = entry_of(
        "fun prog() : nothing \
           var c : char; \
         { writeString(\"tab\\there\\n\"); c <- '\\x41'; c <- '\\''; }",
    );

    match &entry.body.stmts[0] {
        Stmt::Call(call) => match &call.args[0] {
            Expr::LValue(LValue::Str(bytes)) => {
                assert_eq!(bytes, b"tab\there\n");
            }
            other => panic!("unexpected argument {:?}", other),
        },
        other => panic!("unexpected statement {:?}", other),
    }
    assert!(matches!(
        &entry.body.stmts[1],
        Stmt::Assign(_, Expr::CharLit(0x41))
    ));
    assert!(matches!(
        &entry.body.stmts[2],
        Stmt::Assign(_, Expr::CharLit(b'\''))
    ));
}

#[test]
fn comments_are_invisible_to_the_grammar() {
    let entry = entry_of(
        "fun prog() : nothing $ trailing words\n\
           var x : int; $$ a block\n spanning lines $$ \
         { $ one more\n x <- 1; }",
    );
    assert_eq!(entry.locals.len(), 1);
    assert_eq!(entry.body.stmts.len(), 1);
}

#[test]
fn l_value_chains_nest_left() {
    let entry = entry_of(
        "fun prog() : nothing \
           var m : int[2][3][4]; \
           var x : int; \
         { x <- m[0][1][2]; \"abc\"[0] <- 'a'; }",
    );

    match &entry.body.stmts[0] {
        Stmt::Assign(_, Expr::LValue(LValue::Index(outer, _))) => match &**outer {
            LValue::Index(inner, _) => {
                assert!(matches!(&**inner, LValue::Index(_, _)));
            }
            other => panic!("unexpected l-value {:?}", other),
        },
        other => panic!("unexpected statement {:?}", other),
    }
    // a string literal is an l-value and indexes like any array
    match &entry.body.stmts[1] {
        Stmt::Assign(LValue::Index(base, _), Expr::CharLit(b'a')) => {
            assert!(matches!(&**base, LValue::Str(_)));
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn arithmetic_precedence_and_sign() {
    let entry = entry_of(
        "fun prog() : nothing var x : int; { x <- 1 + 2 * 3 - -4 mod 5; }",
    );
    // ((1 + (2 * 3)) - ((-4) mod 5))
    match &entry.body.stmts[0] {
        Stmt::Assign(_, Expr::Binary(lhs, BinOp::Sub, rhs)) => {
            match &**lhs {
                Expr::Binary(one, BinOp::Add, mul) => {
                    assert!(matches!(**one, Expr::IntLit(1)));
                    assert!(matches!(**mul, Expr::Binary(_, BinOp::Mul, _)));
                }
                other => panic!("unexpected lhs {:?}", other),
            }
            match &**rhs {
                Expr::Binary(neg, BinOp::Mod, _) => {
                    assert!(matches!(**neg, Expr::Unary(UnOp::Minus, _)));
                }
                other => panic!("unexpected rhs {:?}", other),
            }
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn condition_precedence() {
    // not binds tighter than and, and tighter than or
    let entry = entry_of(
        "fun prog() : nothing \
           var x : int; \
         { if not x = 0 and x < 9 or x = 42 then x <- 0; }",
    );
    match &entry.body.stmts[0] {
        Stmt::If { cond: Cond::Or(lhs, rhs), .. } => {
            match &**lhs {
                Cond::And(l, _) => assert!(matches!(&**l, Cond::Not(_))),
                other => panic!("unexpected lhs {:?}", other),
            }
            assert!(matches!(&**rhs, Cond::Rel(_, RelOp::Eq, _)));
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn dangling_else_binds_to_the_nearest_if() {
    let entry = entry_of(
        "fun prog() : nothing \
           var x : int; \
         { if x > 0 then if x > 1 then x <- 1; else x <- 2; }",
    );
    match &entry.body.stmts[0] {
        Stmt::If { else_branch: None, then_branch, .. } => {
            assert!(matches!(
                &**then_branch,
                Stmt::If { else_branch: Some(_), .. }
            ));
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn parse_errors_surface_through_the_pipeline() {
    for src in [
        // missing expression after `<-`
        "fun prog() : nothing { x <- ; }",
        // a bare expression is not a condition
        "fun prog() : nothing var x : int; { if x then ; }",
        // missing `:` in the header
        "fun prog() nothing {}",
        // unterminated block
        "fun prog() : nothing { x <- 1;",
        // unterminated block comment
        "fun prog() : nothing {} $$ dangling",
        // tokens after the program
        "fun prog() : nothing {} extra",
        // statements must end with `;`
        "fun prog() : nothing var x : int; { x <- 1 }",
    ] {
        assert!(analyze_source(src).is_err(), "accepted: {}", src);
    }
}
