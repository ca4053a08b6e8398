//! Semantic-rule coverage: every class of offence the analyser rejects,
//! plus a few programs that must be accepted.

mod common;

use common::analyze_source;

fn expect_error(src: &str, needle: &str) {
    let err = analyze_source(src).unwrap_err();
    assert!(
        err.contains(needle),
        "expected error containing {:?}, got {:?}",
        needle,
        err
    );
}

#[test]
fn accepts_the_runtime_surface() {
    analyze_source(
        "fun prog() : nothing \
           var s : char[20]; \
           var n : int; \
         { readString(19, s); \
           n <- strlen(s); \
           writeInteger(n); \
           writeChar(chr(ascii('a') + 1)); \
           strcat(s, \"!\"); \
           if strcmp(s, \"done\") = 0 then writeString(s); }",
    )
    .unwrap();
}

#[test]
fn undeclared_identifier() {
    expect_error("fun prog() : nothing { x <- 1; }", "undeclared");
}

#[test]
fn variable_redeclaration() {
    expect_error(
        "fun prog() : nothing var x : int; var x : char; {}",
        "redeclaration",
    );
}

#[test]
fn shadowing_outer_names_is_allowed() {
    analyze_source(
        "fun prog() : nothing \
           var x : int; \
           fun inner() : nothing var x : char; { x <- 'a'; } \
         { x <- 1; inner(); }",
    )
    .unwrap();
}

#[test]
fn zero_array_dimension() {
    expect_error(
        "fun prog() : nothing var bad : int[0][4]; {}",
        "positive",
    );
}

#[test]
fn array_parameter_by_value() {
    expect_error(
        "fun prog() : nothing fun f(a : int[3]) : nothing {} {}",
        "by reference",
    );
    expect_error(
        "fun prog() : nothing fun f(a : int[]) : nothing {} {}",
        "by reference",
    );
}

#[test]
fn forward_declaration_owed_at_scope_close() {
    expect_error(
        "fun prog() : nothing fun f() : int; {}",
        "no definition",
    );
}

#[test]
fn forward_declaration_signature_mismatch() {
    expect_error(
        "fun prog() : nothing \
           fun f() : int; \
           fun f() : char { return 'a'; } \
         {}",
        "different signature",
    );
    expect_error(
        "fun prog() : nothing \
           fun f(n : int) : int; \
           fun f(n : char) : int { return 1; } \
         {}",
        "different signature",
    );
}

#[test]
fn definition_in_another_scope_does_not_settle_the_declaration() {
    expect_error(
        "fun prog() : nothing \
           fun g() : nothing \
             fun f() : int; \
           { f(); } \
           fun f() : int { return 1; } \
         {}",
        "no definition",
    );
}

#[test]
fn arity_mismatch() {
    expect_error(
        "fun prog() : nothing \
           fun f(a, b : int) : int { return a + b; } \
         { writeInteger(f(1)); }",
        "expects 2 argument(s)",
    );
}

#[test]
fn assignment_rules() {
    expect_error(
        "fun prog() : nothing var a : int[3]; var b : int[3]; { a <- b; }",
        "array",
    );
    expect_error(
        "fun prog() : nothing var c : char; { c <- 1; }",
        "mismatch",
    );
}

#[test]
fn index_must_be_int() {
    expect_error(
        "fun prog() : nothing var a : int[3]; { a['x'] <- 1; }",
        "index must be int",
    );
    expect_error(
        "fun prog() : nothing var x : int; { x[0] <- 1; }",
        "cannot index",
    );
}

#[test]
fn return_rules() {
    expect_error(
        "fun prog() : nothing { return 1; }",
        "returning nothing",
    );
    expect_error(
        "fun prog() : nothing fun f() : int { return; } {}",
        "must return a value",
    );
    expect_error(
        "fun prog() : nothing fun f() : int { return 'a'; } {}",
        "return type mismatch",
    );
}

#[test]
fn arithmetic_and_comparison_typing() {
    expect_error(
        "fun prog() : nothing var c : char; var x : int; { x <- c + 1; }",
        "arithmetic requires int",
    );
    expect_error(
        "fun prog() : nothing var c : char; var x : int; { if c = x then ; }",
        "scalar type",
    );
    expect_error(
        "fun prog() : nothing var x : int; { x <- -'a'; }",
        "unary sign",
    );
}

#[test]
fn calls_and_values_do_not_mix() {
    expect_error(
        "fun prog() : nothing var x : int; { x(); }",
        "not a function",
    );
    expect_error(
        "fun prog() : nothing var x : int; { x <- prog; }",
        "not a variable",
    );
    expect_error(
        "fun prog() : nothing \
           fun f() : nothing {} \
           var x : int; \
         { x <- f(); }",
        "returns nothing",
    );
}

#[test]
fn entry_function_takes_no_parameters() {
    expect_error(
        "fun prog(n : int) : nothing {}",
        "cannot take parameters",
    );
}

#[test]
fn string_literal_type_counts_the_terminator() {
    // "abcd" is char[5]; a char[5] actual fits a char[] formal
    analyze_source(
        "fun prog() : nothing var s : char[5]; { strcpy(s, \"abcd\"); }",
    )
    .unwrap();
    // but an int array does not
    expect_error(
        "fun prog() : nothing var s : int[5]; { writeString(s); }",
        "argument 1",
    );
}
