//! Shared helpers for the integration test suite.
//!
//! `gen_ir_for_source` runs the in-process pipeline (parse, analyse, lower)
//! and returns the textual IR so tests can inspect it without spawning the
//! driver binary. Diagnostics are suppressed for the duration so that
//! expected-failure cases keep stderr clean.

use anyhow::Result;
use inkwell::context::Context;

use gracec::codegen::CodeGen;

#[allow(dead_code)]
pub fn gen_ir_for_source(src: &str) -> Result<String> {
    let _guard = gracec::diagnostics::suppress();

    let program = grace_parser::parse_program(src)
        .map_err(|e| anyhow::anyhow!("parse error: {}", e.message))?;
    gracec::sema::analyze(&program).map_err(|d| anyhow::anyhow!(d.message.clone()))?;

    let context = Context::create();
    let codegen = CodeGen::new(&context, "test_module");
    codegen
        .lower_program(&program)
        .map_err(|d| anyhow::anyhow!(d.message.clone()))?;
    Ok(codegen.module.print_to_string().to_string())
}

/// Runs parsing and semantic analysis only; returns the first diagnostic
/// message on failure.
#[allow(dead_code)]
pub fn analyze_source(src: &str) -> Result<(), String> {
    let _guard = gracec::diagnostics::suppress();

    let program = grace_parser::parse_program(src).map_err(|e| e.message)?;
    gracec::sema::analyze(&program).map_err(|d| d.message.clone())
}
