//! The compilation pipeline.
//!
//! Strictly sequential: read source, parse, analyse, lower, optimize, print.
//! Diagnostics are rendered here, once, with the source text in hand; the
//! caller only learns that compilation failed.

use std::io::Read;

use anyhow::{Context as _, Result};
use inkwell::context::Context;

use crate::codegen::CodeGen;
use crate::diagnostics::{self, Diagnostic};
use crate::{sema, CompileOptions};

/// Runs the whole pipeline and returns the textual IR module.
pub fn compile_with_options(options: CompileOptions) -> Result<String> {
    let source = match &options.src_file {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("gracec: cannot read {}: {}", path.display(), e);
                anyhow::bail!("cannot read {}", path.display());
            }
        },
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read standard input")?;
            buf
        }
    };

    let program = match grace_parser::parse_program(&source) {
        Ok(program) => program,
        Err(e) => {
            let d = Diagnostic::parse(e.message.clone(), e.offset);
            diagnostics::emit_diagnostic(&d, Some(&source));
            anyhow::bail!("{}", e.message);
        }
    };

    if let Err(d) = sema::analyze(&program) {
        diagnostics::emit_diagnostic(&d, Some(&source));
        anyhow::bail!("{}", d.message);
    }

    let context = Context::create();
    let codegen = CodeGen::new(&context, "grace");
    if let Err(d) = codegen.lower_program(&program) {
        diagnostics::emit_diagnostic(&d, Some(&source));
        anyhow::bail!("{}", d.message);
    }

    if options.optimize {
        codegen.run_aggressive_pipeline();
    }

    Ok(codegen.module.print_to_string().to_string())
}
