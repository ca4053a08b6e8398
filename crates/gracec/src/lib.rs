//! Whole-program compiler for the Grace language.
//!
//! Grace is a small statically-typed language with nested functions,
//! by-value and by-reference parameters, multi-dimensional arrays and a
//! small I/O runtime. The compiler reads one source file, checks it, and
//! emits a textual LLVM IR module that links against the runtime library
//! into an executable.
//!
//! Pipeline: parse (grace_parser) -> semantic analysis (`sema`) -> LLVM
//! lowering (`codegen`) -> IR text. Nested functions are compiled without
//! closures: every call allocates an explicit frame struct whose first slot
//! links to the lexically enclosing frame, and non-local variables are
//! reached by walking that chain.

use std::path::PathBuf;

pub mod builder;
pub mod codegen;
pub mod diagnostics;
pub mod runtime;
pub mod sema;
pub mod types;

/// Compilation options for the Grace compiler.
///
/// Separates the compiler proper from CLI argument parsing; the compiler
/// accepts explicit options rather than inspecting the environment.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Path of the source file; standard input when absent.
    pub src_file: Option<PathBuf>,
    /// Run the aggressive whole-module pipeline in addition to the standard
    /// per-function passes.
    pub optimize: bool,
}

impl CompileOptions {
    /// Options for compiling from standard input.
    pub fn new() -> Self {
        CompileOptions::default()
    }

    /// Options for compiling a source file.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        CompileOptions { src_file: Some(path.into()), optimize: false }
    }
}

/// Compiles one Grace program with the given options.
///
/// This is the primary API for invoking the compiler programmatically. On
/// success the textual LLVM IR module is returned; on failure a diagnostic
/// has already been written to stderr.
pub fn compile(options: CompileOptions) -> anyhow::Result<String> {
    builder::compile_with_options(options)
}
