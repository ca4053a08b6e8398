//! Command-line driver for the Grace compiler.
//!
//! Reads one Grace source from the given path (or standard input), writes
//! the LLVM IR module to standard output and diagnostics to standard error.
//! Exits 0 on success and 1 on any parse, semantic or internal error.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "gracec", version, about = "Grace compiler emitting LLVM IR")]
struct Cli {
    /// Source file to compile; reads standard input when omitted
    file: Option<PathBuf>,

    /// Run the aggressive whole-module pipeline as well
    #[arg(short = 'O', long = "optimize")]
    optimize: bool,
}

fn main() {
    let cli = Cli::parse();
    let options = gracec::CompileOptions { src_file: cli.file, optimize: cli.optimize };
    match gracec::compile(options) {
        Ok(ir) => print!("{}", ir),
        Err(_) => std::process::exit(1),
    }
}
