//! Diagnostic reporting for the Grace compiler.
//!
//! Errors are carried through the pipeline as structured [`Diagnostic`]
//! values and rendered once, rustc-style, at the driver boundary. Rendering
//! emits colored messages to stderr with an optional source-line caret when
//! the byte offset of the offence is known.
//!
//! Diagnostic printing can be silenced with [`suppress`], which is used by
//! the test suite to keep expected-failure cases from cluttering stderr.

use std::sync::atomic::{AtomicBool, Ordering};

/// What produced the diagnostic; determines its tag in the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A syntax-level error from the lexer or parser.
    Parse,
    /// A violation of the language rules in the user program.
    Semantic,
    /// An internal invariant violated during lowering. These indicate a
    /// defect in the compiler itself, not in user code.
    Bug,
}

impl Kind {
    fn tag(self) -> &'static str {
        match self {
            Kind::Parse => "parse error",
            Kind::Semantic => "semantic error",
            Kind::Bug => "compiler bug",
        }
    }
}

/// Structured diagnostic container propagated through the pipeline.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: Kind,
    /// Primary message describing the offence.
    pub message: String,
    /// Optional additional context or suggestion.
    pub note: Option<String>,
    /// Optional byte offset into the source for caret highlighting.
    pub span_start: Option<usize>,
}

/// Result alias used by the semantic analyser and the code generator. The
/// diagnostic is boxed to keep the `Ok` path cheap.
pub type DiagnosticResult<T> = Result<T, Box<Diagnostic>>;

impl Diagnostic {
    pub fn parse(message: impl Into<String>, span_start: usize) -> Box<Self> {
        Box::new(Diagnostic {
            kind: Kind::Parse,
            message: message.into(),
            note: None,
            span_start: Some(span_start),
        })
    }

    pub fn semantic(message: impl Into<String>) -> Box<Self> {
        Box::new(Diagnostic {
            kind: Kind::Semantic,
            message: message.into(),
            note: None,
            span_start: None,
        })
    }

    pub fn semantic_with_note(message: impl Into<String>, note: impl Into<String>) -> Box<Self> {
        Box::new(Diagnostic {
            kind: Kind::Semantic,
            message: message.into(),
            note: Some(note.into()),
            span_start: None,
        })
    }

    pub fn bug(message: impl Into<String>) -> Box<Self> {
        Box::new(Diagnostic {
            kind: Kind::Bug,
            message: message.into(),
            note: None,
            span_start: None,
        })
    }
}

// Instruction-builder failures surface as compiler bugs; user programs can
// never trigger them.
impl From<inkwell::builder::BuilderError> for Box<Diagnostic> {
    fn from(e: inkwell::builder::BuilderError) -> Self {
        Diagnostic::bug(format!("instruction builder failure: {}", e))
    }
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Emits a diagnostic to stderr, with a source caret when both a span and
/// the source text are available.
pub fn emit_diagnostic(d: &Diagnostic, source: Option<&str>) {
    if !DIAGNOSTICS_ENABLED.load(Ordering::SeqCst) {
        return;
    }
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    eprintln!("{}{}{}: {}", red, d.kind.tag(), reset, d.message);

    if let (Some(span), Some(src)) = (d.span_start, source) {
        if let Some((line_no, col, line)) = locate(src, span) {
            eprintln!("{:4} | {}", line_no, line);
            let caret: String = " ".repeat(col);
            eprintln!("     | {}^", caret);
        }
    }

    if let Some(note) = &d.note {
        let blue = "\x1b[34m";
        eprintln!("{}note{}: {}", blue, reset, note);
    }
}

/// Maps a byte offset to a 1-based line number, 0-based column and the line
/// text.
fn locate(source: &str, offset: usize) -> Option<(usize, usize, &str)> {
    let mut byte_idx = 0usize;
    for (lineno, line) in source.lines().enumerate() {
        let line_len = line.len() + 1;
        if offset < byte_idx + line_len {
            return Some((lineno + 1, offset - byte_idx, line));
        }
        byte_idx += line_len;
    }
    // offset at end of input: point past the last line
    source
        .lines()
        .enumerate()
        .last()
        .map(|(lineno, line)| (lineno + 1, line.len(), line))
}

/// Temporarily silences diagnostic output. The returned guard restores the
/// previous state when dropped.
pub fn suppress() -> SuppressGuard {
    let prev = DIAGNOSTICS_ENABLED.swap(false, Ordering::SeqCst);
    SuppressGuard { prev }
}

/// RAII guard produced by [`suppress`].
pub struct SuppressGuard {
    prev: bool,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        DIAGNOSTICS_ENABLED.store(self.prev, Ordering::SeqCst);
    }
}
