use thiserror::Error;

use crate::span::SourceRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lex,
    Parse,
    Analysis,
    Codegen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    UnresolvedSymbol,
    DuplicateDeclaration,
    TypeMismatch,
    Arity,
    TriggerCapability,
    // e.g. break outside a loop
    MisplacedStatement,
    // Output exceeds a fixed field of the bytecode format.
    LimitExceeded,
    // Id-provider miss during generation; the only unconditionally fatal
    // kind, since no instruction can be produced without a resolved id.
    UnknownScriptReference,
}

impl ErrorKind {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::UnknownScriptReference)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{phase:?} error at {range}: {message}")]
pub struct CompileError {
    pub phase: Phase,
    pub kind: ErrorKind,
    pub range: SourceRange,
    pub message: String,
}

impl CompileError {
    pub fn new(phase: Phase, kind: ErrorKind, range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            phase,
            kind,
            range,
            message: message.into(),
        }
    }
}

/// Accumulates diagnostics so one pass reports many findings; the
/// `fail_fast` variant surfaces the first report as an immediate `Err`.
#[derive(Debug, Default)]
pub struct Reporter {
    errors: Vec<CompileError>,
    fail_fast: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_fast() -> Self {
        Self {
            errors: Vec::new(),
            fail_fast: true,
        }
    }

    pub fn report(&mut self, error: CompileError) -> Result<(), CompileError> {
        if self.fail_fast {
            return Err(error);
        }
        self.errors.push(error);
        Ok(())
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<CompileError> {
        std::mem::take(&mut self.errors)
    }
}
