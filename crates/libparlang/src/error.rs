//! Error handling and reporting for the Parlang translator.
//!
//! Every failure in the pipeline is a [`CompileError`]: an enum of boxed
//! diagnostic structs, one per failure shape, grouped by the taxonomy the
//! translator enforces — syntax, reference, recursion, identity and internal
//! errors. Location-bearing variants carry the source file, the 1-based line
//! and the byte range of the offending line, and display as
//! `<file>:<line>: <message>`.
//!
//! The first error aborts the translation; there is no partial output. The
//! only non-fatal diagnostics in the system are the macro expander's rejected
//! matches, which go through `log::warn!` instead of this module.

use std::ops::Range;

use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFiles,
    term::{
        self,
        termcolor::{ColorChoice, StandardStream},
    },
};

use crate::file::SourceFile;

/// File extension for Parlang dialect source files
pub static PARLANG_LANG_EXT: &str = "parlang";

/// A source location attached to a diagnostic
///
/// Displays as `<file>:<line>`, the prefix every location-bearing error
/// message starts with.
#[derive(Debug, Clone)]
pub struct At {
    /// The file the error was found in
    pub file: SourceFile,
    /// 1-based line number
    pub line: u32,
    /// Byte range of the offending line within the file
    pub position: Range<usize>,
}

impl At {
    /// Creates a location from a file, a 1-based line and a byte range
    pub fn new(file: SourceFile, line: u32, position: Range<usize>) -> Self {
        Self { file, line, position }
    }

    /// Creates a location covering the given 1-based line of the file
    pub fn line_of(file: SourceFile, line: u32) -> Self {
        let code = file.code.clone();
        let mut pos = 0usize;
        let mut line_no = 0u32;
        for chunk in code.split_inclusive('\n') {
            line_no += 1;
            if line_no == line {
                let body = chunk
                    .strip_suffix('\n')
                    .map(|body| body.strip_suffix('\r').unwrap_or(body))
                    .unwrap_or(chunk);
                return Self::new(file, line, pos..pos + body.len());
            }
            pos += chunk.len();
        }
        let end = code.len();
        Self::new(file, line, end..end)
    }
}

impl std::fmt::Display for At {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display_name(), self.line)
    }
}

/// Syntax error: malformed opener, unrecognized line, unterminated definition
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: {message}")]
pub struct SyntaxError {
    /// Human-readable description of the malformed construct
    pub message: String,
    /// Where the bad line lives
    pub at: At,
}

/// Reference error: a property names a type that does not exist
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: unknown type '{type_name}'")]
pub struct UnknownTypeError {
    /// The name that failed to resolve
    pub type_name: String,
    /// Where the reference was written
    pub at: At,
}

/// Reference error: a class extends a base that does not exist
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: class '{class}' extends unknown base '{base}'")]
pub struct UnknownBaseError {
    /// The missing base-class name
    pub base: String,
    /// The extending class
    pub class: String,
    /// Where the class was declared
    pub at: At,
}

/// Reference error: a class extends a definition that is not a class
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: class '{class}' extends '{base}' which is not a class")]
pub struct NotAClassError {
    /// The non-class base name
    pub base: String,
    /// The extending class
    pub class: String,
    /// Where the class was declared
    pub at: At,
}

/// Reference error: atomic/synchronic qualifier on a non-atomic type
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: property '{property}' is qualified but '{type_name}' is not an atomic integer type")]
pub struct QualifierError {
    /// The qualified property name
    pub property: String,
    /// The non-atomic type it references
    pub type_name: String,
    /// Where the property was declared
    pub at: At,
}

/// Recursion error: a struct contains itself by value
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: struct '{name}' contains itself by value")]
pub struct StructCycleError {
    /// First-encountered member of the cycle
    pub name: String,
    /// Where that struct was declared
    pub at: At,
}

/// Recursion error: a class inherits from itself
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: class '{name}' inherits from itself")]
pub struct ClassCycleError {
    /// First-encountered member of the cycle
    pub name: String,
    /// Where that class was declared
    pub at: At,
}

/// Identity error: two definitions share one name
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: type '{name}' is already defined")]
pub struct DuplicateTypeError {
    /// The duplicated name
    pub name: String,
    /// Where the second definition was declared
    pub at: At,
}

/// Identity error: two classes hash to the same 28-bit class identifier
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: class id {id:#x} of '{name}' collides with '{other}'")]
pub struct ClassIdCollisionError {
    /// The class whose layout detected the collision
    pub name: String,
    /// The class that already owns the identifier
    pub other: String,
    /// The colliding identifier
    pub id: u32,
    /// Where the colliding class was declared
    pub at: At,
}

/// Reference error: a `new` expression names an unknown type
#[derive(Debug, Clone, thiserror::Error)]
#[error("{at}: 'new' applied to unknown type '{type_name}'")]
pub struct UnknownNewTargetError {
    /// The name the allocation expression used
    pub type_name: String,
    /// Where the expression appeared in the pasted-up output
    pub at: At,
}

/// Internal error: a state the passes are supposed to make unreachable
#[derive(Debug, Clone, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the broken invariant
    pub message: String,
}

/// Every failure the translation pipeline can abort with
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// Malformed annotated source
    #[error(transparent)]
    Syntax(Box<SyntaxError>),
    /// Unknown property type
    #[error(transparent)]
    UnknownType(Box<UnknownTypeError>),
    /// Unknown base class
    #[error(transparent)]
    UnknownBase(Box<UnknownBaseError>),
    /// Base is not a class
    #[error(transparent)]
    NotAClass(Box<NotAClassError>),
    /// Qualifier on a non-atomic type
    #[error(transparent)]
    Qualifier(Box<QualifierError>),
    /// Struct contains itself by value
    #[error(transparent)]
    StructCycle(Box<StructCycleError>),
    /// Class inherits from itself
    #[error(transparent)]
    ClassCycle(Box<ClassCycleError>),
    /// Duplicate type name
    #[error(transparent)]
    DuplicateType(Box<DuplicateTypeError>),
    /// Class identifier collision
    #[error(transparent)]
    ClassIdCollision(Box<ClassIdCollisionError>),
    /// `new` on an unknown type
    #[error(transparent)]
    UnknownNewTarget(Box<UnknownNewTargetError>),
    /// Broken internal invariant
    #[error(transparent)]
    Internal(Box<InternalError>),
}

impl CompileError {
    /// Creates a syntax error at the given location
    pub fn syntax(message: impl Into<String>, at: At) -> Self {
        CompileError::Syntax(SyntaxError { message: message.into(), at }.into())
    }

    /// Creates an unknown-type reference error
    pub fn unknown_type(type_name: impl Into<String>, at: At) -> Self {
        CompileError::UnknownType(UnknownTypeError { type_name: type_name.into(), at }.into())
    }

    /// Creates an unknown-base reference error
    pub fn unknown_base(base: impl Into<String>, class: impl Into<String>, at: At) -> Self {
        CompileError::UnknownBase(UnknownBaseError { base: base.into(), class: class.into(), at }.into())
    }

    /// Creates a non-class base reference error
    pub fn not_a_class(base: impl Into<String>, class: impl Into<String>, at: At) -> Self {
        CompileError::NotAClass(NotAClassError { base: base.into(), class: class.into(), at }.into())
    }

    /// Creates a qualifier error
    pub fn qualifier(property: impl Into<String>, type_name: impl Into<String>, at: At) -> Self {
        CompileError::Qualifier(QualifierError { property: property.into(), type_name: type_name.into(), at }.into())
    }

    /// Creates a struct-recursion error
    pub fn struct_cycle(name: impl Into<String>, at: At) -> Self {
        CompileError::StructCycle(StructCycleError { name: name.into(), at }.into())
    }

    /// Creates a class-recursion error
    pub fn class_cycle(name: impl Into<String>, at: At) -> Self {
        CompileError::ClassCycle(ClassCycleError { name: name.into(), at }.into())
    }

    /// Creates a duplicate-type error
    pub fn duplicate_type(name: impl Into<String>, at: At) -> Self {
        CompileError::DuplicateType(DuplicateTypeError { name: name.into(), at }.into())
    }

    /// Creates a class-id collision error
    pub fn class_id_collision(name: impl Into<String>, other: impl Into<String>, id: u32, at: At) -> Self {
        CompileError::ClassIdCollision(ClassIdCollisionError { name: name.into(), other: other.into(), id, at }.into())
    }

    /// Creates an unknown `new` target error
    pub fn unknown_new_target(type_name: impl Into<String>, at: At) -> Self {
        CompileError::UnknownNewTarget(UnknownNewTargetError { type_name: type_name.into(), at }.into())
    }

    /// Creates an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal(InternalError { message: message.into() }.into())
    }

    /// Returns the source location attached to this error, if any
    pub fn at(&self) -> Option<&At> {
        match self {
            CompileError::Syntax(error) => Some(&error.at),
            CompileError::UnknownType(error) => Some(&error.at),
            CompileError::UnknownBase(error) => Some(&error.at),
            CompileError::NotAClass(error) => Some(&error.at),
            CompileError::Qualifier(error) => Some(&error.at),
            CompileError::StructCycle(error) => Some(&error.at),
            CompileError::ClassCycle(error) => Some(&error.at),
            CompileError::DuplicateType(error) => Some(&error.at),
            CompileError::ClassIdCollision(error) => Some(&error.at),
            CompileError::UnknownNewTarget(error) => Some(&error.at),
            CompileError::Internal(_) => None,
        }
    }
}

/// Trait for rendering compile errors to the user
pub trait ReportGenerator {
    /// Render a formatted report for the given error
    fn generate(error: &CompileError);
}

/// Error report generator using the `codespan-reporting` library
///
/// Prints the diagnostic message (which already carries the `file:line:`
/// prefix) and, when the error has a source location, a labeled snippet of
/// the offending line.
pub struct CodeSpanReportGenerator;

impl ReportGenerator for CodeSpanReportGenerator {
    fn generate(error: &CompileError) {
        let mut files = SimpleFiles::new();
        let mut diagnostic: Diagnostic<usize> = Diagnostic::error().with_message(error.to_string());

        if let Some(at) = error.at() {
            let file_id = files.add(at.file.display_name(), at.file.code().to_string());
            diagnostic = diagnostic.with_labels(vec![Label::primary(file_id, at.position.clone())]);
        }

        let writer = StandardStream::stderr(ColorChoice::Auto);
        let config = term::Config::default();
        if term::emit(&mut writer.lock(), &config, &files, &diagnostic).is_err() {
            eprintln!("{error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::file::SourceFile;

    use super::{At, CompileError};

    #[test]
    fn location_prefix_format() {
        let file = SourceFile::new(vec!["demo.js.parlang".into()], "shared class ???".to_string());
        let error = CompileError::syntax("malformed definition opener", At::new(file, 1, 0..16));
        assert_eq!(error.to_string(), "demo.js.parlang:1: malformed definition opener");
    }

    #[test]
    fn internal_errors_have_no_location() {
        let error = CompileError::internal("log2 of non-positive value");
        assert!(error.at().is_none());
        assert_eq!(error.to_string(), "internal error: log2 of non-positive value");
    }
}
