//! Parlang Translator Library
//!
//! This is the core library of the Parlang source-to-source translator.
//! Parlang is a small dialectal extension of a dynamically-typed, C-family
//! scripting language that adds shared-memory, fixed-layout aggregate types —
//! classes with single inheritance and virtual dispatch, and structs with
//! by-value semantics — over a flat typed byte buffer. The translator lowers
//! annotated source files to plain host-language source: constant records,
//! inline typed-view accesses at computed offsets, class-id keyed dispatch
//! tables and allocator calls.
//!
//! # Overview
//!
//! Translation is a multi-pass pipeline over in-memory sources:
//!
//! 1. **Collection**: extract `shared` definitions, retain host lines
//! 2. **Analysis**: registry, reference resolution, cycle checks, layout,
//!    vtables
//! 3. **Emission**: self-accessor expansion, paste-up, global macro
//!    expansion
//!
//! # Architecture
//!
//! - [`parser`]: line-oriented lexical collector built on nom
//! - [`ast`]: collected definitions and retained line streams
//! - [`sema`]: the analysis passes and the translation context
//! - [`emit`]: the emission passes and the literal-aware scanner
//! - [`error`]: diagnostics and terminal reporting
//! - [`file`]: source file handling
//! - [`nom_tools`]: parser combinator utilities built on nom
//!
//! # Usage
//!
//! The main entry point is [`translate`]; the pipeline stages are also
//! exposed individually as [`process_file`], [`sema::build`] and
//! [`emit::render`]:
//!
//! ```ignore
//! use libparlang::{translate, file::SourceFile, nom_tools::State};
//!
//! let source = SourceFile::new(vec!["demo.js.parlang".into()], code);
//! let states = vec![State::new(source)];
//! let outputs = translate(&states)?;
//! ```
//!
//! # Error Handling
//!
//! All failures are [`CompileError`] values carrying `file:line` locations;
//! the first error aborts the translation with no partial output.

use ast::FileAst;
pub use emit::Translation;
pub use error::CompileError;
use nom_tools::State;

pub mod ast;
pub mod emit;
pub mod error;
pub mod file;
pub mod nom_tools;
pub mod parser;
pub mod sema;

#[cfg(test)]
mod tests;

/// Collects one source file into retained lines and extracted definitions
///
/// This is the first stage of the pipeline, exposed for callers that want to
/// inspect collector output before analysis.
///
/// # Errors
/// Returns a syntax [`CompileError`] for malformed annotated lines.
pub fn process_file<'base>(state: &'base State) -> Result<FileAst<'base>, CompileError> {
    parser::parse(state)
}

/// Translates a batch of source files
///
/// Runs the full pipeline: collection per file, global analysis across all
/// files, then emission per file. Outputs parallel the inputs.
///
/// # Arguments
/// * `states` - One parser state per input file, in supply order
///
/// # Errors
/// Returns the first [`CompileError`] any pass produces; there is no partial
/// output.
pub fn translate<'base>(states: &'base [State]) -> Result<Vec<Translation>, CompileError> {
    let mut files = Vec::with_capacity(states.len());
    for state in states {
        files.push(parser::parse(state)?);
    }
    let context = sema::build(&files)?;
    emit::render(&context, &files)
}
