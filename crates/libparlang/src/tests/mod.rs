//! Integration tests for the translation pipeline
//!
//! These tests drive the translator end-to-end — collection, analysis and
//! emission — and verify the macro expander's concrete output forms.

mod expander;
mod pipeline;

use crate::file::SourceFile;
use crate::nom_tools::State;
use crate::sema::{self, SemaContext};

/// Builds an analyzed context from one in-memory source, leaking the source
/// so the borrowed context can be returned from a helper
pub(crate) fn analyzed(code: &str) -> SemaContext<'static> {
    let state: &'static State = Box::leak(Box::new(State::new(SourceFile::new(vec!["<memory>".into()], code.to_string()))));
    let file = crate::parser::parse(state).unwrap();
    sema::build(&[file]).unwrap()
}
