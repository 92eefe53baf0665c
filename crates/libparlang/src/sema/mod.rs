//! Semantic passes for the Parlang translator.
//!
//! This module turns collector output into a fully analyzed translation
//! context, running passes 2–6 of the pipeline in dependency order:
//!
//! 1. **Registry** — merge every file's definitions into the global
//!    name→definition table, rejecting duplicates
//! 2. **Reference resolution** ([`resolver`]) — bind base classes and
//!    property types, validate qualifiers
//! 3. **Cycle check** ([`cycle`]) — reject by-value struct recursion and
//!    inheritance cycles
//! 4. **Layout** ([`layout`]) — sizes, alignments, field maps, dotted names
//!    and class identifiers
//! 5. **Vtables** ([`vtable`]) — dispatch tables for every class
//!
//! The resulting [`SemaContext`] is read-only input for the emission passes.

use log::debug;

use crate::ast::FileAst;
use crate::error::CompileError;

pub mod context;
pub mod cycle;
pub mod defn;
pub mod layout;
pub mod resolver;
pub mod types;
pub mod vtable;

pub use context::{DefnLocation, SemaContext};
pub use defn::{ClassDefn, Defn, DefnKind, Prop, StructDefn};
pub use types::{FieldMap, MapEntry, PrimitiveType, TypeRef};
pub use vtable::VirtualMethod;

/// Runs every semantic pass over the collected files
///
/// # Arguments
/// * `files` - Collector output for every input file, in supply order
///
/// # Errors
/// Returns the first [`CompileError`] any pass produces; the context is
/// dropped and nothing is emitted.
pub fn build<'base>(files: &[FileAst<'base>]) -> Result<SemaContext<'base>, CompileError> {
    let mut context = SemaContext::default();

    for (file_index, file) in files.iter().enumerate() {
        for def in &file.defs {
            context.add_defn(defn::Defn::from_ast(def, file.file.clone(), file_index))?;
        }
    }
    debug!("registered {} definition(s) from {} file(s)", context.defns.len(), files.len());

    resolver::resolve(&mut context)?;
    cycle::check(&mut context)?;
    layout::layout(&mut context)?;
    vtable::build(&mut context)?;

    Ok(context)
}

#[cfg(test)]
mod tests {
    use crate::error::CompileError;
    use crate::file::SourceFile;
    use crate::nom_tools::State;
    use crate::parser;

    #[test]
    fn duplicate_names_across_files_fail() {
        let state_1 = State::new(SourceFile::new(vec!["one".into()], "shared class P {\n} end\n".to_string()));
        let state_2 = State::new(SourceFile::new(vec!["two".into()], "shared class P {\n} end\n".to_string()));
        let file_1 = parser::parse(&state_1).unwrap();
        let file_2 = parser::parse(&state_2).unwrap();
        let error = super::build(&[file_1, file_2]).unwrap_err();
        assert!(matches!(error, CompileError::DuplicateType(_)));
        assert_eq!(error.at().unwrap().file.display_name(), "two");
    }

    #[test]
    fn cross_file_references_resolve() {
        let state_1 = State::new(SourceFile::new(vec!["one".into()], "shared class Base {\n  x : int32\n} end\n".to_string()));
        let state_2 = State::new(SourceFile::new(vec!["two".into()], "shared class Sub extends Base {\n  y : int32\n} end\n".to_string()));
        let file_1 = parser::parse(&state_1).unwrap();
        let file_2 = parser::parse(&state_2).unwrap();
        let context = super::build(&[file_1, file_2]).unwrap();
        let sub = context.get(context.lookup("Sub").unwrap());
        assert_eq!(sub.size, 12);
        assert_eq!(sub.map.get("y").unwrap().offset, 8);
    }
}
