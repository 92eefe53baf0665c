//! Collected-definition AST for the Parlang translator.
//!
//! The lexical collector produces one [`FileAst`] per input file: the stream
//! of non-annotated lines retained verbatim, plus every `shared class` /
//! `shared struct` definition extracted from the file. Definitions borrow
//! their identifiers and body lines directly from the source buffer.

use strum_macros::EnumIs;

use crate::file::SourceFile;

/// A parsed input file: retained host-language lines plus extracted definitions
#[derive(Debug, Clone)]
pub struct FileAst<'base> {
    /// The file this AST was collected from
    pub file: SourceFile,
    /// Non-annotated lines, kept verbatim in source order
    pub lines: Vec<&'base str>,
    /// 1-based source line numbers parallel to `lines`
    pub line_nos: Vec<u32>,
    /// Extracted `shared` definitions in source order
    pub defs: Vec<DefnAst<'base>>,
}

/// Discriminates class definitions from struct definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum DefnKindAst {
    /// Reference type with a class-id slot, inheritance and virtual dispatch
    Class,
    /// By-value aggregate that is inlined into enclosing layouts
    Struct,
}

/// One `shared class` / `shared struct` definition as written in the source
#[derive(Debug, Clone)]
pub struct DefnAst<'base> {
    /// Class or struct
    pub kind: DefnKindAst,
    /// Declared type name
    pub name: &'base str,
    /// Base class name for `class X extends Y`
    pub base_name: Option<&'base str>,
    /// 1-based source line of the opener
    pub line: u32,
    /// Insertion index into the owning file's retained line stream
    pub origin: usize,
    /// Declared properties in source order
    pub props: Vec<PropertyAst<'base>>,
    /// Declared methods in source order
    pub methods: Vec<MethodAst<'base>>,
}

/// Property qualifier controlling the access primitives available on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropQualifier {
    /// Plain load/store access
    #[default]
    None,
    /// Sequentially-consistent atomic access
    Atomic,
    /// Atomic access plus wait/wake synchronic operations
    Synchronic,
}

/// One property declaration inside a definition
#[derive(Debug, Clone)]
pub struct PropertyAst<'base> {
    /// 1-based source line of the declaration
    pub line: u32,
    /// Field name
    pub name: &'base str,
    /// Access qualifier, `None` unless written
    pub qualifier: PropQualifier,
    /// True for `name : array(T)` declarations
    pub is_array: bool,
    /// Referenced type name as written
    pub type_name: &'base str,
}

/// Method kind: a named virtual method or one of the struct accessor forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum MethodKind {
    /// `method <name>(self…)` — dispatched through the class vtable
    Virtual,
    /// `get(self…)` — struct read accessor
    Get,
    /// `set(self…)` — struct write accessor
    Set,
    /// `copy(self…)` — struct copy accessor
    Copy,
}

/// One method declaration inside a definition
///
/// The first body line is the parameter-list fragment starting at `(` with
/// the `self` parameter; the remaining lines are the raw method body.
#[derive(Debug, Clone)]
pub struct MethodAst<'base> {
    /// 1-based source line of the opener
    pub line: u32,
    /// Virtual method or accessor kind
    pub kind: MethodKind,
    /// Method name; empty for get/set/copy accessors
    pub name: &'base str,
    /// Parameter fragment followed by the body lines
    pub body: Vec<&'base str>,
}

impl MethodAst<'_> {
    /// Returns the parameter-list fragment (the first body line)
    pub fn fragment(&self) -> &str {
        self.body.first().copied().unwrap_or("()")
    }

    /// Returns the body lines after the parameter fragment, with trailing
    /// blank lines trimmed
    pub fn trimmed_body(&self) -> &[&str] {
        let mut rest = self.body.get(1..).unwrap_or(&[]);
        while let Some((last, head)) = rest.split_last() {
            if last.trim().is_empty() {
                rest = head;
            } else {
                break;
            }
        }
        rest
    }
}
