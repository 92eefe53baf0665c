//! Definition records for the semantic passes.
//!
//! One [`Defn`] exists per `shared` definition across all input files. The
//! records are created from collector output, then mutated in place by the
//! resolver (type bindings, subclass lists), the cycle checker (marker
//! flags), the layout engine (size, alignment, field map, class ids) and the
//! vtable builder; afterwards they are read-only for emission.

use strum_macros::EnumIs;

use crate::ast::{DefnAst, DefnKindAst, MethodAst, MethodKind, PropQualifier, PropertyAst};
use crate::error::{At, CompileError};
use crate::file::SourceFile;
use crate::sema::context::DefnLocation;
use crate::sema::types::{FieldMap, TypeRef};
use crate::sema::vtable::VirtualMethod;

/// A property declaration plus its resolved type binding
#[derive(Debug, Clone)]
pub struct Prop<'base> {
    /// 1-based source line of the declaration
    pub line: u32,
    /// Field name
    pub name: &'base str,
    /// Access qualifier
    pub qualifier: PropQualifier,
    /// True for `array(T)` declarations
    pub is_array: bool,
    /// Referenced type name as written
    pub type_name: &'base str,
    /// Bound type, set by the reference resolver
    pub ty: Option<TypeRef>,
}

impl Prop<'_> {
    fn from_ast<'base>(ast: &PropertyAst<'base>) -> Prop<'base> {
        Prop {
            line: ast.line,
            name: ast.name,
            qualifier: ast.qualifier,
            is_array: ast.is_array,
            type_name: ast.type_name,
            ty: None,
        }
    }

    /// Returns the resolved binding, failing when the resolver has not run
    pub fn bound(&self) -> Result<TypeRef, CompileError> {
        self.ty
            .ok_or_else(|| CompileError::internal(format!("property '{}' used before resolution", self.name)))
    }
}

/// Class-specific definition state
#[derive(Debug, Clone, Default)]
pub struct ClassDefn<'base> {
    /// Base class name for `extends`, as written
    pub base_name: Option<&'base str>,
    /// Resolved base location
    pub base: Option<DefnLocation>,
    /// `>`-joined ancestor chain ending with this class's own name
    pub dotted_name: String,
    /// 28-bit class identifier derived from the dotted name
    pub class_id: u32,
    /// Direct subclasses in registration order
    pub subclasses: Vec<DefnLocation>,
    /// Virtual dispatch tables, one per visible virtual method name
    pub vtable: Vec<VirtualMethod>,
}

/// Struct-specific definition state
#[derive(Debug, Clone, Copy, Default)]
pub struct StructDefn {
    /// True when the struct declares a `get` accessor
    pub has_get: bool,
    /// True when the struct declares a `set` accessor
    pub has_set: bool,
}

/// Kind-specific arm of a definition
#[derive(Debug, Clone, EnumIs)]
pub enum DefnKind<'base> {
    /// A `shared class`
    Class(ClassDefn<'base>),
    /// A `shared struct`
    Struct(StructDefn),
}

/// One user-defined type
#[derive(Debug, Clone)]
pub struct Defn<'base> {
    /// Declared name
    pub name: &'base str,
    /// File the definition was written in
    pub file: SourceFile,
    /// 1-based line of the opener
    pub line: u32,
    /// Index of the owning file in the input list
    pub file_index: usize,
    /// Insertion index into the owning file's retained line stream
    pub origin: usize,
    /// Declared properties in source order
    pub props: Vec<Prop<'base>>,
    /// Declared methods in source order
    pub methods: Vec<MethodAst<'base>>,
    /// Total size in bytes, set by layout
    pub size: u32,
    /// Alignment in bytes, set by layout
    pub align: u32,
    /// Field name → layout entry, set by layout
    pub map: FieldMap,
    /// Gray marker for cycle detection
    pub live: bool,
    /// Black marker for cycle detection
    pub checked: bool,
    /// True once the layout engine has processed this definition
    pub laid_out: bool,
    /// Class or struct arm
    pub kind: DefnKind<'base>,
}

impl<'base> Defn<'base> {
    /// Creates a definition record from collector output
    pub fn from_ast(ast: &DefnAst<'base>, file: SourceFile, file_index: usize) -> Self {
        let kind = match ast.kind {
            DefnKindAst::Class => DefnKind::Class(ClassDefn { base_name: ast.base_name, ..ClassDefn::default() }),
            DefnKindAst::Struct => DefnKind::Struct(StructDefn {
                has_get: ast.methods.iter().any(|m| m.kind.is_get()),
                has_set: ast.methods.iter().any(|m| m.kind.is_set()),
            }),
        };

        Defn {
            name: ast.name,
            file,
            line: ast.line,
            file_index,
            origin: ast.origin,
            props: ast.props.iter().map(Prop::from_ast).collect(),
            methods: ast.methods.clone(),
            size: 0,
            align: 0,
            map: FieldMap::new(),
            live: false,
            checked: false,
            laid_out: false,
            kind,
        }
    }

    /// The location of the definition opener, for diagnostics
    pub fn at(&self) -> At {
        At::line_of(self.file.clone(), self.line)
    }

    /// Returns the class arm, if this is a class
    pub fn as_class(&self) -> Option<&ClassDefn<'base>> {
        match &self.kind {
            DefnKind::Class(class) => Some(class),
            DefnKind::Struct(_) => None,
        }
    }

    /// Returns the mutable class arm, if this is a class
    pub fn as_class_mut(&mut self) -> Option<&mut ClassDefn<'base>> {
        match &mut self.kind {
            DefnKind::Class(class) => Some(class),
            DefnKind::Struct(_) => None,
        }
    }

    /// Returns the struct arm, if this is a struct
    pub fn as_struct(&self) -> Option<&StructDefn> {
        match &self.kind {
            DefnKind::Struct(strukt) => Some(strukt),
            DefnKind::Class(_) => None,
        }
    }

    /// Finds a declared method by kind and name
    pub fn find_method(&self, kind: MethodKind, name: &str) -> Option<&MethodAst<'base>> {
        self.methods.iter().find(|m| m.kind == kind && m.name == name)
    }

    /// True when this definition declares a virtual method with the name
    pub fn has_virtual(&self, name: &str) -> bool {
        self.find_method(MethodKind::Virtual, name).is_some()
    }
}
