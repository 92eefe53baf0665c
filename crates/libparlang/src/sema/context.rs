//! Translation context for the semantic passes.
//!
//! The context is the single owner of all definitions plus the registries the
//! passes build over them: the global name → definition mapping and the
//! class-identifier registry. One context is created per translation; there is
//! no process-wide state. Definitions reference each other exclusively through
//! [`DefnLocation`] indices into the context's table.

use indexmap::IndexMap;
use log::debug;

use crate::error::CompileError;
use crate::sema::defn::Defn;
use crate::sema::types::{PrimitiveType, TypeRef};

/// Index of a definition in the context's table
///
/// Locations are handed out by [`SemaContext::add_defn`] and are stable for
/// the lifetime of the translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefnLocation(pub usize);

/// The central state of one translation
#[derive(Debug, Default)]
pub struct SemaContext<'base> {
    /// Every definition across all input files, in registration order
    pub defns: Vec<Defn<'base>>,
    /// Global type registry: declared name → definition
    pub known_types: IndexMap<&'base str, DefnLocation>,
    /// Class-identifier registry: 28-bit id → owning class
    pub class_ids: IndexMap<u32, DefnLocation>,
}

impl<'base> SemaContext<'base> {
    /// Returns the definition at the given location
    pub fn get(&self, location: DefnLocation) -> &Defn<'base> {
        &self.defns[location.0]
    }

    /// Returns the definition at the given location, mutably
    pub fn get_mut(&mut self, location: DefnLocation) -> &mut Defn<'base> {
        &mut self.defns[location.0]
    }

    /// Looks a user type up by name
    pub fn lookup(&self, name: &str) -> Option<DefnLocation> {
        self.known_types.get(name).copied()
    }

    /// Resolves a written type name: primitives first, then user types
    pub fn resolve_type_name(&self, name: &str) -> Option<TypeRef> {
        if let Some(primitive) = PrimitiveType::by_name(name) {
            return Some(TypeRef::Primitive(primitive));
        }
        self.lookup(name).map(TypeRef::Defn)
    }

    /// Registers a definition, rejecting duplicate names
    pub fn add_defn(&mut self, defn: Defn<'base>) -> Result<DefnLocation, CompileError> {
        if self.known_types.contains_key(defn.name) {
            return Err(CompileError::duplicate_type(defn.name, defn.at()));
        }
        let location = DefnLocation(self.defns.len());
        debug!("registered type '{}' at {:?}", defn.name, location);
        self.known_types.insert(defn.name, location);
        self.defns.push(defn);
        Ok(location)
    }

    /// Iterates all definition locations in registration order
    pub fn locations(&self) -> impl Iterator<Item = DefnLocation> {
        (0..self.defns.len()).map(DefnLocation)
    }
}
