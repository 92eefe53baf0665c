//! Reference resolution for the Parlang translator.
//!
//! Third pass of the pipeline. Binds every class's base reference (recording
//! the subclass edge on the base as it goes) and every property's type
//! reference, and enforces the qualifier rule: `atomic`/`synchronic`
//! properties must reference an atomic integer primitive.

use log::debug;

use crate::ast::PropQualifier;
use crate::error::{At, CompileError};
use crate::sema::context::{DefnLocation, SemaContext};
use crate::sema::types::TypeRef;

/// Binds base classes and property types across the whole context
pub fn resolve(context: &mut SemaContext<'_>) -> Result<(), CompileError> {
    for location in context.locations().collect::<Vec<_>>() {
        resolve_base(context, location)?;
        resolve_props(context, location)?;
    }
    Ok(())
}

/// Binds the `extends` reference of one definition, if any
fn resolve_base(context: &mut SemaContext<'_>, location: DefnLocation) -> Result<(), CompileError> {
    let defn = context.get(location);
    let Some(class) = defn.as_class() else { return Ok(()) };
    let Some(base_name) = class.base_name else { return Ok(()) };

    let name = defn.name;
    let at = defn.at();
    let Some(base_location) = context.lookup(base_name) else {
        return Err(CompileError::unknown_base(base_name, name, at));
    };
    if !context.get(base_location).kind.is_class() {
        return Err(CompileError::not_a_class(base_name, name, at));
    }

    debug!("class '{name}' extends '{base_name}'");
    if let Some(class) = context.get_mut(location).as_class_mut() {
        class.base = Some(base_location);
    }
    if let Some(base) = context.get_mut(base_location).as_class_mut() {
        base.subclasses.push(location);
    }
    Ok(())
}

/// Binds the property types of one definition
fn resolve_props(context: &mut SemaContext<'_>, location: DefnLocation) -> Result<(), CompileError> {
    for index in 0..context.get(location).props.len() {
        let defn = context.get(location);
        let prop = &defn.props[index];
        let (prop_name, type_name, qualifier, line) = (prop.name, prop.type_name, prop.qualifier, prop.line);
        let file = defn.file.clone();

        let Some(ty) = context.resolve_type_name(type_name) else {
            return Err(CompileError::unknown_type(type_name, At::line_of(file, line)));
        };

        if qualifier != PropQualifier::None {
            let atomic = matches!(ty, TypeRef::Primitive(primitive) if primitive.is_atomic());
            if !atomic {
                return Err(CompileError::qualifier(prop_name, type_name, At::line_of(file, line)));
            }
        }

        context.get_mut(location).props[index].ty = Some(ty);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::CompileError;
    use crate::file::SourceFile;
    use crate::nom_tools::State;
    use crate::parser;
    use crate::sema;

    fn build(code: &str) -> Result<(), CompileError> {
        let state = State::new(SourceFile::new(vec!["<memory>".into()], code.to_string()));
        let file = parser::parse(&state)?;
        sema::build(std::slice::from_ref(&file)).map(|_| ())
    }

    #[test]
    fn unknown_base_fails() {
        let error = build("shared class B extends Missing {\n  x : int32\n} end\n").unwrap_err();
        assert!(matches!(error, CompileError::UnknownBase(_)));
    }

    #[test]
    fn extending_a_struct_fails() {
        let code = "shared struct S {\n  x : int32\n} end\nshared class C extends S {\n} end\n";
        let error = build(code).unwrap_err();
        assert!(matches!(error, CompileError::NotAClass(_)));
    }

    #[test]
    fn unknown_property_type_fails() {
        let error = build("shared class C {\n  p : Missing\n} end\n").unwrap_err();
        assert!(matches!(error, CompileError::UnknownType(_)));
        assert_eq!(error.at().unwrap().line, 2);
    }

    #[test]
    fn qualifier_requires_atomic_primitive() {
        let error = build("shared class C {\n  f : atomic float32\n} end\n").unwrap_err();
        assert!(matches!(error, CompileError::Qualifier(_)));

        let error = build("shared struct S {\n  x : int32\n} end\nshared class C {\n  s : synchronic S\n} end\n").unwrap_err();
        assert!(matches!(error, CompileError::Qualifier(_)));
    }

    #[test]
    fn qualified_integer_properties_resolve() {
        build("shared class C {\n  hits : atomic uint32\n  gate : synchronic int32\n} end\n").unwrap();
    }
}
