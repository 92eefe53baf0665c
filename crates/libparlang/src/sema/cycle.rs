//! Recursion validation for the Parlang translator.
//!
//! Fourth pass of the pipeline: two depth-first traversals over the
//! definition table using the `live`/`checked` flags as the usual gray/black
//! markers. Struct recursion follows non-array struct-typed fields (by-value
//! containment); class recursion follows the base edge. Entering a gray node
//! fails with a recursion error naming the first-encountered cycle member.

use crate::error::CompileError;
use crate::sema::context::{DefnLocation, SemaContext};
use crate::sema::types::TypeRef;

/// Validates that no struct contains itself and no class inherits from itself
pub fn check(context: &mut SemaContext<'_>) -> Result<(), CompileError> {
    let locations = context.locations().collect::<Vec<_>>();

    for &location in &locations {
        check_struct(context, location)?;
    }

    clear_marks(context);
    for &location in &locations {
        check_class(context, location)?;
    }

    clear_marks(context);
    Ok(())
}

fn clear_marks(context: &mut SemaContext<'_>) {
    for defn in &mut context.defns {
        defn.live = false;
        defn.checked = false;
    }
}

/// Walks by-value struct containment from one definition
fn check_struct(context: &mut SemaContext<'_>, location: DefnLocation) -> Result<(), CompileError> {
    let defn = context.get(location);
    if defn.checked {
        return Ok(());
    }
    if defn.live {
        return Err(CompileError::struct_cycle(defn.name, defn.at()));
    }
    if !defn.kind.is_struct() {
        return Ok(());
    }

    context.get_mut(location).live = true;
    let embedded = context
        .get(location)
        .props
        .iter()
        .filter(|prop| !prop.is_array)
        .filter_map(|prop| match prop.ty {
            Some(TypeRef::Defn(target)) if context.get(target).kind.is_struct() => Some(target),
            _ => None,
        })
        .collect::<Vec<_>>();
    for target in embedded {
        check_struct(context, target)?;
    }

    let defn = context.get_mut(location);
    defn.live = false;
    defn.checked = true;
    Ok(())
}

/// Walks the base edge from one class
fn check_class(context: &mut SemaContext<'_>, location: DefnLocation) -> Result<(), CompileError> {
    let defn = context.get(location);
    if defn.checked {
        return Ok(());
    }
    if defn.live {
        return Err(CompileError::class_cycle(defn.name, defn.at()));
    }
    let base = match defn.as_class() {
        Some(class) => class.base,
        None => return Ok(()),
    };

    context.get_mut(location).live = true;
    if let Some(base) = base {
        check_class(context, base)?;
    }

    let defn = context.get_mut(location);
    defn.live = false;
    defn.checked = true;
    Ok(())
}
