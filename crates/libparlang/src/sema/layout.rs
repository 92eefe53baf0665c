//! Memory layout computation for the Parlang translator.
//!
//! Fifth pass of the pipeline. Computes size, alignment and the per-field
//! offset map of every definition, inlining embedded structs into the owning
//! layout, and assigns every class its dotted inheritance name and the 28-bit
//! class identifier hashed from it.
//!
//! Classes start from their base's layout (or from the 4-byte reserved
//! class-id slot) and never round their final size; structs start empty and
//! round their size up to their alignment so arrays of structs stay aligned
//! at every index. Object pointers and array handles occupy 4-byte `int32`
//! slots.

use log::debug;

use crate::error::CompileError;
use crate::sema::context::{DefnLocation, SemaContext};
use crate::sema::defn::DefnKind;
use crate::sema::types::{FieldMap, MapEntry, PrimitiveType, TypeRef};

/// Rounds `value` up to the next multiple of the power-of-two `align`
fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}

/// Maps a dotted-name character to its 6-bit code
fn char_code(c: char) -> Result<u32, CompileError> {
    match c {
        'A'..='Z' => Ok(c as u32 - 'A' as u32),
        'a'..='z' => Ok(c as u32 - 'a' as u32 + 26),
        '0'..='9' => Ok(c as u32 - '0' as u32 + 52),
        '_' => Ok(62),
        '>' => Ok(63),
        _ => Err(CompileError::internal(format!("character '{c}' cannot appear in a dotted class name"))),
    }
}

/// Hashes a dotted class name into its 28-bit class identifier
pub fn class_id_of(dotted: &str) -> Result<u32, CompileError> {
    let mut id = dotted.chars().count() as u32;
    for c in dotted.chars() {
        let v = char_code(c)?;
        id = (((id & 0x01FF_FFFF) << 3) | (id >> 25)) ^ v;
    }
    Ok(id)
}

/// Lays out every definition in the context, in registration order
pub fn layout(context: &mut SemaContext<'_>) -> Result<(), CompileError> {
    for location in context.locations().collect::<Vec<_>>() {
        layout_defn(context, location)?;
    }
    Ok(())
}

/// Lays out one definition, recursing into bases and embedded structs first
///
/// The cycle checker has already run, so the recursion terminates.
fn layout_defn(context: &mut SemaContext<'_>, location: DefnLocation) -> Result<(), CompileError> {
    if context.get(location).laid_out {
        return Ok(());
    }

    let base = context.get(location).as_class().and_then(|class| class.base);
    if let Some(base) = base {
        layout_defn(context, base)?;
    }

    let is_class = context.get(location).kind.is_class();
    let (mut size, mut align, mut map) = match base {
        Some(base) => {
            let base_defn = context.get(base);
            (base_defn.size, base_defn.align, base_defn.map.clone())
        }
        None if is_class => (4, 4, FieldMap::new()),
        None => (0, 0, FieldMap::new()),
    };

    for index in 0..context.get(location).props.len() {
        let prop = &context.get(location).props[index];
        let (name, is_array, ty) = (prop.name.to_string(), prop.is_array, prop.bound()?);

        let pointer_slot = is_array || matches!(ty, TypeRef::Defn(target) if context.get(target).kind.is_class());
        if pointer_slot {
            size = align_up(size, 4);
            map.insert(
                name.clone(),
                MapEntry { name, expand: true, offset: size, ty: TypeRef::Primitive(PrimitiveType::Int32) },
            );
            size += 4;
            align = align.max(4);
            continue;
        }

        match ty {
            TypeRef::Primitive(primitive) => {
                size = align_up(size, primitive.size());
                map.insert(name.clone(), MapEntry { name, expand: true, offset: size, ty });
                size += primitive.size();
                align = align.max(primitive.size());
            }
            TypeRef::Defn(target) => {
                layout_defn(context, target)?;
                let inner = context.get(target);
                let (inner_size, inner_align) = (inner.size, inner.align);
                let inner_map = inner.map.clone();

                size = align_up(size, inner_align.max(1));
                map.insert(name.clone(), MapEntry { name: name.clone(), expand: false, offset: size, ty });
                for entry in inner_map.values() {
                    let composite = format!("{}_{}", name, entry.name);
                    map.insert(
                        composite.clone(),
                        MapEntry { name: composite, expand: entry.expand, offset: size + entry.offset, ty: entry.ty },
                    );
                }
                size += inner_size;
                align = align.max(inner_align);
            }
        }
    }

    if !is_class && align > 0 {
        size = align_up(size, align);
    }

    let defn = context.get_mut(location);
    defn.size = size;
    defn.align = align;
    defn.map = map;
    defn.laid_out = true;
    debug!("laid out '{}': size {size}, align {align}", defn.name);

    if is_class {
        assign_class_id(context, location, base)?;
    }
    Ok(())
}

/// Computes a class's dotted name and registers its class identifier
fn assign_class_id(context: &mut SemaContext<'_>, location: DefnLocation, base: Option<DefnLocation>) -> Result<(), CompileError> {
    let name = context.get(location).name;
    let dotted = match base {
        Some(base) => {
            let parent = context
                .get(base)
                .as_class()
                .ok_or_else(|| CompileError::internal(format!("base of class '{name}' is not a class")))?;
            format!("{}>{}", parent.dotted_name, name)
        }
        None => name.to_string(),
    };
    let id = class_id_of(&dotted)?;

    if let Some(&owner) = context.class_ids.get(&id) {
        let other = context.get(owner).name.to_string();
        let at = context.get(location).at();
        return Err(CompileError::class_id_collision(name, other, id, at));
    }
    context.class_ids.insert(id, location);

    debug!("class '{dotted}' has id {id:#09x}");
    if let Some(class) = context.get_mut(location).as_class_mut() {
        class.dotted_name = dotted;
        class.class_id = id;
    }
    Ok(())
}

/// Byte size of one array element of the given type
///
/// Class values are 4-byte pointers; structs and primitives are stored
/// inline at their full size.
pub fn element_size(context: &SemaContext<'_>, ty: TypeRef) -> u32 {
    match ty {
        TypeRef::Primitive(primitive) => primitive.size(),
        TypeRef::Defn(target) => match &context.get(target).kind {
            DefnKind::Class(_) => 4,
            DefnKind::Struct(_) => context.get(target).size,
        },
    }
}

/// Alignment of one array element of the given type
pub fn element_align(context: &SemaContext<'_>, ty: TypeRef) -> u32 {
    match ty {
        TypeRef::Primitive(primitive) => primitive.align(),
        TypeRef::Defn(target) => match &context.get(target).kind {
            DefnKind::Class(_) => 4,
            DefnKind::Struct(_) => context.get(target).align,
        },
    }
}
