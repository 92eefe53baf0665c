//! Paste-up emission of lowered definitions.
//!
//! Eighth pass of the pipeline. Rebuilds each file by interleaving its
//! retained host lines with the lowered form of every definition at the
//! definition's origin. A lowered definition is one object literal bound to
//! the type name — constants, `_impl` method entries (self-expanded), virtual
//! dispatchers and, for classes, `initInstance` — followed by the class-id
//! registration line.
//!
//! Every produced line carries a source line number for the macro expander's
//! diagnostics: retained lines keep their own, emitted lines use the line of
//! the definition or method they came from.

use crate::ast::{FileAst, MethodAst, MethodKind};
use crate::emit::self_expand::expand_self;
use crate::error::CompileError;
use crate::sema::context::{DefnLocation, SemaContext};
use crate::sema::defn::Defn;
use crate::sema::vtable::VirtualMethod;

/// One output line plus the source line it is attributed to
#[derive(Debug, Clone)]
pub struct EmitLine {
    /// The text of the line
    pub text: String,
    /// 1-based source line for diagnostics
    pub line: u32,
}

/// Rebuilds one file's line stream with lowered definitions spliced in
pub fn paste_up(context: &SemaContext<'_>, file_index: usize, file: &FileAst<'_>) -> Result<Vec<EmitLine>, CompileError> {
    let defs: Vec<DefnLocation> = context
        .locations()
        .filter(|&location| context.get(location).file_index == file_index)
        .collect();

    let mut out = Vec::with_capacity(file.lines.len());
    let mut next_def = 0usize;
    for (index, (&line, &line_no)) in file.lines.iter().zip(&file.line_nos).enumerate() {
        while next_def < defs.len() && context.get(defs[next_def]).origin == index {
            emit_defn(context.get(defs[next_def]), &mut out);
            next_def += 1;
        }
        out.push(EmitLine { text: line.to_string(), line: line_no });
    }
    while next_def < defs.len() {
        emit_defn(context.get(defs[next_def]), &mut out);
        next_def += 1;
    }
    Ok(out)
}

/// The object-literal entry name a method is emitted under
fn entry_name(method: &MethodAst<'_>) -> String {
    match method.kind {
        MethodKind::Virtual if method.name == "init" => "init".to_string(),
        MethodKind::Virtual => format!("{}_impl", method.name),
        MethodKind::Get => "_get_impl".to_string(),
        MethodKind::Set => "_set_impl".to_string(),
        MethodKind::Copy => "_copy_impl".to_string(),
    }
}

/// Emits the lowered object literal of one definition
fn emit_defn(defn: &Defn<'_>, out: &mut Vec<EmitLine>) {
    let line = defn.line;
    let mut push = |text: String, line: u32| out.push(EmitLine { text, line });

    push(format!("var {} = {{", defn.name), line);
    push(format!("  NAME: \"{}\",", defn.name), line);
    push(format!("  SIZE: {},", defn.size), line);
    push(format!("  ALIGN: {},", defn.align), line);
    if let Some(class) = defn.as_class() {
        push(format!("  CLSID: {},", class.class_id), line);
    }

    for method in &defn.methods {
        emit_method(defn.name, method, out);
    }

    if let Some(class) = defn.as_class() {
        for virtual_method in &class.vtable {
            emit_dispatcher(virtual_method, defn.line, out);
        }
        let mut push = |text: String| out.push(EmitLine { text, line });
        push("  initInstance: function (self) {".to_string());
        push(format!("    _mem_int32[self>>2] = {};", class.class_id));
        push("    return self;".to_string());
        push("  },".to_string());
        push("};".to_string());
        push(format!("Parlang._idToType[{}] = {};", class.class_id, defn.name));
    } else {
        out.push(EmitLine { text: "};".to_string(), line });
    }
}

/// Emits one method as an `<entry>: function <fragment>` literal entry
///
/// The header reuses the method's parameter fragment; body lines follow with
/// trailing blanks trimmed, self-expanded against the defining type, and a
/// comma appended to the final line.
fn emit_method(type_name: &str, method: &MethodAst<'_>, out: &mut Vec<EmitLine>) {
    let header = format!("  {}: function {}", entry_name(method), expand_self(type_name, method.fragment()));
    let body = method.trimmed_body();
    match body.split_last() {
        None => out.push(EmitLine { text: format!("{header},"), line: method.line }),
        Some((last, head)) => {
            out.push(EmitLine { text: header, line: method.line });
            for &body_line in head {
                out.push(EmitLine { text: expand_self(type_name, body_line), line: method.line });
            }
            out.push(EmitLine { text: format!("{},", expand_self(type_name, last)), line: method.line });
        }
    }
}

/// Emits the switch-based dispatcher of one virtual method
fn emit_dispatcher(virtual_method: &VirtualMethod, line: u32, out: &mut Vec<EmitLine>) {
    let params = virtual_method.params.join(", ");
    let mut push = |text: String| out.push(EmitLine { text, line });

    push(format!("  {}: function ({}) {{", virtual_method.name, params));
    push("    switch (_mem_int32[self>>2]) {".to_string());
    for (symbol, ids) in &virtual_method.cases {
        for id in ids {
            push(format!("      case {id}:"));
        }
        push(format!("        return {symbol}({params});"));
    }
    push("      default:".to_string());
    match &virtual_method.default_impl {
        Some(symbol) => push(format!("        return {symbol}({params});")),
        None => push(format!(
            "        throw Error(\"No implementation of '{}' for class id \" + _mem_int32[self>>2]);",
            virtual_method.name
        )),
    }
    push("    }".to_string());
    push("  },".to_string());
}
