//! Global macro expansion over pasted-up lines.
//!
//! Ninth and final pass of the pipeline. Each line runs through three
//! pattern families in order — field accessors, array accessors, allocation
//! expressions — with every matched argument recursively expanded before the
//! replacement is assembled, so nested accesses lower in one pass and the
//! whole expansion is idempotent on its own output.
//!
//! Rejected matches (bad argument lists, wrong arity, inaccessible targets)
//! are non-fatal: a diagnostic goes through `log::warn!` and the text is left
//! unchanged. The one hard failure is an allocation expression naming an
//! unknown type, since the `new` syntax belongs exclusively to the dialect.

use log::warn;

use crate::emit::scan::{is_ident_char, is_ident_start, parse_arguments, TokenScanner};
use crate::error::{At, CompileError};
use crate::file::SourceFile;
use crate::sema::context::SemaContext;
use crate::sema::defn::DefnKind;
use crate::sema::layout::{element_align, element_size};
use crate::sema::types::{MapEntry, PrimitiveType, TypeRef};

/// floor-log2 of a positive power-of-two slot size
///
/// A non-positive input means a layout invariant broke upstream.
pub fn log2(x: u32) -> Result<u32, CompileError> {
    if x == 0 {
        return Err(CompileError::internal("log2 of non-positive value"));
    }
    Ok(31 - x.leading_zeros())
}

/// The operations a field accessor can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessorOp {
    Get,
    Set,
    Ref,
    Notify,
    Add,
    Sub,
    Or,
    CompareExchange,
    LoadWhenEqual,
    LoadWhenNotEqual,
    ExpectUpdate,
}

/// Operation-prefix spellings, longest-first where prefixes overlap
const OP_PREFIXES: [(&str, AccessorOp); 10] = [
    ("set_", AccessorOp::Set),
    ("ref_", AccessorOp::Ref),
    ("notify_", AccessorOp::Notify),
    ("add_", AccessorOp::Add),
    ("sub_", AccessorOp::Sub),
    ("or_", AccessorOp::Or),
    ("compareExchange_", AccessorOp::CompareExchange),
    ("loadWhenNotEqual_", AccessorOp::LoadWhenNotEqual),
    ("loadWhenEqual_", AccessorOp::LoadWhenEqual),
    ("expectUpdate_", AccessorOp::ExpectUpdate),
];

impl AccessorOp {
    /// Looks up the suffix spelling (`T.f.set(…)`)
    fn by_name(name: &str) -> Option<Self> {
        match name {
            "get" => Some(AccessorOp::Get),
            "set" => Some(AccessorOp::Set),
            "ref" => Some(AccessorOp::Ref),
            "notify" => Some(AccessorOp::Notify),
            "add" => Some(AccessorOp::Add),
            "sub" => Some(AccessorOp::Sub),
            "or" => Some(AccessorOp::Or),
            "compareExchange" => Some(AccessorOp::CompareExchange),
            "loadWhenEqual" => Some(AccessorOp::LoadWhenEqual),
            "loadWhenNotEqual" => Some(AccessorOp::LoadWhenNotEqual),
            "expectUpdate" => Some(AccessorOp::ExpectUpdate),
            _ => None,
        }
    }

    /// Splits the prefix spelling (`T.set_f(…)`) into operation and field
    fn split_prefixed(member: &str) -> Option<(Self, &str)> {
        for (prefix, op) in OP_PREFIXES {
            if let Some(field) = member.strip_prefix(prefix) {
                if !field.is_empty() {
                    return Some((op, field));
                }
            }
        }
        None
    }

    /// Total argument count, the object pointer included
    fn arity(self) -> usize {
        match self {
            AccessorOp::Get | AccessorOp::Ref | AccessorOp::Notify => 1,
            AccessorOp::Set | AccessorOp::Add | AccessorOp::Sub | AccessorOp::Or => 2,
            AccessorOp::LoadWhenEqual | AccessorOp::LoadWhenNotEqual => 2,
            AccessorOp::CompareExchange | AccessorOp::ExpectUpdate => 3,
        }
    }

    /// The runtime name of the operation in emitted calls
    fn runtime_name(self) -> &'static str {
        match self {
            AccessorOp::Get => "get",
            AccessorOp::Set => "set",
            AccessorOp::Ref => "ref",
            AccessorOp::Notify => "notify",
            AccessorOp::Add => "add",
            AccessorOp::Sub => "sub",
            AccessorOp::Or => "or",
            AccessorOp::CompareExchange => "compareExchange",
            AccessorOp::LoadWhenEqual => "loadWhenEqual",
            AccessorOp::LoadWhenNotEqual => "loadWhenNotEqual",
            AccessorOp::ExpectUpdate => "expectUpdate",
        }
    }

    /// True for the atomic read-modify-write operations (host `Atomics`)
    fn is_atomic_rmw(self) -> bool {
        matches!(self, AccessorOp::Add | AccessorOp::Sub | AccessorOp::Or | AccessorOp::CompareExchange)
    }
}

/// Expands one line through all three macro families
pub fn expand_line(context: &SemaContext<'_>, file: &SourceFile, line_no: u32, text: &str) -> Result<String, CompileError> {
    let text = expand_accessors(context, file, line_no, text)?;
    let text = expand_arrays(context, file, line_no, &text)?;
    expand_new(context, file, line_no, &text)
}

fn warn_at(file: &SourceFile, line_no: u32, message: &str) {
    warn!("{}:{line_no}: {message}", file.display_name());
}

/// Reads the identifier immediately following a `.` at `dot`, if any
fn ident_after_dot(bytes: &[u8], dot: usize) -> Option<(usize, usize)> {
    if bytes.get(dot) != Some(&b'.') {
        return None;
    }
    let start = dot + 1;
    if !bytes.get(start).copied().is_some_and(is_ident_start) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    Some((start, end))
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while matches!(bytes.get(pos), Some(&b' ') | Some(&b'\t')) {
        pos += 1;
    }
    pos
}

/// Parenthesizes an expression that would bind wrongly next to `*`
///
/// Plain tokens and already self-contained parenthesized expressions pass
/// through; anything else is wrapped.
fn guarded(expr: &str) -> String {
    let simple = expr.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if simple || is_self_contained(expr) {
        return expr.to_string();
    }
    format!("({expr})")
}

/// True when the expression is one balanced `(…)` group
fn is_self_contained(expr: &str) -> bool {
    let bytes = expr.as_bytes();
    if bytes.first() != Some(&b'(') || bytes.last() != Some(&b')') {
        return false;
    }
    let mut depth = 0i32;
    for (index, b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 && index != bytes.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Reads the identifier starting exactly at `start`, if any
fn ident_at(bytes: &[u8], start: usize) -> Option<usize> {
    if !bytes.get(start).copied().is_some_and(is_ident_start) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    Some(end)
}

/// Field accessor family: `T.f(…)`, `T.<op>_f(…)`, `T.f.<op>(…)`
fn expand_accessors(context: &SemaContext<'_>, file: &SourceFile, line_no: u32, text: &str) -> Result<String, CompileError> {
    let bytes = text.as_bytes();
    let mut scanner = TokenScanner::new(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0usize;

    while let Some((start, end)) = scanner.next_ident() {
        if start > 0 && bytes[start - 1] == b'.' {
            continue;
        }
        let type_name = &text[start..end];
        let Some(location) = context.lookup(type_name) else { continue };
        let Some((member_start, member_end)) = ident_after_dot(bytes, end) else { continue };
        let member = &text[member_start..member_end];
        let defn = context.get(location);

        let resolved: Option<(AccessorOp, MapEntry, usize)> = 'resolve: {
            // Suffix spelling: T.<field>.<op>(
            if let Some(entry) = defn.map.get(member) {
                if let Some((op_start, op_end)) = ident_after_dot(bytes, member_end) {
                    if let Some(op) = AccessorOp::by_name(&text[op_start..op_end]) {
                        let open = skip_spaces(bytes, op_end);
                        if bytes.get(open) == Some(&b'(') {
                            break 'resolve Some((op, entry.clone(), open));
                        }
                    }
                }
            }
            // Prefix spelling: T.<op>_<field>(
            if let Some((op, field)) = AccessorOp::split_prefixed(member) {
                if let Some(entry) = defn.map.get(field) {
                    let open = skip_spaces(bytes, member_end);
                    if bytes.get(open) == Some(&b'(') {
                        break 'resolve Some((op, entry.clone(), open));
                    }
                }
            }
            // Bare get: T.<field>(
            if let Some(entry) = defn.map.get(member) {
                let open = skip_spaces(bytes, member_end);
                if bytes.get(open) == Some(&b'(') {
                    break 'resolve Some((AccessorOp::Get, entry.clone(), open));
                }
            }
            None
        };
        let Some((op, entry, open)) = resolved else { continue };

        let Some((args, close)) = parse_arguments(text, open) else {
            warn_at(file, line_no, &format!("malformed argument list for '{type_name}.{member}'; left unchanged"));
            continue;
        };
        if args.len() != op.arity() {
            warn_at(
                file,
                line_no,
                &format!("'{type_name}.{member}' expects {} argument(s), found {}; left unchanged", op.arity(), args.len()),
            );
            continue;
        }
        let mut expanded = Vec::with_capacity(args.len());
        for arg in &args {
            expanded.push(expand_line(context, file, line_no, arg)?);
        }

        let ref_expr = format!("({}+{})", expanded[0], entry.offset);
        let Some(replacement) = emit_access(context, file, line_no, op, entry.ty, ref_expr, &expanded)? else {
            continue;
        };

        out.push_str(&text[copied..start]);
        out.push_str(&replacement);
        copied = close;
        scanner.skip_to(close, b')');
    }

    out.push_str(&text[copied..]);
    Ok(out)
}

/// Emits the replacement for one resolved accessor operation
///
/// Returns `None` (match rejected, text unchanged) when the operation does
/// not apply to the target type.
fn emit_access(
    context: &SemaContext<'_>,
    file: &SourceFile,
    line_no: u32,
    op: AccessorOp,
    ty: TypeRef,
    ref_expr: String,
    args: &[String],
) -> Result<Option<String>, CompileError> {
    match op {
        AccessorOp::Ref => Ok(Some(ref_expr)),
        AccessorOp::Get => load_from_ref(context, file, line_no, ty, &ref_expr, None),
        AccessorOp::Set => load_from_ref(context, file, line_no, ty, &ref_expr, args.get(1).map(String::as_str)),
        _ => {
            let TypeRef::Primitive(primitive) = ty else {
                warn_at(file, line_no, &format!("'{}' applies only to atomic fields; left unchanged", op.runtime_name()));
                return Ok(None);
            };
            if !primitive.is_atomic() {
                warn_at(file, line_no, &format!("'{}' applies only to atomic fields; left unchanged", op.runtime_name()));
                return Ok(None);
            }
            let shift = log2(primitive.size())?;
            let receiver = if op.is_atomic_rmw() { "Atomics" } else { "Parlang" };
            let mut call = format!("({receiver}.{}({}, {ref_expr}>>{shift}", op.runtime_name(), primitive.view());
            for extra in &args[1..] {
                call.push_str(", ");
                call.push_str(extra);
            }
            call.push_str("))");
            Ok(Some(call))
        }
    }
}

/// Lowers a get or set against a resolved byte reference
///
/// Primitives and class pointers index the typed view directly; structs
/// delegate to their emitted `_get_impl`/`_set_impl` accessors.
fn load_from_ref(
    context: &SemaContext<'_>,
    file: &SourceFile,
    line_no: u32,
    ty: TypeRef,
    ref_expr: &str,
    rhs: Option<&str>,
) -> Result<Option<String>, CompileError> {
    let primitive = match ty {
        TypeRef::Primitive(primitive) => primitive,
        TypeRef::Defn(target) => match &context.get(target).kind {
            DefnKind::Class(_) => PrimitiveType::Int32,
            DefnKind::Struct(strukt) => {
                let name = context.get(target).name;
                return Ok(match rhs {
                    None if !strukt.has_get => {
                        warn_at(file, line_no, &format!("struct '{name}' has no get accessor; left unchanged"));
                        None
                    }
                    None => Some(format!("({name}._get_impl({ref_expr}))")),
                    Some(_) if !strukt.has_set => {
                        warn_at(file, line_no, &format!("struct '{name}' has no set accessor; left unchanged"));
                        None
                    }
                    Some(rhs) => Some(format!("({name}._set_impl({ref_expr}, {rhs}))")),
                });
            }
        },
    };

    let shift = log2(primitive.size())?;
    let view = primitive.view();
    Ok(Some(match rhs {
        None => format!("({view}[{ref_expr}>>{shift}])"),
        Some(rhs) => format!("({view}[{ref_expr}>>{shift}] = {rhs})"),
    }))
}

/// Array accessor family: `T.Array.<op>(…)` and `T.array_<op>[_f](…)`
fn expand_arrays(context: &SemaContext<'_>, file: &SourceFile, line_no: u32, text: &str) -> Result<String, CompileError> {
    let bytes = text.as_bytes();
    let mut scanner = TokenScanner::new(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0usize;

    while let Some((start, end)) = scanner.next_ident() {
        if start > 0 && bytes[start - 1] == b'.' {
            continue;
        }
        let type_name = &text[start..end];
        let Some(ty) = context.resolve_type_name(type_name) else { continue };
        let Some((member_start, member_end)) = ident_after_dot(bytes, end) else { continue };
        let member = &text[member_start..member_end];

        let (op, field_name, open) = if member == "Array" {
            // Suffix spelling: T.Array.<op>(
            let Some((op_start, op_end)) = ident_after_dot(bytes, member_end) else { continue };
            let Some(op) = AccessorOp::by_name(&text[op_start..op_end]) else { continue };
            if !matches!(op, AccessorOp::Get | AccessorOp::Set | AccessorOp::Ref) {
                continue;
            }
            let open = skip_spaces(bytes, op_end);
            if bytes.get(open) != Some(&b'(') {
                continue;
            }
            (op, None, open)
        } else if let Some(rest) = member.strip_prefix("array_") {
            // Prefix spelling: T.array_<op>[_<field>](
            let (op, field_name) = match rest {
                "get" => (AccessorOp::Get, None),
                "set" => (AccessorOp::Set, None),
                "ref" => (AccessorOp::Ref, None),
                _ => {
                    if let Some(field) = rest.strip_prefix("get_") {
                        (AccessorOp::Get, Some(field))
                    } else if let Some(field) = rest.strip_prefix("set_") {
                        (AccessorOp::Set, Some(field))
                    } else if let Some(field) = rest.strip_prefix("ref_") {
                        (AccessorOp::Ref, Some(field))
                    } else {
                        continue;
                    }
                }
            };
            let open = skip_spaces(bytes, member_end);
            if bytes.get(open) != Some(&b'(') {
                continue;
            }
            (op, field_name, open)
        } else {
            continue;
        };

        let arity = match op {
            AccessorOp::Set => 3,
            _ => 2,
        };
        let Some((args, close)) = parse_arguments(text, open) else {
            warn_at(file, line_no, &format!("malformed argument list for '{type_name}.{member}'; left unchanged"));
            continue;
        };
        if args.len() != arity {
            warn_at(
                file,
                line_no,
                &format!("'{type_name}.{member}' expects {arity} argument(s), found {}; left unchanged", args.len()),
            );
            continue;
        }
        let mut expanded = Vec::with_capacity(args.len());
        for arg in &args {
            expanded.push(expand_line(context, file, line_no, arg)?);
        }

        let stride = element_size(context, ty);
        let mut ref_expr = format!("({}+{stride}*{})", expanded[0], guarded(&expanded[1]));
        let mut target = ty;
        if let Some(field_name) = field_name {
            let entry = match ty {
                TypeRef::Defn(location) if context.get(location).kind.is_struct() => context.get(location).map.get(field_name),
                _ => None,
            };
            let Some(entry) = entry else {
                warn_at(file, line_no, &format!("'{type_name}' has no struct field '{field_name}'; left unchanged"));
                continue;
            };
            ref_expr = format!("({ref_expr}+{})", entry.offset);
            target = entry.ty;
        }

        let replacement = match op {
            AccessorOp::Ref => Some(ref_expr),
            AccessorOp::Get => load_from_ref(context, file, line_no, target, &ref_expr, None)?,
            _ => load_from_ref(context, file, line_no, target, &ref_expr, Some(&expanded[2]))?,
        };
        let Some(replacement) = replacement else { continue };

        out.push_str(&text[copied..start]);
        out.push_str(&replacement);
        copied = close;
        scanner.skip_to(close, b')');
    }

    out.push_str(&text[copied..]);
    Ok(out)
}

/// Allocation family: `new T`, `new T.Array(n)`, `new array(T, n)`
fn expand_new(context: &SemaContext<'_>, file: &SourceFile, line_no: u32, text: &str) -> Result<String, CompileError> {
    let bytes = text.as_bytes();
    let mut scanner = TokenScanner::new(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0usize;

    while let Some((start, end)) = scanner.next_ident() {
        if &text[start..end] != "new" {
            continue;
        }
        if start > 0 && bytes[start - 1] == b'.' {
            continue;
        }
        let target_start = skip_spaces(bytes, end);
        if target_start == end {
            continue;
        }
        let Some(target_end) = ident_at(bytes, target_start) else { continue };
        let target_name = &text[target_start..target_end];

        let (replacement, consumed) = if target_name == "array" {
            // Alternate spelling: new array(T, n)
            let open = skip_spaces(bytes, target_end);
            let Some((args, close)) = parse_arguments(text, open) else {
                warn_at(file, line_no, "malformed 'new array(…)' expression; left unchanged");
                continue;
            };
            if args.len() != 2 {
                warn_at(file, line_no, &format!("'new array(…)' expects 2 arguments, found {}; left unchanged", args.len()));
                continue;
            }
            let Some(ty) = context.resolve_type_name(&args[0]) else {
                return Err(CompileError::unknown_new_target(&args[0], At::line_of(file.clone(), line_no)));
            };
            let count = guarded(&expand_line(context, file, line_no, &args[1])?);
            let (stride, align) = (element_size(context, ty), element_align(context, ty));
            (format!("(Parlang.alloc({stride} * {count}, {align}))"), close)
        } else {
            let Some(ty) = context.resolve_type_name(target_name) else {
                return Err(CompileError::unknown_new_target(target_name, At::line_of(file.clone(), line_no)));
            };

            let array_member = ident_after_dot(bytes, target_end)
                .filter(|&(member_start, member_end)| &text[member_start..member_end] == "Array");
            if let Some((_, member_end)) = array_member {
                // new T.Array(n)
                let open = skip_spaces(bytes, member_end);
                let Some((args, close)) = parse_arguments(text, open) else {
                    warn_at(file, line_no, &format!("malformed 'new {target_name}.Array(…)' expression; left unchanged"));
                    continue;
                };
                if args.len() != 1 {
                    warn_at(
                        file,
                        line_no,
                        &format!("'new {target_name}.Array(…)' expects 1 argument, found {}; left unchanged", args.len()),
                    );
                    continue;
                }
                let count = guarded(&expand_line(context, file, line_no, &args[0])?);
                let (stride, align) = (element_size(context, ty), element_align(context, ty));
                (format!("(Parlang.alloc({stride} * {count}, {align}))"), close)
            } else {
                // new T
                let replacement = match ty {
                    TypeRef::Primitive(primitive) => format!("(Parlang.alloc({},{}))", primitive.size(), primitive.align()),
                    TypeRef::Defn(location) => {
                        let defn = context.get(location);
                        match &defn.kind {
                            DefnKind::Class(_) => {
                                format!("({}.initInstance(Parlang.alloc({},{})))", defn.name, defn.size, defn.align)
                            }
                            DefnKind::Struct(_) => format!("(Parlang.alloc({},{}))", defn.size, defn.align),
                        }
                    }
                };
                (replacement, target_end)
            }
        };

        out.push_str(&text[copied..start]);
        out.push_str(&replacement);
        copied = consumed;
        scanner.skip_to(consumed, b')');
    }

    out.push_str(&text[copied..]);
    Ok(out)
}
