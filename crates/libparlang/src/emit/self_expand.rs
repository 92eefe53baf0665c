//! Self-accessor expansion inside method bodies.
//!
//! Seventh pass of the pipeline. Within a method body, the dialect's
//! uppercase `SELF.` marker forms are rewritten into qualified calls on the
//! defining type, threading the literal `self` receiver parameter through:
//!
//! - `SELF.<op>_<field>(` with an operation prefix becomes
//!   `<Type>.<op>_<field>(self, `
//! - `SELF.<member>` not followed by a call becomes `<Type>.<member>(self)`
//!
//! Field names are not validated here; an invalid name survives to the
//! global macro expander, which leaves it unchanged and logs.

use crate::emit::scan::{is_ident_char, is_ident_start};

/// Operation prefixes that take the call form
const CALL_OPS: [&str; 8] = ["set", "add", "sub", "or", "compareExchange", "loadWhenEqual", "loadWhenNotEqual", "expectUpdate"];

/// Rewrites every `SELF.` marker in one body line against the defining type
pub fn expand_self(type_name: &str, line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut copied = 0usize;
    let mut i = 0usize;

    while let Some(found) = line[i..].find("SELF").map(|at| i + at) {
        let end = found + 4;
        let boundary_before = found == 0 || !is_ident_char(bytes[found - 1]);
        let follows_dot = bytes.get(end) == Some(&b'.');
        if !boundary_before || !follows_dot {
            i = end;
            continue;
        }

        let member_start = end + 1;
        let mut member_end = member_start;
        while member_end < bytes.len() && is_ident_char(bytes[member_end]) {
            member_end += 1;
        }
        if member_end == member_start || !is_ident_start(bytes[member_start]) {
            i = end;
            continue;
        }
        let member = &line[member_start..member_end];

        // Call form: an operation prefix with the open paren consumed.
        let mut paren = member_end;
        while bytes.get(paren) == Some(&b' ') {
            paren += 1;
        }
        let open_follows = bytes.get(paren) == Some(&b'(');
        let has_call_op = CALL_OPS
            .iter()
            .any(|op| member.strip_prefix(op).and_then(|rest| rest.strip_prefix('_')).is_some_and(|field| !field.is_empty()));

        if open_follows && has_call_op {
            out.push_str(&line[copied..found]);
            out.push_str(type_name);
            out.push('.');
            out.push_str(member);
            out.push_str("(self, ");
            copied = paren + 1;
            i = copied;
            continue;
        }

        // Getter form: a plain member (ref_/notify_ prefixes included) that
        // is not being called.
        if !open_follows {
            out.push_str(&line[copied..found]);
            out.push_str(type_name);
            out.push('.');
            out.push_str(member);
            out.push_str("(self)");
            copied = member_end;
            i = copied;
            continue;
        }

        i = member_end;
    }

    out.push_str(&line[copied..]);
    out
}
