//! Lexical collector for the Parlang translator.
//!
//! This is the first pass of the pipeline. It walks each input file line by
//! line: lines outside `shared` definitions are retained verbatim (the host
//! language is never parsed), and annotated definitions are extracted into
//! [`DefnAst`] values recording where in the retained stream their lowered
//! form must later be spliced back in.
//!
//! Inside a definition, member lines are matched in dialect order by the nom
//! parsers in [`defn`]; anything unrecognized belongs to the open method's
//! body, and is a syntax error when no method is open.

use log::debug;

use crate::ast::{DefnAst, FileAst, MethodAst, MethodKind, PropertyAst};
use crate::error::{At, CompileError};
use crate::nom_tools::{NomSpan, State};

pub mod defn;

use defn::{defn_line, opener, DefnLineAst};

/// A definition being collected, together with its open method if any
struct OpenDefn<'base> {
    ast: DefnAst<'base>,
    method: Option<MethodAst<'base>>,
}

impl<'base> OpenDefn<'base> {
    /// Moves the open method, if any, into the definition's method list
    fn flush_method(&mut self) {
        if let Some(method) = self.method.take() {
            self.ast.methods.push(method);
        }
    }
}

/// Returns true when the line's first word is `shared`
///
/// Only such lines are candidates for a definition opener; a candidate that
/// fails the opener parser is a malformed opener, not host text.
fn is_opener_candidate(line: &str) -> bool {
    match line.trim_start().strip_prefix("shared") {
        Some(rest) => rest.starts_with(|c: char| c.is_whitespace()),
        None => false,
    }
}

/// Returns true for blank lines and `//` comment lines
fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with("//")
}

/// Collects one source file into retained lines and extracted definitions
///
/// # Arguments
/// * `state` - Parser state owning the source file
///
/// # Errors
/// Returns a syntax [`CompileError`] for a malformed opener, a line inside a
/// definition that is neither a member form nor method body, or a definition
/// left unterminated at end of file.
pub fn parse<'base>(state: &'base State) -> Result<FileAst<'base>, CompileError> {
    let code = state.file.code().as_str();
    let mut lines: Vec<&'base str> = Vec::new();
    let mut line_nos: Vec<u32> = Vec::new();
    let mut defs: Vec<DefnAst<'base>> = Vec::new();
    let mut open: Option<OpenDefn<'base>> = None;

    let mut line_no: u32 = 0;
    let mut pos: usize = 0;

    for chunk in code.split_inclusive('\n') {
        let line = chunk
            .strip_suffix('\n')
            .map(|body| body.strip_suffix('\r').unwrap_or(body))
            .unwrap_or(chunk);
        line_no += 1;
        let start = pos;
        let end = pos + line.len();
        pos += chunk.len();
        let at = || At::new(state.file.clone(), line_no, start..end);

        let Some(current) = open.as_mut() else {
            if !is_opener_candidate(line) {
                lines.push(line);
                line_nos.push(line_no);
                continue;
            }
            let input = NomSpan::new_extra(line, state.clone());
            let (kind, name, base_name) = match opener(input) {
                Ok((_, parts)) => parts,
                Err(_) => return Err(CompileError::syntax("malformed definition opener", at())),
            };
            debug!("collecting shared {kind:?} '{name}' at line {line_no}");
            open = Some(OpenDefn {
                ast: DefnAst {
                    kind,
                    name,
                    base_name,
                    line: line_no,
                    origin: lines.len(),
                    props: Vec::new(),
                    methods: Vec::new(),
                },
                method: None,
            });
            continue;
        };

        let input = NomSpan::new_extra(line, state.clone());
        match defn_line(input) {
            Ok((_, DefnLineAst::End)) => {
                current.flush_method();
                if let Some(done) = open.take() {
                    defs.push(done.ast);
                }
            }
            Ok((_, DefnLineAst::Method { name, fragment })) => {
                current.flush_method();
                current.method = Some(MethodAst { line: line_no, kind: MethodKind::Virtual, name, body: vec![fragment] });
            }
            Ok((_, DefnLineAst::Accessor { kind, fragment })) => {
                current.flush_method();
                current.method = Some(MethodAst { line: line_no, kind, name: "", body: vec![fragment] });
            }
            Ok((_, DefnLineAst::Property { name, qualifier, is_array, type_name })) => {
                current.ast.props.push(PropertyAst { line: line_no, name, qualifier, is_array, type_name });
            }
            Err(_) if is_blank_or_comment(line) => {}
            Err(_) => match current.method.as_mut() {
                Some(method) => method.body.push(line),
                None => {
                    return Err(CompileError::syntax(
                        format!("unrecognized line in definition of '{}'", current.ast.name),
                        at(),
                    ))
                }
            },
        }
    }

    if let Some(current) = open {
        let end = code.len();
        return Err(CompileError::syntax(
            format!("definition of '{}' is not terminated by '}} end'", current.ast.name),
            At::new(state.file.clone(), current.ast.line, end..end),
        ));
    }

    Ok(FileAst { file: state.file.clone(), lines, line_nos, defs })
}
