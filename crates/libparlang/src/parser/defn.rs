//! Line parsers for annotated definition syntax.
//!
//! The collector hands individual source lines to these nom parsers. A
//! definition opener (`shared class …` / `shared struct …`) starts a
//! definition; inside one, every line is matched against the member forms in
//! the order fixed by the dialect: the `} end` terminator, `method` openers,
//! `get`/`set`/`copy` accessor openers, scalar properties, array properties.

use nom::branch::alt;
use nom::character::complete::char;
use nom::combinator::{cut, eof, opt, peek, rest, value, verify};
use nom::error::context;
use nom::{IResult, Parser};

use crate::ast::{DefnKindAst, MethodKind, PropQualifier};
use crate::nom_tools::{cleanup, expected_ident, ident, NomSpan, ParlangParserError};

/// One recognized member line inside an open definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefnLineAst<'base> {
    /// The `} end` terminator
    End,
    /// A `method <name>(self…)` opener with its parameter fragment
    Method { name: &'base str, fragment: &'base str },
    /// A `get(…)`/`set(…)`/`copy(…)` accessor opener
    Accessor { kind: MethodKind, fragment: &'base str },
    /// A scalar or array property declaration
    Property {
        name: &'base str,
        qualifier: PropQualifier,
        is_array: bool,
        type_name: &'base str,
    },
}

/// Matches a bare keyword as a whole identifier
///
/// `tag` alone would accept identifier prefixes (`methodical` starts with
/// `method`), so keywords are parsed as identifiers and compared afterwards.
fn keyword<'base>(word: &'static str) -> impl Parser<NomSpan<'base>, Output = NomSpan<'base>, Error = ParlangParserError<'base>> {
    verify(ident(), move |name: &NomSpan<'base>| *name.fragment() == word)
}

/// Parses a definition opener line: `shared class <Id> [extends <Id>] {` or
/// `shared struct <Id> {`
///
/// The collector only calls this for lines whose first word is `shared`; a
/// failure past that point is reported as a malformed opener.
pub fn opener<'base>(
    input: NomSpan<'base>,
) -> IResult<NomSpan<'base>, (DefnKindAst, &'base str, Option<&'base str>), ParlangParserError<'base>> {
    let (input, _) = keyword("shared").parse(input)?;
    let (input, kind) = context(
        "Expected 'class' or 'struct' after 'shared'",
        cut(alt((value(DefnKindAst::Class, keyword("class")), value(DefnKindAst::Struct, keyword("struct"))))),
    )
    .parse(input)?;
    let (input, name) = expected_ident("Missing definition name", input)?;
    let (input, base) = opt((keyword("extends"), |input| expected_ident("Missing base class name", input))).parse(input)?;
    let (input, _) = context("Definition opener must end with '{'", cut(cleanup(char('{')))).parse(input)?;
    let (input, _) = context("Unexpected text after '{'", cut(eof)).parse(input)?;

    Ok((input, (kind, *name.fragment(), base.map(|(_, base)| *base.fragment()))))
}

/// Parses the `} end` terminator line
fn end_line<'base>(input: NomSpan<'base>) -> IResult<NomSpan<'base>, DefnLineAst<'base>, ParlangParserError<'base>> {
    let (input, _) = cleanup(char('}')).parse(input)?;
    let (input, _) = keyword("end").parse(input)?;
    let (input, _) = eof.parse(input)?;
    Ok((input, DefnLineAst::End))
}

/// Parses a `method <Id>(self…)` opener, capturing the rest of the line from
/// the open paren as the parameter fragment
fn method_line<'base>(input: NomSpan<'base>) -> IResult<NomSpan<'base>, DefnLineAst<'base>, ParlangParserError<'base>> {
    let (input, _) = keyword("method").parse(input)?;
    let (input, name) = ident().parse(input)?;
    let (input, _) = peek(char('(')).parse(input)?;
    let (input, fragment) = rest.parse(input)?;
    Ok((input, DefnLineAst::Method { name: *name.fragment(), fragment: fragment.fragment().trim_end() }))
}

/// Parses a `get(…)`, `set(…)` or `copy(…)` accessor opener
fn accessor_line<'base>(input: NomSpan<'base>) -> IResult<NomSpan<'base>, DefnLineAst<'base>, ParlangParserError<'base>> {
    let (input, kind) = alt((
        value(MethodKind::Get, keyword("get")),
        value(MethodKind::Set, keyword("set")),
        value(MethodKind::Copy, keyword("copy")),
    ))
    .parse(input)?;
    let (input, _) = peek(char('(')).parse(input)?;
    let (input, fragment) = rest.parse(input)?;
    Ok((input, DefnLineAst::Accessor { kind, fragment: fragment.fragment().trim_end() }))
}

/// Parses the optional `atomic`/`synchronic` property qualifier
fn qualifier<'base>(input: NomSpan<'base>) -> IResult<NomSpan<'base>, PropQualifier, ParlangParserError<'base>> {
    let (input, qualifier) = opt(alt((
        value(PropQualifier::Atomic, keyword("atomic")),
        value(PropQualifier::Synchronic, keyword("synchronic")),
    )))
    .parse(input)?;
    Ok((input, qualifier.unwrap_or_default()))
}

/// Parses a scalar property: `<Id> : [atomic|synchronic] <Id> ;?`
fn scalar_prop_line<'base>(input: NomSpan<'base>) -> IResult<NomSpan<'base>, DefnLineAst<'base>, ParlangParserError<'base>> {
    let (input, name) = ident().parse(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, qualifier) = qualifier(input)?;
    let (input, type_name) = ident().parse(input)?;
    let (input, _) = opt(cleanup(char(';'))).parse(input)?;
    let (input, _) = eof.parse(input)?;
    Ok((
        input,
        DefnLineAst::Property { name: *name.fragment(), qualifier, is_array: false, type_name: *type_name.fragment() },
    ))
}

/// Parses an array property: `<Id> : array(<Id>) ;?`
fn array_prop_line<'base>(input: NomSpan<'base>) -> IResult<NomSpan<'base>, DefnLineAst<'base>, ParlangParserError<'base>> {
    let (input, name) = ident().parse(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, _) = keyword("array").parse(input)?;
    let (input, _) = char('(').parse(input)?;
    let (input, type_name) = ident().parse(input)?;
    let (input, _) = cleanup(char(')')).parse(input)?;
    let (input, _) = opt(cleanup(char(';'))).parse(input)?;
    let (input, _) = eof.parse(input)?;
    Ok((
        input,
        DefnLineAst::Property { name: *name.fragment(), qualifier: PropQualifier::None, is_array: true, type_name: *type_name.fragment() },
    ))
}

/// Matches one member line inside a definition, in dialect order
pub fn defn_line<'base>(input: NomSpan<'base>) -> IResult<NomSpan<'base>, DefnLineAst<'base>, ParlangParserError<'base>> {
    alt((end_line, method_line, accessor_line, scalar_prop_line, array_prop_line)).parse(input)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::ast::{DefnKindAst, MethodKind, PropQualifier};
    use crate::file::SourceFile;
    use crate::nom_tools::{NomSpan, State};

    use super::{defn_line, opener, DefnLineAst};

    fn span(text: &str) -> NomSpan<'_> {
        let state = State::new(SourceFile::new(vec!["<memory>".into()], text.to_string()));
        NomSpan::new_extra(text, state)
    }

    #[rstest]
    #[case("shared class Point {", DefnKindAst::Class, "Point", None)]
    #[case("shared class Dot extends Point {", DefnKindAst::Class, "Dot", Some("Point"))]
    #[case("  shared struct Pair {", DefnKindAst::Struct, "Pair", None)]
    fn opener_forms(#[case] line: &str, #[case] kind: DefnKindAst, #[case] name: &str, #[case] base: Option<&str>) {
        let text = line.to_string();
        let (_, (parsed_kind, parsed_name, parsed_base)) = opener(span(&text)).unwrap();
        assert_eq!(parsed_kind, kind);
        assert_eq!(parsed_name, name);
        assert_eq!(parsed_base, base);
    }

    #[rstest]
    #[case("shared class {")]
    #[case("shared Point {")]
    #[case("shared class Point")]
    #[case("shared struct Pair { x")]
    fn opener_rejects(#[case] line: &str) {
        let text = line.to_string();
        assert!(opener(span(&text)).is_err());
    }

    #[test]
    fn method_opener_keeps_fragment() {
        let text = "  method init(self, x, y) {".to_string();
        let (_, line) = defn_line(span(&text)).unwrap();
        assert_eq!(line, DefnLineAst::Method { name: "init", fragment: "(self, x, y) {" });
    }

    #[test]
    fn accessor_opener() {
        let text = "  get(self) {".to_string();
        let (_, line) = defn_line(span(&text)).unwrap();
        assert_eq!(line, DefnLineAst::Accessor { kind: MethodKind::Get, fragment: "(self) {" });
    }

    #[rstest]
    #[case("x : int32", "x", PropQualifier::None, false, "int32")]
    #[case("  hits : atomic uint32;", "hits", PropQualifier::Atomic, false, "uint32")]
    #[case("gate : synchronic int32 ;", "gate", PropQualifier::Synchronic, false, "int32")]
    #[case("cells : array(Cell);", "cells", PropQualifier::None, true, "Cell")]
    fn property_forms(
        #[case] text: &str,
        #[case] name: &str,
        #[case] qualifier: PropQualifier,
        #[case] is_array: bool,
        #[case] type_name: &str,
    ) {
        let owned = text.to_string();
        let (_, line) = defn_line(span(&owned)).unwrap();
        assert_eq!(line, DefnLineAst::Property { name, qualifier, is_array, type_name });
    }

    #[test]
    fn end_line_matches() {
        let text = "} end".to_string();
        assert_eq!(defn_line(span(&text)).unwrap().1, DefnLineAst::End);
    }

    #[test]
    fn body_text_is_not_a_member_line() {
        let text = "    var d = dx * dx + dy * dy;".to_string();
        assert!(defn_line(span(&text)).is_err());
    }

    #[test]
    fn keyword_requires_word_boundary() {
        let text = "methodical(self)".to_string();
        assert!(defn_line(span(&text)).is_err());
    }
}
