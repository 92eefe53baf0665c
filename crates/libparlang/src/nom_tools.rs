//! Nom parser tools and utilities for the Parlang translator.
//!
//! The collector is line-oriented: annotated definition lines are parsed with
//! nom combinators while everything else passes through verbatim. This module
//! provides the parser state shared by those line parsers, the located-span
//! aliases, and helper combinators for common patterns.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, multispace0};
use nom::combinator::{cut, recognize};
use nom::error::context;
use nom::multi::many0_count;
use nom::sequence::pair;
use nom::{IResult, Parser, sequence::delimited};
use nom_locate::LocatedSpan;
use std::hash::Hash;

use crate::file::SourceFile;

/// Type alias for line-parser errors with rich context information
pub type ParlangParserError<'base> = nom_language::error::VerboseError<NomSpan<'base>>;

/// Parser state carried through every line parse
///
/// Each input file gets one `State`; the line parsers clone it into their
/// located spans so failures can be traced back to the owning file.
#[derive(Debug, Clone)]
pub struct State {
    /// The source file being parsed
    pub file: SourceFile,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.file.hash(state);
    }
}

impl State {
    /// Creates a new parser state for the given source file
    pub fn new(file: SourceFile) -> Self {
        Self { file }
    }
}

/// Type alias for nom's LocatedSpan with Parlang's parser state
pub type NomSpan<'base, T = &'base str> = LocatedSpan<T, State>;

/// Parser combinator that wraps a parser with whitespace cleanup
///
/// Removes leading and trailing whitespace around the given parser, making it
/// easier to handle tokens that may be surrounded by whitespace.
pub fn cleanup<'base, O, F: Parser<NomSpan<'base>, Output = O, Error = ParlangParserError<'base>>>(
    f: F,
) -> impl Parser<NomSpan<'base>, Output = O, Error = ParlangParserError<'base>> {
    delimited(multispace0, f, multispace0)
}

/// Parses a valid Parlang identifier
///
/// Identifiers must start with an alphabetic character or underscore,
/// followed by any number of alphanumeric characters or underscores.
/// Whitespace is automatically cleaned up around the identifier.
pub fn ident<'base>() -> impl Parser<NomSpan<'base>, Output = NomSpan<'base>, Error = ParlangParserError<'base>> {
    cleanup(recognize(pair(alt((alpha1, tag("_"))), many0_count(alt((alphanumeric1, tag("_")))))))
}

/// Parses an identifier with a custom error message
///
/// This function expects an identifier and provides a custom error context
/// if parsing fails, making error messages more helpful for users.
pub fn expected_ident<'base>(message: &'static str, input: NomSpan<'base>) -> IResult<NomSpan<'base>, NomSpan<'base>, ParlangParserError<'base>> {
    context(message, cut(ident())).parse(input)
}

#[cfg(test)]
mod tests {
    use nom::Parser;

    use crate::file::SourceFile;

    use super::{ident, NomSpan, State};

    #[test]
    fn ident_accepts_underscores() {
        let state = State::new(SourceFile::new(vec!["<memory>".into()], "_ray_caster9".to_string()));
        let input = NomSpan::new_extra("_ray_caster9", state);
        let (rest, name) = ident().parse(input).unwrap();
        assert_eq!(*name.fragment(), "_ray_caster9");
        assert!(rest.fragment().is_empty());
    }

    #[test]
    fn ident_rejects_leading_digit() {
        let state = State::new(SourceFile::new(vec!["<memory>".into()], "9lives".to_string()));
        let input = NomSpan::new_extra("9lives", state);
        assert!(ident().parse(input).is_err());
    }
}
