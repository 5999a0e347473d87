//! Lexer for process definitions and UFO color strings
//!
//! Both grammars share one token stream. Particle names are permissive
//! (`t~`, `w+`, `mu-`, `l+`), so integers and negative color indices also
//! lex as [`Token::Name`]; the parsers decide what a name means in context.

use chumsky::prelude::*;
use std::ops::Range;

/// Token types for process and color-string syntax
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// Particle, label, order key or integer
    Name(String),

    Gt,           // >
    Slash,        // /
    Dollar,       // $
    DoubleDollar, // $$
    Eq,           // =
    EqEq,         // ==
    Le,           // <=
    Comma,        // ,
    Star,         // *
    LParen,       // (
    RParen,       // )
    LBracket,     // [
    RBracket,     // ]
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Name(s) => write!(f, "{}", s),
            Token::Gt => write!(f, ">"),
            Token::Slash => write!(f, "/"),
            Token::Dollar => write!(f, "$"),
            Token::DoubleDollar => write!(f, "$$"),
            Token::Eq => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::Le => write!(f, "<="),
            Token::Comma => write!(f, ","),
            Token::Star => write!(f, "*"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
        }
    }
}

/// Type alias for spans
pub type Span = Range<usize>;

fn is_name_char(c: &char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '~' | '+' | '-')
}

/// Create the lexer
pub fn lexer() -> impl Parser<char, Vec<(Token, Span)>, Error = Simple<char>> {
    let name = filter(is_name_char)
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(Token::Name);

    // Two-character operators first so `==` is not read as two `=`
    let punctuation = choice((
        just("$$").to(Token::DoubleDollar),
        just("==").to(Token::EqEq),
        just("<=").to(Token::Le),
        just('>').to(Token::Gt),
        just('/').to(Token::Slash),
        just('$').to(Token::Dollar),
        just('=').to(Token::Eq),
        just(',').to(Token::Comma),
        just('*').to(Token::Star),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
    ));

    // `#` starts a comment running to end of line
    let comment = just('#')
        .then(none_of('\n').repeated())
        .then(just('\n').or_not())
        .ignored();

    let token_or_skip = comment.to(None).or(name.or(punctuation).map(Some));

    token_or_skip
        .map_with_span(|opt_tok, span| opt_tok.map(|tok| (tok, span)))
        .padded()
        .repeated()
        .then_ignore(end())
        .map(|items| items.into_iter().flatten().collect())
}

// Unit tests live in tests/unit_parsing.rs
