//! Parsers for process definitions and UFO color strings
//!
//! Both run over the token stream produced by [`crate::lexer::lexer`].
//! Errors are rendered with ariadne against the original text.

use chumsky::prelude::*;
use chumsky::Stream;
use num_rational::Rational64;

use crate::ast::{ProcessDefinition, ProcessOption, Span};
use crate::color::{ColorCoefficient, ColorObject, ColorString};
use crate::error::{format_lexer_errors, format_parser_errors, CoreError, CoreResult};
use crate::lexer::{lexer, Token};
use crate::process::{OrderConstraint, Perturbation, PerturbationMode};

/// Parse a process definition such as
/// `p p > t t~ QED=0 / h, (t > b w+, w+ > mu+ vm)`
pub fn parse_process(input: &str) -> CoreResult<ProcessDefinition> {
    let tokens = tokenize(input)?;
    let len = input.len();
    process_parser()
        .parse(Stream::from_iter(len..len + 1, tokens.into_iter()))
        .map_err(|errs| CoreError::Parse(format_parser_errors(input, errs)))
}

/// Parse a UFO color string such as `-1/2*I*f(1,2,-1)*T(-1,3,4)`
pub fn parse_color_string(input: &str) -> CoreResult<ColorString> {
    let tokens = lexer()
        .parse(input)
        .map_err(|errs| CoreError::ColorSyntax(format_lexer_errors(input, errs)))?;
    let len = input.len();
    let cs = color_string_parser()
        .parse(Stream::from_iter(len..len + 1, tokens.into_iter()))
        .map_err(|errs| CoreError::ColorSyntax(format_parser_errors(input, errs)))?;
    cs.validate()?;
    Ok(cs)
}

fn tokenize(input: &str) -> CoreResult<Vec<(Token, std::ops::Range<usize>)>> {
    lexer()
        .parse(input)
        .map_err(|errs| CoreError::Parse(format_lexer_errors(input, errs)))
}

// ============================================================================
// Helpers
// ============================================================================

/// Coupling-order keys are upper-case identifiers (`QCD`, `QED`, `WEIGHTED`)
pub fn is_order_key(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    first_ok
        && name.len() >= 2
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn name() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    select! { Token::Name(s) => s }
}

/// A particle or multiparticle label (anything that is not an order key)
fn label() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    filter_map(|span, tok: Token| match tok {
        Token::Name(s) if !is_order_key(&s) => Ok(s),
        other => Err(Simple::expected_input_found(span, None, Some(other))),
    })
}

fn order_key() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    filter_map(|span, tok: Token| match tok {
        Token::Name(s) if is_order_key(&s) => Ok(s),
        other => Err(Simple::expected_input_found(span, None, Some(other))),
    })
}

fn integer() -> impl Parser<Token, i64, Error = Simple<Token>> + Clone {
    name().try_map(|s, span| {
        s.parse::<i64>()
            .map_err(|_| Simple::custom(span, format!("expected an integer, found '{}'", s)))
    })
}

fn unsigned() -> impl Parser<Token, u32, Error = Simple<Token>> + Clone {
    name().try_map(|s, span| {
        s.parse::<u32>().map_err(|_| {
            Simple::custom(span, format!("expected a non-negative integer, found '{}'", s))
        })
    })
}

// ============================================================================
// Processes
// ============================================================================

fn order_item() -> impl Parser<Token, ProcessOption, Error = Simple<Token>> + Clone {
    let op = choice((
        just(Token::EqEq).to(OrderConstraint::Exactly as fn(u32) -> OrderConstraint),
        just(Token::Le).to(OrderConstraint::AtMost as fn(u32) -> OrderConstraint),
        just(Token::Eq).to(OrderConstraint::AtMost as fn(u32) -> OrderConstraint),
        just(Token::Gt).to(OrderConstraint::MoreThan as fn(u32) -> OrderConstraint),
    ));
    order_key()
        .then(op)
        .then(unsigned())
        .map(|((key, op), n)| ProcessOption::Order(key, op(n)))
}

/// `[virt=QCD]`, `[real=QCD QED]` or `[QCD]` (all)
fn perturbation() -> impl Parser<Token, ProcessOption, Error = Simple<Token>> + Clone {
    let mode = name()
        .try_map(|s, span| {
            PerturbationMode::from_name(&s)
                .ok_or_else(|| Simple::custom(span, format!("unknown correction mode '{}'", s)))
        })
        .then_ignore(just(Token::Eq));
    mode.or_not()
        .then(order_key().repeated().at_least(1))
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map(|(mode, orders)| {
            ProcessOption::Perturb(Perturbation {
                mode: mode.unwrap_or(PerturbationMode::All),
                orders,
            })
        })
}

fn process_option() -> impl Parser<Token, ProcessOption, Error = Simple<Token>> + Clone {
    let labels = label().repeated().at_least(1);
    choice((
        order_item(),
        perturbation(),
        just(Token::Slash)
            .ignore_then(labels.clone())
            .map(ProcessOption::Forbid),
        just(Token::DoubleDollar)
            .ignore_then(labels.clone())
            .map(ProcessOption::ForbidSChannel),
        just(Token::Dollar)
            .ignore_then(labels)
            .map(ProcessOption::ForbidOnshell),
    ))
}

/// A process without decay chains
fn core_process() -> impl Parser<Token, ProcessDefinition, Error = Simple<Token>> + Clone {
    label()
        .repeated()
        .at_least(1)
        .separated_by(just(Token::Gt))
        .at_least(2)
        .then(process_option().repeated())
        .map_with_span(|(mut segments, options), span: std::ops::Range<usize>| {
            let finals = segments.pop().unwrap_or_default();
            let initial = segments.remove(0);
            let mut def = ProcessDefinition::new(initial, finals, Span::new(span.start, span.end));
            def.required_s_channels = segments.into_iter().flatten().collect();
            for option in options {
                match option {
                    ProcessOption::Order(key, c) => def.orders.push((key, c)),
                    ProcessOption::Forbid(l) => def.forbidden_particles.extend(l),
                    ProcessOption::ForbidOnshell(l) => def.forbidden_onshell_s_channels.extend(l),
                    ProcessOption::ForbidSChannel(l) => def.forbidden_s_channels.extend(l),
                    ProcessOption::Perturb(p) => def.perturbation = Some(p),
                }
            }
            def
        })
}

/// Create a parser for a full process definition with decay chains
pub fn process_parser() -> impl Parser<Token, ProcessDefinition, Error = Simple<Token>> + Clone {
    let with_decays = recursive(|with_decays| {
        let decay = with_decays
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .or(core_process());
        core_process()
            .then(just(Token::Comma).ignore_then(decay).repeated())
            .map(|(mut def, decays): (ProcessDefinition, Vec<ProcessDefinition>)| {
                def.decays = decays;
                def
            })
    });
    with_decays.then_ignore(end())
}

// ============================================================================
// Color strings
// ============================================================================

#[derive(Clone, Debug)]
enum ColorFactorItem {
    Number(Rational64),
    Imaginary,
    NcPower(i32),
    Tensor(ColorObject),
}

fn tensor(name: &str, args: Vec<i32>) -> Result<ColorObject, String> {
    let want = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(format!("{} takes {} indices, got {}", name, n, args.len()))
        }
    };
    match name {
        "T" => {
            if args.len() < 2 {
                return Err("T needs at least two fundamental indices".into());
            }
            let n = args.len() - 2;
            Ok(ColorObject::t(args[..n].to_vec(), args[n], args[n + 1]))
        }
        "f" => want(3).map(|_| ColorObject::F(args[0], args[1], args[2])),
        "d" => want(3).map(|_| ColorObject::D(args[0], args[1], args[2])),
        "Epsilon" => want(3).map(|_| ColorObject::Epsilon(args[0], args[1], args[2])),
        "EpsilonBar" => want(3).map(|_| ColorObject::EpsilonBar(args[0], args[1], args[2])),
        "Identity" => want(2).map(|_| ColorObject::Kronecker(args[0], args[1])),
        "Tr" => Ok(ColorObject::Tr(args)),
        "K6" => want(3).map(|_| ColorObject::K6 {
            m: args[0],
            i: args[1],
            j: args[2],
        }),
        "K6Bar" => want(3).map(|_| ColorObject::K6Bar {
            m: args[0],
            i: args[1],
            j: args[2],
        }),
        "T6" => want(3).map(|_| ColorObject::T6 {
            a: args[0],
            m: args[1],
            n: args[2],
        }),
        other => Err(format!("unknown color tensor '{}'", other)),
    }
}

/// `n/d` as a reduced rational, refusing values whose reduction overflows
fn ratio(n: i64, d: i64) -> Result<Rational64, String> {
    if d == 0 {
        return Err("division by zero".into());
    }
    if n == i64::MIN || d == i64::MIN {
        return Err(format!("{}/{} is out of range", n, d));
    }
    Ok(Rational64::new(n, d))
}

fn color_factor() -> impl Parser<Token, ColorFactorItem, Error = Simple<Token>> + Clone {
    let index = integer().try_map(|i, span| {
        i32::try_from(i)
            .map_err(|_| Simple::custom(span, format!("color index {} is out of range", i)))
    });
    let nc = just(Token::Name("Nc".into()))
        .ignore_then(index.clone().delimited_by(just(Token::LParen), just(Token::RParen)))
        .map(ColorFactorItem::NcPower);
    let tensor = name()
        .then(
            index
                .separated_by(just(Token::Comma))
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .try_map(|(name, args), span| {
            tensor(&name, args)
                .map(ColorFactorItem::Tensor)
                .map_err(|msg| Simple::custom(span, msg))
        });
    let imaginary = just(Token::Name("I".into())).to(ColorFactorItem::Imaginary);
    let number = integer()
        .then(just(Token::Slash).ignore_then(integer()).or_not())
        .try_map(|(n, d), span| match d {
            Some(d) => ratio(n, d)
                .map(ColorFactorItem::Number)
                .map_err(|msg| Simple::custom(span, msg)),
            None => Ok(ColorFactorItem::Number(Rational64::from_integer(n))),
        });
    choice((nc, tensor, imaginary, number))
}

/// Create a parser for a product of color factors
pub fn color_string_parser() -> impl Parser<Token, ColorString, Error = Simple<Token>> + Clone {
    color_factor()
        .separated_by(just(Token::Star))
        .at_least(1)
        .then_ignore(end())
        .map(|items| {
            let mut cs = ColorString::one();
            for item in items {
                match item {
                    ColorFactorItem::Number(r) => cs = cs.scale(r),
                    ColorFactorItem::Imaginary => {
                        cs = cs.with_coefficient(&ColorCoefficient {
                            coeff: Rational64::from_integer(1),
                            imaginary: true,
                            nc_power: 0,
                        })
                    }
                    ColorFactorItem::NcPower(k) => cs.nc_power += k,
                    ColorFactorItem::Tensor(obj) => cs.objects.push(obj),
                }
            }
            cs
        })
}

// Unit tests live in tests/unit_parsing.rs
