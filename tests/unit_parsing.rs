//! Unit tests for lexer and parser

use chumsky::Parser;
use feyncore::color::ColorObject;
use feyncore::lexer::{lexer, Token};
use feyncore::parser::{is_order_key, parse_color_string, parse_process};
use feyncore::process::PerturbationMode;
use feyncore::{CoreError, OrderConstraint};
use num_rational::Rational64;

// ============================================================================
// Lexer tests
// ============================================================================

#[test]
fn test_lex_simple_process() {
    let result = lexer().parse("e+ e- > mu+ mu-");
    assert!(result.is_ok());
    let tokens: Vec<_> = result.unwrap().into_iter().map(|(t, _)| t).collect();
    assert_eq!(
        tokens,
        vec![
            Token::Name("e+".to_string()),
            Token::Name("e-".to_string()),
            Token::Gt,
            Token::Name("mu+".to_string()),
            Token::Name("mu-".to_string()),
        ]
    );
}

#[test]
fn test_lex_two_character_operators() {
    let result = lexer().parse("QCD==2 QED<=1 $$ z $ a");
    let tokens: Vec<_> = result.unwrap().into_iter().map(|(t, _)| t).collect();
    assert_eq!(
        tokens,
        vec![
            Token::Name("QCD".to_string()),
            Token::EqEq,
            Token::Name("2".to_string()),
            Token::Name("QED".to_string()),
            Token::Le,
            Token::Name("1".to_string()),
            Token::DoubleDollar,
            Token::Name("z".to_string()),
            Token::Dollar,
            Token::Name("a".to_string()),
        ]
    );
}

#[test]
fn test_lex_comment_skipped() {
    let result = lexer().parse("g g > t t~ # top pairs\n");
    let tokens: Vec<_> = result.unwrap().into_iter().map(|(t, _)| t).collect();
    assert_eq!(tokens.len(), 5);
}

#[test]
fn test_lex_spans() {
    let result = lexer().parse("u  u~").unwrap();
    assert_eq!(result[0].1, 0..1);
    assert_eq!(result[1].1, 3..5);
}

#[test]
fn test_lex_rejects_unknown_character() {
    assert!(lexer().parse("u u~ > z @").is_err());
}

// ============================================================================
// Process parser tests
// ============================================================================

#[test]
fn test_order_keys() {
    assert!(is_order_key("QCD"));
    assert!(is_order_key("WEIGHTED"));
    assert!(!is_order_key("t"));
    assert!(!is_order_key("Z"));
    assert!(!is_order_key("mu+"));
}

#[test]
fn test_parse_full_option_set() {
    let def = parse_process("u u~ > z > e- e+ QED<=2 QCD==0 / h $ a [virt=QCD]").unwrap();
    assert_eq!(def.initial, vec!["u", "u~"]);
    assert_eq!(def.required_s_channels, vec!["z"]);
    assert_eq!(def.finals, vec!["e-", "e+"]);
    assert_eq!(
        def.orders,
        vec![
            ("QED".to_string(), OrderConstraint::AtMost(2)),
            ("QCD".to_string(), OrderConstraint::Exactly(0)),
        ]
    );
    assert_eq!(def.forbidden_particles, vec!["h"]);
    assert_eq!(def.forbidden_onshell_s_channels, vec!["a"]);
    let pert = def.perturbation.unwrap();
    assert_eq!(pert.mode, PerturbationMode::Virt);
    assert_eq!(pert.orders, vec!["QCD"]);
}

#[test]
fn test_parse_order_operators() {
    let def = parse_process("g g > t t~ QCD=2 QED>0").unwrap();
    assert_eq!(
        def.orders,
        vec![
            ("QCD".to_string(), OrderConstraint::AtMost(2)),
            ("QED".to_string(), OrderConstraint::MoreThan(0)),
        ]
    );
}

#[test]
fn test_parse_bare_perturbation_means_all() {
    let def = parse_process("e+ e- > u u~ [QCD]").unwrap();
    assert_eq!(def.perturbation.unwrap().mode, PerturbationMode::All);
    let def = parse_process("e+ e- > u u~ [real=QCD QED]").unwrap();
    let pert = def.perturbation.unwrap();
    assert_eq!(pert.mode, PerturbationMode::Real);
    assert_eq!(pert.orders.len(), 2);
}

#[test]
fn test_parse_double_dollar() {
    let def = parse_process("u u~ > e+ e- $$ z").unwrap();
    assert_eq!(def.forbidden_s_channels, vec!["z"]);
    assert!(def.forbidden_onshell_s_channels.is_empty());
}

#[test]
fn test_parse_nested_decays() {
    let def = parse_process("g g > t t~, (t > b w+, w+ > mu+ vm), t~ > b~ w-").unwrap();
    assert_eq!(def.decays.len(), 2);
    assert_eq!(def.decays[0].initial, vec!["t"]);
    assert_eq!(def.decays[0].decays.len(), 1);
    assert_eq!(def.decays[0].decays[0].finals, vec!["mu+", "vm"]);
    assert_eq!(def.decays[1].finals, vec!["b~", "w-"]);
}

#[test]
fn test_display_reparses() {
    let text = "g g > t t~ QCD<=2 / h, (t > b w+, w+ > mu+ vm), t~ > b~ w-";
    let def = parse_process(text).unwrap();
    let printed = def.to_string();
    let reparsed = parse_process(&printed).expect("reparse failed");
    assert_eq!(reparsed.initial, def.initial);
    assert_eq!(reparsed.orders, def.orders);
    assert_eq!(reparsed.decays.len(), def.decays.len());
    assert_eq!(reparsed.decays[0].decays, def.decays[0].decays);
}

#[test]
fn test_parse_errors() {
    assert!(matches!(parse_process("u u~"), Err(CoreError::Parse(_))));
    assert!(matches!(parse_process("> e+ e-"), Err(CoreError::Parse(_))));
    assert!(matches!(parse_process("u u~ > e+ e- QED<=x"), Err(CoreError::Parse(_))));
    assert!(matches!(parse_process("u u~ > e+ e- [loop=QCD]"), Err(CoreError::Parse(_))));
}

#[test]
fn test_parse_error_report_points_at_source() {
    let Err(CoreError::Parse(report)) = parse_process("u u~ > e+ e- QED<=x") else {
        panic!("expected a parse error");
    };
    assert!(report.contains("Syntax error"));
}

// ============================================================================
// Color string parser tests
// ============================================================================

#[test]
fn test_parse_color_string() {
    let cs = parse_color_string("-1/2*I*f(1,2,-1)*T(-1,3,4)").unwrap();
    assert_eq!(cs.coeff, Rational64::new(-1, 2));
    assert!(cs.imaginary);
    assert_eq!(
        cs.objects,
        vec![ColorObject::F(1, 2, -1), ColorObject::t(vec![-1], 3, 4)]
    );
}

#[test]
fn test_parse_color_generator_chain() {
    let cs = parse_color_string("T(1,2,3,4)").unwrap();
    assert_eq!(cs.objects, vec![ColorObject::t(vec![1, 2], 3, 4)]);
    let cs = parse_color_string("Identity(2,1)").unwrap();
    assert_eq!(cs.objects, vec![ColorObject::Kronecker(2, 1)]);
}

#[test]
fn test_color_display_roundtrip() {
    for text in ["T(3,2,1)", "f(1,2,3)", "2*Tr(1,2)", "-1/3*Nc(-1)*Identity(1,2)", "Epsilon(1,2,3)"] {
        let cs = parse_color_string(text).unwrap();
        let again = parse_color_string(&cs.to_string()).unwrap();
        assert_eq!(cs, again, "{}", text);
    }
}

#[test]
fn test_color_syntax_errors() {
    assert!(matches!(parse_color_string("f(1,2)"), Err(CoreError::ColorSyntax(_))));
    assert!(matches!(parse_color_string("Q(1,2,3)"), Err(CoreError::ColorSyntax(_))));
    assert!(matches!(parse_color_string("1/0"), Err(CoreError::ColorSyntax(_))));
    // internal index used once
    assert!(matches!(parse_color_string("T(-1,2,3)"), Err(CoreError::ColorSyntax(_))));
}

#[test]
fn test_color_numbers_out_of_range() {
    assert!(matches!(
        parse_color_string("T(1,2,99999999999)"),
        Err(CoreError::ColorSyntax(_))
    ));
    assert!(matches!(parse_color_string("Nc(4294967296)"), Err(CoreError::ColorSyntax(_))));
    assert!(matches!(
        parse_color_string("-9223372036854775808/-1"),
        Err(CoreError::ColorSyntax(_))
    ));
    assert!(matches!(
        parse_color_string("1/-9223372036854775808"),
        Err(CoreError::ColorSyntax(_))
    ));
    let cs = parse_color_string("4/-6*T(2147483647,1,2)").unwrap();
    assert_eq!(cs.coeff, Rational64::new(-2, 3));
    assert_eq!(cs.objects, vec![ColorObject::t(vec![2147483647], 1, 2)]);
}
