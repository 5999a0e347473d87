//! Error types for feyncore
//!
//! Every fallible operation returns [`CoreResult`]. Parse errors from the
//! process and color-string grammars are rendered with ariadne before they are
//! wrapped, so callers get a printable report with the offending span.

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::SimpleReason;
use chumsky::prelude::Simple;
use thiserror::Error;

use crate::lexer::Token;

/// Errors surfaced by the engine
#[derive(Debug, Error)]
pub enum CoreError {
    /// A particle or interaction violates a model invariant
    #[error("model consistency: {0}")]
    ModelConsistency(String),

    /// A physics object setter received a value outside its contract
    #[error("invalid attribute `{attribute}`: {reason}")]
    InvalidAttribute { attribute: String, reason: String },

    /// Unknown particle ids or contradictory constraints
    #[error("invalid process: {0}")]
    InvalidProcess(String),

    /// The generator exhausted its search without finding a diagram
    #[error("no diagrams for process {0}")]
    NoDiagrams(String),

    /// Coupling-order constraints refer to unknown orders or were violated
    #[error("inconsistent coupling orders: {0}")]
    OrderInconsistent(String),

    /// Malformed color index structure
    #[error("color syntax: {0}")]
    ColorSyntax(String),

    /// Internal invariant failure while assembling an amplitude
    #[error("amplitude consistency: {message}")]
    AmplitudeConsistency { message: String, trace: Vec<String> },

    /// The decay engine could not enumerate channels for a particle
    #[error("channel generation failed for {pdg}: {reason}")]
    ChannelGenerationFailed { pdg: i32, reason: String },

    /// Decay composition rejected
    #[error("incompatible decay: {0}")]
    IncompatibleDecay(String),

    /// Cooperative cancellation was requested
    #[error("operation cancelled")]
    Cancelled,

    /// Syntax error in a process or color string (already formatted)
    #[error("{0}")]
    Parse(String),

    /// Bad session configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Model snapshot could not be written or read
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn invalid_attribute(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidAttribute {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    pub fn amplitude(message: impl Into<String>, trace: Vec<String>) -> Self {
        CoreError::AmplitudeConsistency {
            message: message.into(),
            trace,
        }
    }

    /// Whether the caller may recover by skipping the offending process
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::NoDiagrams(_))
    }
}

// ============================================================================
// REPORT FORMATTING
// ============================================================================

/// Format lexer errors into a user-friendly string
pub fn format_lexer_errors(source: &str, errors: Vec<Simple<char>>) -> String {
    let mut output = Vec::new();

    for error in errors {
        let span = error.span();
        let found = error
            .found()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string());
        let report = Report::build(ReportKind::Error, (), span.start)
            .with_message("Lexical error")
            .with_label(
                Label::new(span)
                    .with_message(format!("Unexpected character {}", found))
                    .with_color(Color::Red),
            );

        if report
            .finish()
            .write(Source::from(source), &mut output)
            .is_err()
        {
            return "Error formatting failed".to_string();
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

/// Format parser errors into a user-friendly string
///
/// The token stream carries character spans, so error spans index the source.
pub fn format_parser_errors(source: &str, errors: Vec<Simple<Token>>) -> String {
    let mut output = Vec::new();

    for error in errors {
        let span = error.span();
        let char_span = span.start.min(source.len())..span.end.min(source.len());

        let report = Report::build(ReportKind::Error, (), char_span.start)
            .with_message("Syntax error")
            .with_label(
                Label::new(char_span)
                    .with_message(format_parser_error(&error))
                    .with_color(Color::Red),
            );

        if report
            .finish()
            .write(Source::from(source), &mut output)
            .is_err()
        {
            return "Error formatting failed".to_string();
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

fn format_parser_error(error: &Simple<Token>) -> String {
    if let SimpleReason::Custom(msg) = error.reason() {
        return msg.clone();
    }

    let found = error
        .found()
        .map(|t| format!("'{}'", t))
        .unwrap_or_else(|| "end of input".to_string());

    let expected: Vec<String> = error
        .expected()
        .filter_map(|opt| opt.as_ref())
        .map(|t| format!("'{}'", t))
        .collect();

    if expected.is_empty() {
        format!("Unexpected token {}", found)
    } else {
        format!("Unexpected {}, expected one of: {}", found, expected.join(", "))
    }
}
