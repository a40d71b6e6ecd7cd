use thiserror::Error;

use crate::ast::NodeKind;
use crate::span::Span;

pub const E_UNBOUND_ARG: &str = "E_UNBOUND_ARG";
pub const E_UNRESOLVED_REF: &str = "E_UNRESOLVED_REF";
pub const E_UNKNOWN_ATTR: &str = "E_UNKNOWN_ATTR";
pub const E_MALFORMED_CMD: &str = "E_MALFORMED_CMD";
pub const E_ATTR_VALUE: &str = "E_ATTR_VALUE";
pub const E_NESTING_DEPTH: &str = "E_NESTING_DEPTH";
pub const E_UID_DUP: &str = "E_UID_DUP";

/// Every failure is fatal for the whole document; nothing is rendered
/// from a tree that produced one of these.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("argument list `{fragment}` has no node to apply to")]
    UnboundArgument { fragment: String, span: Span },

    #[error("unresolved reference `{target}`")]
    UnresolvedReference { target: String },

    #[error("attribute `{attribute}` does not exist on {kind} node with uid `{uid}`")]
    UnknownAttribute {
        uid: String,
        attribute: String,
        kind: NodeKind,
    },

    #[error("malformed command `\\{command}`: {reason}")]
    MalformedCommand { command: String, reason: String },

    #[error("invalid value `{value}` for attribute `{key}` (expected {expected})")]
    InvalidAttributeValue {
        key: String,
        value: String,
        expected: &'static str,
        span: Span,
    },

    #[error("nesting depth exceeds the limit of {limit}")]
    NestingTooDeep { limit: usize, span: Option<Span> },

    #[error("uid `{uid}` is assigned to more than one node")]
    DuplicateUid { uid: String },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::UnboundArgument { .. } => E_UNBOUND_ARG,
            ParseError::UnresolvedReference { .. } => E_UNRESOLVED_REF,
            ParseError::UnknownAttribute { .. } => E_UNKNOWN_ATTR,
            ParseError::MalformedCommand { .. } => E_MALFORMED_CMD,
            ParseError::InvalidAttributeValue { .. } => E_ATTR_VALUE,
            ParseError::NestingTooDeep { .. } => E_NESTING_DEPTH,
            ParseError::DuplicateUid { .. } => E_UID_DUP,
        }
    }

    /// Source location, for errors raised while reading the markup itself.
    /// Errors raised while resolving commands inside node text have none.
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnboundArgument { span, .. } => Some(*span),
            ParseError::InvalidAttributeValue { span, .. } => Some(*span),
            ParseError::NestingTooDeep { span, .. } => *span,
            _ => None,
        }
    }

    pub(crate) fn malformed(command: &str, reason: impl Into<String>) -> Self {
        ParseError::MalformedCommand {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}
