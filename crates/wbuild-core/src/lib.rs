mod ast;
mod classify;
mod command;
mod emit;
mod error;
mod escape;
mod index;
mod list;
mod options;
mod parser;
mod resolver;
mod source_map;
mod span;
mod tokenizer;

pub use ast::{
    AttrType, AttrValue, Attributes, CodeAttrs, ContainerAttrs, HeadingAttrs, ImageAttrs,
    KindAttrs, ListAttrs, Node, NodeId, NodeKind, NodeRef, Payload, Preorder, QuoteAttrs,
    TextAttrs, Tree,
};
pub use classify::{Argument, FragmentClass, classify, parse_arguments, parse_tag};
pub use command::{Command, CommandArg, CommandName, extract_commands};
pub use emit::{emit_html, emit_html_sanitized, emit_html_with_options};
pub use error::{
    E_ATTR_VALUE, E_MALFORMED_CMD, E_NESTING_DEPTH, E_UID_DUP, E_UNBOUND_ARG, E_UNKNOWN_ATTR,
    E_UNRESOLVED_REF, ParseError,
};
pub use index::{ensure_unique_uids, search_by_id, search_by_uid};
pub use list::{ListItem, MAX_INDENT, MAX_LEVEL, Marker, parse_items};
pub use options::{DEFAULT_MAX_DEPTH, HtmlEmitOptions, ParseOptions, ThemeMode};
pub use parser::{Assembler, parse, parse_with_options};
pub use resolver::{escape_non_commands, resolve_commands};
pub use source_map::{Location, SourceMap};
pub use span::Span;
pub use tokenizer::{Fragment, normalize_whitespace, tokenize, whitespace_cuts};
