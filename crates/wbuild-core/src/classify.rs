use crate::ast::NodeKind;
use crate::tokenizer::Fragment;

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FragmentClass {
    Tag(NodeKind),
    Arguments(Vec<Argument>),
    Text,
}

/// Decides what a fragment means given the kind of the node currently open.
///
/// Tags win over arguments. An argument list only counts as one when every
/// key belongs to the open node's schema; anything else, including argument
/// syntax with nothing open, is text.
pub fn classify(fragment: &Fragment, open: Option<NodeKind>) -> FragmentClass {
    let Some(inner) = delimited_inner(fragment) else {
        return FragmentClass::Text;
    };
    if let Some(kind) = parse_tag(inner) {
        return FragmentClass::Tag(kind);
    }
    if let (Some(kind), Some(arguments)) = (open, parse_arguments(inner)) {
        if arguments.iter().all(|argument| kind.accepts(&argument.key)) {
            return FragmentClass::Arguments(arguments);
        }
    }
    FragmentClass::Text
}

fn delimited_inner(fragment: &Fragment) -> Option<&str> {
    if !fragment.delimited {
        return None;
    }
    fragment
        .text
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
}

pub fn parse_tag(inner: &str) -> Option<NodeKind> {
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    NodeKind::from_tag(inner)
}

/// Parses `key=value, key=value`. A comma only separates pairs when the
/// next key and its `=` follow it, so values may contain commas.
pub fn parse_arguments(inner: &str) -> Option<Vec<Argument>> {
    let mut arguments = Vec::new();
    let mut key_start = skip_whitespace(inner, 0);
    let mut key_end = key_at(inner, key_start)?;

    loop {
        let value_start = key_end + 1;
        let separator = next_separator(inner, value_start);
        let value_end = separator.unwrap_or(inner.len());
        arguments.push(Argument {
            key: inner[key_start..key_end].to_string(),
            value: inner[value_start..value_end].trim().to_string(),
        });

        let Some(comma) = separator else {
            break;
        };
        key_start = skip_whitespace(inner, comma + 1);
        key_end = key_at(inner, key_start)?;
    }
    Some(arguments)
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut pos = from;
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// End of a key starting at `start`, if a non-empty key is immediately
/// followed by `=`.
fn key_at(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut end = start;
    while end < bytes.len() && is_key_byte(bytes[end]) {
        end += 1;
    }
    (end > start && bytes.get(end) == Some(&b'=')).then_some(end)
}

fn next_separator(text: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(offset) = text[search..].find(',') {
        let comma = search + offset;
        if key_at(text, skip_whitespace(text, comma + 1)).is_some() {
            return Some(comma);
        }
        search = comma + 1;
    }
    None
}
