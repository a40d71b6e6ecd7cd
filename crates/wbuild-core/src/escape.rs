use std::borrow::Cow;

/// Escapes `& < > " '` for use in element content and quoted attributes.
pub(crate) fn escape_html(text: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(text)
}

pub(crate) fn decode_html(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}

/// Turns `\{` and `\}` back into bare braces.
pub(crate) fn unescape_braces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '{' || next == '}' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

/// Escapes braces so `text` can be embedded as a command argument.
pub(crate) fn escape_braces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '{' || ch == '}' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Drops one enclosing `[...]` pair and the whitespace inside it.
pub(crate) fn strip_enclosing_brackets(text: &str) -> &str {
    match text.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        Some(inner) => inner.trim(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_keeps_command_syntax() {
        let escaped = escape_html("a < b & \\bold{\"x\"}");
        assert_eq!(escaped, "a &lt; b &amp; \\bold{&quot;x&quot;}");
    }

    #[test]
    fn braces_round_trip() {
        let escaped = escape_braces("f(x) { y }");
        assert_eq!(escaped, "f(x) \\{ y \\}");
        assert_eq!(unescape_braces(&escaped), "f(x) { y }");
        assert_eq!(unescape_braces("a \\ b \\"), "a \\ b \\");
    }

    #[test]
    fn only_a_full_bracket_pair_is_stripped() {
        assert_eq!(strip_enclosing_brackets("[ print(1) ]"), "print(1)");
        assert_eq!(strip_enclosing_brackets("print(1)"), "print(1)");
        assert_eq!(strip_enclosing_brackets("[a] b"), "[a] b");
        assert_eq!(strip_enclosing_brackets("[[x]]"), "[x]");
    }
}
