use serde::Serialize;

/// Half-open byte range into the markup source.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Shrinks the span to the non-whitespace part of `source[start..end]`.
    pub fn trimmed(&self, source: &str) -> Span {
        let slice = &source[self.start..self.end];
        let leading = slice.len() - slice.trim_start().len();
        let trailing = slice.len() - slice.trim_end().len();
        if leading == slice.len() {
            return Span {
                start: self.start,
                end: self.start,
            };
        }
        Span {
            start: self.start + leading,
            end: self.end - trailing,
        }
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

#[cfg(test)]
mod tests {
    use super::Span;

    #[test]
    fn trimmed_drops_edge_whitespace() {
        let source = "  [text]\n";
        let span = Span {
            start: 0,
            end: source.len(),
        }
        .trimmed(source);
        assert_eq!(span.slice(source), "[text]");
        assert_eq!(span, Span { start: 2, end: 8 });
    }

    #[test]
    fn trimmed_whitespace_only_is_empty() {
        let source = " \u{a0} ";
        let span = Span {
            start: 0,
            end: source.len(),
        }
        .trimmed(source);
        assert!(span.is_empty());
        assert_eq!(span.slice(source), "");
    }
}
