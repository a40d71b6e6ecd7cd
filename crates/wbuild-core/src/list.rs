use crate::ast::ListAttrs;
use crate::error::ParseError;
use crate::escape::escape_html;
use crate::resolver::Resolver;

pub const MAX_LEVEL: usize = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Marker {
    /// `*)`
    Bullet,
    /// `#)`
    Numbered,
    /// `-)`
    Plain,
}

impl Marker {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '*' => Some(Marker::Bullet),
            '#' => Some(Marker::Numbered),
            '-' => Some(Marker::Plain),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListItem {
    pub marker: Marker,
    /// 1 to [`MAX_LEVEL`], the number of repeated marker characters.
    pub level: usize,
    pub text: String,
}

/// Splits a list body into items. A line starting with a marker opens an
/// item, other non-blank lines continue the previous one, and text before
/// the first marker is a plain level-1 item. Empty items are dropped.
pub fn parse_items(body: &str) -> Vec<ListItem> {
    let mut items: Vec<ListItem> = Vec::new();
    for line in body.lines() {
        if let Some((marker, level, rest)) = split_marker(line) {
            items.push(ListItem {
                marker,
                level,
                text: rest.trim().to_string(),
            });
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match items.last_mut() {
            Some(last) => {
                if !last.text.is_empty() {
                    last.text.push('\n');
                }
                last.text.push_str(line);
            }
            None => items.push(ListItem {
                marker: Marker::Plain,
                level: 1,
                text: line.to_string(),
            }),
        }
    }
    items.retain(|item| !item.text.is_empty());
    items
}

fn split_marker(line: &str) -> Option<(Marker, usize, &str)> {
    let trimmed = line.trim_start();
    let first = trimmed.chars().next()?;
    let marker = Marker::from_char(first)?;
    let level = trimmed.chars().take_while(|ch| *ch == first).count();
    if level > MAX_LEVEL {
        return None;
    }
    let rest = trimmed[level..].strip_prefix(')')?;
    Some((marker, level, rest))
}

/// Per-level counters, shared by every item of one list or every numbered
/// heading of one document.
#[derive(Debug, Default)]
pub(crate) struct Counters([u32; MAX_LEVEL]);

impl Counters {
    /// `level` is 1-based and at most [`MAX_LEVEL`].
    pub(crate) fn advance(&mut self, level: usize) {
        self.0[level - 1] += 1;
        for deeper in &mut self.0[level..] {
            *deeper = 0;
        }
    }

    pub(crate) fn label(&self, level: usize) -> String {
        self.0[..level]
            .iter()
            .map(|count| (*count).max(1).to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Widest indentation a list item gets, whatever its offsets.
pub const MAX_INDENT: usize = 256;

fn indent(attrs: &ListAttrs, level: usize) -> String {
    let width = attrs
        .lvloffset
        .saturating_mul(level as i64 - 1)
        .saturating_add(attrs.baseoffset)
        .clamp(0, MAX_INDENT as i64);
    " ".repeat(width as usize)
}

/// One HTML fragment per item: indentation, symbol, then the item text
/// with its inline commands resolved.
pub(crate) fn render_items(
    items: &[ListItem],
    attrs: &ListAttrs,
    resolver: &Resolver<'_>,
    depth: usize,
) -> Result<Vec<String>, ParseError> {
    let mut counters = Counters::default();
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let level = item.level.clamp(1, MAX_LEVEL);
        let symbol = match item.marker {
            Marker::Bullet => "\u{2022}".to_string(),
            Marker::Plain => " ".to_string(),
            Marker::Numbered => {
                counters.advance(level);
                counters.label(level)
            }
        };
        if attrs.orderall && item.marker != Marker::Numbered {
            counters.advance(level);
        }
        let prefix = format!("{}{} ", indent(attrs, level), symbol);
        let text = resolver.resolve(&escape_html(&item.text), depth)?;
        lines.push(format!("{}{}", escape_html(&prefix), text));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attributes, KindAttrs, NodeKind, Tree};
    use pretty_assertions::assert_eq;

    fn list_attrs() -> ListAttrs {
        match Attributes::defaults(NodeKind::List).specific {
            KindAttrs::List(attrs) => attrs,
            _ => unreachable!(),
        }
    }

    fn render(body: &str, attrs: &ListAttrs) -> Vec<String> {
        let tree = Tree::new();
        let resolver = Resolver::new(&tree, 64);
        render_items(&parse_items(body), attrs, &resolver, 0).unwrap()
    }

    #[test]
    fn markers_set_kind_and_level() {
        let items = parse_items("*) one\n##) two\n---) three\n****) four");
        let summary: Vec<(Marker, usize, &str)> = items
            .iter()
            .map(|item| (item.marker, item.level, item.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Marker::Bullet, 1, "one"),
                (Marker::Numbered, 2, "two"),
                (Marker::Plain, 3, "three\n****) four"),
            ]
        );
    }

    #[test]
    fn leading_text_and_continuations() {
        let items = parse_items("intro\n*) item\n  wraps here\n\n*)\n");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].marker, Marker::Plain);
        assert_eq!(items[0].text, "intro");
        assert_eq!(items[1].text, "item\nwraps here");
    }

    #[test]
    fn numbering_follows_levels() {
        let lines = render("#) a\n##) b\n##) c\n#) d\n##) e", &list_attrs());
        assert_eq!(
            lines,
            vec!["  1 a", "      1.1 b", "      1.2 c", "  2 d", "      2.1 e"]
        );
    }

    #[test]
    fn orderall_counts_every_item() {
        let mut attrs = list_attrs();
        attrs.orderall = true;
        let lines = render("*) a\n#) b", &attrs);
        assert_eq!(lines, vec!["  \u{2022} a", "  2 b"]);
    }

    #[test]
    fn offsets_shape_indentation() {
        let mut attrs = list_attrs();
        attrs.lvloffset = 1;
        attrs.baseoffset = 0;
        let lines = render("*) a\n**) b\n--) c", &attrs);
        assert_eq!(lines, vec!["\u{2022} a", " \u{2022} b", "   c"]);
    }

    #[test]
    fn extreme_offsets_are_clamped() {
        let mut attrs = list_attrs();
        attrs.lvloffset = i64::MAX;
        attrs.baseoffset = i64::MAX;
        let lines = render("*) a\n##) b", &attrs);
        assert_eq!(lines[0], format!("{}\u{2022} a", " ".repeat(MAX_INDENT)));
        assert_eq!(lines[1], format!("{}1.1 b", " ".repeat(MAX_INDENT)));

        attrs.lvloffset = i64::MIN;
        attrs.baseoffset = 0;
        let lines = render("**) c", &attrs);
        assert_eq!(lines, vec!["\u{2022} c"]);
    }

    #[test]
    fn item_text_is_escaped_and_resolved() {
        let lines = render("*) a < \\bold{b}", &list_attrs());
        assert_eq!(lines, vec!["  \u{2022} a &lt; <strong>b</strong>"]);
    }
}
