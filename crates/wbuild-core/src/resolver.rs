use crate::ast::{AttrValue, KindAttrs, Node, NodeKind, Payload, Tree};
use crate::command::{Command, CommandName, extract_commands};
use crate::emit::{self, HtmlWriter};
use crate::error::ParseError;
use crate::escape::{decode_html, escape_braces, escape_html, unescape_braces};
use crate::index::search_by_uid;
use crate::options::DEFAULT_MAX_DEPTH;

/// HTML-escapes everything in `text` except command syntax. Escaping never
/// touches `\`, braces or word characters, so commands survive intact.
pub fn escape_non_commands(text: &str) -> String {
    escape_html(text).into_owned()
}

/// Replaces every inline command in already escaped `text` with its HTML.
///
/// Text outside commands only has `\{` and `\}` unescaped. Link display
/// text and the contents of `\bold` and `\italic` are resolved recursively;
/// `\textcode` contents are literal.
pub fn resolve_commands(text: &str, tree: &Tree) -> Result<String, ParseError> {
    Resolver::new(tree, DEFAULT_MAX_DEPTH).resolve(text, 0)
}

pub(crate) struct Resolver<'a> {
    tree: &'a Tree,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(tree: &'a Tree, max_depth: usize) -> Self {
        Self { tree, max_depth }
    }

    pub(crate) fn resolve(&self, text: &str, depth: usize) -> Result<String, ParseError> {
        if depth > self.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.max_depth,
                span: None,
            });
        }
        let commands = extract_commands(text, self.max_depth)?;
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for command in &commands {
            out.push_str(&unescape_braces(&text[last..command.span.start]));
            out.push_str(&self.substitute(command, depth)?);
            last = command.span.end;
        }
        out.push_str(&unescape_braces(&text[last..]));
        Ok(out)
    }

    fn substitute(&self, command: &Command, depth: usize) -> Result<String, ParseError> {
        match command.name {
            CommandName::Link => self.link(command, depth),
            CommandName::Bold => Ok(format!(
                "<strong>{}</strong>",
                self.resolve_arg(command, 0, depth)?
            )),
            CommandName::Italic => Ok(format!("<i>{}</i>", self.resolve_arg(command, 0, depth)?)),
            CommandName::TextCode => {
                let code = command
                    .value(0)
                    .filter(|value| !value.is_empty())
                    .or_else(|| command.value(1))
                    .unwrap_or_default();
                Ok(format!(
                    "<span class=\"textcode\" style=\"display:inline\">{}</span>",
                    code
                ))
            }
            CommandName::ShowArg => self.show_arg(command),
            CommandName::TableOfContents => self.table_of_contents(depth),
        }
    }

    fn resolve_arg(&self, command: &Command, index: usize, depth: usize) -> Result<String, ParseError> {
        match command.arg(index) {
            Some(arg) => self.resolve(&arg.raw, depth + 1),
            None => Ok(String::new()),
        }
    }

    fn link(&self, command: &Command, depth: usize) -> Result<String, ParseError> {
        let target = command.value(0).unwrap_or_default().trim();
        if target.is_empty() {
            return Err(ParseError::malformed("link", "empty link target"));
        }
        let display = match command.arg(1) {
            Some(arg) if !arg.raw.trim().is_empty() => self.resolve(&arg.raw, depth + 1)?,
            _ => target.to_string(),
        };
        match target.strip_prefix('#') {
            Some(uid) => {
                let node = self.lookup(uid)?;
                Ok(format!(
                    "<a class=\"link\" href=\"#{}\">{}</a>",
                    node.id, display
                ))
            }
            None => Ok(format!(
                "<a class=\"link\" href=\"{}\" target=\"_blank\">{}</a>",
                target, display
            )),
        }
    }

    /// Looks up a uid taken from escaped text.
    fn lookup(&self, uid: &str) -> Result<&'a Node, ParseError> {
        let decoded = decode_html(uid);
        search_by_uid(self.tree, &decoded)
            .map(|(node, _)| self.tree.node(node))
            .ok_or_else(|| ParseError::UnresolvedReference {
                target: format!("#{}", decoded),
            })
    }

    fn show_arg(&self, command: &Command) -> Result<String, ParseError> {
        let uid = command
            .value(0)
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| ParseError::malformed("showarg", "missing uid"))?;
        let attribute = command
            .value(1)
            .map(str::trim)
            .filter(|attribute| !attribute.is_empty())
            .ok_or_else(|| ParseError::malformed("showarg", "missing attribute name"))?;

        let node = self.lookup(uid)?;
        let value = node
            .attrs
            .get(attribute)
            .ok_or_else(|| ParseError::UnknownAttribute {
                uid: decode_html(uid).into_owned(),
                attribute: attribute.to_string(),
                kind: node.kind,
            })?;
        let rendered = escape_html(&value.to_string()).into_owned();
        if attribute == "label" {
            return Ok(format!(
                "<a class=\"link\" href=\"#{}\">{}</a>",
                node.id, rendered
            ));
        }
        Ok(rendered)
    }

    /// A "Contents" subheader and a numbered list linking to every heading
    /// that has a uid, indented by heading level.
    fn table_of_contents(&self, depth: usize) -> Result<String, ParseError> {
        let mut body = String::new();
        for node_ref in self.tree.preorder() {
            let node = self.tree.node(node_ref);
            let (Some(level), Some(heading)) = (node.kind.heading_level(), node.heading()) else {
                continue;
            };
            if node.attrs.uid.is_empty() {
                continue;
            }
            let label = if heading.label.is_empty() {
                &node.attrs.uid
            } else {
                &heading.label
            };
            body.push_str(&format!(
                "{}) \\link{{#{}}}{{{}}}\n",
                "#".repeat(usize::from(level)),
                escape_braces(&node.attrs.uid),
                label
            ));
        }

        let mut title = Node::new(NodeKind::Subheader);
        title
            .attrs
            .set("label", AttrValue::Str("Contents".to_string()));
        let mut list = Node::new(NodeKind::List);
        list.attrs.class = "toc".to_string();
        list.payload = Payload::Body(body);

        let mut writer = HtmlWriter::new();
        emit::write_heading(&mut writer, &title, self, depth + 1, None)?;
        emit::write_list(&mut writer, &list, self, depth + 1)?;
        Ok(writer.finish())
    }
}

/// Texts of `node` that may carry inline commands.
pub(crate) fn command_texts(node: &Node) -> Vec<&str> {
    match node.kind {
        NodeKind::Text | NodeKind::Blockquote | NodeKind::List => {
            node.body().into_iter().collect()
        }
        NodeKind::Header | NodeKind::Subheader | NodeKind::Subsubheader => {
            node.heading().map(|h| h.label.as_str()).into_iter().collect()
        }
        NodeKind::Image => match &node.attrs.specific {
            KindAttrs::Image(image) => vec![image.caption.as_str()],
            _ => Vec::new(),
        },
        NodeKind::Section | NodeKind::Column | NodeKind::Code => Vec::new(),
    }
}

/// Resolves every command-bearing text once so reference, attribute and
/// syntax errors surface at parse time.
pub(crate) fn validate_commands(tree: &Tree, max_depth: usize) -> Result<(), ParseError> {
    let resolver = Resolver::new(tree, max_depth);
    for node_ref in tree.preorder() {
        for text in command_texts(tree.node(node_ref)) {
            resolver.resolve(&escape_non_commands(text), 0)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree_with_heading(uid: &str, label: &str) -> (Tree, String) {
        let mut tree = Tree::new();
        let root = tree.root();
        let mut header = Node::new(NodeKind::Header);
        header.attrs.set("uid", AttrValue::Str(uid.to_string()));
        header.attrs.set("label", AttrValue::Str(label.to_string()));
        let id = header.id.to_string();
        tree.append(root, header);
        (tree, id)
    }

    #[test]
    fn formatting_commands_nest() {
        let tree = Tree::new();
        let html = resolve_commands("a \\bold{b \\italic{c}} d", &tree).unwrap();
        assert_eq!(html, "a <strong>b <i>c</i></strong> d");
    }

    #[test]
    fn textcode_is_literal() {
        let tree = Tree::new();
        let html = resolve_commands("\\textcode{\\bold{x} \\{ \\}}", &tree).unwrap();
        assert_eq!(
            html,
            "<span class=\"textcode\" style=\"display:inline\">\\bold{x} { }</span>"
        );
    }

    #[test]
    fn escaped_braces_outside_commands_are_unescaped() {
        let tree = Tree::new();
        assert_eq!(resolve_commands("f() \\{ x \\}", &tree).unwrap(), "f() { x }");
    }

    #[test]
    fn internal_links_use_node_ids() {
        let (tree, id) = tree_with_heading("intro", "Introduction");
        let html = resolve_commands("\\link{#intro}{the \\bold{intro}}", &tree).unwrap();
        assert_eq!(
            html,
            format!("<a class=\"link\" href=\"#{id}\">the <strong>intro</strong></a>")
        );
        let bare = resolve_commands("\\link{#intro}", &tree).unwrap();
        assert_eq!(bare, format!("<a class=\"link\" href=\"#{id}\">#intro</a>"));
    }

    #[test]
    fn external_links_open_a_new_tab() {
        let tree = Tree::new();
        let html = resolve_commands("\\link{https://example.com}{site}", &tree).unwrap();
        assert_eq!(
            html,
            "<a class=\"link\" href=\"https://example.com\" target=\"_blank\">site</a>"
        );
    }

    #[test]
    fn missing_targets_fail() {
        let tree = Tree::new();
        assert_eq!(
            resolve_commands("\\link{#nowhere}{x}", &tree),
            Err(ParseError::UnresolvedReference {
                target: "#nowhere".to_string()
            })
        );
        assert_eq!(
            resolve_commands("\\link{}{x}", &tree),
            Err(ParseError::malformed("link", "empty link target"))
        );
    }

    #[test]
    fn showarg_reads_attributes() {
        let (tree, id) = tree_with_heading("intro", "Intro & more");
        assert_eq!(
            resolve_commands("\\showarg{intro}{numbered}", &tree).unwrap(),
            "false"
        );
        assert_eq!(
            resolve_commands("\\showarg{intro}{label}", &tree).unwrap(),
            format!("<a class=\"link\" href=\"#{id}\">Intro &amp; more</a>")
        );
        assert_eq!(
            resolve_commands("\\showarg{intro}{lang}", &tree),
            Err(ParseError::UnknownAttribute {
                uid: "intro".to_string(),
                attribute: "lang".to_string(),
                kind: NodeKind::Header,
            })
        );
        assert_eq!(
            resolve_commands("\\showarg{intro}", &tree),
            Err(ParseError::malformed("showarg", "missing attribute name"))
        );
    }

    #[test]
    fn table_of_contents_links_labelled_headings() {
        let (tree, id) = tree_with_heading("intro", "Introduction");
        let html = resolve_commands("\\tableofcontents", &tree).unwrap();
        assert!(html.contains(">Contents</h2>"), "{html}");
        assert!(html.contains("<pre "), "{html}");
        assert!(
            html.contains(&format!("<a class=\"link\" href=\"#{id}\">Introduction</a>")),
            "{html}"
        );
    }

    #[test]
    fn recursion_is_bounded() {
        let tree = Tree::new();
        let resolver = Resolver::new(&tree, 2);
        let err = resolver
            .resolve("\\bold{\\bold{\\bold{\\bold{x}}}}", 0)
            .unwrap_err();
        assert_eq!(err.code(), crate::error::E_NESTING_DEPTH);
    }
}
