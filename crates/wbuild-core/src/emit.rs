use std::collections::{HashMap, HashSet};

use ammonia::Builder;

use crate::ast::{KindAttrs, Node, NodeKind, NodeRef, Tree};
use crate::error::ParseError;
use crate::escape::{escape_html, unescape_braces};
use crate::list::{self, Counters};
use crate::options::HtmlEmitOptions;
use crate::resolver::{Resolver, escape_non_commands};

/// Emits HTML for the whole tree with default options.
pub fn emit_html(tree: &Tree) -> Result<String, ParseError> {
    emit_html_with_options(tree, &HtmlEmitOptions::default())
}

pub fn emit_html_with_options(tree: &Tree, options: &HtmlEmitOptions) -> Result<String, ParseError> {
    // Deterministic formatting: 2-space indentation and LF newlines.
    let resolver = Resolver::new(tree, options.max_depth);
    let mut emitter = Emitter {
        tree,
        options,
        resolver: &resolver,
        headings: Counters::default(),
        writer: HtmlWriter::new(),
    };
    emitter.node(tree.root())?;
    tracing::debug!(nodes = tree.len(), "emitted html");
    Ok(emitter.writer.finish())
}

/// Emits HTML and filters it through a safe allow-list.
pub fn emit_html_sanitized(tree: &Tree, options: &HtmlEmitOptions) -> Result<String, ParseError> {
    let raw_html = emit_html_with_options(tree, options)?;

    let tags: HashSet<&'static str> = [
        "a",
        "blockquote",
        "br",
        "code",
        "div",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "i",
        "img",
        "p",
        "pre",
        "span",
        "strong",
    ]
    .iter()
    .copied()
    .collect();

    let generic_attributes: HashSet<&'static str> =
        ["class", "id", "style"].iter().copied().collect();

    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", ["href", "target"].iter().copied().collect());
    tag_attributes.insert("img", ["src"].iter().copied().collect());

    let mut generic_attribute_prefixes = HashSet::new();
    generic_attribute_prefixes.insert("data-");

    Ok(Builder::new()
        .tags(tags)
        .generic_attributes(generic_attributes)
        .tag_attributes(tag_attributes)
        .generic_attribute_prefixes(generic_attribute_prefixes)
        .clean(&raw_html)
        .to_string())
}

pub(crate) struct HtmlWriter {
    out: String,
    indent: usize,
}

impl HtmlWriter {
    pub(crate) fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub(crate) fn finish(mut self) -> String {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

struct Emitter<'a> {
    tree: &'a Tree,
    options: &'a HtmlEmitOptions,
    resolver: &'a Resolver<'a>,
    headings: Counters,
    writer: HtmlWriter,
}

impl Emitter<'_> {
    fn node(&mut self, node_ref: NodeRef) -> Result<(), ParseError> {
        let tree = self.tree;
        let node = tree.node(node_ref);
        match node.kind {
            NodeKind::Section | NodeKind::Column => self.container(node_ref),
            NodeKind::Header | NodeKind::Subheader | NodeKind::Subsubheader => {
                let number = self.heading_number(node);
                write_heading(&mut self.writer, node, self.resolver, 0, number.as_deref())
            }
            NodeKind::Text => write_text(&mut self.writer, node, self.resolver),
            NodeKind::Code => {
                write_code(&mut self.writer, node, self.options);
                Ok(())
            }
            NodeKind::List => write_list(&mut self.writer, node, self.resolver, 0),
            NodeKind::Image => write_image(&mut self.writer, node, self.resolver),
            NodeKind::Blockquote => write_quote(&mut self.writer, node, self.resolver),
        }
    }

    fn container(&mut self, node_ref: NodeRef) -> Result<(), ParseError> {
        let tree = self.tree;
        let node = tree.node(node_ref);
        let children = tree.children(node_ref);
        let columns = children
            .iter()
            .filter(|child| tree.node(**child).kind == NodeKind::Column)
            .count()
            .clamp(1, 3);
        let bg = format!("bg{}", node.attrs.bg().unwrap_or(1));
        let columns = format!("columns{}", columns);
        let classes = class_list(&[bg.as_str(), columns.as_str(), node.attrs.class.as_str()]);
        self.writer.line(&format!(
            "<div id=\"{}\" class=\"{}\" data-theme=\"{}\"{}>",
            node.id,
            classes,
            self.options.theme,
            style_attr(node)
        ));
        self.writer.indent += 1;
        for child in children {
            self.node(*child)?;
        }
        self.writer.indent -= 1;
        self.writer.line("</div>");
        Ok(())
    }

    fn heading_number(&mut self, node: &Node) -> Option<String> {
        let level = usize::from(node.kind.heading_level()?);
        if !node.heading()?.numbered {
            return None;
        }
        self.headings.advance(level);
        Some(format!("{}.", self.headings.label(level)))
    }
}

/// Space-separated non-empty parts, escaped for a quoted attribute.
fn class_list(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    escape_html(&joined).into_owned()
}

fn class_attr(class: &str) -> String {
    let classes = class_list(&[class]);
    if classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", classes)
    }
}

fn style_attr(node: &Node) -> String {
    let mut style = String::new();
    if let Some(align) = node.attrs.align().filter(|align| !align.is_empty()) {
        style.push_str(&format!("text-align:{};", align));
    }
    if let KindAttrs::Image(image) = &node.attrs.specific {
        if !image.maxwidth.is_empty() {
            style.push_str(&format!("max-width:{};", image.maxwidth));
        }
    }
    if node.attrs.notopmarg() {
        style.push_str("margin-top: 0px;");
    }
    if style.is_empty() {
        return style;
    }
    format!(" style=\"{}\"", escape_html(&style))
}

pub(crate) fn write_heading(
    writer: &mut HtmlWriter,
    node: &Node,
    resolver: &Resolver<'_>,
    depth: usize,
    number: Option<&str>,
) -> Result<(), ParseError> {
    let level = node.kind.heading_level().unwrap_or(1);
    let label = node.heading().map(|h| h.label.as_str()).unwrap_or_default();
    let text = resolver.resolve(&escape_non_commands(label), depth)?;
    let prefix = number.map(|n| format!("{} ", n)).unwrap_or_default();
    writer.line(&format!(
        "<h{level} id=\"{}\"{}{}>{}{}</h{level}>",
        node.id,
        class_attr(&node.attrs.class),
        style_attr(node),
        prefix,
        text
    ));
    Ok(())
}

fn write_text(writer: &mut HtmlWriter, node: &Node, resolver: &Resolver<'_>) -> Result<(), ParseError> {
    let raw = node.body().unwrap_or_default();
    if raw.trim() == "\\tableofcontents" {
        // Block-level contents cannot sit inside a paragraph.
        writer.line(&format!(
            "<div id=\"{}\" class=\"{}\"{}>",
            node.id,
            class_list(&["toc-block", node.attrs.class.as_str()]),
            style_attr(node)
        ));
        writer.indent += 1;
        for line in resolver.resolve(raw.trim(), 0)?.lines() {
            writer.line(line);
        }
        writer.indent -= 1;
        writer.line("</div>");
        return Ok(());
    }
    let body = escape_non_commands(raw).replace('\n', "<br />");
    let text = resolver.resolve(&body, 0)?;
    writer.line(&format!(
        "<p id=\"{}\"{}{}>{}</p>",
        node.id,
        class_attr(&node.attrs.class),
        style_attr(node),
        text
    ));
    Ok(())
}

fn write_code(writer: &mut HtmlWriter, node: &Node, options: &HtmlEmitOptions) {
    let bg = format!("bg{}", node.attrs.bg().unwrap_or(2));
    let classes = class_list(&[bg.as_str(), "code", node.attrs.class.as_str()]);
    writer.line(&format!(
        "<div id=\"{}\" class=\"{}\" data-theme=\"{}\"{}>",
        node.id,
        classes,
        options.theme,
        style_attr(node)
    ));
    writer.indent += 1;
    let lang = match &node.attrs.specific {
        KindAttrs::Code(code) if !code.lang.trim().is_empty() => {
            format!(" class=\"language-{}\"", escape_html(code.lang.trim()))
        }
        _ => String::new(),
    };
    let body = unescape_braces(node.body().unwrap_or_default());
    writer.line(&format!(
        "<pre><code{}>{}</code></pre>",
        lang,
        escape_html(&body)
    ));
    writer.indent -= 1;
    writer.line("</div>");
}

pub(crate) fn write_list(
    writer: &mut HtmlWriter,
    node: &Node,
    resolver: &Resolver<'_>,
    depth: usize,
) -> Result<(), ParseError> {
    let KindAttrs::List(attrs) = &node.attrs.specific else {
        return Ok(());
    };
    let items = list::parse_items(node.body().unwrap_or_default());
    let lines = list::render_items(&items, attrs, resolver, depth)?;
    writer.line(&format!(
        "<pre id=\"{}\" class=\"{}\"{}>{}</pre>",
        node.id,
        class_list(&["list", node.attrs.class.as_str()]),
        style_attr(node),
        lines.join("<br />")
    ));
    Ok(())
}

fn write_image(writer: &mut HtmlWriter, node: &Node, resolver: &Resolver<'_>) -> Result<(), ParseError> {
    let KindAttrs::Image(image) = &node.attrs.specific else {
        return Ok(());
    };
    let src = if image.src.is_empty() {
        node.body().unwrap_or_default()
    } else {
        image.src.as_str()
    };
    writer.line(&format!("<figure id=\"{}\">", node.id));
    writer.indent += 1;
    writer.line(&format!(
        "<img{} src=\"{}\"{} />",
        class_attr(&node.attrs.class),
        escape_html(src.trim()),
        style_attr(node)
    ));
    if !image.caption.is_empty() {
        let caption = resolver.resolve(&escape_non_commands(&image.caption), 0)?;
        let caption = if image.italicize {
            format!("<i>{}</i>", caption)
        } else {
            caption
        };
        writer.line(&format!("<figcaption>{}</figcaption>", caption));
    }
    writer.indent -= 1;
    writer.line("</figure>");
    Ok(())
}

fn write_quote(writer: &mut HtmlWriter, node: &Node, resolver: &Resolver<'_>) -> Result<(), ParseError> {
    let body = escape_non_commands(node.body().unwrap_or_default()).replace('\n', "<br />");
    let text = resolver.resolve(&body, 0)?;
    let bg = format!("bg{}", node.attrs.bg().unwrap_or(1));
    let classes = class_list(&[bg.as_str(), node.attrs.class.as_str()]);
    writer.line(&format!(
        "<blockquote id=\"{}\" class=\"{}\"{}>{}</blockquote>",
        node.id,
        classes,
        style_attr(node),
        text
    ));
    Ok(())
}
