use crate::ast::{KindAttrs, Node, NodeKind, NodeRef, Payload, Tree};
use crate::classify::{Argument, FragmentClass, classify};
use crate::error::ParseError;
use crate::escape::strip_enclosing_brackets;
use crate::index::ensure_unique_uids;
use crate::options::ParseOptions;
use crate::resolver::validate_commands;
use crate::span::Span;
use crate::tokenizer::{Fragment, tokenize};

/// Parses markup into a tree with default options.
pub fn parse(markup: &str) -> Result<Tree, ParseError> {
    parse_with_options(markup, &ParseOptions::default())
}

/// Tokenizes, classifies and assembles `markup`, then resolves every
/// command-bearing text once. Any failure aborts the whole parse.
pub fn parse_with_options(markup: &str, options: &ParseOptions) -> Result<Tree, ParseError> {
    let fragments = tokenize(markup, options.max_depth)?;
    let mut assembler = Assembler::new();
    for fragment in &fragments {
        assembler.feed(fragment)?;
    }
    let tree = assembler.finish();
    tracing::debug!(nodes = tree.len(), "assembled tree");

    if options.reject_duplicate_uids {
        ensure_unique_uids(&tree)?;
    }
    validate_commands(&tree, options.max_depth)?;
    Ok(tree)
}

/// Builds a tree one fragment at a time, tracking the node that argument
/// lists and body text attach to.
#[derive(Debug, Default)]
pub struct Assembler {
    tree: Tree,
    cursor: Option<NodeRef>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The last node created or given content; `None` until the first one.
    pub fn cursor(&self) -> Option<NodeRef> {
        self.cursor
    }

    pub fn open_kind(&self) -> Option<NodeKind> {
        self.cursor.map(|cursor| self.tree.node(cursor).kind)
    }

    pub fn feed(&mut self, fragment: &Fragment) -> Result<(), ParseError> {
        match classify(fragment, self.open_kind()) {
            FragmentClass::Tag(kind) => {
                tracing::trace!(kind = %kind, "tag");
                self.open_tag(kind);
            }
            FragmentClass::Arguments(arguments) => {
                tracing::trace!(count = arguments.len(), "arguments");
                self.apply_arguments(&arguments, &fragment.text, fragment.span)?;
            }
            FragmentClass::Text => {
                tracing::trace!(len = fragment.text.len(), "text");
                self.apply_text(fragment);
            }
        }
        Ok(())
    }

    /// Creates a node of `kind`, places it and makes it the cursor.
    pub fn open_tag(&mut self, kind: NodeKind) -> NodeRef {
        let parent = self.insertion_parent(kind);
        let node = self.tree.append(parent, Node::new(kind));
        self.cursor = Some(node);
        node
    }

    /// Where a new node of `kind` goes, relative to the cursor.
    fn insertion_parent(&self, kind: NodeKind) -> NodeRef {
        let root = self.tree.root();
        let Some(cursor) = self.cursor else {
            return root;
        };
        let cursor_kind = self.tree.node(cursor).kind;
        let parent = self.tree.parent(cursor).unwrap_or(root);
        match kind {
            NodeKind::Section => root,
            NodeKind::Column => match cursor_kind {
                NodeKind::Section => cursor,
                NodeKind::Column => parent,
                _ if self.tree.node(parent).kind == NodeKind::Section => parent,
                _ => self.tree.parent(parent).unwrap_or(root),
            },
            _ if cursor_kind.is_container() => cursor,
            _ => parent,
        }
    }

    /// Coerces and stores each argument on the cursor. Keys the cursor's
    /// kind does not know are skipped.
    pub fn apply_arguments(
        &mut self,
        arguments: &[Argument],
        fragment: &str,
        span: Span,
    ) -> Result<(), ParseError> {
        let Some(cursor) = self.cursor else {
            return Err(ParseError::UnboundArgument {
                fragment: fragment.to_string(),
                span,
            });
        };
        let node = self.tree.node_mut(cursor);
        for argument in arguments {
            let Some(ty) = node.kind.attr_type(&argument.key) else {
                continue;
            };
            let value = ty
                .coerce(&argument.value)
                .ok_or_else(|| ParseError::InvalidAttributeValue {
                    key: argument.key.clone(),
                    value: argument.value.clone(),
                    expected: ty.name(),
                    span,
                })?;
            node.attrs.set(&argument.key, value);
        }
        Ok(())
    }

    /// Gives `fragment` to the cursor when it is an empty body-taking leaf,
    /// otherwise places a new Text node. Returns the node that got the text.
    pub fn apply_text(&mut self, fragment: &Fragment) -> NodeRef {
        if let Some(cursor) = self.cursor {
            let node = self.tree.node_mut(cursor);
            if takes_fragment(node) {
                let text = if node.kind.strips_brackets() && fragment.delimited {
                    strip_enclosing_brackets(&fragment.text)
                } else {
                    fragment.text.as_str()
                };
                node.payload = Payload::Body(text.to_string());
                return cursor;
            }
        }

        let mut node = Node::new(NodeKind::Text);
        node.payload = Payload::Body(fragment.text.clone());
        let parent = self.insertion_parent(NodeKind::Text);
        let text = self.tree.append(parent, node);
        self.cursor = Some(text);
        text
    }

    pub fn finish(self) -> Tree {
        self.tree
    }
}

fn takes_fragment(node: &Node) -> bool {
    let empty_body = node.body().is_some_and(str::is_empty);
    match &node.attrs.specific {
        KindAttrs::Image(image) => empty_body && image.src.is_empty(),
        KindAttrs::Code(_) | KindAttrs::List(_) | KindAttrs::Quote(_) | KindAttrs::Text(_) => {
            empty_body
        }
        KindAttrs::Container(_) | KindAttrs::Heading(_) => false,
    }
}
