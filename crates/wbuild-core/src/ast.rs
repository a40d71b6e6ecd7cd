use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier, used for anchors (`id="..."`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Draws the next id. Ids increase strictly in creation order and are
    /// never reused, even across trees.
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a node inside its [`Tree`] arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct NodeRef(pub u32);

impl NodeRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Section,
    Column,
    Header,
    Subheader,
    Subsubheader,
    Text,
    Code,
    List,
    Image,
    Blockquote,
}

impl NodeKind {
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Section,
        NodeKind::Column,
        NodeKind::Header,
        NodeKind::Subheader,
        NodeKind::Subsubheader,
        NodeKind::Text,
        NodeKind::Code,
        NodeKind::List,
        NodeKind::Image,
        NodeKind::Blockquote,
    ];

    /// Case-sensitive lookup of a tag word such as `section` or `bq`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        NodeKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Section => "section",
            NodeKind::Column => "column",
            NodeKind::Header => "header",
            NodeKind::Subheader => "subheader",
            NodeKind::Subsubheader => "subsubheader",
            NodeKind::Text => "text",
            NodeKind::Code => "code",
            NodeKind::List => "list",
            NodeKind::Image => "img",
            NodeKind::Blockquote => "bq",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Section | NodeKind::Column)
    }

    pub fn heading_level(self) -> Option<u8> {
        match self {
            NodeKind::Header => Some(1),
            NodeKind::Subheader => Some(2),
            NodeKind::Subsubheader => Some(3),
            _ => None,
        }
    }

    /// Leaves whose `[...]` body loses its enclosing bracket pair.
    pub fn strips_brackets(self) -> bool {
        matches!(self, NodeKind::Code | NodeKind::List | NodeKind::Blockquote)
    }

    /// Recognized attribute names and their types, `class` and `uid` included.
    pub fn schema(self) -> &'static [(&'static str, AttrType)] {
        match self {
            NodeKind::Section | NodeKind::Column => ContainerAttrs::FIELDS,
            NodeKind::Header | NodeKind::Subheader | NodeKind::Subsubheader => {
                HeadingAttrs::FIELDS
            }
            NodeKind::Text => TextAttrs::FIELDS,
            NodeKind::Code => CodeAttrs::FIELDS,
            NodeKind::List => ListAttrs::FIELDS,
            NodeKind::Image => ImageAttrs::FIELDS,
            NodeKind::Blockquote => QuoteAttrs::FIELDS,
        }
    }

    pub fn accepts(self, key: &str) -> bool {
        self.schema().iter().any(|(name, _)| *name == key)
    }

    pub fn attr_type(self, key: &str) -> Option<AttrType> {
        self.schema()
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, ty)| *ty)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttrType {
    Str,
    Int,
    Float,
    Bool,
}

impl AttrType {
    pub fn name(self) -> &'static str {
        match self {
            AttrType::Str => "string",
            AttrType::Int => "integer",
            AttrType::Float => "float",
            AttrType::Bool => "boolean",
        }
    }

    /// Converts a raw argument value. A boolean is true whenever it is
    /// given, whatever its value.
    pub fn coerce(self, raw: &str) -> Option<AttrValue> {
        let trimmed = raw.trim();
        match self {
            AttrType::Str => Some(AttrValue::Str(trimmed.to_string())),
            AttrType::Int => trimmed.parse().ok().map(AttrValue::Int),
            AttrType::Float => trimmed.parse().ok().map(AttrValue::Float),
            AttrType::Bool => Some(AttrValue::Bool(true)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(value) => f.write_str(value),
            AttrValue::Int(value) => write!(f, "{}", value),
            AttrValue::Float(value) => write!(f, "{}", value),
            AttrValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

trait Schema {
    const FIELDS: &'static [(&'static str, AttrType)];

    fn get(&self, key: &str) -> Option<AttrValue>;

    fn set(&mut self, key: &str, value: AttrValue) -> bool;
}

fn str_value(value: &str) -> Option<AttrValue> {
    Some(AttrValue::Str(value.to_string()))
}

fn put_str(slot: &mut String, value: AttrValue) -> bool {
    if let AttrValue::Str(value) = value {
        *slot = value;
        return true;
    }
    false
}

fn put_int(slot: &mut i64, value: AttrValue) -> bool {
    if let AttrValue::Int(value) = value {
        *slot = value;
        return true;
    }
    false
}

fn put_bool(slot: &mut bool, value: AttrValue) -> bool {
    if let AttrValue::Bool(value) = value {
        *slot = value;
        return true;
    }
    false
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContainerAttrs {
    pub align: String,
    pub bg: i64,
    pub notopmarg: bool,
}

impl Schema for ContainerAttrs {
    const FIELDS: &'static [(&'static str, AttrType)] = &[
        ("align", AttrType::Str),
        ("bg", AttrType::Int),
        ("class", AttrType::Str),
        ("notopmarg", AttrType::Bool),
        ("uid", AttrType::Str),
    ];

    fn get(&self, key: &str) -> Option<AttrValue> {
        match key {
            "align" => str_value(&self.align),
            "bg" => Some(AttrValue::Int(self.bg)),
            "notopmarg" => Some(AttrValue::Bool(self.notopmarg)),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: AttrValue) -> bool {
        match key {
            "align" => put_str(&mut self.align, value),
            "bg" => put_int(&mut self.bg, value),
            "notopmarg" => put_bool(&mut self.notopmarg, value),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeadingAttrs {
    pub label: String,
    pub numbered: bool,
    pub notopmarg: bool,
}

impl Schema for HeadingAttrs {
    const FIELDS: &'static [(&'static str, AttrType)] = &[
        ("label", AttrType::Str),
        ("numbered", AttrType::Bool),
        ("class", AttrType::Str),
        ("notopmarg", AttrType::Bool),
        ("uid", AttrType::Str),
    ];

    fn get(&self, key: &str) -> Option<AttrValue> {
        match key {
            "label" => str_value(&self.label),
            "numbered" => Some(AttrValue::Bool(self.numbered)),
            "notopmarg" => Some(AttrValue::Bool(self.notopmarg)),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: AttrValue) -> bool {
        match key {
            "label" => put_str(&mut self.label, value),
            "numbered" => put_bool(&mut self.numbered, value),
            "notopmarg" => put_bool(&mut self.notopmarg, value),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextAttrs {
    pub align: String,
    pub bg: i64,
    pub notopmarg: bool,
}

impl Schema for TextAttrs {
    const FIELDS: &'static [(&'static str, AttrType)] = &[
        ("align", AttrType::Str),
        ("bg", AttrType::Int),
        ("class", AttrType::Str),
        ("notopmarg", AttrType::Bool),
        ("uid", AttrType::Str),
    ];

    fn get(&self, key: &str) -> Option<AttrValue> {
        match key {
            "align" => str_value(&self.align),
            "bg" => Some(AttrValue::Int(self.bg)),
            "notopmarg" => Some(AttrValue::Bool(self.notopmarg)),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: AttrValue) -> bool {
        match key {
            "align" => put_str(&mut self.align, value),
            "bg" => put_int(&mut self.bg, value),
            "notopmarg" => put_bool(&mut self.notopmarg, value),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CodeAttrs {
    pub align: String,
    pub bg: i64,
    /// Syntax name for highlighting, e.g. `rust`.
    pub lang: String,
    pub notopmarg: bool,
}

impl Schema for CodeAttrs {
    const FIELDS: &'static [(&'static str, AttrType)] = &[
        ("align", AttrType::Str),
        ("bg", AttrType::Int),
        ("class", AttrType::Str),
        ("lang", AttrType::Str),
        ("notopmarg", AttrType::Bool),
        ("uid", AttrType::Str),
    ];

    fn get(&self, key: &str) -> Option<AttrValue> {
        match key {
            "align" => str_value(&self.align),
            "bg" => Some(AttrValue::Int(self.bg)),
            "lang" => str_value(&self.lang),
            "notopmarg" => Some(AttrValue::Bool(self.notopmarg)),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: AttrValue) -> bool {
        match key {
            "align" => put_str(&mut self.align, value),
            "bg" => put_int(&mut self.bg, value),
            "lang" => put_str(&mut self.lang, value),
            "notopmarg" => put_bool(&mut self.notopmarg, value),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListAttrs {
    /// Advance the numbering counters for bullet and plain items too.
    pub orderall: bool,
    pub lvloffset: i64,
    pub baseoffset: i64,
    pub notopmarg: bool,
}

impl Schema for ListAttrs {
    const FIELDS: &'static [(&'static str, AttrType)] = &[
        ("orderall", AttrType::Bool),
        ("lvloffset", AttrType::Int),
        ("baseoffset", AttrType::Int),
        ("class", AttrType::Str),
        ("notopmarg", AttrType::Bool),
        ("uid", AttrType::Str),
    ];

    fn get(&self, key: &str) -> Option<AttrValue> {
        match key {
            "orderall" => Some(AttrValue::Bool(self.orderall)),
            "lvloffset" => Some(AttrValue::Int(self.lvloffset)),
            "baseoffset" => Some(AttrValue::Int(self.baseoffset)),
            "notopmarg" => Some(AttrValue::Bool(self.notopmarg)),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: AttrValue) -> bool {
        match key {
            "orderall" => put_bool(&mut self.orderall, value),
            "lvloffset" => put_int(&mut self.lvloffset, value),
            "baseoffset" => put_int(&mut self.baseoffset, value),
            "notopmarg" => put_bool(&mut self.notopmarg, value),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageAttrs {
    pub src: String,
    /// CSS length, e.g. `60%`.
    pub maxwidth: String,
    pub caption: String,
    pub label: String,
    pub italicize: bool,
    pub notopmarg: bool,
}

impl Schema for ImageAttrs {
    const FIELDS: &'static [(&'static str, AttrType)] = &[
        ("src", AttrType::Str),
        ("maxwidth", AttrType::Str),
        ("caption", AttrType::Str),
        ("label", AttrType::Str),
        ("italicize", AttrType::Bool),
        ("class", AttrType::Str),
        ("notopmarg", AttrType::Bool),
        ("uid", AttrType::Str),
    ];

    fn get(&self, key: &str) -> Option<AttrValue> {
        match key {
            "src" => str_value(&self.src),
            "maxwidth" => str_value(&self.maxwidth),
            "caption" => str_value(&self.caption),
            "label" => str_value(&self.label),
            "italicize" => Some(AttrValue::Bool(self.italicize)),
            "notopmarg" => Some(AttrValue::Bool(self.notopmarg)),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: AttrValue) -> bool {
        match key {
            "src" => put_str(&mut self.src, value),
            "maxwidth" => put_str(&mut self.maxwidth, value),
            "caption" => put_str(&mut self.caption, value),
            "label" => put_str(&mut self.label, value),
            "italicize" => put_bool(&mut self.italicize, value),
            "notopmarg" => put_bool(&mut self.notopmarg, value),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteAttrs {
    pub align: String,
    pub bg: i64,
    pub notopmarg: bool,
}

impl Schema for QuoteAttrs {
    const FIELDS: &'static [(&'static str, AttrType)] = &[
        ("align", AttrType::Str),
        ("bg", AttrType::Int),
        ("class", AttrType::Str),
        ("notopmarg", AttrType::Bool),
        ("uid", AttrType::Str),
    ];

    fn get(&self, key: &str) -> Option<AttrValue> {
        match key {
            "align" => str_value(&self.align),
            "bg" => Some(AttrValue::Int(self.bg)),
            "notopmarg" => Some(AttrValue::Bool(self.notopmarg)),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: AttrValue) -> bool {
        match key {
            "align" => put_str(&mut self.align, value),
            "bg" => put_int(&mut self.bg, value),
            "notopmarg" => put_bool(&mut self.notopmarg, value),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "schema", rename_all = "lowercase")]
pub enum KindAttrs {
    Container(ContainerAttrs),
    Heading(HeadingAttrs),
    Text(TextAttrs),
    Code(CodeAttrs),
    List(ListAttrs),
    Image(ImageAttrs),
    Quote(QuoteAttrs),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attributes {
    pub class: String,
    pub uid: String,
    #[serde(flatten)]
    pub specific: KindAttrs,
}

impl Attributes {
    /// Default attribute set for `kind`.
    pub fn defaults(kind: NodeKind) -> Self {
        let specific = match kind {
            NodeKind::Section | NodeKind::Column => KindAttrs::Container(ContainerAttrs {
                align: "justify".to_string(),
                bg: 1,
                notopmarg: kind == NodeKind::Column,
            }),
            NodeKind::Header | NodeKind::Subheader | NodeKind::Subsubheader => {
                KindAttrs::Heading(HeadingAttrs {
                    label: String::new(),
                    numbered: false,
                    notopmarg: false,
                })
            }
            NodeKind::Text => KindAttrs::Text(TextAttrs {
                align: "justify".to_string(),
                bg: 1,
                notopmarg: false,
            }),
            NodeKind::Code => KindAttrs::Code(CodeAttrs {
                align: "left".to_string(),
                bg: 2,
                lang: String::new(),
                notopmarg: false,
            }),
            NodeKind::List => KindAttrs::List(ListAttrs {
                orderall: false,
                lvloffset: 4,
                baseoffset: 2,
                notopmarg: false,
            }),
            NodeKind::Image => KindAttrs::Image(ImageAttrs {
                src: String::new(),
                maxwidth: "100%".to_string(),
                caption: String::new(),
                label: String::new(),
                italicize: true,
                notopmarg: false,
            }),
            NodeKind::Blockquote => KindAttrs::Quote(QuoteAttrs {
                align: "justify".to_string(),
                bg: 1,
                notopmarg: false,
            }),
        };
        Self {
            class: String::new(),
            uid: String::new(),
            specific,
        }
    }

    pub fn get(&self, key: &str) -> Option<AttrValue> {
        match key {
            "class" => str_value(&self.class),
            "uid" => str_value(&self.uid),
            _ => match &self.specific {
                KindAttrs::Container(attrs) => attrs.get(key),
                KindAttrs::Heading(attrs) => attrs.get(key),
                KindAttrs::Text(attrs) => attrs.get(key),
                KindAttrs::Code(attrs) => attrs.get(key),
                KindAttrs::List(attrs) => attrs.get(key),
                KindAttrs::Image(attrs) => attrs.get(key),
                KindAttrs::Quote(attrs) => attrs.get(key),
            },
        }
    }

    /// Stores an already coerced value. Returns `false` when the key is
    /// unknown or the value has the wrong type; the set is left unchanged.
    pub fn set(&mut self, key: &str, value: AttrValue) -> bool {
        match key {
            "class" => put_str(&mut self.class, value),
            "uid" => put_str(&mut self.uid, value),
            _ => match &mut self.specific {
                KindAttrs::Container(attrs) => attrs.set(key, value),
                KindAttrs::Heading(attrs) => attrs.set(key, value),
                KindAttrs::Text(attrs) => attrs.set(key, value),
                KindAttrs::Code(attrs) => attrs.set(key, value),
                KindAttrs::List(attrs) => attrs.set(key, value),
                KindAttrs::Image(attrs) => attrs.set(key, value),
                KindAttrs::Quote(attrs) => attrs.set(key, value),
            },
        }
    }

    pub fn align(&self) -> Option<&str> {
        match &self.specific {
            KindAttrs::Container(attrs) => Some(&attrs.align),
            KindAttrs::Text(attrs) => Some(&attrs.align),
            KindAttrs::Code(attrs) => Some(&attrs.align),
            KindAttrs::Quote(attrs) => Some(&attrs.align),
            _ => None,
        }
    }

    pub fn bg(&self) -> Option<i64> {
        match &self.specific {
            KindAttrs::Container(attrs) => Some(attrs.bg),
            KindAttrs::Text(attrs) => Some(attrs.bg),
            KindAttrs::Code(attrs) => Some(attrs.bg),
            KindAttrs::Quote(attrs) => Some(attrs.bg),
            _ => None,
        }
    }

    pub fn notopmarg(&self) -> bool {
        match &self.specific {
            KindAttrs::Container(attrs) => attrs.notopmarg,
            KindAttrs::Heading(attrs) => attrs.notopmarg,
            KindAttrs::Text(attrs) => attrs.notopmarg,
            KindAttrs::Code(attrs) => attrs.notopmarg,
            KindAttrs::List(attrs) => attrs.notopmarg,
            KindAttrs::Image(attrs) => attrs.notopmarg,
            KindAttrs::Quote(attrs) => attrs.notopmarg,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Children(Vec<NodeRef>),
    Body(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub id: NodeId,
    pub attrs: Attributes,
    pub payload: Payload,
}

impl Node {
    /// Builds a node with the kind's default attributes and an empty payload.
    pub fn new(kind: NodeKind) -> Self {
        let payload = if kind.is_container() {
            Payload::Children(Vec::new())
        } else {
            Payload::Body(String::new())
        };
        Self {
            kind,
            id: NodeId::fresh(),
            attrs: Attributes::defaults(kind),
            payload,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match &self.payload {
            Payload::Body(body) => Some(body),
            Payload::Children(_) => None,
        }
    }

    pub fn children(&self) -> &[NodeRef] {
        match &self.payload {
            Payload::Children(children) => children,
            Payload::Body(_) => &[],
        }
    }

    pub fn heading(&self) -> Option<&HeadingAttrs> {
        match &self.attrs.specific {
            KindAttrs::Heading(attrs) => Some(attrs),
            _ => None,
        }
    }
}

/// Document tree stored as an arena. Node 0 is the root Section; the
/// parent table is kept in step with every insertion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tree {
    nodes: Vec<Node>,
    parents: Vec<Option<NodeRef>>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Section)],
            parents: vec![None],
        }
    }

    pub fn root(&self) -> NodeRef {
        NodeRef(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn node(&self, node: NodeRef) -> &Node {
        &self.nodes[node.index()]
    }

    pub(crate) fn node_mut(&mut self, node: NodeRef) -> &mut Node {
        &mut self.nodes[node.index()]
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.parents[node.index()]
    }

    pub fn children(&self, node: NodeRef) -> &[NodeRef] {
        self.node(node).children()
    }

    /// Appends `node` as the last child of the container `parent`.
    pub(crate) fn append(&mut self, parent: NodeRef, node: Node) -> NodeRef {
        debug_assert!(self.node(parent).kind.is_container());
        let node_ref = NodeRef(self.nodes.len() as u32);
        self.nodes.push(node);
        self.parents.push(Some(parent));
        if let Payload::Children(children) = &mut self.nodes[parent.index()].payload {
            children.push(node_ref);
        }
        node_ref
    }

    /// Depth-first, pre-order walk starting at the root.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![self.root()],
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Preorder<'a> {
    tree: &'a Tree,
    stack: Vec<NodeRef>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(next).iter().rev().copied());
        Some(next)
    }
}
