use std::panic;

use wbuild_core::{
    Fragment, Node, NodeKind, Tree, emit_html, normalize_whitespace, parse, resolve_commands,
    tokenize,
};

const CASES: usize = 200;
const MAX_LEN: usize = 256;
const CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABC0123456789 \
\n\t#*-)=,.[]{}<>&\"'\\\\éÜ—€日😀";
const WORDS: &[&str] = &[
    "[section]",
    "[column]",
    "[header]",
    "[subheader]",
    "[text]",
    "[code]",
    "[list]",
    "[img]",
    "[bq]",
    "[class=a]",
    "[uid=x]",
    "[label=T]",
    "[numbered=yes]",
    "*) item\n",
    "#) step\n",
    "\\bold{b}",
    "\\italic{i}",
    "\\textcode{c}",
    "\\link{https://x.org}{x}",
    "\\{",
    "\\}",
    "\\[",
    "\\]",
    "\\é",
    "C:\\Übersicht",
    "\\— ",
    " ",
    "\n",
    "word",
];

#[test]
fn parser_never_panics_on_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x5e1d_94a0_77c3_2b1f);
    for case in 0..CASES {
        let len = rng.gen_range(0, MAX_LEN + 1);
        let source = random_string(&mut rng, len);
        let result = panic::catch_unwind(|| {
            if let Ok(tree) = parse(&source) {
                let _ = emit_html(&tree);
            }
        });
        if result.is_err() {
            return Err(format!("panicked for case {}: {:?}", case, source).into());
        }
    }
    Ok(())
}

#[test]
fn structured_documents_emit_well_formed_html() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x0bad_cafe_1234_5678);
    for case in 0..CASES {
        let source = random_document(&mut rng, 24);
        let tree = match parse(&source) {
            Ok(tree) => tree,
            Err(_) => continue,
        };
        let html = emit_html(&tree)?;
        if let Err(err) = roxmltree::Document::parse(&html) {
            return Err(format!(
                "case {} produced malformed html ({}):\n{}\nSource:\n{:?}",
                case, err, html, source
            )
            .into());
        }
    }
    Ok(())
}

#[test]
fn fragment_spans_are_ordered_and_in_bounds() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x2468_ace0_1357_9bdf);
    for case in 0..CASES {
        let source = random_document(&mut rng, 16);
        let fragments = tokenize(&source, 64)?;
        check_spans(&fragments, &source)
            .map_err(|message| format!("case {}: {}\nSource: {:?}", case, message, source))?;
    }
    Ok(())
}

fn check_spans(fragments: &[Fragment], source: &str) -> Result<(), String> {
    let mut prev_end = 0;
    for fragment in fragments {
        let span = fragment.span;
        if span.start < prev_end || span.end > source.len() || span.start > span.end {
            return Err(format!("span {:?} out of order (previous end {})", span, prev_end));
        }
        if fragment.delimited && span.slice(source) != fragment.text {
            return Err(format!(
                "delimited span {:?} does not cover {:?}",
                span, fragment.text
            ));
        }
        prev_end = span.end;
    }
    Ok(())
}

#[test]
fn tag_only_markup_reconstructs_modulo_whitespace() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x1357_2468_9bdf_ace0);
    for _ in 0..CASES {
        let count = rng.gen_range(1, 12);
        let mut source = String::new();
        for _ in 0..count {
            source.push_str(WORDS[rng.gen_range(0, 9)]);
            for _ in 0..rng.gen_range(0, 3) {
                source.push(if rng.gen_range(0, 2) == 0 { ' ' } else { '\n' });
            }
        }
        let joined: String = tokenize(&source, 64)?
            .iter()
            .map(|fragment| fragment.span.slice(&source))
            .collect();
        assert_eq!(joined, normalize_whitespace(&source).trim_end());
    }
    Ok(())
}

#[test]
fn resolution_is_idempotent_on_plain_output() -> Result<(), Box<dyn std::error::Error>> {
    let tree = Tree::new();
    let mut rng = Lcg::new(0x7777_1111_3333_5555);
    for _ in 0..CASES {
        let mut text = String::new();
        for _ in 0..rng.gen_range(1, 10) {
            text.push_str(WORDS[rng.gen_range(15, 19)]);
            text.push(' ');
        }
        let once = resolve_commands(&text, &tree)?;
        let twice = resolve_commands(&once, &tree)?;
        assert_eq!(once, twice, "input {:?}", text);
    }
    Ok(())
}

#[test]
fn node_ids_increase_in_creation_order() {
    let nodes: Vec<Node> = NodeKind::ALL.iter().map(|kind| Node::new(*kind)).collect();
    for pair in nodes.windows(2) {
        assert!(pair[0].id < pair[1].id);
    }

    let tree = parse("[section][header][text]a[column][code]b[list]*) c").unwrap();
    let ids: Vec<_> = tree.preorder().map(|node| tree.node(node).id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

fn random_document(rng: &mut Lcg, max_words: usize) -> String {
    let count = rng.gen_range(0, max_words + 1);
    let mut out = String::new();
    for _ in 0..count {
        out.push_str(WORDS[rng.gen_range(0, WORDS.len())]);
    }
    out
}

fn random_string(rng: &mut Lcg, len: usize) -> String {
    let charset: Vec<char> = CHARSET.chars().collect();
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        out.push(charset[rng.gen_range(0, charset.len())]);
    }
    out
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let span = max - min;
        let value = (self.next() >> 1) as usize;
        min + (value % span)
    }
}
