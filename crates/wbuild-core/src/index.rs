use std::collections::HashSet;

use crate::ast::{NodeId, NodeRef, Tree};
use crate::error::ParseError;

/// First node in pre-order whose id matches, with its parent (`None` for the
/// root).
pub fn search_by_id(tree: &Tree, id: NodeId) -> Option<(NodeRef, Option<NodeRef>)> {
    find(tree, |node| tree.node(node).id == id)
}

/// First node in pre-order whose `uid` attribute matches. An empty uid never
/// matches.
pub fn search_by_uid(tree: &Tree, uid: &str) -> Option<(NodeRef, Option<NodeRef>)> {
    if uid.is_empty() {
        return None;
    }
    find(tree, |node| tree.node(node).attrs.uid == uid)
}

fn find(
    tree: &Tree,
    mut matches: impl FnMut(NodeRef) -> bool,
) -> Option<(NodeRef, Option<NodeRef>)> {
    tree.preorder()
        .find(|node| matches(*node))
        .map(|node| (node, tree.parent(node)))
}

/// Fails on the first uid carried by more than one node.
pub fn ensure_unique_uids(tree: &Tree) -> Result<(), ParseError> {
    let mut seen = HashSet::new();
    for node in tree.preorder() {
        let uid = tree.node(node).attrs.uid.as_str();
        if !uid.is_empty() && !seen.insert(uid) {
            return Err(ParseError::DuplicateUid {
                uid: uid.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AttrValue, Node, NodeKind};

    fn with_uid(kind: NodeKind, uid: &str) -> Node {
        let mut node = Node::new(kind);
        node.attrs.set("uid", AttrValue::Str(uid.to_string()));
        node
    }

    #[test]
    fn finds_nodes_with_their_parents() {
        let mut tree = Tree::new();
        let root = tree.root();
        let section = tree.append(root, with_uid(NodeKind::Section, "s"));
        let text = tree.append(section, with_uid(NodeKind::Text, "t"));

        assert_eq!(search_by_uid(&tree, "t"), Some((text, Some(section))));
        assert_eq!(search_by_uid(&tree, "s"), Some((section, Some(root))));
        let root_id = tree.node(root).id;
        assert_eq!(search_by_id(&tree, root_id), Some((root, None)));
        assert_eq!(search_by_uid(&tree, "missing"), None);
        assert_eq!(search_by_uid(&tree, ""), None);
    }

    #[test]
    fn first_duplicate_in_preorder_wins() {
        let mut tree = Tree::new();
        let root = tree.root();
        let section = tree.append(root, Node::new(NodeKind::Section));
        let nested = tree.append(section, with_uid(NodeKind::Text, "dup"));
        tree.append(root, with_uid(NodeKind::Text, "dup"));

        assert_eq!(search_by_uid(&tree, "dup"), Some((nested, Some(section))));
        assert_eq!(
            ensure_unique_uids(&tree),
            Err(ParseError::DuplicateUid {
                uid: "dup".to_string()
            })
        );
    }
}
