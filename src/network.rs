//! Network Module
//!
//! Rooted phylogenetic networks with labelled leaves. Reticulation nodes
//! (in-degree >= 2) are not stored specially; they are recognised from the
//! adjacency structure, which keeps every edge-removal operation local to
//! the two endpoint nodes.
//!
//! `network` module contains the graph type itself, the extended newick
//! parser (`newick`) and the displayed-trees pipeline (`display`).

use std::collections::HashMap;

use crate::PhyloError;
use crate::Result;

pub mod display;
mod newick;

/// A rooted phylogenetic network.
///
/// Nodes live in a slab indexed by node id; removed nodes leave a `None`
/// behind so ids of surviving nodes stay stable across edge removals and
/// elementary-node suppression. The root can move (a unary root is collapsed
/// onto its child), so it is tracked explicitly rather than pinned to
/// index 0.
#[derive(Clone, Debug)]
pub struct Network {
    nodes: Vec<Option<Node>>,
    root: usize,
}

/// A node storing its optional leaf label and direction-tagged adjacencies.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Node {
    i: usize,
    label: Option<String>,
    adjs: Vec<Adj>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
struct Adj {
    is_to: bool, //true when the adjacent node is a child
    i: usize,    //id of the adjacent node
}

//   ------------------------------- NETWORK Implementation
impl Network {
    // ----- Constructors and Building
    pub(crate) fn new() -> Self {
        Network {
            nodes: vec![],
            root: 0,
        }
    }

    /// Interprets an extended newick format string into a network.
    ///
    /// Hybrid nodes use the `#Hk` convention and may be referenced before
    /// they are defined. Leaves with empty names are kept as unlabelled
    /// leaves. Branch lengths are accepted and discarded.
    pub fn parse_newick(newick_string: &str) -> Result<Self> {
        newick::network(newick_string)
    }

    pub(crate) fn add_node_i(&mut self, i: usize) {
        self.add_node(Node::new(i, None));
    }

    pub(crate) fn add_leaf(&mut self, i: usize, label: Option<String>) {
        self.add_node(Node::new(i, label));
    }

    fn add_node(&mut self, new_node: Node) {
        let index = new_node.i;
        if index >= self.nodes.len() {
            self.nodes.resize(index + 1, None);
        }
        self.nodes.replace_w_some(new_node, index);
    }

    pub(crate) fn add_edge(&mut self, outnode_i: usize, innode_i: usize) {
        self.get_node_mut(outnode_i).add_child(innode_i);
        self.get_node_mut(innode_i).add_parent(outnode_i);
    }

    /// Removes one `parent -> child` edge. With parallel edges (a
    /// reticulation whose two parents coincide) only a single instance is
    /// removed, which is exactly what resolving one reticulation choice
    /// needs.
    pub fn remove_edge(&mut self, parent_i: usize, child_i: usize) {
        self.get_node_mut(parent_i).remove_adj(child_i, true);
        self.get_node_mut(child_i).remove_adj(parent_i, false);
    }

    fn compress_path(&mut self, a: usize, b: usize, c: usize) {
        //compress path abc to ac (assuming b is elementary)
        self.remove_edge(a, b);
        self.remove_edge(b, c);
        self.add_edge(a, c);
        self.nodes.replace_w_none(b);
    }

    /// Detaches a leaf from all its parents and drops it. Any elementary
    /// node this leaves behind is cleaned up by a later
    /// [`suppress_elementary_nodes`](Self::suppress_elementary_nodes) pass.
    pub fn remove_leaf_and_reconnect(&mut self, leaf_i: usize) {
        for p in self.get_parents_i(leaf_i) {
            self.remove_edge(p, leaf_i);
        }
        self.nodes.replace_w_none(leaf_i);
    }

    /// Repeatedly removes nodes of in-degree 1 and out-degree 1, rejoining
    /// their parent to their child, and collapses an unlabelled unary root
    /// onto its only child. Leaf-to-leaf topology is unchanged.
    pub fn suppress_elementary_nodes(&mut self) {
        loop {
            let mut changed = false;
            while self.get_parents_i(self.root).is_empty()
                && self.get_children_i(self.root).len() == 1
                && self.get_label(self.root).is_none()
            {
                let child = self.get_children_i(self.root)[0];
                self.remove_edge(self.root, child);
                self.nodes.replace_w_none(self.root);
                self.root = child;
                changed = true;
            }
            for i in 0..self.nodes.len() {
                if self.nodes[i].is_none() {
                    continue;
                }
                if self.get_parents_i(i).len() == 1 && self.get_children_i(i).len() == 1 {
                    let p = self.get_parents_i(i)[0];
                    let c = self.get_children_i(i)[0];
                    self.compress_path(p, i, c);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    // ------ Getters
    pub fn root(&self) -> usize {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn get_children_i(&self, i: usize) -> Vec<usize> {
        self.get_node_ref(i).get_children_i()
    }

    /// Predecessors of a node, in edge insertion order.
    pub fn get_parents_i(&self, i: usize) -> Vec<usize> {
        self.get_node_ref(i).get_parents_i()
    }

    /// Leaves (out-degree 0), in ascending node id order.
    pub fn get_leaves(&self) -> Vec<usize> {
        let mut results = vec![];
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_some() && self.get_children_i(i).is_empty() {
                results.push(i);
            }
        }
        results
    }

    /// Reticulation nodes (in-degree >= 2), in ascending node id order.
    ///
    /// Node ids are assigned sequentially by the parser, so this order is
    /// deterministic for a given newick string and stays fixed as long as
    /// the network is only modified through edge removal and suppression.
    pub fn get_reticulations(&self) -> Vec<usize> {
        let mut results = vec![];
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_some() && self.get_parents_i(i).len() > 1 {
                results.push(i);
            }
        }
        results
    }

    pub fn get_label(&self, i: usize) -> Option<&str> {
        self.get_node_ref(i).label.as_deref()
    }

    pub(crate) fn set_label(&mut self, i: usize, label: Option<String>) {
        self.get_node_mut(i).label = label;
    }

    pub fn clear_label(&mut self, i: usize) {
        self.get_node_mut(i).label = None;
    }

    /// Sorted labels of all labelled leaves.
    pub fn labelled_leaves(&self) -> Vec<String> {
        let mut result: Vec<String> = self
            .get_leaves()
            .into_iter()
            .filter_map(|l| self.get_label(l).map(str::to_owned))
            .collect();
        result.sort();
        result
    }

    pub fn has_unlabelled_leaf(&self) -> bool {
        self.get_leaves()
            .into_iter()
            .any(|l| self.get_label(l).is_none())
    }

    /// Nodes carrying a label, whether leaves or internal.
    pub fn labelled_nodes(&self) -> Vec<usize> {
        let mut results = vec![];
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_some() && self.get_label(i).is_some() {
                results.push(i);
            }
        }
        results
    }

    fn get_node_ref(&self, i: usize) -> &Node {
        if self.nodes.len() <= i {
            panic!("cannot get node: i too large");
        }
        match self.nodes[i].as_ref() {
            Some(node) => node,
            None => panic!("no node at i={i}"),
        }
    }

    fn get_node_mut(&mut self, i: usize) -> &mut Node {
        if self.nodes.len() <= i {
            panic!("cannot get node: i too large");
        }
        match self.nodes[i].as_mut() {
            Some(node) => node,
            None => panic!("no node at i={i}"),
        }
    }

    pub(crate) fn get_open_id(&self) -> usize {
        for (i, n) in self.nodes.iter().enumerate() {
            if n.is_none() {
                return i;
            }
        }
        self.nodes.len()
    }

    // ---- canonical serialization
    /// Canonical extended newick form.
    ///
    /// Child subtrees are rendered recursively and sorted lexicographically,
    /// so two equal trees always serialize identically; this string is the
    /// deduplication key for displayed trees. Reticulations are tagged
    /// `#Hk` at their first visit and referenced by tag afterwards.
    pub fn enewick(&self) -> String {
        let mut tags: HashMap<usize, usize> = HashMap::new();
        let mut result = self.enewick_helper(self.root, &mut tags);
        result.push(';');
        result
    }

    fn enewick_helper(&self, cur_node_i: usize, tags: &mut HashMap<usize, usize>) -> String {
        if let Some(tag) = tags.get(&cur_node_i) {
            return format!("#H{tag}");
        }
        if self.get_parents_i(cur_node_i).len() > 1 {
            let tag = tags.len() + 1;
            tags.insert(cur_node_i, tag);
        }
        let mut result = String::new();
        let children = self.get_children_i(cur_node_i);
        if !children.is_empty() {
            let mut parts: Vec<String> = children
                .into_iter()
                .map(|child_i| self.enewick_helper(child_i, tags))
                .collect();
            parts.sort();
            result.push('(');
            result.push_str(&parts.join(","));
            result.push(')');
        }
        if let Some(label) = self.get_label(cur_node_i) {
            result.push_str(label);
        }
        if let Some(tag) = tags.get(&cur_node_i) {
            result.push_str(&format!("#H{tag}"));
        }
        result
    }
}

//  ----------------------  Network Display
impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.nodes.is_empty() {
            write!(f, "Network without root")
        } else {
            write!(f, "{}", self.enewick())
        }
    }
}

//   ------------------------------- NODE Implementation
impl Node {
    fn new(i: usize, label: Option<String>) -> Self {
        Node {
            i,
            label,
            adjs: vec![],
        }
    }

    fn get_children_i(&self) -> Vec<usize> {
        self.adjs
            .iter()
            .filter(|adj| adj.is_to)
            .map(|adj| adj.i)
            .collect()
    }

    fn get_parents_i(&self) -> Vec<usize> {
        self.adjs
            .iter()
            .filter(|adj| !adj.is_to)
            .map(|adj| adj.i)
            .collect()
    }

    fn add_child(&mut self, child_i: usize) {
        self.adjs.push(Adj {
            is_to: true,
            i: child_i,
        });
    }

    fn add_parent(&mut self, parent_i: usize) {
        self.adjs.push(Adj {
            is_to: false,
            i: parent_i,
        });
    }

    fn remove_adj(&mut self, adj_i: usize, is_to: bool) {
        let found = self
            .adjs
            .iter()
            .position(|adj| adj.i == adj_i && adj.is_to == is_to);
        match found {
            Some(index) => {
                self.adjs.remove(index);
            }
            None => panic!("{}'s adj to {adj_i}: no such adjacency to remove", self.i),
        }
    }
}

//  -----------------------------------  REPLACEABLE
trait Replaceable {
    fn replace_w_some(&mut self, node: Node, index: usize);
    fn replace_w_none(&mut self, index: usize);
}

impl Replaceable for Vec<Option<Node>> {
    fn replace_w_some(&mut self, node: Node, index: usize) {
        if index >= self.len() {
            panic!("trying to replace with some on index >= length");
        }
        if self[index].is_some() {
            panic!("trying to replace some with some at index {index}");
        }
        self[index] = Some(node);
    }

    fn replace_w_none(&mut self, index: usize) {
        if index >= self.len() {
            panic!("trying to replace with none on index >= length");
        }
        if self[index].is_none() {
            panic!("trying to replace none with none at index {index}");
        }
        self[index] = None;
    }
}

// ---------------------------- parse diagnostics
/// Best-effort bracket diagnostic for unparseable newick strings. Counts
/// `(` against `)`; labels containing brackets can fool it, so the message
/// is advisory only.
pub(crate) fn bracket_diagnostic(s: &str) -> Option<String> {
    let open = s.chars().filter(|c| *c == '(').count();
    let close = s.chars().filter(|c| *c == ')').count();
    match open.cmp(&close) {
        std::cmp::Ordering::Greater => {
            Some(format!("missing {} closing bracket(s)", open - close))
        }
        std::cmp::Ordering::Less => Some(format!("missing {} opening bracket(s)", close - open)),
        std::cmp::Ordering::Equal => None,
    }
}

pub(crate) fn malformed(s: &str, reason: &str) -> PhyloError {
    let detail = match bracket_diagnostic(s) {
        Some(diag) => format!("{reason} ({diag})"),
        None => reason.to_owned(),
    };
    PhyloError::MalformedNewick(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Network {
        Network::parse_newick(s).unwrap()
    }

    #[test]
    fn leaves_and_labels() {
        let n = net("((a,b),(c,d));");
        assert_eq!(n.labelled_leaves(), vec!["a", "b", "c", "d"]);
        assert_eq!(n.get_leaves().len(), 4);
        assert!(!n.has_unlabelled_leaf());
    }

    #[test]
    fn reticulations_detected() {
        let n = net("((a,(b)#H1),(#H1,c));");
        let rets = n.get_reticulations();
        assert_eq!(rets.len(), 1);
        assert_eq!(n.get_parents_i(rets[0]).len(), 2);
    }

    #[test]
    fn removing_a_reticulation_edge_leaves_a_tree() {
        let mut n = net("((a,(b)#H1),(#H1,c));");
        let ret = n.get_reticulations()[0];
        let parent = n.get_parents_i(ret)[0];
        n.remove_edge(parent, ret);
        assert!(n.get_reticulations().is_empty());
        n.suppress_elementary_nodes();
        assert_eq!(n.labelled_leaves(), vec!["a", "b", "c"]);
    }

    #[test]
    fn suppression_collapses_elementary_chain() {
        let mut n = net("(((a)));");
        n.suppress_elementary_nodes();
        assert_eq!(n.node_count(), 1);
        assert_eq!(n.enewick(), "a;");
    }

    #[test]
    fn leaf_removal_then_suppression() {
        let mut n = net("((a,b),c);");
        let b = n
            .get_leaves()
            .into_iter()
            .find(|&l| n.get_label(l) == Some("b"))
            .unwrap();
        n.remove_leaf_and_reconnect(b);
        n.suppress_elementary_nodes();
        assert_eq!(n.enewick(), "(a,c);");
    }

    #[test]
    fn canonical_form_ignores_child_order() {
        let left = net("((b,a),c);");
        let right = net("(c,(a,b));");
        assert_eq!(left.enewick(), right.enewick());
    }

    #[test]
    fn unlabelled_leaf_is_kept_and_round_trips() {
        let n = net("((a,),b);");
        assert!(n.has_unlabelled_leaf());
        let reparsed = net(&n.enewick());
        assert_eq!(reparsed.enewick(), n.enewick());
    }

    #[test]
    fn bracket_diagnostic_counts() {
        assert_eq!(
            bracket_diagnostic("((a,b);"),
            Some("missing 1 closing bracket(s)".to_owned())
        );
        assert_eq!(bracket_diagnostic("(a,b);"), None);
    }
}
