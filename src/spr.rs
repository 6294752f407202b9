//! SPR Module
//!
//! Comparisons between phylogenetic trees under the subtree
//! prune-and-regraft operation: pairwise drSPR distance matrices
//! (`distance`) and the rSPR adjacency graph with Hamiltonian cycle search
//! (`graph`). The distances themselves come from external solvers, see
//! [`crate::tool`].

use std::collections::BTreeSet;

use crate::network::Network;

pub mod distance;
pub mod graph;

/// One tree from a user-supplied batch, labelled `t1..tN` by input
/// position. Malformed trees stay in the batch as `Invalid` entries so
/// reports can still list them; only `Valid` trees take part in distance
/// and adjacency computation.
pub enum InputTree {
    Valid(ParsedTree),
    Invalid {
        label: String,
        input: String,
        reason: String,
    },
}

/// A successfully parsed input tree.
pub struct ParsedTree {
    label: String,
    input: String,
    newick: String,
    leaves: BTreeSet<String>,
    has_unlabelled_leaf: bool,
}

impl InputTree {
    /// Parses the `index`-th input tree (0-based; the label is 1-based).
    /// `input` must carry its trailing semicolon.
    pub fn parse(index: usize, input: &str) -> Self {
        let label = format!("t{}", index + 1);
        match Network::parse_newick(input) {
            Ok(tree) => InputTree::Valid(ParsedTree {
                label,
                input: input.to_owned(),
                newick: tree.enewick(),
                leaves: tree.labelled_leaves().into_iter().collect(),
                has_unlabelled_leaf: tree.has_unlabelled_leaf(),
            }),
            Err(err) => InputTree::Invalid {
                label,
                input: input.to_owned(),
                reason: err.to_string(),
            },
        }
    }

    pub fn label(&self) -> &str {
        match self {
            InputTree::Valid(tree) => &tree.label,
            InputTree::Invalid { label, .. } => label,
        }
    }

    pub fn input(&self) -> &str {
        match self {
            InputTree::Valid(tree) => &tree.input,
            InputTree::Invalid { input, .. } => input,
        }
    }

    pub fn as_valid(&self) -> Option<&ParsedTree> {
        match self {
            InputTree::Valid(tree) => Some(tree),
            InputTree::Invalid { .. } => None,
        }
    }
}

impl ParsedTree {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Canonical newick form, the wire format sent to the solvers.
    pub fn newick(&self) -> &str {
        &self.newick
    }

    pub fn leaves(&self) -> &BTreeSet<String> {
        &self.leaves
    }

    pub fn has_unlabelled_leaf(&self) -> bool {
        self.has_unlabelled_leaf
    }

    /// Sorted symmetric difference of two trees' labelled-leaf sets; empty
    /// exactly when the taxa sets agree.
    pub fn missing_taxa(&self, other: &ParsedTree) -> Vec<String> {
        self.leaves
            .symmetric_difference(&other.leaves)
            .cloned()
            .collect()
    }
}

/// Splits a blob of newick trees on semicolons, after removing all
/// whitespace. The segment after the last semicolon is dropped when empty.
/// Returned segments do not include the semicolon.
pub fn split_semicolon_trees(text: &str) -> Vec<String> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut segments: Vec<String> = stripped.split(';').map(str::to_owned).collect();
    if segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_input_position() {
        let good = InputTree::parse(0, "((1,2),3);");
        let bad = InputTree::parse(1, "((1,2,3);");
        assert_eq!(good.label(), "t1");
        assert_eq!(bad.label(), "t2");
        assert!(good.as_valid().is_some());
        assert!(bad.as_valid().is_none());
    }

    #[test]
    fn missing_taxa_is_sorted_symmetric_difference() {
        let a = InputTree::parse(0, "(((1,2),3),4);");
        let b = InputTree::parse(1, "(((1,5),2),3);");
        let missing = a.as_valid().unwrap().missing_taxa(b.as_valid().unwrap());
        assert_eq!(missing, vec!["4", "5"]);
    }

    #[test]
    fn unlabelled_leaves_are_flagged() {
        let t = InputTree::parse(0, "((1,),2);");
        assert!(t.as_valid().unwrap().has_unlabelled_leaf());
    }

    #[test]
    fn semicolon_splitting_drops_trailing_empty_segment() {
        let segments = split_semicolon_trees("((1,2),3);\n((1,3),2);\n");
        assert_eq!(segments, vec!["((1,2),3)", "((1,3),2)"]);
    }
}
