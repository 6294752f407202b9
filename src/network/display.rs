//! Display Submodule (of Network)
//!
//! Enumerates the trees displayed by a rooted phylogenetic network.
//! A network with R reticulations displays one (not necessarily distinct)
//! tree per combination of "keep exactly one incoming edge" choices, so the
//! expansion yields the product of the reticulation in-degrees, 2^R for
//! binary reticulations. Each expanded tree is cleaned (elementary nodes
//! suppressed, unselected and unlabelled leaves pruned) and the results are
//! collected into a multiset keyed by canonical newick form.

use std::collections::HashMap;

use indicatif::ProgressBar;
use itertools::Itertools;
use once_cell::sync::OnceCell;

use crate::network::Network;
use crate::PhyloError;
use crate::Result;

/// A parsed network together with everything needed to produce its
/// displayed trees: the untouched original, a working copy with elementary
/// nodes suppressed and internal labels stripped, the frozen reticulation
/// order, and the current leaf selection.
pub struct NetworkModel {
    newick: String,
    original: Network,
    current: Network,
    labelled_leaves: Vec<String>,
    //reticulation node ids in `current`, frozen at construction; the
    //position in this list decides which expansion index corresponds to
    //which edge-removal choice, so the cache below stays valid
    reticulations: Vec<usize>,
    selected_leaves: Vec<String>,
    unsuppressed: OnceCell<Vec<Network>>,
    //(k,v) = (sorted leaf selection, generated trees); only dropped when
    //the whole model is dropped
    trees_cache: HashMap<Vec<String>, EmbeddedTrees>,
}

impl NetworkModel {
    /// Parses the network twice: an immutable reference copy and the
    /// working copy that all tree expansion starts from. Networks without
    /// a single labelled leaf are rejected.
    pub fn new(newick_string: &str) -> Result<Self> {
        let original = Network::parse_newick(newick_string)?;
        let mut current = Network::parse_newick(newick_string)?;

        let labelled_leaves = original.labelled_leaves();
        if labelled_leaves.is_empty() {
            return Err(PhyloError::MalformedNewick(
                "network has no labelled leaves".to_owned(),
            ));
        }
        //keep only leaf labels; internal node names would otherwise survive
        //into the displayed trees
        for i in current.labelled_nodes() {
            let is_leaf_label = current
                .get_label(i)
                .map_or(false, |label| labelled_leaves.iter().any(|l| l == label));
            if !is_leaf_label {
                current.clear_label(i);
            }
        }
        current.suppress_elementary_nodes();
        let reticulations = current.get_reticulations();

        Ok(NetworkModel {
            newick: newick_string.trim().to_owned(),
            original,
            current,
            selected_leaves: labelled_leaves.clone(),
            labelled_leaves,
            reticulations,
            unsuppressed: OnceCell::new(),
            trees_cache: HashMap::new(),
        })
    }

    pub fn newick(&self) -> &str {
        &self.newick
    }

    pub fn original(&self) -> &Network {
        &self.original
    }

    pub fn num_reticulations(&self) -> usize {
        self.reticulations.len()
    }

    pub fn labelled_leaves(&self) -> &[String] {
        &self.labelled_leaves
    }

    pub fn selected_leaves(&self) -> &[String] {
        &self.selected_leaves
    }

    /// Sets the leaf subset that displayed trees are restricted to.
    ///
    /// `Some(text)` is a comma-separated list of leaf labels; items are
    /// trimmed and matched case-sensitively against the network's labelled
    /// leaves, and unknown labels are silently dropped. `None` selects all
    /// labelled leaves. Fails with [`PhyloError::InvalidLeaves`] when no
    /// valid leaf remains.
    pub fn set_selected_leaves(&mut self, input: Option<&str>) -> Result<()> {
        let mut valid: Vec<String> = match input {
            Some(text) => text
                .split(',')
                .map(|item| item.trim().to_owned())
                .filter(|item| self.labelled_leaves.contains(item))
                .collect(),
            None => self.labelled_leaves.clone(),
        };
        if valid.is_empty() {
            return Err(PhyloError::InvalidLeaves);
        }
        valid.sort();
        valid.dedup();
        self.selected_leaves = valid;
        Ok(())
    }

    /// All unsuppressed trees: one working-copy clone per combination of
    /// reticulation edge removals, lazily computed once per model.
    ///
    /// The whole expansion is materialised at once, so peak memory is the
    /// binding constraint: product-of-in-degrees network copies (2^R for
    /// binary reticulations) are alive simultaneously.
    pub fn all_unsuppressed_trees(&self) -> &[Network] {
        self.unsuppressed.get_or_init(|| {
            if self.reticulations.is_empty() {
                return vec![self.current.clone()];
            }
            let choices: Vec<Vec<(usize, usize)>> = self
                .reticulations
                .iter()
                .map(|&ret| {
                    self.current
                        .get_parents_i(ret)
                        .into_iter()
                        .map(|parent| (parent, ret))
                        .collect()
                })
                .collect();
            choices
                .into_iter()
                .multi_cartesian_product()
                .map(|removals| {
                    let mut tree = self.current.clone();
                    for (parent, ret) in removals {
                        tree.remove_edge(parent, ret);
                    }
                    tree
                })
                .collect()
        })
    }

    pub fn total_trees(&self) -> usize {
        self.all_unsuppressed_trees().len()
    }

    /// Displayed trees for the current leaf selection. Results are cached
    /// per selection, so re-processing the same selection is free.
    pub fn process(&mut self) -> Result<&EmbeddedTrees> {
        if !self.trees_cache.contains_key(&self.selected_leaves) {
            let generated =
                EmbeddedTrees::generate(self.all_unsuppressed_trees(), &self.selected_leaves)?;
            self.trees_cache.insert(self.selected_leaves.clone(), generated);
        }
        Ok(&self.trees_cache[&self.selected_leaves])
    }

    #[cfg(test)]
    fn cached_selections(&self) -> usize {
        self.trees_cache.len()
    }
}

impl std::fmt::Display for NetworkModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "NETWORK:\n{}\n", self.newick)?;
        writeln!(f, "Reticulations: {}", self.num_reticulations())?;
        writeln!(f, "Network leaves:\n{}", self.labelled_leaves.join(", "))
    }
}

/// The multiset of trees displayed by a network under one leaf selection:
/// distinct canonical newicks in first-seen order, each with its occurrence
/// count and one representative reduced tree.
pub struct EmbeddedTrees {
    leaves: Vec<String>,
    total_trees: usize,
    trees: Vec<DisplayedTree>,
    //(k,v) = (canonical newick, position in `trees`)
    index: HashMap<String, usize>,
}

/// One distinct displayed tree.
pub struct DisplayedTree {
    newick: String,
    count: usize,
    tree: Network,
}

impl DisplayedTree {
    pub fn newick(&self) -> &str {
        &self.newick
    }

    /// How many of the expanded edge-removal combinations reduced to this
    /// tree.
    pub fn count(&self) -> usize {
        self.count
    }

    /// A representative reduced tree; every combination that produced this
    /// entry reduces to a canonically identical tree, so any one serves.
    pub fn tree(&self) -> &Network {
        &self.tree
    }
}

impl EmbeddedTrees {
    fn generate(unsuppressed: &[Network], selected: &[String]) -> Result<Self> {
        let mut result = EmbeddedTrees {
            leaves: selected.to_vec(),
            total_trees: unsuppressed.len(),
            trees: vec![],
            index: HashMap::new(),
        };
        let progress = ProgressBar::new(unsuppressed.len() as u64);
        progress.set_message("generating displayed trees");
        for tree in unsuppressed {
            let (newick, reduced) = reduce(tree, selected)?;
            match result.index.get(&newick) {
                Some(&at) => result.trees[at].count += 1,
                None => {
                    result.index.insert(newick.clone(), result.trees.len());
                    result.trees.push(DisplayedTree {
                        newick,
                        count: 1,
                        tree: reduced,
                    });
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
        Ok(result)
    }

    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }

    /// Count of all expanded trees, distinct or not; equals the sum of the
    /// per-tree occurrence counts.
    pub fn total_trees(&self) -> usize {
        self.total_trees
    }

    pub fn num_unique_trees(&self) -> usize {
        self.trees.len()
    }

    /// Distinct trees in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &DisplayedTree> {
        self.trees.iter()
    }

    pub fn get(&self, canonical_newick: &str) -> Option<&DisplayedTree> {
        self.index.get(canonical_newick).map(|&at| &self.trees[at])
    }
}

impl std::fmt::Display for EmbeddedTrees {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "TREES\nLeaves\n{}\n", self.leaves.join(", "))?;
        writeln!(f, "Total trees: {}", self.total_trees)?;
        writeln!(f, "Distinct trees: {}\n", self.num_unique_trees())?;
        for tree in &self.trees {
            writeln!(f, "{}  x{}", tree.newick, tree.count)?;
        }
        Ok(())
    }
}

/// Reduces one unsuppressed tree to its canonical displayed form: re-parse
/// its serialization (so the expansion's copies stay untouched), suppress,
/// then prune unselected and unlabelled ("dummy") leaves until none remain.
/// Pruning can expose new dummy leaves and new elementary nodes, hence the
/// fixpoint loop. A tree that collapses to a single selected leaf is a
/// valid, degenerate result.
fn reduce(unsuppressed: &Network, selected: &[String]) -> Result<(String, Network)> {
    let mut tree = Network::parse_newick(&unsuppressed.enewick())?;
    tree.suppress_elementary_nodes();
    loop {
        let removable: Vec<usize> = tree
            .get_leaves()
            .into_iter()
            .filter(|&leaf| match tree.get_label(leaf) {
                Some(label) => !selected.iter().any(|s| s == label),
                None => true,
            })
            .filter(|&leaf| leaf != tree.root())
            .collect();
        if removable.is_empty() {
            break;
        }
        for leaf in removable {
            tree.remove_leaf_and_reconnect(leaf);
        }
        tree.suppress_elementary_nodes();
    }
    Ok((tree.enewick(), tree))
}
