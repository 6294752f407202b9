//! Displayed trees of rooted phylogenetic networks.
//!
//! A rooted phylogenetic network is a DAG whose reticulation nodes
//! (in-degree >= 2) model hybridisation or horizontal gene transfer. Keeping
//! exactly one incoming edge per reticulation and topologically cleaning the
//! result yields one of the trees the network *displays*. This crate
//! enumerates all such trees, deduplicates them by canonical newick form,
//! and compares sets of trees by their rSPR distance through the external
//! `rspr` and `spr_dense_graph` solvers of cwhidden.
//!
//! The three entry points are [`network::display::NetworkModel`] for the
//! displayed-trees pipeline, [`spr::distance::calculate_drspr`] for pairwise
//! distance matrices, and [`spr::graph::RsprGraph`] for the rSPR adjacency
//! graph with Hamiltonian cycle search.

pub mod network;
pub mod spr;
pub mod tool;

/// Error type shared by the whole crate.
///
/// Per-item failures inside a batch (one malformed tree, one mismatched
/// pair) never surface here; they are recorded as sentinel entries in the
/// result structures so the rest of the batch still runs. Only whole-batch
/// preconditions are returned as `Err`.
#[derive(Debug, thiserror::Error)]
pub enum PhyloError {
    /// A newick string could not be parsed.
    #[error("malformed newick string: {0}")]
    MalformedNewick(String),

    /// A leaf selection resolved to an empty valid subset.
    #[error("couldn't find any of the specified leaves in the network")]
    InvalidLeaves,

    /// A tree meant for distance comparison has a leaf without a label;
    /// the external rspr solver cannot handle that input.
    #[error("tree {0} contains an unlabelled leaf")]
    UnlabelledLeaf(String),

    /// Two compared trees have different labelled-leaf sets. `missing` is
    /// the sorted symmetric difference.
    #[error("Trees don't have same taxa set. Missing taxa: {}", missing.join(", "))]
    TaxonMismatch { missing: Vec<String> },

    /// Fewer than two trees were given to a pairwise comparison.
    #[error("at least 2 trees are required")]
    NotEnoughTrees,

    /// An external solver could not be run or produced unusable output.
    #[error("external tool `{tool}` failed: {detail}")]
    ExternalTool { tool: String, detail: String },
}

pub type Result<T> = std::result::Result<T, PhyloError>;
