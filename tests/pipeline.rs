use displayed_trees::network::display::NetworkModel;
use displayed_trees::network::Network;
use displayed_trees::spr::distance::{calculate_drspr, Cell};
use displayed_trees::spr::graph::RsprGraph;
use displayed_trees::tool::{ToolOutput, ToolRunner};
use displayed_trees::{PhyloError, Result};

/// Stands in for the external solvers, which are not available on CI.
struct CannedTool {
    stdout: &'static str,
}

impl ToolRunner for CannedTool {
    fn run(&self, _tool: &str, _input: &str) -> Result<ToolOutput> {
        Ok(ToolOutput {
            stdout: self.stdout.to_owned(),
            stderr: String::new(),
        })
    }
}

const RSPR_OUTPUT: &str = "T1: (((1,2),3),4)\n\
                           T2: (((1,4),2),3)\n\
                           F1: (1,2,3) 4\n\
                           F2: (1,2,3) 4\n\
                           approx drSPR=2\n\
                           total exact drSPR=1\n";

const NETWORK: &str = "(((1,(2)#H2),((#H2,#H3))#H1),(#H1,((3)#H3,4)));";

// --- DISPLAYED TREES ---
#[test]
fn network_with_three_reticulations_displays_eight_trees() {
    let mut model = NetworkModel::new(NETWORK).unwrap();
    model.set_selected_leaves(Some("1,2,3,4")).unwrap();
    let trees = model.process().unwrap();

    assert_eq!(trees.total_trees(), 8);
    assert_eq!(trees.iter().map(|t| t.count()).sum::<usize>(), 8);
    assert!(trees.num_unique_trees() <= 8);
    for tree in trees.iter() {
        for leaf in tree.tree().labelled_leaves() {
            assert!(["1", "2", "3", "4"].contains(&leaf.as_str()));
        }
    }
}

#[test]
fn narrowing_the_selection_keeps_the_multiset_total() {
    let mut model = NetworkModel::new(NETWORK).unwrap();
    model.set_selected_leaves(Some("1,2,3")).unwrap();
    let trees = model.process().unwrap();
    assert_eq!(trees.iter().map(|t| t.count()).sum::<usize>(), 8);
    for tree in trees.iter() {
        assert!(!tree.tree().labelled_leaves().contains(&"4".to_owned()));
    }
}

#[test]
fn displayed_trees_round_trip_through_their_canonical_strings() {
    let mut model = NetworkModel::new(NETWORK).unwrap();
    let trees = model.process().unwrap();
    for tree in trees.iter() {
        let reparsed = Network::parse_newick(tree.newick()).unwrap();
        assert_eq!(reparsed.enewick(), tree.newick());
        assert_eq!(reparsed.labelled_leaves(), tree.tree().labelled_leaves());
    }
}

#[test]
fn network_without_labelled_leaves_is_rejected() {
    assert!(matches!(
        NetworkModel::new("((,),);"),
        Err(PhyloError::MalformedNewick(_))
    ));
}

// --- PAIRWISE DISTANCE ---
#[test]
fn trees_with_identical_taxa_get_a_distance_and_clusters() {
    let runner = CannedTool {
        stdout: RSPR_OUTPUT,
    };
    let trees = vec!["(((1,2),3),4)".to_owned(), "(((1,4),2),3)".to_owned()];
    let report = calculate_drspr(&runner, &trees).unwrap();
    let pair = report.distance(0, 1).unwrap();
    assert_eq!(pair.distance, 1);
    assert!(!pair.clusters.is_empty());
}

#[test]
fn trees_with_extra_taxa_get_the_mismatch_sentinel() {
    let runner = CannedTool {
        stdout: RSPR_OUTPUT,
    };
    let trees = vec!["(((1,2),3),4)".to_owned(), "((((1,4),2),3),5)".to_owned()];
    let report = calculate_drspr(&runner, &trees).unwrap();
    match report.cell(0, 1) {
        Cell::Failed(reason) => {
            assert!(reason.contains("Missing taxa: 5"));
            assert!(!reason.contains("4,"));
        }
        other => panic!("expected sentinel, got {other:?}"),
    }
}

// --- rSPR GRAPH ---
#[test]
fn complete_neighbour_relation_yields_a_cycle() {
    let runner = CannedTool {
        stdout: "0,1\n1,0\n0,2\n2,0\n1,2\n2,1\n",
    };
    let graph = RsprGraph::build(&runner, "((1,2),3);((1,3),2);(1,(2,3));").unwrap();
    let cycle = graph.hamiltonian_cycle().unwrap();
    assert_eq!(cycle.len(), 4);
    assert_eq!(cycle.first(), cycle.last());
}

#[test]
fn path_shaped_neighbour_relation_yields_no_cycle() {
    let runner = CannedTool {
        stdout: "0,1\n1,0\n1,2\n2,1\n",
    };
    let graph = RsprGraph::build(&runner, "((1,2),3);((1,3),2);(1,(2,3));").unwrap();
    assert!(graph.hamiltonian_cycle().is_none());
}
