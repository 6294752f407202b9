//! rSPR Graph Submodule (of SPR)
//!
//! Builds the undirected graph whose vertices are input trees and whose
//! edges are the pairs cwhidden's `spr_dense_graph` executable flags as
//! rSPR neighbours, then searches it for a Hamiltonian cycle.

use std::collections::HashMap;

use itertools::Itertools;
use petgraph::graph::NodeIndex;
use petgraph::graph::UnGraph;

use crate::spr::split_semicolon_trees;
use crate::spr::InputTree;
use crate::tool::ToolRunner;
use crate::PhyloError;
use crate::Result;

/// Name of the external neighbour-relation solver.
pub const SPR_DENSE_GRAPH_TOOL: &str = "spr_dense_graph";

const EXCLUDED_MESSAGE: &str = "Error with tree format, tree has been excluded from the graph. \
    Check that tree has correct number of opening and closing brackets and \
    terminates with semicolon.";

/// The rSPR adjacency graph of a batch of trees.
///
/// Invalid trees keep their `t{i}` label and appear in the text report, but
/// have no vertex; valid trees without any neighbour are isolated vertices.
pub struct RsprGraph {
    entries: Vec<InputTree>,
    //(label, neighbour labels) in solver output order
    adjacency: Vec<(String, Vec<String>)>,
    graph: UnGraph<String, ()>,
}

impl RsprGraph {
    /// Splits `trees_string` on semicolons, parses each segment, feeds the
    /// valid trees to the neighbour solver and assembles the graph.
    ///
    /// Fails when the solver cannot be run or its output does not follow
    /// the `<i>,<j>` line grammar; malformed input trees are not an error.
    pub fn build(runner: &dyn ToolRunner, trees_string: &str) -> Result<Self> {
        let entries: Vec<InputTree> = split_semicolon_trees(trees_string)
            .into_iter()
            .enumerate()
            .map(|(i, segment)| InputTree::parse(i, &format!("{segment};")))
            .collect();
        let valid: Vec<&InputTree> = entries.iter().filter(|t| t.as_valid().is_some()).collect();

        let mut adjacency: Vec<(String, Vec<String>)> = vec![];
        if !valid.is_empty() {
            let input = valid
                .iter()
                .map(|t| t.as_valid().unwrap().newick())
                .join("\n");
            let output = runner.run(SPR_DENSE_GRAPH_TOOL, &input)?;
            for line in output.stdout.split_whitespace() {
                let (a, b) = parse_pair_line(line, valid.len())?;
                let node = valid[a].label().to_owned();
                let neighbour = valid[b].label().to_owned();
                match adjacency.iter_mut().find(|(label, _)| *label == node) {
                    Some((_, neighbours)) => neighbours.push(neighbour),
                    None => adjacency.push((node, vec![neighbour])),
                }
            }
        }

        let mut graph = UnGraph::<String, ()>::new_undirected();
        let mut ids: HashMap<String, NodeIndex> = HashMap::new();
        for tree in &valid {
            let ix = graph.add_node(tree.label().to_owned());
            ids.insert(tree.label().to_owned(), ix);
        }
        for (node, neighbours) in &adjacency {
            for neighbour in neighbours {
                //solver reports both directions; update_edge keeps it simple
                graph.update_edge(ids[node], ids[neighbour], ());
            }
        }

        Ok(RsprGraph {
            entries,
            adjacency,
            graph,
        })
    }

    pub fn entries(&self) -> &[InputTree] {
        &self.entries
    }

    pub fn adjacency(&self) -> &[(String, Vec<String>)] {
        &self.adjacency
    }

    pub fn graph(&self) -> &UnGraph<String, ()> {
        &self.graph
    }

    /// Exhaustive backtracking search for a Hamiltonian cycle, starting
    /// from the first vertex. Returns the closed path (start repeated at
    /// the end) or `None`. Worst case is exponential; tree batches are
    /// small enough that no pruning beyond the visited set is needed.
    pub fn hamiltonian_cycle(&self) -> Option<Vec<String>> {
        let start = self.graph.node_indices().next()?;
        let mut path = vec![start];
        if self.search(start, start, &mut path) {
            let mut labels: Vec<String> = path.iter().map(|&ix| self.graph[ix].clone()).collect();
            labels.push(self.graph[start].clone());
            Some(labels)
        } else {
            None
        }
    }

    fn search(&self, current: NodeIndex, root: NodeIndex, path: &mut Vec<NodeIndex>) -> bool {
        if path.len() == self.graph.node_count() {
            //the cycle closes only if the last vertex reaches the start
            return self.graph.contains_edge(current, root);
        }
        for neighbour in self.graph.neighbors(current) {
            if !path.contains(&neighbour) {
                path.push(neighbour);
                if self.search(neighbour, root, path) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }
}

fn parse_pair_line(line: &str, valid_count: usize) -> Result<(usize, usize)> {
    let grammar_err = |detail: String| PhyloError::ExternalTool {
        tool: SPR_DENSE_GRAPH_TOOL.to_owned(),
        detail,
    };
    let (a, b) = line
        .split(',')
        .collect_tuple()
        .ok_or_else(|| grammar_err(format!("expected `<i>,<j>` line, got `{line}`")))?;
    let a: usize = a
        .parse()
        .map_err(|_| grammar_err(format!("non-numeric tree index in `{line}`")))?;
    let b: usize = b
        .parse()
        .map_err(|_| grammar_err(format!("non-numeric tree index in `{line}`")))?;
    if a >= valid_count || b >= valid_count {
        return Err(grammar_err(format!("tree index out of range in `{line}`")));
    }
    Ok((a, b))
}

impl std::fmt::Display for RsprGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for tree in &self.entries {
            match tree {
                InputTree::Valid(_) => writeln!(f, "{}:\n{}\n", tree.label(), tree.input())?,
                InputTree::Invalid { .. } => {
                    writeln!(f, "{}:\n{}\n{}\n", tree.label(), tree.input(), EXCLUDED_MESSAGE)?
                }
            }
        }
        match self.hamiltonian_cycle() {
            Some(cycle) => {
                writeln!(f, "\nHAMILTONIAN CYCLE: Yes\n{}", cycle.join(" -> "))?
            }
            None => writeln!(f, "\nHAMILTONIAN CYCLE: No")?,
        }
        writeln!(f, "\nADJACENCY LIST:")?;
        for (node, neighbours) in &self.adjacency {
            writeln!(f, "{}: {}", node, neighbours.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolOutput;

    struct MockNeighbours {
        stdout: &'static str,
    }

    impl ToolRunner for MockNeighbours {
        fn run(&self, _tool: &str, _input: &str) -> Result<ToolOutput> {
            Ok(ToolOutput {
                stdout: self.stdout.to_owned(),
                stderr: String::new(),
            })
        }
    }

    const THREE_TREES: &str = "((1,2),3);((1,3),2);(1,(2,3));";

    #[test]
    fn complete_graph_has_a_hamiltonian_cycle() {
        let runner = MockNeighbours {
            stdout: "0,1\n1,0\n0,2\n2,0\n1,2\n2,1\n",
        };
        let graph = RsprGraph::build(&runner, THREE_TREES).unwrap();
        let cycle = graph.hamiltonian_cycle().unwrap();
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.first(), cycle.last());
        let mut interior = cycle[..3].to_vec();
        interior.sort();
        assert_eq!(interior, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn path_graph_has_no_hamiltonian_cycle() {
        let runner = MockNeighbours {
            stdout: "0,1\n1,0\n1,2\n2,1\n",
        };
        let graph = RsprGraph::build(&runner, THREE_TREES).unwrap();
        assert!(graph.hamiltonian_cycle().is_none());
    }

    #[test]
    fn invalid_trees_are_listed_but_excluded_from_the_graph() {
        let runner = MockNeighbours { stdout: "0,1\n1,0\n" };
        let trees = "((1,2),3);((1,2,3);((1,3),2);";
        let graph = RsprGraph::build(&runner, trees).unwrap();
        assert_eq!(graph.entries().len(), 3);
        assert!(graph.entries()[1].as_valid().is_none());
        //two valid trees, solver indices 0 and 1 map to t1 and t3
        assert_eq!(graph.graph().node_count(), 2);
        assert_eq!(graph.adjacency()[0].0, "t1");
        assert_eq!(graph.adjacency()[0].1, vec!["t3"]);
    }

    #[test]
    fn duplicate_solver_lines_do_not_create_parallel_edges() {
        let runner = MockNeighbours {
            stdout: "0,1\n1,0\n0,1\n",
        };
        let graph = RsprGraph::build(&runner, "((1,2),3);((1,3),2);").unwrap();
        assert_eq!(graph.graph().edge_count(), 1);
    }

    #[test]
    fn garbled_solver_output_fails_the_build() {
        let runner = MockNeighbours { stdout: "0;1\n" };
        assert!(matches!(
            RsprGraph::build(&runner, THREE_TREES),
            Err(PhyloError::ExternalTool { .. })
        ));
    }

    #[test]
    fn empty_batch_builds_an_empty_graph() {
        let runner = MockNeighbours { stdout: "" };
        let graph = RsprGraph::build(&runner, "((1,2,3);").unwrap();
        assert_eq!(graph.graph().node_count(), 0);
        assert!(graph.hamiltonian_cycle().is_none());
    }

    #[test]
    fn report_lists_every_tree_and_the_cycle() {
        let runner = MockNeighbours {
            stdout: "0,1\n1,0\n0,2\n2,0\n1,2\n2,1\n",
        };
        let graph = RsprGraph::build(&runner, THREE_TREES).unwrap();
        let text = graph.to_string();
        assert!(text.contains("t1:"));
        assert!(text.contains("HAMILTONIAN CYCLE: Yes"));
        assert!(text.contains("ADJACENCY LIST:"));
    }
}
