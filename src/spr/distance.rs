//! drSPR Submodule (of SPR)
//!
//! Pairwise rSPR distances through cwhidden's `rspr` executable. Every
//! unordered pair of input trees is compared independently; one malformed
//! tree or taxa mismatch marks its own matrix cells with the `X` sentinel
//! and never stops the rest of the batch.

use itertools::Itertools;

use crate::spr::InputTree;
use crate::spr::ParsedTree;
use crate::tool::ToolRunner;
use crate::PhyloError;
use crate::Result;

/// Name of the external distance solver.
pub const RSPR_TOOL: &str = "rspr";

/// Distance and approximate agreement-forest clusters for one tree pair.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PairDistance {
    pub distance: u32,
    pub clusters: Vec<String>,
}

/// One cell of the pairwise matrix. Only the strict upper triangle is ever
/// computed; the diagonal and lower triangle stay `Blank` and print as `-`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Cell {
    Blank,
    Failed(String),
    Distance(PairDistance),
}

impl Cell {
    fn matrix_entry(&self) -> String {
        match self {
            Cell::Blank => "-".to_owned(),
            Cell::Failed(_) => "X".to_owned(),
            Cell::Distance(pair) => pair.distance.to_string(),
        }
    }
}

/// Result of a pairwise drSPR run: the input trees (labelled `t1..tN`,
/// malformed ones included) and the upper-triangular distance matrix.
pub struct DrsprReport {
    trees: Vec<InputTree>,
    size: usize,
    cells: Vec<Cell>, //row-major, size * size
}

/// Compares every unordered pair of input trees.
///
/// `trees` are raw newick strings; a missing trailing semicolon is
/// appended. Fails only on the whole-batch precondition of fewer than two
/// trees; everything else becomes per-cell sentinels.
pub fn calculate_drspr(runner: &dyn ToolRunner, trees: &[String]) -> Result<DrsprReport> {
    if trees.len() < 2 {
        return Err(PhyloError::NotEnoughTrees);
    }
    let entries: Vec<InputTree> = trees
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let raw = raw.trim();
            let with_semicolon = if raw.ends_with(';') {
                raw.to_owned()
            } else {
                format!("{raw};")
            };
            InputTree::parse(i, &with_semicolon)
        })
        .collect();

    let size = entries.len();
    let mut cells = vec![Cell::Blank; size * size];
    for i in 0..size {
        for j in (i + 1)..size {
            cells[i * size + j] = compare_pair(runner, &entries[i], &entries[j]);
        }
    }
    Ok(DrsprReport {
        trees: entries,
        size,
        cells,
    })
}

fn compare_pair(runner: &dyn ToolRunner, left: &InputTree, right: &InputTree) -> Cell {
    let (t1, t2) = match (left.as_valid(), right.as_valid()) {
        (Some(t1), Some(t2)) => (t1, t2),
        (None, _) => {
            return Cell::Failed(format!(
                "Error occurred. Check newick string of {}.",
                left.label()
            ))
        }
        (_, None) => {
            return Cell::Failed(format!(
                "Error occurred. Check newick string of {}.",
                right.label()
            ))
        }
    };
    //the solver crashes on unlabelled leaves, so they are rejected up front
    for tree in [t1, t2] {
        if tree.has_unlabelled_leaf() {
            return Cell::Failed(
                PhyloError::UnlabelledLeaf(tree.label().to_owned()).to_string(),
            );
        }
    }
    let missing = t1.missing_taxa(t2);
    if !missing.is_empty() {
        return Cell::Failed(format!(
            "Error occurred. {}",
            PhyloError::TaxonMismatch { missing }
        ));
    }
    match run_rspr(runner, t1, t2) {
        Ok(pair) => Cell::Distance(pair),
        Err(err) => Cell::Failed(err.to_string()),
    }
}

fn run_rspr(runner: &dyn ToolRunner, t1: &ParsedTree, t2: &ParsedTree) -> Result<PairDistance> {
    let input = format!("{}\n{}", t1.newick(), t2.newick());
    let output = runner.run(RSPR_TOOL, &input)?;
    parse_rspr_output(&output.stdout)
}

/// Parses the fixed output grammar of the `rspr` executable: the last line
/// ends in `...=<distance>` and the third-from-last line describes the
/// agreement forest, whose tokens after the first two are the clusters.
fn parse_rspr_output(stdout: &str) -> Result<PairDistance> {
    let grammar_err = |detail: &str| PhyloError::ExternalTool {
        tool: RSPR_TOOL.to_owned(),
        detail: detail.to_owned(),
    };
    let lines: Vec<&str> = stdout.trim().lines().collect();
    if lines.len() < 3 {
        return Err(grammar_err("output shorter than 3 lines"));
    }
    let last_token = lines[lines.len() - 1]
        .split_whitespace()
        .last()
        .ok_or_else(|| grammar_err("empty last line"))?;
    let distance = last_token
        .rsplit('=')
        .next()
        .and_then(|value| value.parse::<u32>().ok())
        .ok_or_else(|| grammar_err("last line does not end in `=<distance>`"))?;
    let clusters = lines[lines.len() - 3]
        .split_whitespace()
        .skip(2)
        .map(str::to_owned)
        .collect();
    Ok(PairDistance { distance, clusters })
}

impl DrsprReport {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn trees(&self) -> &[InputTree] {
        &self.trees
    }

    pub fn cell(&self, i: usize, j: usize) -> &Cell {
        &self.cells[i * self.size + j]
    }

    pub fn distance(&self, i: usize, j: usize) -> Option<&PairDistance> {
        match self.cell(i, j) {
            Cell::Distance(pair) => Some(pair),
            _ => None,
        }
    }
}

impl std::fmt::Display for DrsprReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "TREES")?;
        for tree in &self.trees {
            writeln!(f, "{}:\n{}\n", tree.label(), tree.input())?;
        }
        if self.size == 2 {
            //short form for a single comparison
            match self.cell(0, 1) {
                Cell::Distance(pair) => {
                    writeln!(f, "drSPR = {}", pair.distance)?;
                    writeln!(f, "Clusters: {}", pair.clusters.join(" "))?;
                }
                Cell::Failed(reason) => {
                    writeln!(f, "drSPR = X")?;
                    writeln!(f, "{reason}")?;
                }
                Cell::Blank => {}
            }
            return Ok(());
        }
        writeln!(f, "MATRIX")?;
        for i in 0..self.size {
            let row = (0..self.size)
                .map(|j| self.cell(i, j).matrix_entry())
                .join(", ");
            writeln!(f, "{row}")?;
        }
        writeln!(f, "\nCLUSTERS")?;
        for i in 0..self.size - 1 {
            writeln!(f, "Clusters compared with {}:", self.trees[i].label())?;
            for j in (i + 1)..self.size {
                match self.cell(i, j) {
                    Cell::Distance(pair) => writeln!(
                        f,
                        "{} (drSPR = {}): {}",
                        self.trees[j].label(),
                        pair.distance,
                        pair.clusters.join(" ")
                    )?,
                    Cell::Failed(reason) => writeln!(
                        f,
                        "{} (drSPR = X): {}",
                        self.trees[j].label(),
                        reason
                    )?,
                    Cell::Blank => {}
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
