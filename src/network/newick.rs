//
use std::collections::HashMap;

use crate::network::malformed;
use crate::network::Network;
use crate::Result;

/// recursive descent parser for the extended newick format,
/// production rules:
//Network → Branch ";"
//Branch → Subnet Length
//Subnet → Leaf | Internal
//Leaf → Name Hybrid
//Internal → "(" BranchSet ")" Name Hybrid
//BranchSet → Branch | Branch "," BranchSet
//Name → empty | string
//Length → empty | ":" number
//Hybrid → empty | "#" Type integer
//Type → empty | string
//
//example: (((1,(2)#H2),((#H2,#H3))#H1),(#H1,((3)#H3,4)));
//
//A hybrid node may be referenced before its defining occurrence, so the
//parser keeps a map from hybrid id to the node it allocated at the first
//mention and attaches children/labels when the definition turns up.
// ------------------------------ main production methods
//
pub(super) fn network(newick_string: &str) -> Result<Network> {
    //Network → Branch ";"
    //whitespace carries no meaning anywhere in the grammar
    let stripped: String = newick_string
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if stripped.is_empty() {
        return Err(malformed(&stripped, "empty string"));
    }
    let bare = match stripped.strip_suffix(';') {
        Some(bare) => bare,
        None => return Err(malformed(&stripped, "no trailing semicolon")),
    };
    if crate::network::bracket_diagnostic(bare).is_some() {
        return Err(malformed(bare, "unbalanced brackets"));
    }
    let mut builder = Builder {
        net: Network::new(),
        rets: HashMap::new(),
    };
    builder.branch(bare, None)?;
    Ok(builder.net)
}

struct Builder {
    net: Network,
    //(k,v) = (hybrid id in the input, node id in the network)
    rets: HashMap<usize, usize>,
}

impl Builder {
    fn branch(&mut self, s: &str, parent: Option<usize>) -> Result<()> {
        //Branch → Subnet Length
        let bare_subnet = trim_length(s);
        if bare_subnet.contains('(') {
            self.internal(bare_subnet, parent)
        } else {
            self.leaf(bare_subnet, parent)
        }
    }

    fn internal(&mut self, s: &str, parent: Option<usize>) -> Result<()> {
        //Internal → "(" BranchSet ")" Name Hybrid
        let (bare_subnet, node_name) = split_name(s)?;
        let (label, hybrid) = split_hybrid(node_name)?;
        let i = match hybrid {
            Some(ret_id) => self.ret_node(ret_id),
            None => {
                let i = self.net.get_open_id();
                self.net.add_node_i(i);
                i
            }
        };
        if !label.is_empty() {
            self.net.set_label(i, Some(label.to_owned()));
        }
        if let Some(p) = parent {
            self.net.add_edge(p, i);
        }
        let branch_set_str = peel_parens(bare_subnet)?;
        self.branch_set(branch_set_str, i)
    }

    fn branch_set(&mut self, s: &str, parent: usize) -> Result<()> {
        //BranchSet → Branch | Branch "," BranchSet
        if let Some((branch_str, branch_set_str)) = split_first_branch(s) {
            self.branch(branch_str, Some(parent))?;
            self.branch_set(branch_set_str, parent)
        } else {
            self.branch(s, Some(parent))
        }
    }

    fn leaf(&mut self, s: &str, parent: Option<usize>) -> Result<()> {
        //Leaf → Name Hybrid
        let (label, hybrid) = split_hybrid(s)?;
        let i = match hybrid {
            Some(ret_id) => {
                let i = self.ret_node(ret_id);
                if !label.is_empty() {
                    self.net.set_label(i, Some(label.to_owned()));
                }
                i
            }
            None => {
                //empty names make unlabelled ("dummy") leaves
                let i = self.net.get_open_id();
                let label = (!label.is_empty()).then(|| label.to_owned());
                self.net.add_leaf(i, label);
                i
            }
        };
        if let Some(p) = parent {
            self.net.add_edge(p, i);
        }
        Ok(())
    }

    fn ret_node(&mut self, ret_id: usize) -> usize {
        //node of the first mention, or a fresh one
        match self.rets.get(&ret_id) {
            Some(&i) => i,
            None => {
                let i = self.net.get_open_id();
                self.net.add_node_i(i);
                self.rets.insert(ret_id, i);
                i
            }
        }
    }
}

//
//  -------------------------------    helper functions
//
fn trim_length(s: &str) -> &str {
    //only trim if ':' is found after the last ')'
    let mut trimmable = false;
    let mut split_at = 0;
    for (i, c) in s.chars().rev().enumerate() {
        match c {
            ')' => break,
            ':' => {
                trimmable = true;
                split_at = i;
                break;
            }
            '0'..='9' | '.' => continue,
            _ => break,
        }
    }
    if trimmable {
        let (return_s, _) = s.split_at(s.len() - split_at - 1);
        return_s
    } else {
        s
    }
}

fn split_name(s: &str) -> Result<(&str, &str)> {
    match s.rfind(')') {
        Some(i) => Ok(s.split_at(i + 1)),
        None => Err(malformed(s, "no subnet to split from")),
    }
}

fn peel_parens(s: &str) -> Result<&str> {
    s.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| malformed(s, "mismatched brackets"))
}

fn split_first_branch(s: &str) -> Option<(&str, &str)> {
    //split on the first comma not nested in parens
    let mut split_index = 0;
    let mut is_splittable = false;
    let mut is_inner = 0;
    for (i, c) in s.chars().enumerate() {
        match c {
            '(' => is_inner += 1,
            ')' => is_inner -= 1,
            ',' => {
                if is_inner == 0 {
                    split_index = i;
                    is_splittable = true;
                    break;
                }
            }
            _ => continue,
        }
    }
    if is_splittable {
        let (f, pre_l) = s.split_at(split_index);
        let l = pre_l.strip_prefix(',').unwrap();
        Some((f, l))
    } else {
        None
    }
}

fn split_hybrid(node_name: &str) -> Result<(&str, Option<usize>)> {
    //Hybrid → empty | "#" Type integer
    match node_name.find('#') {
        Some(pos) => {
            let (label, hybrid) = node_name.split_at(pos);
            let digits = hybrid.trim_start_matches(|c: char| !c.is_ascii_digit());
            let ret_id = digits
                .parse::<usize>()
                .map_err(|_| malformed(node_name, "hybrid node without numeric id"))?;
            Ok((label, Some(ret_id)))
        }
        None => Ok((node_name, None)),
    }
}

#[cfg(test)]
mod tests {
    use crate::network::Network;
    use crate::PhyloError;

    #[test]
    fn parses_plain_tree() {
        let n = Network::parse_newick("(((1,2),3),4);").unwrap();
        assert_eq!(n.labelled_leaves(), vec!["1", "2", "3", "4"]);
        assert!(n.get_reticulations().is_empty());
    }

    #[test]
    fn parses_network_with_forward_hybrid_references() {
        let n = Network::parse_newick("(((1,(2)#H2),((#H2,#H3))#H1),(#H1,((3)#H3,4)));").unwrap();
        assert_eq!(n.get_reticulations().len(), 3);
        assert_eq!(n.labelled_leaves(), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn ignores_whitespace_and_branch_lengths() {
        let n = Network::parse_newick("((a:1.0, b:2.0):0.5, c);").unwrap();
        assert_eq!(n.labelled_leaves(), vec!["a", "b", "c"]);
    }

    #[test]
    fn rejects_missing_semicolon() {
        let err = Network::parse_newick("((a,b),c)").unwrap_err();
        assert!(matches!(err, PhyloError::MalformedNewick(_)));
        assert!(err.to_string().contains("semicolon"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(Network::parse_newick("   ").is_err());
    }

    #[test]
    fn reports_bracket_imbalance() {
        let err = Network::parse_newick("((a,b),c;").unwrap_err();
        assert!(err.to_string().contains("missing 1 closing bracket(s)"));
    }

    #[test]
    fn single_leaf_is_valid() {
        let n = Network::parse_newick("a;").unwrap();
        assert_eq!(n.node_count(), 1);
        assert_eq!(n.enewick(), "a;");
    }

    #[test]
    fn hybrid_without_id_is_rejected() {
        assert!(Network::parse_newick("((a)#H,b);").is_err());
    }
}
