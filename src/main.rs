use std::env;
use std::fs;

use displayed_trees::network::display::NetworkModel;
use displayed_trees::spr::distance::calculate_drspr;
use displayed_trees::spr::graph::RsprGraph;
use displayed_trees::spr::split_semicolon_trees;
use displayed_trees::tool::SystemTools;

fn main() {
    let args: Vec<String> = env::args().collect();
    //       --------------             parse command
    if args.len() < 2 {
        help("error: provide a command.");
        return;
    }
    let command = args[1].clone();
    match command.as_str() {
        "trees" | "drspr" | "graph" => (),
        _ => {
            help("error: unknown command.");
            return;
        }
    }
    //    -------------          parse option flags
    //short form and long form
    let mut leaves_opt: Option<String> = None;
    let mut is_literal = false;
    let mut tools_dir: Option<String> = None;
    let mut req_args: Vec<&str> = vec![];
    for (i, arg) in args.iter().enumerate() {
        if i == 0 || i == 1 {
            continue;
        }
        let mut v: Vec<&str> = arg.split('=').collect();
        v[0] = v[0].trim_start_matches('-');
        if arg.starts_with("--") {
            match v[0] {
                "leaves" => leaves_opt = v.get(1).map(|s| s.to_string()),
                "newick" => is_literal = true,
                "tools" => tools_dir = v.get(1).map(|s| s.to_string()),
                "help" => {
                    help("printing help...");
                    return;
                }
                _ => {
                    help("unknown flag encountered");
                    return;
                }
            }
        } else if arg.starts_with('-') {
            for c in v[0].chars() {
                match c {
                    'l' => leaves_opt = v.get(1).map(|s| s.to_string()),
                    'n' => is_literal = true,
                    't' => tools_dir = v.get(1).map(|s| s.to_string()),
                    'h' => {
                        help("printing help...");
                        return;
                    }
                    _ => {
                        print!("{c} ");
                        help("unknown flag encountered");
                        return;
                    }
                }
            }
        } else {
            req_args.push(arg);
        }
    }
    //      -----------           parse arguments and call
    if req_args.len() != 1 {
        help("each command takes exactly one input argument");
        return;
    }
    let input = if is_literal {
        req_args[0].to_string()
    } else {
        match fs::read_to_string(req_args[0]) {
            Ok(text) => text,
            Err(_) => {
                help("Could not read input file.");
                return;
            }
        }
    };
    let input = input.trim().to_owned();
    let tools = match tools_dir {
        Some(dir) => SystemTools::with_dir(dir),
        None => SystemTools::new(),
    };
    let outcome = match command.as_str() {
        "trees" => call_trees(&input, leaves_opt.as_deref()),
        "drspr" => call_drspr(&tools, &input),
        _ => call_graph(&tools, &input),
    };
    if let Err(err) = outcome {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn help(message: &str) {
    println!("exit message: {}", message);
    println!(
        "
    Displayed trees program. Enumerates the trees displayed by a rooted
    phylogenetic network, or compares a batch of trees by rSPR distance.
    It runs in three modes:

    COMMANDS
    trees     displayed trees of one network in extended newick format
    drspr     pairwise rSPR distance matrix of 2 or more trees
    graph     rSPR adjacency graph and Hamiltonian cycle of a tree batch

    The input argument is a text file. For `trees` the file holds one
    network in extended newick format (everything after the first semicolon
    is ignored); for `drspr` and `graph` it holds newick trees, each
    terminated by a semicolon. The drspr and graph commands call the
    external `rspr` and `spr_dense_graph` executables of cwhidden, which
    must be on PATH or in the directory given with --tools.

    USAGE
    1. displayed trees mode
    usage: trees [options] <network-file>

    2. pairwise distance mode
    usage: drspr [options] <trees-file>

    3. adjacency graph mode
    usage: graph [options] <trees-file>

    OPTIONS
    -l=<csv>     Leaves, `trees` mode, comma-separated leaf labels that the
                 displayed trees are restricted to. All labelled leaves are
                 kept by default.
    -n           Newick, any mode, treat the input argument as a literal
                 newick string instead of a file name.
    -t=<dir>     Tools, `drspr` and `graph` modes, directory containing the
                 external solver executables.
    -h           Help, any mode, print this help guide.
    "
    );
}

fn call_trees(text: &str, leaves: Option<&str>) -> displayed_trees::Result<()> {
    //the network is everything up to and including the first semicolon
    let newick = match text.find(';') {
        Some(at) => &text[..=at],
        None => text,
    };
    let mut model = NetworkModel::new(newick)?;
    if leaves.is_some() {
        model.set_selected_leaves(leaves)?;
    }
    print!("{model}");
    let trees = model.process()?;
    print!("\n{trees}");
    Ok(())
}

fn call_drspr(tools: &SystemTools, text: &str) -> displayed_trees::Result<()> {
    let trees = split_semicolon_trees(text);
    let report = calculate_drspr(tools, &trees)?;
    print!("{report}");
    Ok(())
}

fn call_graph(tools: &SystemTools, text: &str) -> displayed_trees::Result<()> {
    let graph = RsprGraph::build(tools, text)?;
    print!("{graph}");
    Ok(())
}
