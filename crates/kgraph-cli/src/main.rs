use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use kgraph_core::KnowledgeGraph;
use kgraph_llm::OpenAiBackend;
use kgraph_pipeline::{
    ConceptExtractor, ExpanderConfig, ExtractorConfig, GraphExpander, RepoAnalysis,
};
use std::path::{Path, PathBuf};

fn backend_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("base-url")
            .long("base-url")
            .help("OpenAI-compatible endpoint (falls back to LLM_BASE_URL)"),
    )
    .arg(
        Arg::new("model")
            .long("model")
            .default_value("gpt-4o-mini")
            .help("Model name sent with each request"),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Command::new("kgraph")
        .version(kgraph_core::VERSION)
        .about("LLM-assisted knowledge graph builder")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(backend_args(
            Command::new("extract")
                .about("Extract a knowledge graph from a repository analysis document")
                .arg(
                    Arg::new("analysis")
                        .long("analysis")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the analysis JSON produced by a repo analyzer"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output graph path (default: knowledge_graph_<timestamp>.json)"),
                )
                .arg(
                    Arg::new("min-nodes")
                        .long("min-nodes")
                        .default_value("20")
                        .value_parser(value_parser!(usize))
                        .help("Node count below which a continuation pass runs"),
                ),
        ))
        .subcommand(backend_args(
            Command::new("expand")
                .about("Grow an existing knowledge graph with inferred concepts")
                .arg(
                    Arg::new("graph")
                        .long("graph")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to an existing graph JSON"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output path (default: overwrite the input graph)"),
                )
                .arg(
                    Arg::new("rounds")
                        .long("rounds")
                        .default_value("2")
                        .value_parser(value_parser!(usize))
                        .help("Maximum expansion rounds"),
                )
                .arg(
                    Arg::new("concepts-per-round")
                        .long("concepts-per-round")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("New concepts requested per round"),
                ),
        ))
        .subcommand(
            Command::new("stats")
                .about("Print statistics for a knowledge graph")
                .arg(
                    Arg::new("graph")
                        .long("graph")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to a graph JSON"),
                )
                .arg(
                    Arg::new("order")
                        .long("order")
                        .action(clap::ArgAction::SetTrue)
                        .help("Also print the learning order (topological sort)"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("extract", args)) => run_extract(args).await,
        Some(("expand", args)) => run_expand(args).await,
        Some(("stats", args)) => run_stats(args),
        _ => unreachable!("subcommand required"),
    }
}

async fn run_extract(args: &ArgMatches) -> Result<()> {
    let analysis_path = args.get_one::<PathBuf>("analysis").unwrap();
    let analysis = RepoAnalysis::load(analysis_path)
        .with_context(|| format!("loading analysis from {}", analysis_path.display()))?;

    let config = ExtractorConfig {
        min_nodes: *args.get_one::<usize>("min-nodes").unwrap(),
        ..Default::default()
    };
    let extractor = ConceptExtractor::new(backend_from(args)?).with_config(config);
    let graph = extractor.extract(&analysis).await?;

    println!("Extracted {} concepts, {} edges", graph.len(), graph.edges().len());

    let output = match args.get_one::<PathBuf>("output") {
        Some(path) => path.clone(),
        None => timestamped_output(),
    };
    save_checked(&graph, &output)
}

async fn run_expand(args: &ArgMatches) -> Result<()> {
    let graph_path = args.get_one::<PathBuf>("graph").unwrap();
    let mut graph = KnowledgeGraph::load(graph_path)
        .with_context(|| format!("loading graph from {}", graph_path.display()))?;
    let before = graph.len();

    let config = ExpanderConfig {
        rounds: *args.get_one::<usize>("rounds").unwrap(),
        concepts_per_round: *args.get_one::<usize>("concepts-per-round").unwrap(),
        ..Default::default()
    };
    let expander = GraphExpander::new(backend_from(args)?).with_config(config);
    let report = expander.expand(&mut graph).await?;

    println!(
        "Expansion: {} rounds, +{} concepts, +{} edges ({} -> {} concepts)",
        report.rounds_run,
        report.nodes_added,
        report.edges_added,
        before,
        graph.len()
    );

    let output = match args.get_one::<PathBuf>("output") {
        Some(path) => path.clone(),
        None => graph_path.clone(),
    };
    save_checked(&graph, &output)
}

fn run_stats(args: &ArgMatches) -> Result<()> {
    let graph_path = args.get_one::<PathBuf>("graph").unwrap();
    let graph = KnowledgeGraph::load(graph_path)
        .with_context(|| format!("loading graph from {}", graph_path.display()))?;

    let stats = graph.stats();
    println!("Concepts: {}", stats.num_concepts);
    println!("Edges:    {}", stats.num_edges);
    println!("By level:");
    for (level, count) in &stats.by_level {
        println!("  {level}: {count}");
    }

    if args.get_flag("order") {
        println!();
        println!("Learning order:");
        for (index, id) in graph.topological_sort().iter().enumerate() {
            let name = graph.get_concept(id).map_or("?", |n| n.name.as_str());
            println!("  {:3}. {id} ({name})", index + 1);
        }
    }
    Ok(())
}

fn backend_from(args: &ArgMatches) -> Result<OpenAiBackend> {
    let model = args.get_one::<String>("model").unwrap();
    match args.get_one::<String>("base-url") {
        Some(base_url) => Ok(OpenAiBackend::new(base_url, model)),
        None => Ok(OpenAiBackend::from_env(model)?),
    }
}

fn timestamped_output() -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("knowledge_graph_{stamp}.json"))
}

/// Save the graph after verifying it survives a serialization round trip.
fn save_checked(graph: &KnowledgeGraph, path: &Path) -> Result<()> {
    let reloaded = KnowledgeGraph::from_json(&graph.to_json());
    if reloaded.len() != graph.len() || reloaded.edges().len() != graph.edges().len() {
        bail!(
            "serialization round trip lost data ({}/{} concepts, {}/{} edges); not saving",
            reloaded.len(),
            graph.len(),
            reloaded.edges().len(),
            graph.edges().len()
        );
    }

    graph
        .save(path)
        .with_context(|| format!("saving graph to {}", path.display()))?;
    println!("Saved graph to {}", path.display());
    Ok(())
}
