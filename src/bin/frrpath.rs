use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use frrpath::compute::RlfaParams;
use frrpath::model::repository::GenerateKind;
use frrpath::runtime::config::load_topology;
use frrpath::runtime::engine::{CancelToken, EngineParams, FrrEngine};

#[derive(Debug, Parser)]
#[command(name = "frrpath")]
#[command(about = "IP fast-reroute path computation: SPF, LFA, rLFA and TI-LFA")]
struct Args {
    /// Topology file in node-link format, JSON or YAML by extension.
    #[arg(long)]
    topology: PathBuf,

    /// Comma separated generation kinds (spt,lfa,rlfa,tilfa) or "all".
    #[arg(long, default_value = "all")]
    kinds: String,

    /// Restrict the output to this source node.
    #[arg(long)]
    src: Option<String>,

    /// Restrict the output to this destination node.
    #[arg(long)]
    dst: Option<String>,

    /// Show only paths whose node sequence contains this node.
    #[arg(long, conflicts_with_all = ["src", "dst"])]
    via: Option<String>,

    /// Write the nested JSON view to a file instead of stdout.
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Worker threads for generation, defaults to available parallelism.
    #[arg(long)]
    workers: Option<NonZeroUsize>,

    /// Search the repairing router's own P-space instead of extended
    /// P-space for rLFA endpoints.
    #[arg(long)]
    no_ep_space: bool,

    /// Admit rLFA repair tunnels that trombone through a shared node.
    #[arg(long)]
    allow_trombone: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_kinds(raw: &str) -> Result<Vec<GenerateKind>> {
    let mut kinds = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind = match part {
            "all" => {
                return Ok(vec![
                    GenerateKind::Spt,
                    GenerateKind::Lfa,
                    GenerateKind::Rlfa,
                    GenerateKind::Tilfa,
                ])
            }
            "spt" => GenerateKind::Spt,
            "lfa" => GenerateKind::Lfa,
            "rlfa" => GenerateKind::Rlfa,
            "tilfa" => GenerateKind::Tilfa,
            other => bail!("unknown generation kind {other:?}"),
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        bail!("no generation kinds requested");
    }
    Ok(kinds)
}

fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let kinds = parse_kinds(&args.kinds)?;
    let topology = load_topology(&args.topology)?;
    info!(
        nodes = topology.node_count(),
        links = topology.link_count(),
        "topology loaded"
    );

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install signal handler")?;

    let params = EngineParams {
        rlfa: RlfaParams {
            use_ep_space: !args.no_ep_space,
            allow_trombone: args.allow_trombone,
        },
        workers: args.workers,
    };
    let mut engine = FrrEngine::with_params(topology, params);
    for kind in kinds {
        engine.generate_all(kind, Some(&cancel))?;
    }

    let view = match &args.via {
        Some(via) => engine.get_paths_via(via)?,
        None => engine.get_paths(args.src.as_deref(), args.dst.as_deref())?,
    };
    let payload =
        serde_json::to_string_pretty(&view).context("failed to encode paths json")?;
    match &args.output_json {
        Some(path) => fs::write(path, payload)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{payload}"),
    }
    Ok(())
}
