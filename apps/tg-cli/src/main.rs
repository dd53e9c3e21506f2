mod error;

use clap::{Parser, Subcommand};
use error::{CliError, CliResult};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tg_core::{ProgressMonitor, TileSize};
use tg_engine::{
    ExecutionReport, ExecutionState, ExternalInputs, GraphContext, GraphProcessor, ProcessorConfig, TracingObserver,
    TransformRegistry,
};
use tg_graph::Graph;
use tg_project::{GraphDocument, TemplateVars, load_document};
use tracing::debug;

#[derive(Parser)]
#[command(name = "tg-cli")]
#[command(about = "tilegraph CLI - tile-by-tile raster processing graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate graph document syntax and structure
    Validate {
        /// Path to the graph document (YAML or JSON)
        graph_path: PathBuf,
        /// Template variable, NAME=VALUE
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },
    /// List the nodes of a graph and how they are wired
    Nodes {
        /// Path to the graph document (YAML or JSON)
        graph_path: PathBuf,
        /// Template variable, NAME=VALUE
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },
    /// List registered operators
    Operators,
    /// Execute a graph
    Run {
        /// Path to the graph document (YAML or JSON)
        graph_path: PathBuf,
        /// Template variable, NAME=VALUE
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
        /// External parameter value, NAME=VALUE
        #[arg(short = 'P', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
        /// Square tile size in pixels (overrides the document)
        #[arg(long)]
        tile_size: Option<u32>,
        /// Print a phase timing summary
        #[arg(long)]
        timing: bool,
    },
}

fn main() -> CliResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { graph_path, vars } => cmd_validate(&graph_path, &vars),
        Commands::Nodes { graph_path, vars } => cmd_nodes(&graph_path, &vars),
        Commands::Operators => cmd_operators(),
        Commands::Run {
            graph_path,
            vars,
            params,
            tile_size,
            timing,
        } => cmd_run(&graph_path, &vars, &params, tile_size, timing),
    }
}

fn template_vars(assignments: &[String]) -> CliResult<TemplateVars> {
    let mut vars = TemplateVars::new();
    for assignment in assignments {
        let (name, value) = TemplateVars::parse_assignment(assignment)?;
        vars.set(name, value);
    }
    Ok(vars)
}

fn load(graph_path: &Path, vars: &[String]) -> CliResult<(GraphDocument, Graph)> {
    let document = load_document(graph_path, &template_vars(vars)?)?;
    let graph = document.to_graph()?;
    debug!(path = %graph_path.display(), nodes = graph.node_count(), "loaded graph document");
    Ok((document, graph))
}

fn cmd_validate(graph_path: &Path, vars: &[String]) -> CliResult<()> {
    println!("Validating graph: {}", graph_path.display());
    let (_document, graph) = load(graph_path, vars)?;

    let registry = TransformRegistry::with_builtins();
    let unknown: Vec<_> = graph
        .nodes()
        .iter()
        .filter(|n| !registry.contains(&n.transform))
        .map(|n| format!("{} ({})", n.id, n.transform))
        .collect();
    if !unknown.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "unknown operators: {}",
            unknown.join(", ")
        )));
    }

    println!("✓ Graph '{}' is valid ({} nodes)", graph.id(), graph.node_count());
    Ok(())
}

fn cmd_nodes(graph_path: &Path, vars: &[String]) -> CliResult<()> {
    let (_document, graph) = load(graph_path, vars)?;
    if graph.is_empty() {
        println!("No nodes in graph '{}'", graph.id());
        return Ok(());
    }

    let sinks = match GraphContext::wire(&graph, ExternalInputs::new()) {
        Ok(ctx) => Some(ctx.sink_ids()),
        Err(err) => {
            println!("(not wired: {err})");
            None
        }
    };

    println!("Nodes in graph '{}':", graph.id());
    for node in graph.nodes() {
        let is_sink = sinks
            .as_ref()
            .is_some_and(|s| s.iter().any(|id| id == &node.id));
        println!(
            "  {}{} - {}",
            node.id,
            if is_sink { " [output]" } else { "" },
            node.transform
        );
        for source in &node.sources {
            match &source.output {
                Some(output) => println!("      {} <- {}.{}", source.role, source.source_node_id, output),
                None => println!("      {} <- {}", source.role, source.source_node_id),
            }
        }
    }
    Ok(())
}

fn cmd_operators() -> CliResult<()> {
    let registry = TransformRegistry::with_builtins();
    println!("Registered operators:");
    for factory in registry.factories() {
        println!("  {:<12} {}", factory.name(), factory.description());
    }
    Ok(())
}

fn cmd_run(
    graph_path: &Path,
    vars: &[String],
    params: &[String],
    tile_size: Option<u32>,
    timing: bool,
) -> CliResult<()> {
    if timing {
        tg_core::timing::enable_timing();
    }
    let (document, graph) = load(graph_path, vars)?;

    let mut externals = ExternalInputs::new();
    for param in params {
        let (name, value) = TemplateVars::parse_assignment(param)?;
        externals.set_value(name, value);
    }

    let tile_size = match tile_size {
        Some(size) => TileSize::square(size).map_err(|e| CliError::InvalidInput(e.to_string()))?,
        None => document
            .tile_size()?
            .unwrap_or(ProcessorConfig::default().tile_size),
    };

    println!("Running graph '{}' ({}x{} tiles)", graph.id(), tile_size.width, tile_size.height);

    let mut processor = GraphProcessor::from_config(
        Arc::new(TransformRegistry::with_builtins()),
        ProcessorConfig { tile_size },
    );
    processor.add_observer(Box::new(TracingObserver));

    let mut progress = CliProgress::new();
    let report = processor.execute_graph(&graph, externals, &mut progress);
    clear_progress_line();
    let report = report?;

    match report.state {
        ExecutionState::Completed => println!("✓ Graph completed: {}", report.graph_id),
        ExecutionState::Canceled => println!("Graph canceled: {}", report.graph_id),
        other => println!("Graph finished in state {other:?}: {}", report.graph_id),
    }
    print_report(&report, timing);
    Ok(())
}

fn print_report(report: &ExecutionReport, timing: bool) {
    if let Some(bounds) = report.bounds {
        println!("  Bounds:  {bounds}");
    }
    println!("  Tiles:   {}/{}", report.tiles_completed, report.tiles_total);
    println!("  Outputs: {}", report.outputs.join(", "));
    if timing {
        println!("\nTiming summary:");
        for line in report.timings.summary().lines() {
            println!("  {line}");
        }
    }
}

/// Progress bar on stdout, redrawn at most every 100 ms.
struct CliProgress {
    task: String,
    total: usize,
    worked: usize,
    started: Instant,
    last_emit: Option<Instant>,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            task: String::new(),
            total: 0,
            worked: 0,
            started: Instant::now(),
            last_emit: None,
        }
    }

    fn render(&self) {
        let width = 28usize;
        let fraction = if self.total == 0 {
            1.0
        } else {
            self.worked as f64 / self.total as f64
        };
        let filled = ((fraction * width as f64).round() as usize).min(width);
        print!(
            "\r[{}{}] {:>6.2}%  {}  tiles={}/{}  elapsed={:.1}s",
            "#".repeat(filled),
            "-".repeat(width.saturating_sub(filled)),
            fraction * 100.0,
            self.task,
            self.worked,
            self.total,
            self.started.elapsed().as_secs_f64()
        );
        let _ = io::stdout().flush();
    }
}

impl ProgressMonitor for CliProgress {
    fn begin_task(&mut self, task: &str, total_units: usize) {
        self.task = task.to_string();
        self.total = total_units;
        self.worked = 0;
        self.started = Instant::now();
        self.render();
    }

    fn worked(&mut self, units: usize) {
        self.worked += units;
        let emit_now = self
            .last_emit
            .is_none_or(|t| t.elapsed().as_millis() >= 100)
            || self.worked >= self.total;
        if emit_now {
            self.render();
            self.last_emit = Some(Instant::now());
        }
    }

    fn done(&mut self) {}

    fn is_canceled(&self) -> bool {
        false
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}
