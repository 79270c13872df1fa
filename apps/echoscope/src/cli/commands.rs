//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Each
//! command renders into a `String` first so output can be checked in tests.

use crate::api;
use crate::config::EchoscopeConfig;
use echoscope_core::{
    AnalysisReport, EchoError, EdgeUpdate, Ingestor, MetricsSnapshot, SimulationController,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum edge-list file size (100 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
pub const MAX_EDGE_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), EchoError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| EchoError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(EchoError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve symlinks and `..`, and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, EchoError> {
    let canonical = path.canonicalize().map_err(|e| {
        EchoError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(EchoError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read an edge-list file after path and size checks.
pub fn read_edge_list(path: &Path) -> Result<String, EchoError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_EDGE_FILE_SIZE)?;
    std::fs::read_to_string(&validated)
        .map_err(|e| EchoError::Io(format!("Read '{}': {}", path.display(), e)))
}

/// Build a loaded controller from an edge-list file.
pub fn load_controller(
    config: &EchoscopeConfig,
    path: &Path,
) -> Result<SimulationController, EchoError> {
    tracing::info!("Loading edge list from {:?}", path);
    let text = read_edge_list(path)?;
    let mut controller = SimulationController::with_config(config.louvain);
    controller.load_text(&text)?;
    Ok(controller)
}

fn loaded_report(controller: &SimulationController) -> Result<AnalysisReport, EchoError> {
    controller.report().ok_or(EchoError::NotLoaded)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, EchoError> {
    serde_json::to_string_pretty(value).map_err(|e| EchoError::Serialization(e.to_string()))
}

/// Parse a `U,V` edge argument. `position` is 1-based for error messages.
pub fn parse_edge_arg(arg: &str, position: usize) -> Result<(String, String), EchoError> {
    let malformed = || EchoError::MalformedInput {
        line: position,
        content: arg.to_string(),
    };
    let tokens = Ingestor::tokens(arg);
    match tokens.as_slice() {
        [u, v] => Ok(((*u).to_string(), (*v).to_string())),
        _ => Err(malformed()),
    }
}

// =============================================================================
// ANALYZE COMMAND
// =============================================================================

/// Render headline metrics.
pub fn render_analysis(report: &AnalysisReport, json_mode: bool) -> Result<String, EchoError> {
    if json_mode {
        return to_json(&serde_json::json!({
            "node_count": report.node_count,
            "edge_count": report.edge_count,
            "community_count": report.community_count,
            "modularity": report.modularity,
            "polarization": report.polarization,
            "bridge_count": report.bridges.len(),
        }));
    }

    let mut out = String::new();
    out.push_str("Echoscope Analysis\n");
    out.push_str("==================\n");
    out.push_str(&format!("Nodes:        {}\n", report.node_count));
    out.push_str(&format!("Edges:        {}\n", report.edge_count));
    out.push_str(&format!("Communities:  {}\n", report.community_count));
    out.push_str(&format!("Modularity:   {:.4}\n", report.modularity));
    out.push_str(&format!("Polarization: {:.4}\n", report.polarization));
    out.push_str(&format!("Bridges:      {}\n", report.bridges.len()));
    Ok(out)
}

/// Show headline metrics for an edge list.
pub fn cmd_analyze(config: &EchoscopeConfig, file: &Path, json_mode: bool) -> Result<(), EchoError> {
    let controller = load_controller(config, file)?;
    print!("{}", render_analysis(&loaded_report(&controller)?, json_mode)?);
    Ok(())
}

// =============================================================================
// COMMUNITIES COMMAND
// =============================================================================

/// Render the community membership table.
pub fn render_communities(report: &AnalysisReport, json_mode: bool) -> Result<String, EchoError> {
    if json_mode {
        return to_json(&report.communities);
    }

    let mut out = String::new();
    out.push_str(&format!("{} communities\n", report.community_count));
    for community in &report.communities {
        let members: Vec<&str> = community.members.iter().map(|m| m.as_str()).collect();
        out.push_str(&format!(
            "  [{}] size={} internal={} : {}\n",
            community.id,
            community.size,
            community.internal_edges,
            members.join(" ")
        ));
    }
    Ok(out)
}

/// List communities of an edge list.
pub fn cmd_communities(
    config: &EchoscopeConfig,
    file: &Path,
    json_mode: bool,
) -> Result<(), EchoError> {
    let controller = load_controller(config, file)?;
    print!("{}", render_communities(&loaded_report(&controller)?, json_mode)?);
    Ok(())
}

// =============================================================================
// BRIDGES COMMAND
// =============================================================================

/// Render the bridge table.
pub fn render_bridges(report: &AnalysisReport, json_mode: bool) -> Result<String, EchoError> {
    if json_mode {
        return to_json(&report.bridges);
    }

    let mut out = String::new();
    if report.bridges.is_empty() {
        out.push_str("No bridge edges\n");
        return Ok(out);
    }
    out.push_str(&format!("{} bridge edges\n", report.bridges.len()));
    for row in &report.bridges {
        out.push_str(&format!(
            "  {} [{}] -- {} [{}]\n",
            row.source, row.source_community, row.target, row.target_community
        ));
    }
    Ok(out)
}

/// List bridge edges of an edge list.
pub fn cmd_bridges(config: &EchoscopeConfig, file: &Path, json_mode: bool) -> Result<(), EchoError> {
    let controller = load_controller(config, file)?;
    print!("{}", render_bridges(&loaded_report(&controller)?, json_mode)?);
    Ok(())
}

// =============================================================================
// SIMULATE COMMAND
// =============================================================================

/// One applied simulation step.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationStep {
    pub action: &'static str,
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub update: StepMetrics,
}

/// Metrics after a step.
#[derive(Debug, Clone, Serialize)]
pub struct StepMetrics {
    pub outcome: echoscope_core::EdgeOutcome,
    pub modularity: f64,
    pub polarization: f64,
    pub bridge_count: usize,
}

impl From<&EdgeUpdate> for StepMetrics {
    fn from(update: &EdgeUpdate) -> Self {
        Self {
            outcome: update.outcome,
            modularity: update.metrics.modularity,
            polarization: update.metrics.polarization,
            bridge_count: update.metrics.bridge_count,
        }
    }
}

/// Apply all additions, then all removals. Stops at the first error.
pub fn run_simulation(
    controller: &mut SimulationController,
    add: &[String],
    remove: &[String],
) -> Result<Vec<SimulationStep>, EchoError> {
    let mut steps = Vec::with_capacity(add.len() + remove.len());
    let requests = add
        .iter()
        .map(|arg| ("add", arg))
        .chain(remove.iter().map(|arg| ("remove", arg)));

    for (position, (action, arg)) in requests.enumerate() {
        let (u, v) = parse_edge_arg(arg, position + 1)?;
        let update = if action == "add" {
            controller.add_edge(&u, &v)?
        } else {
            controller.remove_edge(&u, &v)?
        };
        steps.push(SimulationStep {
            action,
            source: u,
            target: v,
            update: StepMetrics::from(&update),
        });
    }
    Ok(steps)
}

/// Render a simulation run.
pub fn render_simulation(
    baseline: &MetricsSnapshot,
    steps: &[SimulationStep],
    verified: Option<bool>,
    json_mode: bool,
) -> Result<String, EchoError> {
    if json_mode {
        return to_json(&serde_json::json!({
            "baseline": {
                "modularity": baseline.modularity,
                "polarization": baseline.polarization,
                "bridge_count": baseline.bridge_edges.len(),
            },
            "steps": steps,
            "verified": verified,
        }));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "baseline            Q={:.4} r={:.4} bridges={}\n",
        baseline.modularity,
        baseline.polarization,
        baseline.bridge_edges.len()
    ));
    for step in steps {
        let sign = if step.action == "add" { '+' } else { '-' };
        let note = if step.update.outcome.is_applied() {
            String::new()
        } else {
            format!(" ({:?})", step.update.outcome)
        };
        out.push_str(&format!(
            "{} {} {}{}  Q={:.4} r={:.4} bridges={}\n",
            sign,
            step.source,
            step.target,
            note,
            step.update.modularity,
            step.update.polarization,
            step.update.bridge_count
        ));
    }
    if let Some(consistent) = verified {
        let verdict = if consistent { "consistent" } else { "DIVERGED" };
        out.push_str(&format!("verify: {}\n", verdict));
    }
    Ok(out)
}

/// Run a what-if simulation on an edge list.
pub fn cmd_simulate(
    config: &EchoscopeConfig,
    file: &Path,
    add: &[String],
    remove: &[String],
    verify: bool,
    json_mode: bool,
) -> Result<(), EchoError> {
    let mut controller = load_controller(config, file)?;
    let baseline = controller.snapshot().cloned().ok_or(EchoError::NotLoaded)?;

    let steps = run_simulation(&mut controller, add, remove)?;
    let verified = if verify {
        Some(controller.verify()?)
    } else {
        None
    };

    print!(
        "{}",
        render_simulation(&baseline, &steps, verified, json_mode)?
    );

    if verified == Some(false) {
        return Err(EchoError::InvalidOperation(
            "incremental metrics diverged from full recompute".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server, optionally with a preloaded graph.
pub async fn cmd_server(config: &EchoscopeConfig, file: Option<&Path>) -> Result<(), EchoError> {
    let controller = match file {
        Some(path) => load_controller(config, path)?,
        None => SimulationController::with_config(config.louvain),
    };

    println!("Echoscope Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.server.host);
    println!("  Port:     {}", config.server.port);
    println!(
        "  Graph:    {}",
        file.map_or_else(|| "(none, POST /load)".to_string(), |p| p.display().to_string())
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /health       - Health check");
    println!("  POST /load         - Upload an edge list");
    println!("  POST /edges/add    - Add an edge");
    println!("  POST /edges/remove - Remove an edge");
    println!("  GET  /metrics      - Current metrics");
    println!("  GET  /partition    - Community assignment");
    println!("  GET  /bridges      - Bridge table");
    println!("  GET  /report       - Full report");
    println!("  GET  /verify       - Consistency check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(
        &config.server.bind_addr(),
        controller,
        &config.server.cors_origins,
    )
    .await
}
