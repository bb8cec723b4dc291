use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use strokework::{
    AffineRoutine, Collaborators, CommitOutcome, ContentHandle, LodLevel, MemoryNode, NodeId,
    Node, NodeKind, NodeRef, ParamsRegistry, Rect, RecordingRenderer, SessionOpts, StrokeSession,
    UndoHistory,
};

#[derive(Parser, Debug)]
#[command(name = "strokework", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON stroke script over in-memory nodes.
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Input script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Override the script's preview level of detail.
    #[arg(long)]
    preview_lod: Option<u8>,

    /// Run every job on the driver thread.
    #[arg(long, default_value_t = false)]
    inline: bool,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(serde::Deserialize, Debug)]
struct Script {
    nodes: Vec<ScriptNode>,
    #[serde(default)]
    opts: SessionOpts,
    strokes: Vec<ScriptStroke>,
}

#[derive(serde::Deserialize, Debug)]
struct ScriptNode {
    id: u32,
    /// `[x0, y0, x1, y1]` in full-resolution pixels.
    rect: [f64; 4],
    rgba: [u8; 4],
    #[serde(default)]
    kind: NodeKind,
    #[serde(default)]
    locked: bool,
}

#[derive(serde::Deserialize, Debug)]
struct ScriptStroke {
    /// Node ids to transform; every node when absent.
    #[serde(default)]
    nodes: Option<Vec<u32>>,
    initial: serde_json::Value,
    #[serde(default)]
    updates: Vec<ScriptUpdate>,
    #[serde(default)]
    finish: Finish,
}

#[derive(serde::Deserialize, Debug)]
struct ScriptUpdate {
    params: serde_json::Value,
    #[serde(default)]
    force: bool,
    #[serde(default)]
    wait_ms: u64,
}

#[derive(serde::Deserialize, Debug, Default, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum Finish {
    #[default]
    Commit,
    Cancel,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Replay(args) => cmd_replay(args),
    }
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read script '{}'", args.in_path.display()))?;
    let mut script: Script = serde_json::from_str(&text)
        .with_context(|| format!("parse script '{}'", args.in_path.display()))?;
    if let Some(lod) = args.preview_lod {
        script.opts.preview_lod = LodLevel::new(lod)?;
    }
    if args.inline {
        script.opts.scheduler.parallel = false;
    }
    if args.threads.is_some() {
        script.opts.scheduler.threads = args.threads;
    }

    let registry = ParamsRegistry::with_builtins();
    let nodes: BTreeMap<u32, NodeRef> = script
        .nodes
        .iter()
        .map(|entry| (entry.id, build_node(entry)))
        .collect();
    let renderer = Arc::new(RecordingRenderer::new());
    let history = UndoHistory::new(renderer.clone()).shared();
    let routine = Arc::new(AffineRoutine::default());

    let mut reports = Vec::with_capacity(script.strokes.len());
    for (i, stroke) in script.strokes.iter().enumerate() {
        let targets = match &stroke.nodes {
            Some(ids) => ids
                .iter()
                .map(|id| {
                    nodes
                        .get(id)
                        .cloned()
                        .with_context(|| format!("stroke {i}: unknown node {id}"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => nodes.values().cloned().collect(),
        };
        let initial = registry
            .decode(&stroke.initial)
            .with_context(|| format!("stroke {i}: initial params"))?;

        let mut session = StrokeSession::begin(
            targets,
            initial,
            Collaborators::new(routine.clone(), renderer.clone(), history.clone()),
            script.opts.clone(),
        )
        .with_context(|| format!("stroke {i}: begin"))?;

        for (u, update) in stroke.updates.iter().enumerate() {
            let params = registry
                .decode(&update.params)
                .with_context(|| format!("stroke {i}: update {u}"))?;
            if update.force {
                session.update_params_now(params)?;
            } else {
                session.update_params(params)?;
            }
            if update.wait_ms > 0 {
                std::thread::sleep(Duration::from_millis(update.wait_ms));
            }
        }

        let report = match stroke.finish {
            Finish::Commit => match session.commit()? {
                CommitOutcome::Committed { macro_id, stats } => serde_json::json!({
                    "outcome": "committed",
                    "macro_id": macro_id.0,
                    "stats": stats,
                }),
                CommitOutcome::Identity { stats } => serde_json::json!({
                    "outcome": "identity",
                    "stats": stats,
                }),
            },
            Finish::Cancel => {
                session.cancel()?;
                serde_json::json!({
                    "outcome": "cancelled",
                    "stats": session.stats()?,
                })
            }
        };
        reports.push(report);
    }

    let fingerprints: BTreeMap<String, String> = nodes
        .iter()
        .map(|(id, node)| {
            (
                id.to_string(),
                format!("{:016x}", node.content_snapshot().fingerprint()),
            )
        })
        .collect();
    let history_len = history
        .lock()
        .map_err(|_| anyhow::anyhow!("undo history lock poisoned"))?
        .len();
    let out = serde_json::json!({
        "strokes": reports,
        "history_len": history_len,
        "dirty_notices": renderer.notices().len(),
        "fingerprints": fingerprints,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn build_node(entry: &ScriptNode) -> NodeRef {
    let [x0, y0, x1, y1] = entry.rect;
    let content = ContentHandle::solid(LodLevel::FULL, Rect::new(x0, y0, x1, y1), entry.rgba);
    let mut node = MemoryNode::new(NodeId(entry.id), content).with_kind(entry.kind);
    if entry.locked {
        node = node.read_only();
    }
    node.into_ref()
}
