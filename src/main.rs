//! Pitchrank CLI entrypoint.
//!
//! ```text
//! pitchrank <manifest.json> <rubric.json> [--output report.json] [--tie-break fingerprint]
//! ```
//!
//! The manifest is a JSON array of `{"id": "...", "path": "...", "problem_statement": "..."}`
//! entries (the statement is optional); relative paths resolve against the manifest's
//! directory. The report is printed to stdout unless
//! `--output` is given.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use mimalloc::MiMalloc;
use serde::Deserialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use pitchrank::config::PipelineConfig;
use pitchrank::extraction::{DocumentExtractor, PdftoppmRasterizer, TesseractOcr};
use pitchrank::orchestrator::{RunError, ScoringOrchestrator};
use pitchrank::presentation::PresentationInput;
use pitchrank::ranking::TieBreak;
use pitchrank::rubric::Rubric;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    path: PathBuf,
    #[serde(default, alias = "Problem Statement")]
    problem_statement: Option<String>,
}

#[derive(Debug)]
struct Args {
    manifest: PathBuf,
    rubric: PathBuf,
    output: Option<PathBuf>,
    tie_break: TieBreak,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut output = None;
    let mut tie_break = TieBreak::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                output = Some(PathBuf::from(args.next().context("--output needs a path")?));
            }
            "--tie-break" => {
                tie_break = match args.next().as_deref() {
                    Some("presentation-id") => TieBreak::PresentationId,
                    Some("fingerprint") => TieBreak::Fingerprint,
                    other => bail!("unknown tie-break policy: {other:?}"),
                };
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let [manifest, rubric] = <[PathBuf; 2]>::try_from(positional).map_err(|_| {
        anyhow::anyhow!(
            "usage: pitchrank <manifest.json> <rubric.json> [--output report.json] [--tie-break presentation-id|fingerprint]"
        )
    })?;

    Ok(Args {
        manifest,
        rubric,
        output,
        tie_break,
    })
}

fn load_manifest(path: &Path) -> anyhow::Result<Vec<PresentationInput>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let entries: Vec<ManifestEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse manifest {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    Ok(entries
        .into_iter()
        .map(|entry| {
            let path = if entry.path.is_absolute() {
                entry.path
            } else {
                base.join(entry.path)
            };
            let input = PresentationInput::from_path(entry.id, path);
            match entry.problem_statement {
                Some(statement) => input.with_problem_statement(statement),
                None => input,
            }
        })
        .collect())
}

async fn build_extractor(config: &PipelineConfig) -> DocumentExtractor {
    let mut extractor = DocumentExtractor::from_config(config)
        .with_rasterizer(Arc::new(PdftoppmRasterizer::new()));

    match &config.ocr_command {
        Some(program) => {
            let ocr = TesseractOcr::new(program);
            if ocr.is_available().await {
                extractor = extractor.with_ocr(Arc::new(ocr));
            } else {
                tracing::warn!(program = %program, "OCR engine not available; image-only slides will be empty");
            }
        }
        None => tracing::info!("OCR disabled"),
    }
    extractor
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = PipelineConfig::from_env()?;
    config.validate()?;

    let rubric = Arc::new(Rubric::load(&args.rubric)?);
    let inputs = load_manifest(&args.manifest)?;

    tracing::info!(
        presentations = inputs.len(),
        rubric_version = %rubric.version,
        batch_size = config.batch_size,
        enable_cache = config.enable_cache,
        model = %config.model_name,
        "pitchrank starting"
    );

    let extractor = build_extractor(&config).await;
    let orchestrator = ScoringOrchestrator::from_config(&config, Arc::new(extractor))?
        .with_tie_break(args.tie_break);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let (report, aborted) = match orchestrator.run_with_cancel(&inputs, rubric, cancel).await {
        Ok(report) => (report, false),
        Err(RunError::Aborted { report, .. }) => (*report, true),
        Err(e) => return Err(e.into()),
    };

    let json = report.to_json_pretty()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write report {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }

    if aborted {
        bail!(
            "run aborted: none of {} presentations could be scored",
            report.stats.total
        );
    }
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        tracing::warn!("interrupt received; finishing in-flight presentations");
        cancel.cancel();
    }
}
