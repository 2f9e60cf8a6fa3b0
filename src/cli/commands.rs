use crate::acquire::{FileImageRenderer, HttpImageRenderer, ImageRenderer, SnapshotSource};
use crate::config::ExportConfig;
use crate::dashboard::load_snapshot;
use crate::error::{ExportError, ExportResult};
use crate::export::{ExportArtifact, ExportFormat};
use crate::service::ExportService;
use crate::session::ExportSession;
use crate::types::NormalizedSheet;
use chrono::Utc;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on one render-service request
const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Arguments shared by the csv, zip and xlsx commands
#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub dashboard: PathBuf,
    pub panels: Vec<String>,
    pub output_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub images_dir: Option<PathBuf>,
    pub verbose: bool,
}

/// Install a stderr tracing subscriber when `--verbose` is given
fn init_tracing(verbose: bool) {
    if verbose {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "panel_export=debug".into()),
            )
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Build the service used by one CLI invocation
pub fn build_service(
    config: ExportConfig,
    images_dir: Option<&Path>,
) -> ExportResult<ExportService> {
    let images: Arc<dyn ImageRenderer> = match images_dir {
        Some(dir) => Arc::new(FileImageRenderer::new(dir)),
        None => Arc::new(HttpImageRenderer::new(IMAGE_FETCH_TIMEOUT)?),
    };
    let service = ExportService::new(config, images);
    service.start();
    Ok(service)
}

/// Write the artifact into `output_dir`, creating it when missing
pub fn write_artifact(artifact: &ExportArtifact, output_dir: &Path) -> ExportResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)?;
    Ok(path)
}

/// Execute the csv / zip / xlsx command
pub async fn export(args: ExportArgs, format: ExportFormat) -> ExportResult<()> {
    init_tracing(args.verbose);

    println!(
        "{}",
        format!("📦 Panel Export - {}", format.extension().to_uppercase())
            .bold()
            .green()
    );
    println!("   Dashboard: {}", args.dashboard.display());
    println!("   Output:    {}\n", args.output_dir.display());

    let config = ExportConfig::load_or_default(args.config.as_deref())?;
    let snapshot = load_snapshot(&args.dashboard)?;
    let dashboard = snapshot.dashboard;
    let source = SnapshotSource::new(snapshot.data);

    if args.verbose {
        println!("{}", "📖 Loaded dashboard".cyan());
        println!(
            "   {} ({} panels)\n",
            dashboard.title.bright_blue().bold(),
            dashboard.panels.len()
        );
    }

    let service = build_service(config, args.images_dir.as_deref())?;
    let mut session = ExportSession::new();
    session.select(args.panels)?;
    let selection = session.selection().to_vec();

    let result = session
        .run(
            format,
            service.export(&dashboard, &source, &selection, format, Utc::now()),
        )
        .await;
    service.shutdown();

    let artifact = match result {
        Ok(artifact) => artifact,
        Err(e) => {
            println!("{}", "❌ Export failed".bold().red());
            return Err(e);
        }
    };

    let path = write_artifact(&artifact, &args.output_dir)?;
    println!("{}", "✅ Export Complete!".bold().green());
    println!("   File:  {}", path.display());
    println!("   Size:  {} bytes", artifact.bytes.len());
    println!("   Type:  {}\n", artifact.mime_type());

    Ok(())
}

/// Execute the inspect command: print the normalized sheet as JSON
pub async fn inspect(
    dashboard: PathBuf,
    panel: Option<String>,
    config: Option<PathBuf>,
    verbose: bool,
) -> ExportResult<()> {
    init_tracing(verbose);

    let config = ExportConfig::load_or_default(config.as_deref())?;
    let snapshot = load_snapshot(&dashboard)?;
    let source = SnapshotSource::new(snapshot.data);

    let service = build_service(config, None)?;
    let sheet = service
        .inspect(&snapshot.dashboard, &source, panel.as_deref())
        .await;
    service.shutdown();
    let sheet = sheet?;

    if verbose {
        eprintln!("{}", summarize(&sheet).cyan());
    }
    println!("{}", serde_json::to_string_pretty(&sheet)?);
    Ok(())
}

/// One-line description of a sheet's shape
fn summarize(sheet: &NormalizedSheet) -> String {
    let hidden = sheet.columns.iter().filter(|c| c.spec.hidden).count();
    format!(
        "🔍 {} columns ({} hidden), {} rows",
        sheet.len(),
        hidden,
        sheet.row_count()
    )
}

/// Split `-p 1,2 -p 3` style values into panel ids
pub fn parse_panel_ids(values: &[String]) -> ExportResult<Vec<String>> {
    let mut ids = Vec::new();
    for value in values {
        for id in value.split(',').map(str::trim) {
            if id.is_empty() {
                return Err(ExportError::Parse(format!(
                    "Empty panel id in '{}'",
                    value
                )));
            }
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
