use clap::{Args, Parser, Subcommand};
use panel_export::cli::{self, ExportArgs};
use panel_export::error::ExportResult;
use panel_export::export::ExportFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "panel-export")]
#[command(about = "Export dashboard panel data to CSV, ZIP or XLSX")]
#[command(long_about = "Panel Export - dashboard panel data to spreadsheets

Reads a dashboard snapshot (YAML or JSON: panels plus their query results)
and writes the selected panels as one file.

COMMANDS:
  csv      - All selected panels merged into one CSV (UTF-8 BOM)
  zip      - One CSV per panel, zipped
  xlsx     - One worksheet per panel; graph panels as images
  inspect  - Print the normalized sheet as JSON

EXAMPLES:
  panel-export csv dashboard.yaml                   # All panels
  panel-export xlsx dashboard.yaml -p 1,4 -o out/    # Panels 1 and 4
  panel-export xlsx dashboard.yaml --images-dir png/ # Pre-rendered images
  panel-export inspect dashboard.yaml -p 1")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ExportOpts {
    /// Path to dashboard snapshot (YAML or JSON)
    dashboard: PathBuf,

    /// Panel ids to export, comma separated (default: all panels)
    #[arg(short, long = "panels")]
    panels: Vec<String>,

    /// Directory for the exported file
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Export configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read graph panel images from <DIR>/<panel id>.png instead of fetching image_url
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl ExportOpts {
    fn into_args(self) -> ExportResult<ExportArgs> {
        Ok(ExportArgs {
            dashboard: self.dashboard,
            panels: cli::parse_panel_ids(&self.panels)?,
            output_dir: self.output,
            config: self.config,
            images_dir: self.images_dir,
            verbose: self.verbose,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Export selected panels as a single CSV file.

Result tables of all selected panels are merged into one sheet: the n-th
field of every table lands in the n-th column, and the first table to
define a column decides its header and format. Hidden columns are skipped.")]
    /// Export panels as one CSV file
    Csv(ExportOpts),

    #[command(long_about = "Export selected panels as a ZIP of CSV files.

Each panel becomes <index>-<title>-data-<timestamp>.csv inside the archive.")]
    /// Export panels as a ZIP of per-panel CSV files
    Zip(ExportOpts),

    #[command(long_about = "Export selected panels as an XLSX workbook.

Table panels become styled worksheets: bold header, thin borders, column
widths and alignment, threshold colors and hyperlinks. Other panels get
their rendered image (1000x500). Any image failure aborts the export.")]
    /// Export panels as an XLSX workbook
    Xlsx(ExportOpts),

    /// Print the normalized sheet of a dashboard as JSON
    Inspect {
        /// Path to dashboard snapshot (YAML or JSON)
        dashboard: PathBuf,

        /// Only this panel (default: all panels merged)
        #[arg(short, long)]
        panel: Option<String>,

        /// Export configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> ExportResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Csv(opts) => cli::export(opts.into_args()?, ExportFormat::Csv).await,
        Commands::Zip(opts) => cli::export(opts.into_args()?, ExportFormat::Zip).await,
        Commands::Xlsx(opts) => cli::export(opts.into_args()?, ExportFormat::Xlsx).await,
        Commands::Inspect {
            dashboard,
            panel,
            config,
            verbose,
        } => cli::inspect(dashboard, panel, config, verbose).await,
    }
}
