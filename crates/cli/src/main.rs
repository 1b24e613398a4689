//! `clusterprice` — joins the sales extract with location, price and cost
//! masters and writes the cluster analysis workbook.

mod exit_codes;
mod logging;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "clusterprice")]
#[command(about = "Enrich sales data with list prices, price conditions and costs")]
#[command(long_version = long_version())]
#[command(version)]
#[command(after_help = "\
Examples:
  clusterprice --sales sales.xlsx --mdm mdm.xlsx --lp lp.xlsx --so so.xlsx \\
    --zcpr zcpr.xlsx --stdcosts std.xlsx --sapcosts sap.xlsx
  clusterprice ... --config pricing.toml --output-dir out/ --report out/report.json

Logging:
  CLUSTERPRICE_LOG=debug clusterprice ...   (default: info)")]
pub struct Cli {
    /// Sales cube export (sheet "Values vs YTD")
    #[arg(long)]
    pub sales: PathBuf,

    /// Location master data (sheet "SAPLocations")
    #[arg(long)]
    pub mdm: PathBuf,

    /// List prices
    #[arg(long = "lp", alias = "LP")]
    pub lp: PathBuf,

    /// Sales organisation per legal entity
    #[arg(long)]
    pub so: PathBuf,

    /// Customer price conditions (ZCPR)
    #[arg(long)]
    pub zcpr: PathBuf,

    /// Standard group costs
    #[arg(long)]
    pub stdcosts: PathBuf,

    /// SAP cost list export
    #[arg(long)]
    pub sapcosts: PathBuf,

    /// Run config (TOML). Built-in defaults apply when omitted
    #[arg(long, env = "CLUSTERPRICE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the workbook is written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Run log, appended to
    #[arg(long, default_value = "run.log")]
    pub log_file: PathBuf,

    /// Also write the run report (row counts per step, warnings) as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  clusterprice-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help / --version land here too, on stdout
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };

    let result = logging::init(&cli.log_file).and_then(|()| run::cmd_run(cli));

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
