//! The analysis run: config, sources, pipeline, workbook.

use std::path::Path;
use std::time::Instant;

use chrono::Local;
use clusterprice_io::{load_all, save, IoError, SourcePaths};
use clusterprice_recon::{ReconConfig, ReconError, RunReport, TracingLog};
use tracing::{debug, error, info, warn};

use crate::exit_codes::{
    EXIT_CONFIG_INVALID, EXIT_DUPLICATE_KEYS, EXIT_ERROR, EXIT_OUTPUT_WRITE, EXIT_SCHEMA,
    EXIT_SOURCE_UNREADABLE,
};
use crate::{Cli, CliError};

pub fn cmd_run(cli: Cli) -> Result<(), CliError> {
    let started = Instant::now();
    let result = run(cli);
    if let Err(e) = &result {
        error!(code = e.code, "Run failed after {:.1} seconds", started.elapsed().as_secs_f64());
    } else {
        info!("Run finished in {:.1} seconds", started.elapsed().as_secs_f64());
    }
    result
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;

    let paths = SourcePaths {
        sales: cli.sales,
        locations: cli.mdm,
        list_prices: cli.lp,
        sales_org: cli.so,
        conditions: cli.zcpr,
        std_costs: cli.stdcosts,
        sap_costs: cli.sapcosts,
    };

    info!("Loading source files");
    let sources = load_all(&paths, &config).map_err(io_error)?;

    let output = clusterprice_recon::run(&config, sources, &TracingLog).map_err(recon_error)?;

    info!("Saving output");
    let path = save(&output.table, &cli.output_dir, &config.output, Local::now().naive_local())
        .map_err(io_error)?;
    info!(
        rows = output.table.len(),
        columns = output.table.width(),
        "Saved {}",
        path.display()
    );

    summarize(&output.report);
    if let Some(report_path) = &cli.report {
        write_report(&output.report, report_path)?;
    }

    eprintln!("wrote {}", path.display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_CONFIG_INVALID, format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = ReconConfig::from_toml(&text).map_err(recon_error)?;
    info!("Loaded config {}", path.display());
    Ok(config)
}

fn summarize(report: &RunReport) {
    for step in &report.steps {
        debug!(step = %step.step, rows_in = step.rows_in, rows_out = step.rows_out, "step rows");
    }
    for key in &report.keys {
        debug!(rule = key.rule, built = key.built, null = key.null, degraded = key.degraded, "key rule");
    }
    let null_keys = report.null_keys();
    if null_keys > 0 {
        info!("{null_keys} row key(s) could not be built and will not match");
    }
    let fan_outs = report.cardinality_warnings();
    if fan_outs > 0 {
        warn!("{fan_outs} join(s) created duplicate rows; sums over the output are overstated");
    }
}

fn write_report(report: &RunReport, path: &Path) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write report {}: {e}", path.display())))?;
    info!("Wrote run report {}", path.display());
    Ok(())
}

fn recon_error(err: ReconError) -> CliError {
    let message = err.to_string();
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
            CliError::new(EXIT_CONFIG_INVALID, message)
        }
        ReconError::MissingColumn { .. } => CliError::new(EXIT_SCHEMA, message)
            .with_hint("check that each flag points at the right extract"),
        ReconError::DuplicateJoinKeys { dimension_key, .. } => CliError::new(EXIT_DUPLICATE_KEYS, message)
            .with_hint(format!(
                "make '{dimension_key}' unique in its source, or set join.on_duplicate = \"warn\""
            )),
    }
}

fn io_error(err: IoError) -> CliError {
    match err {
        IoError::Recon(e) => recon_error(e),
        IoError::Write { .. } => CliError::new(EXIT_OUTPUT_WRITE, err.to_string())
            .with_hint("check that --output-dir exists and the workbook is not open elsewhere"),
        IoError::MissingSheet { .. } => CliError::new(EXIT_SOURCE_UNREADABLE, err.to_string())
            .with_hint("was the extract saved with its standard sheet names?"),
        IoError::Read { .. } | IoError::NoSheets { .. } | IoError::HeaderRow { .. } => {
            CliError::new(EXIT_SOURCE_UNREADABLE, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterprice_recon::Source;
    use std::path::PathBuf;

    #[test]
    fn errors_map_to_exit_codes() {
        assert_eq!(recon_error(ReconError::ConfigParse("x".into())).code, EXIT_CONFIG_INVALID);
        assert_eq!(recon_error(ReconError::missing_column("sales", "JV")).code, EXIT_SCHEMA);
        let dup = recon_error(ReconError::DuplicateJoinKeys {
            step: "list prices".into(),
            dimension_key: "LP-item-dwh-key".into(),
            base_rows: 2,
            joined_rows: 3,
        });
        assert_eq!(dup.code, EXIT_DUPLICATE_KEYS);
        assert!(dup.hint.unwrap().contains("LP-item-dwh-key"));

        let read = io_error(IoError::NoSheets {
            input: Source::Sales,
            path: PathBuf::from("sales.xlsx"),
        });
        assert_eq!(read.code, EXIT_SOURCE_UNREADABLE);
        let nested = io_error(IoError::Recon(ReconError::missing_column("locations", "SAPCode")));
        assert_eq!(nested.code, EXIT_SCHEMA);
        let write = io_error(IoError::Write {
            path: PathBuf::from("out.xlsx"),
            message: "denied".into(),
        });
        assert_eq!(write.code, EXIT_OUTPUT_WRITE);
    }

    #[test]
    fn missing_config_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.output.sheet, "Database");
    }

    #[test]
    fn unreadable_config_is_config_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert_eq!(err.code, EXIT_CONFIG_INVALID);
    }
}
