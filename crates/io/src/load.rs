//! Source loading: file → raw table → cleaned table.
//!
//! The sheet, header row and footer length of each extract come from
//! [`Source::layout`]. `.csv` files ignore the sheet; everything else is
//! opened with calamine.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread::ScopedJoinHandle;

use clusterprice_recon::keys::KeyStats;
use clusterprice_recon::sources::{clean, Cleaned, Layout};
use clusterprice_recon::table::format_number;
use clusterprice_recon::{ReconConfig, Source, Sources, Table, Value, Warning};
use tracing::debug;

use crate::{csv, xlsx, Grid, IoError};

/// One path per extract.
#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub sales: PathBuf,
    pub locations: PathBuf,
    pub list_prices: PathBuf,
    pub sales_org: PathBuf,
    pub conditions: PathBuf,
    pub std_costs: PathBuf,
    pub sap_costs: PathBuf,
}

impl SourcePaths {
    pub fn get(&self, source: Source) -> &Path {
        match source {
            Source::Sales => &self.sales,
            Source::Locations => &self.locations,
            Source::ListPrices => &self.list_prices,
            Source::SalesOrg => &self.sales_org,
            Source::Conditions => &self.conditions,
            Source::StdCosts => &self.std_costs,
            Source::SapCosts => &self.sap_costs,
        }
    }
}

/// Read and clean one extract.
pub fn load_source(source: Source, path: &Path, config: &ReconConfig) -> Result<Cleaned, IoError> {
    let raw = read_table(source, path)?;
    debug!(
        source = %source,
        path = %path.display(),
        rows = raw.len(),
        columns = raw.width(),
        "read source"
    );

    let cleaned = clean(source, raw, config)?;
    debug!(
        source = %source,
        rows = cleaned.table.len(),
        columns = cleaned.table.width(),
        "cleaned source"
    );
    Ok(cleaned)
}

/// Load all seven extracts, one thread each. The first failure (in
/// source order) is returned.
pub fn load_all(paths: &SourcePaths, config: &ReconConfig) -> Result<Sources, IoError> {
    std::thread::scope(|scope| {
        let spawn = |source: Source| {
            let path = paths.get(source);
            scope.spawn(move || load_source(source, path, config))
        };

        let sales = spawn(Source::Sales);
        let locations = spawn(Source::Locations);
        let list_prices = spawn(Source::ListPrices);
        let sales_org = spawn(Source::SalesOrg);
        let conditions = spawn(Source::Conditions);
        let std_costs = spawn(Source::StdCosts);
        let sap_costs = spawn(Source::SapCosts);

        let mut warnings = Vec::new();
        let mut key_stats = Vec::new();
        let mut collect = |handle| finish(handle, &mut warnings, &mut key_stats);
        let sales = collect(sales)?;
        let locations = collect(locations)?;
        let list_prices = collect(list_prices)?;
        let sales_org = collect(sales_org)?;
        let conditions = collect(conditions)?;
        let std_costs = collect(std_costs)?;
        let sap_costs = collect(sap_costs)?;

        Ok(Sources {
            sales,
            locations,
            list_prices,
            sales_org,
            conditions,
            std_costs,
            sap_costs,
            warnings,
            key_stats,
        })
    })
}

fn finish(
    handle: ScopedJoinHandle<'_, Result<Cleaned, IoError>>,
    warnings: &mut Vec<Warning>,
    key_stats: &mut Vec<KeyStats>,
) -> Result<Table, IoError> {
    let cleaned = handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
    warnings.extend(cleaned.warnings);
    key_stats.extend(cleaned.key_stats);
    Ok(cleaned.table)
}

/// Read an extract into a raw table, applying its layout.
pub fn read_table(source: Source, path: &Path) -> Result<Table, IoError> {
    let layout = source.layout();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let grid = if is_csv {
        csv::read_grid(source, path, layout.header_row)?
    } else {
        xlsx::read_grid(source, path, layout.sheet)?
    };
    grid_to_table(source, grid, &layout)
}

/// Split a grid into headers and data rows.
///
/// Rows above the header row are discarded, `skip_footer` trailing rows
/// are cut, and rows with no value at all are dropped.
pub fn grid_to_table(source: Source, mut grid: Grid, layout: &Layout) -> Result<Table, IoError> {
    if layout.header_row >= grid.len() {
        return Err(IoError::HeaderRow {
            input: source,
            header_row: layout.header_row,
            rows: grid.len(),
        });
    }

    let mut body = grid.split_off(layout.header_row + 1);
    let header = grid.pop().unwrap_or_default();
    body.truncate(body.len().saturating_sub(layout.skip_footer));
    body.retain(|row| row.iter().any(|v| !v.is_null()));

    let width = body.iter().map(Vec::len).max().unwrap_or(0).max(header.len());
    let headers = header_names(&header, width);

    Ok(Table::from_rows(source.to_string(), source, headers, body))
}

/// Header text per column. Blank headers get `Unnamed: <i>`; repeated
/// names get the first free `.1`, `.2`… suffix.
fn header_names(header: &[Value], width: usize) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    (0..width)
        .map(|i| {
            let base = match header.get(i) {
                Some(Value::Text(s)) => s.clone(),
                Some(Value::Number(n)) => format_number(*n),
                Some(Value::Null) | None => format!("Unnamed: {i}"),
            };
            let mut name = base.clone();
            if used.contains(&name) {
                let suffix = next_suffix.entry(base.clone()).or_insert(1);
                while used.contains(&name) {
                    name = format!("{base}.{suffix}");
                    *suffix += 1;
                }
            }
            used.insert(name.clone());
            name
        })
        .collect()
}
