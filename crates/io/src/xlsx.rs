// Excel I/O: calamine for the source extracts, rust_xlsxwriter for the output

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDateTime;
use clusterprice_recon::config::OutputConfig;
use clusterprice_recon::{Source, Table, Value};
use rust_xlsxwriter::{Format, Workbook};

use crate::{Grid, IoError};

/// Excel's row limit, header row included.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Read one sheet (xlsx, xls, xlsb, ods) into a grid anchored at A1.
///
/// `sheet: None` reads the first sheet.
pub fn read_grid(input: Source, path: &Path, sheet: Option<&str>) -> Result<Grid, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::read(input, path, e))?;

    let sheet_names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => {
            if !sheet_names.iter().any(|s| s == wanted) {
                return Err(IoError::MissingSheet {
                    input,
                    path: path.to_path_buf(),
                    sheet: wanted.to_string(),
                    available: sheet_names,
                });
            }
            wanted.to_string()
        }
        None => sheet_names.into_iter().next().ok_or_else(|| IoError::NoSheets {
            input,
            path: path.to_path_buf(),
        })?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| IoError::read(input, path, format!("sheet '{name}': {e}")))?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Grid = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Value::Null; start_col as usize];
        cells.extend(row.iter().map(cell_value));
        grid.push(cells);
    }
    Ok(grid)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::from(if *b { "TRUE" } else { "FALSE" }),
        // #N/A, #DIV/0! and friends carry no value
        Data::Error(_) => Value::Null,
        // Serial date number, as Excel stores it
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write `table` to `<dir>/<timestamp>_<suffix>.xlsx` and return the path.
pub fn save(table: &Table, dir: &Path, output: &OutputConfig, at: NaiveDateTime) -> Result<PathBuf, IoError> {
    let stamp = at.format(&output.timestamp_format).to_string();
    let path = dir.join(output.file_name(&stamp));
    write_table(table, &path, &output.sheet)?;
    Ok(path)
}

/// One sheet: bold header row, numbers as numbers, nulls left blank.
pub fn write_table(table: &Table, path: &Path, sheet: &str) -> Result<(), IoError> {
    if table.len() + 1 > MAX_ROWS || table.width() > MAX_COLS {
        return Err(IoError::write(
            path,
            format!(
                "{} rows x {} columns exceeds the sheet limit of {MAX_ROWS} x {MAX_COLS}",
                table.len() + 1,
                table.width()
            ),
        ));
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let err = |e: rust_xlsxwriter::XlsxError| IoError::write(path, e);

    let worksheet = workbook.add_worksheet().set_name(sheet).map_err(err)?;

    for (col, column) in table.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, &column.name, &header)
            .map_err(err)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row32 = row_idx as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            let col16 = col as u16;
            match value {
                Value::Null => {}
                Value::Number(n) if n.is_finite() => {
                    worksheet.write_number(row32, col16, *n).map_err(err)?;
                }
                // NaN / infinity have no xlsx representation
                Value::Number(_) => {}
                Value::Text(s) => {
                    worksheet.write_string(row32, col16, s).map_err(err)?;
                }
            }
        }
    }

    if table.width() > 0 {
        worksheet.set_freeze_panes(1, 0).map_err(err)?;
    }

    workbook.save(path).map_err(err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clusterprice_recon::{Column, Origin};

    fn write_fixture(path: &Path, sheets: &[(&str, &[&[Option<&str>]])]) {
        let mut workbook = Workbook::new();
        for (name, rows) in sheets {
            let ws = workbook.add_worksheet().set_name(*name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let Some(cell) = cell else { continue };
                    match cell.parse::<f64>() {
                        Ok(n) => ws.write_number(r as u32, c as u16, n).unwrap(),
                        Err(_) => ws.write_string(r as u32, c as u16, *cell).unwrap(),
                    };
                }
            }
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_read_named_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdm.xlsx");
        write_fixture(
            &path,
            &[
                ("Legal Entities", &[&[Some("x")]]),
                (
                    "SAPLocations",
                    &[
                        &[Some("SAPCode"), Some("LocationCode"), Some("Status")],
                        &[Some("DW1"), Some("BE010"), None],
                    ],
                ),
            ],
        );

        let grid = read_grid(Source::Locations, &path, Some("SAPLocations")).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0][1], Value::from("LocationCode"));
        assert_eq!(grid[1], vec![Value::from("DW1"), Value::from("BE010"), Value::Null]);
    }

    #[test]
    fn test_first_sheet_and_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sap.xlsx");
        write_fixture(
            &path,
            &[(
                "Sheet1",
                &[
                    &[],
                    &[],
                    &[None, Some("Material"), Some("Price")],
                    &[None, Some("4001"), Some("1.234,56")],
                ],
            )],
        );

        let grid = read_grid(Source::SapCosts, &path, None).unwrap();
        assert_eq!(grid.len(), 4);
        assert!(grid[0].is_empty());
        assert_eq!(grid[2], vec![Value::Null, Value::from("Material"), Value::from("Price")]);
        assert_eq!(grid[3][1], Value::Number(4001.0));
    }

    #[test]
    fn test_missing_sheet_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.xlsx");
        write_fixture(&path, &[("Other", &[&[Some("a")]])]);

        let err = read_grid(Source::Sales, &path, Some("Values vs YTD")).unwrap_err();
        assert!(matches!(err, IoError::MissingSheet { ref available, .. } if available == &vec!["Other".to_string()]));
        assert!(err.to_string().contains("sheet 'Values vs YTD' not found"));
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(
            read_grid(Source::ListPrices, &path, None),
            Err(IoError::Read { input: Source::ListPrices, .. })
        ));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::new(
            "enriched",
            vec![
                Column::new("PR_Item", Source::Sales),
                Column::new("CALC_GM_Eur", Origin::Calculated),
            ],
        );
        table.push_row(vec!["1001 WidgetA".into(), 400.0.into()]);
        table.push_row(vec!["1002 WidgetB".into(), Value::Null]);

        let at = NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let path = save(&table, dir.path(), &OutputConfig::default(), at).unwrap();
        assert_eq!(path.file_name().unwrap(), "2026-01-15_09-30_cluster_analysis.xlsx");

        let mut book: Sheets<_> = open_workbook_auto(&path).unwrap();
        assert_eq!(book.sheet_names(), vec!["Database".to_string()]);
        let range = book.worksheet_range("Database").unwrap();
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows[0], vec![Data::String("PR_Item".into()), Data::String("CALC_GM_Eur".into())]);
        assert_eq!(rows[1], vec![Data::String("1001 WidgetA".into()), Data::Float(400.0)]);
        assert_eq!(rows[2][1], Data::Empty);
    }

    #[test]
    fn test_write_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::new("t", vec![Column::new("a", Source::Sales)]);
        let err = write_table(&table, &dir.path().join("no/such/dir/out.xlsx"), "Database").unwrap_err();
        assert!(matches!(err, IoError::Write { .. }));
    }
}
