//! Left join with row-count verification.

use std::collections::{BTreeSet, HashMap};

use crate::error::ReconError;
use crate::model::Warning;
use crate::table::{Column, Table, Value};

/// Which columns a join step aligns, and how to name it in diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct JoinSpec<'a> {
    pub step: &'a str,
    pub base_key: &'a str,
    pub dimension_key: &'a str,
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub table: Table,
    /// Set when the dimension key was not unique and rows fanned out.
    pub warning: Option<Warning>,
}

/// Left-join `dimension` onto `base`.
///
/// Every base row survives. A base row with no match gets nulls for the
/// dimension columns; a base row matching several dimension rows is
/// repeated once per match, in dimension order. Null keys never match.
///
/// Column names present on both sides are suffixed `_x` (base) and `_y`
/// (dimension).
pub fn left_join(
    base: Table,
    dimension: &Table,
    spec: &JoinSpec<'_>,
    max_samples: usize,
) -> Result<JoinOutcome, ReconError> {
    let base_idx = base.column_index(spec.base_key)?;
    let dim_idx = dimension.column_index(spec.dimension_key)?;

    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in dimension.rows().iter().enumerate() {
        if let Some(key) = row[dim_idx].key_text() {
            index.entry(key.into_owned()).or_default().push(i);
        }
    }

    let base_rows = base.len();
    let (name, mut columns, rows) = base.into_parts();
    suffix_collisions(&mut columns, dimension.columns());

    let dim_width = dimension.width();
    let mut fanned_out: BTreeSet<&str> = BTreeSet::new();
    let mut joined: Vec<Vec<Value>> = Vec::with_capacity(rows.len());

    for mut row in rows {
        let matches = row[base_idx]
            .key_text()
            .and_then(|key| index.get_key_value(key.as_ref()))
            .and_then(|(key, hits)| hits.split_last().map(|(last, rest)| (key, last, rest)));

        match matches {
            None => {
                row.extend(std::iter::repeat(Value::Null).take(dim_width));
                joined.push(row);
            }
            Some((key, last, rest)) => {
                if !rest.is_empty() {
                    fanned_out.insert(key.as_str());
                }
                for &hit in rest {
                    let mut out = row.clone();
                    out.extend(dimension.rows()[hit].iter().cloned());
                    joined.push(out);
                }
                row.extend(dimension.rows()[*last].iter().cloned());
                joined.push(row);
            }
        }
    }

    let warning = (joined.len() != base_rows).then(|| Warning::JoinCardinality {
        step: spec.step.to_string(),
        base_key: spec.base_key.to_string(),
        dimension_key: spec.dimension_key.to_string(),
        base_rows,
        joined_rows: joined.len(),
        duplicate_keys: fanned_out.iter().take(max_samples).map(|k| k.to_string()).collect(),
    });

    Ok(JoinOutcome {
        table: Table::from_parts(name, columns, joined),
        warning,
    })
}

/// Rename base columns that collide with a dimension column, then append
/// the dimension columns with the matching suffix.
fn suffix_collisions(columns: &mut Vec<Column>, dimension: &[Column]) {
    for dim in dimension {
        let clash = columns.iter().position(|c| c.name == dim.name);
        match clash {
            Some(i) => {
                columns[i].name = format!("{}_x", dim.name);
                columns.push(Column::new(format!("{}_y", dim.name), dim.origin));
            }
            None => columns.push(dim.clone()),
        }
    }
}
