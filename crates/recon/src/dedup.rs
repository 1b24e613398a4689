use std::collections::HashSet;

use crate::error::ReconError;
use crate::table::Table;

/// Collapse `table` to one row per `key`, keeping the first occurrence.
///
/// Price conditions carry several historical rows per key with no usable
/// ranking, so first-in-file wins. Null keys count as a single key.
/// Returns the table and the number of rows removed.
pub fn dedup_first(mut table: Table, key: &str) -> Result<(Table, usize), ReconError> {
    let idx = table.column_index(key)?;
    let before = table.len();

    let mut seen: HashSet<Option<String>> = HashSet::with_capacity(before);
    table.retain_rows(|row| seen.insert(row[idx].key_text().map(|k| k.into_owned())));

    let removed = before - table.len();
    Ok((table, removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use crate::table::Value;

    fn conditions() -> Table {
        Table::from_rows(
            "conditions",
            Source::Conditions,
            vec!["conditions-key".into(), "Customer Price EUR/TO".into()],
            vec![
                vec!["a".into(), 10.0.into()],
                vec!["b".into(), 20.0.into()],
                vec!["a".into(), 11.0.into()],
                vec![Value::Null, 1.0.into()],
                vec![Value::Null, 2.0.into()],
            ],
        )
    }

    #[test]
    fn first_occurrence_wins() {
        let (t, removed) = dedup_first(conditions(), "conditions-key").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(0, "Customer Price EUR/TO"), Some(&Value::Number(10.0)));
        assert_eq!(t.get(1, "conditions-key"), Some(&Value::from("b")));
        assert_eq!(t.get(2, "Customer Price EUR/TO"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn second_pass_changes_nothing() {
        let (once, _) = dedup_first(conditions(), "conditions-key").unwrap();
        let (twice, removed) = dedup_first(once.clone(), "conditions-key").unwrap();
        assert_eq!(removed, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_key_column() {
        assert!(dedup_first(conditions(), "nope").is_err());
    }
}
