use crate::table::Table;

/// Prefix every column with the tag of the domain it came from.
/// Values are untouched.
pub fn namespace(mut table: Table) -> Table {
    table.rename_columns(|c| format!("{}{}", c.origin.prefix(), c.name));
    table
}
