use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad sentinel, empty sheet name, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A table does not carry a column the pipeline needs.
    #[error("{table}: missing column '{column}'")]
    MissingColumn { table: String, column: String },
    /// A dimension join fanned out rows and the config asks to fail on it.
    #[error(
        "join '{step}' produced {joined_rows} rows from {base_rows} (key '{dimension_key}' is not unique)"
    )]
    DuplicateJoinKeys {
        step: String,
        dimension_key: String,
        base_rows: usize,
        joined_rows: usize,
    },
}

impl ReconError {
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}
