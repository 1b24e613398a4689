use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every field has a default, so an empty document
/// (or no file at all) gives the standard pricing run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub sanitize: SanitizeConfig,
    #[serde(default)]
    pub join: JoinConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Sales rows whose `joint_venture_column` equals this flag are dropped.
    pub joint_venture_column: String,
    pub joint_venture_flag: String,
    pub customer_column: String,
    /// Customer hierarchy value meaning "no customer".
    pub placeholder_customer: String,
    /// Internal/financial customer family.
    pub reserved_customer_prefix: String,
    pub excluded_sales_orgs: Vec<String>,
    pub excluded_material_prefixes: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            joint_venture_column: "JV".into(),
            joint_venture_flag: "YES".into(),
            customer_column: "Country Hierarchy - Customer".into(),
            placeholder_customer: "-".into(),
            reserved_customer_prefix: "SLM_".into(),
            excluded_sales_orgs: vec!["IT02".into()],
            excluded_material_prefixes: ["1", "8", "5", "2", "3"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sanitize
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SanitizeConfig {
    /// Replacement for infinite numbers in the sales extract.
    pub infinity_sentinel: f64,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            infinity_sentinel: 999_999_999.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Log the fan-out and keep the expanded table.
    #[default]
    Warn,
    /// Abort the run.
    Fail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    pub on_duplicate: DuplicatePolicy,
    /// How many duplicated keys a cardinality warning quotes.
    pub duplicate_key_samples: usize,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            on_duplicate: DuplicatePolicy::default(),
            duplicate_key_samples: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub sheet: String,
    pub file_suffix: String,
    /// chrono format string for the file name prefix.
    pub timestamp_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sheet: "Database".into(),
            file_suffix: "cluster_analysis".into(),
            timestamp_format: "%Y-%m-%d_%H-%M".into(),
        }
    }
}

impl OutputConfig {
    /// `<timestamp>_<suffix>.xlsx`
    pub fn file_name(&self, timestamp: &str) -> String {
        format!("{timestamp}_{}.xlsx", self.file_suffix)
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

/// Excel's sheet name limit.
const MAX_SHEET_NAME: usize = 31;

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.sanitize.infinity_sentinel.is_finite() {
            return Err(ReconError::ConfigValidation(
                "sanitize.infinity_sentinel must be finite".into(),
            ));
        }

        let sheet = &self.output.sheet;
        if sheet.is_empty() || sheet.chars().count() > MAX_SHEET_NAME {
            return Err(ReconError::ConfigValidation(format!(
                "output.sheet must be 1-{MAX_SHEET_NAME} characters, got '{sheet}'"
            )));
        }

        if self.output.file_suffix.is_empty() {
            return Err(ReconError::ConfigValidation(
                "output.file_suffix must not be empty".into(),
            ));
        }

        if self.filters.excluded_material_prefixes.iter().any(|p| p.is_empty()) {
            return Err(ReconError::ConfigValidation(
                "filters.excluded_material_prefixes must not contain empty prefixes".into(),
            ));
        }

        if self.filters.reserved_customer_prefix.is_empty() {
            return Err(ReconError::ConfigValidation(
                "filters.reserved_customer_prefix must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
