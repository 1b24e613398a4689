use serde::Serialize;

use crate::keys::KeyStats;

// ---------------------------------------------------------------------------
// Sources + provenance
// ---------------------------------------------------------------------------

/// One of the seven spreadsheet extracts a run consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Sales cube export ("price report"), the base table of every join.
    Sales,
    /// Location master (SAP warehouse codes).
    Locations,
    ListPrices,
    SalesOrg,
    /// Customer price conditions (ZCPR).
    Conditions,
    StdCosts,
    SapCosts,
}

impl Source {
    /// Column prefix used when namespacing the final table.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Sales => "PR_",
            Self::Locations => "MDM_",
            Self::ListPrices => "LP_",
            Self::SalesOrg => "SALESORG_",
            Self::Conditions => "ZCPR_",
            Self::StdCosts => "STDCost_",
            Self::SapCosts => "SAPCost_",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sales => write!(f, "sales"),
            Self::Locations => write!(f, "locations"),
            Self::ListPrices => write!(f, "list_prices"),
            Self::SalesOrg => write!(f, "sales_org"),
            Self::Conditions => write!(f, "conditions"),
            Self::StdCosts => write!(f, "std_costs"),
            Self::SapCosts => write!(f, "sap_costs"),
        }
    }
}

/// Where a column came from. Drives the namespacing prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Source(Source),
    /// Join keys and KPIs computed by the engine.
    Calculated,
}

impl Origin {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Source(source) => source.prefix(),
            Self::Calculated => "CALC_",
        }
    }
}

impl From<Source> for Origin {
    fn from(source: Source) -> Self {
        Self::Source(source)
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-fatal conditions surfaced through the run log and the run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A left join returned more rows than its base table.
    JoinCardinality {
        step: String,
        base_key: String,
        dimension_key: String,
        base_rows: usize,
        joined_rows: usize,
        duplicate_keys: Vec<String>,
    },
    /// Key inputs without the `CODE description` shape, used verbatim.
    KeyFormatDegraded {
        rule: String,
        column: String,
        count: usize,
        sample: String,
    },
    /// Infinite numbers replaced by the sentinel at ingestion.
    InfinitySanitized { column: String, count: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JoinCardinality {
                step,
                base_key,
                dimension_key,
                base_rows,
                joined_rows,
                duplicate_keys,
            } => {
                write!(
                    f,
                    "DUPLICATE rows were created when merging with {step}: {base_rows} -> {joined_rows} rows \
                     ('{base_key}' = '{dimension_key}'). Check that '{dimension_key}' contains unique values"
                )?;
                if !duplicate_keys.is_empty() {
                    write!(f, " (e.g. {})", duplicate_keys.join(", "))?;
                }
                Ok(())
            }
            Self::KeyFormatDegraded { rule, column, count, sample } => write!(
                f,
                "key rule '{rule}': {count} value(s) in '{column}' have no leading code, used as-is (e.g. '{sample}')"
            ),
            Self::InfinitySanitized { column, count } => {
                write!(f, "replaced {count} infinite value(s) in '{column}'")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Row accounting for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepStats {
    pub step: String,
    pub rows_in: usize,
    pub rows_out: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepStats>,
    /// One entry per key rule applied, source cleaning first.
    pub keys: Vec<KeyStats>,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    /// Rows that could not take part in a join, summed over all rules.
    pub fn null_keys(&self) -> usize {
        self.keys.iter().map(|k| k.null).sum()
    }

    pub fn cardinality_warnings(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::JoinCardinality { .. }))
            .count()
    }
}
