//! The join-and-enrichment run.
//!
//! A fixed chain of stages over the sales table. Every stage consumes the
//! table produced by the previous one and returns a new one; each dimension
//! table is moved into its join stage and dropped when that join returns.

use crate::config::{DuplicatePolicy, ReconConfig};
use crate::dedup::dedup_first;
use crate::error::ReconError;
use crate::join::{left_join, JoinSpec};
use crate::keys::{self, KeyRule, KeyStats};
use crate::kpi::add_kpis;
use crate::log::RunLog;
use crate::model::{RunReport, StepStats, Warning};
use crate::namespace::namespace;
use crate::table::Table;

/// Cleaned inputs of one run, as produced by the source adapters.
#[derive(Debug)]
pub struct Sources {
    pub sales: Table,
    pub locations: Table,
    pub list_prices: Table,
    pub sales_org: Table,
    pub conditions: Table,
    pub std_costs: Table,
    pub sap_costs: Table,
    /// Warnings raised while cleaning the sources.
    pub warnings: Vec<Warning>,
    /// Key rules applied while cleaning the sources.
    pub key_stats: Vec<KeyStats>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    /// Enriched, namespaced table ready to be written.
    pub table: Table,
    pub report: RunReport,
}

/// Run the full chain: keys, joins, customer filter, KPIs, namespacing.
pub fn run(config: &ReconConfig, sources: Sources, log: &dyn RunLog) -> Result<PipelineOutput, ReconError> {
    let Sources {
        sales,
        locations,
        list_prices,
        sales_org,
        conditions,
        std_costs,
        sap_costs,
        warnings,
        key_stats,
    } = sources;

    let mut run = Run {
        config,
        log,
        report: RunReport {
            keys: key_stats,
            ..RunReport::default()
        },
    };
    for warning in warnings {
        run.warn(warning);
    }

    log.step("Merging DWH sap code to sales data");
    let sales = run.key(sales, &keys::DISTRIBUTION_WAREHOUSE)?;
    let sales = run.join(
        sales,
        locations,
        JoinSpec {
            step: "MDM locations",
            base_key: keys::DISTRIBUTION_WAREHOUSE.output,
            dimension_key: "LocationCode",
        },
    )?;

    log.step("Merging with list prices");
    let sales = run.key(sales, &keys::ITEM)?;
    let sales = run.key(sales, &keys::ITEM_LOCATION)?;
    let sales = run.join(
        sales,
        list_prices,
        JoinSpec {
            step: "list prices",
            base_key: keys::ITEM_LOCATION.output,
            dimension_key: keys::LIST_PRICE.output,
        },
    )?;

    log.step("Merging Sales Org SAP Code");
    let sales = run.key(sales, &keys::LEGAL_ENTITY)?;
    let sales = run.join(
        sales,
        sales_org,
        JoinSpec {
            step: "sales org",
            base_key: keys::LEGAL_ENTITY.output,
            dimension_key: "legalentitycode",
        },
    )?;

    log.step("Removing non valid customers");
    let rows_in = sales.len();
    let sales = filter_customers(sales, config)?;
    run.record("customer filter", rows_in, sales.len());

    log.step("Merging ZCPR conditions");
    let (conditions, removed) = dedup_first(conditions, keys::CONDITIONS.output)?;
    if removed > 0 {
        log.step(&format!("Dropped {removed} duplicate price condition row(s), first occurrence kept"));
    }
    let sales = run.key(sales, &keys::CUSTOMER)?;
    let sales = run.key(sales, &keys::PRICE_CONDITION)?;
    let sales = run.join(
        sales,
        conditions,
        JoinSpec {
            step: "ZCPR conditions",
            base_key: keys::PRICE_CONDITION.output,
            dimension_key: keys::CONDITIONS.output,
        },
    )?;

    log.step("Merging Standard Group Costs");
    let sales = run.join(
        sales,
        std_costs,
        JoinSpec {
            step: "standard costs",
            base_key: keys::ITEM_LOCATION.output,
            dimension_key: keys::STD_COSTS.output,
        },
    )?;

    log.step("Merging SAP Costs");
    let sales = run.join(
        sales,
        sap_costs,
        JoinSpec {
            step: "SAP costs",
            base_key: keys::ITEM_LOCATION.output,
            dimension_key: keys::SAP_COSTS.output,
        },
    )?;

    log.step("Enriching the table with KPIs");
    let sales = add_kpis(sales)?;

    log.step("Renaming columns by source");
    let table = namespace(sales);

    Ok(PipelineOutput {
        table,
        report: run.report,
    })
}

/// Drop placeholder (`-`) and reserved-prefix customers. Null customers stay.
pub fn filter_customers(mut table: Table, config: &ReconConfig) -> Result<Table, ReconError> {
    let filters = &config.filters;
    let idx = table.column_index(&filters.customer_column)?;
    table.retain_rows(|row| match row[idx].as_text() {
        Some(customer) => {
            customer != filters.placeholder_customer
                && !customer.starts_with(filters.reserved_customer_prefix.as_str())
        }
        None => true,
    });
    Ok(table)
}

struct Run<'a> {
    config: &'a ReconConfig,
    log: &'a dyn RunLog,
    report: RunReport,
}

impl Run<'_> {
    fn warn(&mut self, warning: Warning) {
        self.log.warn(&warning);
        self.report.warnings.push(warning);
    }

    fn record(&mut self, step: &str, rows_in: usize, rows_out: usize) {
        self.report.steps.push(StepStats {
            step: step.to_string(),
            rows_in,
            rows_out,
        });
    }

    fn key(&mut self, table: Table, rule: &KeyRule) -> Result<Table, ReconError> {
        let (table, stats) = rule.apply(table)?;
        if let Some(warning) = stats.warning() {
            self.warn(warning);
        }
        self.report.keys.push(stats);
        Ok(table)
    }

    /// Left-join and check cardinality. `dimension` is dropped on return.
    fn join(&mut self, base: Table, dimension: Table, spec: JoinSpec<'_>) -> Result<Table, ReconError> {
        let rows_in = base.len();
        let outcome = left_join(base, &dimension, &spec, self.config.join.duplicate_key_samples)?;
        drop(dimension);

        self.record(spec.step, rows_in, outcome.table.len());
        if let Some(warning) = outcome.warning {
            if self.config.join.on_duplicate == DuplicatePolicy::Fail {
                self.log.warn(&warning);
                return Err(ReconError::DuplicateJoinKeys {
                    step: spec.step.to_string(),
                    dimension_key: spec.dimension_key.to_string(),
                    base_rows: rows_in,
                    joined_rows: outcome.table.len(),
                });
            }
            self.warn(warning);
        }
        Ok(outcome.table)
    }
}
