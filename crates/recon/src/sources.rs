//! Per-source cleaning rules.
//!
//! Each extract arrives as a raw table (header row already applied). The
//! rules here prune it to the columns the pipeline needs, apply the
//! source's row filters and attach its join key. Required columns are
//! checked up front so a schema error names the offending source.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::keys::{self, normalize_code_column, KeyRule, KeyStats};
use crate::kpi;
use crate::model::{Source, Warning};
use crate::table::{format_number, Table, Value};

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

/// Where the data sits inside a source spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Sheet to read; `None` means the first sheet.
    pub sheet: Option<&'static str>,
    /// Zero-based row holding the column headers.
    pub header_row: usize,
    /// Trailing rows (report totals) to discard.
    pub skip_footer: usize,
}

impl Source {
    pub fn layout(&self) -> Layout {
        match self {
            Self::Sales => Layout {
                sheet: Some("Values vs YTD"),
                header_row: 0,
                skip_footer: 0,
            },
            Self::Locations => Layout {
                sheet: Some("SAPLocations"),
                header_row: 0,
                skip_footer: 0,
            },
            Self::ListPrices | Self::SalesOrg | Self::Conditions | Self::StdCosts => Layout {
                sheet: None,
                header_row: 0,
                skip_footer: 1,
            },
            // SAP list export opens with four banner rows.
            Self::SapCosts => Layout {
                sheet: None,
                header_row: 4,
                skip_footer: 0,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Column sets
// ---------------------------------------------------------------------------

const SALES_DROPPED: &[&str] = &[
    "FCA List Price",
    "List Price currency",
    "Has List Price",
    "Location of Distribution + Item Number",
    "Incoterm Change",
    "Above 50K EUR Customer_Item",
    "Bridge",
    "Bridge EXW",
    "Commercial Hierarchy - Organization Level 6",
    "Commercial Hierarchy - Organization Level 7",
    "Comments",
    "Price Key_Greater 100K EUR",
    "Price Key_excl_Incoterm\ntransactional currency // Customer No. // Tagetik Plant Geography // Item // Incoterm // Ship to",
];

const LOCATION_COLUMNS: &[&str] = &["SAPCode", "LocationCode", "Status"];

const LIST_PRICE_DROPPED: &[&str] = &["Origin Plant", "ItemName", "Product", "Delivery WHS"];

const SALES_ORG_DROPPED: &[&str] = &["Legal Entity Code Name", "CONDITIONTYPE", "_RecordCount"];

const CONDITIONS_DROPPED: &[&str] = &[
    "Sold-To Country",
    "Delivery Warehouse Name",
    "Product List Price",
    "List Price Currency",
    "List Price EUR/TO",
    "List Price Valid From",
    "List Price Valid To",
    "List Price Status",
    "Legal Entity",
    "Customer Sales Manager",
    "Price Validity",
    "Created On",
    "Created By",
    "Last Modified On",
    "Last Modified By",
];

const STD_COSTS_DROPPED: &[&str] = &["Profit Center"];

const SAP_COST_COLUMNS: &[&str] = &["Material", "Plnt", "BUn", "Price", "Crcy"];

/// Placeholder SAP prints in empty unit/currency cells.
const SAP_BLANK: &str = "...";

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// A cleaned source plus anything worth telling the operator about it.
#[derive(Debug, Default)]
pub struct Cleaned {
    pub table: Table,
    pub warnings: Vec<Warning>,
    /// Counters of the key rule applied to this source, if any.
    pub key_stats: Option<KeyStats>,
}

pub fn clean(source: Source, raw: Table, config: &ReconConfig) -> Result<Cleaned, ReconError> {
    let mut out = Cleaned::default();
    let table = match source {
        Source::Sales => clean_sales(raw, config, &mut out.warnings)?,
        Source::Locations => raw.select_columns(LOCATION_COLUMNS)?,
        Source::ListPrices => clean_list_prices(raw, &mut out)?,
        Source::SalesOrg => clean_sales_org(raw, config)?,
        Source::Conditions => clean_conditions(raw, &mut out)?,
        Source::StdCosts => clean_std_costs(raw, &mut out)?,
        Source::SapCosts => clean_sap_costs(raw, config, &mut out)?,
    };
    out.table = table;
    Ok(out)
}

fn with_key(table: Table, rule: &KeyRule, out: &mut Cleaned) -> Result<Table, ReconError> {
    let (table, stats) = rule.apply(table)?;
    out.warnings.extend(stats.warning());
    out.key_stats = Some(stats);
    Ok(table)
}

fn text_eq(value: &Value, expected: &str) -> bool {
    value.as_text().is_some_and(|s| s == expected)
}

// ---------------------------------------------------------------------------
// Sales
// ---------------------------------------------------------------------------

fn clean_sales(mut raw: Table, config: &ReconConfig, warnings: &mut Vec<Warning>) -> Result<Table, ReconError> {
    let filters = &config.filters;
    raw.require_columns(&[
        filters.joint_venture_column.as_str(),
        filters.customer_column.as_str(),
        "Location Of Distribution",
        "Item",
        "Tagetik Legal Entity",
        kpi::REVENUE,
        kpi::VOLUME,
    ])?;
    raw.drop_columns(SALES_DROPPED);

    // Join inputs stay as written; every other column is a measure.
    let text_columns = [
        filters.joint_venture_column.as_str(),
        filters.customer_column.as_str(),
        "Location Of Distribution",
        "Item",
        "Tagetik Legal Entity",
    ];
    let measures: Vec<String> = raw
        .column_names()
        .filter(|name| !text_columns.contains(name))
        .map(str::to_string)
        .collect();
    for column in &measures {
        number_column(&mut raw, column)?;
    }

    warnings.extend(sanitize_infinite(&mut raw, config.sanitize.infinity_sentinel));

    let jv = raw.column_index(&filters.joint_venture_column)?;
    raw.retain_rows(|row| !text_eq(&row[jv], &filters.joint_venture_flag));
    Ok(raw)
}

/// Replace every infinite number with `sentinel`, one warning per column hit.
pub fn sanitize_infinite(table: &mut Table, sentinel: f64) -> Vec<Warning> {
    let mut hits: BTreeMap<usize, usize> = BTreeMap::new();
    for row in table.rows_mut() {
        for (idx, value) in row.iter_mut().enumerate() {
            if matches!(value, Value::Number(n) if n.is_infinite()) {
                *value = Value::Number(sentinel);
                *hits.entry(idx).or_default() += 1;
            }
        }
    }

    hits.into_iter()
        .map(|(idx, count)| Warning::InfinitySanitized {
            column: table.columns()[idx].name.clone(),
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Numeric text becomes a number; `NaN` reads as null. Text sources (CSV)
/// arrive untyped, so only measure columns go through here.
fn number_column(table: &mut Table, column: &str) -> Result<(), ReconError> {
    table.map_column(column, |value| match value {
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_nan() => Value::Null,
            Ok(n) => Value::Number(n),
            Err(_) => value.clone(),
        },
        other => other.clone(),
    })
}

/// Numeric-looking cells become numbers so they key without decimals.
fn integer_column(table: &mut Table, column: &str) -> Result<(), ReconError> {
    table.map_column(column, |value| match value.as_f64() {
        Some(n) if n.fract() == 0.0 => Value::Number(n),
        _ => value.clone(),
    })
}

/// Render a code column as text, whole numbers without decimals.
fn code_text_column(table: &mut Table, column: &str) -> Result<(), ReconError> {
    table.map_column(column, |value| match value {
        Value::Number(n) => Value::Text(format_number(*n)),
        other => other.clone(),
    })
}

fn clean_list_prices(mut raw: Table, out: &mut Cleaned) -> Result<Table, ReconError> {
    raw.require_columns(&["ItemNumber", "Del.WHS CODE", kpi::LIST_PRICE])?;
    raw.drop_columns(LIST_PRICE_DROPPED);
    number_column(&mut raw, kpi::LIST_PRICE)?;
    integer_column(&mut raw, "ItemNumber")?;
    with_key(raw, &keys::LIST_PRICE, out)
}

fn clean_sales_org(mut raw: Table, config: &ReconConfig) -> Result<Table, ReconError> {
    raw.require_columns(&["legalentitycode", "salesorganization"])?;
    let entity = raw.column_index("legalentitycode")?;
    let org = raw.column_index("salesorganization")?;
    let excluded = &config.filters.excluded_sales_orgs;

    raw.retain_rows(|row| {
        !row[entity].is_null() && !row[org].as_text().is_some_and(|o| excluded.iter().any(|e| e == o))
    });
    integer_column(&mut raw, "legalentitycode")?;
    code_text_column(&mut raw, "legalentitycode")?;
    raw.drop_columns(SALES_ORG_DROPPED);
    Ok(raw)
}

fn clean_conditions(mut raw: Table, out: &mut Cleaned) -> Result<Table, ReconError> {
    raw.require_columns(&["Sales Org", "Sold-To", "Item", "Delivery Warehouse", kpi::CUSTOMER_PRICE])?;
    raw.drop_columns(CONDITIONS_DROPPED);
    number_column(&mut raw, kpi::CUSTOMER_PRICE)?;
    // Key first: it reads the raw "CODE description" values.
    let mut table = with_key(raw, &keys::CONDITIONS, out)?;
    normalize_code_column(&mut table, "Sold-To")?;
    normalize_code_column(&mut table, "Item")?;
    Ok(table)
}

fn clean_std_costs(mut raw: Table, out: &mut Cleaned) -> Result<Table, ReconError> {
    raw.require_columns(&[
        "Item Number Name",
        "Plant Code",
        kpi::DEPRECIATED_UNIT_COST,
        kpi::VARIABLE_UNIT_COST,
    ])?;
    raw.drop_columns(STD_COSTS_DROPPED);
    number_column(&mut raw, kpi::DEPRECIATED_UNIT_COST)?;
    number_column(&mut raw, kpi::VARIABLE_UNIT_COST)?;
    let mut table = with_key(raw, &keys::STD_COSTS, out)?;
    normalize_code_column(&mut table, "Item Number Name")?;
    Ok(table)
}

fn clean_sap_costs(mut raw: Table, config: &ReconConfig, out: &mut Cleaned) -> Result<Table, ReconError> {
    raw.rename_columns(|c| c.name.trim().to_string());
    let mut table = raw.select_columns(SAP_COST_COLUMNS)?;

    table.map_column("Price", |value| match value {
        Value::Text(s) => Value::from(parse_european_number(s)),
        other => other.clone(),
    })?;
    for column in ["BUn", "Crcy", "Plnt"] {
        table.map_column(column, trim_sap_text)?;
    }

    integer_column(&mut table, "Material")?;
    code_text_column(&mut table, "Material")?;

    let material = table.column_index("Material")?;
    let prefixes = &config.filters.excluded_material_prefixes;
    table.retain_rows(|row| match row[material].as_text() {
        Some(m) => m != "0" && !prefixes.iter().any(|p| m.starts_with(p.as_str())),
        None => true,
    });

    with_key(table, &keys::SAP_COSTS, out)
}

fn trim_sap_text(value: &Value) -> Value {
    match value {
        Value::Text(s) => match s.trim() {
            "" | SAP_BLANK => Value::Null,
            t => Value::Text(t.to_string()),
        },
        other => other.clone(),
    }
}

/// Parse SAP's `1.234,56`-style amounts: drop thousands dots, swap the
/// decimal comma, take the first unsigned number.
pub fn parse_european_number(raw: &str) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"(\d+\.?\d*)").expect("static pattern"));

    let normalized = raw.replace('.', "").replace(',', ".");
    re.captures(&normalized)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(source: Source, headers: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::from_rows(
            source.to_string(),
            source,
            headers.iter().map(|h| h.to_string()).collect(),
            rows,
        )
    }

    const SALES_HEADERS: &[&str] = &[
        "JV",
        "Country Hierarchy - Customer",
        "Location Of Distribution",
        "Item",
        "Tagetik Legal Entity",
        "Revenue EXW Pres Curr",
        "Volume Ton CY YTD",
        "EXW Last Price Pres LY",
        "Comments",
    ];

    fn sales_row(jv: &str, last_price: f64) -> Vec<Value> {
        vec![
            jv.into(),
            "C1 Acme".into(),
            "BE010 Antwerp".into(),
            "1001 Widget".into(),
            "100 Sibelco BE".into(),
            100.0.into(),
            10.0.into(),
            last_price.into(),
            "note".into(),
        ]
    }

    #[test]
    fn sales_excludes_joint_ventures_and_drops_columns() {
        let t = raw(Source::Sales, SALES_HEADERS, vec![sales_row("NO", 1.0), sales_row("YES", 1.0)]);
        let cleaned = clean(Source::Sales, t, &ReconConfig::default()).unwrap();
        assert_eq!(cleaned.table.len(), 1);
        assert!(cleaned.table.find_column("Comments").is_none());
        assert!(cleaned.warnings.is_empty());
    }

    #[test]
    fn sales_infinity_replaced_with_sentinel() {
        let t = raw(
            Source::Sales,
            SALES_HEADERS,
            vec![sales_row("NO", f64::INFINITY), sales_row("NO", f64::NEG_INFINITY)],
        );
        let cleaned = clean(Source::Sales, t, &ReconConfig::default()).unwrap();
        assert_eq!(cleaned.table.get(0, "EXW Last Price Pres LY"), Some(&Value::Number(999_999_999.0)));
        assert_eq!(cleaned.table.get(1, "EXW Last Price Pres LY"), Some(&Value::Number(999_999_999.0)));
        assert_eq!(
            cleaned.warnings,
            vec![Warning::InfinitySanitized {
                column: "EXW Last Price Pres LY".into(),
                count: 2
            }]
        );
    }

    #[test]
    fn sales_missing_column_names_source() {
        let t = raw(Source::Sales, &["JV"], vec![]);
        let err = clean(Source::Sales, t, &ReconConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "sales: missing column 'Country Hierarchy - Customer'");
    }

    #[test]
    fn locations_keep_three_columns() {
        let t = raw(
            Source::Locations,
            &["Name", "SAPCode", "LocationCode", "Status"],
            vec![vec!["Antwerp".into(), "DW1".into(), "BE010".into(), "Active".into()]],
        );
        let cleaned = clean(Source::Locations, t, &ReconConfig::default()).unwrap();
        assert_eq!(
            cleaned.table.column_names().collect::<Vec<_>>(),
            vec!["SAPCode", "LocationCode", "Status"]
        );
    }

    #[test]
    fn list_price_key_uses_integer_item() {
        let t = raw(
            Source::ListPrices,
            &["ItemNumber", "Del.WHS CODE", "List Price EUR", "ItemName"],
            vec![vec![1001.0.into(), "DW1".into(), 12.0.into(), "Widget".into()]],
        );
        let cleaned = clean(Source::ListPrices, t, &ReconConfig::default()).unwrap();
        assert_eq!(cleaned.table.get(0, "LP-item-dwh-key"), Some(&Value::from("1001|DW1")));
        assert!(cleaned.table.find_column("ItemName").is_none());
    }

    #[test]
    fn sales_org_filters_and_renders_codes() {
        let t = raw(
            Source::SalesOrg,
            &["legalentitycode", "salesorganization", "_RecordCount"],
            vec![
                vec![100.0.into(), "BE01".into(), 1.0.into()],
                vec![Value::Null, "BE02".into(), 1.0.into()],
                vec![200.0.into(), "IT02".into(), 1.0.into()],
            ],
        );
        let cleaned = clean(Source::SalesOrg, t, &ReconConfig::default()).unwrap();
        assert_eq!(cleaned.table.len(), 1);
        assert_eq!(cleaned.table.get(0, "legalentitycode"), Some(&Value::from("100")));
        assert!(cleaned.table.find_column("_RecordCount").is_none());
    }

    #[test]
    fn conditions_key_and_normalized_codes() {
        let t = raw(
            Source::Conditions,
            &["Sales Org", "Sold-To", "Item", "Delivery Warehouse", "Customer Price EUR/TO", "Created By"],
            vec![vec![
                "BE01".into(),
                "C1 Acme".into(),
                "1001 Widget".into(),
                "DW1".into(),
                11.0.into(),
                "someone".into(),
            ]],
        );
        let cleaned = clean(Source::Conditions, t, &ReconConfig::default()).unwrap();
        let t = &cleaned.table;
        assert_eq!(t.get(0, "conditions-key"), Some(&Value::from("BE01|C1|1001|DW1")));
        assert_eq!(t.get(0, "Sold-To"), Some(&Value::from("C1")));
        assert_eq!(t.get(0, "Item"), Some(&Value::from("1001")));
        assert!(t.find_column("Created By").is_none());
        assert!(cleaned.warnings.is_empty());
    }

    #[test]
    fn std_costs_key() {
        let t = raw(
            Source::StdCosts,
            &["Item Number Name", "Plant Code", "COGS(depr) Total / Mt", "Variable Cost / Mt", "Profit Center"],
            vec![vec!["1001 Widget".into(), "DW1".into(), 4.0.into(), 3.0.into(), "PC1".into()]],
        );
        let cleaned = clean(Source::StdCosts, t, &ReconConfig::default()).unwrap();
        assert_eq!(cleaned.table.get(0, "stdcosts-key"), Some(&Value::from("1001|DW1")));
        assert_eq!(cleaned.table.get(0, "Item Number Name"), Some(&Value::from("1001")));
    }

    #[test]
    fn sap_costs_cleaning() {
        let t = raw(
            Source::SapCosts,
            &[" Material ", "Plnt", "BUn", "Price", "Crcy", "Extra"],
            vec![
                vec![4001.0.into(), " DW1 ".into(), " TO ".into(), "1.234,56".into(), "EUR".into(), "x".into()],
                vec!["0".into(), "DW1".into(), "TO".into(), "1,00".into(), "EUR".into(), "x".into()],
                vec![1001.0.into(), "DW1".into(), "TO".into(), "1,00".into(), "EUR".into(), "x".into()],
                vec![6001.0.into(), "DW2".into(), "...".into(), "7,5".into(), "...".into(), "x".into()],
            ],
        );
        let cleaned = clean(Source::SapCosts, t, &ReconConfig::default()).unwrap();
        let t = &cleaned.table;
        assert_eq!(t.len(), 2);
        assert_eq!(t.column_names().collect::<Vec<_>>(), vec!["Material", "Plnt", "BUn", "Price", "Crcy", "sapcosts-key"]);
        assert_eq!(t.get(0, "Price"), Some(&Value::Number(1234.56)));
        assert_eq!(t.get(0, "Plnt"), Some(&Value::from("DW1")));
        assert_eq!(t.get(0, "sapcosts-key"), Some(&Value::from("4001|DW1")));
        assert_eq!(t.get(1, "BUn"), Some(&Value::Null));
        assert_eq!(t.get(1, "Price"), Some(&Value::Number(7.5)));
    }

    #[test]
    fn text_measures_become_numbers_and_codes_stay_text() {
        let row = |revenue: &str| -> Vec<Value> {
            vec![
                "NO".into(),
                "C1 Acme".into(),
                "00123 Antwerp".into(),
                "1001".into(),
                "0100".into(),
                revenue.into(),
                "10".into(),
                "NaN".into(),
                "note".into(),
            ]
        };
        let t = raw(Source::Sales, SALES_HEADERS, vec![row("100.5"), row("inf")]);
        let cleaned = clean(Source::Sales, t, &ReconConfig::default()).unwrap();
        let t = &cleaned.table;
        assert_eq!(t.get(0, "Revenue EXW Pres Curr"), Some(&Value::Number(100.5)));
        assert_eq!(t.get(1, "Revenue EXW Pres Curr"), Some(&Value::Number(999_999_999.0)));
        assert_eq!(t.get(0, "Volume Ton CY YTD"), Some(&Value::Number(10.0)));
        assert_eq!(t.get(0, "EXW Last Price Pres LY"), Some(&Value::Null));
        assert_eq!(t.get(0, "Location Of Distribution"), Some(&Value::from("00123 Antwerp")));
        assert_eq!(t.get(0, "Item"), Some(&Value::from("1001")));
        assert_eq!(t.get(0, "Tagetik Legal Entity"), Some(&Value::from("0100")));
        assert_eq!(cleaned.warnings.len(), 1);
    }

    #[test]
    fn text_prices_and_costs_become_numbers() {
        let lp = raw(
            Source::ListPrices,
            &["ItemNumber", "Del.WHS CODE", "List Price EUR"],
            vec![vec!["1001".into(), "0100".into(), "12.5".into()]],
        );
        let cleaned = clean(Source::ListPrices, lp, &ReconConfig::default()).unwrap();
        assert_eq!(cleaned.table.get(0, "List Price EUR"), Some(&Value::Number(12.5)));
        assert_eq!(cleaned.table.get(0, "LP-item-dwh-key"), Some(&Value::from("1001|0100")));

        let std = raw(
            Source::StdCosts,
            &["Item Number Name", "Plant Code", "COGS(depr) Total / Mt", "Variable Cost / Mt"],
            vec![vec!["1001 Widget".into(), "0100".into(), "4".into(), "3".into()]],
        );
        let cleaned = clean(Source::StdCosts, std, &ReconConfig::default()).unwrap();
        assert_eq!(cleaned.table.get(0, "COGS(depr) Total / Mt"), Some(&Value::Number(4.0)));
        assert_eq!(cleaned.table.get(0, "stdcosts-key"), Some(&Value::from("1001|0100")));
    }

    #[test]
    fn sap_thousands_without_decimals() {
        let t = raw(
            Source::SapCosts,
            &["Material", "Plnt", "BUn", "Price", "Crcy"],
            vec![vec!["4001".into(), "0100".into(), "TO".into(), "1.234".into(), "EUR".into()]],
        );
        let cleaned = clean(Source::SapCosts, t, &ReconConfig::default()).unwrap();
        assert_eq!(cleaned.table.get(0, "Price"), Some(&Value::Number(1234.0)));
        assert_eq!(cleaned.table.get(0, "sapcosts-key"), Some(&Value::from("4001|0100")));
    }

    #[test]
    fn european_numbers() {
        assert_eq!(parse_european_number("1.234"), Some(1234.0));
        assert_eq!(parse_european_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_european_number("12,5 EUR"), Some(12.5));
        assert_eq!(parse_european_number("n/a"), None);
    }

    #[test]
    fn layouts() {
        assert_eq!(Source::Sales.layout().sheet, Some("Values vs YTD"));
        assert_eq!(Source::SapCosts.layout().header_row, 4);
        assert_eq!(Source::Conditions.layout().skip_footer, 1);
    }
}
