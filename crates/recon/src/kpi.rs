//! Margin and list-price KPIs over the fully joined table.
//!
//! All arithmetic is `Option<f64>`: a null or non-numeric input (typically an
//! unmatched join) yields a null KPI, never zero.

use crate::error::ReconError;
use crate::model::Origin;
use crate::table::{Column, Table, Value};

pub const REVENUE: &str = "Revenue EXW Pres Curr";
pub const VOLUME: &str = "Volume Ton CY YTD";
pub const DEPRECIATED_UNIT_COST: &str = "COGS(depr) Total / Mt";
pub const VARIABLE_UNIT_COST: &str = "Variable Cost / Mt";
pub const LIST_PRICE: &str = "List Price EUR";
pub const CUSTOMER_PRICE: &str = "Customer Price EUR/TO";

pub const GROSS_MARGIN: &str = "GM_Eur";
pub const CONTRIBUTION_MARGIN: &str = "CM_Eur";
pub const LIST_PRICE_DEVIATION: &str = "Deviation_LP_Eur";
pub const LIST_PRICE_REVENUE: &str = "Revenues_with_LP";

pub fn gross_margin(revenue: Option<f64>, depreciated_unit_cost: Option<f64>, volume: Option<f64>) -> Option<f64> {
    Some(revenue? - depreciated_unit_cost? * volume?)
}

pub fn contribution_margin(revenue: Option<f64>, variable_unit_cost: Option<f64>, volume: Option<f64>) -> Option<f64> {
    Some(revenue? - variable_unit_cost? * volume?)
}

pub fn list_price_deviation(list_price: Option<f64>, customer_price: Option<f64>, volume: Option<f64>) -> Option<f64> {
    Some((list_price? - customer_price?) * volume?)
}

pub fn list_price_revenue(list_price: Option<f64>, volume: Option<f64>) -> Option<f64> {
    Some(list_price? * volume?)
}

/// Append the four KPI columns.
pub fn add_kpis(mut table: Table) -> Result<Table, ReconError> {
    let revenue = table.column_index(REVENUE)?;
    let volume = table.column_index(VOLUME)?;
    let depreciated = table.column_index(DEPRECIATED_UNIT_COST)?;
    let variable = table.column_index(VARIABLE_UNIT_COST)?;
    let list = table.column_index(LIST_PRICE)?;
    let customer = table.column_index(CUSTOMER_PRICE)?;

    let n = table.len();
    let mut gm = Vec::with_capacity(n);
    let mut cm = Vec::with_capacity(n);
    let mut deviation = Vec::with_capacity(n);
    let mut lp_revenue = Vec::with_capacity(n);

    for row in table.rows() {
        let rev = row[revenue].as_f64();
        let vol = row[volume].as_f64();
        let lp = row[list].as_f64();
        gm.push(Value::from(gross_margin(rev, row[depreciated].as_f64(), vol)));
        cm.push(Value::from(contribution_margin(rev, row[variable].as_f64(), vol)));
        deviation.push(Value::from(list_price_deviation(lp, row[customer].as_f64(), vol)));
        lp_revenue.push(Value::from(list_price_revenue(lp, vol)));
    }

    table.push_column(Column::new(GROSS_MARGIN, Origin::Calculated), gm);
    table.push_column(Column::new(CONTRIBUTION_MARGIN, Origin::Calculated), cm);
    table.push_column(Column::new(LIST_PRICE_DEVIATION, Origin::Calculated), deviation);
    table.push_column(Column::new(LIST_PRICE_REVENUE, Origin::Calculated), lp_revenue);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;

    #[test]
    fn null_cost_gives_null_margin() {
        assert_eq!(gross_margin(Some(100.0), None, Some(10.0)), None);
        assert_eq!(gross_margin(Some(100.0), Some(4.0), Some(10.0)), Some(60.0));
    }

    #[test]
    fn deviation_and_revenue() {
        assert_eq!(list_price_deviation(Some(12.0), Some(10.0), Some(5.0)), Some(10.0));
        assert_eq!(list_price_revenue(Some(12.0), Some(5.0)), Some(60.0));
        assert_eq!(list_price_revenue(None, Some(5.0)), None);
    }

    fn joined(rows: Vec<Vec<Value>>) -> Table {
        Table::from_rows(
            "joined",
            Source::Sales,
            [REVENUE, VOLUME, DEPRECIATED_UNIT_COST, VARIABLE_UNIT_COST, LIST_PRICE, CUSTOMER_PRICE]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows,
        )
    }

    #[test]
    fn columns_are_appended_row_wise() {
        let t = joined(vec![
            vec![100.0.into(), 10.0.into(), 4.0.into(), 3.0.into(), 12.0.into(), 11.0.into()],
            vec![100.0.into(), 10.0.into(), Value::Null, Value::Null, Value::Null, Value::Null],
        ]);
        let t = add_kpis(t).unwrap();
        assert_eq!(t.get(0, GROSS_MARGIN), Some(&Value::Number(60.0)));
        assert_eq!(t.get(0, CONTRIBUTION_MARGIN), Some(&Value::Number(70.0)));
        assert_eq!(t.get(0, LIST_PRICE_DEVIATION), Some(&Value::Number(10.0)));
        assert_eq!(t.get(0, LIST_PRICE_REVENUE), Some(&Value::Number(120.0)));
        for kpi in [GROSS_MARGIN, CONTRIBUTION_MARGIN, LIST_PRICE_DEVIATION, LIST_PRICE_REVENUE] {
            assert_eq!(t.get(1, kpi), Some(&Value::Null), "{kpi}");
        }
        assert_eq!(t.columns().last().unwrap().origin, Origin::Calculated);
    }

    #[test]
    fn numeric_text_is_used() {
        let t = joined(vec![vec![
            "100".into(),
            "10".into(),
            "4".into(),
            "3".into(),
            "12".into(),
            "n/a".into(),
        ]]);
        let t = add_kpis(t).unwrap();
        assert_eq!(t.get(0, GROSS_MARGIN), Some(&Value::Number(60.0)));
        assert_eq!(t.get(0, LIST_PRICE_DEVIATION), Some(&Value::Null));
    }

    #[test]
    fn missing_input_column() {
        let t = Table::from_rows("joined", Source::Sales, vec![REVENUE.into()], vec![]);
        let err = add_kpis(t).unwrap_err();
        assert_eq!(err.to_string(), format!("joined: missing column '{VOLUME}'"));
    }
}
