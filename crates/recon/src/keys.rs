//! Join-key construction.
//!
//! Every key the pipeline joins on is described by a named [`KeyRule`], and
//! both sides of a join are built from rules in this module so the order of
//! concatenated parts cannot drift between base and dimension.

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{Origin, Warning};
use crate::table::{Column, Table, Value};

pub const KEY_SEPARATOR: &str = "|";

// ---------------------------------------------------------------------------
// Code tokens
// ---------------------------------------------------------------------------

/// Leading code of a `"<CODE> <description>"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Code(&'a str),
    /// Input without the expected shape, passed through untouched.
    Degraded(&'a str),
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Self::Code(s) | Self::Degraded(s) => *s,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Split on the first whitespace and keep the first segment.
pub fn code_token(raw: &str) -> Token<'_> {
    match raw.split_once(char::is_whitespace) {
        Some((code, _)) if !code.is_empty() => Token::Code(code),
        _ => Token::Degraded(raw),
    }
}

pub fn build_key(raw: &str) -> String {
    code_token(raw).as_str().to_string()
}

pub fn compose<S: AsRef<str>>(parts: &[S]) -> String {
    let mut key = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push_str(KEY_SEPARATOR);
        }
        key.push_str(part.as_ref());
    }
    key
}

/// Replace every text value of `column` by its leading code token.
pub fn normalize_code_column(table: &mut Table, column: &str) -> Result<(), ReconError> {
    table.map_column(column, |value| match value {
        Value::Text(s) => Value::Text(build_key(s)),
        other => other.clone(),
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPart {
    /// Leading code token of the column's value.
    Code(&'static str),
    /// The value as-is.
    Verbatim(&'static str),
    /// The first `n` characters.
    Prefix(&'static str, usize),
}

impl KeyPart {
    fn column(&self) -> &'static str {
        match self {
            Self::Code(c) | Self::Verbatim(c) | Self::Prefix(c, _) => *c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRule {
    pub name: &'static str,
    pub output: &'static str,
    pub parts: &'static [KeyPart],
}

pub const DISTRIBUTION_WAREHOUSE: KeyRule = KeyRule {
    name: "distribution warehouse",
    output: "MDM DWH",
    parts: &[KeyPart::Prefix("Location Of Distribution", 5)],
};

pub const ITEM: KeyRule = KeyRule {
    name: "item code",
    output: "item-key",
    parts: &[KeyPart::Code("Item")],
};

pub const ITEM_LOCATION: KeyRule = KeyRule {
    name: "item-location",
    output: "item-dwh-key",
    parts: &[KeyPart::Verbatim("item-key"), KeyPart::Verbatim("SAPCode")],
};

pub const LEGAL_ENTITY: KeyRule = KeyRule {
    name: "legal entity",
    output: "tagetik-key",
    parts: &[KeyPart::Code("Tagetik Legal Entity")],
};

pub const CUSTOMER: KeyRule = KeyRule {
    name: "customer code",
    output: "customer-key",
    parts: &[KeyPart::Code("Country Hierarchy - Customer")],
};

pub const PRICE_CONDITION: KeyRule = KeyRule {
    name: "price condition",
    output: "zcpr-key",
    parts: &[
        KeyPart::Verbatim("salesorganization"),
        KeyPart::Verbatim("customer-key"),
        KeyPart::Verbatim("item-dwh-key"),
    ],
};

pub const LIST_PRICE: KeyRule = KeyRule {
    name: "list price",
    output: "LP-item-dwh-key",
    parts: &[KeyPart::Verbatim("ItemNumber"), KeyPart::Verbatim("Del.WHS CODE")],
};

pub const CONDITIONS: KeyRule = KeyRule {
    name: "conditions",
    output: "conditions-key",
    parts: &[
        KeyPart::Verbatim("Sales Org"),
        KeyPart::Code("Sold-To"),
        KeyPart::Code("Item"),
        KeyPart::Verbatim("Delivery Warehouse"),
    ],
};

pub const STD_COSTS: KeyRule = KeyRule {
    name: "standard cost",
    output: "stdcosts-key",
    parts: &[KeyPart::Code("Item Number Name"), KeyPart::Verbatim("Plant Code")],
};

pub const SAP_COSTS: KeyRule = KeyRule {
    name: "SAP cost",
    output: "sapcosts-key",
    parts: &[KeyPart::Verbatim("Material"), KeyPart::Verbatim("Plnt")],
};

/// Counters from one application of a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyStats {
    pub rule: &'static str,
    pub built: usize,
    /// Rows left without a key; they never match.
    pub null: usize,
    pub degraded: usize,
    #[serde(skip)]
    degraded_column: Option<&'static str>,
    #[serde(skip)]
    degraded_sample: Option<String>,
}

impl KeyStats {
    pub fn warning(&self) -> Option<Warning> {
        if self.degraded == 0 {
            return None;
        }
        Some(Warning::KeyFormatDegraded {
            rule: self.rule.to_string(),
            column: self.degraded_column.unwrap_or_default().to_string(),
            count: self.degraded,
            sample: self.degraded_sample.clone().unwrap_or_default(),
        })
    }
}

impl KeyRule {
    /// Append the rule's output column to `table`.
    ///
    /// A null part makes the whole key null, which never matches.
    pub fn apply(&self, mut table: Table) -> Result<(Table, KeyStats), ReconError> {
        let indices = self
            .parts
            .iter()
            .map(|p| table.column_index(p.column()).map(|i| (*p, i)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = KeyStats {
            rule: self.name,
            ..Default::default()
        };
        let mut keys = Vec::with_capacity(table.len());
        let mut parts: Vec<String> = Vec::with_capacity(indices.len());

        for row in table.rows() {
            parts.clear();
            for (part, idx) in &indices {
                let Some(text) = row[*idx].key_text() else {
                    break;
                };
                let piece = match part {
                    KeyPart::Verbatim(_) => text.into_owned(),
                    KeyPart::Prefix(_, n) => text.chars().take(*n).collect(),
                    KeyPart::Code(column) => match &row[*idx] {
                        Value::Text(raw) => {
                            let token = code_token(raw);
                            if token.is_degraded() {
                                stats.degraded += 1;
                                if stats.degraded_sample.is_none() {
                                    stats.degraded_column = Some(*column);
                                    stats.degraded_sample = Some(raw.clone());
                                }
                            }
                            token.as_str().to_string()
                        }
                        // Bare numbers are already codes.
                        _ => text.into_owned(),
                    },
                };
                parts.push(piece);
            }

            if parts.len() == indices.len() {
                stats.built += 1;
                keys.push(Value::Text(compose(&parts)));
            } else {
                stats.null += 1;
                keys.push(Value::Null);
            }
        }

        table.push_column(Column::new(self.output, Origin::Calculated), keys);
        Ok((table, stats))
    }
}
