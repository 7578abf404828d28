use crate::domain::model::{AdjustmentRow, StockRow};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const UNASSIGNED_LOCATION: &str = "(unassigned)";
pub const NO_REASON: &str = "(none)";

/// Canonical SKU key: trimmed, inner whitespace collapsed, uppercased unless
/// matching is case-sensitive.
pub fn normalize_sku(raw: &str, case_sensitive: bool) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if case_sensitive {
        collapsed
    } else {
        collapsed.to_uppercase()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkuTotals {
    pub quantity: f64,
    pub rows: usize,
    pub locations: BTreeMap<String, f64>,
    pub description: Option<String>,
}

/// Per-SKU stock totals for one extract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockLedger {
    by_sku: BTreeMap<String, SkuTotals>,
}

impl StockLedger {
    pub fn from_rows(rows: &[StockRow], case_sensitive: bool) -> Self {
        let mut by_sku: BTreeMap<String, SkuTotals> = BTreeMap::new();

        for row in rows {
            let totals = by_sku
                .entry(normalize_sku(&row.sku, case_sensitive))
                .or_default();
            totals.quantity += row.quantity;
            totals.rows += 1;

            let location = row
                .location
                .clone()
                .unwrap_or_else(|| UNASSIGNED_LOCATION.to_string());
            *totals.locations.entry(location).or_insert(0.0) += row.quantity;

            if totals.description.is_none() {
                totals.description = row.description.clone();
            }
        }

        Self { by_sku }
    }

    pub fn get(&self, sku: &str) -> Option<&SkuTotals> {
        self.by_sku.get(sku)
    }

    pub fn skus(&self) -> impl Iterator<Item = &String> {
        self.by_sku.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SkuTotals)> {
        self.by_sku.iter()
    }

    pub fn len(&self) -> usize {
        self.by_sku.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sku.is_empty()
    }

    pub fn total_quantity(&self) -> f64 {
        self.by_sku.values().map(|t| t.quantity).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReasonTotals {
    pub entries: usize,
    pub net_quantity: f64,
}

/// Net adjustment per SKU and per reason.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjustmentLedger {
    by_sku: BTreeMap<String, f64>,
    by_reason: BTreeMap<String, ReasonTotals>,
    applied: usize,
    deferred: usize,
}

impl AdjustmentLedger {
    /// Rows dated after `as_of` are counted as deferred and left out.
    /// Undated rows always apply.
    pub fn from_rows(rows: &[AdjustmentRow], case_sensitive: bool, as_of: Option<NaiveDate>) -> Self {
        let mut ledger = Self::default();

        for row in rows {
            if let (Some(cutoff), Some(date)) = (as_of, row.date) {
                if date > cutoff {
                    ledger.deferred += 1;
                    continue;
                }
            }

            *ledger
                .by_sku
                .entry(normalize_sku(&row.sku, case_sensitive))
                .or_insert(0.0) += row.quantity;

            let reason = row
                .reason
                .clone()
                .unwrap_or_else(|| NO_REASON.to_string());
            let totals = ledger.by_reason.entry(reason).or_default();
            totals.entries += 1;
            totals.net_quantity += row.quantity;

            ledger.applied += 1;
        }

        ledger
    }

    pub fn net_for(&self, sku: &str) -> Option<f64> {
        self.by_sku.get(sku).copied()
    }

    pub fn skus(&self) -> impl Iterator<Item = &String> {
        self.by_sku.keys()
    }

    pub fn reasons(&self) -> impl Iterator<Item = (&String, &ReasonTotals)> {
        self.by_reason.iter()
    }

    pub fn total(&self) -> f64 {
        self.by_sku.values().sum()
    }

    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn deferred(&self) -> usize {
        self.deferred
    }
}
