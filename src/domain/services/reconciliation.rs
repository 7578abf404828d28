use crate::domain::model::{LineStatus, ReconciledLine};
use crate::domain::services::aggregation::{AdjustmentLedger, StockLedger};
use std::collections::BTreeSet;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tolerance {
    pub absolute: f64,
    pub percent: Option<f64>,
}

impl Tolerance {
    pub fn accepts(&self, variance: f64, variance_pct: Option<f64>) -> bool {
        if variance.abs() <= self.absolute + EPSILON {
            return true;
        }
        match (self.percent, variance_pct) {
            (Some(limit), Some(pct)) => pct.abs() <= limit + EPSILON,
            _ => false,
        }
    }
}

/// Compare the ERP book (plus adjustments) with the WMS floor count for
/// every SKU seen in any source. Lines come back ordered by SKU.
pub fn reconcile(
    erp: &StockLedger,
    wms: &StockLedger,
    adjustments: &AdjustmentLedger,
    tolerance: Tolerance,
) -> Vec<ReconciledLine> {
    let skus: BTreeSet<&String> = erp
        .skus()
        .chain(wms.skus())
        .chain(adjustments.skus())
        .collect();

    skus.into_iter()
        .map(|sku| {
            let erp_totals = erp.get(sku);
            let wms_totals = wms.get(sku);
            let adjustment = adjustments.net_for(sku);

            let erp_quantity = erp_totals.map(|t| t.quantity).unwrap_or(0.0);
            let wms_quantity = wms_totals.map(|t| t.quantity).unwrap_or(0.0);
            let adjustment_quantity = adjustment.unwrap_or(0.0);
            let expected_quantity = erp_quantity + adjustment_quantity;
            let variance = wms_quantity - expected_quantity;
            let variance_pct = if expected_quantity.abs() > EPSILON {
                Some(variance * 100.0 / expected_quantity)
            } else {
                None
            };

            let book_side = erp_totals.is_some() || adjustment.is_some();
            let floor_side = wms_totals.is_some();

            let status = if tolerance.accepts(variance, variance_pct) {
                LineStatus::Match
            } else if !floor_side {
                LineStatus::MissingInWms
            } else if !book_side {
                LineStatus::MissingInErp
            } else if variance > 0.0 {
                LineStatus::Over
            } else {
                LineStatus::Short
            };

            let description = erp_totals
                .and_then(|t| t.description.clone())
                .or_else(|| wms_totals.and_then(|t| t.description.clone()));

            ReconciledLine {
                sku: sku.clone(),
                description,
                erp_quantity,
                adjustment_quantity,
                expected_quantity,
                wms_quantity,
                variance,
                variance_pct,
                status,
                erp_locations: erp_totals
                    .map(|t| t.locations.keys().cloned().collect())
                    .unwrap_or_default(),
                wms_locations: wms_totals
                    .map(|t| t.locations.keys().cloned().collect())
                    .unwrap_or_default(),
            }
        })
        .collect()
}
