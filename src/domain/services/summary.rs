use crate::domain::model::{
    InventoryExtracts, LineStatus, LocationSummary, ReasonSummary, ReconciledLine,
    ReconciliationSummary,
};
use crate::domain::services::aggregation::{AdjustmentLedger, StockLedger};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub fn summarize(
    lines: &[ReconciledLine],
    extracts: &InventoryExtracts,
    adjustments: &AdjustmentLedger,
    generated_at: DateTime<Utc>,
) -> ReconciliationSummary {
    let count = |status: LineStatus| lines.iter().filter(|l| l.status == status).count();

    let total_skus = lines.len();
    let matched = count(LineStatus::Match);
    let discrepancies = total_skus - matched;
    let match_rate = if total_skus == 0 {
        100.0
    } else {
        matched as f64 * 100.0 / total_skus as f64
    };

    let row_issues = extracts.erp.issues.len()
        + extracts.wms.issues.len()
        + extracts
            .adjustments
            .as_ref()
            .map(|a| a.issues.len())
            .unwrap_or(0);

    ReconciliationSummary {
        generated_at,
        erp_source: extracts.erp.location.clone(),
        wms_source: extracts.wms.location.clone(),
        adjustments_source: extracts.adjustments.as_ref().map(|a| a.location.clone()),
        total_skus,
        matched,
        over: count(LineStatus::Over),
        short: count(LineStatus::Short),
        missing_in_wms: count(LineStatus::MissingInWms),
        missing_in_erp: count(LineStatus::MissingInErp),
        discrepancies,
        match_rate,
        erp_total: lines.iter().map(|l| l.erp_quantity).sum(),
        adjustment_total: adjustments.total(),
        expected_total: lines.iter().map(|l| l.expected_quantity).sum(),
        wms_total: lines.iter().map(|l| l.wms_quantity).sum(),
        net_variance: lines.iter().map(|l| l.variance).sum(),
        absolute_variance: lines.iter().map(|l| l.variance.abs()).sum(),
        erp_rows: extracts.erp.rows.len(),
        wms_rows: extracts.wms.rows.len(),
        adjustment_rows: adjustments.applied(),
        deferred_adjustments: adjustments.deferred(),
        row_issues,
    }
}

#[derive(Default)]
struct LocationTotals {
    erp_quantity: f64,
    wms_quantity: f64,
    erp_skus: usize,
    wms_skus: usize,
}

/// Quantities per location on each side, ordered by location.
pub fn location_breakdown(erp: &StockLedger, wms: &StockLedger) -> Vec<LocationSummary> {
    let mut by_location: BTreeMap<&str, LocationTotals> = BTreeMap::new();

    for (_, totals) in erp.iter() {
        for (location, quantity) in &totals.locations {
            let entry = by_location.entry(location.as_str()).or_default();
            entry.erp_quantity += quantity;
            entry.erp_skus += 1;
        }
    }
    for (_, totals) in wms.iter() {
        for (location, quantity) in &totals.locations {
            let entry = by_location.entry(location.as_str()).or_default();
            entry.wms_quantity += quantity;
            entry.wms_skus += 1;
        }
    }

    by_location
        .into_iter()
        .map(|(location, totals)| LocationSummary {
            location: location.to_string(),
            erp_quantity: totals.erp_quantity,
            wms_quantity: totals.wms_quantity,
            variance: totals.wms_quantity - totals.erp_quantity,
            erp_skus: totals.erp_skus,
            wms_skus: totals.wms_skus,
        })
        .collect()
}

pub fn reason_breakdown(adjustments: &AdjustmentLedger) -> Vec<ReasonSummary> {
    adjustments
        .reasons()
        .map(|(reason, totals)| ReasonSummary {
            reason: reason.clone(),
            entries: totals.entries,
            net_quantity: totals.net_quantity,
        })
        .collect()
}

/// The `n` discrepancies with the largest absolute variance; ties by SKU.
pub fn top_discrepancies(lines: &[ReconciledLine], n: usize) -> Vec<ReconciledLine> {
    let mut discrepancies: Vec<&ReconciledLine> =
        lines.iter().filter(|l| l.is_discrepancy()).collect();
    discrepancies.sort_by(|a, b| {
        b.variance
            .abs()
            .total_cmp(&a.variance.abs())
            .then_with(|| a.sku.cmp(&b.sku))
    });
    discrepancies.into_iter().take(n).cloned().collect()
}
