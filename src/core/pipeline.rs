use crate::adapters::source::SourceReader;
use crate::core::report::{self, OutputFormat};
use crate::core::{
    ConfigProvider, InventoryExtracts, ParsedExtract, Pipeline, ReconciliationReport, Storage,
};
use crate::domain::model::{Field, SourceKind};
use crate::domain::services::aggregation::{AdjustmentLedger, StockLedger};
use crate::domain::services::headers::HeaderSynonyms;
use crate::domain::services::parser::{parse_adjustments, parse_stock_extract};
use crate::domain::services::reconciliation::{reconcile, Tolerance};
use crate::domain::services::summary::{
    location_breakdown, reason_breakdown, summarize, top_discrepancies,
};
use crate::utils::error::{ReconError, Result};
use chrono::Utc;
use std::path::Path;

pub struct ReconcilePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    reader: SourceReader,
}

impl<S: Storage, C: ConfigProvider> ReconcilePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            reader: SourceReader::new(),
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

fn log_columns<T>(extract: &ParsedExtract<T>) {
    let mapping: Vec<String> = Field::ALL
        .iter()
        .filter_map(|field| {
            extract
                .columns
                .header(*field)
                .map(|header| format!("{}='{}'", field, header))
        })
        .collect();

    tracing::info!(
        "📋 {}: {} rows, delimiter {:?}, columns [{}]",
        extract.source,
        extract.total_rows,
        extract.delimiter,
        mapping.join(", ")
    );
    if !extract.issues.is_empty() {
        tracing::warn!(
            "⚠️ {}: {} row(s) skipped",
            extract.source,
            extract.issues.len()
        );
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ReconcilePipeline<S, C> {
    async fn extract(&self) -> Result<InventoryExtracts> {
        let settings = self.config.settings();
        let synonyms = HeaderSynonyms::with_overrides(&settings.headers);

        let erp_location = self.config.erp_source();
        let erp_data = self.reader.fetch(erp_location).await?;
        let erp = parse_stock_extract(&erp_data, SourceKind::Erp, erp_location, &synonyms)?;
        log_columns(&erp);

        let wms_location = self.config.wms_source();
        let wms_data = self.reader.fetch(wms_location).await?;
        let wms = parse_stock_extract(&wms_data, SourceKind::Wms, wms_location, &synonyms)?;
        log_columns(&wms);

        let adjustments = match self.config.adjustments_source() {
            Some(location) => {
                let data = self.reader.fetch(location).await?;
                let parsed = parse_adjustments(&data, location, &synonyms)?;
                log_columns(&parsed);
                Some(parsed)
            }
            None => None,
        };

        Ok(InventoryExtracts {
            erp,
            wms,
            adjustments,
        })
    }

    async fn transform(&self, data: InventoryExtracts) -> Result<ReconciliationReport> {
        let settings = self.config.settings();

        let issues = data.issues();
        if settings.fail_on_row_errors && !issues.is_empty() {
            return Err(ReconError::RowErrors {
                count: issues.len(),
            });
        }

        // 依 SKU 彙總三個來源
        let erp = StockLedger::from_rows(&data.erp.rows, settings.case_sensitive_sku);
        let wms = StockLedger::from_rows(&data.wms.rows, settings.case_sensitive_sku);
        let adjustments = data
            .adjustments
            .as_ref()
            .map(|a| {
                AdjustmentLedger::from_rows(&a.rows, settings.case_sensitive_sku, settings.as_of)
            })
            .unwrap_or_default();

        tracing::debug!(
            "Aggregated {} ERP SKUs, {} WMS SKUs, {} adjustments ({} deferred)",
            erp.len(),
            wms.len(),
            adjustments.applied(),
            adjustments.deferred()
        );

        let tolerance = Tolerance {
            absolute: settings.tolerance,
            percent: settings.tolerance_pct,
        };
        let lines = reconcile(&erp, &wms, &adjustments, tolerance);
        let summary = summarize(&lines, &data, &adjustments, Utc::now());

        tracing::info!(
            "🔍 {} SKUs compared: {} matched, {} over, {} short, {} missing in WMS, {} missing in ERP",
            summary.total_skus,
            summary.matched,
            summary.over,
            summary.short,
            summary.missing_in_wms,
            summary.missing_in_erp
        );

        Ok(ReconciliationReport {
            locations: location_breakdown(&erp, &wms),
            reasons: reason_breakdown(&adjustments),
            top: top_discrepancies(&lines, settings.top_n),
            summary,
            lines,
            issues,
        })
    }

    async fn load(&self, report: ReconciliationReport) -> Result<String> {
        let formats = OutputFormat::parse_list(self.config.output_formats())?;
        let report_name = self.config.report_name();
        let output_path = Path::new(self.config.output_path())
            .join(report_name)
            .to_string_lossy()
            .into_owned();

        let workbook = report::build_workbook(&report, &formats)?;

        tracing::debug!("Writing workbook ({} bytes) to storage", workbook.len());
        self.storage.write_file(report_name, &workbook).await?;

        tracing::info!("💾 Report saved: {}", output_path);
        Ok(output_path)
    }
}
