use clap::Parser;
use inventory_recon::core::{ConfigProvider, InventoryExtracts, ParsedExtract};
use inventory_recon::domain::model::Field;
use inventory_recon::utils::error::ReconError;
use inventory_recon::utils::{logger, validation::Validate};
use inventory_recon::{CliConfig, LocalStorage, ReconEngine, ReconcilePipeline, TomlConfig};

/// Exit status when the run succeeded but discrepancies were found and
/// `--fail-on-discrepancy` was given.
const DISCREPANCY_EXIT_CODE: i32 = 4;

fn report_error(context: &str, e: &ReconError) -> i32 {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    e.severity().exit_code()
}

fn describe_extract<T>(extract: &ParsedExtract<T>) {
    println!(
        "  {} ({}): {} of {} rows usable, {} issue(s)",
        extract.source,
        extract.location,
        extract.rows.len(),
        extract.total_rows,
        extract.issues.len()
    );
}

fn print_preview(extracts: &InventoryExtracts) {
    println!("🔍 Dry run - no report will be written");
    describe_extract(&extracts.erp);
    describe_extract(&extracts.wms);
    if let Some(adjustments) = &extracts.adjustments {
        describe_extract(adjustments);
    }

    let mut columns = vec![("ERP", &extracts.erp.columns), ("WMS", &extracts.wms.columns)];
    if let Some(adjustments) = &extracts.adjustments {
        columns.push(("adjustments", &adjustments.columns));
    }
    for (name, map) in columns {
        for field in Field::ALL {
            if let Some(header) = map.header(field) {
                println!("  {} {:<12} <- '{}'", name, field.to_string(), header);
            }
        }
    }

    for issue in extracts.issues() {
        println!("  ⚠️ {} line {}: {}", issue.source, issue.line_number, issue.message);
    }
}

async fn run<C: ConfigProvider + 'static>(
    config: C,
    monitor_enabled: bool,
    dry_run: bool,
    fail_on_discrepancy: bool,
) -> i32 {
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = ReconcilePipeline::new(storage, config);
    let engine = ReconEngine::new_with_monitoring(pipeline, monitor_enabled);

    if dry_run {
        return match engine.preview().await {
            Ok(extracts) => {
                print_preview(&extracts);
                0
            }
            Err(e) => report_error("Dry run failed", &e),
        };
    }

    match engine.run().await {
        Ok(outcome) => {
            let summary = &outcome.summary;
            tracing::info!("✅ Reconciliation completed successfully!");
            println!("✅ Reconciliation completed successfully!");
            println!(
                "📊 {} SKUs: {} matched, {} over, {} short, {} missing in WMS, {} missing in ERP",
                summary.total_skus,
                summary.matched,
                summary.over,
                summary.short,
                summary.missing_in_wms,
                summary.missing_in_erp
            );
            println!(
                "📦 ERP {} + adjustments {} = expected {}, WMS {}, net variance {}",
                summary.erp_total,
                summary.adjustment_total,
                summary.expected_total,
                summary.wms_total,
                summary.net_variance
            );
            if summary.row_issues > 0 {
                println!("⚠️ {} row(s) skipped, see the row_issues sheet", summary.row_issues);
            }
            println!("📁 Output saved to: {}", outcome.output_path);

            if fail_on_discrepancy && summary.discrepancies > 0 {
                DISCREPANCY_EXIT_CODE
            } else {
                0
            }
        }
        Err(e) => report_error("Reconciliation failed", &e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = CliConfig::parse();

    let code = if let Some(path) = cli.config.clone() {
        // 載入 TOML 配置，命令列參數優先
        let mut config = match TomlConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        };
        config.apply_overrides(&cli);

        if cli.log_json {
            logger::init_json_logger(cli.verbose, config.log_level());
        } else {
            logger::init_cli_logger(cli.verbose, config.log_level());
        }
        tracing::info!("📁 Loaded configuration from: {}", path);

        if let Err(e) = config.validate() {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code());
        }

        let monitor_enabled = config.monitoring_enabled();
        run(config, monitor_enabled, cli.dry_run, cli.fail_on_discrepancy).await
    } else {
        cli.apply_defaults();

        if cli.log_json {
            logger::init_json_logger(cli.verbose, None);
        } else {
            logger::init_cli_logger(cli.verbose, None);
        }
        if cli.verbose {
            tracing::debug!("CLI config: {:?}", cli);
        }

        if let Err(e) = cli.validate() {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code());
        }

        let (monitor_enabled, dry_run, fail_on_discrepancy) =
            (cli.monitor, cli.dry_run, cli.fail_on_discrepancy);
        run(cli, monitor_enabled, dry_run, fail_on_discrepancy).await
    };

    if code > 0 {
        std::process::exit(code);
    }
    Ok(())
}
