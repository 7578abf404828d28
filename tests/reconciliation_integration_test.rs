use httpmock::prelude::*;
use inventory_recon::domain::model::{Field, SourceKind};
use inventory_recon::{
    CliConfig, LocalStorage, ReconEngine, ReconError, ReconcilePipeline, TomlConfig,
};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

const ERP_EXPORT: &str = "Item Code,Description,Qty On Hand,Warehouse\n\
SKU-001,Blue widget,\"1,250\",MAIN\n\
SKU-002,Red widget,40,MAIN\n\
SKU-002,Red widget,10,OVERFLOW\n\
SKU-003,Green widget,5,MAIN\n\
SKU-004,Old widget,12,MAIN\n";

const WMS_EXPORT: &str = "sku\tcounted\tbin\n\
sku-001\t1250\tA-01\n\
SKU-002\t45\tA-02\n\
SKU-003\t8\tA-03\n\
SKU-005\t3\tA-05\n\
SKU-006\tn/a\tA-06\n";

const ADJUSTMENTS_LOG: &str = "Item,Adjustment Qty,Reason,Date\n\
SKU-002,-5,Damaged,2026-09-28\n\
SKU-003,+3,Found,2026-10-05\n";

fn write_source(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn read_entry(zip_path: &Path, name: &str) -> String {
    let zip_data = std::fs::read(zip_path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn entry_names(zip_path: &Path) -> Vec<String> {
    let zip_data = std::fs::read(zip_path).unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    archive.file_names().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn test_end_to_end_reconciliation_from_local_files() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let output_path = output_dir.path().to_str().unwrap().to_string();

    let mut config = CliConfig {
        erp: Some(write_source(&input_dir, "erp.csv", ERP_EXPORT)),
        wms: Some(write_source(&input_dir, "wms.tsv", WMS_EXPORT)),
        adjustments: Some(write_source(&input_dir, "adjustments.csv", ADJUSTMENTS_LOG)),
        output_path: Some(output_path.clone()),
        as_of: chrono::NaiveDate::from_ymd_opt(2026, 9, 30),
        ..Default::default()
    };
    config.apply_defaults();

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = ReconcilePipeline::new(storage, config);
    let engine = ReconEngine::new_with_monitoring(pipeline, false);

    let outcome = engine.run().await.unwrap();
    let summary = &outcome.summary;

    assert_eq!(summary.total_skus, 5);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.over, 1);
    assert_eq!(summary.short, 0);
    assert_eq!(summary.missing_in_wms, 1);
    assert_eq!(summary.missing_in_erp, 1);
    assert_eq!(summary.discrepancies, 3);
    assert_eq!(summary.match_rate, 40.0);
    assert_eq!(summary.adjustment_rows, 1);
    assert_eq!(summary.deferred_adjustments, 1);
    assert_eq!(summary.row_issues, 1);

    let zip_path = Path::new(&output_path).join("reconciliation_report.zip");
    assert!(zip_path.exists());
    assert!(outcome.output_path.ends_with("reconciliation_report.zip"));

    let names = entry_names(&zip_path);
    for expected in [
        "discrepancies.csv",
        "reconciliation.csv",
        "summary.csv",
        "locations.csv",
        "top_discrepancies.csv",
        "adjustments_by_reason.csv",
        "row_issues.csv",
        "report.json",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {}", expected);
    }

    let discrepancies = read_entry(&zip_path, "discrepancies.csv");
    assert!(discrepancies.starts_with(
        "sku,description,status,erp_qty,adjustment_qty,expected_qty,wms_qty,variance,variance_pct,erp_locations,wms_locations\n"
    ));
    assert!(discrepancies.contains("SKU-003,Green widget,over,5,0,5,8,3,60,MAIN,A-03\n"));
    assert!(discrepancies.contains("SKU-004,Old widget,missing_in_wms,12,0,12,0,-12,-100,MAIN,\n"));
    assert!(discrepancies.contains("SKU-005,,missing_in_erp,0,0,0,3,3,,,A-05\n"));
    assert!(!discrepancies.contains("SKU-001"));

    let reconciliation = read_entry(&zip_path, "reconciliation.csv");
    assert!(reconciliation.contains("SKU-001,Blue widget,match,1250,0,1250,1250,0,0,MAIN,A-01\n"));
    assert!(reconciliation
        .contains("SKU-002,Red widget,match,50,-5,45,45,0,0,MAIN; OVERFLOW,A-02\n"));

    let reasons = read_entry(&zip_path, "adjustments_by_reason.csv");
    assert_eq!(reasons, "reason,entries,net_qty\nDamaged,1,-5\n");

    let issues = read_entry(&zip_path, "row_issues.csv");
    assert!(issues.contains("WMS,6,counted,n/a,"));

    let report: serde_json::Value =
        serde_json::from_str(&read_entry(&zip_path, "report.json")).unwrap();
    assert_eq!(report["summary"]["total_skus"], 5);
    assert_eq!(report["top"][0]["sku"], "SKU-004");
    assert_eq!(report["lines"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_sources_over_http() {
    let server = MockServer::start_async().await;
    let erp_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/erp/stock");
            then.status(200)
                .header("Content-Type", "text/csv")
                .body("Material;Stock;Lagerort\nM-1;10;L1\nM-2;4,5;L1\n");
        })
        .await;
    let wms_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/wms/stock");
            then.status(200)
                .header("Content-Type", "text/csv")
                .body("item_number|qty|location\nM-1|10|X\nM-2|4.5|X\n");
        })
        .await;

    let output_dir = TempDir::new().unwrap();
    let output_path = output_dir.path().to_str().unwrap().to_string();
    let mut config = CliConfig {
        erp: Some(server.url("/erp/stock")),
        wms: Some(server.url("/wms/stock")),
        output_path: Some(output_path.clone()),
        formats: vec!["tsv".to_string()],
        ..Default::default()
    };
    config.apply_defaults();

    let storage = LocalStorage::new(output_path.clone());
    let engine = ReconEngine::new(ReconcilePipeline::new(storage, config));

    let outcome = tokio_test::assert_ok!(engine.run().await);

    erp_mock.assert_async().await;
    wms_mock.assert_async().await;
    assert_eq!(outcome.summary.matched, 2);
    assert_eq!(outcome.summary.discrepancies, 0);

    let zip_path = Path::new(&output_path).join("reconciliation_report.zip");
    let names = entry_names(&zip_path);
    assert!(names.iter().all(|n| n.ends_with(".tsv")));
    let discrepancies = read_entry(&zip_path, "discrepancies.tsv");
    assert_eq!(discrepancies.lines().count(), 1);
}

#[tokio::test]
async fn test_http_source_error_status() {
    let server = MockServer::start_async().await;
    let erp_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/erp/stock");
            then.status(404);
        })
        .await;

    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let mut config = CliConfig {
        erp: Some(server.url("/erp/stock")),
        wms: Some(write_source(&input_dir, "wms.tsv", WMS_EXPORT)),
        output_path: Some(output_dir.path().to_str().unwrap().to_string()),
        ..Default::default()
    };
    config.apply_defaults();

    let storage = LocalStorage::new(output_dir.path().to_str().unwrap().to_string());
    let engine = ReconEngine::new(ReconcilePipeline::new(storage, config));

    let err = engine.run().await.unwrap_err();
    erp_mock.assert_async().await;
    assert!(matches!(err, ReconError::SourceFetchError { status: 404, .. }));
}

#[tokio::test]
async fn test_toml_config_with_header_overrides_and_tolerance() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let erp = write_source(
        &input_dir,
        "erp.csv",
        "Artikelnummer,Bestand\nX-1,100\nX-2,50\nX-3,20\n",
    );
    let wms = write_source(&input_dir, "wms.csv", "SKU,Qty\nX-1,99\nX-2,47\nX-3,20\n");
    let output_path = output_dir.path().to_str().unwrap().to_string();

    let toml_content = format!(
        r#"
[sources]
erp = "{erp}"
wms = "{wms}"

[reconcile]
tolerance = 1.0
top_n = 1

[headers]
sku = ["Artikelnummer"]
quantity = ["Bestand"]

[output]
path = "{output_path}"
report_name = "weekly.zip"
formats = ["json"]
"#
    );
    let config = TomlConfig::from_toml_str(&toml_content).unwrap();
    inventory_recon::utils::validation::Validate::validate(&config).unwrap();

    let storage = LocalStorage::new(output_path.clone());
    let engine = ReconEngine::new(ReconcilePipeline::new(storage, config));
    let outcome = engine.run().await.unwrap();

    // X-1 is within the absolute tolerance, X-2 is not
    assert_eq!(outcome.summary.matched, 2);
    assert_eq!(outcome.summary.short, 1);

    let zip_path = Path::new(&output_path).join("weekly.zip");
    assert_eq!(entry_names(&zip_path), vec!["report.json".to_string()]);

    let report: serde_json::Value =
        serde_json::from_str(&read_entry(&zip_path, "report.json")).unwrap();
    assert_eq!(report["top"].as_array().unwrap().len(), 1);
    assert_eq!(report["top"][0]["sku"], "X-2");
    assert_eq!(report["top"][0]["status"], "short");
}

#[tokio::test]
async fn test_missing_quantity_column_is_reported() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let mut config = CliConfig {
        erp: Some(write_source(&input_dir, "erp.csv", ERP_EXPORT)),
        wms: Some(write_source(&input_dir, "wms.csv", "sku,bin\nSKU-001,A-01\n")),
        output_path: Some(output_dir.path().to_str().unwrap().to_string()),
        ..Default::default()
    };
    config.apply_defaults();

    let storage = LocalStorage::new(output_dir.path().to_str().unwrap().to_string());
    let engine = ReconEngine::new(ReconcilePipeline::new(storage, config));

    let err = engine.run().await.unwrap_err();
    match &err {
        ReconError::MissingColumn {
            input, field, found, ..
        } => {
            assert_eq!(*input, SourceKind::Wms);
            assert_eq!(*field, Field::Quantity);
            assert_eq!(found, &vec!["sku".to_string(), "bin".to_string()]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().starts_with("WMS file has no quantity column"));
    assert!(!output_dir
        .path()
        .join("reconciliation_report.zip")
        .exists());
}

#[tokio::test]
async fn test_strict_mode_fails_without_writing() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let mut config = CliConfig {
        erp: Some(write_source(&input_dir, "erp.csv", ERP_EXPORT)),
        wms: Some(write_source(&input_dir, "wms.tsv", WMS_EXPORT)),
        output_path: Some(output_dir.path().to_str().unwrap().to_string()),
        strict: true,
        ..Default::default()
    };
    config.apply_defaults();

    let storage = LocalStorage::new(output_dir.path().to_str().unwrap().to_string());
    let engine = ReconEngine::new(ReconcilePipeline::new(storage, config));

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, ReconError::RowErrors { count: 1 }));
    assert!(!output_dir
        .path()
        .join("reconciliation_report.zip")
        .exists());
}

#[tokio::test]
async fn test_empty_and_header_only_files() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let output_path = output_dir.path().to_str().unwrap().to_string();

    let mut config = CliConfig {
        erp: Some(write_source(&input_dir, "erp.csv", "")),
        wms: Some(write_source(&input_dir, "wms.tsv", WMS_EXPORT)),
        output_path: Some(output_path.clone()),
        ..Default::default()
    };
    config.apply_defaults();
    let engine = ReconEngine::new(ReconcilePipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
    ));
    let err = engine.run().await.unwrap_err();
    assert!(matches!(
        err,
        ReconError::EmptyFile {
            input: SourceKind::Erp
        }
    ));

    let mut config = CliConfig {
        erp: Some(write_source(&input_dir, "erp_header.csv", "sku,qty\n")),
        wms: Some(write_source(&input_dir, "wms.tsv", WMS_EXPORT)),
        output_path: Some(output_path.clone()),
        ..Default::default()
    };
    config.apply_defaults();
    let engine = ReconEngine::new(ReconcilePipeline::new(
        LocalStorage::new(output_path),
        config,
    ));
    let err = engine.run().await.unwrap_err();
    assert!(matches!(
        err,
        ReconError::NoDataRows {
            input: SourceKind::Erp
        }
    ));
}
