//! Discovery over CSV files loaded from a directory or glob.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use term_ontology::config::DiscoveryConfig;
use term_ontology::discovery::assembler::discover_ontology;
use term_ontology::error::OntologyError;
use term_ontology::model::{Cardinality, DiscoveryMethod};
use term_ontology::sources::{EngineKind, SourceConfig};

fn write_csv(dir: &Path, name: &str, lines: &[&str]) {
    let mut file = File::create(dir.join(name)).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

fn olist_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_csv(
        dir.path(),
        "olist_customers_dataset.csv",
        &[
            "customer_id,customer_city,customer_state",
            "1,sao paulo,SP",
            "2,campinas,SP",
            "3,niteroi,RJ",
        ],
    );
    write_csv(
        dir.path(),
        "olist_orders_dataset.csv",
        &[
            "order_id,customer_id,order_status,order_purchase_timestamp,order_delivered_date",
            "10,1,delivered,2024-02-01 09:00:00,2024-02-01 10:00:00",
            "11,1,delivered,2024-02-02 09:00:00,2024-02-02 10:00:00",
            "12,1,shipped,2024-02-03 09:00:00,2024-02-03 10:00:00",
            "13,2,delivered,2024-02-04 09:00:00,2024-02-04 10:00:00",
            "14,2,canceled,2024-02-05 09:00:00,2024-02-05 10:00:00",
            "15,2,delivered,2024-02-06 09:00:00,2024-02-06 10:00:00",
            "16,3,delivered,2024-02-07 09:00:00,2024-02-07 10:00:00",
        ],
    );
    write_csv(dir.path(), "notes.txt", &["not a table"]);
    dir
}

#[tokio::test]
async fn test_directory_of_csv_files() {
    let dir = olist_dir();
    let source = SourceConfig::new(EngineKind::Csv, dir.path().to_string_lossy().into_owned());
    let doc = discover_ontology(&source, &DiscoveryConfig::default())
        .await
        .unwrap();

    // table names keep the file stem; concept names drop the olist_ / _dataset affixes
    assert_eq!(
        doc.nouns().keys().collect::<Vec<_>>(),
        vec!["Customers", "Orders"]
    );
    assert_eq!(
        doc.nouns().get("Orders").unwrap().table,
        "olist_orders_dataset"
    );
    assert_eq!(doc.nouns().get("Orders").unwrap().primary_key, "order_id");

    assert_eq!(doc.links().len(), 1);
    let link = &doc.links()[0];
    assert_eq!(
        link.join,
        "olist_orders_dataset.customer_id = olist_customers_dataset.customer_id"
    );
    assert_eq!(link.method, DiscoveryMethod::InferredByName);
    assert_eq!(link.cardinality, Cardinality::ManyToOne);
    assert_eq!(link.confidence, 1.0);

    assert_eq!(
        doc.derived_fields()
            .get("Orders_processing_time")
            .unwrap()
            .logic,
        "DATEDIFF(order_delivered_date, order_purchase_timestamp)"
    );
}

#[tokio::test]
async fn test_glob_and_allow_list() {
    let dir = olist_dir();
    let pattern = format!("{}/olist_*.csv", dir.path().display());
    let source = SourceConfig::new(EngineKind::Csv, pattern).with_tables(["olist_orders_dataset"]);
    let doc = discover_ontology(&source, &DiscoveryConfig::default())
        .await
        .unwrap();

    assert_eq!(doc.nouns().keys().collect::<Vec<_>>(), vec!["Orders"]);
    assert!(doc.links().is_empty());
    assert_eq!(doc.metadata().link_coverage, 0.0);
}

#[tokio::test]
async fn test_empty_location_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let source = SourceConfig::new(EngineKind::Csv, dir.path().to_string_lossy().into_owned());
    let err = discover_ontology(&source, &DiscoveryConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OntologyError::Connection { .. }));
}

#[tokio::test]
async fn test_unknown_schema_is_fatal() {
    let dir = olist_dir();
    let source = SourceConfig::new(EngineKind::Csv, dir.path().to_string_lossy().into_owned())
        .with_database("staging");
    let err = discover_ontology(&source, &DiscoveryConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OntologyError::Context { .. }));
}
