use std::fs;

use schemadoc::models::dump::{ColumnRecord, IndexRecord, SchemaDump, TableRecord};
use schemadoc::output::{write_document, write_split};

fn sample_dump() -> SchemaDump {
    let mut orders = TableRecord::new("orders", "注文");
    orders
        .columns
        .push(ColumnRecord::new("id", "int(11)", false, true, None));
    orders.indexes.push(IndexRecord {
        name: "idx_id".to_string(),
        unique: false,
        column_names: vec!["id".to_string()],
    });

    let mut users = TableRecord::new("users", "");
    users
        .columns
        .push(ColumnRecord::new("id", "int(11)", false, true, None));

    SchemaDump {
        name: "shop".to_string(),
        tables: vec![orders, users],
    }
}

#[test]
fn test_write_split_creates_index_and_table_files() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("docs");

    write_split(&sample_dump(), &target).unwrap();

    let index = fs::read_to_string(target.join("index.rst")).unwrap();
    assert_eq!(
        index,
        "\nSchema: shop\n============\n\n.. toctree::\n   :maxdepth: 1\n\n   orders\n   users\n"
    );

    let orders = fs::read_to_string(target.join("orders.rst")).unwrap();
    assert!(orders.starts_with("\n.. _shop.orders:\n\norders\n======\n\n注文\n\n.. list-table::\n"));
    assert!(orders.ends_with("\nIndexes\n-------\n\n* KEY: idx_id (id)\n"));

    let users = fs::read_to_string(target.join("users.rst")).unwrap();
    assert!(users.starts_with("\n.. _shop.users:\n\nusers\n=====\n\n.. list-table::\n"));
    assert!(!users.contains("Indexes"));
}

#[test]
fn test_write_document_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.rst");

    write_document(&sample_dump(), fs::File::create(&path).unwrap()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("\nSchema: shop\n============\n\n\n.. _shop.orders:\n\norders\n------\n"));
    assert!(text.contains("\nIndexes\n^^^^^^^\n\n* KEY: idx_id (id)\n"));
}

#[test]
fn test_write_split_into_a_file_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("taken");
    fs::write(&blocker, "not a directory").unwrap();

    assert!(write_split(&sample_dump(), &blocker).is_err());
}
