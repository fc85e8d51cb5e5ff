//! Builds a [`SchemaDump`] from a [`CatalogProvider`] in one sequential pass.

use log::{debug, info};

use crate::{
    comment::{self, FK_MARKER},
    db::CatalogProvider,
    errors::DbError,
    models::{
        dump::{ColumnRecord, ForeignKeyRecord, IndexRecord, SchemaDump, TableRecord},
        schema::{ColumnSchema, ForeignKeySchema, TableSchema},
    },
};

/// Dump every table of the catalog, ordered by name.
///
/// Catalog failures abort the dump and are returned unchanged.
pub async fn dump<C>(catalog: &C) -> Result<SchemaDump, DbError>
where
    C: CatalogProvider + ?Sized,
{
    let mut tables = catalog.list_tables().await?;
    tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));
    info!("dumping {} tables", tables.len());

    let mut records = Vec::with_capacity(tables.len());
    for table in &tables {
        records.push(dump_table(catalog, table).await?);
    }

    Ok(SchemaDump {
        name: catalog.database_name(),
        tables: records,
    })
}

/// Dump the catalog, then release its connection on every exit path.
pub async fn dump_and_close<C>(catalog: &C) -> Result<SchemaDump, DbError>
where
    C: CatalogProvider + ?Sized,
{
    let result = dump(catalog).await;
    catalog.close().await;
    result
}

pub async fn dump_table<C>(catalog: &C, table: &TableSchema) -> Result<TableRecord, DbError>
where
    C: CatalogProvider + ?Sized,
{
    let table_name = table.table_name.as_str();
    info!("processing table {}", table_name);

    let primary_keys = catalog.primary_key_columns(table_name).await?;
    let mut foreign_keys = catalog.list_foreign_keys(table_name).await?;
    foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));

    let mut record = TableRecord::new(table_name, table_comment(table));

    for column in catalog.list_columns(table_name).await? {
        let pkey = primary_keys.contains(&column.name);
        let entry = dump_column(&mut record, column, pkey, &foreign_keys);
        record.columns.push(entry);
    }

    let mut indexes = catalog.list_indexes(table_name).await?;
    indexes.sort_by(|a, b| a.name.cmp(&b.name));
    record.indexes = indexes
        .into_iter()
        .map(|index| IndexRecord {
            name: index.name,
            unique: index.is_unique,
            column_names: index.columns,
        })
        .collect();

    record.foreign_keys = foreign_keys
        .into_iter()
        .map(|key| ForeignKeyRecord {
            name: key.name,
            constrained_columns: key.constrained_columns,
            referred_table: key.referred_table,
            referred_columns: key.referred_columns,
        })
        .collect();

    Ok(record)
}

/// The decoded table comment, or empty when it only repeats the table name.
fn table_comment(table: &TableSchema) -> String {
    let decoded = comment::decode(table.comment.as_deref(), &table.table_name, &[]);
    if decoded.fullname == table.table_name {
        String::new()
    } else {
        decoded.fullname
    }
}

/// `FK: table.column, ...` for every foreign key constraining `column`.
fn foreign_key_option(column: &str, foreign_keys: &[ForeignKeySchema]) -> Option<String> {
    let references: Vec<String> = foreign_keys
        .iter()
        .filter_map(|key| key.reference_for(column))
        .collect();
    if references.is_empty() {
        None
    } else {
        Some(format!("{} {}", FK_MARKER, references.join(", ")))
    }
}

fn dump_column(
    table: &mut TableRecord,
    column: ColumnSchema,
    pkey: bool,
    foreign_keys: &[ForeignKeySchema],
) -> ColumnRecord {
    let mut options = column.options;
    if let Some(option) = foreign_key_option(&column.name, foreign_keys) {
        options.push(option);
    }
    let decoded = comment::decode(column.comment.as_deref(), &column.name, &options);

    let mut entry = ColumnRecord::new(
        column.name,
        column.data_type,
        column.is_nullable,
        pkey,
        column.default,
    );

    if let Some(fkey) = comment::foreign_key_annotation(&decoded.comment) {
        entry.fkey = Some(fkey);
        table.fields.insert("fkey");
    }

    // fullname falls back to the column name when there is no comment
    if decoded.fullname == entry.name || decoded.fullname.is_empty() {
        return entry;
    }

    match comment::json_fields(&decoded.fullname) {
        Some(fields) => {
            let mut keys: Vec<(String, serde_json::Value)> = fields.into_iter().collect();
            keys.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in keys {
                if table.fields.insert(&key) {
                    debug!("table {}: new field {}", table.name, key);
                }
                entry.merge_field(&key, value);
            }
        }
        None => {
            entry.description = Some(decoded.fullname);
            table.fields.insert("description");
        }
    }

    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::IndexSchema;
    use async_trait::async_trait;
    use mockall::{mock, predicate};
    use serde_json::json;

    mock! {
        pub Catalog {}

        #[async_trait]
        impl CatalogProvider for Catalog {
            fn database_name(&self) -> String;
            async fn list_tables(&self) -> Result<Vec<TableSchema>, DbError>;
            async fn list_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, DbError>;
            async fn list_indexes(&self, table_name: &str) -> Result<Vec<IndexSchema>, DbError>;
            async fn list_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeySchema>, DbError>;
            async fn primary_key_columns(&self, table_name: &str) -> Result<Vec<String>, DbError>;
            async fn close(&self);
        }
    }

    fn column(name: &str, comment: Option<&str>) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            data_type: "varchar(32)".to_string(),
            is_nullable: true,
            default: None,
            comment: comment.map(str::to_string),
            options: Vec::new(),
        }
    }

    fn table(name: &str, comment: Option<&str>) -> TableSchema {
        TableSchema {
            table_name: name.to_string(),
            comment: comment.map(str::to_string),
        }
    }

    fn catalog_with_columns(columns: Vec<ColumnSchema>) -> MockCatalog {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_database_name()
            .returning(|| "shop".to_string());
        catalog
            .expect_list_tables()
            .returning(|| Ok(vec![table("parcels", Some("Parcels"))]));
        catalog
            .expect_primary_key_columns()
            .with(predicate::eq("parcels"))
            .times(1)
            .returning(|_| Ok(vec!["id".to_string()]));
        catalog
            .expect_list_foreign_keys()
            .with(predicate::eq("parcels"))
            .times(1)
            .returning(|_| Ok(Vec::new()));
        catalog
            .expect_list_columns()
            .with(predicate::eq("parcels"))
            .returning(move |_| Ok(columns.clone()));
        catalog
            .expect_list_indexes()
            .returning(|_| Ok(Vec::new()));
        catalog
    }

    fn fields(record: &TableRecord) -> Vec<&str> {
        record.fields.iter().collect()
    }

    #[tokio::test]
    async fn test_json_comment_merges_sorted_keys() {
        let catalog = catalog_with_columns(vec![
            column("id", None),
            column("weight", Some(r#"{"unit": "kg", "max": 30}"#)),
            column("height", Some(r#"{"unit": "cm", "alias": "h"}"#)),
        ]);

        let dump = dump(&catalog).await.unwrap();
        let parcels = &dump.tables[0];

        assert_eq!(
            fields(parcels),
            vec!["name", "type", "nullable", "pkey", "default", "max", "unit", "alias"]
        );
        let weight = &parcels.columns[1];
        assert_eq!(weight.extra.get("unit"), Some(&json!("kg")));
        assert_eq!(weight.extra.get("max"), Some(&json!(30)));
        assert!(weight.description.is_none());
    }

    #[tokio::test]
    async fn test_plain_comment_becomes_description() {
        let catalog = catalog_with_columns(vec![
            column("id", Some("id")),
            column("label", Some(" Shipping label ")),
            column("note", Some("Note (free text)")),
        ]);

        let dump = dump(&catalog).await.unwrap();
        let parcels = &dump.tables[0];

        assert_eq!(
            fields(parcels),
            vec!["name", "type", "nullable", "pkey", "default", "description"]
        );
        assert!(parcels.columns[0].description.is_none());
        assert!(parcels.columns[0].pkey);
        assert_eq!(parcels.columns[1].description.as_deref(), Some("Shipping label"));
        assert_eq!(parcels.columns[2].description.as_deref(), Some("Note"));
        assert!(parcels.columns[1].extra.is_empty());
        assert_eq!(parcels.comment, "Parcels");
    }

    #[tokio::test]
    async fn test_options_flow_into_fkey() {
        let mut flagged = column("code", Some("Code (carrier code)"));
        flagged.options = vec!["utf8_bin".to_string(), "FK: carriers.code".to_string()];
        let mut counter = column("seq", None);
        counter.options = vec!["auto_increment".to_string()];
        let catalog = catalog_with_columns(vec![counter, flagged]);

        let dump = dump(&catalog).await.unwrap();
        let parcels = &dump.tables[0];

        assert_eq!(parcels.columns[0].fkey, None);
        assert_eq!(parcels.columns[1].fkey.as_deref(), Some("FK: carriers.code"));
        assert_eq!(
            fields(parcels),
            vec!["name", "type", "nullable", "pkey", "default", "fkey", "description"]
        );
    }

    #[tokio::test]
    async fn test_foreign_keys_annotate_columns() {
        let mut catalog = MockCatalog::new();
        catalog.expect_database_name().returning(|| "shop".to_string());
        catalog
            .expect_list_tables()
            .returning(|| Ok(vec![table("orders", None)]));
        catalog
            .expect_primary_key_columns()
            .times(1)
            .returning(|_| Ok(vec!["id".to_string()]));
        catalog.expect_list_foreign_keys().times(1).returning(|_| {
            Ok(vec![
                ForeignKeySchema {
                    name: "fk_team".to_string(),
                    constrained_columns: vec!["owner_id".to_string()],
                    referred_table: "teams".to_string(),
                    referred_columns: vec!["id".to_string()],
                },
                ForeignKeySchema {
                    name: "fk_account".to_string(),
                    constrained_columns: vec!["owner_id".to_string()],
                    referred_table: "accounts".to_string(),
                    referred_columns: vec!["id".to_string()],
                },
            ])
        });
        catalog
            .expect_list_columns()
            .returning(|_| Ok(vec![column("id", None), column("owner_id", None)]));
        catalog.expect_list_indexes().returning(|_| {
            Ok(vec![
                IndexSchema {
                    name: "idx_z".to_string(),
                    columns: vec!["owner_id".to_string()],
                    is_unique: false,
                },
                IndexSchema {
                    name: "idx_a".to_string(),
                    columns: vec!["id".to_string(), "owner_id".to_string()],
                    is_unique: true,
                },
            ])
        });

        let dump = dump(&catalog).await.unwrap();
        let orders = &dump.tables[0];

        assert_eq!(orders.comment, "");
        assert_eq!(
            orders.columns[1].fkey.as_deref(),
            Some("FK: accounts.id, teams.id")
        );
        assert_eq!(orders.foreign_keys[0].name, "fk_account");
        assert_eq!(orders.indexes[0].name, "idx_a");
        assert!(orders.indexes[0].unique);
        assert_eq!(orders.indexes[1].column_names, vec!["owner_id".to_string()]);
    }

    #[tokio::test]
    async fn test_tables_are_sorted_by_name() {
        let mut catalog = MockCatalog::new();
        catalog.expect_database_name().returning(|| "shop".to_string());
        catalog
            .expect_list_tables()
            .returning(|| Ok(vec![table("users", None), table("orders", None)]));
        catalog.expect_primary_key_columns().returning(|_| Ok(Vec::new()));
        catalog.expect_list_foreign_keys().returning(|_| Ok(Vec::new()));
        catalog.expect_list_columns().returning(|_| Ok(Vec::new()));
        catalog.expect_list_indexes().returning(|_| Ok(Vec::new()));

        let dump = dump(&catalog).await.unwrap();
        let names: Vec<&str> = dump.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "users"]);
        assert_eq!(dump.name, "shop");
    }

    #[tokio::test]
    async fn test_catalog_error_aborts_dump() {
        let mut catalog = MockCatalog::new();
        catalog.expect_database_name().returning(|| "shop".to_string());
        catalog
            .expect_list_tables()
            .returning(|| Ok(vec![table("orders", None)]));
        catalog.expect_primary_key_columns().returning(|_| {
            Err(DbError::Connection("server has gone away".to_string()))
        });

        let result = dump(&catalog).await;
        match result {
            Err(DbError::Connection(message)) => assert_eq!(message, "server has gone away"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_dump_still_closes_catalog() {
        let mut catalog = MockCatalog::new();
        catalog.expect_database_name().returning(|| "shop".to_string());
        catalog
            .expect_list_tables()
            .returning(|| Ok(vec![table("orders", None)]));
        catalog.expect_primary_key_columns().returning(|_| {
            Err(DbError::Connection("server has gone away".to_string()))
        });
        catalog.expect_close().times(1).returning(|| ());

        let result = dump_and_close(&catalog).await;
        match result {
            Err(DbError::Connection(message)) => assert_eq!(message, "server has gone away"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_successful_dump_closes_catalog() {
        let mut catalog = catalog_with_columns(vec![column("id", None)]);
        catalog.expect_close().times(1).returning(|| ());

        let dump = dump_and_close(&catalog).await.unwrap();
        assert_eq!(dump.tables.len(), 1);
    }

    #[tokio::test]
    async fn test_dump_is_idempotent() {
        let catalog = catalog_with_columns(vec![
            column("id", None),
            column("weight", Some(r#"{"unit": "kg"}"#)),
        ]);
        let first = dump(&catalog).await.unwrap();

        let catalog = catalog_with_columns(vec![
            column("id", None),
            column("weight", Some(r#"{"unit": "kg"}"#)),
        ]);
        let second = dump(&catalog).await.unwrap();

        assert_eq!(first, second);
    }
}
