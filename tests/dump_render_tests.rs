use std::collections::HashMap;

use async_trait::async_trait;
use schemadoc::db::CatalogProvider;
use schemadoc::dumper::dump;
use schemadoc::errors::DbError;
use schemadoc::models::dump::SchemaDump;
use schemadoc::models::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, TableSchema};
use schemadoc::render::{render_schema, RstWriter};

#[derive(Default)]
struct StaticTable {
    comment: Option<String>,
    columns: Vec<ColumnSchema>,
    indexes: Vec<IndexSchema>,
    foreign_keys: Vec<ForeignKeySchema>,
    primary_keys: Vec<String>,
}

/// Catalog snapshot held in memory.
struct StaticCatalog {
    tables: HashMap<String, StaticTable>,
}

impl StaticCatalog {
    fn table(&self, name: &str) -> Result<&StaticTable, DbError> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::Connection(format!("no such table {}", name)))
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    fn database_name(&self) -> String {
        "shop".to_string()
    }

    async fn list_tables(&self) -> Result<Vec<TableSchema>, DbError> {
        Ok(self
            .tables
            .iter()
            .map(|(name, table)| TableSchema {
                table_name: name.clone(),
                comment: table.comment.clone(),
            })
            .collect())
    }

    async fn list_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, DbError> {
        Ok(self.table(table_name)?.columns.clone())
    }

    async fn list_indexes(&self, table_name: &str) -> Result<Vec<IndexSchema>, DbError> {
        Ok(self.table(table_name)?.indexes.clone())
    }

    async fn list_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeySchema>, DbError> {
        Ok(self.table(table_name)?.foreign_keys.clone())
    }

    async fn primary_key_columns(&self, table_name: &str) -> Result<Vec<String>, DbError> {
        Ok(self.table(table_name)?.primary_keys.clone())
    }

    async fn close(&self) {}
}

fn column(name: &str, data_type: &str, is_nullable: bool, comment: Option<&str>) -> ColumnSchema {
    ColumnSchema {
        name: name.to_string(),
        data_type: data_type.to_string(),
        is_nullable,
        default: None,
        comment: comment.map(str::to_string),
        options: Vec::new(),
    }
}

fn shop_catalog() -> StaticCatalog {
    let mut tables = HashMap::new();
    tables.insert(
        "users".to_string(),
        StaticTable {
            comment: Some("Registered users".to_string()),
            columns: vec![
                column("id", "int", false, None),
                column("email", "varchar(255)", true, None),
            ],
            indexes: vec![IndexSchema {
                name: "idx_email".to_string(),
                columns: vec!["email".to_string()],
                is_unique: true,
            }],
            foreign_keys: vec![ForeignKeySchema {
                name: "fk_users_account".to_string(),
                constrained_columns: vec!["email".to_string()],
                referred_table: "accounts".to_string(),
                referred_columns: vec!["id".to_string()],
            }],
            primary_keys: vec!["id".to_string()],
        },
    );
    tables.insert(
        "accounts".to_string(),
        StaticTable {
            columns: vec![column("id", "int", false, Some("Account ID（内部番号）"))],
            primary_keys: vec!["id".to_string()],
            ..Default::default()
        },
    );
    tables.insert(
        "audit_log_".to_string(),
        StaticTable {
            columns: vec![
                column("id", "bigint", false, None),
                column("payload", "json", true, Some(r#"{"format": "json", "retention": 30}"#)),
                column("actor", "varchar(64)", true, Some("Actor\tFK: users.email")),
            ],
            ..Default::default()
        },
    );
    StaticCatalog { tables }
}

fn render(dump: &SchemaDump) -> String {
    let mut writer = RstWriter::new(Vec::new());
    render_schema(&mut writer, dump).unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
}

#[tokio::test]
async fn test_users_table_end_to_end() {
    let dump = dump(&shop_catalog()).await.unwrap();
    let text = render(&dump);

    let users_section = concat!(
        "\n.. _shop.users:\n\nusers\n-----\n\nRegistered users\n\n",
        ".. list-table::\n   :header-rows: 1\n\n",
        "   * - name\n     - type\n     - nullable\n     - pkey\n     - default\n     - fkey\n",
        "   * - id\n     - int\n     - True\n     - True\n     - \n     - \n",
        "   * - email\n     - varchar(255)\n     - False\n     - False\n     - \n",
        "     - `accounts.id <#accounts>`_\n",
        "\nIndexes\n^^^^^^^\n\n",
        "* UNIQUE KEY: idx_email (email)\n",
    );
    assert!(text.contains(users_section), "unexpected output:\n{}", text);
    assert!(text.starts_with("\nSchema: shop\n============\n\n"));
}

#[tokio::test]
async fn test_tables_render_in_name_order() {
    let dump = dump(&shop_catalog()).await.unwrap();
    let text = render(&dump);

    let accounts = text.find(".. _shop.accounts:").unwrap();
    let audit = text.find(".. _shop.audit_log_:").unwrap();
    let users = text.find(".. _shop.users:").unwrap();
    assert!(accounts < audit && audit < users);
}

#[tokio::test]
async fn test_wide_comment_and_escaped_table_name() {
    let dump = dump(&shop_catalog()).await.unwrap();
    let accounts = &dump.tables[0];
    assert_eq!(accounts.columns[0].description.as_deref(), Some("Account ID"));

    let text = render(&dump);
    assert!(text.contains("\naudit_log\\_\n-----------\n"));
}

#[tokio::test]
async fn test_json_and_tab_comments() {
    let dump = dump(&shop_catalog()).await.unwrap();
    let audit = &dump.tables[1];

    let fields: Vec<&str> = audit.fields.iter().collect();
    assert_eq!(
        fields,
        vec!["name", "type", "nullable", "pkey", "default", "format", "retention", "fkey", "description"]
    );
    assert_eq!(audit.columns[2].fkey.as_deref(), Some("FK: users.email"));
    assert_eq!(audit.columns[2].description.as_deref(), Some("Actor"));
    assert!(audit.columns[1].description.is_none());

    let text = render(&dump);
    assert!(text.contains(
        "   * - payload\n     - json\n     - False\n     - False\n     - \n     - json\n     - 30\n     - \n     - \n"
    ));
    assert!(text.contains("     - `users.email <#users>`_\n     - Actor\n"));
}

#[tokio::test]
async fn test_render_from_saved_dump_is_identical() {
    let dump = dump(&shop_catalog()).await.unwrap();
    let yaml = dump.to_yaml().unwrap();

    let loaded = SchemaDump::from_yaml(&yaml).unwrap();
    assert_eq!(loaded, dump);
    assert_eq!(render(&loaded), render(&dump));
}

#[tokio::test]
async fn test_dumping_twice_is_identical() {
    let catalog = shop_catalog();
    let first = dump(&catalog).await.unwrap();
    let second = dump(&catalog).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_foreign_key_annotation_comes_from_the_note() {
    let mut tables = HashMap::new();
    tables.insert(
        "members".to_string(),
        StaticTable {
            columns: vec![
                column("email", "varchar(255)", true, Some("Email (FK: accounts.id)")),
                column("legacy_id", "int", true, Some("FK: accounts.id")),
            ],
            ..Default::default()
        },
    );
    let dump = dump(&StaticCatalog { tables }).await.unwrap();
    let members = &dump.tables[0];

    assert_eq!(members.columns[0].fkey.as_deref(), Some("FK: accounts.id"));
    assert_eq!(members.columns[0].description.as_deref(), Some("Email"));
    assert_eq!(members.columns[1].fkey, None);
    assert_eq!(members.columns[1].description.as_deref(), Some("FK: accounts.id"));

    let text = render(&dump);
    assert!(text.contains(concat!(
        "   * - email\n     - varchar(255)\n     - False\n     - False\n     - \n",
        "     - `accounts.id <#accounts>`_\n     - Email\n",
    )));
    assert!(text.contains(concat!(
        "   * - legacy_id\n     - int\n     - False\n     - False\n     - \n",
        "     - \n     - FK: accounts.id\n",
    )));
}
