use async_trait::async_trait;
use log::debug;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool, Row};

use crate::{
    errors::DbError,
    models::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, TableSchema},
};

use super::CatalogProvider;

pub struct MySqlCatalog {
    pub pool: MySqlPool,
    database: String,
    default_collation: String,
}

impl MySqlCatalog {
    pub async fn connect(database_url: &str, default_collation: &str) -> Result<Self, DbError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let database: Option<String> = sqlx::query_scalar("SELECT DATABASE()")
            .fetch_one(&pool)
            .await
            .map_err(DbError::Sqlx)?;
        let database = database
            .ok_or_else(|| DbError::Config("database_url does not select a database".to_string()))?;

        Ok(Self {
            pool,
            database,
            default_collation: default_collation.to_string(),
        })
    }

    /// Collation (when not the default) followed by `EXTRA` flags.
    fn column_options(&self, collation: Option<String>, extra: Option<String>) -> Vec<String> {
        let mut options = Vec::new();
        if let Some(collation) = collation.filter(|c| !c.is_empty()) {
            if collation != self.default_collation {
                options.push(collation);
            }
        }
        if let Some(extra) = extra.filter(|e| !e.is_empty()) {
            options.push(extra);
        }
        options
    }
}

/// Fold rows ordered by key name into one entry per key.
fn group_by_name<T>(rows: impl IntoIterator<Item = (String, T)>) -> Vec<(String, Vec<T>)> {
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for (name, item) in rows {
        match groups.last_mut() {
            Some((last, items)) if *last == name => items.push(item),
            _ => groups.push((name, vec![item])),
        }
    }
    groups
}

#[async_trait]
impl CatalogProvider for MySqlCatalog {
    fn database_name(&self) -> String {
        self.database.clone()
    }

    async fn list_tables(&self) -> Result<Vec<TableSchema>, DbError> {
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name,
                   CAST(TABLE_COMMENT AS CHAR) AS table_comment
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        rows.iter()
            .map(|row| {
                Ok::<_, DbError>(TableSchema {
                    table_name: row.try_get("table_name")?,
                    comment: row.try_get("table_comment")?,
                })
            })
            .collect()
    }

    async fn list_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, DbError> {
        debug!("reading columns of {}", table_name);
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
                   CAST(COLUMN_TYPE AS CHAR) AS column_type,
                   CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                   CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                   CAST(COLLATION_NAME AS CHAR) AS collation_name,
                   CAST(EXTRA AS CHAR) AS extra,
                   CAST(COLUMN_COMMENT AS CHAR) AS column_comment
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;
        let rows = sqlx::query(query)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        rows.iter()
            .map(|row| {
                Ok::<_, DbError>(ColumnSchema {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("column_type")?,
                    is_nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                    default: row.try_get("column_default")?,
                    comment: row.try_get("column_comment")?,
                    options: self.column_options(
                        row.try_get("collation_name")?,
                        row.try_get("extra")?,
                    ),
                })
            })
            .collect()
    }

    async fn list_indexes(&self, table_name: &str) -> Result<Vec<IndexSchema>, DbError> {
        let query = r#"
            SELECT CAST(INDEX_NAME AS CHAR) AS index_name,
                   CAST(NON_UNIQUE AS SIGNED) AS non_unique,
                   CAST(COLUMN_NAME AS CHAR) AS column_name
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME <> 'PRIMARY'
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;
        let rows = sqlx::query(query)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        let entries = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("index_name")?;
                let non_unique: i64 = row.try_get("non_unique")?;
                let column: Option<String> = row.try_get("column_name")?;
                Ok::<_, DbError>((name, (non_unique == 0, column)))
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(group_by_name(entries)
            .into_iter()
            .map(|(name, parts)| IndexSchema {
                is_unique: parts.first().map(|(unique, _)| *unique).unwrap_or(false),
                columns: parts.into_iter().filter_map(|(_, column)| column).collect(),
                name,
            })
            .collect())
    }

    async fn list_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeySchema>, DbError> {
        let query = r#"
            SELECT CAST(CONSTRAINT_NAME AS CHAR) AS constraint_name,
                   CAST(COLUMN_NAME AS CHAR) AS column_name,
                   CAST(REFERENCED_TABLE_NAME AS CHAR) AS referred_table,
                   CAST(REFERENCED_COLUMN_NAME AS CHAR) AS referred_column
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
              AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;
        let rows = sqlx::query(query)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        let entries = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("constraint_name")?;
                let column: String = row.try_get("column_name")?;
                let referred_table: String = row.try_get("referred_table")?;
                let referred_column: String = row.try_get("referred_column")?;
                Ok::<_, DbError>((name, (column, referred_table, referred_column)))
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(group_by_name(entries)
            .into_iter()
            .map(|(name, parts)| ForeignKeySchema {
                referred_table: parts
                    .first()
                    .map(|(_, table, _)| table.clone())
                    .unwrap_or_default(),
                constrained_columns: parts.iter().map(|(c, _, _)| c.clone()).collect(),
                referred_columns: parts.into_iter().map(|(_, _, r)| r).collect(),
                name,
            })
            .collect())
    }

    async fn primary_key_columns(&self, table_name: &str) -> Result<Vec<String>, DbError> {
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR) AS column_name
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;
        let rows = sqlx::query(query)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        rows.iter()
            .map(|row| row.try_get("column_name").map_err(DbError::Sqlx))
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
