use async_trait::async_trait;
use log::debug;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::{
    errors::DbError,
    models::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, TableSchema},
};

use super::CatalogProvider;

pub struct PostgresCatalog {
    pub pool: PgPool,
    database: String,
    schema: String,
}

impl PostgresCatalog {
    pub async fn connect(database_url: &str, schema: &str) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let database: String = sqlx::query_scalar("SELECT current_database()::text")
            .fetch_one(&pool)
            .await
            .map_err(DbError::Sqlx)?;

        Ok(Self {
            pool,
            database,
            schema: schema.to_string(),
        })
    }
}

#[async_trait]
impl CatalogProvider for PostgresCatalog {
    fn database_name(&self) -> String {
        self.database.clone()
    }

    async fn list_tables(&self) -> Result<Vec<TableSchema>, DbError> {
        let query = r#"
            SELECT c.relname::text AS table_name,
                   obj_description(c.oid, 'pg_class') AS table_comment
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relkind IN ('r', 'p')
            ORDER BY c.relname
        "#;
        let rows = sqlx::query(query)
            .bind(&self.schema)
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
        debug!("reading columns of {}.{}", self.schema, table_name);
        let query = r#"
            SELECT a.attname::text AS column_name,
                   format_type(a.atttypid, a.atttypmod) AS data_type,
                   NOT a.attnotnull AS is_nullable,
                   pg_get_expr(d.adbin, d.adrelid) AS column_default,
                   col_description(a.attrelid, a.attnum) AS column_comment
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE n.nspname = $1 AND c.relname = $2
              AND a.attnum > 0 AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;
        let rows = sqlx::query(query)
            .bind(&self.schema)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        rows.iter()
            .map(|row| {
                Ok::<_, DbError>(ColumnSchema {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    is_nullable: row.try_get("is_nullable")?,
                    default: row.try_get("column_default")?,
                    comment: row.try_get("column_comment")?,
                    options: Vec::new(),
                })
            })
            .collect()
    }

    async fn list_indexes(&self, table_name: &str) -> Result<Vec<IndexSchema>, DbError> {
        let query = r#"
            SELECT ic.relname::text AS index_name,
                   i.indisunique AS is_unique,
                   ARRAY(
                       SELECT a.attname::text
                       FROM unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
                       JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = k.attnum
                       ORDER BY k.ord
                   ) AS columns
            FROM pg_index i
            JOIN pg_class c ON c.oid = i.indrelid
            JOIN pg_class ic ON ic.oid = i.indexrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2 AND NOT i.indisprimary
            ORDER BY ic.relname
        "#;
        let rows = sqlx::query(query)
            .bind(&self.schema)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        rows.iter()
            .map(|row| {
                Ok::<_, DbError>(IndexSchema {
                    name: row.try_get("index_name")?,
                    columns: row.try_get("columns")?,
                    is_unique: row.try_get("is_unique")?,
                })
            })
            .collect()
    }

    async fn list_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeySchema>, DbError> {
        let query = r#"
            SELECT con.conname::text AS constraint_name,
                   rc.relname::text AS referred_table,
                   ARRAY(
                       SELECT a.attname::text
                       FROM unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
                       JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
                       ORDER BY k.ord
                   ) AS constrained_columns,
                   ARRAY(
                       SELECT a.attname::text
                       FROM unnest(con.confkey) WITH ORDINALITY AS k(attnum, ord)
                       JOIN pg_attribute a ON a.attrelid = con.confrelid AND a.attnum = k.attnum
                       ORDER BY k.ord
                   ) AS referred_columns
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_class rc ON rc.oid = con.confrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE con.contype = 'f' AND n.nspname = $1 AND c.relname = $2
            ORDER BY con.conname
        "#;
        let rows = sqlx::query(query)
            .bind(&self.schema)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        rows.iter()
            .map(|row| {
                Ok::<_, DbError>(ForeignKeySchema {
                    name: row.try_get("constraint_name")?,
                    constrained_columns: row.try_get("constrained_columns")?,
                    referred_table: row.try_get("referred_table")?,
                    referred_columns: row.try_get("referred_columns")?,
                })
            })
            .collect()
    }

    async fn primary_key_columns(&self, table_name: &str) -> Result<Vec<String>, DbError> {
        let query = r#"
            SELECT a.attname::text AS column_name
            FROM pg_index i
            JOIN pg_class c ON c.oid = i.indrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
            WHERE n.nspname = $1 AND c.relname = $2 AND i.indisprimary
        "#;
        let rows = sqlx::query(query)
            .bind(&self.schema)
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
