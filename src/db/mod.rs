use crate::{
    errors::DbError,
    models::{
        connections::{ConnectionConfig, DbType},
        schema::{ColumnSchema, ForeignKeySchema, IndexSchema, TableSchema},
    },
};
use async_trait::async_trait;

pub mod mysql;
pub mod postgres;

/// Read-only view of a database's structure.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Name of the inspected database; names the dump.
    fn database_name(&self) -> String;
    async fn list_tables(&self) -> Result<Vec<TableSchema>, DbError>;
    /// Columns in their ordinal order.
    async fn list_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, DbError>;
    async fn list_indexes(&self, table_name: &str) -> Result<Vec<IndexSchema>, DbError>;
    async fn list_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeySchema>, DbError>;
    async fn primary_key_columns(&self, table_name: &str) -> Result<Vec<String>, DbError>;
    /// Release the underlying connection pool.
    async fn close(&self);
}

pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn CatalogProvider>, DbError> {
    let catalog: Box<dyn CatalogProvider> = match config.db_type {
        DbType::MySql => Box::new(
            mysql::MySqlCatalog::connect(&config.database_url, &config.default_collation).await?,
        ),
        DbType::Postgres => Box::new(
            postgres::PostgresCatalog::connect(&config.database_url, config.postgres_schema())
                .await?,
        ),
    };
    Ok(catalog)
}
