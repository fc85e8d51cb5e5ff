use db::connect;
use errors::DbError;
use models::{connections::ConnectionConfig, dump::SchemaDump};

pub mod comment;
pub mod db;
pub mod dumper;
pub mod errors;
pub mod models;
pub mod output;
pub mod render;

/// Connect, dump every table and release the connection.
///
/// The pool is closed whether or not the dump succeeds.
pub async fn dump_database(config: &ConnectionConfig) -> Result<SchemaDump, DbError> {
    let catalog = connect(config).await?;
    dumper::dump_and_close(catalog.as_ref()).await
}
