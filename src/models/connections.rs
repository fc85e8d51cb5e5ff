use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::DbError;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Postgres,
    MySql,
}

fn default_collation() -> String {
    "utf8_general_ci".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    pub db_type: DbType,
    pub database_url: String,
    /// Postgres namespace to inspect; `public` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// MySQL collation that is considered the default and not annotated.
    #[serde(default = "default_collation")]
    pub default_collation: String,
}

impl ConnectionConfig {
    pub fn new(db_type: DbType, database_url: impl Into<String>) -> Self {
        Self {
            db_type,
            database_url: database_url.into(),
            schema: None,
            default_collation: default_collation(),
        }
    }

    /// Load a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DbError> {
        let config: ConnectionConfig =
            serde_yaml::from_str(yaml).map_err(|e| DbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the URL with `DATABASE_URL` when it is set in the environment.
    pub fn with_env_override(mut self) -> Result<Self, DbError> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
            self.validate()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), DbError> {
        if self.database_url.trim().is_empty() {
            return Err(DbError::Config("database_url must not be empty".to_string()));
        }

        let schemes: &[&str] = match self.db_type {
            DbType::MySql => &["mysql://"],
            DbType::Postgres => &["postgres://", "postgresql://"],
        };
        if !schemes.iter().any(|s| self.database_url.starts_with(s)) {
            return Err(DbError::Config(format!(
                "database_url does not match db_type {:?} (expected {})",
                self.db_type,
                schemes.join(" or ")
            )));
        }

        Ok(())
    }

    pub fn postgres_schema(&self) -> &str {
        self.schema.as_deref().unwrap_or("public")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_defaults() {
        let config = ConnectionConfig::from_yaml(
            "db_type: mysql\ndatabase_url: mysql://root@localhost/shop\n",
        )
        .unwrap();

        assert_eq!(config.db_type, DbType::MySql);
        assert_eq!(config.default_collation, "utf8_general_ci");
        assert_eq!(config.postgres_schema(), "public");
    }

    #[test]
    fn test_from_yaml_postgres_schema() {
        let config = ConnectionConfig::from_yaml(
            "db_type: postgres\ndatabase_url: postgresql://localhost/shop\nschema: sales\n",
        )
        .unwrap();

        assert_eq!(config.postgres_schema(), "sales");
    }

    #[test]
    fn test_scheme_mismatch_is_rejected() {
        let result = ConnectionConfig::from_yaml(
            "db_type: postgres\ndatabase_url: mysql://root@localhost/shop\n",
        );

        assert!(matches!(result, Err(DbError::Config(_))));
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let config = ConnectionConfig::new(DbType::MySql, "  ");
        assert!(config.validate().is_err());
    }
}
