//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! PostgreSQL implementation of the recipe store gateway.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use galley_core::{
    EntityIdType, GalleyResult, Recipe, RecipeId, RecipeUpdate, StorageError, Timestamp,
};
use galley_storage::RecipeStore;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "galley".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("GALLEY_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("GALLEY_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("GALLEY_DB_NAME").unwrap_or_else(|_| "galley".to_string()),
            user: std::env::var("GALLEY_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("GALLEY_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("GALLEY_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("GALLEY_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(self.max_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Table layout for recipes. `seq` preserves insertion order for listings.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS recipes (
    id           UUID PRIMARY KEY,
    name         TEXT NOT NULL,
    tags         TEXT[] NOT NULL DEFAULT '{}',
    ingredients  TEXT[] NOT NULL DEFAULT '{}',
    instructions TEXT[] NOT NULL DEFAULT '{}',
    published_at TIMESTAMPTZ NOT NULL,
    seq          BIGSERIAL
)";

const SELECT_COLUMNS: &str = "id, name, tags, ingredients, instructions, published_at";

// ============================================================================
// POSTGRES RECIPE STORE
// ============================================================================

/// Recipe store backed by a PostgreSQL table.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct PgRecipeStore {
    pool: Pool,
}

impl PgRecipeStore {
    /// Create a new store with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new store from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the recipes table if it does not exist.
    pub async fn ensure_schema(&self) -> GalleyResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA_SQL)
            .await
            .map_err(|e| query_failed("ensure_schema", e))?;
        tracing::info!("Recipes schema ready");
        Ok(())
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> GalleyResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            tracing::error!("Connection pool error: {:?}", e);
            StorageError::ConnectionFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

fn query_failed(operation: &str, err: tokio_postgres::Error) -> galley_core::GalleyError {
    tracing::error!(operation, "Database error: {:?}", err);
    StorageError::QueryFailed {
        reason: err.to_string(),
    }
    .into()
}

fn recipe_from_row(row: &Row) -> GalleyResult<Recipe> {
    let decode = |e: tokio_postgres::Error| -> galley_core::GalleyError {
        StorageError::DecodeFailed {
            reason: e.to_string(),
        }
        .into()
    };

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let published_at: Timestamp = row.try_get("published_at").map_err(decode)?;

    Ok(Recipe {
        id: RecipeId::new(id),
        name: row.try_get("name").map_err(decode)?,
        tags: row.try_get("tags").map_err(decode)?,
        ingredients: row.try_get("ingredients").map_err(decode)?,
        instructions: row.try_get("instructions").map_err(decode)?,
        published_at,
    })
}

const INSERT_SQL: &str = "INSERT INTO recipes (id, name, tags, ingredients, instructions, published_at) \
     VALUES ($1, $2, $3, $4, $5, $6)";

fn insert_error(recipe: &Recipe, err: tokio_postgres::Error) -> galley_core::GalleyError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        return StorageError::InsertFailed {
            id: recipe.id,
            reason: "already exists".to_string(),
        }
        .into();
    }
    query_failed("insert", err)
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, recipe: &Recipe) -> GalleyResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            INSERT_SQL,
            &[
                &recipe.id.as_uuid(),
                &recipe.name,
                &recipe.tags,
                &recipe.ingredients,
                &recipe.instructions,
                &recipe.published_at,
            ],
        )
        .await
        .map_err(|e| insert_error(recipe, e))?;
        Ok(())
    }

    async fn insert_many(&self, recipes: &[Recipe]) -> GalleyResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| query_failed("insert_many", e))?;
        let stmt = tx
            .prepare(INSERT_SQL)
            .await
            .map_err(|e| query_failed("insert_many", e))?;

        for recipe in recipes {
            tx.execute(
                &stmt,
                &[
                    &recipe.id.as_uuid(),
                    &recipe.name,
                    &recipe.tags,
                    &recipe.ingredients,
                    &recipe.instructions,
                    &recipe.published_at,
                ],
            )
            .await
            .map_err(|e| insert_error(recipe, e))?;
        }

        tx.commit()
            .await
            .map_err(|e| query_failed("insert_many", e))?;
        Ok(())
    }

    async fn find_all(&self) -> GalleyResult<Vec<Recipe>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM recipes ORDER BY seq", SELECT_COLUMNS);
        let rows = conn
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| query_failed("find_all", e))?;
        rows.iter().map(recipe_from_row).collect()
    }

    async fn find_by_id(&self, id: RecipeId) -> GalleyResult<Option<Recipe>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM recipes WHERE id = $1", SELECT_COLUMNS);
        let row = conn
            .query_opt(sql.as_str(), &[&id.as_uuid()])
            .await
            .map_err(|e| query_failed("find_by_id", e))?;
        row.as_ref().map(recipe_from_row).transpose()
    }

    async fn update_by_id(&self, id: RecipeId, update: RecipeUpdate) -> GalleyResult<()> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE recipes SET name = $2, tags = $3, ingredients = $4, instructions = $5 \
                 WHERE id = $1",
                &[
                    &id.as_uuid(),
                    &update.name,
                    &update.tags,
                    &update.ingredients,
                    &update.instructions,
                ],
            )
            .await
            .map_err(|e| query_failed("update_by_id", e))?;

        if updated == 0 {
            return Err(StorageError::NotFound { id }.into());
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: RecipeId) -> GalleyResult<()> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM recipes WHERE id = $1", &[&id.as_uuid()])
            .await
            .map_err(|e| query_failed("delete_by_id", e))?;

        if deleted == 0 {
            return Err(StorageError::NotFound { id }.into());
        }
        Ok(())
    }

    async fn ping(&self) -> GalleyResult<()> {
        let conn = self.get_conn().await?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(|e| query_failed("ping", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "galley");
        assert_eq!(config.max_size, 16);
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        // Building the pool does not connect; an unreachable host only
        // surfaces on first use.
        let config = DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            timeout: Duration::from_millis(200),
            ..DbConfig::default()
        };
        let store = PgRecipeStore::from_config(&config).unwrap();
        assert_eq!(store.pool_size(), 0);

        let err = store.ping().await.unwrap_err();
        assert!(matches!(
            err,
            galley_core::GalleyError::Storage(StorageError::ConnectionFailed { .. })
        ));
    }

    #[test]
    fn test_schema_orders_by_sequence() {
        assert!(SCHEMA_SQL.contains("seq          BIGSERIAL"));
        assert!(SCHEMA_SQL.contains("IF NOT EXISTS"));
    }
}
