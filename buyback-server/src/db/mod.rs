//! Database Module
//!
//! Embedded SurrealDB storage (RocksDB backend).

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

const NAMESPACE: &str = "buyback";
const DATABASE: &str = "buyback";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the database at `db_path`
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        // order_number 全局唯一
        db.query(
            "DEFINE INDEX IF NOT EXISTS buyback_order_number \
             ON TABLE buyback_order COLUMNS order_number UNIQUE",
        )
        .await
        .map_err(|e| AppError::database(format!("Failed to define index: {e}")))?
        .check()
        .map_err(|e| AppError::database(format!("Failed to define index: {e}")))?;

        tracing::info!("Database connection established ({db_path})");

        Ok(Self { db })
    }
}
