//! Buyback Order Repository
//!
//! 状态转换必须是单条条件 UPDATE（`WHERE status = $expected`），
//! 这是跨进程 / 跨调度周期的唯一协调手段。

use async_trait::async_trait;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{BuybackOrder, OrderPatch, OrderStatus};
use crate::orders::store::{OrderStore, TransitionOutcome};
use crate::utils::AppResult;

const TABLE: &str = "buyback_order";

#[derive(Clone)]
pub struct SurrealOrderStore {
    base: BaseRepository,
}

impl SurrealOrderStore {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Accepts both "buyback_order:key" and bare "key"
    fn record_id(id: &str) -> RepoResult<RecordId> {
        if id.contains(':') {
            id.parse()
                .map_err(|_| RepoError::NotFound(format!("Invalid order ID format: {id}")))
        } else {
            Ok(RecordId::from_table_key(TABLE, id))
        }
    }

    async fn get(&self, id: &str) -> RepoResult<Option<BuybackOrder>> {
        let rid = Self::record_id(id)?;
        let order: Option<BuybackOrder> = self.base.db().select(rid).await?;
        Ok(order)
    }

    async fn get_by_number(&self, number: &str) -> RepoResult<Option<BuybackOrder>> {
        let number = number.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM buyback_order WHERE order_number = $number LIMIT 1")
            .bind(("number", number))
            .await?;
        let orders: Vec<BuybackOrder> = result.take(0)?;
        Ok(orders.into_iter().next())
    }
}

#[async_trait]
impl OrderStore for SurrealOrderStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<BuybackOrder>> {
        Ok(self.get(id).await?)
    }

    async fn find_by_number(&self, number: &str) -> AppResult<Option<BuybackOrder>> {
        Ok(self.get_by_number(number).await?)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<BuybackOrder>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM buyback_order ORDER BY created_at DESC LIMIT $limit START $offset")
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await
            .map_err(RepoError::from)?;
        let orders: Vec<BuybackOrder> = result.take(0).map_err(RepoError::from)?;
        Ok(orders)
    }

    async fn create(&self, order: BuybackOrder) -> AppResult<BuybackOrder> {
        let created: Option<BuybackOrder> = self
            .base
            .db()
            .create(TABLE)
            .content(order)
            .await
            .map_err(RepoError::from)?;
        Ok(created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))?)
    }

    async fn merge(&self, id: &str, patch: OrderPatch) -> AppResult<BuybackOrder> {
        let rid = Self::record_id(id)?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $rid MERGE $patch RETURN AFTER")
            .bind(("rid", rid))
            .bind(("patch", patch))
            .await
            .map_err(RepoError::from)?;
        let orders: Vec<BuybackOrder> = result.take(0).map_err(RepoError::from)?;
        Ok(orders
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))?)
    }

    async fn transition(
        &self,
        id: &str,
        expected: OrderStatus,
        patch: OrderPatch,
    ) -> AppResult<TransitionOutcome> {
        let rid = Self::record_id(id)?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $rid MERGE $patch WHERE status = $expected RETURN AFTER")
            .bind(("rid", rid))
            .bind(("patch", patch))
            .bind(("expected", expected))
            .await
            .map_err(RepoError::from)?;
        let orders: Vec<BuybackOrder> = result.take(0).map_err(RepoError::from)?;

        match orders.into_iter().next() {
            Some(order) => Ok(TransitionOutcome::Applied(order)),
            // No row matched: either the order is gone or another writer won
            None => match self.get(id).await? {
                Some(_) => Ok(TransitionOutcome::Conflict),
                None => Err(RepoError::NotFound(format!("Order {id} not found")).into()),
            },
        }
    }

    async fn claim_thread(&self, id: &str, thread_id: &str) -> AppResult<String> {
        let rid = Self::record_id(id)?;
        let tid = thread_id.to_string();
        let mut result = self
            .base
            .db()
            .query("UPDATE $rid SET thread_id = $tid WHERE thread_id = NONE RETURN AFTER")
            .bind(("rid", rid))
            .bind(("tid", tid))
            .await
            .map_err(RepoError::from)?;
        let orders: Vec<BuybackOrder> = result.take(0).map_err(RepoError::from)?;

        if orders.is_empty() {
            // Lost the claim — adopt whatever is already persisted
            let existing = self
                .get(id)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))?;
            return Ok(existing.thread_id.unwrap_or_else(|| thread_id.to_string()));
        }
        Ok(thread_id.to_string())
    }

    async fn due_reoffers(&self, now: i64) -> AppResult<Vec<BuybackOrder>> {
        let mut result = self
            .base
            .db()
            .query(
                r#"
                SELECT * FROM buyback_order
                WHERE status = $status AND reoffer.auto_resolve_deadline <= $now
                ORDER BY reoffer.auto_resolve_deadline
                "#,
            )
            .bind(("status", OrderStatus::ReofferPending))
            .bind(("now", now))
            .await
            .map_err(RepoError::from)?;
        let orders: Vec<BuybackOrder> = result.take(0).map_err(RepoError::from)?;
        Ok(orders)
    }
}
