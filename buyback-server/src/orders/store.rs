//! Order store port
//!
//! 订单存储适配器接口。生产实现是 SurrealDB 仓储
//! (`db::repository::SurrealOrderStore`)，测试注入内存实现。
//!
//! 所有状态协调都依赖 [`OrderStore::transition`] 的条件更新语义：
//! 读-判-写绝不拆开执行。

use async_trait::async_trait;

use crate::db::models::{BuybackOrder, OrderPatch, OrderStatus};
use crate::utils::AppResult;

/// Outcome of a conditional status write
#[derive(Debug)]
pub enum TransitionOutcome {
    /// The expected status matched; the patch was applied in the same statement
    Applied(BuybackOrder),
    /// Another writer moved the order first — the caller must not retry blindly
    Conflict,
}

/// Order Store Adapter — keyed document access, nothing more
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<BuybackOrder>>;

    /// Lookup by the human-facing secondary key (order number)
    async fn find_by_number(&self, number: &str) -> AppResult<Option<BuybackOrder>>;

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<BuybackOrder>>;

    async fn create(&self, order: BuybackOrder) -> AppResult<BuybackOrder>;

    /// Unconditional partial update (side-effect results: label urls, tracking)
    async fn merge(&self, id: &str, patch: OrderPatch) -> AppResult<BuybackOrder>;

    /// Conditional status transition: apply `patch` only where the current
    /// status equals `expected`, as a single statement.
    async fn transition(
        &self,
        id: &str,
        expected: OrderStatus,
        patch: OrderPatch,
    ) -> AppResult<TransitionOutcome>;

    /// Set `thread_id` only if previously unset; returns the winning id either way.
    async fn claim_thread(&self, id: &str, thread_id: &str) -> AppResult<String>;

    /// Orders in REOFFER_PENDING whose auto-resolve deadline has passed
    async fn due_reoffers(&self, now: i64) -> AppResult<Vec<BuybackOrder>>;
}
