//! Conversation thread binder
//!
//! 每个订单至多绑定一个外部会话线程。首次对外沟通时创建，
//! 之后全部复用。并发创建由存储端的条件写入仲裁：
//! `thread_id` 只在尚未设置时写入，输掉的一方收养胜者的线程。

use std::sync::Arc;

use crate::db::models::BuybackOrder;
use crate::orders::store::OrderStore;
use crate::services::{ThreadRequester, TicketGateway};
use crate::utils::{AppError, AppResult};

/// Result of `ensure_thread`
#[derive(Debug)]
pub struct EnsuredThread {
    pub thread_id: String,
    /// Whether this call created the thread (and won the claim)
    pub created: bool,
}

pub struct ThreadBinder {
    store: Arc<dyn OrderStore>,
    tickets: Arc<dyn TicketGateway>,
}

impl ThreadBinder {
    pub fn new(store: Arc<dyn OrderStore>, tickets: Arc<dyn TicketGateway>) -> Self {
        Self { store, tickets }
    }

    /// Return the order's thread, creating it on first need.
    ///
    /// `opening_body` becomes the thread's first message when this call
    /// creates it; callers that lose the claim race must post separately
    /// (see [`ThreadBinder::post`]).
    pub async fn ensure_thread(
        &self,
        order: &BuybackOrder,
        subject: &str,
        opening_body: &str,
        public: bool,
    ) -> AppResult<EnsuredThread> {
        if let Some(thread_id) = &order.thread_id {
            return Ok(EnsuredThread {
                thread_id: thread_id.clone(),
                created: false,
            });
        }

        let requester = ThreadRequester {
            name: order.shipping.name.clone(),
            email: order.shipping.email.clone(),
        };
        let thread_id = self
            .tickets
            .create_thread(&requester, subject, opening_body, public)
            .await?;

        // Single-writer guarantee: conditional claim on thread_id being unset
        let winner = self.store.claim_thread(&order.id_string(), &thread_id).await?;
        if winner != thread_id {
            tracing::warn!(
                order = %order.order_number,
                orphan = %thread_id,
                winner = %winner,
                "Lost thread claim race, adopting existing thread"
            );
            return Ok(EnsuredThread {
                thread_id: winner,
                created: false,
            });
        }

        tracing::info!(order = %order.order_number, thread = %thread_id, "Thread created");
        Ok(EnsuredThread {
            thread_id,
            created: true,
        })
    }

    /// Deliver a message on the order's thread, creating the thread first if
    /// the order has none. Returns the thread id used.
    pub async fn post(
        &self,
        order: &BuybackOrder,
        subject: &str,
        body: &str,
        public: bool,
    ) -> AppResult<String> {
        if let Some(thread_id) = &order.thread_id {
            self.tickets.append_comment(thread_id, body, public).await?;
            return Ok(thread_id.clone());
        }

        let ensured = self.ensure_thread(order, subject, body, public).await?;
        if !ensured.created {
            // Thread existed after all — the body was not its opening message
            self.tickets
                .append_comment(&ensured.thread_id, body, public)
                .await?;
        }
        Ok(ensured.thread_id)
    }

    /// Internal (agent-only) note on an existing thread
    pub async fn post_internal(&self, order: &BuybackOrder, body: &str) -> AppResult<()> {
        let thread_id = order
            .thread_id
            .as_deref()
            .ok_or_else(|| AppError::internal("Order has no thread for internal note"))?;
        self.tickets.append_comment(thread_id, body, false).await
    }
}
