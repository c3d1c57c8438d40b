//! Lifecycle test fixtures
//!
//! 内存存储实现与 SurrealDB 仓储相同的条件更新语义（锁内判断 + 写入），
//! 录制型网关记录每次上游调用并支持注入失败。

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use surrealdb::RecordId;

use crate::db::models::{
    BuybackOrder, DeviceInfo, OrderPatch, OrderStatus, OrderSubmit, ShippingInfo,
};
use crate::orders::labels::LabelResolver;
use crate::orders::lifecycle::{LifecycleSettings, OrderLifecycle};
use crate::orders::store::{OrderStore, TransitionOutcome};
use crate::orders::thread::ThreadBinder;
use crate::services::{Address, Label, LabelGateway, LabelRequest, ThreadRequester, TicketGateway};
use crate::utils::{AppError, AppResult};

mod test_labels;
mod test_reoffer;

const TABLE: &str = "buyback_order";

// ========================================================================
// In-memory order store
// ========================================================================

#[derive(Default)]
pub struct MemoryStore {
    orders: Mutex<HashMap<String, BuybackOrder>>,
    seq: AtomicU64,
    /// Force every order-number lookup to collide (exhaustion tests)
    pub force_number_collisions: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-only: rewind a pending re-offer's deadline
    pub fn set_reoffer_deadline(&self, id: &str, deadline: i64) {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&key_of(id)).expect("order exists");
        let reoffer = order.reoffer.as_mut().expect("reoffer present");
        reoffer.auto_resolve_deadline = deadline;
    }
}

fn apply_patch(order: &mut BuybackOrder, patch: OrderPatch) {
    if let Some(status) = patch.status {
        order.status = status;
    }
    if let Some(reoffer) = patch.reoffer {
        order.reoffer = Some(reoffer);
    }
    if let Some(v) = patch.label_url {
        order.label_url = Some(v);
    }
    if let Some(v) = patch.tracking_number {
        order.tracking_number = Some(v);
    }
    if let Some(v) = patch.return_label_url {
        order.return_label_url = Some(v);
    }
    if let Some(v) = patch.return_tracking_number {
        order.return_tracking_number = Some(v);
    }
    if let Some(v) = patch.label_generated_at {
        order.label_generated_at = Some(v);
    }
    if let Some(v) = patch.accepted_at {
        order.accepted_at = Some(v);
    }
    if let Some(v) = patch.return_requested_at {
        order.return_requested_at = Some(v);
    }
}

fn key_of(id: &str) -> String {
    match id.split_once(':') {
        Some((_, key)) => key.to_string(),
        None => id.to_string(),
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<BuybackOrder>> {
        Ok(self.orders.lock().unwrap().get(&key_of(id)).cloned())
    }

    async fn find_by_number(&self, number: &str) -> AppResult<Option<BuybackOrder>> {
        let orders = self.orders.lock().unwrap();
        if self.force_number_collisions.load(Ordering::SeqCst) {
            return Ok(orders.values().next().cloned());
        }
        Ok(orders.values().find(|o| o.order_number == number).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<BuybackOrder>> {
        let orders = self.orders.lock().unwrap();
        let mut all: Vec<_> = orders.values().cloned().collect();
        all.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn create(&self, mut order: BuybackOrder) -> AppResult<BuybackOrder> {
        let key = format!("mem{}", self.seq.fetch_add(1, Ordering::SeqCst));
        order.id = Some(RecordId::from_table_key(TABLE, key.as_str()));
        self.orders.lock().unwrap().insert(key, order.clone());
        Ok(order)
    }

    async fn merge(&self, id: &str, patch: OrderPatch) -> AppResult<BuybackOrder> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(&key_of(id))
            .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
        apply_patch(order, patch);
        Ok(order.clone())
    }

    async fn transition(
        &self,
        id: &str,
        expected: OrderStatus,
        patch: OrderPatch,
    ) -> AppResult<TransitionOutcome> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(&key_of(id))
            .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
        // Check-and-write under one lock, like the single UPDATE statement
        if order.status != expected {
            return Ok(TransitionOutcome::Conflict);
        }
        apply_patch(order, patch);
        Ok(TransitionOutcome::Applied(order.clone()))
    }

    async fn claim_thread(&self, id: &str, thread_id: &str) -> AppResult<String> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(&key_of(id))
            .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
        match &order.thread_id {
            Some(existing) => Ok(existing.clone()),
            None => {
                order.thread_id = Some(thread_id.to_string());
                Ok(thread_id.to_string())
            }
        }
    }

    async fn due_reoffers(&self, now: i64) -> AppResult<Vec<BuybackOrder>> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .values()
            .filter(|o| {
                o.status == OrderStatus::ReofferPending
                    && o.reoffer
                        .as_ref()
                        .is_some_and(|r| r.auto_resolve_deadline <= now)
            })
            .cloned()
            .collect())
    }
}

// ========================================================================
// Recording ticket gateway
// ========================================================================

#[derive(Debug, Clone)]
pub struct CreatedThread {
    pub id: String,
    pub requester_email: String,
    pub subject: String,
    pub body: String,
    pub public: bool,
}

#[derive(Debug, Clone)]
pub struct PostedComment {
    pub thread_id: String,
    pub body: String,
    pub public: bool,
}

#[derive(Default)]
pub struct RecordingTickets {
    pub threads: Mutex<Vec<CreatedThread>>,
    pub comments: Mutex<Vec<PostedComment>>,
    seq: AtomicU64,
    /// Fail every comment append (upstream outage)
    pub fail_comments: AtomicBool,
    /// Fail comment appends for specific thread ids only
    pub fail_comment_threads: Mutex<HashSet<String>>,
}

impl RecordingTickets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.lock().unwrap().len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.lock().unwrap().len()
    }
}

#[async_trait]
impl TicketGateway for RecordingTickets {
    async fn create_thread(
        &self,
        requester: &ThreadRequester,
        subject: &str,
        body: &str,
        public: bool,
    ) -> AppResult<String> {
        let id = format!("thread-{}", self.seq.fetch_add(1, Ordering::SeqCst));
        self.threads.lock().unwrap().push(CreatedThread {
            id: id.clone(),
            requester_email: requester.email.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
            public,
        });
        Ok(id)
    }

    async fn append_comment(&self, thread_id: &str, body: &str, public: bool) -> AppResult<()> {
        if self.fail_comments.load(Ordering::SeqCst)
            || self
                .fail_comment_threads
                .lock()
                .unwrap()
                .contains(thread_id)
        {
            return Err(AppError::upstream("Ticketing service unreachable: injected"));
        }
        self.comments.lock().unwrap().push(PostedComment {
            thread_id: thread_id.to_string(),
            body: body.to_string(),
            public,
        });
        Ok(())
    }
}

// ========================================================================
// Recording label gateway
// ========================================================================

#[derive(Default)]
pub struct RecordingLabels {
    pub requests: Mutex<Vec<LabelRequest>>,
    seq: AtomicU64,
    /// Fail every label call (provider outage)
    pub fail: AtomicBool,
}

impl RecordingLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LabelGateway for RecordingLabels {
    async fn create_label(&self, request: &LabelRequest) -> AppResult<Label> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::upstream("Label service unreachable: injected"));
        }
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        Ok(Label {
            label_url: format!("https://labels.test/{n}.pdf"),
            tracking_number: format!("TRK{n:08}"),
        })
    }
}

// ========================================================================
// Harness
// ========================================================================

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub tickets: Arc<RecordingTickets>,
    pub labels: Arc<RecordingLabels>,
    pub lifecycle: Arc<OrderLifecycle>,
}

pub fn warehouse_address() -> Address {
    Address {
        name: "Buyback Intake".to_string(),
        street: "100 Warehouse Way".to_string(),
        city: "Austin".to_string(),
        state: "TX".to_string(),
        postal_code: "78701".to_string(),
        phone: None,
    }
}

pub fn create_test_harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let tickets = Arc::new(RecordingTickets::new());
    let labels = Arc::new(RecordingLabels::new());

    let lifecycle = Arc::new(OrderLifecycle::new(
        store.clone(),
        ThreadBinder::new(store.clone(), tickets.clone()),
        LabelResolver::new(labels.clone(), warehouse_address()),
        LifecycleSettings {
            reoffer_window_days: 7,
            portal_url: "https://portal.test".to_string(),
        },
    ));

    TestHarness {
        store,
        tickets,
        labels,
        lifecycle,
    }
}

pub fn test_shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Jamie Rivera".to_string(),
        email: "jamie@example.com".to_string(),
        phone: Some("555-0134".to_string()),
        street: "42 Elm Street".to_string(),
        city: "Portland".to_string(),
        state: "OR".to_string(),
        postal_code: "97201".to_string(),
    }
}

pub fn test_submit() -> OrderSubmit {
    OrderSubmit {
        shipping: test_shipping(),
        device: DeviceInfo {
            model: "Pixel 9".to_string(),
            carrier: Some("Verizon".to_string()),
            condition: Some("good".to_string()),
        },
        estimated_quote: Decimal::new(42_000, 2), // 420.00
    }
}

/// Submit one order and return it
pub async fn submit_order(harness: &TestHarness) -> BuybackOrder {
    harness
        .lifecycle
        .submit(test_submit())
        .await
        .expect("submit succeeds")
}

/// Submit and advance into REOFFER_PENDING with a 350.00 re-offer
pub async fn order_in_reoffer(harness: &TestHarness) -> BuybackOrder {
    use crate::db::models::ReofferSubmit;
    use crate::orders::lifecycle::Trigger;

    let order = submit_order(harness).await;
    let id = order.id_string();
    harness
        .lifecycle
        .apply(&id, Trigger::GenerateLabel)
        .await
        .expect("label succeeds");
    harness
        .lifecycle
        .apply(
            &id,
            Trigger::SubmitReoffer(ReofferSubmit {
                new_price: Decimal::new(35_000, 2), // 350.00
                reasons: vec!["cracked screen".to_string()],
                comments: None,
            }),
        )
        .await
        .expect("re-offer succeeds")
}
