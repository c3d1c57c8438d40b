//! External provider gateways
//!
//! 工单（买家沟通）与物流面单两个上游服务的窄接口。
//! 调用都发生在状态写入提交之后，超时视为瞬时失败，不回滚状态。

pub mod shipping;
pub mod ticketing;

pub use shipping::HttpLabelGateway;
pub use ticketing::HttpTicketGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::AppResult;

// =============================================================================
// Ticketing
// =============================================================================

/// Who the thread is opened on behalf of
#[derive(Debug, Clone, Serialize)]
pub struct ThreadRequester {
    pub name: String,
    pub email: String,
}

/// Thread/ticketing provider — one thread per order, comments append-only
#[async_trait]
pub trait TicketGateway: Send + Sync {
    /// Create a new conversation thread, returns the provider's thread id
    async fn create_thread(
        &self,
        requester: &ThreadRequester,
        subject: &str,
        body: &str,
        public: bool,
    ) -> AppResult<String>;

    /// Append a comment to an existing thread (never creates one)
    async fn append_comment(&self, thread_id: &str, body: &str, public: bool) -> AppResult<()>;
}

// =============================================================================
// Shipping labels
// =============================================================================

/// Postal address for a label request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Package dimensions/weight forwarded to the provider
#[derive(Debug, Clone, Serialize)]
pub struct PackageSpec {
    pub length_in: f64,
    pub width_in: f64,
    pub height_in: f64,
    pub weight_oz: f64,
}

impl Default for PackageSpec {
    fn default() -> Self {
        // Standard small-device mailer
        Self {
            length_in: 9.0,
            width_in: 6.0,
            height_in: 2.0,
            weight_oz: 16.0,
        }
    }
}

/// Label request — `reference` carries the human order number so the
/// physical label stays traceable without the internal store key
#[derive(Debug, Clone, Serialize)]
pub struct LabelRequest {
    pub ship_from: Address,
    pub ship_to: Address,
    pub package: PackageSpec,
    pub reference: String,
}

/// Successful label generation result
#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub label_url: String,
    pub tracking_number: String,
}

/// Shipping-label provider
#[async_trait]
pub trait LabelGateway: Send + Sync {
    async fn create_label(&self, request: &LabelRequest) -> AppResult<Label>;
}
