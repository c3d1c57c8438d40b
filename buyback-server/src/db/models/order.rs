//! Buyback Order Model
//!
//! 订单生命周期的唯一实体。`status` 只能由状态机通过条件更新修改，
//! 任何协作方不得直接写入。

use super::serde_helpers;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

// =============================================================================
// Status
// =============================================================================

/// Order lifecycle status
///
/// `PENDING_SHIPMENT → LABEL_GENERATED → REOFFER_PENDING →
/// { OFFER_ACCEPTED | RETURN_REQUESTED | AUTO_ACCEPTED }`;
/// `RETURN_REQUESTED → RETURN_LABEL_GENERATED`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingShipment,
    LabelGenerated,
    ReofferPending,
    OfferAccepted,
    ReturnRequested,
    AutoAccepted,
    ReturnLabelGenerated,
}

impl OrderStatus {
    /// Terminal for this service: payment / physical-return handling is downstream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::OfferAccepted
                | OrderStatus::AutoAccepted
                | OrderStatus::ReturnLabelGenerated
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::PendingShipment => "PENDING_SHIPMENT",
            OrderStatus::LabelGenerated => "LABEL_GENERATED",
            OrderStatus::ReofferPending => "REOFFER_PENDING",
            OrderStatus::OfferAccepted => "OFFER_ACCEPTED",
            OrderStatus::ReturnRequested => "RETURN_REQUESTED",
            OrderStatus::AutoAccepted => "AUTO_ACCEPTED",
            OrderStatus::ReturnLabelGenerated => "RETURN_LABEL_GENERATED",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Sub-records
// =============================================================================

/// Buyer name / address / contact. Required complete before the first label;
/// not re-validated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// What is being bought back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// How a pending re-offer was resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReofferResolution {
    Accepted,
    Declined,
    AutoAccepted,
}

/// Revised price proposal issued after inspection
///
/// 新一轮 re-offer 整体覆盖旧记录；resolution 字段只允许写入一次。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reoffer {
    pub new_price: Decimal,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub created_at: i64,
    pub auto_resolve_deadline: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ReofferResolution>,
}

// =============================================================================
// Order (主表)
// =============================================================================

/// Buyback order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuybackOrder {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Human-facing secondary id, fixed NN-NNN shape, assigned once
    pub order_number: String,
    pub status: OrderStatus,
    pub shipping: ShippingInfo,
    pub device: DeviceInfo,
    /// Original offer baseline, set at creation
    pub estimated_quote: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reoffer: Option<Reoffer>,
    /// External conversation key, claimed at most once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_label_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_tracking_number: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_generated_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_requested_at: Option<i64>,
}

impl BuybackOrder {
    /// Record id as "table:key" string (empty before creation)
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }
}

// =============================================================================
// Partial update (MERGE)
// =============================================================================

/// Partial-update payload for `MERGE` — only set fields are written.
///
/// `status` 永远只通过 store 的条件更新 (`transition`) 携带。
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reoffer: Option<Reoffer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_label_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_generated_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_requested_at: Option<i64>,
}

// =============================================================================
// Request payloads
// =============================================================================

/// Submit order payload
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSubmit {
    pub shipping: ShippingInfo,
    pub device: DeviceInfo,
    pub estimated_quote: Decimal,
}

/// Submit re-offer payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReofferSubmit {
    pub new_price: Decimal,
    pub reasons: Vec<String>,
    #[serde(default)]
    pub comments: Option<String>,
}
