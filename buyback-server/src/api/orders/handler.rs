//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::models::{BuybackOrder, OrderStatus, OrderSubmit, ReofferSubmit};
use crate::orders::sweep::{self, SweepReport};
use crate::orders::Trigger;
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Submit a new buyback order
pub async fn submit(
    State(state): State<ServerState>,
    Json(payload): Json<OrderSubmit>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state.lifecycle.submit(payload).await?;
    Ok(ok_with_message(order, "Order submitted"))
}

/// List all orders (paginated)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Vec<BuybackOrder>>>> {
    let orders = state.store.find_all(query.limit, query.offset).await?;
    Ok(ok(orders))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
    Ok(ok(order))
}

/// Get order by human order number
pub async fn get_by_number(
    State(state): State<ServerState>,
    Path(number): Path<String>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state
        .store
        .find_by_number(&number)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {number} not found")))?;
    Ok(ok(order))
}

/// Generate the outbound (customer → warehouse) shipping label
pub async fn generate_label(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state.lifecycle.apply(&id, Trigger::GenerateLabel).await?;
    Ok(ok_with_message(order, "Label generated"))
}

/// Generate the return (warehouse → customer) shipping label
pub async fn generate_return_label(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state
        .lifecycle
        .apply(&id, Trigger::GenerateReturnLabel)
        .await?;
    Ok(ok_with_message(order, "Return label generated"))
}

/// Submit a revised offer after inspection
pub async fn submit_reoffer(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ReofferSubmit>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state
        .lifecycle
        .apply(&id, Trigger::SubmitReoffer(payload))
        .await?;
    Ok(ok_with_message(order, "Re-offer submitted"))
}

/// Buyer accepts the pending re-offer
pub async fn accept_reoffer(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state.lifecycle.apply(&id, Trigger::Accept).await?;
    Ok(ok_with_message(order, "Re-offer accepted"))
}

/// Buyer declines the pending re-offer and requests the device back
pub async fn decline_reoffer(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state.lifecycle.apply(&id, Trigger::Decline).await?;
    Ok(ok_with_message(order, "Re-offer declined, return requested"))
}

/// Update status request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Request an explicit status — routed through the state machine
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<AppResponse<BuybackOrder>>> {
    let order = state.lifecycle.request_status(&id, payload.status).await?;
    Ok(ok_with_message(order, "Status updated"))
}

/// Scheduler trigger: sweep due re-offers now
pub async fn sweep_reoffers(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<SweepReport>>> {
    let report = sweep::sweep_once(&state.lifecycle).await?;
    Ok(ok_with_message(report, "Sweep finished"))
}
