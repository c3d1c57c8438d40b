//! Order lifecycle state machine
//!
//! 所有状态转换集中在这里：一个纯函数 [`plan`] 负责校验前置条件并
//! 产出 (期望状态, 补丁, 副作用清单)，[`OrderLifecycle`] 负责用
//! 条件更新提交补丁、提交成功后依次执行副作用。
//!
//! 顺序是正确性的关键：副作用（工单、面单）永远发生在状态写入
//! 提交之后。副作用失败向上抛 502，但已提交的状态不回滚；
//! 恢复路径是对同状态订单重试缺失的副作用。

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::db::models::{
    BuybackOrder, OrderPatch, OrderStatus, OrderSubmit, Reoffer, ReofferResolution, ReofferSubmit,
};
use crate::orders::labels::{LabelDirection, LabelResolver, validate_shipping};
use crate::orders::number;
use crate::orders::store::{OrderStore, TransitionOutcome};
use crate::orders::thread::ThreadBinder;
use crate::utils::validation::{MAX_NOTE_LEN, validate_email, validate_optional_text,
    validate_required_text, MAX_NAME_LEN};
use crate::utils::{AppError, AppResult, time};

// =============================================================================
// Triggers and plans
// =============================================================================

/// What is being asked of the state machine
#[derive(Debug, Clone)]
pub enum Trigger {
    GenerateLabel,
    SubmitReoffer(ReofferSubmit),
    Accept,
    Decline,
    AutoResolve,
    GenerateReturnLabel,
}

impl Trigger {
    fn name(&self) -> &'static str {
        match self {
            Trigger::GenerateLabel => "generate label",
            Trigger::SubmitReoffer(_) => "submit re-offer",
            Trigger::Accept => "accept re-offer",
            Trigger::Decline => "decline re-offer",
            Trigger::AutoResolve => "auto-resolve re-offer",
            Trigger::GenerateReturnLabel => "generate return label",
        }
    }
}

/// Side effects run strictly after the status write commits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    OutboundLabel,
    ReturnLabel,
    OfferMessage,
    ResolutionComment(ReofferResolution),
}

/// Outcome of precondition checks: the conditional write to attempt
#[derive(Debug)]
pub struct Plan {
    /// Status the store must still hold for the write to apply
    pub expected: OrderStatus,
    pub patch: OrderPatch,
    pub effects: Vec<SideEffect>,
}

/// Validate preconditions and derive the conditional write for a trigger.
///
/// Pure: no store access, no clock access beyond the `now` argument.
pub fn plan(order: &BuybackOrder, trigger: &Trigger, now: i64, window_ms: i64) -> AppResult<Plan> {
    match trigger {
        Trigger::GenerateLabel => match order.status {
            OrderStatus::PendingShipment => {
                validate_shipping(&order.shipping)?;
                Ok(Plan {
                    expected: OrderStatus::PendingShipment,
                    patch: OrderPatch {
                        status: Some(OrderStatus::LabelGenerated),
                        label_generated_at: Some(now),
                        ..Default::default()
                    },
                    effects: vec![SideEffect::OutboundLabel],
                })
            }
            // Recovery: the transition committed earlier but the provider
            // call failed — retry only the side effect
            OrderStatus::LabelGenerated if order.label_url.is_none() => Ok(Plan {
                expected: OrderStatus::LabelGenerated,
                patch: OrderPatch::default(),
                effects: vec![SideEffect::OutboundLabel],
            }),
            status => Err(conflict(order, trigger, status)),
        },

        Trigger::SubmitReoffer(submit) => {
            if order.status != OrderStatus::LabelGenerated {
                return Err(conflict(order, trigger, order.status));
            }
            validate_reoffer(submit)?;
            let reoffer = Reoffer {
                new_price: submit.new_price,
                reasons: submit.reasons.clone(),
                comments: submit.comments.clone(),
                created_at: now,
                auto_resolve_deadline: now + window_ms,
                resolved_at: None,
                resolution: None,
            };
            Ok(Plan {
                expected: OrderStatus::LabelGenerated,
                patch: OrderPatch {
                    status: Some(OrderStatus::ReofferPending),
                    reoffer: Some(reoffer),
                    ..Default::default()
                },
                effects: vec![SideEffect::OfferMessage],
            })
        }

        Trigger::Accept => resolve_plan(
            order,
            trigger,
            now,
            OrderStatus::OfferAccepted,
            ReofferResolution::Accepted,
        ),

        Trigger::Decline => resolve_plan(
            order,
            trigger,
            now,
            OrderStatus::ReturnRequested,
            ReofferResolution::Declined,
        ),

        Trigger::AutoResolve => {
            let reoffer = pending_reoffer(order, trigger)?;
            if now < reoffer.auto_resolve_deadline {
                return Err(AppError::conflict(format!(
                    "Re-offer on order {} is not past its deadline",
                    order.order_number
                )));
            }
            resolve_plan(
                order,
                trigger,
                now,
                OrderStatus::AutoAccepted,
                ReofferResolution::AutoAccepted,
            )
        }

        Trigger::GenerateReturnLabel => match order.status {
            OrderStatus::ReturnRequested => Ok(Plan {
                expected: OrderStatus::ReturnRequested,
                patch: OrderPatch {
                    status: Some(OrderStatus::ReturnLabelGenerated),
                    ..Default::default()
                },
                effects: vec![SideEffect::ReturnLabel],
            }),
            OrderStatus::ReturnLabelGenerated if order.return_label_url.is_none() => Ok(Plan {
                expected: OrderStatus::ReturnLabelGenerated,
                patch: OrderPatch::default(),
                effects: vec![SideEffect::ReturnLabel],
            }),
            status => Err(conflict(order, trigger, status)),
        },
    }
}

/// Shared shape of the three resolution transitions. The conditional write on
/// REOFFER_PENDING is the double-resolution guard: buyer click and sweeper
/// race, exactly one wins.
fn resolve_plan(
    order: &BuybackOrder,
    trigger: &Trigger,
    now: i64,
    target: OrderStatus,
    resolution: ReofferResolution,
) -> AppResult<Plan> {
    let reoffer = pending_reoffer(order, trigger)?;
    let resolved = Reoffer {
        resolved_at: Some(now),
        resolution: Some(resolution),
        ..reoffer.clone()
    };
    let mut patch = OrderPatch {
        status: Some(target),
        reoffer: Some(resolved),
        ..Default::default()
    };
    match target {
        OrderStatus::ReturnRequested => patch.return_requested_at = Some(now),
        _ => patch.accepted_at = Some(now),
    }
    Ok(Plan {
        expected: OrderStatus::ReofferPending,
        patch,
        effects: vec![SideEffect::ResolutionComment(resolution)],
    })
}

fn pending_reoffer<'a>(order: &'a BuybackOrder, trigger: &Trigger) -> AppResult<&'a Reoffer> {
    if order.status != OrderStatus::ReofferPending {
        return Err(conflict(order, trigger, order.status));
    }
    order
        .reoffer
        .as_ref()
        .ok_or_else(|| AppError::database(format!(
            "Order {} is REOFFER_PENDING without a reoffer record",
            order.order_number
        )))
}

fn conflict(order: &BuybackOrder, trigger: &Trigger, status: OrderStatus) -> AppError {
    AppError::conflict(format!(
        "Cannot {} on order {} in status {}",
        trigger.name(),
        order.order_number,
        status
    ))
}

fn validate_reoffer(submit: &ReofferSubmit) -> AppResult<()> {
    if submit.new_price <= Decimal::ZERO {
        return Err(AppError::validation("new_price must be greater than zero"));
    }
    if submit.reasons.iter().all(|r| r.trim().is_empty()) {
        return Err(AppError::validation("At least one reason is required"));
    }
    for reason in &submit.reasons {
        validate_required_text(reason, "reason", MAX_NOTE_LEN)?;
    }
    validate_optional_text(&submit.comments, "comments", MAX_NOTE_LEN)?;
    Ok(())
}

// =============================================================================
// Lifecycle service
// =============================================================================

/// Tunables injected from config
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Response window before a pending re-offer auto-accepts
    pub reoffer_window_days: i64,
    /// Buyer-facing portal base URL used in offer messages
    pub portal_url: String,
}

/// The one place that applies transitions and runs their side effects
pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    binder: ThreadBinder,
    resolver: LabelResolver,
    settings: LifecycleSettings,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn OrderStore>,
        binder: ThreadBinder,
        resolver: LabelResolver,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            binder,
            resolver,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    /// Create a new order in PENDING_SHIPMENT with a fresh order number
    pub async fn submit(&self, submit: OrderSubmit) -> AppResult<BuybackOrder> {
        validate_shipping(&submit.shipping)?;
        validate_email(&submit.shipping.email, "shipping.email")?;
        validate_required_text(&submit.device.model, "device.model", MAX_NAME_LEN)?;
        if submit.estimated_quote <= Decimal::ZERO {
            return Err(AppError::validation("estimated_quote must be greater than zero"));
        }

        let order_number = number::allocate(self.store.as_ref()).await?;
        let order = BuybackOrder {
            id: None,
            order_number,
            status: OrderStatus::PendingShipment,
            shipping: submit.shipping,
            device: submit.device,
            estimated_quote: submit.estimated_quote,
            reoffer: None,
            thread_id: None,
            label_url: None,
            tracking_number: None,
            return_label_url: None,
            return_tracking_number: None,
            created_at: time::now_millis(),
            label_generated_at: None,
            accepted_at: None,
            return_requested_at: None,
        };

        let created = self.store.create(order).await?;
        tracing::info!(order = %created.order_number, "Order submitted");
        Ok(created)
    }

    /// Apply one trigger: plan → conditional write → side effects.
    pub async fn apply(&self, id: &str, trigger: Trigger) -> AppResult<BuybackOrder> {
        let order = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;

        let now = time::now_millis();
        let window_ms = time::days_to_millis(self.settings.reoffer_window_days);
        let plan = plan(&order, &trigger, now, window_ms)?;

        let mut order = match self
            .store
            .transition(&order.id_string(), plan.expected, plan.patch)
            .await?
        {
            TransitionOutcome::Applied(order) => order,
            TransitionOutcome::Conflict => {
                // Expected under concurrency: someone else already moved it
                return Err(AppError::conflict(format!(
                    "Order {} was concurrently updated, {} no longer applies",
                    order.order_number,
                    trigger.name()
                )));
            }
        };

        tracing::info!(
            order = %order.order_number,
            status = %order.status,
            "Transition committed ({})",
            trigger.name()
        );

        for effect in &plan.effects {
            self.run_effect(&mut order, *effect).await?;
        }
        Ok(order)
    }

    /// Route an explicit status request through the corresponding trigger.
    /// Statuses whose transitions need a payload have dedicated endpoints.
    pub async fn request_status(&self, id: &str, requested: OrderStatus) -> AppResult<BuybackOrder> {
        let trigger = match requested {
            OrderStatus::LabelGenerated => Trigger::GenerateLabel,
            OrderStatus::OfferAccepted => Trigger::Accept,
            OrderStatus::ReturnRequested => Trigger::Decline,
            OrderStatus::AutoAccepted => Trigger::AutoResolve,
            OrderStatus::ReturnLabelGenerated => Trigger::GenerateReturnLabel,
            OrderStatus::PendingShipment | OrderStatus::ReofferPending => {
                return Err(AppError::validation(format!(
                    "Status {requested} cannot be requested directly"
                )));
            }
        };
        self.apply(id, trigger).await
    }

    // =========================================================================
    // Side effects (post-commit)
    // =========================================================================

    async fn run_effect(&self, order: &mut BuybackOrder, effect: SideEffect) -> AppResult<()> {
        match effect {
            SideEffect::OutboundLabel => self.label_effect(order, LabelDirection::Outbound).await,
            SideEffect::ReturnLabel => self.label_effect(order, LabelDirection::Return).await,
            SideEffect::OfferMessage => self.offer_message(order).await,
            SideEffect::ResolutionComment(resolution) => {
                self.resolution_comment(order, resolution).await
            }
        }
    }

    /// Call the provider, persist the result, then notify the buyer.
    /// The label fields are persisted before the notification so a failed
    /// notification never loses an issued label.
    async fn label_effect(&self, order: &mut BuybackOrder, direction: LabelDirection) -> AppResult<()> {
        let Some(label) = self.resolver.generate(order, direction).await? else {
            return Ok(());
        };

        let mut patch = OrderPatch::default();
        let body = match direction {
            LabelDirection::Outbound => {
                patch.label_url = Some(label.label_url.clone());
                patch.tracking_number = Some(label.tracking_number.clone());
                format!(
                    "Your shipping label for order {} is ready.\n\n\
                     Label: {}\nTracking number: {}\n\n\
                     Pack your {} and drop the box off at any carrier location.",
                    order.order_number, label.label_url, label.tracking_number, order.device.model
                )
            }
            LabelDirection::Return => {
                patch.return_label_url = Some(label.label_url.clone());
                patch.return_tracking_number = Some(label.tracking_number.clone());
                format!(
                    "Your {} is on its way back to you (order {}).\n\nTracking number: {}",
                    order.device.model, order.order_number, label.tracking_number
                )
            }
        };

        *order = self.store.merge(&order.id_string(), patch).await?;

        let thread_id = self.binder.post(order, &self.subject(order), &body, true).await?;
        order.thread_id = Some(thread_id);
        Ok(())
    }

    /// Buyer-facing re-offer message with the two mutually exclusive actions
    async fn offer_message(&self, order: &mut BuybackOrder) -> AppResult<()> {
        let reoffer = order.reoffer.clone().ok_or_else(|| {
            AppError::database(format!(
                "Order {} is REOFFER_PENDING without a reoffer record",
                order.order_number
            ))
        })?;

        let reasons = reoffer
            .reasons
            .iter()
            .map(|r| format!("  - {r}"))
            .collect::<Vec<_>>()
            .join("\n");
        let body = format!(
            "After inspecting your {device}, we can offer {price} USD \
             (original estimate: {quote} USD).\n\nReasons:\n{reasons}\n\n\
             Accept the revised offer:\n  {portal}/orders/{number}/reoffer/accept\n\
             Or decline and get your device back:\n  {portal}/orders/{number}/reoffer/decline\n\n\
             If we don't hear from you by {deadline}, the revised offer is \
             accepted automatically.",
            device = order.device.model,
            price = reoffer.new_price,
            quote = order.estimated_quote,
            reasons = reasons,
            portal = self.settings.portal_url,
            number = order.order_number,
            deadline = time::format_date(reoffer.auto_resolve_deadline),
        );

        let thread_id = self.binder.post(order, &self.subject(order), &body, true).await?;
        order.thread_id = Some(thread_id);

        // Inspector notes stay agent-side
        if let Some(comments) = &reoffer.comments {
            self.binder
                .post_internal(order, &format!("Inspection notes: {comments}"))
                .await?;
        }
        Ok(())
    }

    async fn resolution_comment(
        &self,
        order: &mut BuybackOrder,
        resolution: ReofferResolution,
    ) -> AppResult<()> {
        let price = order
            .reoffer
            .as_ref()
            .map(|r| r.new_price.to_string())
            .unwrap_or_default();
        let body = match resolution {
            ReofferResolution::Accepted => format!(
                "You accepted the revised offer of {price} USD. Payment is on its way."
            ),
            ReofferResolution::Declined => format!(
                "You declined the revised offer of {price} USD. \
                 We will send your device back with a return label shortly."
            ),
            ReofferResolution::AutoAccepted => format!(
                "The response window elapsed, so the revised offer of {price} USD \
                 was accepted automatically. Payment is on its way."
            ),
        };
        let thread_id = self.binder.post(order, &self.subject(order), &body, true).await?;
        order.thread_id = Some(thread_id);
        Ok(())
    }

    fn subject(&self, order: &BuybackOrder) -> String {
        format!("Buyback order {}", order.order_number)
    }
}
