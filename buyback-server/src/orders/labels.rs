//! Label direction resolver
//!
//! 同一份订单地址，按方向装配 from/to：
//! - outbound: 买家 → 回收仓（买家寄出设备）
//! - return:   回收仓 → 买家（退回设备）
//!
//! 两个方向互为镜像，各自的面单字段独立、只写一次。

use std::sync::Arc;

use crate::db::models::{BuybackOrder, ShippingInfo};
use crate::services::{Address, Label, LabelGateway, LabelRequest, PackageSpec};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_required_text,
};
use crate::utils::AppResult;

/// Which way the package moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelDirection {
    /// Customer ships the device in
    Outbound,
    /// Business ships the device back
    Return,
}

/// Validate the shipping fields a label request forwards.
///
/// Fails fast (400) instead of handing incomplete data to the provider.
pub fn validate_shipping(shipping: &ShippingInfo) -> AppResult<()> {
    validate_required_text(&shipping.name, "shipping.name", MAX_NAME_LEN)?;
    validate_required_text(&shipping.street, "shipping.street", MAX_ADDRESS_LEN)?;
    validate_required_text(&shipping.city, "shipping.city", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&shipping.state, "shipping.state", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&shipping.postal_code, "shipping.postal_code", MAX_SHORT_TEXT_LEN)?;
    Ok(())
}

fn customer_address(shipping: &ShippingInfo) -> Address {
    Address {
        name: shipping.name.clone(),
        street: shipping.street.clone(),
        city: shipping.city.clone(),
        state: shipping.state.clone(),
        postal_code: shipping.postal_code.clone(),
        phone: shipping.phone.clone(),
    }
}

pub struct LabelResolver {
    gateway: Arc<dyn LabelGateway>,
    /// The business/warehouse end of every label
    business: Address,
    package: PackageSpec,
}

impl LabelResolver {
    pub fn new(gateway: Arc<dyn LabelGateway>, business: Address) -> Self {
        Self {
            gateway,
            business,
            package: PackageSpec::default(),
        }
    }

    /// Build the from/to pair for a direction
    pub fn address_pair(&self, order: &BuybackOrder, direction: LabelDirection) -> (Address, Address) {
        let customer = customer_address(&order.shipping);
        match direction {
            LabelDirection::Outbound => (customer, self.business.clone()),
            LabelDirection::Return => (self.business.clone(), customer),
        }
    }

    /// Generate a label for `direction`.
    ///
    /// Write-once per direction: returns `Ok(None)` without calling the
    /// provider when the direction's label already exists, so a retry after
    /// a provider timeout cannot double-invoke.
    pub async fn generate(
        &self,
        order: &BuybackOrder,
        direction: LabelDirection,
    ) -> AppResult<Option<Label>> {
        let existing = match direction {
            LabelDirection::Outbound => &order.label_url,
            LabelDirection::Return => &order.return_label_url,
        };
        if existing.is_some() {
            tracing::debug!(order = %order.order_number, ?direction, "Label already exists, skipping");
            return Ok(None);
        }

        validate_shipping(&order.shipping)?;

        let (ship_from, ship_to) = self.address_pair(order, direction);
        let request = LabelRequest {
            ship_from,
            ship_to,
            package: self.package.clone(),
            // 物理面单上的可追溯引用，与内部主键无关
            reference: order.order_number.clone(),
        };

        let label = self.gateway.create_label(&request).await?;
        tracing::info!(
            order = %order.order_number,
            ?direction,
            tracking = %label.tracking_number,
            "Label generated"
        );
        Ok(Some(label))
    }
}
