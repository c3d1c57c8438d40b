//! Database Models

pub mod order;
pub mod serde_helpers;

pub use order::{
    BuybackOrder, DeviceInfo, OrderPatch, OrderStatus, OrderSubmit, Reoffer, ReofferResolution,
    ReofferSubmit, ShippingInfo,
};
