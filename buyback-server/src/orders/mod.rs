//! Order domain
//!
//! # 模块结构
//!
//! - [`store`] - 订单存储端口（条件更新语义）
//! - [`lifecycle`] - 状态机：转换、前置条件、副作用
//! - [`number`] - 人类可读订单号生成
//! - [`thread`] - 会话线程绑定（一单一线程）
//! - [`labels`] - 面单方向装配
//! - [`sweep`] - re-offer 超时自动接受

pub mod labels;
pub mod lifecycle;
pub mod number;
pub mod store;
pub mod sweep;
pub mod thread;

#[cfg(test)]
mod tests;

pub use labels::{LabelDirection, LabelResolver};
pub use lifecycle::{LifecycleSettings, OrderLifecycle, Trigger};
pub use store::{OrderStore, TransitionOutcome};
pub use sweep::{ReofferSweeper, SweepReport};
pub use thread::ThreadBinder;
