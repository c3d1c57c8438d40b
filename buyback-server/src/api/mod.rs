//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 订单生命周期接口

pub mod health;
pub mod orders;
