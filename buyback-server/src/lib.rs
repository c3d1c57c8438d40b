//! Buyback Server - 设备回收订单生命周期服务
//!
//! # 架构概述
//!
//! 核心是订单状态机：所有状态转换都通过存储端的条件更新提交，
//! 工单与面单等副作用严格发生在提交之后。
//!
//! # 模块结构
//!
//! ```text
//! buyback-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── routes/        # 路由装配 + 中间件
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 嵌入式 SurrealDB 存储层
//! ├── orders/        # 订单状态机、线程绑定、面单方向、扫描器
//! ├── services/      # 上游客户端（工单、面单）
//! └── utils/         # 错误、日志、时间、验证
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod orders;
pub mod routes;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use crate::orders::{OrderLifecycle, OrderStore, ReofferSweeper};
pub use crate::utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use crate::utils::logger::{init_logger, init_logger_with_file};

/// 进程启动环境：加载 .env、初始化日志
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(None, log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____              __               __
   / __ )__  ____  __/ /_  ____ ______/ /__
  / __  / / / / / / / __ \/ __ `/ ___/ //_/
 / /_/ / /_/ / /_/ / /_/ / /_/ / /__/ ,<
/_____/\__,_/\__, /_.___/\__,_/\___/_/|_|
            /____/
    "#
    );
}
