use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::SurrealOrderStore;
use crate::orders::{LabelResolver, LifecycleSettings, OrderLifecycle, OrderStore, ThreadBinder};
use crate::services::{HttpLabelGateway, HttpTicketGateway, LabelGateway, TicketGateway};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 每进程构造一次，经 `Clone` (Arc 浅拷贝) 注入 axum handler 和后台任务。
/// 外部协作方（存储、工单、面单）全部以接口形式注入，没有环境单例。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | 嵌入式数据库 |
/// | store | 订单存储端口 |
/// | lifecycle | 订单状态机（唯一的状态写入方） |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub store: Arc<dyn OrderStore>,
    pub lifecycle: Arc<OrderLifecycle>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/buyback.db)
    /// 3. 上游客户端（工单、面单）
    /// 4. 状态机装配
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        let db_dir = config.database_dir();
        std::fs::create_dir_all(&db_dir).expect("Failed to create database directory");
        let db_path = db_dir.join("buyback.db");

        let db_service = DbService::new(&db_path.to_string_lossy())
            .await
            .expect("Failed to initialize database");
        let db = db_service.db;

        let store: Arc<dyn OrderStore> = Arc::new(SurrealOrderStore::new(db.clone()));
        let tickets: Arc<dyn TicketGateway> = Arc::new(HttpTicketGateway::new(
            config.ticketing_url.clone(),
            config.ticketing_token.clone(),
            config.provider_timeout_ms,
        ));
        let labels: Arc<dyn LabelGateway> = Arc::new(HttpLabelGateway::new(
            config.shipping_url.clone(),
            config.shipping_token.clone(),
            config.provider_timeout_ms,
        ));

        let lifecycle = Arc::new(OrderLifecycle::new(
            store.clone(),
            ThreadBinder::new(store.clone(), tickets),
            LabelResolver::new(labels, config.warehouse.clone()),
            LifecycleSettings {
                reoffer_window_days: config.reoffer_window_days,
                portal_url: config.portal_url.clone(),
            },
        ));

        Self {
            config: config.clone(),
            db,
            store,
            lifecycle,
        }
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }
}
