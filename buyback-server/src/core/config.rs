use crate::services::Address;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/buyback | 工作目录（数据库、日志） |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | TICKETING_URL | http://localhost:8088 | 工单服务地址 |
/// | TICKETING_TOKEN | (空) | 工单服务令牌 |
/// | SHIPPING_URL | http://localhost:8089 | 面单服务地址 |
/// | SHIPPING_TOKEN | (空) | 面单服务令牌 |
/// | PROVIDER_TIMEOUT_MS | 10000 | 上游调用超时(毫秒) |
/// | REOFFER_WINDOW_DAYS | 7 | re-offer 响应窗口(天) |
/// | SWEEP_INTERVAL_HOURS | 24 | 自动 resolve 扫描周期(小时) |
/// | PORTAL_URL | http://localhost:5173 | 买家门户地址（消息内链接） |
/// | WAREHOUSE_* | 见 `warehouse_from_env` | 回收仓地址 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/buyback HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 上游服务 ===
    /// 工单服务 URL
    pub ticketing_url: String,
    /// 工单服务令牌
    pub ticketing_token: String,
    /// 面单服务 URL
    pub shipping_url: String,
    /// 面单服务令牌
    pub shipping_token: String,
    /// 上游调用超时 (毫秒)
    pub provider_timeout_ms: u64,

    // === 生命周期参数 ===
    /// re-offer 响应窗口 (天)
    pub reoffer_window_days: i64,
    /// 自动 resolve 扫描周期 (小时)
    pub sweep_interval_hours: u64,
    /// 买家门户地址
    pub portal_url: String,
    /// 回收仓地址（所有面单的业务端）
    pub warehouse: Address,
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/buyback".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            ticketing_url: std::env::var("TICKETING_URL")
                .unwrap_or_else(|_| "http://localhost:8088".into()),
            ticketing_token: std::env::var("TICKETING_TOKEN").unwrap_or_default(),
            shipping_url: std::env::var("SHIPPING_URL")
                .unwrap_or_else(|_| "http://localhost:8089".into()),
            shipping_token: std::env::var("SHIPPING_TOKEN").unwrap_or_default(),
            provider_timeout_ms: std::env::var("PROVIDER_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10_000),

            reoffer_window_days: std::env::var("REOFFER_WINDOW_DAYS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(7),
            sweep_interval_hours: std::env::var("SWEEP_INTERVAL_HOURS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(24),
            portal_url: std::env::var("PORTAL_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            warehouse: Self::warehouse_from_env(),
        }
    }

    /// 回收仓地址：WAREHOUSE_NAME / WAREHOUSE_STREET / WAREHOUSE_CITY /
    /// WAREHOUSE_STATE / WAREHOUSE_POSTAL_CODE / WAREHOUSE_PHONE
    fn warehouse_from_env() -> Address {
        Address {
            name: std::env::var("WAREHOUSE_NAME").unwrap_or_else(|_| "Buyback Intake".into()),
            street: std::env::var("WAREHOUSE_STREET")
                .unwrap_or_else(|_| "100 Warehouse Way".into()),
            city: std::env::var("WAREHOUSE_CITY").unwrap_or_else(|_| "Austin".into()),
            state: std::env::var("WAREHOUSE_STATE").unwrap_or_else(|_| "TX".into()),
            postal_code: std::env::var("WAREHOUSE_POSTAL_CODE")
                .unwrap_or_else(|_| "78701".into()),
            phone: std::env::var("WAREHOUSE_PHONE").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置，常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.work_dir).join("database")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
