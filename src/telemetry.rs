//! 日誌初始化

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 未設定 `RUST_LOG` 時的預設過濾
pub const DEFAULT_FILTER: &str = "store_ledger=info,ledger_engine=info";

/// 初始化全域 tracing subscriber
///
/// 優先採用 `RUST_LOG`，否則使用 `default_filter`。已初始化過時回傳 false。
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
