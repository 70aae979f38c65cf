//! 配置載入
//!
//! 分層載入：
//! 1. 程式內預設值
//! 2. 設定檔 `config/ledger.toml`（可省略）
//! 3. 環境變數覆寫（`LEDGER__` 前綴，例如 `LEDGER__QUANTITY_SCALE=2`）

use config::{Config, ConfigError, Environment, File, Source};
use ledger_core::LedgerConfig;

/// 預設設定檔路徑（不含副檔名）
pub const DEFAULT_CONFIG_FILE: &str = "config/ledger";

/// 從預設位置載入配置
pub fn load() -> Result<LedgerConfig, ConfigError> {
    load_with(File::with_name(DEFAULT_CONFIG_FILE).required(false))
}

/// 以指定設定來源載入配置，環境變數仍優先
pub fn load_with<S>(file: S) -> Result<LedgerConfig, ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    let defaults = LedgerConfig::default();

    let config = Config::builder()
        .set_default("quantity_scale", i64::from(defaults.quantity_scale))?
        .set_default("tolerance", defaults.tolerance.to_string())?
        .set_default("recent_activity_limit", defaults.recent_activity_limit as i64)?
        .set_default("enable_summary_cache", defaults.enable_summary_cache)?
        .add_source(file)
        .add_source(
            Environment::with_prefix("LEDGER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let ledger: LedgerConfig = config.try_deserialize()?;
    ledger
        .validate()
        .map_err(|err| ConfigError::Message(err.to_string()))?;
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use rust_decimal::Decimal;

    #[test]
    fn test_defaults_without_file() {
        let config = load_with(File::from_str("", FileFormat::Toml)).unwrap();
        assert_eq!(config.quantity_scale, 3);
        assert_eq!(config.tolerance, Decimal::new(1, 6));
        assert_eq!(config.recent_activity_limit, 12);
        assert!(config.enable_summary_cache);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            quantity_scale = 2
            recent_activity_limit = 5
            enable_summary_cache = false
        "#;
        let config = load_with(File::from_str(toml, FileFormat::Toml)).unwrap();
        assert_eq!(config.quantity_scale, 2);
        assert_eq!(config.recent_activity_limit, 5);
        assert!(!config.enable_summary_cache);
        assert_eq!(config.tolerance, Decimal::new(1, 6));
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let result = load_with(File::from_str("quantity_scale = 40", FileFormat::Toml));
        assert!(result.is_err());
    }

    #[test]
    fn test_tolerance_must_fit_scale() {
        let result = load_with(File::from_str("quantity_scale = 6", FileFormat::Toml));
        assert!(result.is_err());

        let toml = r#"
            quantity_scale = 6
            tolerance = "0.0000001"
        "#;
        let config = load_with(File::from_str(toml, FileFormat::Toml)).unwrap();
        assert_eq!(config.tolerance, Decimal::new(1, 7));
    }
}
