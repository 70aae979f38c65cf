//! 庫存帳配置模型

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// 庫存帳參數配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// 數量小數位數（輸入一律四捨五入到此位數）
    pub quantity_scale: u32,

    /// 比較容差：判斷庫存是否足夠、批次是否耗盡時使用
    pub tolerance: Decimal,

    /// 儀表板最近活動筆數
    pub recent_activity_limit: usize,

    /// 是否啟用庫存摘要快取
    pub enable_summary_cache: bool,
}

impl LedgerConfig {
    /// 最大小數位數（Decimal 上限）
    pub const MAX_SCALE: u32 = 28;

    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            quantity_scale: 3,
            tolerance: Decimal::new(1, 6),
            recent_activity_limit: 12,
            enable_summary_cache: true,
        }
    }

    /// 建構器模式：設置數量小數位數
    pub fn with_quantity_scale(mut self, scale: u32) -> Self {
        self.quantity_scale = scale.min(Self::MAX_SCALE);
        self
    }

    /// 建構器模式：設置比較容差
    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance.abs();
        self
    }

    /// 建構器模式：設置最近活動筆數
    pub fn with_recent_activity_limit(mut self, limit: usize) -> Self {
        self.recent_activity_limit = limit;
        self
    }

    /// 建構器模式：設置是否啟用摘要快取
    pub fn with_summary_cache(mut self, enabled: bool) -> Self {
        self.enable_summary_cache = enabled;
        self
    }

    /// 將數量四捨五入到配置的小數位數
    pub fn normalize_quantity(&self, quantity: Decimal) -> Decimal {
        quantity
            .round_dp_with_strategy(
                self.quantity_scale.min(Self::MAX_SCALE),
                RoundingStrategy::MidpointAwayFromZero,
            )
            .normalize()
    }

    /// 驗證並正規化異動數量（必須大於零）
    pub fn validate_quantity(&self, quantity: Decimal) -> Result<Decimal> {
        let normalized = self.normalize_quantity(quantity);
        if normalized <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(quantity));
        }
        Ok(normalized)
    }

    /// 剩餘量是否可視為零
    pub fn is_exhausted(&self, remaining: Decimal) -> bool {
        remaining <= self.tolerance
    }

    /// 需求量是否超過可用量（超出容差才算）
    pub fn exceeds(&self, requested: Decimal, available: Decimal) -> bool {
        requested - available > self.tolerance
    }

    /// 最小數量單位（10^-quantity_scale）
    pub fn quantity_step(&self) -> Decimal {
        Decimal::new(1, self.quantity_scale.min(Self::MAX_SCALE))
    }

    /// 檢查配置是否合理
    pub fn validate(&self) -> Result<()> {
        if self.quantity_scale > Self::MAX_SCALE {
            return Err(LedgerError::Validation(format!(
                "quantity_scale 不可超過 {}",
                Self::MAX_SCALE
            )));
        }
        if self.tolerance < Decimal::ZERO {
            return Err(LedgerError::Validation("tolerance 不可為負".to_string()));
        }
        // 容差須小於最小數量單位
        let step = self.quantity_step();
        if self.tolerance >= step {
            return Err(LedgerError::Validation(format!(
                "tolerance {} 必須小於最小數量單位 {}",
                self.tolerance, step
            )));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::new();

        assert_eq!(config.quantity_scale, 3);
        assert_eq!(config.tolerance, dec("0.000001"));
        assert_eq!(config.recent_activity_limit, 12);
        assert!(config.enable_summary_cache);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = LedgerConfig::new()
            .with_quantity_scale(40)
            .with_tolerance(dec("-0.01"))
            .with_recent_activity_limit(5)
            .with_summary_cache(false);

        assert_eq!(config.quantity_scale, LedgerConfig::MAX_SCALE);
        assert_eq!(config.tolerance, dec("0.01"));
        assert_eq!(config.recent_activity_limit, 5);
        assert!(!config.enable_summary_cache);
    }

    #[rstest]
    #[case("12.3456", "12.346")]
    #[case("12.3455", "12.346")]
    #[case("0.0004", "0")]
    #[case("100", "100")]
    fn test_normalize_quantity(#[case] input: &str, #[case] expected: &str) {
        let config = LedgerConfig::new();
        assert_eq!(config.normalize_quantity(dec(input)), dec(expected));
    }

    #[rstest]
    #[case("0")]
    #[case("-5")]
    #[case("0.0004")]
    fn test_validate_quantity_rejects(#[case] input: &str) {
        let config = LedgerConfig::new();
        assert!(matches!(
            config.validate_quantity(dec(input)),
            Err(LedgerError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_tolerance_comparisons() {
        let config = LedgerConfig::new()
            .with_quantity_scale(9)
            .with_tolerance(dec("0.0000000001"));
        assert!(config.validate().is_ok());

        // 容差內視為足夠
        assert!(!config.exceeds(dec("10.00000000005"), dec("10")));
        assert!(config.exceeds(dec("10.000000001"), dec("10")));

        assert!(config.is_exhausted(dec("0.00000000001")));
        assert!(!config.is_exhausted(dec("0.000000001")));
    }

    #[rstest]
    #[case(3, "0.000001", true)]
    #[case(3, "0", true)]
    #[case(3, "0.001", false)]
    #[case(6, "0.000001", false)]
    #[case(9, "0.000001", false)]
    #[case(9, "0.0000000001", true)]
    fn test_tolerance_below_quantity_step(
        #[case] scale: u32,
        #[case] tolerance: &str,
        #[case] valid: bool,
    ) {
        let config = LedgerConfig::new()
            .with_quantity_scale(scale)
            .with_tolerance(dec(tolerance));
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{ "recent_activity_limit": 20 }"#).unwrap();

        assert_eq!(config.recent_activity_limit, 20);
        assert_eq!(config.quantity_scale, 3);
    }
}
