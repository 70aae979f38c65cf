//! 庫存摘要（衍生資料，不持久化）

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Material, StockKey};

/// 單一庫存鍵的庫存摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSummary {
    pub key: StockKey,

    pub material_name: String,
    pub material_code: String,
    pub unit: Option<String>,

    /// 累計入庫
    pub total_in: Decimal,

    /// 累計出庫
    pub total_out: Decimal,

    /// 現有庫存（未耗盡批次剩餘量合計）
    pub current_stock: Decimal,

    pub last_in_time: Option<DateTime<Utc>>,
    pub last_out_time: Option<DateTime<Utc>>,

    /// 噸數（入庫、出庫、差額）
    pub total_in_tons: Decimal,
    pub total_out_tons: Decimal,
    pub current_tons: Decimal,

    /// 件數（入庫、出庫、差額）
    pub total_in_units: i64,
    pub total_out_units: i64,
    pub current_units: i64,

    /// 未耗盡批次數
    pub open_batches: usize,
}

impl StockSummary {
    /// 創建空的庫存摘要
    pub fn empty(key: StockKey, material: &Material) -> Self {
        Self {
            key,
            material_name: material.name.clone(),
            material_code: material.code.clone(),
            unit: material.unit.clone(),
            total_in: Decimal::ZERO,
            total_out: Decimal::ZERO,
            current_stock: Decimal::ZERO,
            last_in_time: None,
            last_out_time: None,
            total_in_tons: Decimal::ZERO,
            total_out_tons: Decimal::ZERO,
            current_tons: Decimal::ZERO,
            total_in_units: 0,
            total_out_units: 0,
            current_units: 0,
            open_batches: 0,
        }
    }

    /// 累計入庫 - 累計出庫
    pub fn net_movement(&self) -> Decimal {
        self.total_in - self.total_out
    }

    /// 最後異動時間
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        match (self.last_in_time, self.last_out_time) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current_stock == Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MaterialDraft;
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn test_empty_summary() {
        let material =
            Material::from_draft(MaterialDraft::new("Cement", "CM-01").with_unit("bag"), Utc::now())
                .unwrap();
        let summary = StockSummary::empty(StockKey::new(Uuid::new_v4(), material.id), &material);

        assert!(summary.is_empty());
        assert_eq!(summary.unit, Some("bag".to_string()));
        assert_eq!(summary.last_activity(), None);
        assert_eq!(summary.net_movement(), Decimal::ZERO);
    }

    #[test]
    fn test_last_activity() {
        let material = Material::from_draft(MaterialDraft::new("Sand", "SD-01"), Utc::now()).unwrap();
        let mut summary = StockSummary::empty(StockKey::general(material.id), &material);
        let t1 = Utc::now();
        let t2 = t1 + Duration::hours(2);

        summary.last_in_time = Some(t2);
        assert_eq!(summary.last_activity(), Some(t2));

        summary.last_out_time = Some(t1);
        assert_eq!(summary.last_activity(), Some(t2));
    }
}
