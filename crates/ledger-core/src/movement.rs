//! 出庫異動模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{normalize_optional, StockKey};

/// 出庫異動（建立後不可修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutwardMovement {
    /// 出庫ID
    pub id: Uuid,

    /// 建立序號
    pub sequence: u64,

    pub project_id: Option<Uuid>,
    pub material_id: Uuid,

    /// 出庫數量
    pub quantity: Decimal,

    /// 領用人/收貨方
    pub issued_to: Option<String>,

    pub weight_tons: Option<Decimal>,
    pub units_count: Option<u32>,
    pub reference: Option<String>,
    pub remarks: Option<String>,

    pub movement_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,

    /// 批次消耗明細（依 FIFO 順序）
    pub consumptions: Vec<BatchConsumption>,
}

impl OutwardMovement {
    /// 創建新的出庫異動
    pub fn new(
        key: StockKey,
        sequence: u64,
        quantity: Decimal,
        metadata: OutwardMetadata,
        consumptions: Vec<BatchConsumption>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            project_id: key.project_id,
            material_id: key.material_id,
            quantity,
            issued_to: normalize_optional(metadata.issued_to),
            weight_tons: metadata.weight_tons,
            units_count: metadata.units_count,
            reference: normalize_optional(metadata.reference),
            remarks: normalize_optional(metadata.remarks),
            movement_time: metadata.movement_time.unwrap_or(now),
            created_at: now,
            consumptions,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey {
            project_id: self.project_id,
            material_id: self.material_id,
        }
    }

    /// 消耗明細合計
    pub fn consumed_total(&self) -> Decimal {
        self.consumptions.iter().map(|c| c.quantity).sum()
    }

    /// 批次摘要，例如 `B-01 (100), Batch-2 (20)`；無明細時為 None
    pub fn batch_summary(&self) -> Option<String> {
        if self.consumptions.is_empty() {
            return None;
        }
        Some(
            self.consumptions
                .iter()
                .map(|c| format!("{} ({})", c.batch_label, c.quantity.normalize()))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// 批次消耗記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConsumption {
    /// 來源批次ID
    pub batch_id: Uuid,

    /// 來源批次標籤（批號或 Batch-序號）
    pub batch_label: String,

    /// 取用數量
    pub quantity: Decimal,
}

impl BatchConsumption {
    pub fn new(batch_id: Uuid, batch_label: String, quantity: Decimal) -> Self {
        Self {
            batch_id,
            batch_label,
            quantity,
        }
    }
}

/// 出庫附帶資訊
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutwardMetadata {
    /// 未指定時使用記錄當下時間
    pub movement_time: Option<DateTime<Utc>>,
    pub issued_to: Option<String>,
    pub weight_tons: Option<Decimal>,
    pub units_count: Option<u32>,
    pub reference: Option<String>,
    pub remarks: Option<String>,
}

impl OutwardMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置異動時間
    pub fn at(mut self, movement_time: DateTime<Utc>) -> Self {
        self.movement_time = Some(movement_time);
        self
    }

    /// 建構器模式：設置領用人
    pub fn with_issued_to(mut self, issued_to: impl Into<String>) -> Self {
        self.issued_to = Some(issued_to.into());
        self
    }

    /// 建構器模式：設置重量（噸）
    pub fn with_weight_tons(mut self, weight: Decimal) -> Self {
        self.weight_tons = Some(weight);
        self
    }

    /// 建構器模式：設置件數
    pub fn with_units_count(mut self, units: u32) -> Self {
        self.units_count = Some(units);
        self
    }

    /// 建構器模式：設置單據參考
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// 建構器模式：設置備註
    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_create_outward() {
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4());
        let consumptions = vec![
            BatchConsumption::new(Uuid::new_v4(), "B-01".to_string(), Decimal::from(100)),
            BatchConsumption::new(
                Uuid::new_v4(),
                "Batch-2".to_string(),
                Decimal::from_str("20.500").unwrap(),
            ),
        ];

        let movement = OutwardMovement::new(
            key,
            3,
            Decimal::from_str("120.5").unwrap(),
            OutwardMetadata::new().with_issued_to(" Site "),
            consumptions,
            Utc::now(),
        );

        assert_eq!(movement.key(), key);
        assert_eq!(movement.issued_to, Some("Site".to_string()));
        assert_eq!(movement.consumed_total(), movement.quantity);
        assert_eq!(
            movement.batch_summary(),
            Some("B-01 (100), Batch-2 (20.5)".to_string())
        );
    }

    #[test]
    fn test_batch_summary_empty() {
        let movement = OutwardMovement::new(
            StockKey::general(Uuid::new_v4()),
            1,
            Decimal::ONE,
            OutwardMetadata::new(),
            Vec::new(),
            Utc::now(),
        );

        assert_eq!(movement.batch_summary(), None);
    }
}
