//! 入庫批次模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{normalize_optional, LedgerError, Result};

/// 庫存鍵：（專案, 物料）。專案為 None 時代表一般倉
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub project_id: Option<Uuid>,
    pub material_id: Uuid,
}

impl StockKey {
    pub fn new(project_id: Uuid, material_id: Uuid) -> Self {
        Self {
            project_id: Some(project_id),
            material_id,
        }
    }

    /// 一般倉（不屬於任何專案）
    pub fn general(material_id: Uuid) -> Self {
        Self {
            project_id: None,
            material_id,
        }
    }

    pub fn is_general(&self) -> bool {
        self.project_id.is_none()
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.project_id {
            Some(project_id) => write!(f, "{}/{}", project_id, self.material_id),
            None => write!(f, "general/{}", self.material_id),
        }
    }
}

/// 批次狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    /// 尚有剩餘
    Open,
    /// 已耗盡（不可逆）
    Exhausted,
}

/// 入庫批次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InwardBatch {
    /// 批次ID
    pub id: Uuid,

    /// 建立序號（同一時間的批次以此決定先後）
    pub sequence: u64,

    pub project_id: Option<Uuid>,
    pub material_id: Uuid,

    /// 實收數量
    pub received_quantity: Decimal,

    /// 剩餘數量，僅由出庫扣減
    pub remaining_quantity: Decimal,

    /// 單據申報數量（差異稽核用）
    pub declared_quantity: Option<Decimal>,

    /// 重量（噸）
    pub weight_tons: Option<Decimal>,

    /// 件數
    pub units_count: Option<u32>,

    /// 批號
    pub batch_number: Option<String>,

    /// 車號
    pub vehicle_number: Option<String>,

    /// 供應商
    pub supplier: Option<String>,

    /// 單據參考（發票/採購單/送貨單號）
    pub reference: Option<String>,

    pub remarks: Option<String>,

    /// 異動時間
    pub movement_time: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl InwardBatch {
    /// 創建新的入庫批次，剩餘數量等於實收數量
    pub fn new(
        key: StockKey,
        sequence: u64,
        received_quantity: Decimal,
        metadata: InwardMetadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            project_id: key.project_id,
            material_id: key.material_id,
            received_quantity,
            remaining_quantity: received_quantity,
            declared_quantity: metadata.declared_quantity,
            weight_tons: metadata.weight_tons,
            units_count: metadata.units_count,
            batch_number: normalize_optional(metadata.batch_number),
            vehicle_number: normalize_optional(metadata.vehicle_number),
            supplier: normalize_optional(metadata.supplier),
            reference: normalize_optional(metadata.reference),
            remarks: normalize_optional(metadata.remarks),
            movement_time: metadata.movement_time.unwrap_or(now),
            created_at: now,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey {
            project_id: self.project_id,
            material_id: self.material_id,
        }
    }

    /// FIFO 排序鍵：異動時間優先，其次建立序號
    pub fn fifo_key(&self) -> (DateTime<Utc>, u64) {
        (self.movement_time, self.sequence)
    }

    pub fn state(&self) -> BatchState {
        if self.remaining_quantity > Decimal::ZERO {
            BatchState::Open
        } else {
            BatchState::Exhausted
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == BatchState::Open
    }

    /// 已被出庫消耗的數量
    pub fn consumed_quantity(&self) -> Decimal {
        self.received_quantity - self.remaining_quantity
    }

    /// 申報與實收的差異（申報 - 實收）
    pub fn declared_variance(&self) -> Option<Decimal> {
        self.declared_quantity
            .map(|declared| declared - self.received_quantity)
    }

    /// 顯示用批次標籤
    pub fn label(&self) -> String {
        match &self.batch_number {
            Some(number) => number.clone(),
            None => format!("Batch-{}", self.sequence),
        }
    }

    /// 扣減剩餘數量
    ///
    /// 扣減後剩餘量落在容差內即歸零（批次轉為耗盡）。
    /// 超過剩餘量（超出容差）回傳 `OverConsumption`，不做任何修改。
    pub fn decrement(&mut self, amount: Decimal, tolerance: Decimal) -> Result<Decimal> {
        if amount - self.remaining_quantity > tolerance {
            return Err(LedgerError::OverConsumption {
                batch_id: self.id,
                requested: amount,
                remaining: self.remaining_quantity,
            });
        }
        let remaining = self.remaining_quantity - amount;
        self.remaining_quantity = if remaining <= tolerance {
            Decimal::ZERO
        } else {
            remaining
        };
        Ok(self.remaining_quantity)
    }
}

/// 入庫附帶資訊
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InwardMetadata {
    /// 未指定時使用記錄當下時間
    pub movement_time: Option<DateTime<Utc>>,
    pub declared_quantity: Option<Decimal>,
    pub weight_tons: Option<Decimal>,
    pub units_count: Option<u32>,
    pub batch_number: Option<String>,
    pub vehicle_number: Option<String>,
    pub supplier: Option<String>,
    pub reference: Option<String>,
    pub remarks: Option<String>,
}

impl InwardMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置異動時間
    pub fn at(mut self, movement_time: DateTime<Utc>) -> Self {
        self.movement_time = Some(movement_time);
        self
    }

    /// 建構器模式：設置申報數量
    pub fn with_declared_quantity(mut self, quantity: Decimal) -> Self {
        self.declared_quantity = Some(quantity);
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

    /// 建構器模式：設置批號
    pub fn with_batch_number(mut self, batch_number: impl Into<String>) -> Self {
        self.batch_number = Some(batch_number.into());
        self
    }

    /// 建構器模式：設置車號
    pub fn with_vehicle_number(mut self, vehicle_number: impl Into<String>) -> Self {
        self.vehicle_number = Some(vehicle_number.into());
        self
    }

    /// 建構器模式：設置供應商
    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
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
