//! # Ledger Core
//!
//! 核心資料模型與類型定義

pub mod config;
pub mod inventory;
pub mod material;
pub mod movement;
pub mod project;
pub mod stock;

// Re-export 主要類型
pub use config::LedgerConfig;
pub use inventory::{BatchState, InwardBatch, InwardMetadata, StockKey};
pub use material::{Material, MaterialDraft};
pub use movement::{BatchConsumption, OutwardMetadata, OutwardMovement};
pub use project::{MaterialLink, Project, ProjectDraft, ProjectStatus};
pub use stock::StockSummary;

use rust_decimal::Decimal;
use uuid::Uuid;

/// 庫存帳錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("數量必須大於零: {0}")]
    InvalidQuantity(Decimal),

    #[error("庫存不足：需要 {requested}, 可用 {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },

    /// 批次扣減超過剩餘量，代表 FIFO 計算有誤
    #[error("批次 {batch_id} 超量扣減：扣減 {requested}, 剩餘 {remaining}")]
    OverConsumption {
        batch_id: Uuid,
        requested: Decimal,
        remaining: Decimal,
    },

    #[error("找不到物料: {0}")]
    UnknownMaterial(Uuid),

    #[error("找不到專案: {0}")]
    UnknownProject(Uuid),

    #[error("找不到批次: {0}")]
    UnknownBatch(Uuid),

    #[error("物料仍被使用中: {0}")]
    MaterialInUse(String),

    #[error("物料 {material_id} 未連結至專案 {project_id}")]
    NotLinked { project_id: Uuid, material_id: Uuid },

    #[error("物料 {material_id} 已連結至專案 {project_id}")]
    AlreadyLinked { project_id: Uuid, material_id: Uuid },

    #[error("代碼重複: {0}")]
    DuplicateCode(String),

    #[error("輸入驗證失敗: {0}")]
    Validation(String),
}

impl LedgerError {
    /// 是否為呼叫端輸入造成的錯誤（非內部不變量違反）
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, LedgerError::OverConsumption { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// 將可選文字欄位去除空白，空字串視為未填
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// 必填文字欄位：去除空白後不得為空
pub fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(format!("{} 為必填", field)));
    }
    Ok(trimmed.to_string())
}
