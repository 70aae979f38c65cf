//! 物料模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{normalize_optional, require_text, LedgerError, Result};

/// 物料主檔
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// 物料ID
    pub id: Uuid,

    /// 物料名稱
    pub name: String,

    /// 圖號/料號（不分大小寫唯一）
    pub code: String,

    /// 單位
    pub unit: Option<String>,

    /// 類別
    pub category: Option<String>,

    /// 最低庫存
    pub minimum_stock: Option<Decimal>,

    /// 預設儲位
    pub default_location: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    /// 由草稿建立物料（欄位已正規化）
    pub fn from_draft(draft: MaterialDraft, now: DateTime<Utc>) -> Result<Self> {
        let draft = draft.normalized()?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: draft.name,
            code: draft.code,
            unit: draft.unit,
            category: draft.category,
            minimum_stock: draft.minimum_stock,
            default_location: draft.default_location,
            created_at: now,
            updated_at: now,
        })
    }

    /// 以草稿內容更新描述欄位，ID 不變
    pub fn apply(&mut self, draft: MaterialDraft, now: DateTime<Utc>) -> Result<()> {
        let draft = draft.normalized()?;
        self.name = draft.name;
        self.code = draft.code;
        self.unit = draft.unit;
        self.category = draft.category;
        self.minimum_stock = draft.minimum_stock;
        self.default_location = draft.default_location;
        self.updated_at = now;
        Ok(())
    }

    /// 代碼比對（不分大小寫）
    pub fn code_matches(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    /// 現有庫存是否低於最低庫存
    pub fn is_below_minimum(&self, current_stock: Decimal) -> bool {
        self.minimum_stock
            .map(|minimum| current_stock < minimum)
            .unwrap_or(false)
    }
}

/// 建立/更新物料的輸入
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialDraft {
    pub name: String,
    pub code: String,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub minimum_stock: Option<Decimal>,
    pub default_location: Option<String>,
    /// 期初數量（建立時若大於零，記入一般倉期初批次）
    pub initial_quantity: Option<Decimal>,
}

impl MaterialDraft {
    /// 創建新的物料草稿
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    /// 建構器模式：設置單位
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// 建構器模式：設置類別
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// 建構器模式：設置最低庫存
    pub fn with_minimum_stock(mut self, minimum_stock: Decimal) -> Self {
        self.minimum_stock = Some(minimum_stock);
        self
    }

    /// 建構器模式：設置預設儲位
    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = Some(location.into());
        self
    }

    /// 建構器模式：設置期初數量
    pub fn with_initial_quantity(mut self, quantity: Decimal) -> Self {
        self.initial_quantity = Some(quantity);
        self
    }

    fn normalized(self) -> Result<Self> {
        if let Some(minimum) = self.minimum_stock.filter(|m| *m < Decimal::ZERO) {
            return Err(LedgerError::Validation(format!("最低庫存不可為負: {}", minimum)));
        }
        Ok(Self {
            code: require_text(&self.code, "物料圖號")?,
            name: require_text(&self.name, "物料名稱")?,
            unit: normalize_optional(self.unit),
            category: normalize_optional(self.category),
            minimum_stock: self.minimum_stock,
            default_location: normalize_optional(self.default_location),
            initial_quantity: self.initial_quantity,
        })
    }
}
