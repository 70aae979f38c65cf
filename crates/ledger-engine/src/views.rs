//! 報表視圖模型
//!
//! 查詢結果一律為可序列化的快照，與帳務狀態無共享。

use chrono::{DateTime, Utc};
use ledger_core::{InwardBatch, Material, OutwardMovement, Project, StockSummary};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregator::LedgerTotals;

/// 異動方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "IN")]
    Inward,
    #[serde(rename = "OUT")]
    Outward,
}

/// 單筆異動的顯示視圖（入庫或出庫）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementView {
    pub id: Uuid,
    pub kind: MovementKind,
    pub sequence: u64,

    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub material_id: Uuid,
    pub material_name: String,
    pub material_code: String,

    pub quantity: Decimal,
    pub movement_time: DateTime<Utc>,

    /// 入庫專用
    pub declared_quantity: Option<Decimal>,
    pub batch_number: Option<String>,
    pub vehicle_number: Option<String>,
    pub supplier: Option<String>,
    pub remaining_quantity: Option<Decimal>,

    /// 出庫專用
    pub issued_to: Option<String>,
    pub batch_summary: Option<String>,

    pub weight_tons: Option<Decimal>,
    pub units_count: Option<u32>,
    pub reference: Option<String>,
    pub remarks: Option<String>,

    /// 該筆異動後的結存（僅在要求時計算）
    pub balance_after: Option<Decimal>,
}

impl MovementView {
    pub fn inward(batch: &InwardBatch, project_name: Option<&str>, material: &Material) -> Self {
        Self {
            id: batch.id,
            kind: MovementKind::Inward,
            sequence: batch.sequence,
            project_id: batch.project_id,
            project_name: project_name.map(str::to_string),
            material_id: batch.material_id,
            material_name: material.name.clone(),
            material_code: material.code.clone(),
            quantity: batch.received_quantity,
            movement_time: batch.movement_time,
            declared_quantity: batch.declared_quantity,
            batch_number: Some(batch.label()),
            vehicle_number: batch.vehicle_number.clone(),
            supplier: batch.supplier.clone(),
            remaining_quantity: Some(batch.remaining_quantity),
            issued_to: None,
            batch_summary: None,
            weight_tons: batch.weight_tons,
            units_count: batch.units_count,
            reference: batch.reference.clone(),
            remarks: batch.remarks.clone(),
            balance_after: None,
        }
    }

    pub fn outward(
        movement: &OutwardMovement,
        project_name: Option<&str>,
        material: &Material,
    ) -> Self {
        Self {
            id: movement.id,
            kind: MovementKind::Outward,
            sequence: movement.sequence,
            project_id: movement.project_id,
            project_name: project_name.map(str::to_string),
            material_id: movement.material_id,
            material_name: material.name.clone(),
            material_code: material.code.clone(),
            quantity: movement.quantity,
            movement_time: movement.movement_time,
            declared_quantity: None,
            batch_number: None,
            vehicle_number: None,
            supplier: None,
            remaining_quantity: None,
            issued_to: movement.issued_to.clone(),
            batch_summary: movement.batch_summary(),
            weight_tons: movement.weight_tons,
            units_count: movement.units_count,
            reference: movement.reference.clone(),
            remarks: movement.remarks.clone(),
            balance_after: None,
        }
    }

    /// 時間排序鍵
    pub fn time_key(&self) -> (DateTime<Utc>, u64) {
        (self.movement_time, self.sequence)
    }
}

/// 依時間由新到舊排序
pub fn sort_newest_first(views: &mut [MovementView]) {
    views.sort_by(|a, b| b.time_key().cmp(&a.time_key()));
}

/// 物料在全部庫存鍵（各專案與一般倉）的合計
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialStock {
    pub material: Material,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub current_stock: Decimal,
    pub total_tons_in: Decimal,
    pub total_tons_out: Decimal,
    pub total_units_in: i64,
    pub total_units_out: i64,
    /// 有帳務記錄的庫存鍵數
    pub stock_keys: usize,
}

impl MaterialStock {
    pub fn new(material: Material, totals: LedgerTotals, stock_keys: usize) -> Self {
        Self {
            material,
            total_in: totals.quantity_in,
            total_out: totals.quantity_out,
            current_stock: totals.quantity_on_hand,
            total_tons_in: totals.tons_in,
            total_tons_out: totals.tons_out,
            total_units_in: totals.units_in,
            total_units_out: totals.units_out,
            stock_keys,
        }
    }

    /// 是否低於最低庫存
    pub fn is_below_minimum(&self) -> bool {
        self.material
            .minimum_stock
            .is_some_and(|minimum| self.current_stock < minimum)
    }
}

/// 儀表板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub projects: Vec<Project>,
    pub project_count: usize,
    pub selected_project: Option<Project>,
    pub material_summaries: Vec<StockSummary>,
    pub recent_activity: Vec<MovementView>,
}

/// 專案物料明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDetail {
    pub project: Project,
    pub material: Material,
    pub summary: StockSummary,
    /// 由舊到新
    pub inwards: Vec<MovementView>,
    /// 由新到舊
    pub outwards: Vec<MovementView>,
    /// 入出合併，由新到舊
    pub history: Vec<MovementView>,
}

/// 異動報表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementReport {
    pub projects: Vec<Project>,
    pub selected_project: Option<Project>,
    pub movements: Vec<MovementView>,
    pub total_in: Decimal,
    pub total_out: Decimal,
}

/// 全組織庫存分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAnalytics {
    pub project_count: usize,
    pub material_count: usize,

    pub quantity_in: Decimal,
    pub quantity_out: Decimal,
    pub quantity_on_hand: Decimal,

    /// 無任何噸數記錄時為 None
    pub tons_in: Option<Decimal>,
    pub tons_out: Option<Decimal>,
    pub tons_on_hand: Option<Decimal>,

    /// 無任何件數記錄時為 None
    pub units_in: Option<i64>,
    pub units_out: Option<i64>,
    pub units_on_hand: Option<i64>,

    pub project_consumption: Vec<ProjectConsumption>,
}

/// 單一專案的出庫消耗
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConsumption {
    pub project_id: Uuid,
    pub project_name: String,
    pub project_code: String,
    pub total_out: Decimal,
    pub materials: Vec<MaterialConsumption>,
}

/// 單一物料的出庫消耗
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConsumption {
    pub material_id: Uuid,
    pub material_name: String,
    pub material_code: String,
    pub unit: Option<String>,
    pub quantity_out: Decimal,
    pub tons_out: Option<Decimal>,
    pub units_out: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{BatchConsumption, InwardMetadata, MaterialDraft, OutwardMetadata, StockKey};

    #[test]
    fn test_movement_kind_serde() {
        assert_eq!(
            serde_json::to_string(&MovementKind::Inward).unwrap(),
            "\"IN\""
        );
        assert_eq!(
            serde_json::to_string(&MovementKind::Outward).unwrap(),
            "\"OUT\""
        );
    }

    #[test]
    fn test_views_and_ordering() {
        let material =
            Material::from_draft(MaterialDraft::new("Rebar", "RB-12"), Utc::now()).unwrap();
        let key = StockKey::new(Uuid::new_v4(), material.id);
        let t0 = Utc::now();

        let batch = InwardBatch::new(key, 1, Decimal::from(8), InwardMetadata::new().at(t0), t0);
        let movement = OutwardMovement::new(
            key,
            2,
            Decimal::from(3),
            OutwardMetadata::new().at(t0).with_issued_to("Site crew"),
            vec![BatchConsumption::new(batch.id, batch.label(), Decimal::from(3))],
            t0,
        );

        let inward = MovementView::inward(&batch, Some("Project A"), &material);
        let outward = MovementView::outward(&movement, Some("Project A"), &material);
        assert_eq!(inward.batch_number.as_deref(), Some("Batch-1"));
        assert_eq!(inward.remaining_quantity, Some(Decimal::from(8)));
        assert_eq!(outward.batch_summary.as_deref(), Some("Batch-1 (3)"));
        assert_eq!(outward.issued_to.as_deref(), Some("Site crew"));

        // 同一時間以序號決定先後
        let mut views = vec![inward, outward];
        sort_newest_first(&mut views);
        assert_eq!(views[0].kind, MovementKind::Outward);
        assert_eq!(views[1].kind, MovementKind::Inward);
    }
}
