//! 查詢/報表
//!
//! 唯讀：每個分區在讀鎖下取快照，報表只會看到完整提交的異動。

use ledger_core::{Material, Project, Result, StockKey, StockSummary};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::aggregator::{LedgerTotals, StockAggregator};
use crate::engine::LedgerEngine;
use crate::views::{
    sort_newest_first, Dashboard, InventoryAnalytics, MaterialConsumption, MaterialDetail,
    MovementKind, MovementReport, MovementView, ProjectConsumption,
};

/// 報表查詢入口
pub struct ReportFacade<'a> {
    engine: &'a LedgerEngine,
}

/// 主檔快照，避免在讀分區時持有目錄鎖
struct CatalogSnapshot {
    projects: HashMap<Uuid, Project>,
    materials: HashMap<Uuid, Material>,
}

impl CatalogSnapshot {
    fn project_name(&self, project_id: Option<Uuid>) -> Option<&str> {
        project_id
            .and_then(|id| self.projects.get(&id))
            .map(|p| p.name.as_str())
    }
}

impl LedgerEngine {
    /// 取得報表查詢入口
    pub fn reports(&self) -> ReportFacade<'_> {
        ReportFacade { engine: self }
    }
}

impl<'a> ReportFacade<'a> {
    pub fn new(engine: &'a LedgerEngine) -> Self {
        Self { engine }
    }

    /// 儀表板
    ///
    /// 未指定或找不到專案時，選取第一個建立的專案。
    pub fn get_dashboard(&self, project_id: Option<Uuid>) -> Result<Dashboard> {
        let projects = self.engine.projects();
        let selected = project_id
            .and_then(|id| projects.iter().find(|p| p.id == id))
            .or_else(|| projects.first())
            .cloned();

        let (material_summaries, recent_activity) = match &selected {
            Some(project) => (
                self.engine.project_stock_summaries(project.id)?,
                self.recent_activity(Some(project.id), self.engine.config().recent_activity_limit),
            ),
            None => (Vec::new(), Vec::new()),
        };

        Ok(Dashboard {
            project_count: projects.len(),
            projects,
            selected_project: selected,
            material_summaries,
            recent_activity,
        })
    }

    /// 最近異動（由新到舊，最多 `limit` 筆）
    pub fn recent_activity(&self, project_id: Option<Uuid>, limit: usize) -> Vec<MovementView> {
        let mut views = self.collect_movements(project_id, false);
        sort_newest_first(&mut views);
        views.truncate(limit);
        views
    }

    /// 專案物料明細
    pub fn get_material_detail(&self, project_id: Uuid, material_id: Uuid) -> Result<MaterialDetail> {
        let key = StockKey::new(project_id, material_id);
        let (project, material) = {
            let catalog = self.engine.catalog().read();
            let material = catalog.ensure_stock_key(&key)?.clone();
            (catalog.project(project_id)?.clone(), material)
        };

        let snapshot = self.engine.read_partition(&key, |partition| {
            (
                self.engine.summarize_locked(key, &material, partition),
                partition.batches().batches().to_vec(),
                partition.outwards().to_vec(),
            )
        });
        let (summary, batches, outwards) = snapshot
            .unwrap_or_else(|| (StockSummary::empty(key, &material), Vec::new(), Vec::new()));

        let name = Some(project.name.as_str());
        let inwards: Vec<MovementView> = batches
            .iter()
            .map(|batch| MovementView::inward(batch, name, &material))
            .collect();
        let mut outwards: Vec<MovementView> = outwards
            .iter()
            .map(|movement| MovementView::outward(movement, name, &material))
            .collect();
        sort_newest_first(&mut outwards);

        let mut history: Vec<MovementView> =
            inwards.iter().chain(outwards.iter()).cloned().collect();
        sort_newest_first(&mut history);

        Ok(MaterialDetail {
            project,
            material,
            summary,
            inwards,
            outwards,
            history,
        })
    }

    /// 異動報表
    ///
    /// 指定專案時只含該專案；否則含全部（包括一般倉）。
    pub fn get_movement_report(
        &self,
        project_id: Option<Uuid>,
        with_running_balance: bool,
    ) -> Result<MovementReport> {
        let projects = self.engine.projects();
        let selected_project = match project_id {
            Some(id) => Some(self.engine.project(id)?),
            None => None,
        };

        let mut movements = self.collect_movements(project_id, with_running_balance);
        sort_newest_first(&mut movements);

        let total_of = |kind: MovementKind| -> Decimal {
            movements
                .iter()
                .filter(|m| m.kind == kind)
                .map(|m| m.quantity)
                .sum()
        };
        let total_in = total_of(MovementKind::Inward);
        let total_out = total_of(MovementKind::Outward);

        Ok(MovementReport {
            projects,
            selected_project,
            movements,
            total_in,
            total_out,
        })
    }

    /// 全組織庫存分析
    pub fn get_inventory_analytics(&self) -> InventoryAnalytics {
        let catalog = self.snapshot();
        let handles = self.engine.partition_handles();

        // 每個分區只讀取一次，合計與消耗取自同一份快照
        let per_partition: Vec<(StockKey, LedgerTotals, bool)> = handles
            .par_iter()
            .map(|(key, partition)| {
                let partition = partition.read();
                let totals = StockAggregator::totals(partition.batches(), partition.outwards());
                (*key, totals, !partition.outwards().is_empty())
            })
            .collect();

        let totals = per_partition
            .iter()
            .fold(LedgerTotals::default(), |acc, (_, totals, _)| acc + *totals);

        // 專案 → 物料 → 出庫合計
        let mut consumption: HashMap<Uuid, BTreeMap<Uuid, LedgerTotals>> = HashMap::new();
        for (key, totals, has_outwards) in per_partition {
            let Some(project_id) = key.project_id.filter(|_| has_outwards) else {
                continue;
            };
            consumption
                .entry(project_id)
                .or_default()
                .insert(key.material_id, totals);
        }

        let mut project_consumption: Vec<ProjectConsumption> = consumption
            .into_iter()
            .filter_map(|(project_id, per_material)| {
                let project = catalog.projects.get(&project_id)?;
                let mut materials: Vec<MaterialConsumption> = per_material
                    .into_iter()
                    .filter_map(|(material_id, out)| {
                        let material = catalog.materials.get(&material_id)?;
                        Some(MaterialConsumption {
                            material_id,
                            material_name: material.name.clone(),
                            material_code: material.code.clone(),
                            unit: material.unit.clone(),
                            quantity_out: out.quantity_out,
                            tons_out: non_zero(out.tons_out),
                            units_out: (out.units_out != 0).then_some(out.units_out),
                        })
                    })
                    .collect();
                materials.sort_by(|a, b| a.material_name.cmp(&b.material_name));

                Some(ProjectConsumption {
                    project_id,
                    project_name: project.name.clone(),
                    project_code: project.code.clone(),
                    total_out: materials.iter().map(|m| m.quantity_out).sum(),
                    materials,
                })
            })
            .collect();
        project_consumption.sort_by(|a, b| a.project_name.cmp(&b.project_name));

        let has_tons = totals.tons_in != Decimal::ZERO || totals.tons_out != Decimal::ZERO;
        let has_units = totals.units_in != 0 || totals.units_out != 0;

        InventoryAnalytics {
            project_count: catalog.projects.len(),
            material_count: catalog.materials.len(),
            quantity_in: totals.quantity_in,
            quantity_out: totals.quantity_out,
            quantity_on_hand: totals.quantity_on_hand,
            tons_in: has_tons.then_some(totals.tons_in),
            tons_out: has_tons.then_some(totals.tons_out),
            tons_on_hand: has_tons.then(|| totals.tons_on_hand()),
            units_in: has_units.then_some(totals.units_in),
            units_out: has_units.then_some(totals.units_out),
            units_on_hand: has_units.then(|| totals.units_on_hand()),
            project_consumption,
        }
    }

    /// 低於最低庫存的摘要
    ///
    /// 指定專案時檢查其連結物料；否則檢查全組織所有庫存鍵。
    pub fn get_low_stock(&self, project_id: Option<Uuid>) -> Result<Vec<StockSummary>> {
        let summaries = match project_id {
            Some(id) => self.engine.project_stock_summaries(id)?,
            None => self.engine.stock_summaries(&self.engine.all_stock_keys())?,
        };
        let catalog = self.snapshot();

        Ok(summaries
            .into_iter()
            .filter(|summary| {
                catalog
                    .materials
                    .get(&summary.key.material_id)
                    .is_some_and(|m| m.is_below_minimum(summary.current_stock))
            })
            .collect())
    }

    fn snapshot(&self) -> CatalogSnapshot {
        let catalog = self.engine.catalog().read();
        CatalogSnapshot {
            projects: catalog
                .projects()
                .into_iter()
                .map(|p| (p.id, p.clone()))
                .collect(),
            materials: catalog
                .materials()
                .into_iter()
                .map(|m| (m.id, m.clone()))
                .collect(),
        }
    }

    /// 收集異動視圖（未排序）
    fn collect_movements(&self, project_id: Option<Uuid>, with_balance: bool) -> Vec<MovementView> {
        let catalog = self.snapshot();
        let handles: Vec<_> = self
            .engine
            .partition_handles()
            .into_iter()
            .filter(|(key, _)| project_id.is_none() || key.project_id == project_id)
            .collect();

        handles
            .par_iter()
            .map(|(key, partition)| {
                let Some(material) = catalog.materials.get(&key.material_id) else {
                    return Vec::new();
                };
                let name = catalog.project_name(key.project_id);
                let partition = partition.read();

                let mut views: Vec<MovementView> = partition
                    .batches()
                    .batches()
                    .iter()
                    .map(|batch| MovementView::inward(batch, name, material))
                    .chain(
                        partition
                            .outwards()
                            .iter()
                            .map(|movement| MovementView::outward(movement, name, material)),
                    )
                    .collect();

                if with_balance {
                    let balances = StockAggregator::running_balances(
                        partition.batches().batches(),
                        partition.outwards(),
                    );
                    for view in &mut views {
                        view.balance_after = balances.get(&view.id).copied();
                    }
                }
                views
            })
            .flatten()
            .collect()
    }
}

fn non_zero(value: Decimal) -> Option<Decimal> {
    (value != Decimal::ZERO).then_some(value)
}
