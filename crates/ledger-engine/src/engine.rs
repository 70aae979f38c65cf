//! 庫存帳引擎
//!
//! 入庫建立批次、出庫依 FIFO 消耗批次。每個庫存鍵擁有獨立分區與讀寫鎖：
//! 同一鍵的異動互斥，不同鍵可並行；讀取只會看到異動前或異動後的完整狀態。
//!
//! 鎖順序：主檔目錄 → 分區表 → 分區。

use chrono::Utc;
use ledger_cache::{CacheStats, SummaryCache};
use ledger_core::{
    BatchConsumption, InwardBatch, InwardMetadata, LedgerConfig, LedgerError, Material,
    MaterialDraft, MaterialLink, OutwardMetadata, OutwardMovement, Project, ProjectDraft,
    ProjectStatus, Result, StockKey, StockSummary,
};
use parking_lot::RwLock;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::aggregator::{LedgerTotals, StockAggregator};
use crate::batch_store::BatchStore;
use crate::catalog::Catalog;
use crate::views::MaterialStock;

/// 單一庫存鍵的帳務分區
#[derive(Debug, Clone, Default)]
pub struct Partition {
    batches: BatchStore,
    outwards: Vec<OutwardMovement>,
    /// 每次提交異動遞增
    version: u64,
}

impl Partition {
    pub fn batches(&self) -> &BatchStore {
        &self.batches
    }

    /// 出庫記錄（依記錄順序）
    pub fn outwards(&self) -> &[OutwardMovement] {
        &self.outwards
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.outwards.is_empty()
    }
}

/// 庫存帳引擎
pub struct LedgerEngine {
    config: LedgerConfig,
    catalog: RwLock<Catalog>,
    partitions: RwLock<HashMap<StockKey, Arc<RwLock<Partition>>>>,
    sequence: AtomicU64,
    cache: Option<SummaryCache>,
}

impl LedgerEngine {
    /// 創建新的庫存帳引擎
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let cache = config.enable_summary_cache.then(SummaryCache::new);
        Ok(Self {
            config,
            catalog: RwLock::new(Catalog::new()),
            partitions: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            cache,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // 入庫 / 出庫
    // ------------------------------------------------------------------

    /// 記錄入庫，建立新批次
    pub fn record_inward(
        &self,
        key: StockKey,
        quantity: Decimal,
        mut metadata: InwardMetadata,
    ) -> Result<InwardBatch> {
        let quantity = self.config.validate_quantity(quantity)?;
        if let Some(declared) = metadata.declared_quantity {
            metadata.declared_quantity = Some(self.config.validate_quantity(declared)?);
        }
        metadata.weight_tons = self.validate_weight(metadata.weight_tons)?;

        let catalog = self.catalog.read();
        catalog.ensure_stock_key(&key)?;

        let partition = self.partition_or_create(key);
        let mut partition = partition.write();

        let batch = self.new_batch(key, quantity, metadata);
        let batch = partition.batches.add_batch(batch)?.clone();
        self.commit(key, &mut partition);
        drop(partition);
        drop(catalog);

        tracing::info!(
            "入庫完成: {} 批次 {} 數量 {}",
            key,
            batch.label(),
            batch.received_quantity
        );
        Ok(batch)
    }

    /// 記錄出庫，依 FIFO 消耗批次
    ///
    /// 全部驗證完成後才修改；庫存不足時整筆拒絕，不做部分扣減。
    pub fn record_outward(
        &self,
        key: StockKey,
        quantity: Decimal,
        mut metadata: OutwardMetadata,
    ) -> Result<OutwardMovement> {
        let requested = self.config.validate_quantity(quantity)?;
        metadata.weight_tons = self.validate_weight(metadata.weight_tons)?;

        let catalog = self.catalog.read();
        catalog.ensure_stock_key(&key)?;

        let Some(partition) = self.partition(&key) else {
            tracing::warn!("出庫拒絕: {} 無任何批次，需要 {}", key, requested);
            return Err(LedgerError::InsufficientStock {
                requested,
                available: Decimal::ZERO,
            });
        };
        let mut partition = partition.write();

        let available = partition.batches.available();
        if self.config.exceeds(requested, available) {
            tracing::warn!(
                "出庫拒絕: {} 庫存不足，需要 {}, 可用 {}",
                key,
                requested,
                available
            );
            return Err(LedgerError::InsufficientStock {
                requested,
                available,
            });
        }

        // 在副本上扣減，成功才替換
        let mut staged = partition.batches.clone();
        let consumptions = match allocate_fifo(&mut staged, requested, self.config.tolerance) {
            Ok(consumptions) => consumptions,
            Err(err) => {
                tracing::error!("FIFO 扣減失敗 {}: {}", key, err);
                return Err(err);
            }
        };

        let movement = OutwardMovement::new(
            key,
            self.next_sequence(),
            requested,
            metadata,
            consumptions,
            Utc::now(),
        );
        partition.batches = staged;
        partition.outwards.push(movement.clone());
        self.commit(key, &mut partition);
        drop(partition);
        drop(catalog);

        tracing::info!(
            "出庫完成: {} 數量 {}，消耗 {} 個批次",
            key,
            movement.quantity,
            movement.consumptions.len()
        );
        Ok(movement)
    }

    /// 期初庫存：記入一般倉
    pub fn record_opening_balance(
        &self,
        material_id: Uuid,
        quantity: Decimal,
    ) -> Result<InwardBatch> {
        let code = self.catalog.read().material(material_id)?.code.clone();
        self.record_inward(
            StockKey::general(material_id),
            quantity,
            opening_metadata(&code),
        )
    }

    // ------------------------------------------------------------------
    // 主檔
    // ------------------------------------------------------------------

    pub fn create_project(&self, draft: ProjectDraft) -> Result<Project> {
        let project = self.catalog.write().add_project(draft, Utc::now())?;
        tracing::info!("建立專案: {} ({})", project.code, project.id);
        Ok(project)
    }

    pub fn update_project_status(&self, project_id: Uuid, status: ProjectStatus) -> Result<Project> {
        self.catalog
            .write()
            .set_project_status(project_id, status, Utc::now())
    }

    pub fn project(&self, project_id: Uuid) -> Result<Project> {
        self.catalog.read().project(project_id).cloned()
    }

    /// 全部專案（依建立順序）
    pub fn projects(&self) -> Vec<Project> {
        self.catalog.read().projects().into_iter().cloned().collect()
    }

    /// 建立物料；草稿帶有期初數量時同時記入一般倉
    ///
    /// 物料與期初批次一併成立：任一步失敗，目錄與帳務都不留下痕跡。
    /// 期初數量為零視為未填；負數或四捨五入後為零則回傳 `InvalidQuantity`。
    pub fn create_material(&self, draft: MaterialDraft) -> Result<Material> {
        let initial_quantity = match draft.initial_quantity {
            Some(quantity) if quantity.is_zero() => None,
            Some(quantity) => Some(self.config.validate_quantity(quantity)?),
            None => None,
        };

        let mut catalog = self.catalog.write();
        let material = catalog.add_material(draft, Utc::now())?;

        if let Some(quantity) = initial_quantity {
            let key = StockKey::general(material.id);
            let batch = self.new_batch(key, quantity, opening_metadata(&material.code));
            let mut partition = Partition::default();
            if let Err(err) = partition.batches.add_batch(batch) {
                catalog.remove_material(material.id)?;
                return Err(err);
            }
            self.commit(key, &mut partition);
            self.partitions
                .write()
                .insert(key, Arc::new(RwLock::new(partition)));
            tracing::info!("期初庫存: {} 數量 {}", material.code, quantity);
        }
        drop(catalog);

        tracing::info!("建立物料: {} ({})", material.code, material.id);
        Ok(material)
    }

    pub fn update_material(&self, material_id: Uuid, draft: MaterialDraft) -> Result<Material> {
        self.catalog
            .write()
            .update_material(material_id, draft, Utc::now())
    }

    /// 刪除物料；仍有連結或任何異動記錄時拒絕
    pub fn delete_material(&self, material_id: Uuid) -> Result<Material> {
        let mut catalog = self.catalog.write();
        catalog.material(material_id)?;

        let has_history = self
            .partitions
            .read()
            .iter()
            .any(|(key, partition)| key.material_id == material_id && !partition.read().is_empty());
        if has_history {
            return Err(LedgerError::MaterialInUse(
                "物料已有入出庫記錄".to_string(),
            ));
        }

        let material = catalog.remove_material(material_id)?;
        tracing::info!("刪除物料: {}", material.code);
        Ok(material)
    }

    pub fn material(&self, material_id: Uuid) -> Result<Material> {
        self.catalog.read().material(material_id).cloned()
    }

    pub fn materials(&self) -> Vec<Material> {
        self.catalog.read().materials().into_iter().cloned().collect()
    }

    /// 物料在所有專案與一般倉的合計庫存
    pub fn material_stock(&self, material_id: Uuid) -> Result<MaterialStock> {
        let material = self.material(material_id)?;
        let partitions: Vec<Arc<RwLock<Partition>>> = self
            .partition_handles()
            .into_iter()
            .filter(|(key, _)| key.material_id == material_id)
            .map(|(_, partition)| partition)
            .collect();
        Ok(material_stock_of(material, &partitions))
    }

    /// 全部物料的合計庫存（依建立時間、圖號排序）
    pub fn materials_with_stock(&self) -> Vec<MaterialStock> {
        let materials = self.materials();
        let mut by_material: HashMap<Uuid, Vec<Arc<RwLock<Partition>>>> = HashMap::new();
        for (key, partition) in self.partition_handles() {
            by_material.entry(key.material_id).or_default().push(partition);
        }

        materials
            .into_par_iter()
            .map(|material| {
                let partitions = by_material
                    .get(&material.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                material_stock_of(material, partitions)
            })
            .collect()
    }

    pub fn link_material(
        &self,
        project_id: Uuid,
        material_id: Uuid,
        location_override: Option<String>,
    ) -> Result<MaterialLink> {
        self.catalog
            .write()
            .link(project_id, material_id, location_override, Utc::now())
    }

    /// 取消連結；該庫存鍵已有異動記錄時拒絕
    pub fn unlink_material(&self, project_id: Uuid, material_id: Uuid) -> Result<MaterialLink> {
        let mut catalog = self.catalog.write();
        let key = StockKey::new(project_id, material_id);
        let in_use = self
            .partition(&key)
            .map(|partition| !partition.read().is_empty())
            .unwrap_or(false);
        if in_use {
            return Err(LedgerError::MaterialInUse(format!(
                "{} 已有入出庫記錄",
                key
            )));
        }
        catalog.unlink(project_id, material_id)
    }

    /// 專案連結的物料（依連結順序）
    pub fn project_materials(&self, project_id: Uuid) -> Result<Vec<(MaterialLink, Material)>> {
        let catalog = self.catalog.read();
        catalog
            .links_for_project(project_id)?
            .into_iter()
            .map(|link| Ok((link.clone(), catalog.material(link.material_id)?.clone())))
            .collect()
    }

    // ------------------------------------------------------------------
    // 查詢
    // ------------------------------------------------------------------

    /// 可消耗批次快照（FIFO 順序）
    pub fn consumable_batches(&self, key: &StockKey) -> Vec<InwardBatch> {
        self.read_partition(key, |p| p.batches.iter_consumable().cloned().collect())
            .unwrap_or_default()
    }

    /// 全部批次快照（FIFO 順序，含已耗盡）
    pub fn batches(&self, key: &StockKey) -> Vec<InwardBatch> {
        self.read_partition(key, |p| p.batches.batches().to_vec())
            .unwrap_or_default()
    }

    /// 出庫記錄快照（依記錄順序）
    pub fn outwards(&self, key: &StockKey) -> Vec<OutwardMovement> {
        self.read_partition(key, |p| p.outwards.clone())
            .unwrap_or_default()
    }

    pub fn available(&self, key: &StockKey) -> Decimal {
        self.read_partition(key, |p| p.batches.available())
            .unwrap_or(Decimal::ZERO)
    }

    /// 單一庫存鍵的摘要
    pub fn stock_summary(&self, key: StockKey) -> Result<StockSummary> {
        let material = self.catalog.read().material(key.material_id)?.clone();
        Ok(self.summarize_key(key, &material))
    }

    /// 批次查詢多個庫存鍵的摘要（並行計算，保持輸入順序）
    pub fn stock_summaries(&self, keys: &[StockKey]) -> Result<Vec<StockSummary>> {
        let targets: Vec<(StockKey, Material)> = {
            let catalog = self.catalog.read();
            keys.iter()
                .map(|key| Ok((*key, catalog.material(key.material_id)?.clone())))
                .collect::<Result<_>>()?
        };

        Ok(targets
            .par_iter()
            .map(|(key, material)| self.summarize_key(*key, material))
            .collect())
    }

    /// 專案所有連結物料的摘要（依連結順序）
    pub fn project_stock_summaries(&self, project_id: Uuid) -> Result<Vec<StockSummary>> {
        let keys: Vec<StockKey> = self
            .catalog
            .read()
            .links_for_project(project_id)?
            .iter()
            .map(|link| StockKey::new(link.project_id, link.material_id))
            .collect();
        self.stock_summaries(&keys)
    }

    /// 全組織的庫存鍵：所有專案連結，加上已有異動的一般倉
    pub fn all_stock_keys(&self) -> Vec<StockKey> {
        let mut keys: Vec<StockKey> = self
            .catalog
            .read()
            .links()
            .iter()
            .map(|link| StockKey::new(link.project_id, link.material_id))
            .collect();
        let mut general: Vec<StockKey> = self
            .partitions
            .read()
            .keys()
            .filter(|key| key.is_general())
            .copied()
            .collect();
        general.sort();
        keys.extend(general);
        keys
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(SummaryCache::stats)
    }

    // ------------------------------------------------------------------
    // 內部
    // ------------------------------------------------------------------

    /// 在分區讀鎖下執行；分區不存在時回傳 None
    pub(crate) fn read_partition<R>(
        &self,
        key: &StockKey,
        f: impl FnOnce(&Partition) -> R,
    ) -> Option<R> {
        let partition = self.partition(key)?;
        let guard = partition.read();
        Some(f(&guard))
    }

    /// 分區表快照，依庫存鍵排序
    pub(crate) fn partition_handles(&self) -> Vec<(StockKey, Arc<RwLock<Partition>>)> {
        let mut handles: Vec<_> = self
            .partitions
            .read()
            .iter()
            .map(|(key, partition)| (*key, Arc::clone(partition)))
            .collect();
        handles.sort_by_key(|(key, _)| *key);
        handles
    }

    pub(crate) fn catalog(&self) -> &RwLock<Catalog> {
        &self.catalog
    }

    /// 在已持有分區讀鎖時取得摘要（優先使用快取）
    pub(crate) fn summarize_locked(
        &self,
        key: StockKey,
        material: &Material,
        partition: &Partition,
    ) -> StockSummary {
        if let Some(cache) = &self.cache {
            if let Some(mut summary) = cache.get(&key, partition.version) {
                // 顯示欄位以目前主檔為準
                summary.material_name = material.name.clone();
                summary.material_code = material.code.clone();
                summary.unit = material.unit.clone();
                return summary;
            }
        }

        let summary =
            StockAggregator::summarize(key, material, &partition.batches, &partition.outwards);
        if let Some(cache) = &self.cache {
            cache.put(key, partition.version, summary.clone());
        }
        summary
    }

    fn summarize_key(&self, key: StockKey, material: &Material) -> StockSummary {
        self.read_partition(&key, |partition| {
            self.summarize_locked(key, material, partition)
        })
        .unwrap_or_else(|| StockSummary::empty(key, material))
    }

    fn partition(&self, key: &StockKey) -> Option<Arc<RwLock<Partition>>> {
        self.partitions.read().get(key).cloned()
    }

    fn partition_or_create(&self, key: StockKey) -> Arc<RwLock<Partition>> {
        if let Some(partition) = self.partition(&key) {
            return partition;
        }
        let mut partitions = self.partitions.write();
        Arc::clone(partitions.entry(key).or_default())
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn new_batch(&self, key: StockKey, quantity: Decimal, metadata: InwardMetadata) -> InwardBatch {
        InwardBatch::new(key, self.next_sequence(), quantity, metadata, Utc::now())
    }

    /// 提交異動：遞增版本並使快取失效（仍持有分區寫鎖）
    fn commit(&self, key: StockKey, partition: &mut Partition) {
        partition.version += 1;
        if let Some(cache) = &self.cache {
            cache.invalidate(key);
        }
    }

    fn validate_weight(&self, weight: Option<Decimal>) -> Result<Option<Decimal>> {
        match weight {
            Some(w) if w < Decimal::ZERO => Err(LedgerError::InvalidQuantity(w)),
            Some(w) => Ok(Some(self.config.normalize_quantity(w))),
            None => Ok(None),
        }
    }
}

/// 期初批次的附帶資訊
fn opening_metadata(code: &str) -> InwardMetadata {
    InwardMetadata::new()
        .with_batch_number(format!("INIT-{}", code))
        .with_supplier("Opening Balance")
        .with_reference("Initial Stock")
}

/// 合計單一物料各分區的庫存
fn material_stock_of(material: Material, partitions: &[Arc<RwLock<Partition>>]) -> MaterialStock {
    let totals = partitions
        .iter()
        .map(|partition| {
            let partition = partition.read();
            StockAggregator::totals(&partition.batches, &partition.outwards)
        })
        .fold(LedgerTotals::default(), |acc, totals| acc + totals);
    MaterialStock::new(material, totals, partitions.len())
}

/// FIFO 扣減：依序從最舊的未耗盡批次取用，直到滿足需求
///
/// 取用量合計恰等於 `quantity`。呼叫端須先確認可用量足夠；任何扣減失敗都代表內部錯誤。
pub fn allocate_fifo(
    store: &mut BatchStore,
    quantity: Decimal,
    tolerance: Decimal,
) -> Result<Vec<BatchConsumption>> {
    let mut still_needed = quantity;
    let mut plan = Vec::new();

    for batch in store.iter_consumable() {
        if still_needed <= Decimal::ZERO {
            break;
        }
        let take = batch.remaining_quantity.min(still_needed);
        plan.push(BatchConsumption::new(batch.id, batch.label(), take));
        still_needed -= take;
    }

    if still_needed > Decimal::ZERO {
        return Err(LedgerError::InsufficientStock {
            requested: quantity,
            available: quantity - still_needed,
        });
    }

    for consumption in &plan {
        let remaining = store.decrement_remaining(consumption.batch_id, consumption.quantity, tolerance)?;
        tracing::debug!(
            "FIFO 扣減: 批次 {} 取用 {}，剩餘 {}",
            consumption.batch_label,
            consumption.quantity,
            remaining
        );
    }

    Ok(plan)
}
