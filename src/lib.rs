//! # Store Ledger
//!
//! 專案物料倉庫帳：入庫建立批次、出庫依 FIFO 消耗、即時庫存彙總與報表。
//!
//! ## 使用範例
//!
//! ```
//! use rust_decimal::Decimal;
//! use store_ledger::{
//!     InwardMetadata, LedgerConfig, LedgerEngine, MaterialDraft, OutwardMetadata, ProjectDraft,
//!     StockKey,
//! };
//!
//! let engine = LedgerEngine::new(LedgerConfig::default()).unwrap();
//! let project = engine.create_project(ProjectDraft::new("Tower", "TWR")).unwrap();
//! let steel = engine.create_material(MaterialDraft::new("Steel", "ST-1")).unwrap();
//! engine.link_material(project.id, steel.id, None).unwrap();
//!
//! let key = StockKey::new(project.id, steel.id);
//! engine.record_inward(key, Decimal::from(10), InwardMetadata::new()).unwrap();
//! let out = engine.record_outward(key, Decimal::from(4), OutwardMetadata::new()).unwrap();
//!
//! assert_eq!(out.consumptions.len(), 1);
//! assert_eq!(engine.available(&key), Decimal::from(6));
//! ```

pub mod settings;
pub mod telemetry;

pub use ledger_cache::CacheStats;
pub use ledger_core::{
    BatchConsumption, BatchState, InwardBatch, InwardMetadata, LedgerConfig, LedgerError,
    Material, MaterialDraft, MaterialLink, OutwardMetadata, OutwardMovement, Project,
    ProjectDraft, ProjectStatus, Result, StockKey, StockSummary,
};
pub use ledger_engine::{
    Dashboard, InventoryAnalytics, LedgerEngine, MaterialConsumption, MaterialDetail,
    MaterialStock, MovementKind, MovementReport, MovementView, ProjectConsumption, ReportFacade,
};
