//! # Store Ledger Engine
//!
//! 核心庫存帳引擎：批次儲存、FIFO 出庫、庫存彙總與報表查詢

pub mod aggregator;
pub mod batch_store;
pub mod catalog;
pub mod engine;
pub mod report;
pub mod views;

// Re-export 主要類型
pub use aggregator::{LedgerTotals, StockAggregator};
pub use batch_store::BatchStore;
pub use catalog::Catalog;
pub use engine::{allocate_fifo, LedgerEngine, Partition};
pub use report::ReportFacade;
pub use views::{
    Dashboard, InventoryAnalytics, MaterialConsumption, MaterialDetail, MaterialStock,
    MovementKind, MovementReport, MovementView, ProjectConsumption,
};
