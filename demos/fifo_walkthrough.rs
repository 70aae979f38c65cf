//! FIFO 出庫示例

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use store_ledger::{
    settings, telemetry, InwardMetadata, LedgerEngine, MaterialDraft, OutwardMetadata,
    ProjectDraft, StockKey,
};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init(telemetry::DEFAULT_FILTER);

    let config = settings::load().context("載入配置失敗")?;
    tracing::info!(
        "配置: 小數位數 {}, 容差 {}, 摘要快取 {}",
        config.quantity_scale,
        config.tolerance,
        config.enable_summary_cache
    );
    let engine = LedgerEngine::new(config)?;

    println!("=== FIFO 出庫示例 ===\n");

    let project = engine.create_project(
        ProjectDraft::new("Harbour Bridge", "HB-01").with_client_location("Chennai"),
    )?;
    let steel = engine.create_material(
        MaterialDraft::new("Steel Rod", "ST-001")
            .with_unit("kg")
            .with_minimum_stock(Decimal::from(50)),
    )?;
    engine.link_material(project.id, steel.id, None)?;
    let key = StockKey::new(project.id, steel.id);

    let now = Utc::now();
    engine.record_inward(
        key,
        Decimal::from(100),
        InwardMetadata::new()
            .at(now - Duration::hours(4))
            .with_batch_number("BATCH-1")
            .with_supplier("Supplier A"),
    )?;
    engine.record_inward(
        key,
        Decimal::from(50),
        InwardMetadata::new()
            .at(now - Duration::hours(1))
            .with_batch_number("BATCH-2")
            .with_supplier("Supplier A"),
    )?;

    let outward = engine.record_outward(
        key,
        Decimal::from(120),
        OutwardMetadata::new().at(now).with_issued_to("Site"),
    )?;

    println!("出庫 {} {}:", outward.quantity, steel.unit.as_deref().unwrap_or(""));
    for consumption in &outward.consumptions {
        println!("  - {} 取用 {}", consumption.batch_label, consumption.quantity);
    }

    if let Err(err) = engine.record_outward(key, Decimal::from(40), OutwardMetadata::new()) {
        println!("\n第二次出庫被拒絕: {}", err);
    }

    let summary = engine.stock_summary(key)?;
    println!(
        "\n現有庫存: {} (入 {} / 出 {})",
        summary.current_stock, summary.total_in, summary.total_out
    );

    let low = engine.reports().get_low_stock(Some(project.id))?;
    println!("低庫存物料: {}", low.len());

    let dashboard = engine.reports().get_dashboard(None)?;
    println!(
        "\n儀表板 JSON:\n{}",
        serde_json::to_string_pretty(&dashboard)?
    );

    Ok(())
}
