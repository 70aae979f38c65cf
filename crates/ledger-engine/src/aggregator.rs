//! 庫存彙總
//!
//! 由批次與出庫記錄推導庫存摘要，本身不持有狀態。

use ledger_core::{InwardBatch, Material, OutwardMovement, StockKey, StockSummary};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::ops::Add;
use uuid::Uuid;

use crate::batch_store::BatchStore;

/// 數量、噸數、件數合計
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LedgerTotals {
    pub quantity_in: Decimal,
    pub quantity_out: Decimal,
    pub quantity_on_hand: Decimal,
    pub tons_in: Decimal,
    pub tons_out: Decimal,
    pub units_in: i64,
    pub units_out: i64,
}

impl LedgerTotals {
    pub fn tons_on_hand(&self) -> Decimal {
        self.tons_in - self.tons_out
    }

    pub fn units_on_hand(&self) -> i64 {
        self.units_in - self.units_out
    }
}

impl Add for LedgerTotals {
    type Output = LedgerTotals;

    fn add(self, other: LedgerTotals) -> LedgerTotals {
        LedgerTotals {
            quantity_in: self.quantity_in + other.quantity_in,
            quantity_out: self.quantity_out + other.quantity_out,
            quantity_on_hand: self.quantity_on_hand + other.quantity_on_hand,
            tons_in: self.tons_in + other.tons_in,
            tons_out: self.tons_out + other.tons_out,
            units_in: self.units_in + other.units_in,
            units_out: self.units_out + other.units_out,
        }
    }
}

/// 庫存彙總計算器
pub struct StockAggregator;

impl StockAggregator {
    /// 計算單一庫存鍵的摘要
    pub fn summarize(
        key: StockKey,
        material: &Material,
        batches: &BatchStore,
        outwards: &[OutwardMovement],
    ) -> StockSummary {
        let totals = Self::totals(batches, outwards);
        let mut summary = StockSummary::empty(key, material);

        summary.total_in = totals.quantity_in;
        summary.total_out = totals.quantity_out;
        summary.current_stock = totals.quantity_on_hand;
        summary.total_in_tons = totals.tons_in;
        summary.total_out_tons = totals.tons_out;
        summary.current_tons = totals.tons_on_hand();
        summary.total_in_units = totals.units_in;
        summary.total_out_units = totals.units_out;
        summary.current_units = totals.units_on_hand();
        summary.open_batches = batches.open_count();

        summary.last_in_time = batches.batches().iter().map(|b| b.movement_time).max();
        summary.last_out_time = outwards.iter().map(|o| o.movement_time).max();

        summary
    }

    /// 合計（現有庫存取批次剩餘量，而非入出相減）
    pub fn totals(batches: &BatchStore, outwards: &[OutwardMovement]) -> LedgerTotals {
        let mut totals = LedgerTotals::default();

        for batch in batches.batches() {
            totals.quantity_in += batch.received_quantity;
            totals.quantity_on_hand += batch.remaining_quantity;
            totals.tons_in += batch.weight_tons.unwrap_or(Decimal::ZERO);
            totals.units_in += i64::from(batch.units_count.unwrap_or(0));
        }

        for outward in outwards {
            totals.quantity_out += outward.quantity;
            totals.tons_out += outward.weight_tons.unwrap_or(Decimal::ZERO);
            totals.units_out += i64::from(outward.units_count.unwrap_or(0));
        }

        totals
    }

    /// 每筆異動後的結存（依異動時間、序號排序累計）
    ///
    /// 回傳 異動ID → 結存。補登的舊日期入庫會影響其後所有結存。
    pub fn running_balances(
        batches: &[InwardBatch],
        outwards: &[OutwardMovement],
    ) -> HashMap<Uuid, Decimal> {
        let mut events: Vec<(chrono::DateTime<chrono::Utc>, u64, Uuid, Decimal)> = batches
            .iter()
            .map(|b| (b.movement_time, b.sequence, b.id, b.received_quantity))
            .chain(
                outwards
                    .iter()
                    .map(|o| (o.movement_time, o.sequence, o.id, -o.quantity)),
            )
            .collect();
        events.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut balance = Decimal::ZERO;
        events
            .into_iter()
            .map(|(_, _, id, delta)| {
                balance += delta;
                (id, balance)
            })
            .collect()
    }
}
