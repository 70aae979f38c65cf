//! 批次儲存
//!
//! 單一庫存鍵的入庫批次佇列，依 FIFO 順序（異動時間、建立序號）排列。

use ledger_core::{InwardBatch, LedgerError, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

/// 單一庫存鍵的批次佇列
#[derive(Debug, Clone, Default)]
pub struct BatchStore {
    batches: Vec<InwardBatch>,
}

impl BatchStore {
    /// 創建空的批次佇列
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入批次，剩餘數量重設為實收數量
    ///
    /// 依 FIFO 鍵插入；補登的舊日期批次會排在較新批次之前。
    pub fn add_batch(&mut self, mut batch: InwardBatch) -> Result<&InwardBatch> {
        if batch.received_quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(batch.received_quantity));
        }
        batch.remaining_quantity = batch.received_quantity;

        let fifo_key = batch.fifo_key();
        let position = self
            .batches
            .partition_point(|existing| existing.fifo_key() <= fifo_key);
        self.batches.insert(position, batch);
        Ok(&self.batches[position])
    }

    /// 可消耗批次（剩餘 > 0），FIFO 順序
    ///
    /// 每次呼叫都從頭開始，可重複迭代。
    pub fn iter_consumable(&self) -> impl Iterator<Item = &InwardBatch> + '_ {
        self.batches.iter().filter(|batch| batch.is_open())
    }

    /// 扣減指定批次的剩餘數量
    pub fn decrement_remaining(
        &mut self,
        batch_id: Uuid,
        amount: Decimal,
        tolerance: Decimal,
    ) -> Result<Decimal> {
        let batch = self
            .batches
            .iter_mut()
            .find(|batch| batch.id == batch_id)
            .ok_or(LedgerError::UnknownBatch(batch_id))?;
        batch.decrement(amount, tolerance)
    }

    /// 可用數量（所有批次剩餘合計）
    pub fn available(&self) -> Decimal {
        self.iter_consumable()
            .map(|batch| batch.remaining_quantity)
            .sum()
    }

    /// 全部批次（含已耗盡），FIFO 順序
    pub fn batches(&self) -> &[InwardBatch] {
        &self.batches
    }

    pub fn get(&self, batch_id: Uuid) -> Option<&InwardBatch> {
        self.batches.iter().find(|batch| batch.id == batch_id)
    }

    pub fn open_count(&self) -> usize {
        self.iter_consumable().count()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use ledger_core::{BatchState, InwardMetadata, StockKey};
    use rstest::rstest;

    fn key() -> StockKey {
        StockKey::new(Uuid::from_u128(1), Uuid::from_u128(2))
    }

    fn batch(sequence: u64, quantity: i64, hours: i64) -> InwardBatch {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        InwardBatch::new(
            key(),
            sequence,
            Decimal::from(quantity),
            InwardMetadata::new().at(base + Duration::hours(hours)),
            Utc::now(),
        )
    }

    #[rstest]
    #[case(0)]
    #[case(-5)]
    fn test_add_batch_rejects_non_positive(#[case] quantity: i64) {
        let mut store = BatchStore::new();
        assert!(matches!(
            store.add_batch(batch(1, quantity, 0)),
            Err(LedgerError::InvalidQuantity(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_fifo_order_with_backdated_batch() {
        let mut store = BatchStore::new();
        store.add_batch(batch(1, 10, 5)).unwrap();
        store.add_batch(batch(2, 20, 10)).unwrap();
        // 補登較早的批次
        store.add_batch(batch(3, 30, 1)).unwrap();

        let order: Vec<u64> = store.iter_consumable().map(|b| b.sequence).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_same_time_tie_break_by_sequence() {
        let mut store = BatchStore::new();
        store.add_batch(batch(2, 10, 0)).unwrap();
        store.add_batch(batch(1, 10, 0)).unwrap();
        store.add_batch(batch(3, 10, 0)).unwrap();

        let order: Vec<u64> = store.iter_consumable().map(|b| b.sequence).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_decrement_and_consumable() {
        let tolerance = Decimal::new(1, 6);
        let mut store = BatchStore::new();
        let first = store.add_batch(batch(1, 10, 0)).unwrap().id;
        store.add_batch(batch(2, 5, 1)).unwrap();

        assert_eq!(store.available(), Decimal::from(15));

        store
            .decrement_remaining(first, Decimal::from(10), tolerance)
            .unwrap();
        assert_eq!(store.get(first).unwrap().state(), BatchState::Exhausted);
        assert_eq!(store.open_count(), 1);
        assert_eq!(store.len(), 2);

        // 可重複迭代
        assert_eq!(store.iter_consumable().count(), 1);
        assert_eq!(store.iter_consumable().count(), 1);
        assert_eq!(store.available(), Decimal::from(5));
    }

    #[test]
    fn test_decrement_errors() {
        let tolerance = Decimal::new(1, 6);
        let mut store = BatchStore::new();
        let id = store.add_batch(batch(1, 3, 0)).unwrap().id;

        assert!(matches!(
            store.decrement_remaining(id, Decimal::from(4), tolerance),
            Err(LedgerError::OverConsumption { .. })
        ));
        assert!(matches!(
            store.decrement_remaining(Uuid::new_v4(), Decimal::ONE, tolerance),
            Err(LedgerError::UnknownBatch(_))
        ));
        assert_eq!(store.available(), Decimal::from(3));
    }
}
