//! 庫存摘要快取
//!
//! 每筆快取帶有計算當下的分區版本號。入庫/出庫提交時將鍵標記為髒並移除快取；
//! 查詢時只有在鍵不髒且版本相符時才命中。

use ledger_core::{StockKey, StockSummary};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dirty_tracking::DirtyTracker;

/// 快取項目
#[derive(Debug, Clone)]
struct CachedSummary {
    version: u64,
    summary: StockSummary,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<StockKey, CachedSummary>,
    dirty: DirtyTracker,
}

/// 快取統計
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub dirty: usize,
}

/// 庫存摘要快取
#[derive(Debug, Default)]
pub struct SummaryCache {
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SummaryCache {
    /// 創建空快取
    pub fn new() -> Self {
        Self::default()
    }

    /// 查詢快取；`version` 為呼叫端持有讀鎖時看到的分區版本
    pub fn get(&self, key: &StockKey, version: u64) -> Option<StockSummary> {
        let state = self.state.lock();
        let hit = if state.dirty.is_dirty(key) {
            None
        } else {
            state
                .entries
                .get(key)
                .filter(|cached| cached.version == version)
                .map(|cached| cached.summary.clone())
        };

        match hit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        hit
    }

    /// 寫入快取；較舊版本不會覆蓋較新版本
    pub fn put(&self, key: StockKey, version: u64, summary: StockSummary) {
        let mut state = self.state.lock();
        if let Some(existing) = state.entries.get(&key) {
            if existing.version > version {
                return;
            }
        }
        state
            .entries
            .insert(key, CachedSummary { version, summary });
        state.dirty.mark_clean(&key);
    }

    /// 使單一庫存鍵的快取失效
    pub fn invalidate(&self, key: StockKey) {
        let mut state = self.state.lock();
        state.entries.remove(&key);
        state.dirty.mark_dirty(key);
    }

    /// 清空快取
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.dirty.clear();
    }

    /// 獲取目前被標記為髒的庫存鍵
    pub fn dirty_keys(&self) -> Vec<StockKey> {
        self.state.lock().dirty.dirty_keys()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: state.entries.len(),
            dirty: state.dirty.dirty_keys().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledger_core::{Material, MaterialDraft};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn summary(key: StockKey, stock: i64) -> StockSummary {
        let material = Material::from_draft(MaterialDraft::new("Rebar", "RB-01"), Utc::now()).unwrap();
        let mut summary = StockSummary::empty(key, &material);
        summary.current_stock = Decimal::from(stock);
        summary
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = SummaryCache::new();
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4());

        assert!(cache.get(&key, 1).is_none());

        cache.put(key, 1, summary(key, 30));
        assert_eq!(cache.get(&key, 1).unwrap().current_stock, Decimal::from(30));

        // 版本不符視為未命中
        assert!(cache.get(&key, 2).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_invalidate_marks_dirty() {
        let cache = SummaryCache::new();
        let key = StockKey::general(Uuid::new_v4());

        cache.put(key, 1, summary(key, 10));
        cache.invalidate(key);

        assert!(cache.get(&key, 1).is_none());
        assert_eq!(cache.dirty_keys(), vec![key]);

        cache.put(key, 2, summary(key, 5));
        assert!(cache.dirty_keys().is_empty());
        assert_eq!(cache.get(&key, 2).unwrap().current_stock, Decimal::from(5));
    }

    #[test]
    fn test_stale_put_is_ignored() {
        let cache = SummaryCache::new();
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4());

        cache.put(key, 3, summary(key, 7));
        cache.put(key, 2, summary(key, 99));

        assert_eq!(cache.get(&key, 3).unwrap().current_stock, Decimal::from(7));

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
