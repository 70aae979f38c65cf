//! 髒標記追蹤

use ledger_core::StockKey;
use std::collections::HashSet;

/// 髒標記追蹤器：記錄自上次計算後發生異動的庫存鍵
#[derive(Debug)]
pub struct DirtyTracker {
    dirty_keys: HashSet<StockKey>,
}

impl DirtyTracker {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self {
            dirty_keys: HashSet::new(),
        }
    }

    /// 標記庫存鍵為髒
    pub fn mark_dirty(&mut self, key: StockKey) {
        self.dirty_keys.insert(key);
    }

    /// 清除單一庫存鍵的髒標記
    pub fn mark_clean(&mut self, key: &StockKey) {
        self.dirty_keys.remove(key);
    }

    /// 檢查庫存鍵是否為髒
    pub fn is_dirty(&self, key: &StockKey) -> bool {
        self.dirty_keys.contains(key)
    }

    /// 清除所有髒標記
    pub fn clear(&mut self) {
        self.dirty_keys.clear();
    }

    /// 獲取所有髒庫存鍵
    pub fn dirty_keys(&self) -> Vec<StockKey> {
        self.dirty_keys.iter().copied().collect()
    }
}

impl Default for DirtyTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_mark_and_clean() {
        let mut tracker = DirtyTracker::new();
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4());
        let other = StockKey::general(Uuid::new_v4());

        tracker.mark_dirty(key);
        tracker.mark_dirty(other);
        assert!(tracker.is_dirty(&key));
        assert_eq!(tracker.dirty_keys().len(), 2);

        tracker.mark_clean(&key);
        assert!(!tracker.is_dirty(&key));
        assert!(tracker.is_dirty(&other));

        tracker.clear();
        assert!(tracker.dirty_keys().is_empty());
    }
}
