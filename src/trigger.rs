//! 割り込みとポーリングループ間のワンショットフラグ

use core::sync::atomic::{AtomicBool, Ordering};

/// 割り込み側でセットし、ポーリングループ側で取り出すフラグ
#[derive(Debug)]
pub struct TriggerFlag(AtomicBool);

impl TriggerFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline(always)]
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// フラグを読み出してクリアする
    #[inline(always)]
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    #[inline(always)]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for TriggerFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_one_shot() {
        let flag = TriggerFlag::new();
        assert!(!flag.take());

        flag.set();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.take());
    }
}
