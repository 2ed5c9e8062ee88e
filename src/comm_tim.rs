//! 転流タイマー
//!
//! フリーランの16bitカウンターとコンペアチャネル1本で転流タイミングを管理します。
//!
//! ## 動作原理
//! 1. BEMFエッジ（またはADCサンプル）ごとに `capture_time()` でカウンター値を記録
//! 2. 推定器が周期を計算し、`update_period()` でコンペア値を再設定
//! 3. コンペア一致割り込みで転流イベントを発行し、次のコンペアを現在周期で再設定
//! 4. 更新（オーバーフロー）割り込みで取りこぼし回数をカウント
//!
//! 割り込みとポーリングループの両方から `&self` で操作できるよう、
//! 状態はすべてアトミック変数で保持します。

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::config::COMM_TIM_PERIOD_MAX;
use crate::trigger::TriggerFlag;

/// 転流タイマーのハードウェア抽象
///
/// カウンターは0xFFFFで折り返すフリーラン、コンペアはチャネル1を想定。
pub trait CommTimerHw {
    /// ペリフェラル初期化（不要なら何もしない）
    fn init(&self) {}

    /// 現在のカウンター値
    fn counter(&self) -> u16;

    /// コンペア一致時にラッチされたキャプチャ値
    fn capture(&self) -> u16;

    /// コンペア値を設定
    fn set_compare(&self, value: u16);
}

/// タイミング情報のスナップショット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommTimTiming {
    pub period: u16,
    pub curr_time: u16,
    pub prev_time: u16,
    pub last_capture_time: u16,
    pub missed_update_count: u32,
}

impl CommTimTiming {
    /// `prev_time` から `curr_time` までの経過tick（ラップアラウンド考慮）
    #[inline(always)]
    pub fn elapsed(&self) -> u16 {
        self.curr_time.wrapping_sub(self.prev_time)
    }
}

/// (prev_time, curr_time, missed_update_count) をまとめて公開するシーケンスロック
///
/// 書き込みは割り込み側の1箇所のみ。読み出し側は書き込み中・書き込み跨ぎを検出して再試行する。
struct TimingCell {
    seq: AtomicU32,
    prev_time: AtomicU16,
    curr_time: AtomicU16,
    missed_update_count: AtomicU32,
}

impl TimingCell {
    const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            prev_time: AtomicU16::new(0),
            curr_time: AtomicU16::new(0),
            missed_update_count: AtomicU32::new(0),
        }
    }

    fn publish(&self, prev_time: u16, curr_time: u16, missed_update_count: u32) {
        let seq = self.seq.load(Ordering::Relaxed);
        // 奇数 = 書き込み中
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        core::sync::atomic::fence(Ordering::Release);

        self.prev_time.store(prev_time, Ordering::Relaxed);
        self.curr_time.store(curr_time, Ordering::Relaxed);
        self.missed_update_count
            .store(missed_update_count, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    fn read(&self) -> (u16, u16, u32) {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 != 0 {
                core::hint::spin_loop();
                continue;
            }

            let prev_time = self.prev_time.load(Ordering::Relaxed);
            let curr_time = self.curr_time.load(Ordering::Relaxed);
            let missed = self.missed_update_count.load(Ordering::Relaxed);

            core::sync::atomic::fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return (prev_time, curr_time, missed);
            }
        }
    }
}

/// 転流タイマー
pub struct CommTim<H> {
    hw: H,
    /// 現在の転流周期 [tick]
    period: AtomicU16,
    /// コンペア再設定時に周期へ掛ける倍数（ハードウェアエッジ方式は2）
    compare_span: AtomicU16,
    last_capture_time: AtomicU16,
    next_prev_time: AtomicU16,
    /// 前回キャプチャ以降の更新割り込み回数
    update_count: AtomicU32,
    /// 連続転流を有効化
    trigger_comm: AtomicBool,
    /// 次のコンペア一致で1回だけ転流
    trigger_comm_once: AtomicBool,
    /// コンペア一致ごとにセットされる出力フラグ
    trigger: TriggerFlag,
    timing: TimingCell,
    /// シーケンサーへの転流要求（1スロット）
    commutation: Signal<CriticalSectionRawMutex, ()>,
}

impl<H: CommTimerHw> CommTim<H> {
    pub const fn new(hw: H) -> Self {
        Self {
            hw,
            period: AtomicU16::new(COMM_TIM_PERIOD_MAX),
            compare_span: AtomicU16::new(1),
            last_capture_time: AtomicU16::new(0),
            next_prev_time: AtomicU16::new(0),
            update_count: AtomicU32::new(0),
            trigger_comm: AtomicBool::new(false),
            trigger_comm_once: AtomicBool::new(false),
            trigger: TriggerFlag::new(),
            timing: TimingCell::new(),
            commutation: Signal::new(),
        }
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// ハードウェアを初期化して状態をリセット
    pub fn init(&self) {
        self.hw.init();
        self.reset();
        info!(
            "Commutation timer initialized (compare span x{})",
            self.compare_span()
        );
    }

    /// 転流を停止し、周期を最遅に戻す
    pub fn reset(&self) {
        self.trigger_comm.store(false, Ordering::Release);
        self.trigger_comm_once.store(false, Ordering::Release);
        self.period.store(COMM_TIM_PERIOD_MAX, Ordering::Relaxed);
        self.commutation.reset();
    }

    /// 現在のカウンター値を `curr_time` として記録する
    ///
    /// 前回の記録値が `prev_time` に移り、取りこぼし回数はスナップショット後にクリアされる。
    pub fn capture_time(&self) {
        let now = self.hw.counter();
        self.publish_capture(now);
    }

    /// 周期を更新し、最後のキャプチャ時刻を基準にコンペアを再設定する
    ///
    /// 呼び出し側で範囲内にクランプ済みの周期を渡すこと。
    pub fn update_period(&self, period: u16) {
        self.set_period(period);
        self.arm(self.last_capture_time.load(Ordering::Relaxed));
    }

    /// 現在のカウンター値をキャプチャ基準にしてコンペアを再設定する
    pub fn update_capture_reference(&self) {
        let now = self.hw.counter();
        self.last_capture_time.store(now, Ordering::Relaxed);
        self.arm(now);
    }

    /// コンペア一致割り込み
    #[inline(always)]
    pub fn on_compare_match(&self) {
        let capture = self.hw.capture();
        self.last_capture_time.store(capture, Ordering::Relaxed);

        let once = self.trigger_comm_once.swap(false, Ordering::AcqRel);
        if self.trigger_comm.load(Ordering::Acquire) || once {
            self.commutation.signal(());
        }

        self.trigger.set();
        self.arm(capture);
    }

    /// 更新（オーバーフロー）割り込み
    #[inline(always)]
    pub fn on_counter_update(&self) {
        self.update_count.fetch_add(1, Ordering::Relaxed);
    }

    /// タイミング情報を一貫したスナップショットとして取得
    pub fn timing(&self) -> CommTimTiming {
        let (prev_time, curr_time, missed_update_count) = self.timing.read();
        CommTimTiming {
            period: self.period(),
            curr_time,
            prev_time,
            last_capture_time: self.last_capture_time.load(Ordering::Relaxed),
            missed_update_count,
        }
    }

    /// 保留中の転流イベントを取り出す
    pub fn take_commutation(&self) -> bool {
        self.commutation.try_take().is_some()
    }

    /// コンペア一致でセットされるフラグ
    pub fn trigger(&self) -> &TriggerFlag {
        &self.trigger
    }

    pub fn period(&self) -> u16 {
        self.period.load(Ordering::Relaxed)
    }

    /// 周期のみ更新（コンペアは次の一致で反映）
    pub fn set_period(&self, period: u16) {
        self.period.store(period.max(1), Ordering::Relaxed);
    }

    pub fn compare_span(&self) -> u16 {
        self.compare_span.load(Ordering::Relaxed)
    }

    pub fn set_compare_span(&self, span: u16) {
        self.compare_span.store(span.max(1), Ordering::Relaxed);
    }

    pub fn last_capture_time(&self) -> u16 {
        self.last_capture_time.load(Ordering::Relaxed)
    }

    /// コンペア一致ごとの連続転流を有効/無効化
    pub fn enable_commutation(&self, enable: bool) {
        self.trigger_comm.store(enable, Ordering::Release);
    }

    pub fn is_commutation_enabled(&self) -> bool {
        self.trigger_comm.load(Ordering::Acquire)
    }

    /// 次のコンペア一致で1回だけ転流
    pub fn commutate_once(&self) {
        self.trigger_comm_once.store(true, Ordering::Release);
    }

    fn publish_capture(&self, now: u16) {
        let prev = self.next_prev_time.swap(now, Ordering::Relaxed);
        let missed = self.update_count.swap(0, Ordering::Relaxed);
        self.timing.publish(prev, now, missed);
    }

    fn arm(&self, from: u16) {
        let offset = (self.period() as u32 * self.compare_span() as u32).min(u16::MAX as u32);
        self.hw.set_compare(from.wrapping_add(offset as u16));
    }
}
