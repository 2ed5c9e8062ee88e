//! 周期推定器
//!
//! BEMFゼロクロスから転流周期を推定する。方式は2種類で、構成時にどちらか一方を選ぶ。
//! - [`HardwareEdgeEstimator`]: コンパレータのエッジ割り込みとタイマーキャプチャを使用
//! - [`SampledEstimator`]: PWM周期ごとのADCサンプルからソフトウェアでゼロクロスを検出

pub mod hardware;
pub mod sampled;

pub use hardware::HardwareEdgeEstimator;
pub use sampled::{PhaseVoltages, SampledEstimator};

use crate::comm_tim::{CommTim, CommTimerHw};
use crate::config::EstimatorParams;
use crate::trigger::TriggerFlag;

/// 推定器の出力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CrossingState {
    /// ゼロクロス検出（最初に処理した側がクリアするワンショット）
    pub crossing_detected: bool,
    /// 最新の推定周期 [tick]
    pub estimated_period: u32,
    /// クランプ範囲内に収まった連続回数
    pub in_range_counter: u32,
}

/// 周期推定器の共通インターフェース
pub trait PeriodEstimator {
    /// 新しい入力が届いたことを示すフラグ（割り込み側がセット）
    fn trigger(&self) -> &TriggerFlag;

    /// 転流タイマーのコンペア倍数
    fn compare_span(&self) -> u16;

    /// 1回分の推定処理
    fn run<H: CommTimerHw>(&mut self, timer: &CommTim<H>);

    /// 閉ループへ移行できるか
    fn is_ready<H: CommTimerHw>(&mut self, timer: &CommTim<H>) -> bool;

    /// 内部状態をリセット
    fn reset(&mut self);

    /// 観測するBEMFの向きを設定
    fn config(&mut self, rising: bool);

    /// 観測するBEMFの向きを設定し、ステップごとの状態をリセット
    fn config_and_reset(&mut self, rising: bool);

    fn set_closed_loop(&mut self, enable: bool);

    fn is_closed_loop(&self) -> bool;

    fn crossing(&self) -> &CrossingState;

    fn crossing_mut(&mut self) -> &mut CrossingState;

    fn params(&self) -> &EstimatorParams;

    fn params_mut(&mut self) -> &mut EstimatorParams;

    /// ゼロクロス検出フラグを取り出してクリア
    fn take_crossing(&mut self) -> bool {
        core::mem::take(&mut self.crossing_mut().crossing_detected)
    }
}

/// 構成時に選択する推定器
pub enum AnyEstimator<'a> {
    Hardware(HardwareEdgeEstimator<'a>),
    Sampled(SampledEstimator<'a>),
}

macro_rules! delegate {
    ($self:ident, $e:ident => $body:expr) => {
        match $self {
            AnyEstimator::Hardware($e) => $body,
            AnyEstimator::Sampled($e) => $body,
        }
    };
}

impl PeriodEstimator for AnyEstimator<'_> {
    fn trigger(&self) -> &TriggerFlag {
        delegate!(self, e => e.trigger())
    }

    fn compare_span(&self) -> u16 {
        delegate!(self, e => e.compare_span())
    }

    fn run<H: CommTimerHw>(&mut self, timer: &CommTim<H>) {
        delegate!(self, e => e.run(timer))
    }

    fn is_ready<H: CommTimerHw>(&mut self, timer: &CommTim<H>) -> bool {
        delegate!(self, e => e.is_ready(timer))
    }

    fn reset(&mut self) {
        delegate!(self, e => e.reset())
    }

    fn config(&mut self, rising: bool) {
        delegate!(self, e => e.config(rising))
    }

    fn config_and_reset(&mut self, rising: bool) {
        delegate!(self, e => e.config_and_reset(rising))
    }

    fn set_closed_loop(&mut self, enable: bool) {
        delegate!(self, e => e.set_closed_loop(enable))
    }

    fn is_closed_loop(&self) -> bool {
        delegate!(self, e => e.is_closed_loop())
    }

    fn crossing(&self) -> &CrossingState {
        delegate!(self, e => e.crossing())
    }

    fn crossing_mut(&mut self) -> &mut CrossingState {
        delegate!(self, e => e.crossing_mut())
    }

    fn params(&self) -> &EstimatorParams {
        delegate!(self, e => e.params())
    }

    fn params_mut(&mut self) -> &mut EstimatorParams {
        delegate!(self, e => e.params_mut())
    }
}

/// 1次IIRフィルタ: `(old * pole + inst) / (pole + 1)`
#[inline(always)]
pub fn iir_blend(old: i32, inst: i32, pole: u16) -> i32 {
    let pole = pole as i64;
    ((old as i64 * pole + inst as i64) / (pole + 1)) as i32
}

/// 周期の急変を抑える
///
/// `new` が `old ± cutoff` を外れた場合は `slope` だけ `new` 側へ動かす。
/// 戻り値の2番目は範囲内で採用できたかどうか。
#[inline(always)]
pub fn clamp_period(old: i32, new: i32, cutoff: u16, slope: u16) -> (i32, bool) {
    if new > old + cutoff as i32 {
        (old + slope as i32, false)
    } else if new < old - cutoff as i32 {
        (old - slope as i32, false)
    } else {
        (new, true)
    }
}

/// タイマーに設定できる周期へ丸める
#[inline(always)]
pub fn to_timer_period(value: i32) -> u16 {
    value.clamp(1, u16::MAX as i32) as u16
}
