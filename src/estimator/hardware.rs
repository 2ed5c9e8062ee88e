//! ハードウェアエッジ方式の周期推定
//!
//! コンパレータがBEMFゼロクロスでエッジ割り込みを発生させ、割り込み側で
//! `CommTim::capture_time()` を呼んでからトリガーフラグをセットする。
//! ポーリングループではエッジ間隔から周期を求め、IIRで平滑化する。

use crate::comm_tim::{CommTim, CommTimTiming, CommTimerHw};
use crate::config::{EstimatorParams, COMM_TIM_MAX_VALID_DELTA, READY_VALID_COUNT};
use crate::estimator::{iir_blend, to_timer_period, CrossingState, PeriodEstimator};
use crate::pwm::PwmScheme;
use crate::trigger::TriggerFlag;

/// キャプチャされたエッジ間隔が信頼できるか
///
/// - 更新割り込みを2回以上取りこぼした: 無効
/// - 1回取りこぼし、かつ `curr_time >= prev_time`（1周以上経過）: 無効
/// - 間隔がラップアラウンド手前のマージンに入っている: 無効
pub fn is_timing_valid(timing: &CommTimTiming) -> bool {
    if timing.missed_update_count > 1 {
        return false;
    }
    if timing.missed_update_count == 1 && timing.curr_time >= timing.prev_time {
        return false;
    }
    timing.elapsed() <= COMM_TIM_MAX_VALID_DELTA
}

/// ハードウェアエッジ方式
pub struct HardwareEdgeEstimator<'a> {
    edge: &'a TriggerFlag,
    scheme: PwmScheme,
    params: EstimatorParams,
    crossing: CrossingState,
    closed_loop: bool,
    /// 連続して有効だった回数
    detect_count: u32,
    /// 前回の is_ready() 以降に新しいエッジを処理した
    fresh: bool,
}

impl<'a> HardwareEdgeEstimator<'a> {
    pub fn new(edge: &'a TriggerFlag, scheme: PwmScheme) -> Self {
        Self {
            edge,
            scheme,
            params: EstimatorParams::default(),
            crossing: CrossingState::default(),
            closed_loop: false,
            detect_count: 0,
            fresh: false,
        }
    }

    pub fn with_params(mut self, params: EstimatorParams) -> Self {
        self.params = params;
        self
    }
}

impl PeriodEstimator for HardwareEdgeEstimator<'_> {
    fn trigger(&self) -> &TriggerFlag {
        self.edge
    }

    fn compare_span(&self) -> u16 {
        2
    }

    fn run<H: CommTimerHw>(&mut self, timer: &CommTim<H>) {
        let timing = timer.timing();
        self.fresh = true;

        let raw = timing.elapsed() as i32 + self.params.spark_advance as i32;
        let inst = raw.max(0) / self.scheme.ticks_divisor() as i32;
        let blended = iir_blend(timing.period as i32, inst, self.params.iir_pole);

        if is_timing_valid(&timing) {
            let period = to_timer_period(blended);
            self.crossing.estimated_period = period as u32;
            timer.update_period(period);
        } else {
            trace!("Edge timing invalid: {}", timing);
            // 周期は据え置き、再アームのみ
            timer.update_period(timing.period);
        }

        if self.closed_loop {
            self.crossing.crossing_detected = true;
            timer.enable_commutation(true);
        }
    }

    /// 新しいエッジを伴う有効な呼び出しが連続して規定回数に達したら準備完了
    ///
    /// 前回呼び出し以降にエッジが無い場合も連続が途切れたものとみなす。
    fn is_ready<H: CommTimerHw>(&mut self, timer: &CommTim<H>) -> bool {
        let fresh = core::mem::take(&mut self.fresh);
        if !fresh || !is_timing_valid(&timer.timing()) {
            self.detect_count = 0;
            return false;
        }

        self.detect_count = self.detect_count.saturating_add(1);
        self.detect_count >= READY_VALID_COUNT
    }

    fn reset(&mut self) {
        self.detect_count = 0;
        self.fresh = false;
        self.crossing = CrossingState::default();
    }

    // コンパレータは両エッジで割り込むため向きの設定は不要
    fn config(&mut self, _rising: bool) {}

    fn config_and_reset(&mut self, _rising: bool) {}

    fn set_closed_loop(&mut self, enable: bool) {
        self.closed_loop = enable;
    }

    fn is_closed_loop(&self) -> bool {
        self.closed_loop
    }

    fn crossing(&self) -> &CrossingState {
        &self.crossing
    }

    fn crossing_mut(&mut self) -> &mut CrossingState {
        &mut self.crossing
    }

    fn params(&self) -> &EstimatorParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EstimatorParams {
        &mut self.params
    }
}
