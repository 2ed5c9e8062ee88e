//! ADCサンプリング方式の周期推定
//!
//! PWM周期ごとに浮き相電圧をサンプリングし、バッテリー電圧の半分を横切った時点を
//! ゼロクロスとする。直前サンプルとの線形補間でクロス時刻を求め、次の転流時刻を計算する。
//!
//! ADC割り込み側では `CommTim::capture_time()` でサンプル時刻を記録してから
//! [`PhaseVoltages::publish`] を呼ぶ。

use core::sync::atomic::{AtomicU16, Ordering};

use crate::comm_tim::{CommTim, CommTimerHw};
use crate::config::{EstimatorParams, ADC_MAX, ADC_NOISE_FLOOR, READY_VALID_COUNT};
use crate::estimator::{clamp_period, iir_blend, to_timer_period, CrossingState, PeriodEstimator};
use crate::trigger::TriggerFlag;

/// ADC割り込みから公開される電圧サンプル
pub struct PhaseVoltages {
    phase_voltage: AtomicU16,
    half_battery_voltage: AtomicU16,
    trigger: TriggerFlag,
}

impl PhaseVoltages {
    pub const fn new() -> Self {
        Self {
            phase_voltage: AtomicU16::new(0),
            half_battery_voltage: AtomicU16::new(0),
            trigger: TriggerFlag::new(),
        }
    }

    /// 新しいサンプルを公開してトリガーをセット
    #[inline(always)]
    pub fn publish(&self, phase_voltage: u16, half_battery_voltage: u16) {
        self.phase_voltage.store(phase_voltage, Ordering::Relaxed);
        self.half_battery_voltage
            .store(half_battery_voltage, Ordering::Relaxed);
        self.trigger.set();
    }

    pub fn phase_voltage(&self) -> u16 {
        self.phase_voltage.load(Ordering::Relaxed)
    }

    pub fn half_battery_voltage(&self) -> u16 {
        self.half_battery_voltage.load(Ordering::Relaxed)
    }

    pub fn trigger(&self) -> &TriggerFlag {
        &self.trigger
    }

    fn preset_phase_voltage(&self, value: u16) {
        self.phase_voltage.store(value, Ordering::Relaxed);
    }
}

impl Default for PhaseVoltages {
    fn default() -> Self {
        Self::new()
    }
}

/// ステップ内のサンプル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseSample {
    pub phase_voltage: u16,
    pub half_battery_voltage: u16,
    pub prev_phase_voltage: u16,
    /// 転流からのPWMサンプル数（ホールドオフ判定用）
    pub pwm_cycle_count: u32,
    pub rising_edge: bool,
}

/// ADCサンプリング方式
pub struct SampledEstimator<'a> {
    adc: &'a PhaseVoltages,
    params: EstimatorParams,
    crossing: CrossingState,
    sample: PhaseSample,
    closed_loop: bool,
    /// このステップで既にゼロクロスを検出済み
    latched: bool,
}

impl<'a> SampledEstimator<'a> {
    pub fn new(adc: &'a PhaseVoltages) -> Self {
        Self {
            adc,
            params: EstimatorParams::default(),
            crossing: CrossingState::default(),
            sample: PhaseSample {
                rising_edge: true,
                ..PhaseSample::default()
            },
            closed_loop: false,
            latched: false,
        }
    }

    pub fn with_params(mut self, params: EstimatorParams) -> Self {
        self.params = params;
        self
    }

    pub fn sample(&self) -> &PhaseSample {
        &self.sample
    }

    fn is_crossing(&self) -> bool {
        let s = &self.sample;
        if s.rising_edge {
            s.prev_phase_voltage < s.phase_voltage && s.phase_voltage >= s.half_battery_voltage
        } else {
            s.prev_phase_voltage > s.phase_voltage && s.phase_voltage <= s.half_battery_voltage
        }
    }

    /// 直前2サンプル間を線形補間してクロス時刻を求め、次の転流周期を計算する
    fn calc_next_commutation<H: CommTimerHw>(&mut self, timer: &CommTim<H>) {
        let timing = timer.timing();
        let s = &self.sample;

        let old_period = timing.period as i32;
        let pwm_interval = timing.elapsed() as i32;
        let bemf_rise = s.phase_voltage as i32 - s.prev_phase_voltage as i32;
        let zero_value = s.half_battery_voltage as i32 - s.prev_phase_voltage as i32;

        // is_crossing() が前後サンプルの大小を保証しているので bemf_rise != 0
        let adjust = zero_value * pwm_interval / bemf_rise;
        let half_cycle = timing.prev_time.wrapping_sub(timing.last_capture_time) as i32 + adjust;
        let new_period = half_cycle * 2;

        let (accepted, in_range) = clamp_period(
            old_period,
            new_period,
            self.params.direct_cutoff,
            self.params.direct_cutoff_slope,
        );

        if in_range {
            self.crossing.in_range_counter = self.crossing.in_range_counter.saturating_add(1);
        } else {
            trace!(
                "Period step clamped: old={} new={} -> {}",
                old_period,
                new_period,
                accepted
            );
            self.crossing.in_range_counter = 0;
        }
        self.crossing.estimated_period = accepted.max(0) as u32;

        if self.closed_loop {
            let blended = iir_blend(
                old_period,
                accepted + self.params.spark_advance as i32,
                self.params.iir_pole,
            );
            timer.update_period(to_timer_period(blended));
        }
    }
}

impl PeriodEstimator for SampledEstimator<'_> {
    fn trigger(&self) -> &TriggerFlag {
        self.adc.trigger()
    }

    fn compare_span(&self) -> u16 {
        1
    }

    fn run<H: CommTimerHw>(&mut self, timer: &CommTim<H>) {
        self.sample.phase_voltage = self.adc.phase_voltage();
        self.sample.half_battery_voltage = self.adc.half_battery_voltage();

        // 転流直後のスイッチングノイズ区間
        if self.sample.pwm_cycle_count < self.params.hold_off_samples as u32 {
            self.sample.pwm_cycle_count += 1;
            self.sample.prev_phase_voltage = self.sample.phase_voltage;
            return;
        }

        let phase = self.sample.phase_voltage;
        if phase > ADC_NOISE_FLOOR && phase < ADC_MAX - ADC_NOISE_FLOOR && !self.latched && self.is_crossing() {
            self.calc_next_commutation(timer);
            self.latched = true;
            self.crossing.crossing_detected = true;
        }

        self.sample.prev_phase_voltage = phase;
    }

    /// 連続してクランプ範囲内に収まったクロスが一定回数続いたら準備完了
    fn is_ready<H: CommTimerHw>(&mut self, _timer: &CommTim<H>) -> bool {
        self.crossing.in_range_counter >= READY_VALID_COUNT
    }

    fn reset(&mut self) {
        self.sample.pwm_cycle_count = 0;
        self.crossing = CrossingState::default();
        self.latched = false;
    }

    fn config(&mut self, rising: bool) {
        self.sample.rising_edge = rising;
    }

    fn config_and_reset(&mut self, rising: bool) {
        // 最初のサンプルで誤検出しないよう、前回値を検出方向の反対端に置く
        let preset = if rising { u16::MAX } else { 0 };
        self.sample.rising_edge = rising;
        self.sample.prev_phase_voltage = preset;
        self.sample.phase_voltage = preset;
        self.adc.preset_phase_voltage(preset);
        self.sample.pwm_cycle_count = 0;
        self.latched = false;
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTimer;

    /// 転流時刻0、サンプル時刻4000/5000で half=2000 を 1500 -> 2500 で横切る
    fn rising_crossing(tim: &CommTim<FakeTimer>, adc: &PhaseVoltages, est: &mut SampledEstimator) {
        tim.hw().counter.set(0);
        tim.update_capture_reference();
        tim.capture_time();
        est.config_and_reset(true);

        sample(tim, adc, est, 4000, 1500);
        sample(tim, adc, est, 5000, 2500);
    }

    fn sample(tim: &CommTim<FakeTimer>, adc: &PhaseVoltages, est: &mut SampledEstimator, at: u16, phase: u16) {
        tim.hw().counter.set(at);
        tim.capture_time();
        adc.publish(phase, 2000);
        est.run(tim);
    }

    #[test]
    fn test_interpolated_crossing() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut est = SampledEstimator::new(&adc);
        tim.set_period(10_000);

        rising_crossing(&tim, &adc, &mut est);

        // adjust = 500 * 1000 / 1000, half_cycle = 4000 + 500
        let crossing = est.crossing();
        assert!(crossing.crossing_detected);
        assert_eq!(crossing.estimated_period, 9000);
        assert_eq!(crossing.in_range_counter, 1);
        // 開ループではタイマーに反映しない
        assert_eq!(tim.period(), 10_000);
    }

    #[test]
    fn test_closed_loop_pushes_blended_period() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut est = SampledEstimator::new(&adc);
        est.set_closed_loop(true);
        tim.set_period(10_000);

        rising_crossing(&tim, &adc, &mut est);

        // (10000 * 6 + 9000) / 7
        assert_eq!(tim.period(), 9857);
        assert_eq!(tim.hw().compare.get(), 9857);
    }

    #[test]
    fn test_hold_off_suppresses_detection() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut est = SampledEstimator::new(&adc);
        est.params_mut().hold_off_samples = 3;
        est.config_and_reset(true);

        sample(&tim, &adc, &mut est, 100, 1500);
        sample(&tim, &adc, &mut est, 200, 2500);
        sample(&tim, &adc, &mut est, 300, 2600);
        assert!(!est.crossing().crossing_detected);
        assert_eq!(est.sample().pwm_cycle_count, 3);
        assert_eq!(est.sample().prev_phase_voltage, 2600);

        sample(&tim, &adc, &mut est, 400, 2700);
        assert!(est.crossing().crossing_detected);
    }

    #[test]
    fn test_noise_band_is_ignored() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut est = SampledEstimator::new(&adc);
        est.config_and_reset(true);

        sample(&tim, &adc, &mut est, 100, 100);
        // half を超えているが上側ノイズ帯
        sample(&tim, &adc, &mut est, 200, ADC_MAX - ADC_NOISE_FLOOR);
        assert!(!est.crossing().crossing_detected);

        // 下側ノイズ帯ちょうど
        est.config_and_reset(false);
        sample(&tim, &adc, &mut est, 300, 3000);
        sample(&tim, &adc, &mut est, 400, ADC_NOISE_FLOOR);
        assert!(!est.crossing().crossing_detected);
    }

    #[test]
    fn test_falling_crossing() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut est = SampledEstimator::new(&adc);
        tim.set_period(10_000);
        est.config_and_reset(false);

        sample(&tim, &adc, &mut est, 4000, 2500);
        // 立ち上がり方向には反応しない
        sample(&tim, &adc, &mut est, 4500, 2600);
        assert!(!est.crossing().crossing_detected);

        sample(&tim, &adc, &mut est, 5000, 1500);
        assert!(est.crossing().crossing_detected);
    }

    #[test]
    fn test_single_crossing_per_step() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut est = SampledEstimator::new(&adc);
        tim.set_period(10_000);

        rising_crossing(&tim, &adc, &mut est);
        assert!(est.take_crossing());

        sample(&tim, &adc, &mut est, 5500, 1800);
        sample(&tim, &adc, &mut est, 6000, 2200);
        assert!(!est.crossing().crossing_detected);
        assert_eq!(est.crossing().in_range_counter, 1);

        // 次のステップでは再び検出できる
        rising_crossing(&tim, &adc, &mut est);
        assert!(est.take_crossing());
        assert_eq!(est.crossing().in_range_counter, 2);
    }

    #[test]
    fn test_out_of_range_moves_by_slope() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut est = SampledEstimator::new(&adc);
        est.params_mut().direct_cutoff = 100;
        tim.set_period(20_000);

        rising_crossing(&tim, &adc, &mut est);
        assert_eq!(est.crossing().estimated_period, 19_980);
        assert_eq!(est.crossing().in_range_counter, 0);
    }

    #[test]
    fn test_ready_after_consecutive_in_range_crossings() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut est = SampledEstimator::new(&adc);
        tim.set_period(9000);

        for _ in 0..19 {
            rising_crossing(&tim, &adc, &mut est);
            assert!(!est.is_ready(&tim));
        }
        rising_crossing(&tim, &adc, &mut est);
        assert!(est.is_ready(&tim));

        est.reset();
        assert!(!est.is_ready(&tim));
    }
}
