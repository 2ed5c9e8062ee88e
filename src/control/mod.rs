//! 制御プロセス（状態機械）
//!
//! モーターのライフサイクル（停止 → 位置合わせ → 強制転流 → 閉ループ → エラー）を管理し、
//! 状態ごとのストラテジーを呼び出す。閉ループの有効/無効を切り替えるのはこのモジュールのみ。
//!
//! ## 1ティックの処理順
//! 1. 保留中の転流イベントがあればシーケンサーを1ステップ進め、推定器のBEMF向きを再設定
//! 2. 推定器のトリガーがあれば推定を実行
//! 3. 現在状態のトリガーがあれば定常コールバックを実行し、結果に応じて遷移

pub mod strategy;

pub use strategy::{StateContext, StateStrategy, Strategies, TriggerSource};

use crate::comm_tim::{CommTim, CommTimerHw};
use crate::config::{ControlConfig, IIR_POLE_MAX};
use crate::estimator::PeriodEstimator;
use crate::pwm::{PowerStage, PwmMode, PwmScheme, PwmSequencer};
use crate::registers::{RegisterAddr, RegisterError};
use strategy::Hook;

/// 制御プロセスの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlProcessState {
    Error = 0,
    Idle = 1,
    Aligning = 2,
    SpinUp = 3,
    Spinning = 4,
}

impl TryFrom<u8> for ControlProcessState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(ControlProcessState::Error),
            1 => Ok(ControlProcessState::Idle),
            2 => Ok(ControlProcessState::Aligning),
            3 => Ok(ControlProcessState::SpinUp),
            4 => Ok(ControlProcessState::Spinning),
            other => Err(other),
        }
    }
}

/// ストラテジーのコールバック結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallbackResult {
    /// 回復不能
    Error,
    Continue,
    /// 閉ループを抜ける
    ExitControl,
    /// 閉ループに入る
    ResumeControl,
}

/// エラー状態に入った理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Fault {
    /// 閉ループ中にゼロクロスを連続で見失った
    CrossingLost = 1,
    /// コールバックがエラーを返した
    Fatal = 2,
}

/// 制御プロセスの状態レコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlProcess {
    pub state: ControlProcessState,
    pub ignite: bool,
    pub kill: bool,
    pub bemf_crossing_counter: u32,
    pub bemf_lost_crossing_counter: u32,
    /// 位置合わせ経過ティック
    pub align_counter: u32,
    pub fault: Option<Fault>,
}

impl ControlProcess {
    pub const fn new() -> Self {
        Self {
            state: ControlProcessState::Idle,
            ignite: false,
            kill: false,
            bemf_crossing_counter: 0,
            bemf_lost_crossing_counter: 0,
            align_counter: 0,
            fault: None,
        }
    }
}

impl Default for ControlProcess {
    fn default() -> Self {
        Self::new()
    }
}

/// テレメトリ用ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlStatus {
    pub state: ControlProcessState,
    pub fault: Option<Fault>,
    pub bemf_crossing_counter: u32,
    pub bemf_lost_crossing_counter: u32,
    pub period: u16,
}

impl ControlStatus {
    pub const fn new() -> Self {
        Self {
            state: ControlProcessState::Idle,
            fault: None,
            bemf_crossing_counter: 0,
            bemf_lost_crossing_counter: 0,
            period: 0,
        }
    }
}

impl Default for ControlStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// 定常コールバックの結果から次の状態を決める
///
/// `aligned` は位置合わせ時間が経過したかどうか。
pub fn next_state(
    state: ControlProcessState,
    result: CallbackResult,
    aligned: bool,
) -> Option<(ControlProcessState, Option<Fault>)> {
    use ControlProcessState::*;

    match (state, result) {
        (Error, _) => None,
        (_, CallbackResult::Error) => Some((Error, Some(Fault::Fatal))),
        (Spinning, CallbackResult::ExitControl) => Some((Error, Some(Fault::CrossingLost))),
        (SpinUp, CallbackResult::ResumeControl) => Some((Spinning, None)),
        (Aligning, CallbackResult::Continue) if aligned => Some((SpinUp, None)),
        _ => None,
    }
}

/// 転流制御コア
///
/// 転流タイマーは割り込みと共有するため参照で受け取り、推定器とシーケンサーは所有する。
pub struct MotorControl<'a, H, E, P> {
    process: ControlProcess,
    timer: &'a CommTim<H>,
    estimator: E,
    sequencer: PwmSequencer<P>,
    config: ControlConfig,
    strategies: Strategies,
}

impl<'a, H: CommTimerHw, E: PeriodEstimator, P: PowerStage> MotorControl<'a, H, E, P> {
    pub fn new(timer: &'a CommTim<H>, estimator: E, stage: P, config: ControlConfig) -> Self {
        Self {
            process: ControlProcess::new(),
            timer,
            estimator,
            sequencer: PwmSequencer::new(stage, config.scheme),
            config,
            strategies: Strategies::default(),
        }
    }

    /// タイマーを初期化して停止状態に入る
    pub fn init(&mut self) {
        self.timer.set_compare_span(self.estimator.compare_span());
        self.timer.init();
        self.process = ControlProcess::new();
        self.dispatch(ControlProcessState::Idle, Hook::Enter);
        info!(
            "Control process initialized: scheme={}, align={} ticks",
            self.config.scheme,
            self.config.align_ticks
        );
    }

    /// 始動要求（停止中のみ有効）
    pub fn ignite(&mut self) {
        self.process.ignite = true;
    }

    /// 停止要求（全状態に優先）
    pub fn kill(&mut self) {
        self.process.kill = true;
    }

    /// 1ティック進める
    pub fn run_once(&mut self) {
        if self.timer.take_commutation() {
            let step = self.sequencer.commutate();
            self.estimator.config_and_reset(step.bemf.rising);
        }

        if self.estimator.trigger().take() {
            self.estimator.run(self.timer);
        }

        self.run_control_process();
    }

    pub fn status(&self) -> ControlStatus {
        ControlStatus {
            state: self.process.state,
            fault: self.process.fault,
            bemf_crossing_counter: self.process.bemf_crossing_counter,
            bemf_lost_crossing_counter: self.process.bemf_lost_crossing_counter,
            period: self.timer.period(),
        }
    }

    pub fn process(&self) -> &ControlProcess {
        &self.process
    }

    pub fn state(&self) -> ControlProcessState {
        self.process.state
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut E {
        &mut self.estimator
    }

    pub fn sequencer(&self) -> &PwmSequencer<P> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut PwmSequencer<P> {
        &mut self.sequencer
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// レジスタ読み出し
    pub fn read_register(&self, addr: u8) -> Result<u16, RegisterError> {
        let params = self.estimator.params();
        let value = match RegisterAddr::try_from(addr)? {
            RegisterAddr::CommTimPeriod => self.timer.period(),
            RegisterAddr::SparkAdvance => params.spark_advance as u16,
            RegisterAddr::DirectCutoff => params.direct_cutoff,
            RegisterAddr::DirectCutoffSlope => params.direct_cutoff_slope,
            RegisterAddr::IirPole => params.iir_pole,
            RegisterAddr::HoldOffSamples => params.hold_off_samples,
            RegisterAddr::PwmMode => match self.sequencer.mode() {
                PwmMode::Drive => 0,
                PwmMode::Brake => 1,
            },
            RegisterAddr::State => self.process.state as u16,
            RegisterAddr::CrossingCounter => saturate(self.process.bemf_crossing_counter),
            RegisterAddr::LostCrossingCounter => saturate(self.process.bemf_lost_crossing_counter),
        };
        Ok(value)
    }

    /// レジスタ書き込み（次のティックから反映）
    pub fn write_register(&mut self, addr: u8, value: u16) -> Result<(), RegisterError> {
        let addr = RegisterAddr::try_from(addr)?;
        let params = self.estimator.params_mut();
        match addr {
            RegisterAddr::CommTimPeriod => {
                if value == 0 {
                    return Err(RegisterError::OutOfRange);
                }
                self.timer.set_period(value);
            }
            RegisterAddr::SparkAdvance => params.spark_advance = value as i16,
            RegisterAddr::DirectCutoff => params.direct_cutoff = value,
            RegisterAddr::DirectCutoffSlope => params.direct_cutoff_slope = value,
            RegisterAddr::IirPole => {
                if value > IIR_POLE_MAX {
                    return Err(RegisterError::OutOfRange);
                }
                params.iir_pole = value;
            }
            RegisterAddr::HoldOffSamples => params.hold_off_samples = value,
            RegisterAddr::PwmMode => {
                let mode = match value {
                    0 => PwmMode::Drive,
                    1 if self.sequencer.scheme() == PwmScheme::SixStep => PwmMode::Brake,
                    _ => return Err(RegisterError::OutOfRange),
                };
                self.sequencer.set_mode(mode);
            }
            RegisterAddr::State
            | RegisterAddr::CrossingCounter
            | RegisterAddr::LostCrossingCounter => return Err(RegisterError::ReadOnly),
        }
        debug!("Register {} <- {}", addr, value);
        Ok(())
    }

    fn run_control_process(&mut self) {
        if self.process.kill {
            self.process.kill = false;
            self.process.ignite = false;
            info!("Kill requested in {}", self.process.state);
            self.transition(ControlProcessState::Idle, None);
            return;
        }

        if self.process.ignite {
            self.process.ignite = false;
            match self.process.state {
                ControlProcessState::Idle => {
                    info!("Ignite");
                    self.transition(ControlProcessState::Aligning, None);
                }
                ControlProcessState::Error => {
                    warn!("Ignite ignored in Error state, kill first");
                }
                state => {
                    debug!("Ignite ignored in {}", state);
                }
            }
        }

        let state = self.process.state;
        let triggered = match self.strategies.trigger(state) {
            TriggerSource::CommTimer => self.timer.trigger().take(),
            TriggerSource::EveryTick => true,
        };
        if !triggered {
            return;
        }

        let result = self.dispatch(state, Hook::Steady);
        let aligned = self.process.align_counter >= self.config.align_ticks;
        if let Some((next, fault)) = next_state(state, result, aligned) {
            self.transition(next, fault);
        }
    }

    fn transition(&mut self, next: ControlProcessState, fault: Option<Fault>) {
        let prev = self.process.state;
        self.dispatch(prev, Hook::Exit);

        // 閉ループの切り替えは遷移時のみ
        if next == ControlProcessState::Spinning {
            self.estimator.set_closed_loop(true);
        } else if prev == ControlProcessState::Spinning {
            self.estimator.set_closed_loop(false);
        }

        if fault.is_some() {
            self.process.fault = fault;
        }
        self.process.state = next;
        match fault {
            Some(fault) => error!("Control state {} -> {} ({})", prev, next, fault),
            None => info!("Control state {} -> {}", prev, next),
        }

        if self.dispatch(next, Hook::Enter) == CallbackResult::Error
            && next != ControlProcessState::Error
        {
            self.transition(ControlProcessState::Error, Some(Fault::Fatal));
        }
    }

    fn dispatch(&mut self, state: ControlProcessState, hook: Hook) -> CallbackResult {
        let mut ctx = StateContext {
            process: &mut self.process,
            timer: self.timer,
            estimator: &mut self.estimator,
            sequencer: &mut self.sequencer,
            config: &self.config,
        };
        self.strategies.dispatch(state, hook, &mut ctx)
    }
}

fn saturate(value: u32) -> u16 {
    value.min(u16::MAX as u32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ALIGN_TICKS, LOST_CROSSING_LIMIT as LOST_LIMIT, READY_VALID_COUNT};
    use crate::estimator::{AnyEstimator, HardwareEdgeEstimator, PhaseVoltages, SampledEstimator};
    use crate::pwm::six_step;
    use crate::testing::{advance, FakeTimer, RecordingStage};
    use crate::trigger::TriggerFlag;

    type TestControl<'a> = MotorControl<'a, FakeTimer, HardwareEdgeEstimator<'a>, RecordingStage>;

    fn new_control<'a>(tim: &'a CommTim<FakeTimer>, edge: &'a TriggerFlag) -> TestControl<'a> {
        let estimator = HardwareEdgeEstimator::new(edge, PwmScheme::SixStep);
        let mut mc = MotorControl::new(tim, estimator, RecordingStage::default(), ControlConfig::default());
        mc.init();
        mc
    }

    /// BEMFエッジとコンペア一致が揃った1ティック
    fn edge_tick(mc: &mut TestControl, tim: &CommTim<FakeTimer>, edge: &TriggerFlag) {
        advance(tim, 2000);
        tim.capture_time();
        edge.set();
        tim.on_compare_match();
        mc.run_once();
    }

    /// コンペア一致のみ（ゼロクロス無し）の1ティック
    fn silent_tick(mc: &mut TestControl, tim: &CommTim<FakeTimer>) {
        advance(tim, 2000);
        tim.on_compare_match();
        mc.run_once();
    }

    fn align(mc: &mut TestControl) {
        mc.ignite();
        for _ in 0..ALIGN_TICKS {
            mc.run_once();
        }
    }

    fn spin(mc: &mut TestControl, tim: &CommTim<FakeTimer>, edge: &TriggerFlag) {
        align(mc);
        for _ in 0..READY_VALID_COUNT {
            edge_tick(mc, tim, edge);
        }
    }

    #[test]
    fn test_ignite_to_spinning_to_error() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut mc = new_control(&tim, &edge);
        assert_eq!(mc.state(), ControlProcessState::Idle);
        assert_eq!(tim.compare_span(), 2);

        mc.ignite();
        for _ in 0..ALIGN_TICKS - 1 {
            mc.run_once();
        }
        assert_eq!(mc.state(), ControlProcessState::Aligning);
        mc.run_once();
        assert_eq!(mc.state(), ControlProcessState::SpinUp);
        assert!(tim.is_commutation_enabled());

        for _ in 0..READY_VALID_COUNT - 1 {
            edge_tick(&mut mc, &tim, &edge);
        }
        assert_eq!(mc.state(), ControlProcessState::SpinUp);
        edge_tick(&mut mc, &tim, &edge);
        assert_eq!(mc.state(), ControlProcessState::Spinning);
        assert!(mc.estimator().is_closed_loop());

        for _ in 0..LOST_LIMIT {
            silent_tick(&mut mc, &tim);
        }
        assert_eq!(mc.state(), ControlProcessState::Spinning);
        assert_eq!(mc.status().bemf_lost_crossing_counter, LOST_LIMIT);

        silent_tick(&mut mc, &tim);
        assert_eq!(mc.state(), ControlProcessState::Error);
        assert_eq!(mc.status().fault, Some(Fault::CrossingLost));
        assert!(!mc.estimator().is_closed_loop());
        assert!(!tim.is_commutation_enabled());
    }

    #[test]
    fn test_crossings_keep_spinning() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut mc = new_control(&tim, &edge);
        spin(&mut mc, &tim, &edge);
        assert_eq!(mc.state(), ControlProcessState::Spinning);

        for _ in 0..50 {
            edge_tick(&mut mc, &tim, &edge);
        }
        assert_eq!(mc.state(), ControlProcessState::Spinning);
        assert_eq!(mc.status().bemf_crossing_counter, 50);
        assert_eq!(mc.status().bemf_lost_crossing_counter, 0);

        // 見失っても途中で復帰すればカウンタはリセット
        for _ in 0..LOST_LIMIT {
            silent_tick(&mut mc, &tim);
        }
        edge_tick(&mut mc, &tim, &edge);
        for _ in 0..LOST_LIMIT {
            silent_tick(&mut mc, &tim);
        }
        assert_eq!(mc.state(), ControlProcessState::Spinning);
    }

    #[test]
    fn test_commutation_advances_sequencer() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut mc = new_control(&tim, &edge);
        align(&mut mc);
        // 位置合わせで1パターン出力済み
        assert_eq!(mc.sequencer().stage().applied.len(), 1);

        for _ in 0..3 {
            edge_tick(&mut mc, &tim, &edge);
        }
        assert_eq!(mc.sequencer().index(), 3);
        assert_eq!(mc.sequencer().stage().applied.len(), 4);
    }

    #[test]
    fn test_kill_from_every_state() {
        use ControlProcessState::*;

        for target in [Idle, Aligning, SpinUp, Spinning, Error] {
            let edge = TriggerFlag::new();
            let tim = CommTim::new(FakeTimer::new());
            let mut mc = new_control(&tim, &edge);

            match target {
                Idle => {}
                Aligning => {
                    mc.ignite();
                    mc.run_once();
                }
                SpinUp => align(&mut mc),
                Spinning => spin(&mut mc, &tim, &edge),
                Error => {
                    spin(&mut mc, &tim, &edge);
                    for _ in 0..=LOST_LIMIT {
                        silent_tick(&mut mc, &tim);
                    }
                }
            }
            assert_eq!(mc.state(), target);

            mc.kill();
            mc.run_once();
            assert_eq!(mc.state(), Idle, "kill from {:?}", target);
            assert_eq!(mc.status().fault, None);
            assert!(!tim.is_commutation_enabled());
            assert!(!mc.estimator().is_closed_loop());
        }
    }

    #[test]
    fn test_kill_supersedes_ignite() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut mc = new_control(&tim, &edge);

        mc.ignite();
        mc.kill();
        mc.run_once();
        assert_eq!(mc.state(), ControlProcessState::Idle);

        mc.run_once();
        assert_eq!(mc.state(), ControlProcessState::Idle);
    }

    #[test]
    fn test_error_requires_kill_then_ignite() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut mc = new_control(&tim, &edge);
        spin(&mut mc, &tim, &edge);
        for _ in 0..=LOST_LIMIT {
            silent_tick(&mut mc, &tim);
        }
        assert_eq!(mc.state(), ControlProcessState::Error);

        mc.ignite();
        silent_tick(&mut mc, &tim);
        assert_eq!(mc.state(), ControlProcessState::Error);

        mc.kill();
        mc.run_once();
        mc.ignite();
        mc.run_once();
        assert_eq!(mc.state(), ControlProcessState::Aligning);
    }

    #[test]
    fn test_next_state_table() {
        use ControlProcessState::*;

        assert_eq!(next_state(Aligning, CallbackResult::Continue, false), None);
        assert_eq!(next_state(Aligning, CallbackResult::Continue, true), Some((SpinUp, None)));
        assert_eq!(next_state(SpinUp, CallbackResult::Continue, true), None);
        assert_eq!(next_state(SpinUp, CallbackResult::ResumeControl, false), Some((Spinning, None)));
        assert_eq!(
            next_state(Spinning, CallbackResult::ExitControl, false),
            Some((Error, Some(Fault::CrossingLost)))
        );
        for state in [Idle, Aligning, SpinUp, Spinning] {
            assert_eq!(
                next_state(state, CallbackResult::Error, false),
                Some((Error, Some(Fault::Fatal)))
            );
        }
        assert_eq!(next_state(Error, CallbackResult::Error, false), None);
        assert_eq!(next_state(Error, CallbackResult::ResumeControl, false), None);
    }

    #[test]
    fn test_spinup_ramps_period() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut mc = new_control(&tim, &edge);
        align(&mut mc);

        let config = ControlConfig::default();
        assert_eq!(tim.period(), config.spinup_start_period);

        let mut last = tim.period();
        for _ in 0..500 {
            silent_tick(&mut mc, &tim);
            assert!(tim.period() <= last);
            last = tim.period();
        }
        assert_eq!(mc.state(), ControlProcessState::SpinUp);
        assert_eq!(tim.period(), config.spinup_min_period);
    }

    #[test]
    fn test_registers() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut mc = new_control(&tim, &edge);

        assert_eq!(mc.write_register(RegisterAddr::SparkAdvance as u8, (-5i16) as u16), Ok(()));
        assert_eq!(mc.estimator().params().spark_advance, -5);
        assert_eq!(mc.read_register(RegisterAddr::SparkAdvance as u8), Ok((-5i16) as u16));

        assert_eq!(mc.write_register(RegisterAddr::CommTimPeriod as u8, 1234), Ok(()));
        assert_eq!(tim.period(), 1234);
        assert_eq!(
            mc.write_register(RegisterAddr::CommTimPeriod as u8, 0),
            Err(RegisterError::OutOfRange)
        );

        assert_eq!(
            mc.write_register(RegisterAddr::IirPole as u8, IIR_POLE_MAX + 1),
            Err(RegisterError::OutOfRange)
        );
        assert_eq!(mc.read_register(RegisterAddr::IirPole as u8), Ok(6));

        assert_eq!(
            mc.write_register(RegisterAddr::State as u8, 4),
            Err(RegisterError::ReadOnly)
        );
        assert_eq!(
            mc.read_register(RegisterAddr::State as u8),
            Ok(ControlProcessState::Idle as u16)
        );
        assert_eq!(mc.read_register(0x7F), Err(RegisterError::UnknownAddress(0x7F)));
    }

    #[test]
    fn test_pwm_mode_register() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let mut mc = new_control(&tim, &edge);

        assert_eq!(mc.read_register(RegisterAddr::PwmMode as u8), Ok(0));
        assert_eq!(mc.write_register(RegisterAddr::PwmMode as u8, 1), Ok(()));
        assert_eq!(mc.read_register(RegisterAddr::PwmMode as u8), Ok(1));
        assert_eq!(mc.sequencer().current(), six_step::BRAKE[5]);
        assert_eq!(
            mc.write_register(RegisterAddr::PwmMode as u8, 2),
            Err(RegisterError::OutOfRange)
        );

        assert_eq!(mc.write_register(RegisterAddr::PwmMode as u8, 0), Ok(()));
        assert_eq!(mc.sequencer().mode(), PwmMode::Drive);
    }

    #[test]
    fn test_brake_rejected_for_twelve_step() {
        let edge = TriggerFlag::new();
        let tim = CommTim::new(FakeTimer::new());
        let config = ControlConfig {
            scheme: PwmScheme::TwelveStep,
            ..ControlConfig::default()
        };
        let estimator = HardwareEdgeEstimator::new(&edge, PwmScheme::TwelveStep);
        let mut mc = MotorControl::new(&tim, estimator, RecordingStage::default(), config);
        mc.init();

        assert_eq!(
            mc.write_register(RegisterAddr::PwmMode as u8, 1),
            Err(RegisterError::OutOfRange)
        );
        assert_eq!(mc.read_register(RegisterAddr::PwmMode as u8), Ok(0));
    }

    #[test]
    fn test_sampled_estimator_composition() {
        let adc = PhaseVoltages::new();
        let tim = CommTim::new(FakeTimer::new());
        let estimator = AnyEstimator::Sampled(SampledEstimator::new(&adc));
        let mut mc = MotorControl::new(&tim, estimator, RecordingStage::default(), ControlConfig::default());
        mc.init();
        assert_eq!(tim.compare_span(), 1);

        mc.ignite();
        for _ in 0..ALIGN_TICKS {
            mc.run_once();
        }
        assert_eq!(mc.state(), ControlProcessState::SpinUp);

        // ゼロクロスが無い限り閉ループには入らない
        for _ in 0..100 {
            tim.on_compare_match();
            adc.publish(1000, 2000);
            mc.run_once();
        }
        assert_eq!(mc.state(), ControlProcessState::SpinUp);
        assert!(!mc.estimator().is_closed_loop());
    }
}
