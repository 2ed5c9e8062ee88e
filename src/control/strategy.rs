//! 状態ごとの制御ストラテジー
//!
//! 各状態は、コールバックを起動するトリガー源と、定常コールバック・入場/退場コールバックを持つ。
//! 登録は [`Strategies`] の各フィールドとして構築時に1対1で決まる。

use crate::comm_tim::{CommTim, CommTimerHw};
use crate::config::ControlConfig;
use crate::control::{CallbackResult, ControlProcess, ControlProcessState};
use crate::estimator::PeriodEstimator;
use crate::pwm::{PowerStage, PwmSequencer};

/// コールバックを起動する条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerSource {
    /// 転流タイマーのコンペア一致
    CommTimer,
    /// ポーリングループ1回ごと
    EveryTick,
}

/// コールバックに渡す制御対象一式
pub struct StateContext<'c, H, E, P> {
    pub process: &'c mut ControlProcess,
    pub timer: &'c CommTim<H>,
    pub estimator: &'c mut E,
    pub sequencer: &'c mut PwmSequencer<P>,
    pub config: &'c ControlConfig,
}

impl<H: CommTimerHw, E: PeriodEstimator, P: PowerStage> StateContext<'_, H, E, P> {
    /// 出力停止して推定器とタイマーを初期状態に戻す
    fn de_energize(&mut self) {
        self.timer.reset();
        self.estimator.set_closed_loop(false);
        self.estimator.reset();
        self.sequencer.reset();
        self.process.bemf_crossing_counter = 0;
        self.process.bemf_lost_crossing_counter = 0;
        self.process.align_counter = 0;
    }
}

/// 1状態分の振る舞い
pub trait StateStrategy {
    fn trigger(&self) -> TriggerSource;

    fn on_enter<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        _ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        CallbackResult::Continue
    }

    fn on_steady<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult;

    fn on_exit<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        _ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        CallbackResult::Continue
    }
}

/// 停止中
#[derive(Debug, Default)]
pub struct IdleStrategy;

impl StateStrategy for IdleStrategy {
    fn trigger(&self) -> TriggerSource {
        TriggerSource::EveryTick
    }

    fn on_enter<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        ctx.de_energize();
        ctx.process.fault = None;
        CallbackResult::Continue
    }

    fn on_steady<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        _ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        CallbackResult::Continue
    }
}

/// ロータ位置合わせ（1ステップ分の励磁を保持）
#[derive(Debug, Default)]
pub struct AligningStrategy;

impl StateStrategy for AligningStrategy {
    fn trigger(&self) -> TriggerSource {
        TriggerSource::EveryTick
    }

    fn on_enter<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        ctx.process.align_counter = 0;
        let step = ctx.sequencer.align();
        debug!("Aligning with {}", step);
        CallbackResult::Continue
    }

    fn on_steady<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        ctx.process.align_counter = ctx.process.align_counter.saturating_add(1);
        CallbackResult::Continue
    }
}

/// 強制転流で加速し、推定器の準備完了を待つ
#[derive(Debug, Default)]
pub struct SpinUpStrategy;

impl StateStrategy for SpinUpStrategy {
    fn trigger(&self) -> TriggerSource {
        TriggerSource::CommTimer
    }

    fn on_enter<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        ctx.timer.set_period(ctx.config.spinup_start_period);
        ctx.timer.update_capture_reference();
        ctx.timer.enable_commutation(true);
        CallbackResult::Continue
    }

    fn on_steady<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        if ctx.estimator.is_ready(ctx.timer) {
            return CallbackResult::ResumeControl;
        }

        let period = ctx.timer.period();
        let divisor = ctx.config.spinup_accel_divisor.max(1);
        let next = (period - period / divisor).max(ctx.config.spinup_min_period);
        ctx.timer.set_period(next);
        CallbackResult::Continue
    }
}

/// 閉ループ運転中のゼロクロス監視
#[derive(Debug, Default)]
pub struct SpinningStrategy;

impl StateStrategy for SpinningStrategy {
    fn trigger(&self) -> TriggerSource {
        TriggerSource::CommTimer
    }

    fn on_enter<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        ctx.process.bemf_crossing_counter = 0;
        ctx.process.bemf_lost_crossing_counter = 0;
        ctx.estimator.take_crossing();
        CallbackResult::Continue
    }

    fn on_steady<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        let process = &mut *ctx.process;
        if ctx.estimator.take_crossing() {
            process.bemf_crossing_counter = process.bemf_crossing_counter.saturating_add(1);
            process.bemf_lost_crossing_counter = 0;
        } else {
            process.bemf_crossing_counter = 0;
            process.bemf_lost_crossing_counter = process.bemf_lost_crossing_counter.saturating_add(1);
        }

        if process.bemf_lost_crossing_counter > ctx.config.lost_crossing_limit {
            return CallbackResult::ExitControl;
        }
        CallbackResult::Continue
    }
}

/// エラー停止（kill からのみ復帰）
#[derive(Debug, Default)]
pub struct ErrorStrategy;

impl StateStrategy for ErrorStrategy {
    fn trigger(&self) -> TriggerSource {
        TriggerSource::CommTimer
    }

    fn on_enter<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        ctx.de_energize();
        CallbackResult::Continue
    }

    fn on_steady<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        _ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        CallbackResult::Continue
    }
}

/// 呼び出すコールバック
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Enter,
    Steady,
    Exit,
}

/// 全状態のストラテジー表
#[derive(Debug, Default)]
pub struct Strategies {
    pub idle: IdleStrategy,
    pub aligning: AligningStrategy,
    pub spin_up: SpinUpStrategy,
    pub spinning: SpinningStrategy,
    pub error: ErrorStrategy,
}

macro_rules! with_strategy {
    ($self:ident, $state:expr, $s:ident => $body:expr) => {
        match $state {
            ControlProcessState::Idle => {
                let $s = &mut $self.idle;
                $body
            }
            ControlProcessState::Aligning => {
                let $s = &mut $self.aligning;
                $body
            }
            ControlProcessState::SpinUp => {
                let $s = &mut $self.spin_up;
                $body
            }
            ControlProcessState::Spinning => {
                let $s = &mut $self.spinning;
                $body
            }
            ControlProcessState::Error => {
                let $s = &mut $self.error;
                $body
            }
        }
    };
}

impl Strategies {
    pub fn trigger(&mut self, state: ControlProcessState) -> TriggerSource {
        with_strategy!(self, state, s => s.trigger())
    }

    pub(crate) fn dispatch<H: CommTimerHw, E: PeriodEstimator, P: PowerStage>(
        &mut self,
        state: ControlProcessState,
        hook: Hook,
        ctx: &mut StateContext<'_, H, E, P>,
    ) -> CallbackResult {
        with_strategy!(self, state, s => match hook {
            Hook::Enter => s.on_enter(ctx),
            Hook::Steady => s.on_steady(ctx),
            Hook::Exit => s.on_exit(ctx),
        })
    }
}
