//! 転流制御タスク
//!
//! 制御プロセスをポーリングループで回し、CANからのコマンドを反映します。

use embassy_futures::yield_now;
use embassy_stm32::{
    adc::{Adc, AnyAdcChannel},
    peripherals,
};
use g4_bemf::comm_tim::CommTimerHw;
use g4_bemf::estimator::{AnyEstimator, HardwareEdgeEstimator, PeriodEstimator, SampledEstimator};
use g4_bemf::protocol::Command;
use g4_bemf::pwm::{Phase, PowerStage};
use g4_bemf::MotorControl;

use crate::config::{self, ControlConfig, EstimatorKind};
use crate::motor_driver::MotorDriver;
use crate::state::{
    BEMF_EDGE, COMM_TIM, COMMAND_CHANNEL, CONTROL_STATUS, PHASE_VOLTAGES, REGISTER_REPLY_CHANNEL,
};

/// 浮き相電圧のADC入力（サンプリング方式用）
pub struct PhaseAdc {
    pub adc: Adc<'static, peripherals::ADC1>,
    /// A/B/C相の分圧入力
    pub phases: [AnyAdcChannel<peripherals::ADC1>; 3],
    /// バッテリー電圧の分圧入力（相と同じ分圧比）
    pub vbus: AnyAdcChannel<peripherals::ADC1>,
}

impl PhaseAdc {
    /// 浮き相をサンプリングして公開
    fn sample(&mut self, phase: Phase) {
        let index = match phase {
            Phase::A => 0,
            Phase::B => 1,
            Phase::C => 2,
        };
        let phase_voltage = self.adc.blocking_read(&mut self.phases[index]);
        COMM_TIM.capture_time();
        let vbus = self.adc.blocking_read(&mut self.vbus);
        PHASE_VOLTAGES.publish(phase_voltage, vbus / 2);
    }
}

/// 転流制御タスク
#[embassy_executor::task]
pub async fn control_task(driver: MotorDriver, mut phase_adc: Option<PhaseAdc>) {
    let control_config = ControlConfig::default();
    let estimator = match config::DEFAULT_ESTIMATOR {
        EstimatorKind::HardwareEdge => AnyEstimator::Hardware(HardwareEdgeEstimator::new(
            &BEMF_EDGE,
            control_config.scheme,
        )),
        EstimatorKind::Sampled => AnyEstimator::Sampled(SampledEstimator::new(&PHASE_VOLTAGES)),
    };

    info!(
        "Control task started: estimator={}, scheme={}",
        config::DEFAULT_ESTIMATOR,
        control_config.scheme
    );

    let mut mc = MotorControl::new(&COMM_TIM, estimator, driver, control_config);
    mc.init();

    loop {
        if let Some(adc) = phase_adc.as_mut() {
            adc.sample(mc.sequencer().current().bemf.phase);
        }

        while let Ok(command) = COMMAND_CHANNEL.try_receive() {
            handle_command(&mut mc, command);
        }

        mc.run_once();

        if let Ok(mut status) = CONTROL_STATUS.try_lock() {
            *status = mc.status();
        }

        yield_now().await;
    }
}

fn handle_command<H, E, P>(mc: &mut MotorControl<'_, H, E, P>, command: Command)
where
    H: CommTimerHw,
    E: PeriodEstimator,
    P: PowerStage,
{
    match command {
        Command::WriteRegister { addr, value } => {
            if let Err(e) = mc.write_register(addr, value) {
                warn!("Register write {:#x} rejected: {}", addr, e);
            }
        }
        Command::ReadRegister { addr } => match mc.read_register(addr) {
            Ok(value) => {
                if REGISTER_REPLY_CHANNEL.try_send((addr, value)).is_err() {
                    warn!("Register reply dropped: {:#x}", addr);
                }
            }
            Err(e) => warn!("Register read {:#x} rejected: {}", addr, e),
        },
        Command::Ignite => mc.ignite(),
        Command::Kill => mc.kill(),
    }
}
