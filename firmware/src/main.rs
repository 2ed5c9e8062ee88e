#![no_std]
#![no_main]

// fmt must be first so its macros are visible in the modules below
mod fmt;

mod comm_tim_hw;
mod config;
mod hardware;
mod motor_driver;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::Spawner;
use embassy_stm32::{
    adc::{Adc, AdcChannel, SampleTime},
    can,
    exti::ExtiInput,
    gpio::{Level, Output, OutputType, Pull, Speed},
    timer::{
        complementary_pwm::{ComplementaryPwm, ComplementaryPwmPin},
        low_level::CountingMode,
        simple_pwm::PwmPin,
    },
};
use embassy_time::{Duration, Timer};

use config::EstimatorKind;
use hardware::Irqs;
use motor_driver::MotorDriver;
use tasks::{bemf_edge_task, can_task, control_task, led_task, PhaseAdc};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let config = hardware::create_clock_config();
    let p = embassy_stm32::init(config);

    info!("═══════════════════════════════════════════════════════════════════");
    info!("        Sensorless BLDC Controller • STM32G431VB @ 170MHz");
    info!("═══════════════════════════════════════════════════════════════════");

    // LED初期化＆タスク起動
    let led1 = Output::new(p.PC13, Level::Low, Speed::Low);
    let led2 = Output::new(p.PC14, Level::Low, Speed::Low);
    let led3 = Output::new(p.PC15, Level::Low, Speed::Low);
    spawner.spawn(led_task(led1, led2, led3)).unwrap();

    // CAN初期化＆タスク起動
    let mut can_configurator = can::CanConfigurator::new(p.FDCAN1, p.PA11, p.PA12, Irqs);
    can_configurator.properties().set_standard_filter(
        can::filter::StandardFilterSlot::_0,
        can::filter::StandardFilter::accept_all_into_fifo0(),
    );
    can_configurator.set_bitrate(config::can::DEFAULT_BITRATE);
    let can = can_configurator.start(can::OperatingMode::NormalOperationMode);
    spawner.spawn(can_task(can)).unwrap();

    // PWM初期化（TIM1、3相相補PWM）
    let mut uvw_pwm = ComplementaryPwm::new(
        p.TIM1,
        Some(PwmPin::new(p.PE9, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE8, OutputType::PushPull)),
        Some(PwmPin::new(p.PE11, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE10, OutputType::PushPull)),
        Some(PwmPin::new(p.PE13, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE12, OutputType::PushPull)),
        None,
        None,
        config::pwm::DEFAULT_FREQUENCY,
        CountingMode::EdgeAlignedUp,
    );
    uvw_pwm.set_dead_time(config::pwm::DEFAULT_DEAD_TIME);
    let driver = MotorDriver::new(uvw_pwm, config::pwm::DEFAULT_DUTY_RATIO);

    // BEMF入力
    let phase_adc = match config::DEFAULT_ESTIMATOR {
        EstimatorKind::HardwareEdge => {
            // コンパレータ出力（PB6）
            let comparator = ExtiInput::new(p.PB6, p.EXTI6, Pull::None);
            spawner.spawn(bemf_edge_task(comparator)).unwrap();
            info!("BEMF comparator input on PB6");
            None
        }
        EstimatorKind::Sampled => {
            // 相電圧: PA0/PA1/PA2（ADC1_IN1..3）、バッテリー電圧: PB14（ADC1_IN5）
            let mut adc = Adc::new(p.ADC1);
            adc.set_sample_time(SampleTime::CYCLES2_5);
            info!("BEMF sampling on ADC1");
            Some(PhaseAdc {
                adc,
                phases: [
                    p.PA0.degrade_adc(),
                    p.PA1.degrade_adc(),
                    p.PA2.degrade_adc(),
                ],
                vbus: p.PB14.degrade_adc(),
            })
        }
    };

    info!("Starting commutation control...");
    spawner.spawn(control_task(driver, phase_adc)).unwrap();

    // メインループ（将来の拡張用）
    loop {
        Timer::after(Duration::from_millis(100)).await;
    }
}
