//! LED制御タスク
//!
//! 制御状態をLEDで表示します。

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Timer};
use g4_bemf::ControlProcessState;

use crate::state::CONTROL_STATUS;

/// LED制御タスク
///
/// - LED1: 閉ループ運転中
/// - LED2: 位置合わせ / 強制転流中
/// - LED3: エラー（点滅）
#[embassy_executor::task]
pub async fn led_task(
    mut led1: Output<'static>,
    mut led2: Output<'static>,
    mut led3: Output<'static>,
) {
    info!("LED task started");

    let mut blink = false;
    loop {
        let state = CONTROL_STATUS.lock().await.state;
        blink = !blink;

        led1.set_level((state == ControlProcessState::Spinning).into());
        led2.set_level(
            matches!(
                state,
                ControlProcessState::Aligning | ControlProcessState::SpinUp
            )
            .into(),
        );
        led3.set_level((state == ControlProcessState::Error && blink).into());

        Timer::after(Duration::from_millis(250)).await;
    }
}
