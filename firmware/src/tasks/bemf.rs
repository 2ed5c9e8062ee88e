//! BEMFエッジタスク
//!
//! コンパレータ出力のエッジで転流タイマーの時刻を記録し、推定器に通知します。

use embassy_stm32::exti::ExtiInput;

use crate::state::{BEMF_EDGE, COMM_TIM};

/// BEMFエッジタスク（ハードウェアエッジ方式）
#[embassy_executor::task]
pub async fn bemf_edge_task(mut comparator: ExtiInput<'static>) {
    info!("BEMF edge task started");

    loop {
        comparator.wait_for_any_edge().await;

        // キャプチャしてからフラグを立てる
        COMM_TIM.capture_time();
        BEMF_EDGE.set();
    }
}
