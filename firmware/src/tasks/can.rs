//! CAN通信タスク
//!
//! コマンドとレジスタアクセスの受信、ステータスとレジスタ応答の送信を行います。

use embassy_futures::select::{select3, Either3};
use embassy_stm32::can;
use embassy_time::{Duration, Ticker};
use embedded_can::{Id, StandardId};
use g4_bemf::protocol::{can_ids, encode_register_value, encode_status, parse_command};

use crate::config;
use crate::state::{COMMAND_CHANNEL, CONTROL_STATUS, REGISTER_REPLY_CHANNEL};

/// CAN通信タスク
#[embassy_executor::task]
pub async fn can_task(can: can::Can<'static>) {
    let (mut tx, mut rx, _properties) = can.split();

    info!("CAN task started");

    // ステータス送信用タイマー
    let mut status_ticker =
        Ticker::every(Duration::from_millis(config::can::STATUS_PERIOD_MS));

    loop {
        match select3(
            rx.read(),
            status_ticker.next(),
            REGISTER_REPLY_CHANNEL.receive(),
        )
        .await
        {
            Either3::First(Ok(envelope)) => {
                let frame = envelope.frame;
                let id_raw = match frame.header().id() {
                    Id::Standard(std_id) => std_id.as_raw() as u32,
                    Id::Extended(ext_id) => ext_id.as_raw(),
                };

                match parse_command(id_raw, frame.data()) {
                    Some(command) => {
                        debug!("CAN command: {}", command);
                        COMMAND_CHANNEL.send(command).await;
                    }
                    None => trace!("Ignoring CAN frame id={:#x}", id_raw),
                }
            }
            Either3::First(Err(e)) => {
                warn!("CAN receive error: {:?}", e);
            }
            Either3::Second(()) => {
                let status = *CONTROL_STATUS.lock().await;
                send(&mut tx, can_ids::STATUS, &encode_status(&status)).await;
            }
            Either3::Third((addr, value)) => {
                send(&mut tx, can_ids::REGISTER_VALUE, &encode_register_value(addr, value)).await;
            }
        }
    }
}

async fn send(tx: &mut can::CanTx<'static>, id: u32, data: &[u8]) {
    if let Some(std_id) = StandardId::new(id as u16) {
        if let Ok(frame) = can::frame::Frame::new_data(Id::Standard(std_id), data) {
            let _ = tx.write(&frame).await;
        }
    }
}
