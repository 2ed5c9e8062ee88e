//! グローバル共有状態管理
//!
//! 割り込みとタスク間で共有される状態を管理します。

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, ThreadModeRawMutex};
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use g4_bemf::control::ControlStatus;
use g4_bemf::estimator::PhaseVoltages;
use g4_bemf::protocol::Command;
use g4_bemf::trigger::TriggerFlag;
use g4_bemf::CommTim;

use crate::comm_tim_hw::Tim4Hw;

/// 転流タイマー（TIM4割り込みと制御タスクで共有）
pub static COMM_TIM: CommTim<Tim4Hw> = CommTim::new(Tim4Hw);

/// コンパレータのBEMFエッジ（エッジタスクがセット）
pub static BEMF_EDGE: TriggerFlag = TriggerFlag::new();

/// 浮き相電圧サンプル（サンプリング方式用）
pub static PHASE_VOLTAGES: PhaseVoltages = PhaseVoltages::new();

/// CANから制御タスクへのコマンド
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, Command, 8> = Channel::new();

/// レジスタ読み出しの応答（アドレス, 値）
pub static REGISTER_REPLY_CHANNEL: Channel<CriticalSectionRawMutex, (u8, u16), 4> = Channel::new();

/// 制御ステータス（CAN送信用）
pub static CONTROL_STATUS: Mutex<ThreadModeRawMutex, ControlStatus> =
    Mutex::new(ControlStatus::new());
