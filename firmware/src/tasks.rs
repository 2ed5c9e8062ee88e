//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod bemf;
pub mod can;
pub mod control;
pub mod led;

// タスク関数を再エクスポート
pub use bemf::bemf_edge_task;
pub use can::can_task;
pub use control::{control_task, PhaseAdc};
pub use led::led_task;
