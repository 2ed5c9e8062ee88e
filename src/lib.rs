//! センサレスBLDC転流コア
//!
//! BEMFゼロクロスから転流周期を推定し、転流タイマーとPWMステップシーケンサーを
//! 制御プロセス（状態機械）で駆動する。ハードウェアには依存せず、
//! タイマーとパワー段はトレイト越しに接続する。
#![cfg_attr(not(test), no_std)]

pub(crate) mod fmt;

pub mod comm_tim;
pub mod config;
pub mod control;
pub mod estimator;
pub mod protocol;
pub mod pwm;
pub mod registers;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use comm_tim::{CommTim, CommTimTiming, CommTimerHw};
pub use config::{ControlConfig, EstimatorParams};
pub use control::{ControlProcessState, ControlStatus, Fault, MotorControl};
pub use estimator::{AnyEstimator, HardwareEdgeEstimator, PeriodEstimator, PhaseVoltages, SampledEstimator};
pub use pwm::{BridgeOutput, PhaseDrive, PowerStage, PwmMode, PwmScheme, PwmSequencer};
pub use registers::{RegisterAddr, RegisterError};
pub use trigger::TriggerFlag;
