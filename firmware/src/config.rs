//! Configuration module
//!
//! ハードウェアと起動時の設定を提供します。
//! 推定器と制御プロセスのパラメータは `g4_bemf::config` を使用します。

pub mod params;

// params.rsから主要な定数を再エクスポート
pub use params::*;

pub use g4_bemf::config::ControlConfig;
