//! Configuration module
//!
//! 推定器と制御プロセスのパラメータ、および各種しきい値を提供します。

pub mod params;

// params.rsから主要な定数を再エクスポート
pub use params::*;

use crate::pwm::PwmScheme;

/// 周期推定パラメータ（レジスタ経由で実行時に変更可能）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EstimatorParams {
    /// 転流進角 [tick]（負値で遅角）
    pub spark_advance: i16,
    /// 直接採用できる周期変化の幅 [tick]
    pub direct_cutoff: u16,
    /// 幅を超えた場合の1回あたりの追従量 [tick]
    pub direct_cutoff_slope: u16,
    /// IIRフィルタの極
    pub iir_pole: u16,
    /// 転流直後に無視するサンプル数
    pub hold_off_samples: u16,
}

impl EstimatorParams {
    pub const fn default() -> Self {
        Self {
            spark_advance: DEFAULT_SPARK_ADVANCE,
            direct_cutoff: DEFAULT_DIRECT_CUTOFF,
            direct_cutoff_slope: DEFAULT_DIRECT_CUTOFF_SLOPE,
            iir_pole: DEFAULT_IIR_POLE,
            hold_off_samples: DEFAULT_HOLD_OFF_SAMPLES,
        }
    }
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self::default()
    }
}

/// 制御プロセス設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlConfig {
    /// 転流方式（6ステップ / 12ステップ）
    pub scheme: PwmScheme,
    /// 位置合わせ時間 [poll tick]
    pub align_ticks: u32,
    /// これを超えてゼロクロスを見失うとエラー
    pub lost_crossing_limit: u32,
    /// 強制転流の初期周期 [tick]
    pub spinup_start_period: u16,
    /// 強制転流の最短周期 [tick]
    pub spinup_min_period: u16,
    /// 強制転流の加速率（周期を period / divisor ずつ短縮）
    pub spinup_accel_divisor: u16,
}

impl ControlConfig {
    pub const fn default() -> Self {
        Self {
            scheme: PwmScheme::SixStep,
            align_ticks: ALIGN_TICKS,
            lost_crossing_limit: LOST_CROSSING_LIMIT,
            spinup_start_period: spinup::DEFAULT_START_PERIOD,
            spinup_min_period: spinup::DEFAULT_MIN_PERIOD,
            spinup_accel_divisor: spinup::DEFAULT_ACCEL_DIVISOR,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::default()
    }
}
