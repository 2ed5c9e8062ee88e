//! 転流制御のパラメータとしきい値

/// 転流進角のデフォルト値 [tick]
pub const DEFAULT_SPARK_ADVANCE: i16 = 0;

/// 周期を直接採用できる変化幅のデフォルト値 [tick]
pub const DEFAULT_DIRECT_CUTOFF: u16 = 10_000;

/// 変化幅を超えた場合の追従量のデフォルト値 [tick]
pub const DEFAULT_DIRECT_CUTOFF_SLOPE: u16 = 20;

/// IIRフィルタ極のデフォルト値
pub const DEFAULT_IIR_POLE: u16 = 6;

/// 転流直後に無視するPWMサンプル数のデフォルト値
pub const DEFAULT_HOLD_OFF_SAMPLES: u16 = 1;

/// 転流タイマーの周期リセット値（最遅）
pub const COMM_TIM_PERIOD_MAX: u16 = u16::MAX;

/// ラップアラウンドまでに残す安全マージン [tick]
pub const COMM_TIM_SAFE_MARGIN: u16 = 1000;

/// 有効とみなすエッジ間隔の上限 [tick]
pub const COMM_TIM_MAX_VALID_DELTA: u16 = u16::MAX - COMM_TIM_SAFE_MARGIN;

/// ADCのフルスケール（12bit）
pub const ADC_MAX: u16 = 0x0FFF;

/// ゼロクロス判定から除外するADC両端の幅
pub const ADC_NOISE_FLOOR: u16 = 500;

/// 閉ループ移行に必要な連続有効回数
pub const READY_VALID_COUNT: u32 = 20;

/// Spinning中に許容するゼロクロス連続喪失回数
pub const LOST_CROSSING_LIMIT: u32 = 10;

/// 位置合わせ時間 [poll tick]
pub const ALIGN_TICKS: u32 = 200;

/// IIR極の上限（レジスタ書き込み時の範囲チェック用）
pub const IIR_POLE_MAX: u16 = 1024;

/// 強制転流（スピンアップ）パラメータ
pub mod spinup {
    /// 初期転流周期 [tick]
    pub const DEFAULT_START_PERIOD: u16 = 60_000;

    /// 最短転流周期 [tick]
    pub const DEFAULT_MIN_PERIOD: u16 = 4_000;

    /// 加速率（1回の転流で周期を 1/divisor 短縮）
    pub const DEFAULT_ACCEL_DIVISOR: u16 = 64;
}
