//! ハードウェアと起動時の設定パラメータ

/// PWM設定
pub mod pwm {
    use embassy_stm32::time::Hertz;

    /// PWM周波数（50kHz）（デフォルト値）
    pub const DEFAULT_FREQUENCY: Hertz = Hertz(50_000);

    /// デッドタイム（デフォルト値）
    pub const DEFAULT_DEAD_TIME: u16 = 1;

    /// PWM相のデューティ比 (0-100)（デフォルト値）
    pub const DEFAULT_DUTY_RATIO: u16 = 20;
}

/// 転流タイマー（TIM4）設定
pub mod comm_tim {
    /// プリスケーラー（170MHz / (169 + 1) = 1MHz、1tick = 1μs）
    pub const PRESCALER: u16 = 169;

    /// 割り込み優先度（Embassyタスクより高優先度）
    pub const IRQ_PRIORITY: u8 = 0x20;
}

/// CAN設定
pub mod can {
    /// CANビットレート（250kbps）（デフォルト値）
    pub const DEFAULT_BITRATE: u32 = 250_000;

    /// ステータス送信周期 [ms]
    pub const STATUS_PERIOD_MS: u64 = 100;
}

/// 周期推定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EstimatorKind {
    /// コンパレータ出力のエッジ割り込み
    HardwareEdge,
    /// 浮き相電圧のADCサンプリング
    Sampled,
}

/// 起動時に選択する推定方式
pub const DEFAULT_ESTIMATOR: EstimatorKind = EstimatorKind::HardwareEdge;
