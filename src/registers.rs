//! 外部から調整・監視するためのレジスタマップ

/// レジスタアドレス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RegisterAddr {
    /// 転流タイマー周期 [tick]（0は不可）
    CommTimPeriod = 0x00,
    /// 進角 [tick]（i16として解釈）
    SparkAdvance = 0x01,
    DirectCutoff = 0x02,
    DirectCutoffSlope = 0x03,
    /// IIR極 (0..=IIR_POLE_MAX)
    IirPole = 0x04,
    HoldOffSamples = 0x05,
    /// 0: 駆動、1: ブレーキ（6ステップのみ）
    PwmMode = 0x06,
    /// 制御状態（読み出し専用）
    State = 0x10,
    CrossingCounter = 0x11,
    LostCrossingCounter = 0x12,
}

impl RegisterAddr {
    pub const fn is_writable(self) -> bool {
        !matches!(
            self,
            RegisterAddr::State | RegisterAddr::CrossingCounter | RegisterAddr::LostCrossingCounter
        )
    }
}

impl TryFrom<u8> for RegisterAddr {
    type Error = RegisterError;

    fn try_from(value: u8) -> Result<Self, RegisterError> {
        match value {
            0x00 => Ok(RegisterAddr::CommTimPeriod),
            0x01 => Ok(RegisterAddr::SparkAdvance),
            0x02 => Ok(RegisterAddr::DirectCutoff),
            0x03 => Ok(RegisterAddr::DirectCutoffSlope),
            0x04 => Ok(RegisterAddr::IirPole),
            0x05 => Ok(RegisterAddr::HoldOffSamples),
            0x06 => Ok(RegisterAddr::PwmMode),
            0x10 => Ok(RegisterAddr::State),
            0x11 => Ok(RegisterAddr::CrossingCounter),
            0x12 => Ok(RegisterAddr::LostCrossingCounter),
            other => Err(RegisterError::UnknownAddress(other)),
        }
    }
}

/// レジスタアクセスのエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    UnknownAddress(u8),
    ReadOnly,
    OutOfRange,
}
