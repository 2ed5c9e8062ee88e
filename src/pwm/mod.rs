//! PWMステップシーケンサー
//!
//! 転流イベントごとに3相の駆動パターンを1ステップ進めます。
//! パターン表は6ステップ（H-PWM / L-ON）と12ステップ（PWM-ON-PWM）の2種類。

pub mod six_step;
pub mod twelve_step;

/// 相
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    A,
    B,
    C,
}

/// 1相あたりの駆動状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhaseDrive {
    /// ハイサイドPWM
    PwmHigh,
    /// ローサイドPWM
    PwmLow,
    /// ハイサイド常時ON
    High,
    /// ローサイド常時ON
    Low,
    /// 両FET OFF（BEMF観測相）
    Floating,
}

impl PhaseDrive {
    pub const fn is_high_side(self) -> bool {
        matches!(self, PhaseDrive::PwmHigh | PhaseDrive::High)
    }

    pub const fn is_low_side(self) -> bool {
        matches!(self, PhaseDrive::PwmLow | PhaseDrive::Low)
    }

    /// 相補PWMチャネルへの出力設定に変換する
    ///
    /// `duty` はPWM相のDuty値。`PwmLow` はハイサイドを止めてローサイドだけを
    /// `duty` でスイッチングする。
    pub const fn bridge_output(self, duty: u16, max_duty: u16) -> BridgeOutput {
        match self {
            PhaseDrive::PwmHigh => BridgeOutput::Complementary(duty),
            PhaseDrive::PwmLow => BridgeOutput::LowSideOnly(duty),
            PhaseDrive::High => BridgeOutput::Complementary(max_duty),
            PhaseDrive::Low => BridgeOutput::Complementary(0),
            PhaseDrive::Floating => BridgeOutput::Off,
        }
    }
}

/// ハーフブリッジ1相分の出力設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeOutput {
    /// ハイサイドにDuty、ローサイドは相補
    Complementary(u16),
    /// ハイサイドOFF、ローサイドのみDutyでスイッチング
    LowSideOnly(u16),
    /// 両FET OFF
    Off,
}

/// ステップ中に浮いている相と、そこで観測されるBEMFの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BemfEdge {
    pub phase: Phase,
    pub rising: bool,
}

/// パターン表の1エントリ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    /// A/B/C相の駆動状態
    pub drive: [PhaseDrive; 3],
    pub bemf: BemfEdge,
}

impl Step {
    pub(crate) const fn new(a: PhaseDrive, b: PhaseDrive, c: PhaseDrive, phase: Phase, rising: bool) -> Self {
        Self {
            drive: [a, b, c],
            bemf: BemfEdge { phase, rising },
        }
    }
}

/// パワーステージ（3相ハーフブリッジ）
pub trait PowerStage {
    /// 3相の駆動パターンを出力
    fn apply(&mut self, drive: &[PhaseDrive; 3]);

    /// 全相OFF
    fn off(&mut self);
}

/// 転流方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmScheme {
    SixStep,
    TwelveStep,
}

impl PwmScheme {
    pub const fn steps(self) -> usize {
        match self {
            PwmScheme::SixStep => six_step::STEPS,
            PwmScheme::TwelveStep => twelve_step::STEPS,
        }
    }

    /// エッジ間隔からタイマー周期への除数
    pub const fn ticks_divisor(self) -> u32 {
        match self {
            PwmScheme::SixStep => 2,
            PwmScheme::TwelveStep => 4,
        }
    }

    fn table(self, mode: PwmMode) -> &'static [Step] {
        match (self, mode) {
            (PwmScheme::SixStep, PwmMode::Drive) => &six_step::DRIVE,
            (PwmScheme::SixStep, PwmMode::Brake) => &six_step::BRAKE,
            // 12ステップにブレーキ表は無い
            (PwmScheme::TwelveStep, _) => &twelve_step::DRIVE,
        }
    }
}

/// 駆動 / ブレーキ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmMode {
    Drive,
    Brake,
}

/// ステップシーケンサー
pub struct PwmSequencer<P> {
    stage: P,
    scheme: PwmScheme,
    mode: PwmMode,
    /// 次に出力するステップ
    index: usize,
}

impl<P: PowerStage> PwmSequencer<P> {
    pub fn new(stage: P, scheme: PwmScheme) -> Self {
        Self {
            stage,
            scheme,
            mode: PwmMode::Drive,
            index: 0,
        }
    }

    pub fn scheme(&self) -> PwmScheme {
        self.scheme
    }

    pub fn mode(&self) -> PwmMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PwmMode) {
        if mode == PwmMode::Brake && self.scheme == PwmScheme::TwelveStep {
            warn!("Brake mode is only available for six-step, keeping drive table");
        }
        self.mode = mode;
    }

    /// 次に出力されるステップ番号
    pub fn index(&self) -> usize {
        self.index
    }

    /// 指定番号のステップ（番号は周期で丸める）
    pub fn step(&self, index: usize) -> Step {
        let table = self.scheme.table(self.mode);
        table[index % table.len()]
    }

    /// 1ステップ転流して、出力したステップを返す
    pub fn commutate(&mut self) -> Step {
        let step = self.step(self.index);
        self.stage.apply(&step.drive);
        self.index = (self.index + 1) % self.scheme.steps();
        trace!("commutate -> {}", step);
        step
    }

    /// 最後に出力したステップ（浮き相の選択に使う）
    pub fn current(&self) -> Step {
        self.step(self.index + self.scheme.steps() - 1)
    }

    /// 位置合わせ用に直前のステップを出力（番号は進めない）
    pub fn align(&mut self) -> Step {
        let step = self.current();
        self.stage.apply(&step.drive);
        step
    }

    /// 全相OFF
    pub fn off(&mut self) {
        self.stage.off();
    }

    /// 全相OFFにしてステップ番号を先頭に戻す
    pub fn reset(&mut self) {
        self.stage.off();
        self.index = 0;
    }

    pub fn stage(&self) -> &P {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut P {
        &mut self.stage
    }
}
