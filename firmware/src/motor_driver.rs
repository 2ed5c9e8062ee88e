//! モータードライバー抽象化レイヤー
//!
//! TIM1の相補PWMで3相ハーフブリッジを駆動し、
//! シーケンサーが出力する相ごとの駆動状態をDuty比とチャネル有効/無効に変換します。

use embassy_stm32::{
    pac, peripherals,
    timer::{complementary_pwm::ComplementaryPwm, Channel},
};
use g4_bemf::pwm::{BridgeOutput, PhaseDrive, PowerStage};

const CHANNELS: [Channel; 3] = [Channel::Ch1, Channel::Ch2, Channel::Ch3];

/// 3相モータードライバー
pub struct MotorDriver {
    pwm: ComplementaryPwm<'static, peripherals::TIM1>,
    max_duty: u16,
    /// PWM相に出すDuty値
    duty: u16,
}

impl MotorDriver {
    /// 新しいモータードライバーを作成（全相OFFで開始）
    ///
    /// # 引数
    /// * `pwm` - PWMペリフェラル（TIM1）
    /// * `duty_ratio` - PWM相のデューティ比 (0-100)
    pub fn new(pwm: ComplementaryPwm<'static, peripherals::TIM1>, duty_ratio: u16) -> Self {
        let max_duty = pwm.get_max_duty();
        let mut driver = Self {
            pwm,
            max_duty,
            duty: 0,
        };
        driver.set_duty_ratio(duty_ratio);
        driver.off();
        driver
    }

    pub fn max_duty(&self) -> u16 {
        self.max_duty
    }

    /// PWM相のデューティ比を設定 (0-100)
    pub fn set_duty_ratio(&mut self, ratio: u16) {
        let ratio = ratio.min(100);
        self.duty = (self.max_duty as u32 * ratio as u32 / 100) as u16;
        debug!("PWM duty ratio {}% ({}/{})", ratio, self.duty, self.max_duty);
    }
}

impl PowerStage for MotorDriver {
    fn apply(&mut self, drive: &[PhaseDrive; 3]) {
        for (index, (&ch, &phase)) in CHANNELS.iter().zip(drive.iter()).enumerate() {
            match phase.bridge_output(self.duty, self.max_duty) {
                BridgeOutput::Complementary(duty) => {
                    self.pwm.set_duty(ch, duty);
                    self.pwm.enable(ch);
                }
                BridgeOutput::LowSideOnly(duty) => {
                    self.pwm.set_duty(ch, duty);
                    self.pwm.enable(ch);
                    // 相補出力のみ残す（OCxN = OCxREF）
                    pac::TIM1.ccer().modify(|w| w.set_cce(index, false));
                }
                BridgeOutput::Off => self.pwm.disable(ch),
            }
        }
    }

    fn off(&mut self) {
        for ch in CHANNELS {
            self.pwm.set_duty(ch, 0);
            self.pwm.disable(ch);
        }
    }
}
