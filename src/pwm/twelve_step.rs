//! 12ステップ駆動パターン（PWM-ON-PWM）
//!
//! 6ステップの各区間を、ハイ側常時ON＋ロー側PWMとハイ側PWM＋ロー側常時ONの2つに分割する。
//! 浮き相は2ステップずつ同じで、BEMFの向きも2ステップ単位で反転する。

use super::Phase::{A, B, C};
use super::PhaseDrive::{Floating, High, Low, PwmHigh, PwmLow};
use super::Step;

pub const STEPS: usize = 12;

pub const DRIVE: [Step; STEPS] = [
    Step::new(High, Floating, PwmLow, B, false),
    Step::new(High, PwmLow, Floating, C, true),
    Step::new(PwmHigh, Low, Floating, C, true),
    Step::new(Floating, Low, PwmHigh, A, false),
    Step::new(Floating, PwmLow, High, A, false),
    Step::new(PwmLow, Floating, High, B, true),
    Step::new(Low, Floating, PwmHigh, B, true),
    Step::new(Low, PwmHigh, Floating, C, false),
    Step::new(PwmLow, High, Floating, C, false),
    Step::new(Floating, High, PwmLow, A, true),
    Step::new(Floating, PwmHigh, Low, A, true),
    Step::new(PwmHigh, Floating, Low, B, false),
];
