//! 6ステップ駆動パターン（H-PWM / L-ON）
//!
//! | step | A | B | C | BEMF |
//! |------|---|---|---|------|
//! | 0 | PWM | L | - | C 立ち上がり |
//! | 1 | - | L | PWM | A 立ち下がり |
//! | 2 | L | - | PWM | B 立ち上がり |
//! | 3 | L | PWM | - | C 立ち下がり |
//! | 4 | - | PWM | L | A 立ち上がり |
//! | 5 | PWM | - | L | B 立ち下がり |

use super::Phase::{A, B, C};
use super::PhaseDrive::{Floating, Low, PwmHigh, PwmLow};
use super::Step;

pub const STEPS: usize = 6;

/// 駆動パターン
pub const DRIVE: [Step; STEPS] = [
    Step::new(PwmHigh, Low, Floating, C, true),
    Step::new(Floating, Low, PwmHigh, A, false),
    Step::new(Low, Floating, PwmHigh, B, true),
    Step::new(Low, PwmHigh, Floating, C, false),
    Step::new(Floating, PwmHigh, Low, A, true),
    Step::new(PwmHigh, Floating, Low, B, false),
];

/// ブレーキパターン（ハイサイドを使わず、駆動時のハイ側相をローサイドPWM）
pub const BRAKE: [Step; STEPS] = [
    Step::new(PwmLow, Floating, Floating, C, true),
    Step::new(Floating, Floating, PwmLow, A, false),
    Step::new(Floating, Floating, PwmLow, B, true),
    Step::new(Floating, PwmLow, Floating, C, false),
    Step::new(Floating, PwmLow, Floating, A, true),
    Step::new(PwmLow, Floating, Floating, B, false),
];
