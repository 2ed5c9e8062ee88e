//! テスト用のハードウェアモック

use core::cell::Cell;
use std::vec::Vec;

use crate::comm_tim::{CommTim, CommTimerHw};
use crate::pwm::{PhaseDrive, PowerStage};

/// カウンター・キャプチャ・コンペアを手動で操作できるタイマー
pub struct FakeTimer {
    pub counter: Cell<u16>,
    pub capture: Cell<u16>,
    pub compare: Cell<u16>,
}

impl FakeTimer {
    pub fn new() -> Self {
        Self {
            counter: Cell::new(0),
            capture: Cell::new(0),
            compare: Cell::new(0),
        }
    }
}

impl CommTimerHw for FakeTimer {
    fn counter(&self) -> u16 {
        self.counter.get()
    }

    fn capture(&self) -> u16 {
        self.capture.get()
    }

    fn set_compare(&self, value: u16) {
        self.compare.set(value);
    }
}

/// カウンターを進め、折り返したら更新割り込みを発生させる
pub fn advance(tim: &CommTim<FakeTimer>, ticks: u16) {
    let now = tim.hw().counter.get();
    let next = now.wrapping_add(ticks);
    if next < now {
        tim.on_counter_update();
    }
    tim.hw().counter.set(next);
}

/// 適用されたパターンを記録するパワーステージ
#[derive(Default)]
pub struct RecordingStage {
    pub applied: Vec<[PhaseDrive; 3]>,
    pub off_count: u32,
}

impl PowerStage for RecordingStage {
    fn apply(&mut self, drive: &[PhaseDrive; 3]) {
        self.applied.push(*drive);
    }

    fn off(&mut self) {
        self.off_count += 1;
    }
}
