//! TIM4ベースの転流タイマー実装
//!
//! TIM4をフリーランの16ビットカウンタとして使い、CH1のコンペア一致で転流タイミングを作ります。
//!
//! ## ハードウェア構成
//! - TIM4: PSC=169（1MHz、1tick = 1μs）、ARR=0xFFFF
//! - CH1: 出力コンペア（Frozen、ピン出力なし）
//! - 割り込み: CC1（コンペア一致）、UPDATE（オーバーフロー）

use embassy_stm32::pac;
use g4_bemf::comm_tim::CommTimerHw;

use crate::config;
use crate::state::COMM_TIM;

/// TIM4の転流タイマーハードウェア
pub struct Tim4Hw;

impl CommTimerHw for Tim4Hw {
    fn init(&self) {
        // 初期化は起動時に一度だけ、割り込み有効化前に行われる
        unsafe { init_comm_timer() }
    }

    #[inline(always)]
    fn counter(&self) -> u16 {
        pac::TIM4.cnt().read().cnt() as u16
    }

    #[inline(always)]
    fn capture(&self) -> u16 {
        pac::TIM4.ccr(0).read().ccr() as u16
    }

    #[inline(always)]
    fn set_compare(&self, value: u16) {
        pac::TIM4.ccr(0).write(|w| w.set_ccr(value.into()));
    }
}

/// TIM4 コンペアタイマーの初期化
///
/// # Safety
/// PACを使用した直接的なレジスタ操作を含むため、unsafe
unsafe fn init_comm_timer() {
    let rcc = pac::RCC;
    let tim4 = pac::TIM4;

    info!("Initializing TIM4 commutation timer...");

    // 1. クロック有効化
    rcc.apb1enr1().modify(|w| w.set_tim4en(true));

    // 2. タイマーを停止して周期を設定
    tim4.cr1().modify(|w| w.set_cen(false));
    tim4.psc().write_value(config::comm_tim::PRESCALER);
    tim4.arr().write_value(pac::timer::regs::ArrCore(0xFFFF));

    // 3. CH1はリセット値のまま（出力コンペア、Frozen）
    tim4.ccr(0).write(|w| w.set_ccr(0xFFFF));

    // 4. 割り込み設定（CC1IE、UIE）
    tim4.dier().modify(|w| {
        w.set_ccie(0, true);
        w.set_uie(true);
    });

    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM4);
        let mut cp = cortex_m::Peripherals::steal();
        cp.NVIC
            .set_priority(pac::Interrupt::TIM4, config::comm_tim::IRQ_PRIORITY);
    }

    // 5. カウンタをリセットしてタイマー開始
    tim4.cnt().write_value(pac::timer::regs::CntCore(0));
    tim4.sr().write(|w| w.0 = 0);
    tim4.egr().write(|w| w.set_ug(true)); // プリスケーラ反映

    tim4.cr1().modify(|w| {
        w.set_cen(true);
        w.set_urs(pac::timer::vals::Urs::COUNTER_ONLY);
    });

    info!("TIM4 commutation timer initialized");
}

/// TIM4割り込みハンドラー（Compare 1 + Update）
///
/// # Safety
/// 割り込みコンテキストで実行されるため、処理は最小限にする
#[inline(always)]
unsafe fn tim4_irq_handler() {
    let tim4 = pac::TIM4;
    let sr = tim4.sr().read();

    // オーバーフロー
    if sr.uif() {
        tim4.sr().modify(|w| w.set_uif(false));
        COMM_TIM.on_counter_update();
    }

    // コンペア一致
    if sr.ccif(0) {
        tim4.sr().modify(|w| w.set_ccif(0, false));
        COMM_TIM.on_compare_match();
    }
}

/// TIM4割り込みのRust側エントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM4() {
    tim4_irq_handler();
}
