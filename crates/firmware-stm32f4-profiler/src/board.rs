// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Register-level bring-up of the CW308 STM32F4 target.
//!
//! Clock: 7.3728 MHz external clock in bypass mode, no PLL.
//! USART1: PA9 (TX) / PA10 (RX), AF7. Trigger: PA12. LEDs: PC13 (error),
//! PC14 (ok).

use fi_profiler_core::{SerialPort, StatusIndicator, TransportError, TriggerLine};

/// External clock fed by the capture hardware.
pub const HSE_HZ: u32 = 7_372_800;

// RCC
const RCC_BASE: u32 = 0x4002_3800;
const RCC_CR: *mut u32 = RCC_BASE as *mut u32;
const RCC_CFGR: *mut u32 = (RCC_BASE + 0x08) as *mut u32;
const RCC_AHB1ENR: *mut u32 = (RCC_BASE + 0x30) as *mut u32;
const RCC_APB2ENR: *mut u32 = (RCC_BASE + 0x44) as *mut u32;

const RCC_CR_HSEON: u32 = 1 << 16;
const RCC_CR_HSERDY: u32 = 1 << 17;
const RCC_CR_HSEBYP: u32 = 1 << 18;
const RCC_CFGR_SW_MASK: u32 = 0b11;
const RCC_CFGR_SW_HSE: u32 = 0b01;
const RCC_CFGR_SWS_HSE: u32 = 0b01 << 2;
const RCC_AHB1ENR_GPIOAEN: u32 = 1 << 0;
const RCC_AHB1ENR_GPIOCEN: u32 = 1 << 2;
const RCC_APB2ENR_USART1EN: u32 = 1 << 4;

// GPIO
const GPIOA_BASE: u32 = 0x4002_0000;
const GPIOC_BASE: u32 = 0x4002_0800;
const GPIO_MODER: u32 = 0x00;
const GPIO_OSPEEDR: u32 = 0x08;
const GPIO_PUPDR: u32 = 0x0C;
const GPIO_BSRR: u32 = 0x18;
const GPIO_AFRH: u32 = 0x24;

const GPIOA_BSRR: *mut u32 = (GPIOA_BASE + GPIO_BSRR) as *mut u32;
const GPIOC_BSRR: *mut u32 = (GPIOC_BASE + GPIO_BSRR) as *mut u32;

const MODE_OUTPUT: u32 = 0b01;
const MODE_AF: u32 = 0b10;
const PULL_UP: u32 = 0b01;
const PULL_DOWN: u32 = 0b10;
const SPEED_HIGH: u32 = 0b10;
const AF7_USART1: u32 = 7;

const PIN_TX: u32 = 9;
const PIN_RX: u32 = 10;
const PIN_TRIGGER: u32 = 12;
const PIN_LED_ERROR: u32 = 13;
const PIN_LED_OK: u32 = 14;

// USART1
const USART1_BASE: u32 = 0x4001_1000;
const USART1_SR: *mut u32 = USART1_BASE as *mut u32;
const USART1_DR: *mut u32 = (USART1_BASE + 0x04) as *mut u32;
const USART1_BRR: *mut u32 = (USART1_BASE + 0x08) as *mut u32;
const USART1_CR1: *mut u32 = (USART1_BASE + 0x0C) as *mut u32;

const USART_SR_PE: u32 = 1 << 0;
const USART_SR_FE: u32 = 1 << 1;
const USART_SR_NF: u32 = 1 << 2;
const USART_SR_ORE: u32 = 1 << 3;
const USART_SR_RXNE: u32 = 1 << 5;
const USART_SR_TC: u32 = 1 << 6;
const USART_SR_TXE: u32 = 1 << 7;
const USART_CR1_RE: u32 = 1 << 2;
const USART_CR1_TE: u32 = 1 << 3;
const USART_CR1_UE: u32 = 1 << 13;

#[inline(always)]
fn read(reg: *mut u32) -> u32 {
    unsafe { core::ptr::read_volatile(reg) }
}

#[inline(always)]
fn write(reg: *mut u32, value: u32) {
    unsafe { core::ptr::write_volatile(reg, value) }
}

#[inline(always)]
fn modify(reg: *mut u32, clear: u32, set: u32) {
    write(reg, (read(reg) & !clear) | set);
}

fn gpio_reg(base: u32, offset: u32) -> *mut u32 {
    (base + offset) as *mut u32
}

/// Sets the two-bit field of `pin` in a MODER/PUPDR/OSPEEDR style register.
fn set_pin_field2(base: u32, offset: u32, pin: u32, value: u32) {
    modify(gpio_reg(base, offset), 0b11 << (pin * 2), value << (pin * 2));
}

/// Peripherals handed to the harness. Only [`init`] creates them.
pub struct Board {
    pub usart: Usart1,
    pub trigger: TriggerPin,
    pub leds: StatusLeds,
}

/// Brings up clock, pins and USART1 at `baud`. The trigger is low on return.
pub fn init(baud: u32) -> Board {
    // Clock from the external oscillator. HSEBYP is only writable while HSE
    // is off.
    modify(RCC_CR, 0, RCC_CR_HSEBYP);
    modify(RCC_CR, 0, RCC_CR_HSEON);
    while read(RCC_CR) & RCC_CR_HSERDY == 0 {}
    modify(RCC_CFGR, RCC_CFGR_SW_MASK, RCC_CFGR_SW_HSE);
    while read(RCC_CFGR) & (RCC_CFGR_SW_MASK << 2) != RCC_CFGR_SWS_HSE {}

    modify(RCC_AHB1ENR, 0, RCC_AHB1ENR_GPIOAEN | RCC_AHB1ENR_GPIOCEN);
    modify(RCC_APB2ENR, 0, RCC_APB2ENR_USART1EN);

    // Trigger: drive low before switching the pin to output.
    write(GPIOA_BSRR, 1 << (PIN_TRIGGER + 16));
    set_pin_field2(GPIOA_BASE, GPIO_PUPDR, PIN_TRIGGER, PULL_DOWN);
    set_pin_field2(GPIOA_BASE, GPIO_OSPEEDR, PIN_TRIGGER, SPEED_HIGH);
    set_pin_field2(GPIOA_BASE, GPIO_MODER, PIN_TRIGGER, MODE_OUTPUT);

    // USART1 pins.
    modify(
        gpio_reg(GPIOA_BASE, GPIO_AFRH),
        (0xF << ((PIN_TX - 8) * 4)) | (0xF << ((PIN_RX - 8) * 4)),
        (AF7_USART1 << ((PIN_TX - 8) * 4)) | (AF7_USART1 << ((PIN_RX - 8) * 4)),
    );
    set_pin_field2(GPIOA_BASE, GPIO_PUPDR, PIN_RX, PULL_UP);
    set_pin_field2(GPIOA_BASE, GPIO_MODER, PIN_TX, MODE_AF);
    set_pin_field2(GPIOA_BASE, GPIO_MODER, PIN_RX, MODE_AF);

    // LEDs off, outputs.
    write(GPIOC_BSRR, (1 << (PIN_LED_OK + 16)) | (1 << (PIN_LED_ERROR + 16)));
    set_pin_field2(GPIOC_BASE, GPIO_MODER, PIN_LED_OK, MODE_OUTPUT);
    set_pin_field2(GPIOC_BASE, GPIO_MODER, PIN_LED_ERROR, MODE_OUTPUT);

    // 8N1, oversampling by 16, APB2 runs at HSE.
    write(USART1_BRR, (HSE_HZ + baud / 2) / baud);
    write(USART1_CR1, USART_CR1_UE | USART_CR1_TE | USART_CR1_RE);

    Board {
        usart: Usart1 { _private: () },
        trigger: TriggerPin { _private: () },
        leds: StatusLeds { _private: () },
    }
}

/// Polled USART1.
pub struct Usart1 {
    _private: (),
}

impl SerialPort for Usart1 {
    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut sr;
        loop {
            sr = read(USART1_SR);
            if sr & (USART_SR_RXNE | USART_SR_ORE | USART_SR_FE | USART_SR_NF | USART_SR_PE) != 0 {
                break;
            }
        }
        // Reading DR after SR clears the error flags.
        let byte = read(USART1_DR) as u8;
        if sr & USART_SR_ORE != 0 {
            Err(TransportError::Overrun)
        } else if sr & USART_SR_FE != 0 {
            Err(TransportError::Framing)
        } else if sr & USART_SR_NF != 0 {
            Err(TransportError::Noise)
        } else if sr & USART_SR_PE != 0 {
            Err(TransportError::Parity)
        } else {
            Ok(byte)
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        while read(USART1_SR) & USART_SR_TXE == 0 {}
        write(USART1_DR, byte as u32);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        while read(USART1_SR) & USART_SR_TC == 0 {}
        Ok(())
    }
}

/// PA12. Each edge is a single BSRR store.
pub struct TriggerPin {
    _private: (),
}

impl TriggerLine for TriggerPin {
    #[inline(always)]
    fn set_high(&mut self) {
        write(GPIOA_BSRR, 1 << PIN_TRIGGER);
    }

    #[inline(always)]
    fn set_low(&mut self) {
        write(GPIOA_BSRR, 1 << (PIN_TRIGGER + 16));
    }
}

/// Carrier LEDs: PC14 lights after a clean cycle, PC13 after a fault.
pub struct StatusLeds {
    _private: (),
}

impl StatusIndicator for StatusLeds {
    fn ok(&mut self, _status: u32) {
        write(GPIOC_BSRR, (1 << PIN_LED_OK) | (1 << (PIN_LED_ERROR + 16)));
    }

    fn error(&mut self, _status: u32) {
        write(GPIOC_BSRR, (1 << PIN_LED_ERROR) | (1 << (PIN_LED_OK + 16)));
    }
}
