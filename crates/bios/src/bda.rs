//! BIOS Data Area field addresses and the handful of mutations the host
//! performs on it.
//!
//! The BDA is guest-owned; the ROM reads and writes it freely between
//! traps. The host touches only the fields below, always inside a trap.

use memory::{GuestMem, MemError};
use pc_constants::BIOS_DATA_AREA;

const BASE: u64 = BIOS_DATA_AREA as u64;

pub const BDA_COM1_ADDR: u64 = BASE;
pub const BDA_COM2_ADDR: u64 = BASE + 0x02;
pub const BDA_COM3_ADDR: u64 = BASE + 0x04;
pub const BDA_COM4_ADDR: u64 = BASE + 0x06;
pub const BDA_LPT1_ADDR: u64 = BASE + 0x08;
pub const BDA_LPT2_ADDR: u64 = BASE + 0x0A;
pub const BDA_LPT3_ADDR: u64 = BASE + 0x0C;
pub const BDA_EBDA_SEG_ADDR: u64 = BASE + 0x0E;
pub const BDA_MACHINE_CONFIG_ADDR: u64 = BASE + 0x10;
pub const BDA_MEM_SIZE_ADDR: u64 = BASE + 0x13;
pub const BDA_KEYBOARD_STATUS1_ADDR: u64 = BASE + 0x17;
pub const BDA_KEYBOARD_STATUS2_ADDR: u64 = BASE + 0x18;
pub const BDA_KEY_BUFFER_HEAD_ADDR: u64 = BASE + 0x1A;
pub const BDA_KEY_BUFFER_TAIL_ADDR: u64 = BASE + 0x1C;
pub const BDA_KEY_BUFFER_ADDR: u64 = BASE + 0x1E;
pub const BDA_FLOPPY_DATA_ADDR: u64 = BASE + 0x3E;
pub const BDA_FLOPPY_TIMEOUT_ADDR: u64 = BASE + 0x40;
pub const BDA_VID_MODE_ADDR: u64 = BASE + 0x49;
pub const BDA_TEXT_COLUMNS_ADDR: u64 = BASE + 0x4A;
pub const BDA_VID_PAGE_SIZE_ADDR: u64 = BASE + 0x4C;
pub const BDA_VID_PAGE_OFFSET_ADDR: u64 = BASE + 0x4E;
/// Eight (column, row) byte pairs, one per text page.
pub const BDA_CURSOR_POSITION_ADDR: u64 = BASE + 0x50;
pub const BDA_CURSOR_END_ADDR: u64 = BASE + 0x60;
pub const BDA_CURSOR_START_ADDR: u64 = BASE + 0x61;
pub const BDA_DISP_PAGE_ADDR: u64 = BASE + 0x62;
pub const BDA_TIMER_COUNTER_ADDR: u64 = BASE + 0x6C;
pub const BDA_TIMER_ROLLOVER_ADDR: u64 = BASE + 0x70;
pub const BDA_NUMBER_OF_DRIVES_ADDR: u64 = BASE + 0x75;
pub const BDA_LPT12_TIMEOUT_ADDR: u64 = BASE + 0x78;
pub const BDA_LPT34_TIMEOUT_ADDR: u64 = BASE + 0x7A;
pub const BDA_COM12_TIMEOUT_ADDR: u64 = BASE + 0x7C;
pub const BDA_COM34_TIMEOUT_ADDR: u64 = BASE + 0x7E;
pub const BDA_KEY_BUFFER_START_ADDR: u64 = BASE + 0x80;
pub const BDA_KEY_BUFFER_END_ADDR: u64 = BASE + 0x82;
pub const BDA_TEXT_ROWS_MINUS_ONE_ADDR: u64 = BASE + 0x84;
pub const BDA_SCAN_LINES_PER_CHAR_ADDR: u64 = BASE + 0x85;
pub const BDA_VIDEO_MODE_OPTIONS_ADDR: u64 = BASE + 0x87;
pub const BDA_VIDEO_DCC_ADDR: u64 = BASE + 0x8A;
pub const BDA_KEYBOARD_STATUS3_ADDR: u64 = BASE + 0x96;
pub const BDA_KEYBOARD_STATUS4_ADDR: u64 = BASE + 0x97;

/// Defaults installed by the SETUP hypercall.
pub fn init_defaults<M: GuestMem>(mem: &mut M, num_drives: u8) -> Result<(), MemError> {
    mem.write_u8(BDA_NUMBER_OF_DRIVES_ADDR, num_drives)?;
    mem.write_u16(BDA_COM1_ADDR, 0x3F8)?;
    mem.write_u16(BDA_MEM_SIZE_ADDR, 640)?;
    mem.write_u8(BDA_TEXT_ROWS_MINUS_ONE_ADDR, 24)?;
    mem.write_u16(BDA_TEXT_COLUMNS_ADDR, 80)?;
    mem.write_u8(BDA_VID_MODE_ADDR, 3)?;
    Ok(())
}

/// Every trap counts as a timer tick for the guest-visible counter.
pub fn bump_timer<M: GuestMem>(mem: &mut M) -> Result<(), MemError> {
    let ticks = mem.read_u32(BDA_TIMER_COUNTER_ADDR)?;
    mem.write_u32(BDA_TIMER_COUNTER_ADDR, ticks.wrapping_add(1))
}

pub fn disp_page<M: GuestMem>(mem: &M) -> u8 {
    mem.read_u8(BDA_DISP_PAGE_ADDR).unwrap_or(0)
}

pub fn set_disp_page<M: GuestMem>(mem: &mut M, page: u8) -> Result<(), MemError> {
    mem.write_u8(BDA_DISP_PAGE_ADDR, page)
}
