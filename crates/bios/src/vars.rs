//! BIOS-VARS: the register-exchange slot at 0xF5000.
//!
//! The ROM stub stores AX, DX, and the interrupt frame's FLAGS here
//! before raising the trap, and reloads FLAGS from here on the way out.
//! The host writes only the FLAGS word.

use memory::{GuestMem, MemError};
use pc_constants::BIOS_VARS_ADDR;

const BASE: u64 = BIOS_VARS_ADDR as u64;

pub const VARS_CFG_TBL_ADDR: u64 = BASE;
pub const VARS_FLAGS_ADDR: u64 = BASE + 2;
pub const VARS_EAX_ADDR: u64 = BASE + 4;
pub const VARS_EDX_ADDR: u64 = BASE + 8;
pub const VARS_ESP_ADDR: u64 = BASE + 12;
pub const VARS_SS_ADDR: u64 = BASE + 16;
pub const VARS_DS_ADDR: u64 = BASE + 18;
pub const VARS_ES_ADDR: u64 = BASE + 20;
pub const VARS_GDTR_LIMIT_ADDR: u64 = BASE + 22;
pub const VARS_GDTR_BASE_ADDR: u64 = BASE + 24;

/// Offset of the BIOS configuration table within segment F000, reported
/// by INT 15h/C0h.
pub fn config_tbl_offset<M: GuestMem>(mem: &M) -> Result<u16, MemError> {
    mem.read_u16(VARS_CFG_TBL_ADDR)
}

pub fn flags<M: GuestMem>(mem: &M) -> Result<u16, MemError> {
    mem.read_u16(VARS_FLAGS_ADDR)
}

pub fn set_flags<M: GuestMem>(mem: &mut M, v: u16) -> Result<(), MemError> {
    mem.write_u16(VARS_FLAGS_ADDR, v)
}

pub fn eax<M: GuestMem>(mem: &M) -> Result<u32, MemError> {
    mem.read_u32(VARS_EAX_ADDR)
}

pub fn edx<M: GuestMem>(mem: &M) -> Result<u32, MemError> {
    mem.read_u32(VARS_EDX_ADDR)
}
