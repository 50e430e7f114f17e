//! The guest-to-host command buffer at 0xF6000 and the wire records
//! carried in its argument area.
//!
//! Ownership discipline: the guest writes `seq`, `command`, and `args`;
//! the host writes only `results`. The layouts below are byte-exact and
//! little-endian; they are decoded field by field rather than mapped as
//! packed structs.

use memory::{GuestMem, MemError};
use pc_constants::{BIOS_CMDS_ADDR, BIOS_CMDS_END};

const BASE: u64 = BIOS_CMDS_ADDR as u64;

pub const CMD_SEQ_ADDR: u64 = BASE;
pub const CMD_COMMAND_ADDR: u64 = BASE + 2;
pub const CMD_RESULTS_ADDR: u64 = BASE + 4;
pub const CMD_ARGS_ADDR: u64 = BASE + 8;

// Command codes.
pub const CMD_SETUP: u16 = 0x01;
pub const CMD_DISK_PARAMS: u16 = 0x02;
pub const CMD_DISK_IO: u16 = 0x03;
pub const CMD_CHANGE_ISO_EJECT: u16 = 0x04;
pub const CMD_PRINTS: u16 = 0x05;
pub const CMD_VIDEO: u16 = 0x06;
pub const CMD_DBG_PRINT: u16 = 0xFE;
pub const CMD_POWER_OFF: u16 = 0xFF;

/// Positive error code stored in `results` for rejected arguments.
pub const RESULT_EINVAL: u32 = 22;
/// Positive error code stored in `results` for failed transfers.
pub const RESULT_EIO: u32 = 5;

pub fn seq<M: GuestMem>(mem: &M) -> Result<u16, MemError> {
    mem.read_u16(CMD_SEQ_ADDR)
}

pub fn command<M: GuestMem>(mem: &M) -> Result<u16, MemError> {
    mem.read_u16(CMD_COMMAND_ADDR)
}

pub fn set_results<M: GuestMem>(mem: &mut M, results: u32) -> Result<(), MemError> {
    mem.write_u32(CMD_RESULTS_ADDR, results)
}

/// NUL-terminated string in the argument area, bounded by the end of the
/// command page.
pub fn args_str<M: GuestMem>(mem: &M) -> Result<String, MemError> {
    let bytes = mem.slice(CMD_ARGS_ADDR, u64::from(BIOS_CMDS_END) - CMD_ARGS_ADDR)?;
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
}

/// Disk transfer request, `args` layout of the DISK_IO command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskIoCmd {
    pub direction: u32,
    pub disk: u32,
    pub head: u32,
    pub cylinder: u32,
    pub sector: u32,
    pub sectors: u32,
    /// All-ones means "compute from the CHS fields".
    pub lba: u64,
    pub addr: u64,
    pub iodelay_us: u32,
}

impl DiskIoCmd {
    pub const LBA_FROM_CHS: u64 = u64::MAX;

    pub fn read<M: GuestMem>(mem: &M) -> Result<Self, MemError> {
        let a = CMD_ARGS_ADDR;
        Ok(Self {
            direction: mem.read_u32(a)?,
            disk: mem.read_u32(a + 4)?,
            head: mem.read_u32(a + 8)?,
            cylinder: mem.read_u32(a + 12)?,
            sector: mem.read_u32(a + 16)?,
            sectors: mem.read_u32(a + 20)?,
            lba: mem.read_u64(a + 24)?,
            addr: mem.read_u64(a + 32)?,
            iodelay_us: mem.read_u32(a + 40)?,
        })
    }
}

/// Geometry report, `args` layout of the DISK_PARAMS command. The guest
/// pre-loads `disk`; the host overwrites the record in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskParams {
    pub disk: u32,
    pub heads: u32,
    pub cylinders: u32,
    pub sectors_per_track: u32,
    pub disk_sectors: u64,
    pub sector_size: u32,
}

impl DiskParams {
    pub fn requested_disk<M: GuestMem>(mem: &M) -> Result<u32, MemError> {
        mem.read_u32(CMD_ARGS_ADDR)
    }

    pub fn write<M: GuestMem>(&self, mem: &mut M) -> Result<(), MemError> {
        let a = CMD_ARGS_ADDR;
        mem.write_u32(a, self.disk)?;
        mem.write_u32(a + 4, self.heads)?;
        mem.write_u32(a + 8, self.cylinders)?;
        mem.write_u32(a + 12, self.sectors_per_track)?;
        mem.write_u64(a + 16, self.disk_sectors)?;
        mem.write_u32(a + 24, self.sector_size)
    }
}

// VIDEO sub-command selectors.
pub const VIDCMD_VIDMODE: u32 = 0x01;
pub const VIDCMD_DISPLAY_PAGE: u32 = 0x02;
pub const VIDCMD_WRITE_CHAR: u32 = 0x03;
pub const VIDCMD_SET_PALETTE: u32 = 0x04;
pub const VIDCMD_VESA: u32 = 0x05;

/// Tagged union carried by the VIDEO command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayCmd {
    VidMode {
        mode: u8,
        plane: u8,
        rows: u8,
        columns: u8,
    },
    DisplayPage(u32),
    WriteChar {
        row: u8,
        col: u8,
        ch: u8,
        attrib: u8,
        repeat: u16,
    },
    SetPalette {
        paddr: u32,
        len: u32,
        vgareg: u16,
    },
    Vesa,
    Unknown(u32),
}

impl DisplayCmd {
    pub fn read<M: GuestMem>(mem: &M) -> Result<Self, MemError> {
        let a = CMD_ARGS_ADDR;
        let body = a + 4;
        Ok(match mem.read_u32(a)? {
            VIDCMD_VIDMODE => DisplayCmd::VidMode {
                mode: mem.read_u8(body)?,
                plane: mem.read_u8(body + 1)?,
                rows: mem.read_u8(body + 2)?,
                columns: mem.read_u8(body + 3)?,
            },
            VIDCMD_DISPLAY_PAGE => DisplayCmd::DisplayPage(mem.read_u32(body)?),
            VIDCMD_WRITE_CHAR => DisplayCmd::WriteChar {
                row: mem.read_u8(body)?,
                col: mem.read_u8(body + 1)?,
                ch: mem.read_u8(body + 2)?,
                attrib: mem.read_u8(body + 3)?,
                repeat: mem.read_u16(body + 4)?,
            },
            VIDCMD_SET_PALETTE => DisplayCmd::SetPalette {
                paddr: mem.read_u32(body)?,
                len: mem.read_u32(body + 4)?,
                vgareg: mem.read_u16(body + 8)?,
            },
            VIDCMD_VESA => DisplayCmd::Vesa,
            other => DisplayCmd::Unknown(other),
        })
    }
}
