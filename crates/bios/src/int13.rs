//! INT 13h disk services.
//!
//! Fixed disks only: DL below 0x80 is failed up front, the unit is the
//! low seven bits. CHS requests are converted to an LBA against the
//! geometry derived at registration; EDD requests carry the LBA
//! directly.

use memory::{GuestMem, MemError};
use tracing::{trace, warn};

use crate::cpu::RealModeRegs;
use crate::{disk_transfer, Bios};

/// AH status codes reported alongside CF.
const STATUS_OK: u8 = 0x00;
const STATUS_NO_DRIVE: u8 = 0x03;
const STATUS_BAD_PARAM: u8 = 0x07;

/// EDD flags word: CHS information is valid.
const EDD_GEOMETRY_VALID: u16 = 0x02;

fn fail(regs: &mut RealModeRegs, status: u8) {
    regs.set_ah(status);
    regs.set_cf(true);
}

fn ok(regs: &mut RealModeRegs) {
    regs.set_ah(STATUS_OK);
    regs.set_cf(false);
}

/// Disk Address Packet at DS:SI, 16 or 24 bytes.
struct DrivePacket {
    struct_size: u8,
    blocks: u16,
    buf_addr: u32,
    lba: u64,
    buf_linear: u64,
}

impl DrivePacket {
    fn read<M: GuestMem>(mem: &M, at: u64) -> Result<Self, MemError> {
        let struct_size = mem.read_u8(at)?;
        let mut packet = Self {
            struct_size,
            blocks: mem.read_u16(at + 2)?,
            buf_addr: mem.read_u32(at + 4)?,
            lba: mem.read_u64(at + 8)?,
            buf_linear: 0,
        };
        if struct_size >= 24 {
            packet.buf_linear = mem.read_u64(at + 16)?;
        }
        Ok(packet)
    }

    /// Transfer address: the 64-bit linear field only when the packet is
    /// the 24-byte form and the segmented address is all-ones, otherwise
    /// the segmented seg:off pair.
    fn transfer_addr(&self) -> u64 {
        if self.struct_size == 24 && self.buf_addr == 0xFFFF_FFFF {
            self.buf_linear
        } else {
            u64::from(self.buf_addr >> 16) * 16 + u64::from(self.buf_addr & 0xFFFF)
        }
    }
}

impl Bios {
    /// Fixed-disk unit for a DL drive number, if registered.
    pub(crate) fn fixed_disk_unit(&self, dl: u8) -> Option<usize> {
        if dl < 0x80 {
            return None;
        }
        let unit = usize::from(dl & 0x7F);
        (unit < self.disks.num_disks()).then_some(unit)
    }

    pub(crate) fn int13<M: GuestMem>(&mut self, regs: &mut RealModeRegs, mem: &mut M) {
        match regs.ah() {
            // RESET, LAST STATUS, VERIFY, FORMAT TRACK, SEEK, DRIVE READY,
            // DETECT CHANGE, TERMINATE CD EMULATION: nothing to do.
            0x00 | 0x01 | 0x04 | 0x05 | 0x0C | 0x10 | 0x16 | 0x4B => ok(regs),
            ah @ (0x02 | 0x03) => self.chs_io(regs, mem, ah == 0x02),
            0x08 => self.drive_params(regs),
            0x15 => self.dasd_type(regs),
            0x41 => {
                // EDD 1.1 installation check.
                regs.set_ah(0x21);
                regs.set_bx(0xAA55);
                regs.set_cx(0x05);
                regs.set_cf(false);
            }
            ah @ (0x42 | 0x43) => self.ext_io(regs, mem, ah == 0x42),
            0x48 => self.ext_drive_params(regs, mem),
            ah => {
                warn!(ah = format_args!("{ah:#04x}"), "unhandled INT 13h subfunction");
                regs.set_cf(true);
            }
        }
    }

    fn chs_io<M: GuestMem>(&mut self, regs: &mut RealModeRegs, mem: &mut M, is_read: bool) {
        let Some(unit) = self.fixed_disk_unit(regs.dl()) else {
            fail(regs, STATUS_NO_DRIVE);
            return;
        };

        let head = u32::from(regs.dh() & 0x3F);
        let cylinder = u32::from(regs.ch()) | ((u32::from(regs.cl()) & 0xC0) << 2);
        let sector = u32::from(regs.cl() & 0x3F);
        let sectors = u32::from(regs.al());
        if sector == 0 {
            fail(regs, STATUS_BAD_PARAM);
            return;
        }

        // The transfer target is ES:BX.
        let addr = u64::from(regs.es) * 16 + u64::from(regs.bx());
        let geometry = match self.disks.get(unit) {
            Ok(disk) => disk.geometry(),
            Err(_) => {
                fail(regs, STATUS_NO_DRIVE);
                return;
            }
        };
        let lba = geometry.lba(cylinder, head, sector);
        trace!(unit, is_read, cylinder, head, sector, sectors, lba, "INT 13h CHS transfer");

        match disk_transfer(&mut self.disks, unit, is_read, lba, sectors, addr, mem) {
            Ok(()) => ok(regs),
            Err(err) => {
                warn!(%err, unit, "INT 13h CHS transfer failed");
                fail(regs, STATUS_BAD_PARAM);
            }
        }
    }

    fn ext_io<M: GuestMem>(&mut self, regs: &mut RealModeRegs, mem: &mut M, is_read: bool) {
        let dap_addr = u64::from(regs.ds) * 16 + u64::from(regs.si());
        let Ok(packet) = DrivePacket::read(mem, dap_addr) else {
            fail(regs, STATUS_BAD_PARAM);
            return;
        };
        if packet.struct_size != 16 && packet.struct_size != 24 {
            fail(regs, STATUS_BAD_PARAM);
            return;
        }
        let Some(unit) = self.fixed_disk_unit(regs.dl()) else {
            fail(regs, STATUS_NO_DRIVE);
            return;
        };

        let addr = packet.transfer_addr();
        trace!(
            unit,
            is_read,
            lba = packet.lba,
            blocks = packet.blocks,
            addr = format_args!("{addr:#x}"),
            "INT 13h EDD transfer"
        );

        match disk_transfer(
            &mut self.disks,
            unit,
            is_read,
            packet.lba,
            u32::from(packet.blocks),
            addr,
            mem,
        ) {
            Ok(()) => ok(regs),
            Err(err) => {
                warn!(%err, unit, "INT 13h EDD transfer failed");
                fail(regs, STATUS_BAD_PARAM);
            }
        }
    }

    fn drive_params(&mut self, regs: &mut RealModeRegs) {
        let Some(unit) = self.fixed_disk_unit(regs.dl()) else {
            fail(regs, STATUS_NO_DRIVE);
            return;
        };
        let Ok(disk) = self.disks.get(unit) else {
            fail(regs, STATUS_NO_DRIVE);
            return;
        };
        let g = disk.geometry();

        let max_cyl = u32::from(g.cylinders) - 1;
        regs.set_ax(0);
        regs.set_ch(max_cyl as u8);
        regs.set_cl((((max_cyl >> 8) as u8 & 0x03) << 6) | (g.sectors_per_track & 0x3F));
        regs.set_dh(g.heads - 1);
        // Number of fixed drives.
        regs.set_dl(1);
        regs.set_bl(0);
        regs.set_cf(false);
    }

    fn ext_drive_params<M: GuestMem>(&mut self, regs: &mut RealModeRegs, mem: &mut M) {
        let Some(unit) = self.fixed_disk_unit(regs.dl()) else {
            fail(regs, STATUS_NO_DRIVE);
            return;
        };
        let at = u64::from(regs.ds) * 16 + u64::from(regs.si());
        let Ok(struct_size) = mem.read_u16(at) else {
            fail(regs, STATUS_BAD_PARAM);
            return;
        };
        if struct_size < 26 {
            fail(regs, STATUS_BAD_PARAM);
            return;
        }

        let Ok(disk) = self.disks.get(unit) else {
            fail(regs, STATUS_NO_DRIVE);
            return;
        };
        let g = disk.geometry();
        let result: Result<(), MemError> = (|| {
            mem.write_u16(at, 0x1A)?;
            mem.write_u16(at + 2, EDD_GEOMETRY_VALID)?;
            mem.write_u32(at + 4, u32::from(g.cylinders))?;
            mem.write_u32(at + 8, u32::from(g.heads))?;
            mem.write_u32(at + 12, u32::from(g.sectors_per_track))?;
            mem.write_u64(at + 16, disk.sectors())?;
            mem.write_u16(at + 24, disk.sector_size() as u16)
        })();
        match result {
            Ok(()) => ok(regs),
            Err(_) => fail(regs, STATUS_BAD_PARAM),
        }
    }

    fn dasd_type(&mut self, regs: &mut RealModeRegs) {
        match self.fixed_disk_unit(regs.dl()) {
            Some(unit) => {
                let sectors = self
                    .disks
                    .get(unit)
                    .map(|disk| disk.sectors())
                    .unwrap_or(0);
                regs.set_cx((sectors >> 16) as u16);
                regs.set_dx(sectors as u16);
                regs.set_ah(STATUS_OK);
            }
            None => regs.set_ah(STATUS_NO_DRIVE),
        }
        regs.set_cf(false);
    }
}
