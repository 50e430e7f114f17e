//! Host side of the guest-BIOS service pair.
//!
//! The 16-bit ROM talks to this crate through a single trap I/O port:
//! a 4-byte OUT dispatches a real-mode interrupt vector (vector number in
//! the high half of EAX, the saved AX in the low half), a 1- or 2-byte
//! OUT dispatches the asynchronous command sitting in the shared command
//! buffer. Everything the handlers touch — the BDA, BIOS-VARS, the E820
//! block, the command buffer, and the transfer targets — lives in guest
//! memory behind the [`memory::GuestMem`] capability; VCPU registers go
//! through the [`VcpuRegs`] seam.
//!
//! One [`Bios`] value is the whole per-VM state: the disk table, the VGA
//! model, the private E820 copy, and the A20 flag. There are no process
//! globals.

use std::time::Duration;

use memdisk::{DiskError, DiskSet};
use memory::{GuestMem, MemError};
use thiserror::Error;
use tracing::{debug, info, warn};
use vga::Vga;

pub mod bda;
pub mod cmd;
pub mod cpu;
pub mod e820;
pub mod vars;

mod int13;
mod int15;

pub use cpu::{Eflags, RealModeRegs, Reg, VcpuRegs};
pub use pc_constants::BIOS_IO_PORT;

/// Longest DISK_IO completion delay the guest may request, microseconds.
const IODELAY_CAP_US: u32 = 100_000;

#[derive(Clone, Copy, Debug)]
pub struct BiosConfig {
    /// Bytes of guest RAM below the PCI hole. Drives the E820 map and the
    /// extended-memory reports.
    pub lowmem: u64,
    /// Interpret the INT 15h/87h CX count as bytes instead of the
    /// historical words.
    pub int15_copy_in_bytes: bool,
}

impl Default for BiosConfig {
    fn default() -> Self {
        Self {
            lowmem: 64 * 1024 * 1024,
            int15_copy_in_bytes: false,
        }
    }
}

/// What the embedding VM should do after a trap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// The guest issued POWER_OFF; tear the VM down.
    PowerOff,
}

#[derive(Debug, Error)]
enum TransferError {
    #[error(transparent)]
    Disk(#[from] DiskError),
    #[error(transparent)]
    Mem(#[from] MemError),
}

impl TransferError {
    fn result_code(&self) -> u32 {
        match self {
            TransferError::Disk(DiskError::Io(_)) => cmd::RESULT_EIO,
            _ => cmd::RESULT_EINVAL,
        }
    }
}

/// Move whole sectors between a registered disk and guest memory.
fn disk_transfer<M: GuestMem>(
    disks: &mut DiskSet,
    unit: usize,
    is_read: bool,
    lba: u64,
    sectors: u32,
    addr: u64,
    mem: &mut M,
) -> Result<(), TransferError> {
    let sector_size = disks.get(unit)?.sector_size();
    let offset = lba
        .checked_mul(u64::from(sector_size))
        .ok_or(DiskError::OutOfRange {
            offset: lba,
            len: 0,
            size: 0,
        })?;
    let len = u64::from(sectors) * u64::from(sector_size);

    if is_read {
        disks.get(unit)?.read(offset, mem.slice_mut(addr, len)?)?;
    } else {
        disks.get_mut(unit)?.write(offset, mem.slice(addr, len)?)?;
    }
    Ok(())
}

pub struct Bios {
    config: BiosConfig,
    disks: DiskSet,
    vga: Vga,
    /// Private copy of the E820 table; the guest-visible block at 0xF5500
    /// is free to be clobbered between walks.
    e820: Vec<e820::E820Entry>,
    a20_enabled: bool,
}

impl Bios {
    pub fn new(config: BiosConfig, font: glyphs::Font) -> Self {
        Self {
            config,
            disks: DiskSet::new(),
            vga: Vga::new(font),
            e820: Vec::new(),
            a20_enabled: true,
        }
    }

    pub fn disks(&self) -> &DiskSet {
        &self.disks
    }

    pub fn disks_mut(&mut self) -> &mut DiskSet {
        &mut self.disks
    }

    pub fn vga(&self) -> &Vga {
        &self.vga
    }

    pub fn vga_mut(&mut self) -> &mut Vga {
        &mut self.vga
    }

    pub fn a20_enabled(&self) -> bool {
        self.a20_enabled
    }

    /// Render a frame for the active display page.
    pub fn render_frame<M: GuestMem>(&mut self, mem: &M) {
        let page = bda::disp_page(mem);
        self.vga.render(mem, page);
    }

    /// Reads from the trap port are not meaningful.
    pub fn io_read(&self) -> u32 {
        0xFF
    }

    /// Service one OUT to the trap port. The transfer width picks the
    /// path: 4 bytes is an INT-vector hypercall, anything narrower is an
    /// async command from the shared buffer.
    pub fn io_write<V: VcpuRegs, M: GuestMem>(
        &mut self,
        width: u8,
        value: u32,
        vcpu: &mut V,
        mem: &mut M,
    ) -> Dispatch {
        if width == 4 {
            self.handle_interrupt(value, vcpu, mem);
            Dispatch::Handled
        } else {
            self.handle_command(mem)
        }
    }

    fn handle_interrupt<V: VcpuRegs, M: GuestMem>(&mut self, eax: u32, vcpu: &mut V, mem: &mut M) {
        let mut regs = match RealModeRegs::load(vcpu, mem) {
            Ok(regs) => regs,
            Err(err) => {
                warn!(%err, "BIOS-VARS not addressable, dropping trap");
                return;
            }
        };
        // The OUT consumed the guest's EDX; put the shadowed value back.
        vcpu.write(Reg::Edx, regs.edx);

        if let Err(err) = bda::bump_timer(mem) {
            warn!(%err, "BDA not addressable");
        }

        let vector = (eax >> 16) & 0xFFFF;
        match vector {
            0x13 => self.int13(&mut regs, mem),
            0x15 => self.int15(&mut regs, mem),
            _ => {
                warn!(vector = format_args!("{vector:#x}"), "unknown interrupt vector");
                regs.set_cf(true);
            }
        }

        // Publish every mutation in one step; the guest resumes with a
        // consistent register file.
        if let Err(err) = regs.store(vcpu, mem) {
            warn!(%err, "failed to store trap results");
        }
    }

    fn handle_command<M: GuestMem>(&mut self, mem: &mut M) -> Dispatch {
        let (seq, command) = match (cmd::seq(mem), cmd::command(mem)) {
            (Ok(seq), Ok(command)) => (seq, command),
            _ => {
                warn!("command buffer not addressable, dropping command");
                return Dispatch::Handled;
            }
        };

        let results = match command {
            cmd::CMD_SETUP => {
                debug!(seq, "SETUP");
                self.setup_shared(mem)
            }
            cmd::CMD_DISK_PARAMS => self.disk_params(mem),
            cmd::CMD_DISK_IO => self.disk_io(mem),
            cmd::CMD_CHANGE_ISO_EJECT => {
                debug!(seq, "CHANGE_ISO_EJECT ignored");
                0
            }
            cmd::CMD_PRINTS => {
                match cmd::args_str(mem) {
                    Ok(text) => info!(target: "guest", "{text}"),
                    Err(err) => warn!(%err, "unreadable PRINTS argument"),
                }
                0
            }
            cmd::CMD_VIDEO => self.video(mem),
            cmd::CMD_DBG_PRINT => {
                match cmd::args_str(mem) {
                    Ok(text) => debug!(target: "guest", "{text}"),
                    Err(err) => warn!(%err, "unreadable DBG_PRINT argument"),
                }
                0
            }
            cmd::CMD_POWER_OFF => {
                info!(seq, "guest requested power off");
                let _ = cmd::set_results(mem, 0);
                return Dispatch::PowerOff;
            }
            other => panic!("unknown guest command {other:#04x}"),
        };

        if let Err(err) = cmd::set_results(mem, results) {
            warn!(%err, "failed to store command results");
        }
        Dispatch::Handled
    }

    /// SETUP hypercall: install the BDA defaults and build the E820 block.
    fn setup_shared<M: GuestMem>(&mut self, mem: &mut M) -> u32 {
        let num_drives = self.disks.num_disks() as u8;
        let map = e820::build_map(self.config.lowmem);
        let populated: Result<(), MemError> = (|| {
            bda::init_defaults(mem, num_drives)?;
            e820::write_block(mem, &map)
        })();
        match populated {
            Ok(()) => {
                self.e820 = map;
                0
            }
            Err(err) => {
                warn!(%err, "SETUP failed");
                cmd::RESULT_EINVAL
            }
        }
    }

    fn disk_params<M: GuestMem>(&mut self, mem: &mut M) -> u32 {
        let Ok(requested) = cmd::DiskParams::requested_disk(mem) else {
            return cmd::RESULT_EINVAL;
        };
        let unit = (requested & 0x7F) as usize;
        if requested < 0x80 || unit >= self.disks.num_disks() {
            return cmd::RESULT_EINVAL;
        }
        let Ok(disk) = self.disks.get(unit) else {
            return cmd::RESULT_EINVAL;
        };
        let g = disk.geometry();
        let params = cmd::DiskParams {
            disk: self.disks.num_disks() as u32,
            heads: u32::from(g.heads),
            cylinders: u32::from(g.cylinders),
            sectors_per_track: u32::from(g.sectors_per_track),
            disk_sectors: disk.sectors(),
            sector_size: disk.sector_size(),
        };
        match params.write(mem) {
            Ok(()) => 0,
            Err(_) => cmd::RESULT_EINVAL,
        }
    }

    fn disk_io<M: GuestMem>(&mut self, mem: &mut M) -> u32 {
        let Ok(io) = cmd::DiskIoCmd::read(mem) else {
            return cmd::RESULT_EINVAL;
        };
        if io.disk < 0x80 {
            // No floppy emulation.
            return 1;
        }
        let unit = (io.disk & 0x7F) as usize;
        let Ok(disk) = self.disks.get(unit) else {
            return cmd::RESULT_EINVAL;
        };

        let lba = if io.lba == cmd::DiskIoCmd::LBA_FROM_CHS {
            if io.sector == 0 {
                return cmd::RESULT_EINVAL;
            }
            let lba = disk.geometry().lba(io.cylinder, io.head, io.sector);
            debug!(lba, "DISK_IO CHS request resolved");
            lba
        } else {
            io.lba
        };

        debug!(
            direction = io.direction,
            disk = io.disk,
            cylinder = io.cylinder,
            head = io.head,
            sector = io.sector,
            sectors = io.sectors,
            lba,
            addr = format_args!("{:#x}", io.addr),
            "DISK_IO"
        );

        let is_read = io.direction == 0;
        if let Err(err) = disk_transfer(&mut self.disks, unit, is_read, lba, io.sectors, io.addr, mem)
        {
            warn!(%err, unit, "DISK_IO transfer failed");
            return err.result_code();
        }

        if io.iodelay_us > 0 && io.iodelay_us <= IODELAY_CAP_US {
            std::thread::sleep(Duration::from_micros(u64::from(io.iodelay_us)));
        }
        0
    }

    fn video<M: GuestMem>(&mut self, mem: &mut M) -> u32 {
        let Ok(display) = cmd::DisplayCmd::read(mem) else {
            return cmd::RESULT_EINVAL;
        };
        match display {
            cmd::DisplayCmd::VidMode { mode, .. } => match self.vga.switch_mode(mode) {
                Ok(()) => 0,
                Err(err) => {
                    warn!(%err, "VIDEO mode change rejected");
                    cmd::RESULT_EINVAL
                }
            },
            cmd::DisplayCmd::DisplayPage(page) => {
                debug!(page, "VIDEO display page");
                match bda::set_disp_page(mem, page as u8) {
                    Ok(()) => 0,
                    Err(_) => cmd::RESULT_EINVAL,
                }
            }
            cmd::DisplayCmd::WriteChar {
                row,
                col,
                ch,
                attrib,
                repeat,
            } => {
                // In text mode the ROM writes 0xB8000 itself; this path
                // only paints glyphs over the graphics framebuffer.
                if self.vga.mode() != 0x03 {
                    self.vga.draw_char(row, col, ch, attrib, repeat);
                }
                0
            }
            cmd::DisplayCmd::SetPalette { paddr, len, vgareg } => {
                self.set_palette(mem, paddr, len, vgareg)
            }
            // Mode-set acknowledgement only.
            cmd::DisplayCmd::Vesa => 0,
            cmd::DisplayCmd::Unknown(vidcmd) => {
                warn!(vidcmd, "unknown VIDEO sub-command");
                cmd::RESULT_EINVAL
            }
        }
    }

    /// Stream `len` palette entries (three 6-bit components each) from
    /// guest memory into the DAC, starting at index `vgareg`.
    fn set_palette<M: GuestMem>(&mut self, mem: &M, paddr: u32, len: u32, vgareg: u16) -> u32 {
        let Ok(entries) = mem.slice(u64::from(paddr), u64::from(len) * 3) else {
            return cmd::RESULT_EINVAL;
        };
        self.vga
            .io_write(vga::ports::DAC_IDX_WR_PORT, 1, u32::from(vgareg) & 0xFF);
        for &component in entries {
            self.vga
                .io_write(vga::ports::DAC_DATA_PORT, 1, u32::from(component));
        }
        0
    }
}
