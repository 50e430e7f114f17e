//! INT 15h system services: A20 gate, memory reporting (88h/8Ah/E8xx),
//! extended-memory copy, and the stubs legacy boot paths probe.

use std::time::Duration;

use memory::{GuestMem, MemError};
use tracing::{debug, warn};

use crate::cpu::RealModeRegs;
use crate::{e820, vars, Bios};

const SMAP: u32 = 0x534D_4150;

/// Longest busy-wait INT 15h/86h will honor.
const WAIT_CAP_US: u32 = 2_000_000;
/// Waits at or below this are absorbed by trap latency alone.
const WAIT_MIN_US: u32 = 50_000;

impl Bios {
    pub(crate) fn int15<M: GuestMem>(&mut self, regs: &mut RealModeRegs, mem: &mut M) {
        match regs.ah() {
            0x00 => {
                // System-configuration parameters: not supported.
                regs.set_ah(0x86);
                regs.set_cf(true);
            }
            0x24 => self.a20_gate(regs),
            0x41 => regs.set_cf(true),
            0x53 => match regs.al() {
                0x00 => {
                    // APM installation check: APM not present.
                    regs.set_ah(0x86);
                    regs.set_cf(true);
                }
                0x04 => {
                    // APM disconnect: interface not connected.
                    regs.set_ax(0x0003);
                    regs.set_cf(true);
                }
                _ => {}
            },
            0x86 => {
                // Busy-sleep for CX:DX microseconds.
                let us = (u32::from(regs.cx()) << 16 | u32::from(regs.dx())).min(WAIT_CAP_US);
                if us > WAIT_MIN_US {
                    std::thread::sleep(Duration::from_micros(u64::from(us)));
                }
                regs.set_ah(0);
                regs.set_cf(false);
            }
            0x87 => self.copy_extended(regs, mem),
            0x88 => {
                // Legacy constant: 8 MiB of extended memory at 1 MiB.
                regs.set_ax(8 * 1024);
                regs.set_cf(false);
            }
            0x8A => {
                let ext_kib = (self.config.lowmem - 0x10_0000) / 1024;
                regs.set_ax(ext_kib as u16);
                regs.set_dx((ext_kib >> 16) as u16);
                regs.set_cf(false);
            }
            0xC0 => {
                // ES:BX points at the BIOS configuration table in the ROM
                // segment.
                regs.eax &= 0xFF;
                regs.es = 0xF000;
                regs.set_bx(vars::config_tbl_offset(mem).unwrap_or(0));
                regs.set_cf(false);
                debug!(bx = regs.bx(), "INT 15h/C0h configuration table");
            }
            0xE8 => match regs.al() {
                0x20 => self.e820_walk(regs, mem),
                0x01 => {
                    // Legacy contiguous memory report: 15 MiB below 16 MiB,
                    // the rest in 64 KiB blocks above.
                    let above_16m = self.config.lowmem.saturating_sub(16 * 1024 * 1024);
                    let blocks = (above_16m / (64 * 1024)).min(0xFFFF) as u16;
                    regs.set_ax(0x3C00);
                    regs.set_cx(0x3C00);
                    regs.set_bx(blocks);
                    regs.set_dx(blocks);
                    regs.set_cf(false);
                }
                al => {
                    warn!(al, "unhandled INT 15h/E8h subfunction");
                    regs.set_ax(0);
                    regs.set_cf(true);
                }
            },
            0xEC => {
                // Target-mode detection.
                regs.set_cf(!(regs.al() == 0 && regs.bl() <= 3));
                regs.set_ah(0);
            }
            ah => {
                warn!(ah = format_args!("{ah:#04x}"), "unhandled INT 15h subfunction");
                regs.set_cf(true);
            }
        }
    }

    fn a20_gate(&mut self, regs: &mut RealModeRegs) {
        match regs.al() {
            0x00 => {
                self.a20_enabled = false;
                regs.set_ah(0);
            }
            0x01 => {
                self.a20_enabled = true;
                regs.set_ah(0);
            }
            0x02 => {
                regs.set_ax(u16::from(self.a20_enabled));
            }
            0x03 => {
                // Both keyboard-controller and fast gate supported.
                regs.set_ax(0);
                regs.set_bx(3);
            }
            al => debug!(al, "unknown A20 subfunction"),
        }
        regs.set_cf(false);
    }

    /// INT 15h/87h: copy between regions described by the source and
    /// destination descriptors (entries 2 and 3) of a GDT at ES:SI.
    fn copy_extended<M: GuestMem>(&mut self, regs: &mut RealModeRegs, mem: &mut M) {
        let gdt = u64::from(regs.es) * 16 + u64::from(regs.si());
        let count = u64::from(regs.cx());
        // The historical interface counts words; the bytes interpretation
        // is kept available for guests written against lax BIOSes.
        let len = if self.config.int15_copy_in_bytes {
            count
        } else {
            count * 2
        };

        let result: Result<(), MemError> = (|| {
            let src = u64::from(mem.read_u32(gdt + 2 * 8 + 2)? & 0xFF_FFFF);
            let dst = u64::from(mem.read_u32(gdt + 3 * 8 + 2)? & 0xFF_FFFF);
            debug!(src = format_args!("{src:#x}"), dst = format_args!("{dst:#x}"), len, "INT 15h/87h copy");
            let data = mem.slice(src, len)?.to_vec();
            mem.write_from(dst, &data)
        })();
        match result {
            Ok(()) => {
                regs.set_ah(0);
                regs.set_cf(false);
            }
            Err(err) => {
                warn!(%err, "INT 15h/87h copy failed");
                regs.set_ah(0x07);
                regs.set_cf(true);
            }
        }
    }

    fn e820_walk<M: GuestMem>(&mut self, regs: &mut RealModeRegs, mem: &mut M) {
        let n_entries = self.e820.len() as u32;
        let continuation = regs.ebx & 0xFFFF;
        if regs.edx != SMAP || u32::from(regs.cx()) < u32::from(e820::E820_ENTRY_SIZE) || continuation >= n_entries
        {
            warn!(
                eax = format_args!("{:#x}", regs.eax),
                edx = format_args!("{:#x}", regs.edx),
                cx = regs.cx(),
                ebx = regs.ebx,
                "rejected INT 15h/E820 request"
            );
            regs.eax &= 0xFFFF_0000;
            regs.set_cf(true);
            return;
        }

        let dst = u64::from(regs.es) * 16 + u64::from(regs.di());
        let entry = self.e820[continuation as usize];
        if entry.write(mem, dst).is_err() {
            regs.eax &= 0xFFFF_0000;
            regs.set_cf(true);
            return;
        }

        regs.eax = SMAP;
        regs.ebx = (continuation + 1) % n_entries;
        regs.ecx = u32::from(e820::E820_ENTRY_SIZE);
        regs.edx = 0;
        regs.set_cf(false);
    }
}
