//! The planar memory pipeline: aperture decode, latches, and the
//! write-mode/raster-op byte math.

use tracing::warn;

use crate::ports::{GC_OP_AND, GC_OP_OR, GC_OP_REPLACE, GC_OP_XOR};
use crate::{Vga, PLANE_SIZE};

impl Vga {
    /// Decode a guest physical address against the aperture selected by
    /// the GC memory-map field.
    ///
    /// The monochrome text window (mm == 2) is never programmed by the
    /// ROM; hitting it is a programming error, not guest misbehavior.
    fn aperture_offset(&self, addr: u64) -> usize {
        let addr = addr as usize;
        match self.gc.misc_mm {
            0 => (addr.wrapping_sub(0xA_0000)) & (128 * 1024 - 1),
            1 => (addr.wrapping_sub(0xA_0000)) & (64 * 1024 - 1),
            2 => panic!("monochrome text aperture is not supported"),
            3 => (addr.wrapping_sub(0xB_8000)) & (32 * 1024 - 1),
            mm => unreachable!("memory-map field is two bits wide: {mm}"),
        }
    }

    fn fill_latches(&mut self, offset: usize) {
        for p in 0..4 {
            self.gc.latches[p] = self.planes[p][offset % PLANE_SIZE];
        }
    }

    /// One byte load from the trapped aperture. Refills the latches as a
    /// side effect; the next store consumes them.
    pub fn mem_read(&mut self, addr: u64) -> u8 {
        let mut offset = self.aperture_offset(addr);
        self.fill_latches(offset);

        if self.gc.mode_rm != 0 {
            // Read mode 1 (color compare) is never programmed by the ROM.
            warn!("VGA read mode 1 not modeled, serving read mode 0");
        }

        let mut map_sel = self.gc.read_map_sel as usize;
        if self.gc.mode_oe {
            map_sel |= offset & 1;
            offset &= !1;
        }
        self.planes[map_sel & 3][offset % PLANE_SIZE]
    }

    /// One byte store into the trapped aperture through the write
    /// pipeline. Latches must have been filled by the preceding load.
    pub fn mem_write(&mut self, addr: u64, val: u8) {
        let offset = self.aperture_offset(addr);
        let bytes = self.write_pipeline(val);
        let mask = self.seq.map_mask;

        if self.gc.mode_oe {
            // Odd/even: address bit 0 picks the plane pair.
            let base = offset & !1;
            let planes: [usize; 2] = if offset & 1 != 0 { [1, 3] } else { [0, 2] };
            for p in planes {
                if mask & (1 << p) != 0 {
                    self.planes[p][base % PLANE_SIZE] = bytes[p];
                }
            }
        } else {
            for p in 0..4 {
                if mask & (1 << p) != 0 {
                    self.planes[p][offset % PLANE_SIZE] = bytes[p];
                }
            }
        }
    }

    /// Wide accesses are byte-serialized, matching how the hardware sees
    /// back-to-back CPU cycles.
    pub fn mem_read_wide(&mut self, addr: u64, size: u8) -> u64 {
        let mut val = 0u64;
        for i in 0..u64::from(size) {
            val |= u64::from(self.mem_read(addr + i)) << (8 * i);
        }
        val
    }

    pub fn mem_write_wide(&mut self, addr: u64, size: u8, val: u64) {
        for i in 0..u64::from(size) {
            self.mem_write(addr + i, (val >> (8 * i)) as u8);
        }
    }

    /// Compute the four per-plane bytes for a store, from the
    /// (write-mode, op, set/reset, enable-set/reset, rotate, bit-mask)
    /// tuple and the current latches.
    fn write_pipeline(&self, val: u8) -> [u8; 4] {
        let gc = &self.gc;
        let mut out = [0u8; 4];

        match gc.mode_wm {
            0 => {
                let mask = gc.bit_mask;
                let val = val.rotate_right(u32::from(gc.rotate));
                for (p, out) in out.iter_mut().enumerate() {
                    let sr = gc.set_reset & (1 << p) != 0;
                    let esr = gc.enable_set_reset & (1 << p) != 0;
                    let latch = gc.latches[p];
                    *out = match gc.op {
                        GC_OP_REPLACE => {
                            let m = if sr { mask } else { 0x00 };
                            let c = if esr { latch & !mask } else { val & mask };
                            c | m
                        }
                        GC_OP_AND => {
                            let m = if sr { 0xFF } else { !mask };
                            if esr {
                                latch & m
                            } else {
                                val & m
                            }
                        }
                        GC_OP_OR => {
                            let m = if sr { mask } else { 0x00 };
                            if esr {
                                latch | m
                            } else {
                                val | m
                            }
                        }
                        GC_OP_XOR => {
                            let m = if sr { mask } else { 0x00 };
                            if esr {
                                latch ^ m
                            } else {
                                val ^ m
                            }
                        }
                        op => unreachable!("raster op field is two bits wide: {op}"),
                    };
                }
            }
            // Write mode 1: latches pass through unchanged.
            1 => out = gc.latches,
            2 => {
                let mask = gc.bit_mask;
                for (p, out) in out.iter_mut().enumerate() {
                    let src = if val & (1 << p) != 0 { 0xFF } else { 0x00 };
                    let latch = gc.latches[p];
                    *out = match gc.op {
                        GC_OP_REPLACE => (latch & !mask) | (src & mask),
                        GC_OP_AND => latch & (src | !mask),
                        GC_OP_OR => latch | (src & mask),
                        GC_OP_XOR => latch ^ (src & mask),
                        op => unreachable!("raster op field is two bits wide: {op}"),
                    };
                }
            }
            3 => {
                // The store value narrows the bit mask; set/reset supplies
                // the color.
                let mask = gc.bit_mask & val;
                for (p, out) in out.iter_mut().enumerate() {
                    let src = if gc.set_reset & (1 << p) != 0 { 0xFF } else { 0x00 };
                    let latch = gc.latches[p];
                    *out = match gc.op {
                        GC_OP_REPLACE => (latch & !mask) | (src & mask),
                        GC_OP_AND => latch & (src | !mask),
                        GC_OP_OR => latch | (src & mask),
                        GC_OP_XOR => latch ^ (src & mask),
                        op => unreachable!("raster op field is two bits wide: {op}"),
                    };
                }
            }
            wm => unreachable!("write mode field is two bits wide: {wm}"),
        }
        out
    }
}
