//! VGA register files and the index/data port protocol.

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::ports::*;
use crate::Vga;

bitflags! {
    /// Sequencer reset register. Rendering requires both bits set.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SeqReset: u8 {
        const ASYNC = 1 << 0;
        const SYNC = 1 << 1;
    }

    /// Input status 1, as returned from 3BA/3DA.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Status1: u8 {
        const DISPLAY_ENABLE = 1 << 0;
        const VRETRACE = 1 << 3;
    }
}

#[derive(Default)]
pub(crate) struct Sequencer {
    pub index: u8,
    pub reset: SeqReset,
    pub clock_mode: u8,
    pub map_mask: u8,
    pub cmap_sel: u8,
    pub mem_mode: u8,
}

#[derive(Default)]
pub(crate) struct Crtc {
    pub index: u8,
    pub mode_ctrl: u8,
    pub horiz_total: u8,
    pub horiz_disp_end: u8,
    pub start_horiz_blank: u8,
    pub end_horiz_blank: u8,
    pub start_horiz_retrace: u8,
    pub end_horiz_retrace: u8,
    pub vert_total: u8,
    pub overflow: u8,
    pub preset_row_scan: u8,
    pub max_scan_line: u8,
    pub cursor_start: u8,
    pub cursor_end: u8,
    pub start_addr_high: u8,
    pub start_addr_low: u8,
    pub cursor_loc_low: u8,
    pub cursor_loc_high: u8,
    pub vert_retrace_start: u8,
    pub vert_retrace_end: u8,
    pub vert_disp_end: u8,
    pub offset: u8,
    pub underline_loc: u8,
    pub start_vert_blank: u8,
    pub end_vert_blank: u8,
    pub line_compare: u8,
}

#[derive(Default)]
pub(crate) struct Graphics {
    pub index: u8,
    pub set_reset: u8,
    pub enable_set_reset: u8,
    pub color_compare: u8,
    /// Low three bits of the data-rotate register.
    pub rotate: u8,
    /// Raster op, already shifted down to 0..=3.
    pub op: u8,
    pub read_map_sel: u8,
    pub mode: u8,
    pub mode_oe: bool,
    pub mode_rm: u8,
    pub mode_wm: u8,
    pub misc: u8,
    /// Memory-map field of the misc register, selects the aperture.
    pub misc_mm: u8,
    pub color_dont_care: u8,
    pub bit_mask: u8,
    pub latches: [u8; 4],
}

#[derive(Default)]
pub(crate) struct Attribute {
    pub flipflop: bool,
    pub index: u8,
    pub palette: [u8; 16],
    pub mode: u8,
    pub overscan_color: u8,
    pub color_plane_enb: u8,
    pub horiz_pixel_panning: u8,
    pub color_select: u8,
}

pub(crate) struct Dac {
    pub mask: u8,
    pub rd_index: u8,
    pub rd_subindex: u8,
    pub wr_index: u8,
    pub wr_subindex: u8,
    pub palette: [u8; 3 * 256],
    pub palette_rgb: [u32; 256],
}

impl Default for Dac {
    fn default() -> Self {
        Self {
            mask: 0xFF,
            rd_index: 0,
            rd_subindex: 0,
            wr_index: 0,
            wr_subindex: 0,
            palette: [0; 3 * 256],
            palette_rgb: [0; 256],
        }
    }
}

/// Expand a 6-bit DAC component to 8 bits by folding the low bit into the
/// two freed positions.
pub(crate) fn expand6(v: u8) -> u8 {
    let v = v & 0x3F;
    (v << 2) | ((v & 1) << 1) | (v & 1)
}

impl Dac {
    pub fn write_data(&mut self, val: u8) {
        let idx = self.wr_index as usize;
        self.palette[3 * idx + self.wr_subindex as usize] = val;
        self.wr_subindex += 1;
        if self.wr_subindex == 3 {
            let r = expand6(self.palette[3 * idx]);
            let g = expand6(self.palette[3 * idx + 1]);
            let b = expand6(self.palette[3 * idx + 2]);
            self.palette_rgb[idx] =
                (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
            self.wr_index = self.wr_index.wrapping_add(1);
            self.wr_subindex = 0;
        }
    }

    pub fn read_data(&mut self) -> u8 {
        let v = self.palette[3 * self.rd_index as usize + self.rd_subindex as usize];
        self.rd_subindex += 1;
        if self.rd_subindex == 3 {
            self.rd_index = self.rd_index.wrapping_add(1);
            self.rd_subindex = 0;
        }
        v
    }
}

impl Vga {
    /// Single-byte port read.
    pub(crate) fn port_read(&mut self, port: u16) -> u8 {
        match port {
            CRTC_IDX_MONO_PORT | CRTC_IDX_COLOR_PORT => self.crtc.index,
            CRTC_DATA_MONO_PORT | CRTC_DATA_COLOR_PORT => match self.crtc.index {
                CRTC_HORIZ_TOTAL => self.crtc.horiz_total,
                CRTC_HORIZ_DISP_END => self.crtc.horiz_disp_end,
                CRTC_START_HORIZ_BLANK => self.crtc.start_horiz_blank,
                CRTC_END_HORIZ_BLANK => self.crtc.end_horiz_blank,
                CRTC_START_HORIZ_RETRACE => self.crtc.start_horiz_retrace,
                CRTC_END_HORIZ_RETRACE => self.crtc.end_horiz_retrace,
                CRTC_VERT_TOTAL => self.crtc.vert_total,
                CRTC_OVERFLOW => self.crtc.overflow,
                CRTC_PRESET_ROW_SCAN => self.crtc.preset_row_scan,
                CRTC_MAX_SCAN_LINE => self.crtc.max_scan_line,
                CRTC_CURSOR_START => self.crtc.cursor_start,
                CRTC_CURSOR_END => self.crtc.cursor_end,
                CRTC_START_ADDR_HIGH => self.crtc.start_addr_high,
                CRTC_START_ADDR_LOW => self.crtc.start_addr_low,
                CRTC_CURSOR_LOC_HIGH => self.crtc.cursor_loc_high,
                CRTC_CURSOR_LOC_LOW => self.crtc.cursor_loc_low,
                CRTC_VERT_RETRACE_START => self.crtc.vert_retrace_start,
                CRTC_VERT_RETRACE_END => self.crtc.vert_retrace_end,
                CRTC_VERT_DISP_END => self.crtc.vert_disp_end,
                CRTC_OFFSET => self.crtc.offset,
                CRTC_UNDERLINE_LOC => self.crtc.underline_loc,
                CRTC_START_VERT_BLANK => self.crtc.start_vert_blank,
                CRTC_END_VERT_BLANK => self.crtc.end_vert_blank,
                CRTC_MODE_CONTROL => self.crtc.mode_ctrl,
                CRTC_LINE_COMPARE => self.crtc.line_compare,
                idx => {
                    warn!(idx, "CRTC read from unimplemented register");
                    0
                }
            },
            ATC_IDX_PORT => self.atc.index,
            ATC_DATA_PORT => match self.atc.index {
                0x00..=ATC_PALETTE_LAST => self.atc.palette[self.atc.index as usize],
                ATC_MODE_CONTROL => self.atc.mode,
                ATC_OVERSCAN_COLOR => self.atc.overscan_color,
                ATC_COLOR_PLANE_ENABLE => self.atc.color_plane_enb,
                ATC_HORIZ_PIXEL_PANNING => self.atc.horiz_pixel_panning,
                ATC_COLOR_SELECT => self.atc.color_select,
                idx => {
                    warn!(idx, "ATC read from unimplemented register");
                    0
                }
            },
            SEQ_IDX_PORT => self.seq.index,
            SEQ_DATA_PORT => match self.seq.index {
                SEQ_RESET => self.seq.reset.bits(),
                SEQ_CLOCKING_MODE => self.seq.clock_mode,
                SEQ_MAP_MASK => self.seq.map_mask,
                SEQ_CHAR_MAP_SELECT => self.seq.cmap_sel,
                SEQ_MEMORY_MODE => self.seq.mem_mode,
                idx => {
                    warn!(idx, "sequencer read from unimplemented register");
                    0
                }
            },
            DAC_MASK_PORT => self.dac.mask,
            DAC_DATA_PORT => self.dac.read_data(),
            GC_IDX_PORT => self.gc.index,
            GC_DATA_PORT => match self.gc.index {
                GC_SET_RESET => self.gc.set_reset,
                GC_ENABLE_SET_RESET => self.gc.enable_set_reset,
                GC_COLOR_COMPARE => self.gc.color_compare,
                GC_DATA_ROTATE => self.gc.rotate | (self.gc.op << 3),
                GC_READ_MAP_SELECT => self.gc.read_map_sel,
                GC_MODE => self.gc.mode,
                GC_MISCELLANEOUS => self.gc.misc,
                GC_COLOR_DONT_CARE => self.gc.color_dont_care,
                GC_BIT_MASK => self.gc.bit_mask,
                idx => {
                    warn!(idx, "GC read from unimplemented register");
                    0
                }
            },
            MISC_OUTPUT_RD_PORT => self.misc_output,
            MISC_OUTPUT_WR_PORT => {
                // Input status 0: no switch sense to report.
                0
            }
            STS1_MONO_PORT | STS1_COLOR_PORT => {
                // Reading status 1 resets the ATC flip-flop. Report the
                // beam as always in retrace with the display enabled so
                // polling guests make progress.
                self.atc.flipflop = false;
                self.status1 = Status1::VRETRACE | Status1::DISPLAY_ENABLE;
                self.status1.bits()
            }
            FEATURE_CTRL_RD_PORT => 0,
            SUBSYS_ENABLE_PORT => 0,
            _ => {
                warn!(port = format_args!("{port:#x}"), "unhandled VGA port read");
                0
            }
        }
    }

    /// Single-byte port write.
    pub(crate) fn port_write(&mut self, port: u16, val: u8) {
        match port {
            CRTC_IDX_MONO_PORT | CRTC_IDX_COLOR_PORT => self.crtc.index = val,
            CRTC_DATA_MONO_PORT | CRTC_DATA_COLOR_PORT => self.crtc_write(val),
            ATC_IDX_PORT => {
                if !self.atc.flipflop {
                    self.atc.index = val & ATC_IDX_MASK;
                } else {
                    self.atc_write(val);
                }
                self.atc.flipflop = !self.atc.flipflop;
            }
            // Data-port writes go nowhere; the ATC is programmed through
            // the flip-flopped index port.
            ATC_DATA_PORT => {}
            SEQ_IDX_PORT => self.seq.index = val & 0x1F,
            SEQ_DATA_PORT => self.seq_write(val),
            DAC_MASK_PORT => self.dac.mask = val,
            DAC_IDX_RD_PORT => {
                self.dac.rd_index = val;
                self.dac.rd_subindex = 0;
            }
            DAC_IDX_WR_PORT => {
                self.dac.wr_index = val;
                self.dac.wr_subindex = 0;
            }
            DAC_DATA_PORT => self.dac.write_data(val),
            GC_IDX_PORT => self.gc.index = val,
            GC_DATA_PORT => self.gc_write(val),
            MISC_OUTPUT_WR_PORT => self.misc_output = val,
            // Feature control writes are accepted and discarded.
            STS1_MONO_PORT | STS1_COLOR_PORT => {}
            MODE_CTRL_PORT => {
                debug!(val = format_args!("{val:#x}"), "CGA mode control");
                self.cga_mode_ctrl = val;
            }
            COLOR_SELECT_PORT => {
                debug!(val = format_args!("{val:#x}"), "CGA color select");
                self.cga_color_select = val;
            }
            _ => {
                warn!(
                    port = format_args!("{port:#x}"),
                    val = format_args!("{val:#x}"),
                    "unhandled VGA port write"
                );
            }
        }
    }

    fn crtc_write(&mut self, val: u8) {
        match self.crtc.index {
            CRTC_HORIZ_TOTAL => self.crtc.horiz_total = val,
            CRTC_HORIZ_DISP_END => self.crtc.horiz_disp_end = val,
            CRTC_START_HORIZ_BLANK => self.crtc.start_horiz_blank = val,
            CRTC_END_HORIZ_BLANK => self.crtc.end_horiz_blank = val,
            CRTC_START_HORIZ_RETRACE => self.crtc.start_horiz_retrace = val,
            CRTC_END_HORIZ_RETRACE => self.crtc.end_horiz_retrace = val,
            CRTC_VERT_TOTAL => self.crtc.vert_total = val,
            CRTC_OVERFLOW => self.crtc.overflow = val,
            CRTC_PRESET_ROW_SCAN => self.crtc.preset_row_scan = val,
            CRTC_MAX_SCAN_LINE => self.crtc.max_scan_line = val,
            CRTC_CURSOR_START => self.crtc.cursor_start = val,
            CRTC_CURSOR_END => self.crtc.cursor_end = val,
            CRTC_START_ADDR_HIGH => self.crtc.start_addr_high = val,
            CRTC_START_ADDR_LOW => self.crtc.start_addr_low = val,
            CRTC_CURSOR_LOC_HIGH => self.crtc.cursor_loc_high = val,
            CRTC_CURSOR_LOC_LOW => self.crtc.cursor_loc_low = val,
            CRTC_VERT_RETRACE_START => self.crtc.vert_retrace_start = val,
            CRTC_VERT_RETRACE_END => self.crtc.vert_retrace_end = val,
            CRTC_VERT_DISP_END => self.crtc.vert_disp_end = val,
            CRTC_OFFSET => self.crtc.offset = val,
            CRTC_UNDERLINE_LOC => self.crtc.underline_loc = val,
            CRTC_START_VERT_BLANK => self.crtc.start_vert_blank = val,
            CRTC_END_VERT_BLANK => self.crtc.end_vert_blank = val,
            CRTC_MODE_CONTROL => self.crtc.mode_ctrl = val,
            CRTC_LINE_COMPARE => self.crtc.line_compare = val,
            idx => warn!(idx, val, "CRTC write to unimplemented register"),
        }
    }

    fn atc_write(&mut self, val: u8) {
        match self.atc.index {
            0x00..=ATC_PALETTE_LAST => {
                self.atc.palette[self.atc.index as usize] = val & 0x3F;
            }
            ATC_MODE_CONTROL => self.atc.mode = val,
            ATC_OVERSCAN_COLOR => self.atc.overscan_color = val,
            ATC_COLOR_PLANE_ENABLE => self.atc.color_plane_enb = val,
            ATC_HORIZ_PIXEL_PANNING => self.atc.horiz_pixel_panning = val,
            ATC_COLOR_SELECT => self.atc.color_select = val,
            idx => warn!(idx, val, "ATC write to unimplemented register"),
        }
    }

    fn seq_write(&mut self, val: u8) {
        match self.seq.index {
            SEQ_RESET => self.seq.reset = SeqReset::from_bits_retain(val),
            SEQ_CLOCKING_MODE => self.seq.clock_mode = val,
            SEQ_MAP_MASK => self.seq.map_mask = val,
            // Character map select: the built-in font is all this model
            // serves, so only the raw register is kept for readback.
            SEQ_CHAR_MAP_SELECT => self.seq.cmap_sel = val,
            // Guests probe chain-4 here; only the GC copy of the bit is
            // load-bearing for the write pipeline.
            SEQ_MEMORY_MODE => self.seq.mem_mode = val,
            idx => warn!(idx, val, "sequencer write to unimplemented register"),
        }
    }

    fn gc_write(&mut self, val: u8) {
        match self.gc.index {
            GC_SET_RESET => self.gc.set_reset = val,
            GC_ENABLE_SET_RESET => self.gc.enable_set_reset = val,
            GC_COLOR_COMPARE => self.gc.color_compare = val,
            GC_DATA_ROTATE => {
                self.gc.rotate = val & 0x07;
                self.gc.op = (val >> 3) & 0x03;
            }
            GC_READ_MAP_SELECT => self.gc.read_map_sel = val & 0x03,
            GC_MODE => {
                self.gc.mode = val;
                assert!(val & GC_MODE_C4 == 0, "chain-4 addressing is not modeled");
                self.gc.mode_oe = val & GC_MODE_OE != 0;
                self.gc.mode_rm = (val & GC_MODE_RM) >> 3;
                self.gc.mode_wm = val & 0x03;
            }
            GC_MISCELLANEOUS => {
                debug!(val, "GC miscellaneous");
                self.gc.misc = val;
                self.gc.misc_mm = (val & GC_MISC_MM) >> GC_MISC_MM_SHIFT;
            }
            GC_COLOR_DONT_CARE => self.gc.color_dont_care = val,
            GC_BIT_MASK => self.gc.bit_mask = val,
            idx => warn!(idx, val, "GC write to unimplemented register"),
        }
    }
}
