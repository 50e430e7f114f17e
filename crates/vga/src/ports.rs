//! Legacy VGA port numbers and register indices.

/// First and last I/O ports decoded by the register model. The embedder
/// registers this whole range with its port-trap table.
pub const VGA_PORT_FIRST: u16 = 0x3B4;
pub const VGA_PORT_LAST: u16 = 0x3DF;

pub const CRTC_IDX_MONO_PORT: u16 = 0x3B4;
pub const CRTC_DATA_MONO_PORT: u16 = 0x3B5;
pub const STS1_MONO_PORT: u16 = 0x3BA;

pub const ATC_IDX_PORT: u16 = 0x3C0;
pub const ATC_DATA_PORT: u16 = 0x3C1;
/// Write: miscellaneous output. Read: input status 0.
pub const MISC_OUTPUT_WR_PORT: u16 = 0x3C2;
pub const SUBSYS_ENABLE_PORT: u16 = 0x3C3;
pub const SEQ_IDX_PORT: u16 = 0x3C4;
pub const SEQ_DATA_PORT: u16 = 0x3C5;
pub const DAC_MASK_PORT: u16 = 0x3C6;
pub const DAC_IDX_RD_PORT: u16 = 0x3C7;
pub const DAC_IDX_WR_PORT: u16 = 0x3C8;
pub const DAC_DATA_PORT: u16 = 0x3C9;
pub const FEATURE_CTRL_RD_PORT: u16 = 0x3CA;
pub const MISC_OUTPUT_RD_PORT: u16 = 0x3CC;
pub const GC_IDX_PORT: u16 = 0x3CE;
pub const GC_DATA_PORT: u16 = 0x3CF;

pub const CRTC_IDX_COLOR_PORT: u16 = 0x3D4;
pub const CRTC_DATA_COLOR_PORT: u16 = 0x3D5;
/// CGA-compatible mode select.
pub const MODE_CTRL_PORT: u16 = 0x3D8;
/// CGA-compatible color select.
pub const COLOR_SELECT_PORT: u16 = 0x3D9;
pub const STS1_COLOR_PORT: u16 = 0x3DA;

// CRTC register indices.
pub const CRTC_HORIZ_TOTAL: u8 = 0x00;
pub const CRTC_HORIZ_DISP_END: u8 = 0x01;
pub const CRTC_START_HORIZ_BLANK: u8 = 0x02;
pub const CRTC_END_HORIZ_BLANK: u8 = 0x03;
pub const CRTC_START_HORIZ_RETRACE: u8 = 0x04;
pub const CRTC_END_HORIZ_RETRACE: u8 = 0x05;
pub const CRTC_VERT_TOTAL: u8 = 0x06;
pub const CRTC_OVERFLOW: u8 = 0x07;
pub const CRTC_PRESET_ROW_SCAN: u8 = 0x08;
pub const CRTC_MAX_SCAN_LINE: u8 = 0x09;
pub const CRTC_CURSOR_START: u8 = 0x0A;
pub const CRTC_CURSOR_END: u8 = 0x0B;
pub const CRTC_START_ADDR_HIGH: u8 = 0x0C;
pub const CRTC_START_ADDR_LOW: u8 = 0x0D;
pub const CRTC_CURSOR_LOC_HIGH: u8 = 0x0E;
pub const CRTC_CURSOR_LOC_LOW: u8 = 0x0F;
pub const CRTC_VERT_RETRACE_START: u8 = 0x10;
pub const CRTC_VERT_RETRACE_END: u8 = 0x11;
pub const CRTC_VERT_DISP_END: u8 = 0x12;
pub const CRTC_OFFSET: u8 = 0x13;
pub const CRTC_UNDERLINE_LOC: u8 = 0x14;
pub const CRTC_START_VERT_BLANK: u8 = 0x15;
pub const CRTC_END_VERT_BLANK: u8 = 0x16;
pub const CRTC_MODE_CONTROL: u8 = 0x17;
pub const CRTC_LINE_COMPARE: u8 = 0x18;

/// Mode-control bit 7: timing enable.
pub const CRTC_MC_TE: u8 = 0x80;

// Sequencer register indices.
pub const SEQ_RESET: u8 = 0x00;
pub const SEQ_CLOCKING_MODE: u8 = 0x01;
pub const SEQ_MAP_MASK: u8 = 0x02;
pub const SEQ_CHAR_MAP_SELECT: u8 = 0x03;
pub const SEQ_MEMORY_MODE: u8 = 0x04;

/// Clocking-mode bit 5: screen off.
pub const SEQ_CM_SO: u8 = 0x20;

// Graphics controller register indices.
pub const GC_SET_RESET: u8 = 0x00;
pub const GC_ENABLE_SET_RESET: u8 = 0x01;
pub const GC_COLOR_COMPARE: u8 = 0x02;
pub const GC_DATA_ROTATE: u8 = 0x03;
pub const GC_READ_MAP_SELECT: u8 = 0x04;
pub const GC_MODE: u8 = 0x05;
pub const GC_MISCELLANEOUS: u8 = 0x06;
pub const GC_COLOR_DONT_CARE: u8 = 0x07;
pub const GC_BIT_MASK: u8 = 0x08;

pub const GC_MODE_C4: u8 = 1 << 2;
pub const GC_MODE_RM: u8 = 1 << 3;
pub const GC_MODE_OE: u8 = 1 << 4;

pub const GC_MISC_MM: u8 = 0x0C;
pub const GC_MISC_MM_SHIFT: u8 = 2;

// Attribute controller.
pub const ATC_IDX_MASK: u8 = 0x1F;
pub const ATC_PALETTE_LAST: u8 = 0x0F;
pub const ATC_MODE_CONTROL: u8 = 0x10;
pub const ATC_OVERSCAN_COLOR: u8 = 0x11;
pub const ATC_COLOR_PLANE_ENABLE: u8 = 0x12;
pub const ATC_HORIZ_PIXEL_PANNING: u8 = 0x13;
pub const ATC_COLOR_SELECT: u8 = 0x14;

// Raster op field of the data-rotate register, pre-shifted as the write
// pipeline consumes it.
pub const GC_OP_REPLACE: u8 = 0x00;
pub const GC_OP_AND: u8 = 0x01;
pub const GC_OP_OR: u8 = 0x02;
pub const GC_OP_XOR: u8 = 0x03;
