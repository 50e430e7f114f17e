use bios::cmd::{
    CMD_ARGS_ADDR, CMD_COMMAND_ADDR, CMD_DISK_IO, CMD_DISK_PARAMS, CMD_POWER_OFF, CMD_RESULTS_ADDR,
    CMD_SEQ_ADDR, CMD_SETUP, CMD_VIDEO, VIDCMD_VIDMODE, VIDCMD_WRITE_CHAR,
};
use bios::vars::{VARS_EAX_ADDR, VARS_EDX_ADDR, VARS_FLAGS_ADDR};
use bios::{Bios, BiosConfig, Dispatch, Reg, VcpuRegs};
use memdisk::{MemDisk, SECTOR_SIZE_FIXED};
use memory::{GuestMem, GuestRam};
use pretty_assertions::assert_eq;

const LOWMEM: u64 = 64 * 1024 * 1024;

#[derive(Default, Debug)]
struct TestVcpu {
    eax: u32,
    ebx: u32,
    ecx: u32,
    edx: u32,
    esp: u32,
    ebp: u32,
    esi: u32,
    edi: u32,
    eip: u32,
    cs: u32,
    ss: u32,
    ds: u32,
    es: u32,
}

impl VcpuRegs for TestVcpu {
    fn read(&self, reg: Reg) -> u32 {
        match reg {
            Reg::Eax => self.eax,
            Reg::Ebx => self.ebx,
            Reg::Ecx => self.ecx,
            Reg::Edx => self.edx,
            Reg::Esp => self.esp,
            Reg::Ebp => self.ebp,
            Reg::Esi => self.esi,
            Reg::Edi => self.edi,
            Reg::Eip => self.eip,
            Reg::Cs => self.cs,
            Reg::Ss => self.ss,
            Reg::Ds => self.ds,
            Reg::Es => self.es,
        }
    }

    fn write(&mut self, reg: Reg, val: u32) {
        match reg {
            Reg::Eax => self.eax = val,
            Reg::Ebx => self.ebx = val,
            Reg::Ecx => self.ecx = val,
            Reg::Edx => self.edx = val,
            Reg::Esp => self.esp = val,
            Reg::Ebp => self.ebp = val,
            Reg::Esi => self.esi = val,
            Reg::Edi => self.edi = val,
            Reg::Eip => self.eip = val,
            Reg::Cs => self.cs = val,
            Reg::Ss => self.ss = val,
            Reg::Ds => self.ds = val,
            Reg::Es => self.es = val,
        }
    }
}

fn test_font() -> glyphs::Font {
    let mut bytes = vec![0x36, 0x04, 0x00, 0x10];
    for n in 0..256usize {
        for y in 0..16usize {
            bytes.push((n ^ y) as u8);
        }
    }
    glyphs::Font::from_psf1_bytes(&bytes).unwrap()
}

/// 16 MiB disk with a recognizable byte pattern.
fn patterned_disk() -> MemDisk {
    let mut bytes = vec![0u8; 16 * 1024 * 1024];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    MemDisk::from_bytes("hdd.img".into(), bytes, SECTOR_SIZE_FIXED)
}

fn test_bios() -> (Bios, TestVcpu, GuestRam) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut bios = Bios::new(
        BiosConfig {
            lowmem: LOWMEM,
            ..BiosConfig::default()
        },
        test_font(),
    );
    bios.disks_mut().register(patterned_disk()).unwrap();
    (bios, TestVcpu::default(), GuestRam::new(2 * 1024 * 1024))
}

/// Raise the trap the way the ROM stub does: AX/DX/FLAGS shadowed into
/// BIOS-VARS, then a 4-byte OUT with the vector in the high half.
fn raise_int(
    bios: &mut Bios,
    vcpu: &mut TestVcpu,
    ram: &mut GuestRam,
    vector: u16,
    eax: u32,
    edx: u32,
) {
    ram.write_u16(VARS_FLAGS_ADDR, 0x0202).unwrap();
    ram.write_u32(VARS_EAX_ADDR, eax).unwrap();
    ram.write_u32(VARS_EDX_ADDR, edx).unwrap();
    let out = (u32::from(vector) << 16) | (eax & 0xFFFF);
    assert_eq!(bios.io_write(4, out, vcpu, ram), Dispatch::Handled);
}

fn carry(ram: &GuestRam) -> bool {
    ram.read_u16(VARS_FLAGS_ADDR).unwrap() & 1 != 0
}

fn issue_command(bios: &mut Bios, vcpu: &mut TestVcpu, ram: &mut GuestRam, command: u16) -> Dispatch {
    let seq = ram.read_u16(CMD_SEQ_ADDR).unwrap();
    ram.write_u16(CMD_SEQ_ADDR, seq.wrapping_add(1)).unwrap();
    ram.write_u16(CMD_COMMAND_ADDR, command).unwrap();
    ram.write_u32(CMD_RESULTS_ADDR, 0xFFFF_FFFF).unwrap();
    bios.io_write(1, 0, vcpu, ram)
}

fn results(ram: &GuestRam) -> u32 {
    ram.read_u32(CMD_RESULTS_ADDR).unwrap()
}

#[test]
fn setup_installs_bda_defaults_and_e820_block() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_SETUP);
    assert_eq!(results(&ram), 0);

    assert_eq!(ram.read_u16(0x400).unwrap(), 0x3F8); // COM1
    assert_eq!(ram.read_u16(0x413).unwrap(), 640); // conventional KiB
    assert_eq!(ram.read_u8(0x449).unwrap(), 3); // video mode
    assert_eq!(ram.read_u16(0x44A).unwrap(), 80);
    assert_eq!(ram.read_u8(0x475).unwrap(), 1); // drives
    assert_eq!(ram.read_u8(0x484).unwrap(), 24);

    let base = u64::from(pc_constants::E820_INFO_BLOCK);
    assert_eq!(ram.read_u16(base).unwrap(), 4);
    assert_eq!(ram.read_u16(base + 2).unwrap(), 20);
}

// S1: a CHS DISK_IO command resolves the LBA and lands the sector at the
// requested guest address.
#[test]
fn disk_io_chs_reads_boot_sector() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    let a = CMD_ARGS_ADDR;
    ram.write_u32(a, 0).unwrap(); // read
    ram.write_u32(a + 4, 0x80).unwrap();
    ram.write_u32(a + 8, 0).unwrap(); // head
    ram.write_u32(a + 12, 0).unwrap(); // cylinder
    ram.write_u32(a + 16, 1).unwrap(); // sector, 1-based
    ram.write_u32(a + 20, 1).unwrap(); // count
    ram.write_u64(a + 24, u64::MAX).unwrap(); // lba: compute from CHS
    ram.write_u64(a + 32, 0x7C00).unwrap();
    ram.write_u32(a + 40, 0).unwrap();

    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_DISK_IO);
    assert_eq!(results(&ram), 0);

    let got = ram.slice(0x7C00, 512).unwrap();
    let want: Vec<u8> = (0..512).map(|i| (i % 251) as u8).collect();
    assert_eq!(got, &want[..]);
}

#[test]
fn disk_io_rejects_floppy_and_bad_unit() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    let a = CMD_ARGS_ADDR;
    ram.write_u32(a + 4, 0x00).unwrap(); // floppy
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_DISK_IO);
    assert_eq!(results(&ram), 1);

    ram.write_u32(a + 4, 0x85).unwrap(); // unit 5 not registered
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_DISK_IO);
    assert_eq!(results(&ram), 22);
}

#[test]
fn disk_params_reports_geometry() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    ram.write_u32(CMD_ARGS_ADDR, 0x80).unwrap();
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_DISK_PARAMS);
    assert_eq!(results(&ram), 0);

    let a = CMD_ARGS_ADDR;
    assert_eq!(ram.read_u32(a).unwrap(), 1); // number of disks
    assert_eq!(ram.read_u32(a + 4).unwrap(), 16); // heads
    assert_eq!(ram.read_u32(a + 8).unwrap(), 32); // cylinders
    assert_eq!(ram.read_u32(a + 12).unwrap(), 63); // sectors per track
    assert_eq!(ram.read_u64(a + 16).unwrap(), 32768); // total sectors
    assert_eq!(ram.read_u32(a + 24).unwrap(), 512);
}

// S2: EDD read through a 16-byte Disk Address Packet.
#[test]
fn int13_extended_read_uses_dap() {
    let (mut bios, mut vcpu, mut ram) = test_bios();

    let dap = 0x0600u64;
    ram.write_u8(dap, 16).unwrap();
    ram.write_u8(dap + 1, 0).unwrap();
    ram.write_u16(dap + 2, 4).unwrap(); // blocks
    ram.write_u32(dap + 4, 0x0000_7E00).unwrap(); // seg 0000, off 7E00
    ram.write_u64(dap + 8, 128).unwrap(); // lba

    vcpu.ds = 0;
    vcpu.esi = dap as u32;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x4200, 0x80);

    assert!(!carry(&ram));
    assert_eq!(vcpu.eax >> 8 & 0xFF, 0); // AH
    let got = ram.slice(0x7E00, 2048).unwrap();
    let want: Vec<u8> = (128 * 512..128 * 512 + 2048).map(|i| (i % 251) as u8).collect();
    assert_eq!(got, &want[..]);
}

#[test]
fn int13_extended_packet_prefers_segmented_buffer() {
    let (mut bios, mut vcpu, mut ram) = test_bios();

    // 24-byte packet with a valid segmented address AND a linear address:
    // the segmented one wins unless buf_addr is all-ones.
    let dap = 0x0600u64;
    ram.write_u8(dap, 24).unwrap();
    ram.write_u16(dap + 2, 1).unwrap();
    ram.write_u32(dap + 4, 0x0000_7E00).unwrap();
    ram.write_u64(dap + 8, 0).unwrap();
    ram.write_u64(dap + 16, 0x9000).unwrap();

    vcpu.esi = dap as u32;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x4200, 0x80);
    assert!(!carry(&ram));
    assert_eq!(ram.read_u8(0x7E00).unwrap(), 0);
    assert_eq!(ram.read_u8(0x7E01).unwrap(), 1);
    assert_eq!(ram.read_u8(0x9000).unwrap(), 0);

    // All-ones segmented address: now the linear field is used.
    ram.write_u32(dap + 4, 0xFFFF_FFFF).unwrap();
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x4200, 0x80);
    assert!(!carry(&ram));
    assert_eq!(ram.read_u8(0x9000).unwrap(), 0);
    assert_eq!(ram.read_u8(0x9001).unwrap(), 1);
}

#[test]
fn int13_chs_read_and_write_round_trip() {
    let (mut bios, mut vcpu, mut ram) = test_bios();

    // Write sector at cylinder 0, head 1, sector 2 from 0x8000...
    for i in 0..512u64 {
        ram.write_u8(0x8000 + i, 0xA5).unwrap();
    }
    vcpu.es = 0;
    vcpu.ebx = 0x8000;
    vcpu.ecx = 0x0002; // cyl 0, sector 2
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x0301, 0x0180); // AH=3 write, AL=1, DH=1 DL=0x80
    assert!(!carry(&ram));

    // ...and read it back to 0x8400.
    vcpu.ebx = 0x8400;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x0201, 0x0180);
    assert!(!carry(&ram));
    assert_eq!(ram.read_u8(0x8400).unwrap(), 0xA5);
    assert_eq!(ram.read_u8(0x8400 + 511).unwrap(), 0xA5);
}

#[test]
fn int13_rejects_floppy_sector_zero_and_unknown_subfunction() {
    let (mut bios, mut vcpu, mut ram) = test_bios();

    // DL below 0x80: no floppy support.
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x0201, 0x0000);
    assert!(carry(&ram));
    assert_eq!(vcpu.eax >> 8 & 0xFF, 0x03);

    // CHS sector number 0 is invalid.
    vcpu.ecx = 0x0000;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x0201, 0x0080);
    assert!(carry(&ram));
    assert_eq!(vcpu.eax >> 8 & 0xFF, 0x07);

    // Unknown subfunction.
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x6600, 0x0080);
    assert!(carry(&ram));
}

#[test]
fn int13_drive_params_packs_chs_fields() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x0800, 0x0080);
    assert!(!carry(&ram));
    // Geometry 32/16/63: max cylinder 31, max head 15.
    assert_eq!(vcpu.ecx & 0xFFFF, ((31 & 0x300) >> 8 << 6) | 63 | ((31 & 0xFF) << 8));
    assert_eq!(vcpu.edx & 0xFFFF, (15 << 8) | 1);
    assert_eq!(vcpu.ebx & 0xFF, 0);
}

#[test]
fn int13_extensions_check_and_ext_params() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x4100, 0x0080);
    assert!(!carry(&ram));
    assert_eq!(vcpu.eax >> 8 & 0xFF, 0x21);
    assert_eq!(vcpu.ebx & 0xFFFF, 0xAA55);
    assert_eq!(vcpu.ecx & 0xFFFF, 0x05);

    // EXT_DRIVE_PARAMS with a 30-byte caller buffer.
    let buf = 0x0600u64;
    ram.write_u16(buf, 30).unwrap();
    vcpu.ds = 0;
    vcpu.esi = buf as u32;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x4800, 0x0080);
    assert!(!carry(&ram));
    assert_eq!(ram.read_u16(buf).unwrap(), 0x1A);
    assert_eq!(ram.read_u16(buf + 2).unwrap(), 0x02); // geometry valid
    assert_eq!(ram.read_u32(buf + 4).unwrap(), 32);
    assert_eq!(ram.read_u32(buf + 8).unwrap(), 16);
    assert_eq!(ram.read_u32(buf + 12).unwrap(), 63);
    assert_eq!(ram.read_u64(buf + 16).unwrap(), 32768);
    assert_eq!(ram.read_u16(buf + 24).unwrap(), 512);

    // Undersized buffer is a parameter error.
    ram.write_u16(buf, 16).unwrap();
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x4800, 0x0080);
    assert!(carry(&ram));
    assert_eq!(vcpu.eax >> 8 & 0xFF, 0x07);
}

#[test]
fn int13_dasd_type_reports_sector_count() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x1500, 0x0080);
    assert!(!carry(&ram));
    let sectors = (vcpu.ecx & 0xFFFF) << 16 | (vcpu.edx & 0xFFFF);
    assert_eq!(sectors, 32768);

    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x1500, 0x0005);
    assert!(!carry(&ram));
    assert_eq!(vcpu.eax >> 8 & 0xFF, 0x03);
}

// S3: the E820 walk returns the tabled entries and wraps EBX to zero.
#[test]
fn int15_e820_walk_returns_four_entries() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_SETUP);

    let expect = [
        (0x0u64, 0x500u64, 2u32),
        (0x500, 0x9FB00, 1),
        (0xA_0000, 0x6_0000, 2),
        (0x10_0000, LOWMEM - 0x10_0000, 1),
    ];

    let buf = 0x0600u64;
    vcpu.es = 0;
    vcpu.edi = buf as u32;
    let mut continuation = 0u32;
    for (i, &(addr, size, entry_type)) in expect.iter().enumerate() {
        vcpu.ebx = continuation;
        vcpu.ecx = 20;
        raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0xE820, 0x534D_4150);
        assert!(!carry(&ram), "entry {i}");
        assert_eq!(vcpu.eax, 0x534D_4150);
        assert_eq!(vcpu.ecx, 20);
        assert_eq!(ram.read_u64(buf).unwrap(), addr, "entry {i} base");
        assert_eq!(ram.read_u64(buf + 8).unwrap(), size, "entry {i} size");
        assert_eq!(ram.read_u32(buf + 16).unwrap(), entry_type, "entry {i} type");
        continuation = vcpu.ebx;
    }
    assert_eq!(continuation, 0, "EBX wraps to zero after the last entry");
}

#[test]
fn int15_e820_rejects_bad_signature_and_small_buffer() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_SETUP);

    vcpu.ecx = 20;
    vcpu.ebx = 0;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0xE820, 0x1234_5678);
    assert!(carry(&ram));

    vcpu.ecx = 12;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0xE820, 0x534D_4150);
    assert!(carry(&ram));

    vcpu.ecx = 20;
    vcpu.ebx = 4; // past the end
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0xE820, 0x534D_4150);
    assert!(carry(&ram));
}

#[test]
fn int15_a20_gate_services() {
    let (mut bios, mut vcpu, mut ram) = test_bios();

    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0x2400, 0);
    assert!(!carry(&ram));
    assert!(!bios.a20_enabled());

    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0x2402, 0);
    assert_eq!(vcpu.eax & 0xFFFF, 0);

    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0x2401, 0);
    assert!(bios.a20_enabled());

    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0x2403, 0);
    assert_eq!(vcpu.ebx & 0xFFFF, 3);
}

#[test]
fn int15_memory_reports() {
    let (mut bios, mut vcpu, mut ram) = test_bios();

    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0x8800, 0);
    assert!(!carry(&ram));
    assert_eq!(vcpu.eax & 0xFFFF, 8 * 1024);

    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0x8A00, 0);
    assert!(!carry(&ram));
    let kib = (vcpu.edx & 0xFFFF) << 16 | (vcpu.eax & 0xFFFF);
    assert_eq!(u64::from(kib), (LOWMEM - 0x10_0000) / 1024);

    // E8/01 legacy report: 0x3C00 KiB below 16 MiB, the rest above in
    // 64 KiB blocks.
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0xE801, 0);
    assert!(!carry(&ram));
    assert_eq!(vcpu.eax & 0xFFFF, 0x3C00);
    assert_eq!(vcpu.ecx & 0xFFFF, 0x3C00);
    assert_eq!(
        u64::from(vcpu.ebx & 0xFFFF),
        (LOWMEM - 16 * 1024 * 1024) / (64 * 1024)
    );
    assert_eq!(vcpu.ebx & 0xFFFF, vcpu.edx & 0xFFFF);
}

#[test]
fn int15_extended_copy_counts_words_by_default() {
    let (mut bios, mut vcpu, mut ram) = test_bios();

    let gdt = 0x0600u64;
    let src = 0x11_0000u64;
    let dst = 0x12_0000u64;
    ram.write_u32(gdt + 16 + 2, src as u32).unwrap();
    ram.write_u32(gdt + 24 + 2, dst as u32).unwrap();
    for i in 0..16u64 {
        ram.write_u8(src + i, 0xC0 + i as u8).unwrap();
    }

    vcpu.es = 0;
    vcpu.esi = gdt as u32;
    vcpu.ecx = 4; // words
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0x8700, 0);
    assert!(!carry(&ram));
    for i in 0..8u64 {
        assert_eq!(ram.read_u8(dst + i).unwrap(), 0xC0 + i as u8, "byte {i}");
    }
    assert_eq!(ram.read_u8(dst + 8).unwrap(), 0, "copy stops at CX words");
}

#[test]
fn int15_target_mode_detect() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    vcpu.ebx = 2;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0xEC00, 0);
    assert!(!carry(&ram));

    vcpu.ebx = 9;
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x15, 0xEC00, 0);
    assert!(carry(&ram));
}

// S6: an unhandled vector fails cleanly and leaves AX alone.
#[test]
fn unknown_interrupt_vector_sets_carry_only() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x77, 0x1234_5678, 0x9ABC);
    assert!(carry(&ram));
    assert_eq!(vcpu.eax, 0x1234_5678);
    assert_eq!(vcpu.edx, 0x9ABC);
}

#[test]
fn every_trap_ticks_the_bda_timer() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    let timer = bios::bda::BDA_TIMER_COUNTER_ADDR;
    assert_eq!(ram.read_u32(timer).unwrap(), 0);
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x13, 0x0000, 0x0080);
    raise_int(&mut bios, &mut vcpu, &mut ram, 0x77, 0, 0);
    assert_eq!(ram.read_u32(timer).unwrap(), 2);
}

// S4 command path: a VIDEO mode change resizes the framebuffer.
#[test]
fn video_mode_command_switches_and_rejects() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    ram.write_u32(CMD_ARGS_ADDR, VIDCMD_VIDMODE).unwrap();
    ram.write_u8(CMD_ARGS_ADDR + 4, 0x13).unwrap();
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_VIDEO);
    assert_eq!(results(&ram), 0);
    assert_eq!(bios.vga().framebuffer().width(), 320);
    assert_eq!(bios.vga().framebuffer().height(), 200);

    ram.write_u8(CMD_ARGS_ADDR + 4, 0x54).unwrap();
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_VIDEO);
    assert_eq!(results(&ram), 22);
    assert_eq!(bios.vga().mode(), 0x13);
}

#[test]
fn video_write_char_paints_graphics_framebuffer() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    ram.write_u32(CMD_ARGS_ADDR, VIDCMD_VIDMODE).unwrap();
    ram.write_u8(CMD_ARGS_ADDR + 4, 0x13).unwrap();
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_VIDEO);

    ram.write_u32(CMD_ARGS_ADDR, VIDCMD_WRITE_CHAR).unwrap();
    // row 0, col 1, glyph 0xFF, white on black, once.
    ram.write_from(CMD_ARGS_ADDR + 4, &[0, 1, 0xFF, 0x0F])
        .unwrap();
    ram.write_u16(CMD_ARGS_ADDR + 8, 1).unwrap();
    issue_command(&mut bios, &mut vcpu, &mut ram, CMD_VIDEO);
    assert_eq!(results(&ram), 0);

    // Glyph 0xFF scanline 0 is all-foreground in the test font.
    assert_eq!(bios.vga().framebuffer().pixels()[8], 0x00FF_FFFF);
}

#[test]
fn power_off_command_surfaces_to_the_embedder() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    assert_eq!(
        issue_command(&mut bios, &mut vcpu, &mut ram, CMD_POWER_OFF),
        Dispatch::PowerOff
    );
    assert_eq!(results(&ram), 0);
}

#[test]
#[should_panic(expected = "unknown guest command")]
fn unknown_command_is_fatal() {
    let (mut bios, mut vcpu, mut ram) = test_bios();
    issue_command(&mut bios, &mut vcpu, &mut ram, 0x42);
}

#[test]
fn trap_port_reads_return_ff() {
    let (bios, _, _) = test_bios();
    assert_eq!(bios.io_read(), 0xFF);
}
