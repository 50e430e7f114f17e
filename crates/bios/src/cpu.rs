//! The register view an interrupt handler works on.
//!
//! The ROM stub shadows AX, DX, and FLAGS into BIOS-VARS before raising
//! the trap (the `OUT` itself consumes AX/DX, and the flags are already
//! on its interrupt frame), so those three come from guest memory while
//! everything else is read from the VCPU. Handlers mutate the shadow
//! only; [`RealModeRegs::store`] publishes the result in one step so the
//! guest never observes a half-updated register file.

use bitflags::bitflags;
use memory::{GuestMem, MemError};

use crate::vars;

bitflags! {
    /// The low 16 bits of EFLAGS, as exchanged through BIOS-VARS.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Eflags: u16 {
        const CF = 1 << 0;
        const PF = 1 << 2;
        const AF = 1 << 4;
        const ZF = 1 << 6;
        const SF = 1 << 7;
        const TF = 1 << 8;
        const IF = 1 << 9;
        const DF = 1 << 10;
        const OF = 1 << 11;
    }
}

/// Registers the host can read and write on the paused VCPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
    Eax,
    Ebx,
    Ecx,
    Edx,
    Esp,
    Ebp,
    Esi,
    Edi,
    Eip,
    Cs,
    Ss,
    Ds,
    Es,
}

/// The hypervisor's VCPU register API. The VCPU is paused for the whole
/// trap, so reads and writes need no further synchronization.
pub trait VcpuRegs {
    fn read(&self, reg: Reg) -> u32;
    fn write(&mut self, reg: Reg, val: u32);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RealModeRegs {
    pub eflags: Eflags,
    pub eax: u32,
    pub ecx: u32,
    pub edx: u32,
    pub ebx: u32,
    pub esp: u32,
    pub ebp: u32,
    pub esi: u32,
    pub edi: u32,
    pub eip: u32,
    pub cs: u16,
    pub ss: u16,
    pub ds: u16,
    pub es: u16,
}

macro_rules! reg16 {
    ($get:ident, $set:ident, $field:ident) => {
        pub fn $get(&self) -> u16 {
            self.$field as u16
        }

        pub fn $set(&mut self, v: u16) {
            self.$field = (self.$field & 0xFFFF_0000) | u32::from(v);
        }
    };
}

macro_rules! reg8 {
    ($get_lo:ident, $set_lo:ident, $get_hi:ident, $set_hi:ident, $field:ident) => {
        pub fn $get_lo(&self) -> u8 {
            self.$field as u8
        }

        pub fn $set_lo(&mut self, v: u8) {
            self.$field = (self.$field & !0xFF) | u32::from(v);
        }

        pub fn $get_hi(&self) -> u8 {
            (self.$field >> 8) as u8
        }

        pub fn $set_hi(&mut self, v: u8) {
            self.$field = (self.$field & !0xFF00) | (u32::from(v) << 8);
        }
    };
}

impl RealModeRegs {
    reg16!(ax, set_ax, eax);
    reg16!(bx, set_bx, ebx);
    reg16!(cx, set_cx, ecx);
    reg16!(dx, set_dx, edx);
    reg16!(si, set_si, esi);
    reg16!(di, set_di, edi);

    reg8!(al, set_al, ah, set_ah, eax);
    reg8!(bl, set_bl, bh, set_bh, ebx);
    reg8!(cl, set_cl, ch, set_ch, ecx);
    reg8!(dl, set_dl, dh, set_dh, edx);

    pub fn cf(&self) -> bool {
        self.eflags.contains(Eflags::CF)
    }

    pub fn set_cf(&mut self, cf: bool) {
        self.eflags.set(Eflags::CF, cf);
    }

    pub fn set_zf(&mut self, zf: bool) {
        self.eflags.set(Eflags::ZF, zf);
    }

    /// Build the shadow for one trap: AX/DX/FLAGS from BIOS-VARS, the
    /// rest from the VCPU.
    pub fn load<V: VcpuRegs, M: GuestMem>(vcpu: &V, mem: &M) -> Result<Self, MemError> {
        Ok(Self {
            eflags: Eflags::from_bits_retain(vars::flags(mem)?),
            eax: vars::eax(mem)?,
            ecx: vcpu.read(Reg::Ecx),
            edx: vars::edx(mem)?,
            ebx: vcpu.read(Reg::Ebx),
            esp: vcpu.read(Reg::Esp),
            ebp: vcpu.read(Reg::Ebp),
            esi: vcpu.read(Reg::Esi),
            edi: vcpu.read(Reg::Edi),
            eip: vcpu.read(Reg::Eip),
            cs: vcpu.read(Reg::Cs) as u16,
            ss: vcpu.read(Reg::Ss) as u16,
            ds: vcpu.read(Reg::Ds) as u16,
            es: vcpu.read(Reg::Es) as u16,
        })
    }

    /// Publish the shadow: general registers to the VCPU, FLAGS back into
    /// BIOS-VARS for the stub's IRET path.
    pub fn store<V: VcpuRegs, M: GuestMem>(
        &self,
        vcpu: &mut V,
        mem: &mut M,
    ) -> Result<(), MemError> {
        vcpu.write(Reg::Eax, self.eax);
        vcpu.write(Reg::Ebx, self.ebx);
        vcpu.write(Reg::Ecx, self.ecx);
        vcpu.write(Reg::Edx, self.edx);
        vcpu.write(Reg::Es, u32::from(self.es));
        vars::set_flags(mem, self.eflags.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_register_accessors_preserve_siblings() {
        let mut regs = RealModeRegs {
            eax: 0xAABB_CCDD,
            ..Default::default()
        };
        assert_eq!(regs.ax(), 0xCCDD);
        assert_eq!(regs.ah(), 0xCC);
        assert_eq!(regs.al(), 0xDD);

        regs.set_ah(0x12);
        assert_eq!(regs.eax, 0xAABB_12DD);
        regs.set_al(0x34);
        assert_eq!(regs.eax, 0xAABB_1234);
        regs.set_ax(0x5678);
        assert_eq!(regs.eax, 0xAABB_5678);
    }

    #[test]
    fn carry_flag_toggles_bit_zero() {
        let mut regs = RealModeRegs::default();
        regs.eflags = Eflags::from_bits_retain(0x0202);
        regs.set_cf(true);
        assert_eq!(regs.eflags.bits(), 0x0203);
        regs.set_cf(false);
        assert_eq!(regs.eflags.bits(), 0x0202);
    }
}
