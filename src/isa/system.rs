//! 系统寄存器访问：MRS / MSR

use std::fmt;

use super::error::{CodecError, CodecResult};
use super::fields::SysRegFields;
use super::instr::{FieldCodec, KindTag};
use super::opcode::Opcode;
use super::register::{GeneralRegister, RegWidth, SystemRegister};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInstr {
    rt: GeneralRegister,
    system_register: SystemRegister,
}

impl Default for SystemInstr {
    fn default() -> Self {
        Self {
            rt: GeneralRegister::x(0),
            system_register: SystemRegister::default(),
        }
    }
}

impl SystemInstr {
    pub fn rt(&self) -> GeneralRegister {
        self.rt
    }

    pub fn set_rt(&mut self, rt: GeneralRegister) {
        self.rt = rt;
    }

    pub fn system_register(&self) -> SystemRegister {
        self.system_register
    }

    pub fn set_system_register(&mut self, reg: SystemRegister) {
        self.system_register = reg;
    }

    pub(crate) fn fmt_asm(&self, opcode: Opcode, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.system_register;
        match opcode {
            Opcode::Mrs => write!(f, "mrs {}, {}", self.rt, reg),
            // MSR (immediate)：op1/op2 选择 PSTATE 字段，CRm 为立即数
            Opcode::MsrImm => write!(f, "msr pstate_{}_{}, #{:#x}", reg.op1(), reg.op2(), reg.crm()),
            _ => write!(f, "msr {}, {}", reg, self.rt),
        }
    }
}

impl FieldCodec for SystemInstr {
    fn handles(opcode: Opcode) -> bool {
        matches!(opcode, Opcode::Mrs | Opcode::MsrImm | Opcode::MsrReg)
    }

    fn decode_fields(&mut self, opcode: Opcode, raw: u32) -> CodecResult<()> {
        if !Self::handles(opcode) {
            return Err(CodecError::FamilyMismatch {
                opcode,
                kind: KindTag::System,
            });
        }
        let fields = SysRegFields(raw);
        self.rt = GeneralRegister::x(fields.rt());
        self.system_register = SystemRegister::new(fields.sysreg());
        Ok(())
    }

    fn encode_fields(&self, _opcode: Opcode, template: u32) -> CodecResult<u32> {
        let mut fields = SysRegFields(template);
        fields.set_rt(self.rt.expect_width("rt", RegWidth::X)?);
        fields.set_sysreg(self.system_register.value());
        Ok(fields.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // mrs x0, tpidr_el0
    const MRS_TPIDR: u32 = 0xD53BD040;

    #[test]
    fn test_mrs_decode() {
        let mut sys = SystemInstr::default();
        sys.decode_fields(Opcode::Mrs, MRS_TPIDR).unwrap();
        assert_eq!(sys.rt(), GeneralRegister::x(0));
        assert_eq!(sys.system_register(), SystemRegister::TPIDR_EL0);
    }

    #[test]
    fn test_msr_reg_encode() {
        // msr nzcv, x3
        let mut sys = SystemInstr::default();
        sys.set_rt(GeneralRegister::x(3));
        sys.set_system_register(SystemRegister::NZCV);
        assert_eq!(sys.encode_fields(Opcode::MsrReg, 0xD5100000), Ok(0xD51B4203));
    }

    #[test]
    fn test_rt_must_be_x() {
        let mut sys = SystemInstr::default();
        sys.set_rt(GeneralRegister::w(1));
        assert!(matches!(
            sys.encode_fields(Opcode::Mrs, 0xD5300000),
            Err(CodecError::RegisterWidth { .. })
        ));
    }

    #[test]
    fn test_rejects_other_opcodes() {
        let mut sys = SystemInstr::default();
        assert!(sys.decode_fields(Opcode::Svc, 0xD4000001).is_err());
    }
}
