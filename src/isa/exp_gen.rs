//! 异常生成指令：SVC / HVC / SMC

use super::error::{CodecError, CodecResult};
use super::fields::ExpGenFields;
use super::instr::{FieldCodec, KindTag};
use super::opcode::Opcode;
use super::register::ExceptionLevel;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExceptionGen {
    /// 目标异常级别，由 LL 位决定
    target_level: ExceptionLevel,
    imm: u16,
}

impl ExceptionGen {
    pub fn target_level(&self) -> ExceptionLevel {
        self.target_level
    }

    pub fn imm(&self) -> u16 {
        self.imm
    }

    pub fn set_imm(&mut self, imm: u16) {
        self.imm = imm;
    }

    /// 只能从紧邻的下一级发起：SVC 从 EL0，HVC 从 EL1，SMC 从 EL2
    pub fn is_executable_from(&self, current: ExceptionLevel) -> bool {
        self.target_level.level() - current.level() == 1
    }
}

impl FieldCodec for ExceptionGen {
    fn handles(opcode: Opcode) -> bool {
        matches!(opcode, Opcode::Svc | Opcode::Hvc | Opcode::Smc)
    }

    fn decode_fields(&mut self, opcode: Opcode, raw: u32) -> CodecResult<()> {
        if !Self::handles(opcode) {
            return Err(CodecError::FamilyMismatch {
                opcode,
                kind: KindTag::ExceptionGen,
            });
        }
        let fields = ExpGenFields(raw);
        self.target_level = ExceptionLevel::from_bits(fields.ll());
        self.imm = fields.imm16();
        Ok(())
    }

    fn encode_fields(&self, _opcode: Opcode, template: u32) -> CodecResult<u32> {
        let mut fields = ExpGenFields(template);
        fields.set_imm16(self.imm);
        Ok(fields.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(opcode: Opcode, raw: u32) -> ExceptionGen {
        let mut exp = ExceptionGen::default();
        exp.decode_fields(opcode, raw).unwrap();
        exp
    }

    #[test]
    fn test_svc() {
        // svc #0x80
        let exp = decoded(Opcode::Svc, 0xD4001001);
        assert_eq!(exp.imm(), 0x80);
        assert_eq!(exp.target_level(), ExceptionLevel::El1);
    }

    #[test]
    fn test_target_levels() {
        assert_eq!(decoded(Opcode::Hvc, 0xD4000002).target_level(), ExceptionLevel::El2);
        assert_eq!(decoded(Opcode::Smc, 0xD4000003).target_level(), ExceptionLevel::El3);
    }

    #[test]
    fn test_is_executable_from() {
        let svc = decoded(Opcode::Svc, 0xD4000001);
        assert!(svc.is_executable_from(ExceptionLevel::El0));
        assert!(!svc.is_executable_from(ExceptionLevel::El1));
        assert!(!svc.is_executable_from(ExceptionLevel::El2));

        let smc = decoded(Opcode::Smc, 0xD4000003);
        assert!(smc.is_executable_from(ExceptionLevel::El2));
        // 跨越多级不允许
        assert!(!smc.is_executable_from(ExceptionLevel::El0));
        assert!(!smc.is_executable_from(ExceptionLevel::El3));
    }

    #[test]
    fn test_encode_writes_only_imm() {
        let mut exp = decoded(Opcode::Hvc, 0xD4000002);
        exp.set_imm(0xFFFF);
        assert_eq!(exp.encode_fields(Opcode::Hvc, 0xD4000002), Ok(0xD41FFFE2));
    }
}
