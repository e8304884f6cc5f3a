//! PC 相对寻址：ADR / ADRP

use super::error::{CodecError, CodecResult};
use super::fields::PcRelFields;
use super::instr::{FieldCodec, KindTag};
use super::offset::{OffsetCodec, PAGE_REL, PAGE_SIZE, PC_REL, round_down};
use super::opcode::Opcode;
use super::register::{GeneralRegister, RegWidth};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcRelAddr {
    /// ADRP：偏移以 4KB 页为单位，基址按页对齐
    page_align: bool,
    offset: i64,
    rd: GeneralRegister,
}

impl Default for PcRelAddr {
    fn default() -> Self {
        Self {
            page_align: false,
            offset: 0,
            rd: GeneralRegister::x(0),
        }
    }
}

impl PcRelAddr {
    pub fn is_page_aligned(&self) -> bool {
        self.page_align
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    pub fn rd(&self) -> GeneralRegister {
        self.rd
    }

    pub fn set_rd(&mut self, rd: GeneralRegister) {
        self.rd = rd;
    }

    /// 计算得到的地址
    pub fn target(&self, pc: u64) -> u64 {
        let base = if self.page_align {
            round_down(pc, PAGE_SIZE)
        } else {
            pc
        };
        base.wrapping_add_signed(self.offset)
    }

    fn codec(&self) -> OffsetCodec {
        if self.page_align { PAGE_REL } else { PC_REL }
    }

    fn decode_adr(&mut self, raw: u32) {
        let fields = PcRelFields(raw);
        self.rd = GeneralRegister::x(fields.rd());
        self.offset = self.codec().decode(fields.imm21());
    }
}

impl FieldCodec for PcRelAddr {
    fn handles(opcode: Opcode) -> bool {
        matches!(opcode, Opcode::Adr | Opcode::Adrp)
    }

    fn decode_fields(&mut self, opcode: Opcode, raw: u32) -> CodecResult<()> {
        match opcode {
            Opcode::Adrp => {
                self.page_align = true;
                self.decode_adr(raw);
            }
            Opcode::Adr => {
                self.page_align = false;
                self.decode_adr(raw);
            }
            _ => {
                return Err(CodecError::FamilyMismatch {
                    opcode,
                    kind: KindTag::PcRelAddr,
                });
            }
        }
        Ok(())
    }

    fn encode_fields(&self, opcode: Opcode, template: u32) -> CodecResult<u32> {
        let codec = match opcode {
            Opcode::Adrp => PAGE_REL,
            _ => PC_REL,
        };
        let mut fields = PcRelFields(template);
        fields.set_rd(self.rd.expect_width("rd", RegWidth::X)?);
        fields.set_imm21(codec.encode(self.offset)?);
        Ok(fields.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(opcode: Opcode, raw: u32) -> PcRelAddr {
        let mut p = PcRelAddr::default();
        p.decode_fields(opcode, raw).unwrap();
        p
    }

    #[test]
    fn test_adrp_target() {
        // immlo = 0b01, immhi = 0 -> 1 页
        let p = decoded(Opcode::Adrp, 0xB0000000);
        assert!(p.is_page_aligned());
        assert_eq!(p.offset(), 0x1000);
        assert_eq!(p.target(0x400123), 0x401000);
    }

    #[test]
    fn test_adr_negative() {
        // adr x5, #-0x4：imm21 = 0x1FFFFC
        let p = decoded(Opcode::Adr, 0x10FFFFE5);
        assert!(!p.is_page_aligned());
        assert_eq!(p.rd(), GeneralRegister::x(5));
        assert_eq!(p.offset(), -4);
        assert_eq!(p.target(0x1000), 0xFFC);
        assert_eq!(p.encode_fields(Opcode::Adr, 0x10000000), Ok(0x10FFFFE5));
    }

    #[test]
    fn test_adrp_encode_rejects_partial_page() {
        let mut p = decoded(Opcode::Adrp, 0xB0000000);
        p.set_offset(0x1800);
        assert!(matches!(
            p.encode_fields(Opcode::Adrp, 0x90000000),
            Err(CodecError::Misaligned { .. })
        ));
        p.set_offset(-0x3000);
        p.set_rd(GeneralRegister::x(17));
        // immlo = 0b01, immhi = 0x7FFFF
        assert_eq!(p.encode_fields(Opcode::Adrp, 0x90000000), Ok(0xB0FFFFF1));
    }
}
