//! 指令对象：解码后的语义表示与重新编码
//!
//! `Instruction` 持有 opcode、原始指令字的备份和按指令族区分的语义字段。
//! 生命周期：创建（opcode = UnDecoded）→ `disassemble` 填充 → 调用方修改字段
//! → `assemble` 生成新的指令字。

use std::fmt;

use log::{debug, trace};

use super::add_sub_imm::AddSubImm;
use super::branch::Branch;
use super::decoder::Decoder;
use super::error::{CodecError, CodecResult};
use super::exp_gen::ExceptionGen;
use super::instr_def::OpcodeTable;
use super::opcode::{InstrFamily, Opcode};
use super::pc_rel::PcRelAddr;
use super::system::SystemInstr;

/// 指令族负载的编解码接口
///
/// 每个变体只负责自己认识的 opcode；公共流程（查表、模板、校验）由
/// `Instruction` 完成。
pub trait FieldCodec {
    /// 是否认识该 opcode
    fn handles(opcode: Opcode) -> bool;

    /// 从指令字提取语义字段
    fn decode_fields(&mut self, opcode: Opcode, raw: u32) -> CodecResult<()>;

    /// 重新编码时使用的 opcode（默认沿用解码得到的 opcode）
    fn encode_opcode(&self, decoded: Opcode) -> Opcode {
        decoded
    }

    /// 把语义字段打包进模板
    fn encode_fields(&self, opcode: Opcode, template: u32) -> CodecResult<u32>;
}

/// 指令族标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    /// 只识别 opcode、不提取字段的基础指令
    Generic,
    Branch,
    ExceptionGen,
    System,
    PcRelAddr,
    AddSubImm,
    // 扩展点
    DataProcReg,
    Simd,
    Float,
    LoadStore,
}

impl KindTag {
    /// 解码时限定的查表范围；`None` 表示全表
    pub fn family(self) -> Option<InstrFamily> {
        match self {
            KindTag::Generic => None,
            KindTag::Branch => Some(InstrFamily::Branch),
            KindTag::ExceptionGen | KindTag::System => Some(InstrFamily::System),
            KindTag::PcRelAddr | KindTag::AddSubImm => Some(InstrFamily::DataProcImm),
            KindTag::DataProcReg => Some(InstrFamily::DataProcReg),
            KindTag::Simd => Some(InstrFamily::Simd),
            KindTag::Float => Some(InstrFamily::Float),
            KindTag::LoadStore => Some(InstrFamily::LoadStore),
        }
    }

    /// 尚未实现的指令族
    pub fn is_extension(self) -> bool {
        matches!(
            self,
            KindTag::DataProcReg | KindTag::Simd | KindTag::Float | KindTag::LoadStore
        )
    }

    /// 负责该 opcode 的变体
    pub fn for_opcode(opcode: Opcode) -> KindTag {
        if Branch::handles(opcode) {
            KindTag::Branch
        } else if ExceptionGen::handles(opcode) {
            KindTag::ExceptionGen
        } else if SystemInstr::handles(opcode) {
            KindTag::System
        } else if PcRelAddr::handles(opcode) {
            KindTag::PcRelAddr
        } else if AddSubImm::handles(opcode) {
            KindTag::AddSubImm
        } else {
            KindTag::Generic
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 按指令族区分的语义负载
#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
    Generic,
    Branch(Branch),
    ExceptionGen(ExceptionGen),
    System(SystemInstr),
    PcRelAddr(PcRelAddr),
    AddSubImm(AddSubImm),
    DataProcReg,
    Simd,
    Float,
    LoadStore,
}

impl InstrKind {
    /// 空负载
    pub fn empty(tag: KindTag) -> Self {
        match tag {
            KindTag::Generic => InstrKind::Generic,
            KindTag::Branch => InstrKind::Branch(Branch::default()),
            KindTag::ExceptionGen => InstrKind::ExceptionGen(ExceptionGen::default()),
            KindTag::System => InstrKind::System(SystemInstr::default()),
            KindTag::PcRelAddr => InstrKind::PcRelAddr(PcRelAddr::default()),
            KindTag::AddSubImm => InstrKind::AddSubImm(AddSubImm::default()),
            KindTag::DataProcReg => InstrKind::DataProcReg,
            KindTag::Simd => InstrKind::Simd,
            KindTag::Float => InstrKind::Float,
            KindTag::LoadStore => InstrKind::LoadStore,
        }
    }

    pub fn tag(&self) -> KindTag {
        match self {
            InstrKind::Generic => KindTag::Generic,
            InstrKind::Branch(_) => KindTag::Branch,
            InstrKind::ExceptionGen(_) => KindTag::ExceptionGen,
            InstrKind::System(_) => KindTag::System,
            InstrKind::PcRelAddr(_) => KindTag::PcRelAddr,
            InstrKind::AddSubImm(_) => KindTag::AddSubImm,
            InstrKind::DataProcReg => KindTag::DataProcReg,
            InstrKind::Simd => KindTag::Simd,
            InstrKind::Float => KindTag::Float,
            InstrKind::LoadStore => KindTag::LoadStore,
        }
    }

    fn handles(&self, opcode: Opcode) -> bool {
        match self {
            InstrKind::Branch(_) => Branch::handles(opcode),
            InstrKind::ExceptionGen(_) => ExceptionGen::handles(opcode),
            InstrKind::System(_) => SystemInstr::handles(opcode),
            InstrKind::PcRelAddr(_) => PcRelAddr::handles(opcode),
            InstrKind::AddSubImm(_) => AddSubImm::handles(opcode),
            _ => false,
        }
    }

    fn decode_fields(&mut self, opcode: Opcode, raw: u32) -> CodecResult<()> {
        match self {
            InstrKind::Branch(b) => b.decode_fields(opcode, raw),
            InstrKind::ExceptionGen(e) => e.decode_fields(opcode, raw),
            InstrKind::System(s) => s.decode_fields(opcode, raw),
            InstrKind::PcRelAddr(p) => p.decode_fields(opcode, raw),
            InstrKind::AddSubImm(a) => a.decode_fields(opcode, raw),
            _ => Ok(()),
        }
    }

    fn encode_opcode(&self, decoded: Opcode) -> Opcode {
        match self {
            InstrKind::Branch(b) => b.encode_opcode(decoded),
            InstrKind::ExceptionGen(e) => e.encode_opcode(decoded),
            InstrKind::System(s) => s.encode_opcode(decoded),
            InstrKind::PcRelAddr(p) => p.encode_opcode(decoded),
            InstrKind::AddSubImm(a) => a.encode_opcode(decoded),
            _ => decoded,
        }
    }

    fn encode_fields(&self, opcode: Opcode, template: u32) -> CodecResult<u32> {
        match self {
            InstrKind::Branch(b) => b.encode_fields(opcode, template),
            InstrKind::ExceptionGen(e) => e.encode_fields(opcode, template),
            InstrKind::System(s) => s.encode_fields(opcode, template),
            InstrKind::PcRelAddr(p) => p.encode_fields(opcode, template),
            InstrKind::AddSubImm(a) => a.encode_fields(opcode, template),
            _ => Err(CodecError::UnsupportedAssembly { opcode }),
        }
    }
}

/// 汇编时的数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// 尚未见过任何指令字
    Empty,
    /// 由语义字段重新编码
    Fields,
    /// 原样输出备份的指令字
    Backup,
}

/// 指令对象
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    opcode: Opcode,
    backup: u32,
    source: Source,
    kind: InstrKind,
}

impl Instruction {
    /// 创建指定指令族的空指令
    pub fn new(tag: KindTag) -> Self {
        Self {
            opcode: Opcode::UnDecoded,
            backup: 0,
            source: Source::Empty,
            kind: InstrKind::empty(tag),
        }
    }

    pub fn generic() -> Self {
        Self::new(KindTag::Generic)
    }

    pub fn branch() -> Self {
        Self::new(KindTag::Branch)
    }

    pub fn exception_gen() -> Self {
        Self::new(KindTag::ExceptionGen)
    }

    pub fn system() -> Self {
        Self::new(KindTag::System)
    }

    pub fn pc_rel_addr() -> Self {
        Self::new(KindTag::PcRelAddr)
    }

    pub fn add_sub_imm() -> Self {
        Self::new(KindTag::AddSubImm)
    }

    /// 解码器已知 opcode 时直接构造并提取字段
    pub(crate) fn from_opcode(opcode: Opcode, raw: u32) -> Self {
        let mut instr = Self::new(KindTag::for_opcode(opcode));
        instr.backup = raw;
        instr.source = Source::Backup;
        instr.opcode = opcode;
        if opcode.is_sentinel() || instr.kind.tag() == KindTag::Generic {
            return instr;
        }
        match instr.kind.decode_fields(opcode, raw) {
            Ok(()) => instr.source = Source::Fields,
            Err(err) => debug!("{} fields of {:#010x} not decoded: {}", opcode, raw, err),
        }
        instr
    }

    /// 扩展点：只保存原始指令字，原样输出
    pub(crate) fn passthrough(tag: KindTag, raw: u32) -> Self {
        Self {
            opcode: Opcode::UnDecoded,
            backup: raw,
            source: Source::Backup,
            kind: InstrKind::empty(tag),
        }
    }

    /// 从指令字解码
    ///
    /// - opcode 仍为 `UnDecoded`：在本指令族范围内查表，再提取字段；
    /// - opcode 已确定：只把指令字保存为备份，`assemble` 时原样输出。
    ///
    /// 没有表项匹配时 opcode 置为 `Invalid`；匹配到的 opcode 不属于本指令族时
    /// opcode 保持 `UnDecoded`，调用方可以换一个指令族重试。
    pub fn disassemble(&mut self, decoder: &Decoder<'_>, raw: u32) -> CodecResult<()> {
        if self.opcode != Opcode::UnDecoded {
            self.backup = raw;
            self.source = Source::Backup;
            return Ok(());
        }

        let tag = self.kind.tag();
        if tag.is_extension() {
            trace!("{} is an extension point, keeping {:#010x} verbatim", tag, raw);
            self.backup = raw;
            self.source = Source::Backup;
            return Ok(());
        }

        let opcode = decoder.decode_opcode(raw, tag.family());
        self.backup = raw;

        if opcode == Opcode::Invalid {
            debug!("{:#010x} not recognized as {}", raw, tag);
            self.opcode = Opcode::Invalid;
            self.source = Source::Backup;
            return Err(CodecError::Unrecognized { raw });
        }

        if tag == KindTag::Generic {
            self.opcode = opcode;
            self.source = Source::Backup;
            return Ok(());
        }

        if !self.kind.handles(opcode) {
            debug!("{:#010x} decodes to {}, not handled by {}", raw, opcode, tag);
            return Err(CodecError::FamilyMismatch { opcode, kind: tag });
        }

        self.kind.decode_fields(opcode, raw)?;
        self.opcode = opcode;
        self.source = Source::Fields;
        Ok(())
    }

    /// 重新编码为指令字
    ///
    /// 字段模式下返回 `模板 | 打包后的字段`，并校验结果仍匹配该 opcode；
    /// 备份模式下原样返回备份。
    pub fn assemble(&self, table: &OpcodeTable) -> CodecResult<u32> {
        match self.source {
            Source::Backup => Ok(self.backup),
            Source::Empty => Err(CodecError::UnsupportedAssembly {
                opcode: self.opcode,
            }),
            Source::Fields => {
                let opcode = self.kind.encode_opcode(self.opcode);
                let def = table
                    .lookup(opcode)
                    .ok_or(CodecError::MissingTableEntry { opcode })?;
                let word = self.kind.encode_fields(opcode, def.value)?;
                if !def.matches(word) {
                    return Err(CodecError::TemplateConflict { opcode, word });
                }
                trace!("assembled {} -> {:#010x}", opcode, word);
                Ok(word)
            }
        }
    }

    /// 编码并写入目标槽位；失败时不写
    pub fn assemble_into(&self, table: &OpcodeTable, slot: &mut u32) -> CodecResult<()> {
        *slot = self.assemble(table)?;
        Ok(())
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn is_invalid(&self) -> bool {
        self.opcode == Opcode::Invalid
    }

    /// 最近一次见到的原始指令字
    pub fn backup(&self) -> u32 {
        self.backup
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn kind(&self) -> &InstrKind {
        &self.kind
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn as_branch(&self) -> Option<&Branch> {
        match &self.kind {
            InstrKind::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_branch_mut(&mut self) -> Option<&mut Branch> {
        match &mut self.kind {
            InstrKind::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_exception_gen(&self) -> Option<&ExceptionGen> {
        match &self.kind {
            InstrKind::ExceptionGen(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_exception_gen_mut(&mut self) -> Option<&mut ExceptionGen> {
        match &mut self.kind {
            InstrKind::ExceptionGen(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_system(&self) -> Option<&SystemInstr> {
        match &self.kind {
            InstrKind::System(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_system_mut(&mut self) -> Option<&mut SystemInstr> {
        match &mut self.kind {
            InstrKind::System(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pc_rel_addr(&self) -> Option<&PcRelAddr> {
        match &self.kind {
            InstrKind::PcRelAddr(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pc_rel_addr_mut(&mut self) -> Option<&mut PcRelAddr> {
        match &mut self.kind {
            InstrKind::PcRelAddr(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_add_sub_imm(&self) -> Option<&AddSubImm> {
        match &self.kind {
            InstrKind::AddSubImm(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_add_sub_imm_mut(&mut self) -> Option<&mut AddSubImm> {
        match &mut self.kind {
            InstrKind::AddSubImm(a) => Some(a),
            _ => None,
        }
    }
}

/// 格式化有符号立即数
pub(crate) fn fmt_imm(value: i64) -> String {
    if value < 0 {
        format!("#-{:#x}", value.unsigned_abs())
    } else {
        format!("#{:#x}", value)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source != Source::Fields {
            return match self.opcode {
                Opcode::UnDecoded | Opcode::Invalid => {
                    write!(f, ".inst {:#010x}", self.backup)
                }
                opcode => write!(f, "{} ; {:#010x}", opcode.mnemonic(), self.backup),
            };
        }
        let opcode = self.opcode;
        match &self.kind {
            InstrKind::Branch(b) => b.fmt_asm(opcode, f),
            InstrKind::ExceptionGen(e) => write!(f, "{} #{:#x}", opcode.mnemonic(), e.imm()),
            InstrKind::System(s) => s.fmt_asm(opcode, f),
            InstrKind::PcRelAddr(p) => {
                write!(f, "{} {}, {}", opcode.mnemonic(), p.rd(), fmt_imm(p.offset()))
            }
            InstrKind::AddSubImm(a) => a.fmt_asm(f),
            _ => write!(f, ".inst {:#010x}", self.backup),
        }
    }
}
