//! Opcode 与指令族定义

use std::fmt;

/// A64 opcode 标识
///
/// 每个变体对应一种具体编码；`UnDecoded` 与 `Invalid` 为哨兵值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// 尚未分类
    UnDecoded,
    /// 没有表项匹配
    Invalid,

    // ========== 分支 ==========
    B,
    Bl,
    BCond,
    Cbz32,
    Cbnz32,
    Cbz64,
    Cbnz64,
    Tbz,
    Tbnz,
    Br,
    Blr,
    Ret,

    // ========== 异常生成 / 系统寄存器 ==========
    Svc,
    Hvc,
    Smc,
    Mrs,
    MsrImm,
    MsrReg,

    // ========== 数据处理（立即数）==========
    Adr,
    Adrp,
    AddImm32,
    AddsImm32,
    SubImm32,
    SubsImm32,
    AddImm64,
    AddsImm64,
    SubImm64,
    SubsImm64,
}

impl Opcode {
    /// 除哨兵外的全部 opcode，用于检查指令表是否完整
    pub const ALL: [Opcode; 28] = [
        Opcode::B,
        Opcode::Bl,
        Opcode::BCond,
        Opcode::Cbz32,
        Opcode::Cbnz32,
        Opcode::Cbz64,
        Opcode::Cbnz64,
        Opcode::Tbz,
        Opcode::Tbnz,
        Opcode::Br,
        Opcode::Blr,
        Opcode::Ret,
        Opcode::Svc,
        Opcode::Hvc,
        Opcode::Smc,
        Opcode::Mrs,
        Opcode::MsrImm,
        Opcode::MsrReg,
        Opcode::Adr,
        Opcode::Adrp,
        Opcode::AddImm32,
        Opcode::AddsImm32,
        Opcode::SubImm32,
        Opcode::SubsImm32,
        Opcode::AddImm64,
        Opcode::AddsImm64,
        Opcode::SubImm64,
        Opcode::SubsImm64,
    ];

    /// 是否为哨兵值
    pub fn is_sentinel(self) -> bool {
        matches!(self, Opcode::UnDecoded | Opcode::Invalid)
    }

    /// 小写助记符
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::UnDecoded => "<undecoded>",
            Opcode::Invalid => "<invalid>",
            Opcode::B => "b",
            Opcode::Bl => "bl",
            Opcode::BCond => "b.cond",
            Opcode::Cbz32 | Opcode::Cbz64 => "cbz",
            Opcode::Cbnz32 | Opcode::Cbnz64 => "cbnz",
            Opcode::Tbz => "tbz",
            Opcode::Tbnz => "tbnz",
            Opcode::Br => "br",
            Opcode::Blr => "blr",
            Opcode::Ret => "ret",
            Opcode::Svc => "svc",
            Opcode::Hvc => "hvc",
            Opcode::Smc => "smc",
            Opcode::Mrs => "mrs",
            Opcode::MsrImm | Opcode::MsrReg => "msr",
            Opcode::Adr => "adr",
            Opcode::Adrp => "adrp",
            Opcode::AddImm32 | Opcode::AddImm64 => "add",
            Opcode::AddsImm32 | Opcode::AddsImm64 => "adds",
            Opcode::SubImm32 | Opcode::SubImm64 => "sub",
            Opcode::SubsImm32 | Opcode::SubsImm64 => "subs",
        }
    }

    /// 由 sf/op/S 三个标志位确定 add/sub 立即数 opcode
    pub fn add_sub_imm(is_64bit: bool, is_sub: bool, update_flags: bool) -> Opcode {
        match (is_64bit, is_sub, update_flags) {
            (false, false, false) => Opcode::AddImm32,
            (false, false, true) => Opcode::AddsImm32,
            (false, true, false) => Opcode::SubImm32,
            (false, true, true) => Opcode::SubsImm32,
            (true, false, false) => Opcode::AddImm64,
            (true, false, true) => Opcode::AddsImm64,
            (true, true, false) => Opcode::SubImm64,
            (true, true, true) => Opcode::SubsImm64,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::UnDecoded => write!(f, "UN_DECODED"),
            Opcode::Invalid => write!(f, "INVALID"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// 粗粒度指令族
///
/// 用于限定查表范围，以及选择对应的位域视图。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrFamily {
    /// 分支
    Branch,
    /// 异常生成与系统指令
    System,
    /// 数据处理（立即数）：PC 相对寻址、加减立即数
    DataProcImm,
    /// 数据处理（寄存器），扩展点
    DataProcReg,
    /// Advanced SIMD，扩展点
    Simd,
    /// 浮点，扩展点
    Float,
    /// 访存，扩展点
    LoadStore,
}

impl InstrFamily {
    pub const COUNT: usize = 7;

    /// 用于分桶的下标
    pub fn index(self) -> usize {
        match self {
            InstrFamily::Branch => 0,
            InstrFamily::System => 1,
            InstrFamily::DataProcImm => 2,
            InstrFamily::DataProcReg => 3,
            InstrFamily::Simd => 4,
            InstrFamily::Float => 5,
            InstrFamily::LoadStore => 6,
        }
    }
}

impl fmt::Display for InstrFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrFamily::Branch => "branch",
            InstrFamily::System => "system",
            InstrFamily::DataProcImm => "dp-imm",
            InstrFamily::DataProcReg => "dp-reg",
            InstrFamily::Simd => "simd",
            InstrFamily::Float => "float",
            InstrFamily::LoadStore => "load-store",
        };
        write!(f, "{}", name)
    }
}
