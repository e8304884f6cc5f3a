//! 寄存器与枚举类操作数

use std::fmt;

use super::error::{CodecError, CodecResult};

/// 通用寄存器位宽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegWidth {
    /// 32 位（W 寄存器）
    W,
    /// 64 位（X 寄存器）
    X,
}

impl RegWidth {
    pub fn from_sf(sf: bool) -> Self {
        if sf { RegWidth::X } else { RegWidth::W }
    }

    pub fn bits(self) -> u32 {
        match self {
            RegWidth::W => 32,
            RegWidth::X => 64,
        }
    }
}

impl fmt::Display for RegWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegWidth::W => write!(f, "W"),
            RegWidth::X => write!(f, "X"),
        }
    }
}

/// 带位宽的通用寄存器引用
///
/// 编号 31 依上下文表示 ZR 或 SP；相等性同时比较编号与位宽。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeneralRegister {
    index: u8,
    width: RegWidth,
}

impl GeneralRegister {
    /// 编号 31
    pub const ZR_SP: u8 = 31;
    /// 链接寄存器
    pub const LR: GeneralRegister = GeneralRegister::x(30);

    /// 创建寄存器，编号越界时报错
    pub fn new(index: u8, width: RegWidth) -> CodecResult<Self> {
        if index > Self::ZR_SP {
            return Err(CodecError::InvalidRegister { index });
        }
        Ok(Self { index, width })
    }

    /// X 寄存器；编号取低 5 位，用于从字段直接构造
    pub const fn x(index: u8) -> Self {
        Self {
            index: index & 0x1F,
            width: RegWidth::X,
        }
    }

    /// W 寄存器；编号取低 5 位
    pub const fn w(index: u8) -> Self {
        Self {
            index: index & 0x1F,
            width: RegWidth::W,
        }
    }

    pub fn with_width(index: u8, width: RegWidth) -> Self {
        match width {
            RegWidth::X => Self::x(index),
            RegWidth::W => Self::w(index),
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn width(&self) -> RegWidth {
        self.width
    }

    pub fn is_64bit(&self) -> bool {
        self.width == RegWidth::X
    }

    /// 同编号、换位宽
    pub fn retag(self, width: RegWidth) -> Self {
        Self { width, ..self }
    }

    /// 要求位宽一致
    pub fn expect_width(&self, field: &'static str, expected: RegWidth) -> CodecResult<u8> {
        if self.width != expected {
            return Err(CodecError::RegisterWidth {
                field,
                expected,
                found: self.width,
            });
        }
        Ok(self.index)
    }

    /// 编号 31 按 SP 解释时的名称
    pub fn name_sp(&self) -> String {
        match (self.index, self.width) {
            (Self::ZR_SP, RegWidth::X) => "sp".to_string(),
            (Self::ZR_SP, RegWidth::W) => "wsp".to_string(),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for GeneralRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.index, self.width) {
            (Self::ZR_SP, RegWidth::X) => write!(f, "xzr"),
            (Self::ZR_SP, RegWidth::W) => write!(f, "wzr"),
            (n, RegWidth::X) => write!(f, "x{}", n),
            (n, RegWidth::W) => write!(f, "w{}", n),
        }
    }
}

/// 条件码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Condition {
    Eq = 0,
    Ne = 1,
    Cs = 2,
    Cc = 3,
    Mi = 4,
    Pl = 5,
    Vs = 6,
    Vc = 7,
    Hi = 8,
    Ls = 9,
    Ge = 10,
    Lt = 11,
    Gt = 12,
    Le = 13,
    /// 总是执行，即“无条件”
    #[default]
    Al = 14,
    Nv = 15,
}

impl Condition {
    /// 从 4-bit 字段构造，高位忽略
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0xF {
            0 => Condition::Eq,
            1 => Condition::Ne,
            2 => Condition::Cs,
            3 => Condition::Cc,
            4 => Condition::Mi,
            5 => Condition::Pl,
            6 => Condition::Vs,
            7 => Condition::Vc,
            8 => Condition::Hi,
            9 => Condition::Ls,
            10 => Condition::Ge,
            11 => Condition::Lt,
            12 => Condition::Gt,
            13 => Condition::Le,
            14 => Condition::Al,
            _ => Condition::Nv,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// 取反条件（AL/NV 无反条件，原样返回）
    pub fn invert(self) -> Self {
        match self {
            Condition::Al | Condition::Nv => self,
            other => Condition::from_bits(other.bits() ^ 1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Cs => "cs",
            Condition::Cc => "cc",
            Condition::Mi => "mi",
            Condition::Pl => "pl",
            Condition::Vs => "vs",
            Condition::Vc => "vc",
            Condition::Hi => "hi",
            Condition::Ls => "ls",
            Condition::Ge => "ge",
            Condition::Lt => "lt",
            Condition::Gt => "gt",
            Condition::Le => "le",
            Condition::Al => "al",
            Condition::Nv => "nv",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 异常级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ExceptionLevel {
    #[default]
    El0 = 0,
    El1 = 1,
    El2 = 2,
    El3 = 3,
}

impl ExceptionLevel {
    /// 从 2-bit 字段构造
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => ExceptionLevel::El0,
            1 => ExceptionLevel::El1,
            2 => ExceptionLevel::El2,
            _ => ExceptionLevel::El3,
        }
    }

    pub fn level(self) -> i8 {
        self as i8
    }
}

impl fmt::Display for ExceptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EL{}", self.level())
    }
}

/// 系统寄存器编码 `op0:op1:CRn:CRm:op2`（16 bit）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SystemRegister(u16);

impl SystemRegister {
    pub const NZCV: SystemRegister = SystemRegister::from_parts(3, 3, 4, 2, 0);
    pub const FPCR: SystemRegister = SystemRegister::from_parts(3, 3, 4, 4, 0);
    pub const FPSR: SystemRegister = SystemRegister::from_parts(3, 3, 4, 4, 1);
    pub const TPIDR_EL0: SystemRegister = SystemRegister::from_parts(3, 3, 13, 0, 2);
    pub const TPIDRRO_EL0: SystemRegister = SystemRegister::from_parts(3, 3, 13, 0, 3);
    pub const CNTVCT_EL0: SystemRegister = SystemRegister::from_parts(3, 3, 14, 0, 2);
    pub const CTR_EL0: SystemRegister = SystemRegister::from_parts(3, 3, 0, 0, 1);
    pub const DCZID_EL0: SystemRegister = SystemRegister::from_parts(3, 3, 0, 0, 7);
    pub const MIDR_EL1: SystemRegister = SystemRegister::from_parts(3, 0, 0, 0, 0);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// 由各字段拼装，超宽部分被截断
    pub const fn from_parts(op0: u8, op1: u8, crn: u8, crm: u8, op2: u8) -> Self {
        Self(
            ((op0 as u16 & 0x3) << 14)
                | ((op1 as u16 & 0x7) << 11)
                | ((crn as u16 & 0xF) << 7)
                | ((crm as u16 & 0xF) << 3)
                | (op2 as u16 & 0x7),
        )
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn op0(&self) -> u8 {
        ((self.0 >> 14) & 0x3) as u8
    }

    pub fn op1(&self) -> u8 {
        ((self.0 >> 11) & 0x7) as u8
    }

    pub fn crn(&self) -> u8 {
        ((self.0 >> 7) & 0xF) as u8
    }

    pub fn crm(&self) -> u8 {
        ((self.0 >> 3) & 0xF) as u8
    }

    pub fn op2(&self) -> u8 {
        (self.0 & 0x7) as u8
    }
}

impl fmt::Display for SystemRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s{}_{}_c{}_c{}_{}",
            self.op0(),
            self.op1(),
            self.crn(),
            self.crm(),
            self.op2()
        )
    }
}

/// 第二操作数中哪一部分在语义上生效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperandKind {
    Register,
    #[default]
    Immediate,
}

/// 算术/寻址指令的操作数描述
///
/// 对于加减立即数，`reg` 是源寄存器 Rn，`shift_extend_imm` 是移位后的立即数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub reg: GeneralRegister,
    pub shift_extend_imm: i64,
    pub kind: OperandKind,
}

impl Operand {
    pub fn immediate(reg: GeneralRegister, imm: i64) -> Self {
        Self {
            reg,
            shift_extend_imm: imm,
            kind: OperandKind::Immediate,
        }
    }

    pub fn register(reg: GeneralRegister) -> Self {
        Self {
            reg,
            shift_extend_imm: 0,
            kind: OperandKind::Register,
        }
    }
}

impl Default for Operand {
    fn default() -> Self {
        Self::immediate(GeneralRegister::x(0), 0)
    }
}
