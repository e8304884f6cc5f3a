//! 编解码错误类型

use thiserror::Error;

use super::instr::KindTag;
use super::opcode::Opcode;
use super::register::RegWidth;

/// 指令编解码错误
///
/// 所有可预期的失败都通过该类型返回给直接调用者，由调用者决定
/// 换一种解码方式、跳过该指令还是放弃整个修补操作。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// 没有任何表项匹配该指令字（数据或尚不支持的指令）
    #[error("no opcode matches word {raw:#010x}")]
    Unrecognized { raw: u32 },

    /// 匹配到的 opcode 不属于该指令族
    #[error("{opcode} is not handled by the {kind} variant")]
    FamilyMismatch { opcode: Opcode, kind: KindTag },

    /// 该指令族不知道如何重新编码此 opcode
    #[error("{opcode} cannot be re-encoded")]
    UnsupportedAssembly { opcode: Opcode },

    /// 数值超出字段可表示的范围
    #[error("{field} value {value:#x} does not fit in {bits} bits")]
    FieldOverflow {
        field: &'static str,
        value: i64,
        bits: u32,
    },

    /// 数值未按字段要求对齐
    #[error("{field} value {value:#x} is not a multiple of {align}")]
    Misaligned {
        field: &'static str,
        value: i64,
        align: u64,
    },

    /// 寄存器宽度与指令位宽不一致
    #[error("{field} must be a {expected} register, found {found}")]
    RegisterWidth {
        field: &'static str,
        expected: RegWidth,
        found: RegWidth,
    },

    /// 寄存器编号越界
    #[error("register index {index} out of range 0..=31")]
    InvalidRegister { index: u8 },

    /// 绝对目标地址尚未换算为相对偏移
    #[error("absolute target {target:#x} must be rebased before assembly")]
    UnresolvedTarget { target: u64 },

    /// 打包后的字段破坏了模板中的固定位
    #[error("encoded word {word:#010x} no longer matches {opcode}")]
    TemplateConflict { opcode: Opcode, word: u32 },

    /// 指令表中没有该 opcode 的表项
    #[error("opcode table has no entry for {opcode}")]
    MissingTableEntry { opcode: Opcode },
}

pub type CodecResult<T> = Result<T, CodecError>;
