//! 指令定义与指令表
//!
//! 统一的指令定义，同时用于解码、汇编模板和冲突检测

use std::fmt;

use super::error::{CodecError, CodecResult};
use super::opcode::{InstrFamily, Opcode};

/// 指令定义
///
/// 一处定义，三处使用：
/// - 解码：通过 mask/value 匹配识别 opcode
/// - 汇编：`value` 即未被语义字段覆盖的位的默认模板
/// - 冲突检测：通过 mask/value 判断两条指令是否可能同时匹配
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InstrDef {
    /// 对应的 opcode
    pub opcode: Opcode,
    /// 指令名称（用于调试和冲突报告）
    pub name: &'static str,
    /// 匹配掩码：哪些位需要检查
    pub mask: u32,
    /// 匹配值：这些位应该是什么
    pub value: u32,
    /// 所属指令族
    pub family: InstrFamily,
}

impl InstrDef {
    /// 创建新的指令定义
    pub const fn new(
        opcode: Opcode,
        name: &'static str,
        mask: u32,
        value: u32,
        family: InstrFamily,
    ) -> Self {
        Self {
            opcode,
            name,
            mask,
            value,
            family,
        }
    }

    /// 检查指令是否匹配此定义
    #[inline]
    pub fn matches(&self, raw: u32) -> bool {
        (raw & self.mask) == self.value
    }

    /// 检查两个指令定义是否冲突
    ///
    /// 两个定义冲突当且仅当存在某个指令字同时匹配两者
    pub fn conflicts_with(&self, other: &InstrDef) -> bool {
        let common_mask = self.mask & other.mask;
        (self.value & common_mask) == (other.value & common_mask)
    }
}

impl fmt::Debug for InstrDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrDef")
            .field("name", &self.name)
            .field("mask", &format_args!("0x{:08X}", self.mask))
            .field("value", &format_args!("0x{:08X}", self.value))
            .field("family", &self.family)
            .finish()
    }
}

/// 冲突信息
#[derive(Debug, Clone)]
pub struct ConflictInfo {
    pub first: InstrDef,
    pub second: InstrDef,
    /// 同时匹配两者的示例指令编码
    pub example_raw: u32,
}

impl fmt::Display for ConflictInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "冲突: {}:{} 与 {}:{} (示例: 0x{:08X})",
            self.first.family,
            self.first.name,
            self.second.family,
            self.second.name,
            self.example_raw
        )
    }
}

// ========== 指令表 ==========

/// 不可变的 opcode 指令表
///
/// 构造后只读，可在多个线程的解码操作之间共享引用。
/// 按指令族分桶以加速限定范围的查找。
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    defs: Vec<InstrDef>,
    /// 按指令族分桶的表项下标（保持表内顺序）
    by_family: [Vec<usize>; InstrFamily::COUNT],
}

impl OpcodeTable {
    /// 构建指令表，存在冲突时返回全部冲突
    pub fn new(defs: &[InstrDef]) -> Result<Self, Vec<ConflictInfo>> {
        let conflicts = detect_conflicts(defs);
        if !conflicts.is_empty() {
            return Err(conflicts);
        }
        Ok(Self::new_unchecked(defs))
    }

    /// 构建指令表，不做冲突检测
    pub fn new_unchecked(defs: &[InstrDef]) -> Self {
        let mut by_family: [Vec<usize>; InstrFamily::COUNT] = std::array::from_fn(|_| Vec::new());
        for (idx, def) in defs.iter().enumerate() {
            by_family[def.family.index()].push(idx);
        }
        Self {
            defs: defs.to_vec(),
            by_family,
        }
    }

    /// 标准 A64 指令表
    pub fn a64() -> Self {
        Self::new_unchecked(super::a64_table::A64_INSTRS)
    }

    /// 查找 opcode 对应的表项
    pub fn lookup(&self, opcode: Opcode) -> Option<&InstrDef> {
        self.defs.iter().find(|def| def.opcode == opcode)
    }

    /// 获取 opcode 的汇编模板
    pub fn template(&self, opcode: Opcode) -> CodecResult<u32> {
        self.lookup(opcode)
            .map(|def| def.value)
            .ok_or(CodecError::MissingTableEntry { opcode })
    }

    /// 全部表项（不限定指令族）
    pub fn entries(&self) -> &[InstrDef] {
        &self.defs
    }

    /// 指定指令族的表项（保持表内顺序）
    pub fn entries_for(&self, family: InstrFamily) -> impl Iterator<Item = &InstrDef> + '_ {
        self.by_family[family.index()].iter().map(|&idx| &self.defs[idx])
    }

    /// 缺少表项的非哨兵 opcode
    pub fn missing_opcodes(&self) -> Vec<Opcode> {
        Opcode::ALL
            .iter()
            .copied()
            .filter(|&op| self.lookup(op).is_none())
            .collect()
    }

    /// 表中的冲突（通过 `new` 构造的表总是为空）
    pub fn conflicts(&self) -> Vec<ConflictInfo> {
        detect_conflicts(&self.defs)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::a64()
    }
}

/// 检测指令冲突
///
/// 整张表都要求互斥，这样任一指令族范围内的查找也必然互斥，
/// 查找结果与表项顺序无关。
fn detect_conflicts(defs: &[InstrDef]) -> Vec<ConflictInfo> {
    let mut conflicts = Vec::new();

    for (i, first) in defs.iter().enumerate() {
        for second in defs.iter().skip(i + 1) {
            if first.conflicts_with(second) {
                // 生成一个同时满足两者 mask/value 的示例
                let example = (first.value & first.mask) | (second.value & second.mask);
                conflicts.push(ConflictInfo {
                    first: *first,
                    second: *second,
                    example_raw: example,
                });
            }
        }
    }

    conflicts
}
