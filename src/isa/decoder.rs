//! 解码器
//!
//! 两条解码路径：
//! - `decode`：在整张表（或某个指令族）里按 mask/value 扫描；
//! - `fast_decode`：先按顶层编码组 op0 [28:25] 分派，再在对应指令族内扫描。
//!
//! 表项互斥，所以两条路径对同一指令字给出相同的 opcode。

use log::{debug, trace};

use super::fields::op0;
use super::instr::{Instruction, KindTag};
use super::instr_def::OpcodeTable;
use super::opcode::{InstrFamily, Opcode};

/// 绑定一张指令表的解码器
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'t> {
    table: &'t OpcodeTable,
}

impl<'t> Decoder<'t> {
    pub fn new(table: &'t OpcodeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t OpcodeTable {
        self.table
    }

    /// 查表得到 opcode；`family` 为 `Some` 时只在该指令族内查找
    ///
    /// 没有表项匹配时返回 `Opcode::Invalid`。
    pub fn decode_opcode(&self, raw: u32, family: Option<InstrFamily>) -> Opcode {
        let hit = match family {
            Some(family) => self.table.entries_for(family).find(|def| def.matches(raw)),
            None => self.table.entries().iter().find(|def| def.matches(raw)),
        };
        match hit {
            Some(def) => {
                trace!("{:#010x} matched {} ({})", raw, def.name, def.family);
                def.opcode
            }
            None => Opcode::Invalid,
        }
    }

    /// 全表扫描解码，并提取字段
    pub fn decode(&self, raw: u32) -> Instruction {
        let opcode = self.decode_opcode(raw, None);
        if opcode == Opcode::Invalid {
            debug!("{:#010x} not recognized", raw);
        }
        Instruction::from_opcode(opcode, raw)
    }

    /// 按 op0 分派的快速解码
    ///
    /// | op0    | 编码组                         |
    /// |--------|--------------------------------|
    /// | 0000~0011 | 保留 / SME / SVE / 未分配   |
    /// | 100x   | 数据处理（立即数）             |
    /// | 101x   | 分支、异常生成、系统指令       |
    /// | x1x0   | 访存                           |
    /// | x101   | 数据处理（寄存器）             |
    /// | 0111   | SIMD                           |
    /// | 1111   | 浮点                           |
    ///
    /// 尚未实现的编码组返回对应扩展标签的指令，opcode 为 `UnDecoded`，
    /// 原始指令字作为备份原样保留。
    pub fn fast_decode(&self, raw: u32) -> Instruction {
        let class = op0(raw);
        match class {
            0b0000..=0b0011 => {
                debug!("{:#010x} in unallocated class op0={:04b}", raw, class);
                Instruction::from_opcode(Opcode::Invalid, raw)
            }
            0b1000 | 0b1001 => self.decode_scoped(raw, &[InstrFamily::DataProcImm]),
            0b1010 | 0b1011 => {
                self.decode_scoped(raw, &[InstrFamily::Branch, InstrFamily::System])
            }
            0b0111 => Self::extension(KindTag::Simd, raw),
            0b1111 => Self::extension(KindTag::Float, raw),
            class if class & 0b0101 == 0b0100 => Self::extension(KindTag::LoadStore, raw),
            // 剩下的只有 x101
            _ => Self::extension(KindTag::DataProcReg, raw),
        }
    }

    /// 连续解码一段指令字
    pub fn decode_block(&self, words: &[u32]) -> Vec<Instruction> {
        words.iter().map(|&raw| self.fast_decode(raw)).collect()
    }

    fn decode_scoped(&self, raw: u32, families: &[InstrFamily]) -> Instruction {
        let opcode = families
            .iter()
            .map(|&family| self.decode_opcode(raw, Some(family)))
            .find(|&opcode| opcode != Opcode::Invalid)
            .unwrap_or(Opcode::Invalid);
        if opcode == Opcode::Invalid {
            debug!("{:#010x} not recognized in {:?}", raw, families);
        }
        Instruction::from_opcode(opcode, raw)
    }

    fn extension(tag: KindTag, raw: u32) -> Instruction {
        debug!("{:#010x} dispatched to extension point {}", raw, tag);
        Instruction::passthrough(tag, raw)
    }
}
