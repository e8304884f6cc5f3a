//! a64_codec: AArch64 指令编解码库
//!
//! 本库把 32-bit 原始指令字解码为带语义的指令对象（反汇编），
//! 并把（可能被修改过的）指令对象重新编码为正确的指令字（汇编），
//! 供 hook / 代码修补引擎使用。
//!
//! # 模块结构
//!
//! - `isa`: A64 指令表、位域视图、偏移编解码、解码器与指令族
//! - `memory`: 以 32-bit 字为单位的代码缓冲区（汇编目标槽位）
//! - `image`: 加载配置、ELF / 原始二进制加载

pub mod image;
pub mod isa;
pub mod memory;
