//! 代码缓冲区
//!
//! `CodeBuffer` 是一段从基地址开始、按 32-bit 字存放的指令区域。
//! 解码时从中读取指令字，汇编时通过 `slot_mut` 拿到目标槽位写回。

use thiserror::Error;

/// 指令字字节数
pub const WORD_BYTES: u64 = 4;

/// 代码缓冲区访问错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    /// 地址未按 4 字节对齐
    #[error("unaligned word access at {addr:#x}")]
    Unaligned { addr: u64 },
    /// 地址不在缓冲区内
    #[error("out-of-range word access at {addr:#x} (region={base:#x}..{end:#x})")]
    OutOfRange { addr: u64, base: u64, end: u64 },
    /// 字节流长度不是 4 的倍数
    #[error("{len} bytes do not form whole instruction words")]
    PartialWord { len: usize },
}

pub type MemResult<T> = Result<T, MemError>;

/// 按字存放的代码区域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBuffer {
    /// 第一个字的地址
    base_addr: u64,
    words: Vec<u32>,
}

impl CodeBuffer {
    /// 创建 `len` 个字、全部为 0 的缓冲区
    pub fn new(base_addr: u64, len: usize) -> MemResult<Self> {
        Self::from_words(base_addr, vec![0; len])
    }

    pub fn from_words(base_addr: u64, words: Vec<u32>) -> MemResult<Self> {
        Self::ensure_aligned(base_addr)?;
        Ok(Self { base_addr, words })
    }

    /// 从小端字节流构造
    pub fn from_le_bytes(base_addr: u64, bytes: &[u8]) -> MemResult<Self> {
        if bytes.len() % WORD_BYTES as usize != 0 {
            return Err(MemError::PartialWord { len: bytes.len() });
        }
        let words = bytes
            .chunks_exact(WORD_BYTES as usize)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::from_words(base_addr, words)
    }

    pub fn base_addr(&self) -> u64 {
        self.base_addr
    }

    /// 最后一个字之后的地址
    pub fn end_addr(&self) -> u64 {
        self.base_addr + self.words.len() as u64 * WORD_BYTES
    }

    /// 字数
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// 只保留前 `len` 个字，基地址不变
    pub fn truncate(&mut self, len: usize) {
        self.words.truncate(len);
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base_addr && addr < self.end_addr()
    }

    fn ensure_aligned(addr: u64) -> MemResult<()> {
        if addr.is_multiple_of(WORD_BYTES) {
            Ok(())
        } else {
            Err(MemError::Unaligned { addr })
        }
    }

    fn index_of(&self, addr: u64) -> MemResult<usize> {
        Self::ensure_aligned(addr)?;
        if !self.contains(addr) {
            return Err(MemError::OutOfRange {
                addr,
                base: self.base_addr,
                end: self.end_addr(),
            });
        }
        Ok(((addr - self.base_addr) / WORD_BYTES) as usize)
    }

    pub fn load_word(&self, addr: u64) -> MemResult<u32> {
        let idx = self.index_of(addr)?;
        Ok(self.words[idx])
    }

    pub fn store_word(&mut self, addr: u64, value: u32) -> MemResult<()> {
        let idx = self.index_of(addr)?;
        self.words[idx] = value;
        Ok(())
    }

    /// 指定地址的可写槽位，作为汇编的目标
    pub fn slot_mut(&mut self, addr: u64) -> MemResult<&mut u32> {
        let idx = self.index_of(addr)?;
        Ok(&mut self.words[idx])
    }

    /// 按地址顺序遍历 `(地址, 指令字)`
    pub fn iter(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        let base = self.base_addr;
        self.words
            .iter()
            .enumerate()
            .map(move |(i, &word)| (base + i as u64 * WORD_BYTES, word))
    }

    /// 转回小端字节流
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}
