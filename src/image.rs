//! 代码映像加载
//!
//! 本模块负责：
//! - 描述加载配置（ELF 或原始二进制、解码选项）
//! - 解析 AArch64 ELF，提取可执行段和函数符号
//! - 把代码装入 `CodeBuffer` 供解码使用
//!
//! # 示例
//!
//! ```no_run
//! use a64_codec::image::{CodeImage, ImageConfig};
//!
//! let config = ImageConfig::default()
//!     .with_elf_path("program.elf")
//!     .with_max_words(256);
//!
//! let image = CodeImage::load(&config).expect("Failed to load image");
//! for buffer in &image.buffers {
//!     println!("{:#x}: {} words", buffer.base_addr(), buffer.len());
//! }
//! ```

use std::io;
use std::path::Path;

use elf::ElfBytes;
use elf::abi::{EM_AARCH64, PF_X, PT_LOAD, STT_FUNC};
use elf::endian::AnyEndian;
use log::{debug, info};
use thiserror::Error;

use crate::memory::{CodeBuffer, MemError, WORD_BYTES};

/// 映像加载错误
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("ELF parse error: {0}")]
    ElfParse(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Memory error: {0}")]
    Memory(#[from] MemError),
}

pub type ImageResult<T> = Result<T, ImageError>;

/// 加载与解码配置
#[derive(Debug, Clone, Default)]
pub struct ImageConfig {
    /// ELF 文件路径
    pub elf_path: Option<String>,
    /// 原始二进制文件路径
    pub bin_path: Option<String>,
    /// 原始二进制的加载地址
    pub bin_load_addr: u64,
    /// 最多处理的指令字数，0 表示不限
    pub max_words: usize,
    /// 使用按 op0 分派的快速解码
    pub fast_decode: bool,
    /// 逐条检查 解码 -> 汇编 往返
    pub verify: bool,
    /// 详细输出
    pub verbose: bool,
}

impl ImageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elf_path(mut self, path: impl Into<String>) -> Self {
        self.elf_path = Some(path.into());
        self
    }

    pub fn with_bin_path(mut self, path: impl Into<String>, load_addr: u64) -> Self {
        self.bin_path = Some(path.into());
        self.bin_load_addr = load_addr;
        self
    }

    pub fn with_max_words(mut self, max: usize) -> Self {
        self.max_words = max;
        self
    }

    pub fn with_fast_decode(mut self, fast: bool) -> Self {
        self.fast_decode = fast;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// ELF 可执行段
#[derive(Debug, Clone)]
pub struct ElfSegment {
    pub vaddr: u64,
    pub mem_size: u64,
    /// 文件中的段数据
    pub data: Vec<u8>,
}

/// ELF 函数符号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfSymbol {
    pub name: String,
    pub addr: u64,
    pub size: u64,
}

/// ELF 解析结果
#[derive(Debug, Clone)]
pub struct ElfImage {
    pub entry: u64,
    /// 可执行的 PT_LOAD 段
    pub segments: Vec<ElfSegment>,
    /// 函数符号，按地址排序
    pub symbols: Vec<ElfSymbol>,
}

impl ElfImage {
    pub fn parse<P: AsRef<Path>>(path: P) -> ImageResult<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse_bytes(&data)
    }

    pub fn parse_bytes(data: &[u8]) -> ImageResult<Self> {
        let elf_file = ElfBytes::<AnyEndian>::minimal_parse(data)
            .map_err(|e| ImageError::ElfParse(format!("Failed to parse ELF: {}", e)))?;

        let header = &elf_file.ehdr;
        if header.e_machine != EM_AARCH64 {
            return Err(ImageError::ElfParse(format!(
                "Not an AArch64 ELF (machine type: 0x{:x}, expected 0x{:x})",
                header.e_machine, EM_AARCH64
            )));
        }
        if header.class != elf::file::Class::ELF64 {
            return Err(ImageError::ElfParse("Only 64-bit ELF is supported".into()));
        }
        if header.endianness != AnyEndian::Little {
            return Err(ImageError::ElfParse(
                "Only little-endian ELF is supported".into(),
            ));
        }

        let mut segments = Vec::new();
        if let Some(phdrs) = elf_file.segments() {
            for phdr in phdrs {
                if phdr.p_type != PT_LOAD || phdr.p_flags & PF_X == 0 {
                    continue;
                }
                let data = elf_file
                    .segment_data(&phdr)
                    .map_err(|e| {
                        ImageError::ElfParse(format!("Failed to read segment data: {}", e))
                    })?
                    .to_vec();
                segments.push(ElfSegment {
                    vaddr: phdr.p_vaddr,
                    mem_size: phdr.p_memsz,
                    data,
                });
            }
        }

        let mut symbols = Vec::new();
        if let Ok(Some((symtab, strtab))) = elf_file.symbol_table() {
            for sym in symtab {
                if sym.st_symtype() != STT_FUNC || sym.st_value == 0 {
                    continue;
                }
                if let Ok(name) = strtab.get(sym.st_name as usize) {
                    symbols.push(ElfSymbol {
                        name: name.to_string(),
                        addr: sym.st_value,
                        size: sym.st_size,
                    });
                }
            }
        }
        symbols.sort_by_key(|s| s.addr);

        Ok(ElfImage {
            entry: header.e_entry,
            segments,
            symbols,
        })
    }
}

/// 装入内存的代码映像
#[derive(Debug, Clone)]
pub struct CodeImage {
    /// 入口地址（仅 ELF）
    pub entry: Option<u64>,
    pub buffers: Vec<CodeBuffer>,
    pub symbols: Vec<ElfSymbol>,
}

impl CodeImage {
    /// 按配置加载
    pub fn load(config: &ImageConfig) -> ImageResult<Self> {
        let image = if let Some(ref elf_path) = config.elf_path {
            let elf = ElfImage::parse(elf_path)?;
            info!(
                "Loaded ELF: {} (entry {:#x}, {} executable segments)",
                elf_path,
                elf.entry,
                elf.segments.len()
            );
            Self::from_elf(elf)?
        } else if let Some(ref bin_path) = config.bin_path {
            let data = std::fs::read(bin_path)?;
            info!(
                "Loaded binary: {} ({} bytes at {:#x})",
                bin_path,
                data.len(),
                config.bin_load_addr
            );
            Self::from_bytes(config.bin_load_addr, &data)?
        } else {
            return Err(ImageError::Config(
                "either an ELF or a binary path is required".into(),
            ));
        };
        Ok(image.truncated(config.max_words))
    }

    pub fn from_elf(elf: ElfImage) -> ImageResult<Self> {
        let mut buffers = Vec::with_capacity(elf.segments.len());
        for seg in &elf.segments {
            debug!(
                "Segment: vaddr={:#x}, file size={:#x}, mem size={:#x}",
                seg.vaddr,
                seg.data.len(),
                seg.mem_size
            );
            buffers.push(words_of(seg.vaddr, &seg.data)?);
        }
        Ok(Self {
            entry: Some(elf.entry),
            buffers,
            symbols: elf.symbols,
        })
    }

    /// 原始小端字节流
    pub fn from_bytes(load_addr: u64, data: &[u8]) -> ImageResult<Self> {
        Ok(Self {
            entry: None,
            buffers: vec![words_of(load_addr, data)?],
            symbols: Vec::new(),
        })
    }

    /// 总字数
    pub fn word_count(&self) -> usize {
        self.buffers.iter().map(CodeBuffer::len).sum()
    }

    pub fn symbol_at(&self, addr: u64) -> Option<&ElfSymbol> {
        self.symbols.iter().find(|s| s.addr == addr)
    }

    /// 只保留前 `max_words` 个字，0 表示不限
    fn truncated(self, max_words: usize) -> Self {
        if max_words == 0 || self.word_count() <= max_words {
            return self;
        }
        let Self {
            entry,
            buffers: full,
            symbols,
        } = self;
        let mut remaining = max_words;
        let mut buffers = Vec::new();
        for mut buffer in full {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(buffer.len());
            remaining -= take;
            buffer.truncate(take);
            buffers.push(buffer);
        }
        Self {
            entry,
            buffers,
            symbols,
        }
    }
}

/// 把字节流切成整字，末尾不足一个字的部分丢弃
fn words_of(base: u64, data: &[u8]) -> ImageResult<CodeBuffer> {
    let whole = data.len() - data.len() % WORD_BYTES as usize;
    if whole != data.len() {
        debug!(
            "Dropping {} trailing bytes at {:#x}",
            data.len() - whole,
            base + whole as u64
        );
    }
    Ok(CodeBuffer::from_le_bytes(base, &data[..whole])?)
}
