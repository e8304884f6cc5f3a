//! a64_codec 命令行入口
//!
//! 反汇编 ELF / 原始二进制 / 命令行给出的指令字，并可逐条检查
//! 解码 -> 汇编 是否还原出原始指令字。

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{info, warn};

use a64_codec::image::{CodeImage, ImageConfig};
use a64_codec::isa::{A64_INSTRS, Decoder, OpcodeTable};
use a64_codec::memory::CodeBuffer;

/// A64 instruction decoder / re-encoder
#[derive(Parser, Debug)]
#[command(name = "a64_codec_cli", version, about = "Decode and re-encode AArch64 instructions")]
struct Args {
    /// AArch64 ELF file; executable segments are decoded
    #[arg(short, long, conflicts_with = "bin")]
    elf: Option<String>,

    /// Raw little-endian binary
    #[arg(short, long)]
    bin: Option<String>,

    /// Load address of the binary or of the positional words
    #[arg(long, default_value = "0", value_parser = parse_hex_u64)]
    base: u64,

    /// Maximum number of words to decode (0 = all)
    #[arg(short, long, default_value_t = 0)]
    max: usize,

    /// Dispatch on the op0 class bits instead of scanning the whole table
    #[arg(short, long)]
    fast: bool,

    /// Re-assemble every instruction and report words that do not round-trip
    #[arg(long)]
    verify: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Instruction words in hex (e.g. 0x54000201)
    #[arg(value_parser = parse_hex_u32, conflicts_with_all = ["elf", "bin"])]
    words: Vec<u32>,
}

fn parse_hex_u64(s: &str) -> Result<u64, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{}': {}", s, e))
}

fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let value = parse_hex_u64(s)?;
    u32::try_from(value).map_err(|_| format!("'{}' does not fit in 32 bits", s))
}

impl Args {
    fn image_config(&self) -> ImageConfig {
        let mut config = ImageConfig::new()
            .with_max_words(self.max)
            .with_fast_decode(self.fast)
            .with_verify(self.verify)
            .with_verbose(self.verbose);
        if let Some(ref path) = self.elf {
            config = config.with_elf_path(path.clone());
        }
        if let Some(ref path) = self.bin {
            config = config.with_bin_path(path.clone(), self.base);
        }
        config
    }
}

fn load(args: &Args, config: &ImageConfig) -> Result<CodeImage> {
    if args.words.is_empty() {
        return CodeImage::load(config).context("Failed to load code image");
    }
    let words: Vec<u32> = if config.max_words == 0 {
        args.words.clone()
    } else {
        args.words.iter().copied().take(config.max_words).collect()
    };
    let buffer = CodeBuffer::from_words(args.base, words)
        .with_context(|| format!("Invalid base address {:#x}", args.base))?;
    Ok(CodeImage {
        entry: None,
        buffers: vec![buffer],
        symbols: Vec::new(),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = args.image_config();

    let log_level = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let image = load(&args, &config)?;

    let table = OpcodeTable::new(A64_INSTRS).map_err(|conflicts| {
        let report: Vec<String> = conflicts.iter().map(|c| c.to_string()).collect();
        anyhow!("opcode table is inconsistent:\n{}", report.join("\n"))
    })?;
    let decoder = Decoder::new(&table);

    if let Some(entry) = image.entry {
        info!("Entry point: {:#x}", entry);
    }

    let mut decoded = 0usize;
    let mut mismatches = 0usize;
    for buffer in &image.buffers {
        for (addr, word) in buffer.iter() {
            if let Some(sym) = image.symbol_at(addr) {
                println!("\n{:016x} <{}>:", addr, sym.name);
            }

            let instr = if config.fast_decode {
                decoder.fast_decode(word)
            } else {
                decoder.decode(word)
            };
            println!("{:8x}:\t{:08x}\t{}", addr, word, instr);
            decoded += 1;

            if !config.verify {
                continue;
            }
            match instr.assemble(&table) {
                Ok(again) if again == word => {}
                Ok(again) => {
                    warn!(
                        "{:#x}: {:08x} re-encoded as {:08x} ({})",
                        addr, word, again, instr
                    );
                    mismatches += 1;
                }
                Err(e) => {
                    warn!("{:#x}: {:08x} failed to re-encode: {}", addr, word, e);
                    mismatches += 1;
                }
            }
        }
    }

    if config.verify {
        info!("{} words decoded, {} round-trip mismatches", decoded, mismatches);
        if mismatches > 0 {
            bail!("{} instructions did not round-trip", mismatches);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_conflict_with_files() {
        assert!(Args::try_parse_from(["a64_codec_cli", "--elf", "a.elf", "0xd65f03c0"]).is_err());
        assert!(Args::try_parse_from(["a64_codec_cli", "--bin", "a.bin", "d65f03c0"]).is_err());
        let args = Args::try_parse_from(["a64_codec_cli", "0xd65f03c0", "14000010"]).unwrap();
        assert_eq!(args.words, vec![0xD65F03C0, 0x14000010]);
    }

    #[test]
    fn test_image_config_carries_flags() {
        let args =
            Args::try_parse_from(["a64_codec_cli", "-v", "--fast", "--max", "8", "--bin", "a.bin"])
                .unwrap();
        let config = args.image_config();
        assert!(config.verbose);
        assert!(config.fast_decode);
        assert_eq!(config.max_words, 8);
        assert_eq!(config.bin_path.as_deref(), Some("a.bin"));
    }
}
