//! 立即数偏移编解码
//!
//! 分支、PC 相对寻址等字段存放的是低位隐含为 0 的有符号偏移。
//! 解码与编码共用同一组 (宽度, 移位) 参数，保证两个方向对称。

use super::error::{CodecError, CodecResult};

/// 偏移字段编解码器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetCodec {
    /// 字段位宽
    width: u32,
    /// 隐含的左移位数（对齐）
    shift: u32,
    /// 报错时使用的字段名
    field: &'static str,
}

/// B.cond / CBZ / CBNZ
pub const COND_BRANCH: OffsetCodec = OffsetCodec::new("imm19", 19, 2);
/// B / BL
pub const UNCOND_BRANCH: OffsetCodec = OffsetCodec::new("imm26", 26, 2);
/// TBZ / TBNZ
pub const TEST_BRANCH: OffsetCodec = OffsetCodec::new("imm14", 14, 2);
/// ADR
pub const PC_REL: OffsetCodec = OffsetCodec::new("immhi:immlo", 21, 0);
/// ADRP，页大小 4KB
pub const PAGE_REL: OffsetCodec = OffsetCodec::new("immhi:immlo", 21, PAGE_SHIFT);

/// A64 页大小的 log2
pub const PAGE_SHIFT: u32 = 12;
/// A64 页大小
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

impl OffsetCodec {
    /// 位宽必须在 1..64 内，移位必须小于 64，否则移位运算会溢出
    pub const fn new(field: &'static str, width: u32, shift: u32) -> Self {
        assert!(width > 0 && width < 64, "offset width must be in 1..64");
        assert!(shift < 64, "offset shift must be below 64");
        Self { width, shift, field }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    fn field_mask(&self) -> u32 {
        ((1u64 << self.width) - 1) as u32
    }

    /// 字段值 -> 有符号偏移
    ///
    /// 对低 `width` 位做符号扩展，再左移 `shift` 位。高于 `width` 的位被忽略。
    pub fn decode(&self, raw: u32) -> i64 {
        let unused = 64 - self.width;
        let extended = ((raw as u64) << unused) as i64 >> unused;
        extended << self.shift
    }

    /// 有符号偏移 -> 字段值
    ///
    /// 偏移必须按 `1 << shift` 对齐，且右移后能用 `width` 位有符号数表示。
    pub fn encode(&self, offset: i64) -> CodecResult<u32> {
        let align = 1i64 << self.shift;
        if offset & (align - 1) != 0 {
            return Err(CodecError::Misaligned {
                field: self.field,
                value: offset,
                align: align as u64,
            });
        }

        let scaled = offset >> self.shift;
        let min = -(1i64 << (self.width - 1));
        let max = (1i64 << (self.width - 1)) - 1;
        if scaled < min || scaled > max {
            return Err(CodecError::FieldOverflow {
                field: self.field,
                value: offset,
                bits: self.width + self.shift,
            });
        }

        Ok(scaled as u32 & self.field_mask())
    }

    /// 可编码的最大正偏移
    pub fn max_offset(&self) -> i64 {
        ((1i64 << (self.width - 1)) - 1) << self.shift
    }

    /// 可编码的最小负偏移
    pub fn min_offset(&self) -> i64 {
        -(1i64 << (self.width - 1)) << self.shift
    }
}

/// 向下对齐到 `align`（2 的幂）
#[inline]
pub fn round_down(value: u64, align: u64) -> u64 {
    value & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "offset width must be in 1..64")]
    fn test_zero_width_rejected() {
        let _ = OffsetCodec::new("imm", 0, 0);
    }

    #[test]
    #[should_panic(expected = "offset width must be in 1..64")]
    fn test_full_width_rejected() {
        let _ = OffsetCodec::new("imm", 64, 2);
    }

    #[test]
    fn test_custom_width() {
        let codec = OffsetCodec::new("imm7", 7, 3);
        assert_eq!(codec.decode(0x7F), -8);
        assert_eq!(codec.encode(-8), Ok(0x7F));
        assert_eq!(codec.max_offset(), 63 << 3);
    }

    #[test]
    fn test_decode_positive() {
        assert_eq!(COND_BRANCH.decode(0x10), 0x40);
        assert_eq!(UNCOND_BRANCH.decode(1), 4);
    }

    #[test]
    fn test_decode_negative() {
        // 19 位全 1 即 -1
        assert_eq!(COND_BRANCH.decode(0x7FFFF), -4);
        assert_eq!(UNCOND_BRANCH.decode(0x3FFFFFF), -4);
        assert_eq!(PC_REL.decode(0x100000), -(1 << 20));
    }

    #[test]
    fn test_page_rel() {
        assert_eq!(PAGE_REL.decode(1), 0x1000);
        assert_eq!(PAGE_REL.encode(-0x2000), Ok(0x1FFFFE));
    }

    #[test]
    fn test_encode_rejects_misaligned() {
        assert!(matches!(
            UNCOND_BRANCH.encode(6),
            Err(CodecError::Misaligned { align: 4, .. })
        ));
        assert!(matches!(
            PAGE_REL.encode(0x1001),
            Err(CodecError::Misaligned { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_overflow() {
        assert!(matches!(
            COND_BRANCH.encode(1 << 20),
            Err(CodecError::FieldOverflow { bits: 21, .. })
        ));
        assert!(COND_BRANCH.encode(COND_BRANCH.max_offset()).is_ok());
        assert!(COND_BRANCH.encode(COND_BRANCH.min_offset()).is_ok());
        assert!(COND_BRANCH.encode(COND_BRANCH.min_offset() - 4).is_err());
    }

    #[test]
    fn test_inverse_exhaustive_small_width() {
        for raw in 0..(1u32 << 14) {
            assert_eq!(TEST_BRANCH.encode(TEST_BRANCH.decode(raw)), Ok(raw));
        }
    }

    #[test]
    fn test_round_down() {
        assert_eq!(round_down(0x12345, PAGE_SIZE), 0x12000);
        assert_eq!(round_down(0x1000, PAGE_SIZE), 0x1000);
    }
}
