//! 指令字段视图
//!
//! 每个指令族一个位域结构，对同一个 32-bit 指令字提供具名字段的读写。
//! 字段位置见 Arm ARM 中对应编码组的格式图。

use bitfield::bitfield;

/// 提取顶层编码组 op0 [28:25]
#[inline]
pub fn op0(raw: u32) -> u32 {
    (raw >> 25) & 0xF
}

bitfield! {
    /// B / BL
    ///
    /// ```text
    /// 31 30    26 25                                    0
    /// ┌──┬────────┬──────────────────────────────────────┐
    /// │op│ 00101  │                imm26                 │
    /// └──┴────────┴──────────────────────────────────────┘
    /// ```
    #[derive(Clone, Copy)]
    pub struct UncondBranchFields(u32);
    impl Debug;

    /// 26-bit 字偏移
    pub u32, imm26, set_imm26: 25, 0;
}

bitfield! {
    /// B.cond
    #[derive(Clone, Copy)]
    pub struct CondBranchFields(u32);
    impl Debug;

    /// 19-bit 字偏移
    pub u32, imm19, set_imm19: 23, 5;
    /// 条件码
    pub u8, cond, set_cond: 3, 0;
}

bitfield! {
    /// CBZ / CBNZ
    #[derive(Clone, Copy)]
    pub struct CmpBranchFields(u32);
    impl Debug;

    /// 1 表示 64 位寄存器
    pub sf, _: 31;
    pub u32, imm19, set_imm19: 23, 5;
    pub u8, rt, set_rt: 4, 0;
}

bitfield! {
    /// TBZ / TBNZ
    ///
    /// 被测试的位号为 `b5:b40`。
    #[derive(Clone, Copy)]
    pub struct TestBranchFields(u32);
    impl Debug;

    pub b5, set_b5: 31;
    pub u8, b40, set_b40: 23, 19;
    /// 14-bit 字偏移
    pub u32, imm14, set_imm14: 18, 5;
    pub u8, rt, set_rt: 4, 0;
}

bitfield! {
    /// BR / BLR
    #[derive(Clone, Copy)]
    pub struct RegBranchFields(u32);
    impl Debug;

    pub u8, rn, set_rn: 9, 5;
}

bitfield! {
    /// SVC / HVC / SMC
    ///
    /// ```text
    /// 31      24 23 21 20              5 4    2 1  0
    /// ┌─────────┬─────┬─────────────────┬──────┬────┐
    /// │11010100 │ opc │      imm16      │ op2  │ LL │
    /// └─────────┴─────┴─────────────────┴──────┴────┘
    /// ```
    #[derive(Clone, Copy)]
    pub struct ExpGenFields(u32);
    impl Debug;

    pub u16, imm16, set_imm16: 20, 5;
    /// 目标异常级别
    pub u8, ll, _: 1, 0;
}

bitfield! {
    /// MRS / MSR
    ///
    /// 系统寄存器编码 `op0:op1:CRn:CRm:op2` 占 [20:5]。
    #[derive(Clone, Copy)]
    pub struct SysRegFields(u32);
    impl Debug;

    pub u16, sysreg, set_sysreg: 20, 5;
    pub u8, rt, set_rt: 4, 0;
}

bitfield! {
    /// ADR / ADRP
    ///
    /// ```text
    /// 31 30 29 28   24 23                 5 4    0
    /// ┌──┬─────┬───────┬────────────────────┬──────┐
    /// │op│immlo│ 10000 │       immhi        │  Rd  │
    /// └──┴─────┴───────┴────────────────────┴──────┘
    /// ```
    #[derive(Clone, Copy)]
    pub struct PcRelFields(u32);
    impl Debug;

    pub u8, immlo, set_immlo: 30, 29;
    pub u32, immhi, set_immhi: 23, 5;
    pub u8, rd, set_rd: 4, 0;
}

impl PcRelFields {
    /// 拼接 `immhi:immlo` 得到 21-bit 立即数
    pub fn imm21(&self) -> u32 {
        (self.immhi() << 2) | self.immlo() as u32
    }

    /// 拆分 21-bit 立即数写回 `immhi` / `immlo`
    pub fn set_imm21(&mut self, imm: u32) {
        self.set_immlo((imm & 0x3) as u8);
        self.set_immhi((imm >> 2) & 0x7FFFF);
    }
}

bitfield! {
    /// ADD / ADDS / SUB / SUBS (immediate)
    ///
    /// ```text
    /// 31 30 29 28     23 22 21        10 9    5 4    0
    /// ┌──┬──┬─┬─────────┬──┬────────────┬──────┬──────┐
    /// │sf│op│S│ 100010  │sh│   imm12    │  Rn  │  Rd  │
    /// └──┴──┴─┴─────────┴──┴────────────┴──────┴──────┘
    /// ```
    #[derive(Clone, Copy)]
    pub struct AddSubImmFields(u32);
    impl Debug;

    pub sf, set_sf: 31;
    pub op, set_op: 30;
    pub s, set_s: 29;
    pub sh, set_sh: 22;
    pub u16, imm12, set_imm12: 21, 10;
    pub u8, rn, set_rn: 9, 5;
    pub u8, rd, set_rd: 4, 0;
}
