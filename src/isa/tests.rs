//! ISA 模块测试

use super::*;

/// 每个 opcode 一条样例指令
const SAMPLES: &[(u32, Opcode)] = &[
    (0x14000010, Opcode::B),         // b #0x40
    (0x94000010, Opcode::Bl),        // bl #0x40
    (0x54000201, Opcode::BCond),     // b.ne #0x40
    (0x34000103, Opcode::Cbz32),     // cbz w3, #0x20
    (0x35000103, Opcode::Cbnz32),    // cbnz w3, #0x20
    (0xB4000103, Opcode::Cbz64),     // cbz x3, #0x20
    (0xB5FFFFE9, Opcode::Cbnz64),    // cbnz x9, #-0x4
    (0x36180042, Opcode::Tbz),       // tbz w2, #3, #0x8
    (0xB7F80061, Opcode::Tbnz),      // tbnz x1, #63, #0xc
    (0xD61F0220, Opcode::Br),        // br x17
    (0xD63F0100, Opcode::Blr),       // blr x8
    (0xD65F03C0, Opcode::Ret),       // ret
    (0xD4000001, Opcode::Svc),       // svc #0
    (0xD4000002, Opcode::Hvc),       // hvc #0
    (0xD4000023, Opcode::Smc),       // smc #1
    (0xD53BD040, Opcode::Mrs),       // mrs x0, tpidr_el0
    (0xD50342DF, Opcode::MsrImm),    // msr daifset, #2
    (0xD51B4203, Opcode::MsrReg),    // msr nzcv, x3
    (0x10FFFFE5, Opcode::Adr),       // adr x5, #-0x4
    (0xB0000000, Opcode::Adrp),      // adrp x0, #0x1000
    (0x11000420, Opcode::AddImm32),  // add w0, w1, #1
    (0x31000420, Opcode::AddsImm32), // adds w0, w1, #1
    (0x51400441, Opcode::SubImm32),  // sub w1, w2, #1, lsl #12
    (0x7100043F, Opcode::SubsImm32), // cmp w1, #1
    (0x910043E0, Opcode::AddImm64),  // add x0, sp, #0x10
    (0xB1000420, Opcode::AddsImm64), // adds x0, x1, #1
    (0xD10043FF, Opcode::SubImm64),  // sub sp, sp, #0x10
    (0xF100403F, Opcode::SubsImm64), // cmp x1, #0x10
];

fn table() -> OpcodeTable {
    OpcodeTable::a64()
}

// ========== 基本性质 ==========

#[test]
fn test_b_cond_ne() {
    let table = table();
    let instr = Decoder::new(&table).decode(0x54000201);
    assert_eq!(instr.opcode(), Opcode::BCond);
    let branch = instr.as_branch().unwrap();
    assert_eq!(branch.cond(), Condition::Ne);
    assert_eq!(branch.offset(), 0x10 << 2);
}

#[test]
fn test_bl_links_and_shares_b_offset() {
    let table = table();
    let decoder = Decoder::new(&table);
    let b = decoder.decode(0x17FFFFFE);
    let bl = decoder.decode(0x97FFFFFE);
    assert_eq!(bl.opcode(), Opcode::Bl);
    assert!(bl.as_branch().unwrap().is_link());
    assert!(!b.as_branch().unwrap().is_link());
    assert_eq!(bl.as_branch().unwrap().offset(), -8);
    assert_eq!(
        bl.as_branch().unwrap().offset(),
        b.as_branch().unwrap().offset()
    );
}

#[test]
fn test_adrp_target_at_page_aligned_pc() {
    let table = table();
    let instr = Decoder::new(&table).decode(0xB0000000);
    let adrp = instr.as_pc_rel_addr().unwrap();
    let pc = 0x40_0000;
    assert_eq!(adrp.target(pc), round_down(pc, PAGE_SIZE) + (1 << PAGE_SHIFT));
}

#[test]
fn test_exception_level_delta() {
    let table = table();
    let decoder = Decoder::new(&table);
    let levels = [
        ExceptionLevel::El0,
        ExceptionLevel::El1,
        ExceptionLevel::El2,
        ExceptionLevel::El3,
    ];
    for raw in [0xD4000001, 0xD4000002, 0xD4000003] {
        let instr = decoder.decode(raw);
        let exp = instr.as_exception_gen().unwrap();
        for current in levels {
            let delta = exp.target_level().level() - current.level();
            assert_eq!(exp.is_executable_from(current), delta == 1, "{} from {}", instr, current);
        }
    }
}

#[test]
fn test_zero_word_is_invalid() {
    let table = table();
    let decoder = Decoder::new(&table);
    assert_eq!(decoder.decode_opcode(0, None), Opcode::Invalid);
    assert!(decoder.decode(0).is_invalid());
    assert!(decoder.fast_decode(0).is_invalid());

    // 显式注册全零编码后才能匹配
    let zero = InstrDef::new(Opcode::Ret, "ZERO", 0xFFFF_FFFF, 0, InstrFamily::Branch);
    let table = OpcodeTable::new(&[zero]).unwrap();
    assert_eq!(Decoder::new(&table).decode_opcode(0, None), Opcode::Ret);
}

// ========== 查表 ==========

#[test]
fn test_every_sample_decodes_to_its_opcode() {
    let table = table();
    let decoder = Decoder::new(&table);
    for &(raw, opcode) in SAMPLES {
        assert_eq!(decoder.decode_opcode(raw, None), opcode, "{:#010x}", raw);
    }
    // 覆盖全部 opcode
    assert_eq!(SAMPLES.len(), Opcode::ALL.len());
}

#[test]
fn test_family_scoped_lookup() {
    let table = table();
    let decoder = Decoder::new(&table);
    assert_eq!(
        decoder.decode_opcode(0xD4000001, Some(InstrFamily::System)),
        Opcode::Svc
    );
    assert_eq!(
        decoder.decode_opcode(0xD4000001, Some(InstrFamily::Branch)),
        Opcode::Invalid
    );
}

#[test]
fn test_fast_decode_agrees_with_table_scan() {
    let table = table();
    let decoder = Decoder::new(&table);
    for &(raw, _) in SAMPLES {
        assert_eq!(decoder.fast_decode(raw), decoder.decode(raw), "{:#010x}", raw);
    }
}

#[test]
fn test_fast_decode_extension_points() {
    let table = table();
    let decoder = Decoder::new(&table);
    let cases = [
        (0xF9400020, KindTag::LoadStore),  // ldr x0, [x1]
        (0x8B020020, KindTag::DataProcReg), // add x0, x1, x2
        (0x4EA21C20, KindTag::Simd),       // mov v0.16b, v1.16b
        (0x1E602820, KindTag::Float),      // fadd d0, d1, d0
    ];
    for (raw, tag) in cases {
        let instr = decoder.fast_decode(raw);
        assert_eq!(instr.tag(), tag, "{:#010x}", raw);
        assert_eq!(instr.opcode(), Opcode::UnDecoded);
        assert_eq!(instr.assemble(&table), Ok(raw));
    }
}

#[test]
fn test_fast_decode_unallocated_classes() {
    let table = table();
    let decoder = Decoder::new(&table);
    for class in 0..4u32 {
        let instr = decoder.fast_decode((class << 25) | 0x1234);
        assert!(instr.is_invalid());
    }
}

// ========== 往返 ==========

#[test]
fn test_samples_round_trip() {
    let table = table();
    let decoder = Decoder::new(&table);
    for &(raw, _) in SAMPLES {
        let instr = decoder.decode(raw);
        assert_eq!(instr.source(), Source::Fields, "{}", instr);
        assert_eq!(instr.assemble(&table), Ok(raw), "{}", instr);
    }
}

#[test]
fn test_round_trip_over_free_bits() {
    let table = table();
    let decoder = Decoder::new(&table);
    let patterns = [0, u32::MAX, 0xA5A5_A5A5, 0x5A5A_5A5A, 0x1234_5678, 0x8000_0001];
    for def in table.entries() {
        for pattern in patterns {
            let raw = def.value | (pattern & !def.mask);
            let instr = decoder.decode(raw);
            assert_eq!(instr.opcode(), def.opcode, "{:#010x}", raw);
            assert_eq!(instr.assemble(&table), Ok(raw), "{} {:#010x}", def.name, raw);
        }
    }
}

// ========== disassemble 流程 ==========

#[test]
fn test_disassemble_into_variant() {
    let table = table();
    let decoder = Decoder::new(&table);

    let mut instr = Instruction::branch();
    assert_eq!(instr.opcode(), Opcode::UnDecoded);
    instr.disassemble(&decoder, 0x54000201).unwrap();
    assert_eq!(instr.opcode(), Opcode::BCond);
    assert_eq!(instr.source(), Source::Fields);
}

#[test]
fn test_disassemble_family_mismatch() {
    let table = table();
    let decoder = Decoder::new(&table);

    // SVC 属于 System 指令族，但不由 SystemInstr 处理
    let mut instr = Instruction::system();
    assert_eq!(
        instr.disassemble(&decoder, 0xD4000001),
        Err(CodecError::FamilyMismatch {
            opcode: Opcode::Svc,
            kind: KindTag::System,
        })
    );
    assert_eq!(instr.opcode(), Opcode::UnDecoded);

    let mut instr = Instruction::exception_gen();
    instr.disassemble(&decoder, 0xD4000001).unwrap();
    assert_eq!(instr.opcode(), Opcode::Svc);
}

#[test]
fn test_disassemble_unrecognized() {
    let table = table();
    let decoder = Decoder::new(&table);
    let mut instr = Instruction::pc_rel_addr();
    assert_eq!(
        instr.disassemble(&decoder, 0x14000010),
        Err(CodecError::Unrecognized { raw: 0x14000010 })
    );
    assert!(instr.is_invalid());
    // 原样输出
    assert_eq!(instr.assemble(&table), Ok(0x14000010));
}

#[test]
fn test_disassemble_after_decode_keeps_backup() {
    let table = table();
    let decoder = Decoder::new(&table);
    let mut instr = decoder.decode(0x14000010);
    instr.disassemble(&decoder, 0xDEADBEEF).unwrap();
    assert_eq!(instr.source(), Source::Backup);
    assert_eq!(instr.opcode(), Opcode::B);
    assert_eq!(instr.assemble(&table), Ok(0xDEADBEEF));
}

#[test]
fn test_generic_identifies_opcode_only() {
    let table = table();
    let decoder = Decoder::new(&table);
    let mut instr = Instruction::generic();
    instr.disassemble(&decoder, 0x910043E0).unwrap();
    assert_eq!(instr.opcode(), Opcode::AddImm64);
    assert_eq!(instr.source(), Source::Backup);
    assert_eq!(instr.assemble(&table), Ok(0x910043E0));
}

// ========== 修改后重新编码 ==========

#[test]
fn test_mutate_branch() {
    let table = table();
    let mut instr = Decoder::new(&table).decode(0x54000201);
    let branch = instr.as_branch_mut().unwrap();
    branch.set_cond(Condition::Eq);
    branch.set_offset(-8);
    assert_eq!(instr.assemble(&table), Ok(0x54FFFFC0));
}

#[test]
fn test_mutate_link_selects_opcode() {
    let table = table();
    let decoder = Decoder::new(&table);

    let mut instr = decoder.decode(0x14000010);
    instr.as_branch_mut().unwrap().set_link(true);
    let word = instr.assemble(&table).unwrap();
    assert_eq!(word, 0x94000010);
    let again = decoder.decode(word);
    assert_eq!(again.opcode(), Opcode::Bl);
    assert!(again.as_branch().unwrap().is_link());

    let mut instr = decoder.decode(0xD63F0100);
    instr.as_branch_mut().unwrap().set_link(false);
    assert_eq!(instr.assemble(&table), Ok(0xD61F0100));
}

#[test]
fn test_mutate_branch_rejects_unencodable_fields() {
    let table = table();
    let decoder = Decoder::new(&table);

    let mut instr = decoder.decode(0x54000201);
    instr.as_branch_mut().unwrap().set_link(true);
    assert_eq!(
        instr.assemble(&table),
        Err(CodecError::UnsupportedAssembly {
            opcode: Opcode::BCond
        })
    );

    let mut instr = decoder.decode(0x14000010);
    instr.as_branch_mut().unwrap().set_cond(Condition::Eq);
    assert_eq!(
        instr.assemble(&table),
        Err(CodecError::UnsupportedAssembly { opcode: Opcode::B })
    );
}

#[test]
fn test_mutate_add_sub_selects_opcode() {
    let table = table();
    let mut instr = Decoder::new(&table).decode(0x910043E0);
    let add = instr.as_add_sub_imm_mut().unwrap();
    add.set_sub(true);
    add.set_imm(0x20);
    // sub sp 被改写为 sub x0, sp, #0x20
    assert_eq!(instr.assemble(&table), Ok(0xD10083E0));
    assert_eq!(instr.to_string(), "sub x0, sp, #0x20");
}

#[test]
fn test_mutate_system_register() {
    let table = table();
    let mut instr = Decoder::new(&table).decode(0xD53BD040);
    let sys = instr.as_system_mut().unwrap();
    sys.set_system_register(SystemRegister::CNTVCT_EL0);
    sys.set_rt(GeneralRegister::x(2));
    assert_eq!(instr.assemble(&table), Ok(0xD53BE042));
}

#[test]
fn test_template_conflict_is_detected() {
    let table = table();
    let mut instr = Decoder::new(&table).decode(0xD53BD040);
    // op0 = 0 会清掉 MRS 固定为 1 的位 20
    instr
        .as_system_mut()
        .unwrap()
        .set_system_register(SystemRegister::from_parts(0, 3, 13, 0, 2));
    assert!(matches!(
        instr.assemble(&table),
        Err(CodecError::TemplateConflict {
            opcode: Opcode::Mrs,
            ..
        })
    ));
}

#[test]
fn test_absolute_target_needs_rebase() {
    let table = table();
    let mut instr = Decoder::new(&table).decode(0x94000010);
    instr.as_branch_mut().unwrap().set_target(0x2000);
    assert_eq!(
        instr.assemble(&table),
        Err(CodecError::UnresolvedTarget { target: 0x2000 })
    );
    instr.as_branch_mut().unwrap().rebase(0x1000);
    assert_eq!(instr.assemble(&table), Ok(0x94000400));
}

// ========== 汇编失败路径 ==========

#[test]
fn test_assemble_into_writes_only_on_success() {
    let table = table();
    let mut instr = Decoder::new(&table).decode(0x14000010);
    let mut slot = 0u32;
    instr.assemble_into(&table, &mut slot).unwrap();
    assert_eq!(slot, 0x14000010);

    instr.as_branch_mut().unwrap().set_offset(2);
    assert!(instr.assemble_into(&table, &mut slot).is_err());
    assert_eq!(slot, 0x14000010);
}

#[test]
fn test_empty_instruction_cannot_assemble() {
    let table = table();
    assert_eq!(
        Instruction::add_sub_imm().assemble(&table),
        Err(CodecError::UnsupportedAssembly {
            opcode: Opcode::UnDecoded
        })
    );
}

#[test]
fn test_missing_table_entry() {
    let full = table();
    let instr = Decoder::new(&full).decode(0x94000010);
    let only_b = InstrDef::new(Opcode::B, "B", 0xFC000000, 0x14000000, InstrFamily::Branch);
    let small = OpcodeTable::new(&[only_b]).unwrap();
    assert_eq!(
        instr.assemble(&small),
        Err(CodecError::MissingTableEntry { opcode: Opcode::Bl })
    );
}

// ========== 显示 ==========

#[test]
fn test_display() {
    let table = table();
    let decoder = Decoder::new(&table);
    let text = |raw| decoder.fast_decode(raw).to_string();
    assert_eq!(text(0x54000201), "b.ne #0x40");
    assert_eq!(text(0xB5FFFFE9), "cbnz x9, #-0x4");
    assert_eq!(text(0x36180042), "tbz w2, #3, #0x8");
    assert_eq!(text(0xD65F03C0), "ret");
    assert_eq!(text(0xD63F0100), "blr x8");
    assert_eq!(text(0xD4001001), "svc #0x80");
    assert_eq!(text(0xD53BD040), "mrs x0, s3_3_c13_c0_2");
    assert_eq!(text(0xD51B4203), "msr s3_3_c4_c2_0, x3");
    assert_eq!(text(0xB0000000), "adrp x0, #0x1000");
    assert_eq!(text(0x910043E0), "add x0, sp, #0x10");
    assert_eq!(text(0xF100403F), "subs xzr, x1, #0x10");
    assert_eq!(text(0x00000000), ".inst 0x00000000");
}

#[test]
fn test_decode_block() {
    let table = table();
    let words = [0xD10043FF, 0x94000010, 0xF9400020, 0xD65F03C0];
    let block = Decoder::new(&table).decode_block(&words);
    let opcodes: Vec<Opcode> = block.iter().map(|i| i.opcode()).collect();
    assert_eq!(
        opcodes,
        vec![Opcode::SubImm64, Opcode::Bl, Opcode::UnDecoded, Opcode::Ret]
    );
}

#[test]
fn test_convenience_decode() {
    assert_eq!(decode(0xD65F03C0).opcode(), Opcode::Ret);
}
