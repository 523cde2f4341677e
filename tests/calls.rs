use dartlift::prelude::*;

fn lift(env: &RuntimeEnv, insns: Vec<Insn>) -> Vec<Il<'_>> {
    let mut lifter = Lifter::new(env);
    lifter.lift(&insns).expect("stream is well-formed")
}

#[test]
fn leaf_runtime_call_folds_its_parameter_moves() {
    let mut env = RuntimeEnv::default();
    env.thread
        .insert_leaf(
            0x680,
            LeafFunction {
                name: "double_to_int".to_string(),
                ret: "int".to_string(),
                params: vec!["double".to_string()],
            },
        )
        .unwrap();

    let insns = op::seq(
        0x4000,
        vec![
            op::mov(Reg::x(0), Reg::x(3)),
            op::mov(Reg::x(1), Reg::x(4)),
            op::ldr_off(TMP, THR, 0x680),
            op::blr(TMP),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::CallLeafRuntime);
    assert_eq!(*il[0].range(), AddrRange::new(0x4000, 0x4010));
    assert_eq!(il[0].to_string(), "CallRuntime_double_to_int(double) -> int");

    let IlOp::CallLeafRuntime { thr_off, moves, .. } = il[0].op() else {
        panic!("expected a leaf call payload");
    };
    assert_eq!(*thr_off, 0x680);
    assert_eq!(moves.len(), 2);
    assert_eq!(moves[0].to_string(), "x0 = x3");
    assert_eq!(moves[1].to_string(), "x1 = x4");
    for folded in moves {
        assert_eq!(folded.kind(), IlKind::MoveReg);
        assert!(il[0].range().covers(folded.range()));
    }
}

#[test]
fn leaf_runtime_call_with_an_unknown_offset_still_renders() {
    let env = RuntimeEnv::default();
    let insns = op::seq(0x4000, vec![op::ldr_off(TMP, THR, 0x68), op::blr(TMP)]);

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].to_string(), "CallRuntime_thr_0x68() -> ?");
}

#[test]
fn unresolved_direct_call_keeps_the_raw_address() {
    let env = RuntimeEnv::default();
    let insns = op::seq(0x4000, vec![op::bl(0xdeadbeef)]);

    let il = lift(&env, insns);

    assert_eq!(il[0].kind(), IlKind::Call);
    let IlOp::Call { target, addr } = il[0].op() else {
        panic!("expected a call payload");
    };
    assert!(target.is_none());
    assert_eq!(*addr, 0xdeadbeef);
    assert_eq!(il[0].to_string(), "r0 = call 0xdeadbeef");
}

#[test]
fn resolved_direct_call_names_the_callee() {
    let mut env = RuntimeEnv::default();
    env.functions
        .insert(Function::new("main", 0x8000, 0x100))
        .unwrap();
    let insns = op::seq(0x4000, vec![op::bl(0x8000)]);

    let il = lift(&env, insns);

    assert_eq!(il[0].to_string(), "r0 = main()");
}

#[test]
fn dispatch_table_call_with_a_selector_offset() {
    let env = RuntimeEnv::default();
    let insns = op::seq(
        0x4000,
        vec![
            op::add_imm(GDT_CID_REG, GDT_CID_REG, 0xf48),
            op::ldr_reg(GDT_CID_REG, DISPATCH_TABLE_REG, GDT_CID_REG, Extend::Lsl, 3),
            op::blr(GDT_CID_REG),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::GdtCall);
    assert_eq!(*il[0].range(), AddrRange::new(0x4000, 0x400c));
    assert_eq!(il[0].to_string(), "r0 = GDT[cid + 0xf48]()");
}

#[test]
fn dispatch_table_call_without_an_offset() {
    let env = RuntimeEnv::default();
    let insns = op::seq(
        0x4000,
        vec![
            op::ldr_reg(GDT_CID_REG, DISPATCH_TABLE_REG, GDT_CID_REG, Extend::Lsl, 3),
            op::blr(GDT_CID_REG),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].to_string(), "r0 = GDT[cid + 0x0]()");
}

#[test]
fn closure_call_reads_the_staged_arguments_descriptor() {
    let mut env = RuntimeEnv::default();
    env.pool
        .insert(
            0x50,
            PoolEntry::ArgsDesc {
                n_args: 2,
                n_type_args: 0,
            },
        )
        .unwrap();
    let insns = op::seq(
        0x4000,
        vec![
            op::ldr_off(ARGS_DESC_REG, PP, 0x50),
            op::ldur_off(TMP, Reg::x(0), CLOSURE_ENTRY_OFFSET),
            op::blr(TMP),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 2);
    assert_eq!(il[0].kind(), IlKind::LoadValue);
    assert_eq!(il[1].kind(), IlKind::ClosureCall);
    assert_eq!(il[1].to_string(), "r0 = ClosureCall(args: 2, typeArgs: 0)");
}

#[test]
fn allocation_stub_call_becomes_inline_allocation() {
    let mut env = RuntimeEnv::default();
    env.classes
        .insert(Class {
            id: 100,
            name: "Foo".to_string(),
            instance_size: 16,
        })
        .unwrap();
    env.functions
        .insert(Function::stub(
            "AllocateFoo",
            0x9000,
            FunctionKind::AllocateStub { cid: 100 },
        ))
        .unwrap();
    let insns = op::seq(0x4000, vec![op::bl(0x9000)]);

    let il = lift(&env, insns);

    assert_eq!(il[0].kind(), IlKind::AllocateObject);
    assert_eq!(il[0].to_string(), "x0 = inline_AllocateFoo()");
}

#[test]
fn async_prologue_initialization() {
    let mut env = RuntimeEnv::default();
    let tid = env.types.intern("Future<int>");
    env.pool.insert(0x40, PoolEntry::Type(tid)).unwrap();
    env.functions
        .insert(Function::stub("InitAsync", 0xa000, FunctionKind::InitAsyncStub))
        .unwrap();
    let insns = op::seq(
        0x4000,
        vec![op::ldr_off(Reg::x(0), PP, 0x40), op::bl(0xa000)],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::InitAsync);
    assert_eq!(il[0].to_string(), "InitAsync(Future<int>)");
}

#[test]
fn type_check_through_a_test_stub() {
    let mut env = RuntimeEnv::default();
    let tid = env.types.intern("String");
    env.pool.insert(0x58, PoolEntry::Type(tid)).unwrap();
    env.functions
        .insert(Function::stub(
            "IsType_String",
            0xb000,
            FunctionKind::TypeTestStub,
        ))
        .unwrap();
    let insns = op::seq(
        0x4000,
        vec![op::ldr_off(Reg::x(8), PP, 0x58), op::bl(0xb000)],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::TestType);
    assert_eq!(il[0].to_string(), "x0 = x0 as String");
}
