use dartlift::prelude::*;

/// A representative function body touching most recognizers.
fn program() -> (RuntimeEnv, Vec<Insn>) {
    let mut env = RuntimeEnv::default();
    env.pool.insert(0x28, PoolEntry::smi(42)).unwrap();
    env.pool
        .insert(0x30, PoolEntry::Str("hello".to_string()))
        .unwrap();
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
    env.functions
        .insert(Function::stub(
            "WriteBarrier",
            0xc000,
            FunctionKind::WriteBarrierStub { array: false },
        ))
        .unwrap();

    let insns = op::seq(
        0x1000,
        vec![
            op::stp_pre(Reg::FP, Reg::LR, Reg::SP, -16),
            op::mov(Reg::FP, Reg::SP),
            op::sub_imm(Reg::SP, Reg::SP, 0x10),
            op::ldr_off(TMP, THR, 0x38),
            op::cmp(Reg::SP, TMP),
            op::b_cond(Cond::Ls, 0x2000),
            op::ldr_off(Reg::x(0), PP, 0x28),
            op::movz_w(Reg::x(1), (cid::SMI.0 as i64) << 1),
            op::tbz(Reg::x(0), 0, 0x1028),
            op::ldrh_off(Reg::x(1), Reg::x(0), 1),
            op::ldr_off(Reg::x(2), PP, 0x30),
            op::str_off(Reg::x(2), Reg::x(0), 0x10),
            op::bl(0xc000),
            op::mov(Reg::x(0), Reg::x(3)),
            op::ldr_off(TMP, THR, 0x680),
            op::blr(TMP),
            op::mov(Reg::SP, Reg::FP),
            op::ldp_post(Reg::FP, Reg::LR, Reg::SP, 16),
            op::ret(),
        ],
    );
    (env, insns)
}

fn check_node(il: &Il<'_>) {
    let range = il.range();
    assert!(range.start < range.end);
    assert_eq!((range.end - range.start) % 4, 0);

    // Rendering is total.
    let _ = il.to_string();

    match il.op() {
        IlOp::LoadTaggedClassIdMayBeSmi {
            load_tag,
            branch,
            load_cid,
            ..
        } => {
            for child in [load_tag.as_ref(), branch.as_ref(), load_cid.as_ref()] {
                assert!(range.covers(child.range()));
                check_node(child);
            }
        }
        IlOp::CallLeafRuntime { moves, .. } => {
            for child in moves {
                assert!(range.covers(child.range()));
                check_node(child);
            }
        }
        _ => {}
    }
}

#[test]
fn ranges_are_wellformed_and_monotonic() {
    let (env, insns) = program();
    let mut lifter = Lifter::new(&env);
    let il = lifter.lift(&insns).unwrap();

    assert!(!il.is_empty());
    for node in &il {
        check_node(node);
    }
    for pair in il.windows(2) {
        assert!(pair[0].range().start <= pair[1].range().start);
    }
}

#[test]
fn lifting_is_deterministic_across_runs() {
    let (env, insns) = program();
    let mut lifter = Lifter::new(&env);

    let first: Vec<String> = lifter.lift(&insns).unwrap().iter().map(Il::to_string).collect();
    let second: Vec<String> = lifter.lift(&insns).unwrap().iter().map(Il::to_string).collect();
    assert_eq!(first, second);

    let expected = vec![
        "EnterFrame",
        "AllocateStack(16)",
        "CheckStackOverflow(0x2000)",
        "x0 = 42",
        "w1 = LoadTaggedClassIdMayBeSmi(x0)",
        "x2 = \"hello\"",
        "StoreField: x0->field_10 = x2",
        "WriteBarrier(x0, x2)",
        "CallRuntime_double_to_int(double) -> int",
        "LeaveFrame",
        "ret",
    ];
    assert_eq!(first, expected);
}
