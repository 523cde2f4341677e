use dartlift::prelude::*;

fn lift(env: &RuntimeEnv, insns: Vec<Insn>) -> Vec<Il<'_>> {
    let mut lifter = Lifter::new(env);
    lifter.lift(&insns).expect("stream is well-formed")
}

#[test]
fn pool_load_of_a_tagged_small_integer() {
    let mut env = RuntimeEnv::default();
    env.pool.insert(0x28, PoolEntry::smi(42)).unwrap();
    let insns = op::seq(0x1000, vec![op::ldr_off(Reg::x(0), PP, 0x28)]);

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::LoadValue);
    let IlOp::LoadValue { dst, item } = il[0].op() else {
        panic!("expected a LoadValue payload");
    };
    assert_eq!(*dst, Reg::x(0));
    assert_eq!(item.storage, VarStorage::Pool(0x28));
    assert_eq!(item.name(), "PP+0x28");

    let value = item.value().expect("pool loads carry a value");
    assert_eq!(value.as_integer(), Some((Some(84), cid::SMI)));
    assert_eq!(value.int_value(), Some(42));
    assert_eq!(il[0].to_string(), "x0 = 42");
}

#[test]
fn pool_loads_of_other_constants() {
    let mut env = RuntimeEnv::default();
    env.pool.insert(0x8, PoolEntry::Null).unwrap();
    env.pool.insert(0x10, PoolEntry::Bool(true)).unwrap();
    env.pool
        .insert(0x18, PoolEntry::Str("hello".to_string()))
        .unwrap();
    env.pool.insert(0x20, PoolEntry::Double(0.5)).unwrap();
    env.pool
        .insert(0x30, PoolEntry::UnlinkedCall {
            selector: "foo".to_string(),
        })
        .unwrap();
    env.pool.insert(0x38, PoolEntry::Class(100)).unwrap();

    let insns = op::seq(
        0x1000,
        vec![
            op::ldr_off(Reg::x(0), PP, 0x8),
            op::ldr_off(Reg::x(1), PP, 0x10),
            op::ldr_off(Reg::x(2), PP, 0x18),
            op::ldr_off(Reg::d(0), PP, 0x20),
            op::ldr_off(Reg::x(3), PP, 0x30),
            op::ldr_off(Reg::x(4), PP, 0x38),
        ],
    );

    let rendered: Vec<String> = lift(&env, insns).iter().map(Il::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "x0 = Null",
            "x1 = true",
            "x2 = \"hello\"",
            "d0 = 0.5",
            "x3 = UnlinkedCall_foo",
            "x4 = cid_100",
        ]
    );
}

#[test]
fn missing_pool_entries_degrade_to_placeholders() {
    let env = RuntimeEnv::default();
    let insns = op::seq(0x1000, vec![op::ldr_off(Reg::x(0), PP, 0x48)]);

    let il = lift(&env, insns);

    let IlOp::LoadValue { item, .. } = il[0].op() else {
        panic!("expected a LoadValue payload");
    };
    let value = item.value().unwrap();
    assert_eq!(value.type_id(), cid::ILLEGAL);
    assert_eq!(value.raw_type_id(), TypeId::EXPRESSION);
    assert_eq!(il[0].to_string(), "x0 = PP_0x48");
}

#[test]
fn pool_stores_get_their_own_kind() {
    let env = RuntimeEnv::default();
    let insns = op::seq(0x1000, vec![op::str_off(Reg::x(1), PP, 0x30)]);

    let il = lift(&env, insns);

    assert_eq!(il[0].kind(), IlKind::StoreObjectPool);
    assert_eq!(il[0].to_string(), "PP+0x30 = x1");
}

#[test]
fn wide_immediates_fold_their_movk_refinements() {
    let env = RuntimeEnv::default();
    let insns = op::seq(
        0x1000,
        vec![
            op::movz(Reg::x(0), 0x1234, 0),
            op::movk(Reg::x(0), 0x5, 16),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::LoadValue);
    assert_eq!(*il[0].range(), AddrRange::new(0x1000, 0x1008));
    assert_eq!(il[0].to_string(), format!("x0 = {}", 0x1234 + (0x5 << 16)));
}

#[test]
fn register_moves_track_the_moved_value() {
    let mut env = RuntimeEnv::default();
    env.pool.insert(0x28, PoolEntry::smi(7)).unwrap();
    let insns = op::seq(
        0x1000,
        vec![
            op::ldr_off(Reg::x(1), PP, 0x28),
            op::mov(Reg::x(0), Reg::x(1)),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il[1].kind(), IlKind::MoveReg);
    assert_eq!(il[1].to_string(), "x0 = x1");
}

#[test]
fn fmov_moves_track_across_register_files() {
    let mut env = RuntimeEnv::default();
    env.pool.insert(0x20, PoolEntry::Double(0.5)).unwrap();
    let insns = op::seq(
        0x1000,
        vec![
            op::ldr_off(Reg::d(0), PP, 0x20),
            op::fmov(Reg::x(1), Reg::d(0)),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il[1].kind(), IlKind::MoveReg);
    assert_eq!(il[1].to_string(), "x1 = d0");
}

#[test]
fn orr_from_zero_register_is_a_move() {
    let env = RuntimeEnv::default();
    let insns = op::seq(0x1000, vec![op::orr(Reg::x(0), Reg::ZR, Reg::x(5))]);

    let il = lift(&env, insns);

    assert_eq!(il[0].kind(), IlKind::MoveReg);
    assert_eq!(il[0].to_string(), "x0 = x5");
}

#[test]
fn thread_slot_loads_use_the_layout_name() {
    let mut env = RuntimeEnv::default();
    env.thread.insert_field(0x68, "isolate").unwrap();
    let insns = op::seq(
        0x1000,
        vec![
            op::ldr_off(Reg::x(0), THR, 0x68),
            op::ldr_off(Reg::x(1), THR, 0x70),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il[0].to_string(), "x0 = thr_isolate");
    assert_eq!(il[1].to_string(), "x1 = thr_0x70");
    let IlOp::LoadValue { item, .. } = il[0].op() else {
        panic!("expected a LoadValue payload");
    };
    assert_eq!(item.storage, VarStorage::Thread(0x68));
    assert_eq!(item.name(), "THR+0x68");
}
