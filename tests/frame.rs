use dartlift::prelude::*;

fn lift(env: &RuntimeEnv, insns: Vec<Insn>) -> Vec<Il<'_>> {
    let mut lifter = Lifter::new(env);
    lifter.lift(&insns).expect("stream is well-formed")
}

#[test]
fn prolog_collapses_to_enter_frame() {
    let env = RuntimeEnv::default();
    let insns = op::seq(
        0x1000,
        vec![
            op::stp_pre(Reg::FP, Reg::LR, Reg::SP, -16),
            op::mov(Reg::FP, Reg::SP),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::EnterFrame);
    assert_eq!(*il[0].range(), AddrRange::new(0x1000, 0x1008));
    assert_eq!(il[0].to_string(), "EnterFrame");
}

#[test]
fn full_prologue_and_epilogue() {
    let env = RuntimeEnv::default();
    let insns = op::seq(
        0x1000,
        vec![
            op::stp_pre(Reg::FP, Reg::LR, Reg::SP, -16),
            op::mov(Reg::FP, Reg::SP),
            op::sub_imm(Reg::SP, Reg::SP, 0x20),
            op::ldr_off(TMP, THR, 0x38),
            op::cmp(Reg::SP, TMP),
            op::b_cond(Cond::Ls, 0x2000),
            op::mov(Reg::SP, Reg::FP),
            op::ldp_post(Reg::FP, Reg::LR, Reg::SP, 16),
            op::ret(),
        ],
    );

    let il = lift(&env, insns);

    let kinds: Vec<IlKind> = il.iter().map(Il::kind).collect();
    assert_eq!(
        kinds,
        vec![
            IlKind::EnterFrame,
            IlKind::AllocateStack,
            IlKind::CheckStackOverflow,
            IlKind::LeaveFrame,
            IlKind::Return,
        ]
    );
    assert_eq!(il[1].to_string(), "AllocateStack(32)");
    assert_eq!(il[2].to_string(), "CheckStackOverflow(0x2000)");
    assert_eq!(il[3].to_string(), "LeaveFrame");
    assert_eq!(il[4].to_string(), "ret");
}

#[test]
fn prologue_argument_spills_collapse_to_setup_parameters() {
    let env = RuntimeEnv::default();
    let insns = op::seq(
        0x1000,
        vec![
            op::stp_pre(Reg::FP, Reg::LR, Reg::SP, -16),
            op::mov(Reg::FP, Reg::SP),
            op::stur_off(Reg::x(1), Reg::FP, -0x8),
            op::stur_off(Reg::x(2), Reg::FP, -0x10),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il.len(), 2);
    assert_eq!(il[1].kind(), IlKind::SetupParameters);
    assert_eq!(
        il[1].to_string(),
        "SetupParameters(arg0 -> fp-0x8, arg1 -> fp-0x10)"
    );
    assert_eq!(*il[1].range(), AddrRange::new(0x1008, 0x1010));
}

#[test]
fn spills_outside_the_prologue_are_not_parameter_setup() {
    let env = RuntimeEnv::default();
    // No frame was entered, so this is not a prologue spill.
    let insns = op::seq(0x1000, vec![op::stur_off(Reg::x(1), Reg::FP, -0x8)]);

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::Unknown);
}

#[test]
fn register_save_and_restore() {
    let env = RuntimeEnv::default();
    let insns = op::seq(
        0x1000,
        vec![
            op::str_pre(Reg::x(0), Reg::SP, -16),
            op::ldr_post(Reg::x(0), Reg::SP, 16),
        ],
    );

    let il = lift(&env, insns);

    assert_eq!(il[0].kind(), IlKind::SaveRegister);
    assert_eq!(il[0].to_string(), "SaveRegister(x0)");
    assert_eq!(il[1].kind(), IlKind::RestoreRegister);
    assert_eq!(il[1].to_string(), "RestoreRegister(x0)");
}

#[test]
fn empty_stream_lifts_to_empty_il() {
    let env = RuntimeEnv::default();
    assert!(lift(&env, vec![]).is_empty());
}

#[test]
fn unmatched_instructions_become_unknown_nodes() {
    let env = RuntimeEnv::default();
    let insns = op::seq(0x1000, vec![op::cmp(Reg::x(0), Reg::x(1))]);

    let il = lift(&env, insns);

    assert_eq!(il.len(), 1);
    assert_eq!(il[0].kind(), IlKind::Unknown);
    assert_eq!(il[0].to_string(), "unknown: cmp");
    assert_eq!(*il[0].range(), AddrRange::new(0x1000, 0x1004));
}

#[test]
fn unaligned_streams_are_rejected() {
    let env = RuntimeEnv::default();
    let mut lifter = Lifter::new(&env);

    let err = lifter.lift(&[op::ret().at(0x1001)]).unwrap_err();
    assert_eq!(err, LiftError::UnalignedAddress(0x1001));
}

#[test]
fn backwards_streams_are_rejected() {
    let env = RuntimeEnv::default();
    let mut lifter = Lifter::new(&env);

    let insns = vec![op::ret().at(0x1004), op::ret().at(0x1000)];
    let err = lifter.lift(&insns).unwrap_err();
    assert_eq!(err, LiftError::NonMonotonicAddress(0x1000));
}
