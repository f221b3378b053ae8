// Integration tests for the stack simulator

use pretty_assertions::assert_eq;
use stacksmash::abi::{CallingConvention, Cleanup, ConventionKind, ParamLocation};
use stacksmash::memory::stack::{FieldKind, FrameDecl};
use stacksmash::memory::{ByteOrder, GrowthDirection};
use stacksmash::simulator::constants::CALL_SITE_BASE;
use stacksmash::simulator::{SimConfig, SimError, Simulation};

fn classic() -> FrameDecl {
    FrameDecl::new("function")
        .local("buffer1", 5)
        .local("buffer2", 10)
        .param("a", 4, 1)
        .param("b", 4, 2)
        .param("c", 4, 3)
}

fn summary(pairs: &[(&str, usize)]) -> Vec<(String, usize)> {
    pairs.iter().map(|(f, n)| (f.to_string(), *n)).collect()
}

#[test]
fn test_classic_26_byte_overflow() {
    let config = SimConfig::new(ConventionKind::StackOnly, 4, GrowthDirection::TowardLow, 256);
    let mut sim = Simulation::new(config).unwrap();
    sim.call(&classic()).unwrap();

    let report = sim.write_buffer("buffer1", &[0x41; 26]).unwrap();

    assert_eq!(
        report.summary(),
        summary(&[
            ("buffer1", 8),
            ("buffer2", 12),
            ("savedFramePointer", 4),
            ("savedReturnAddress", 2),
        ])
    );
    assert_eq!(report.bytes_written, 26);
    assert_eq!(report.hijacked_return_address, None);
    assert_eq!(report.clobbered_frame_pointer, Some(0x4141_4141));

    let ret = report.touched(&FieldKind::SavedReturnAddress).unwrap();
    assert_eq!(ret.offsets, 24..26);
    assert_eq!(ret.bytes, vec![0x41, 0x41]);
}

#[test]
fn test_partial_return_overwrite_still_redirects() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    sim.call(&classic()).unwrap();
    sim.write_buffer("buffer1", &[0x41; 26]).unwrap();

    // Low two bytes replaced, high two bytes of the call site survive
    let outcome = sim.ret().unwrap();
    assert_eq!(outcome.return_address, (CALL_SITE_BASE & 0xffff_0000) | 0x4141);
    assert!(outcome.is_hijacked());
    assert_eq!(outcome.caller_frame_pointer, 0x4141_4141);
    assert_eq!(sim.stack().instruction_pointer(), outcome.return_address);
}

#[test]
fn test_overflow_into_adjacent_local() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    sim.call(&FrameDecl::new("f").local("buffer1", 8).local("buffer2", 10))
        .unwrap();

    let report = sim.write_buffer("buffer1", &[0x42; 8 + 4]).unwrap();

    assert_eq!(report.summary(), summary(&[("buffer1", 8), ("buffer2", 4)]));
    let buffer2 = report.touched(&FieldKind::Local("buffer2".into())).unwrap();
    assert_eq!(buffer2.offsets, 8..12);
    let frame = sim.current_frame().unwrap();
    assert_eq!(buffer2.addresses.start, frame.local("buffer2").unwrap().address);
}

#[test]
fn test_padding_counts_as_the_buffer() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    sim.call(&classic()).unwrap();

    // 5 declared + 4: three bytes land in buffer1's alignment padding
    let report = sim.write_buffer("buffer1", &[0x42; 9]).unwrap();
    assert_eq!(report.summary(), summary(&[("buffer1", 8), ("buffer2", 1)]));
    assert!(report.overflowed());
}

#[test]
fn test_control_hijack_decodes_last_word() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    sim.call(&FrameDecl::new("vulnerable").local("buffer", 5))
        .unwrap();

    let mut payload = vec![0x90; 8 + 4];
    payload.extend_from_slice(&[0xef, 0xbe, 0xad, 0xde]);
    let report = sim.write_buffer("buffer", &payload).unwrap();

    assert_eq!(report.hijacked_return_address, Some(0xdead_beef));

    let outcome = sim.ret().unwrap();
    assert_eq!(outcome.return_address, 0xdead_beef);
    assert!(outcome.is_hijacked());
    assert_eq!(sim.stack().instruction_pointer(), 0xdead_beef);
}

#[test]
fn test_big_endian_hijack() {
    let config = SimConfig::default().with_byte_order(ByteOrder::Big);
    let mut sim = Simulation::new(config).unwrap();
    sim.call(&FrameDecl::new("vulnerable").local("buffer", 5))
        .unwrap();

    let mut payload = vec![0x90; 12];
    payload.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    let report = sim.write_buffer("buffer", &payload).unwrap();
    assert_eq!(report.hijacked_return_address, Some(0xdead_beef));
}

#[test]
fn test_call_ret_round_trip() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    sim.call(&FrameDecl::new("main").local("argc", 4)).unwrap();
    let fp = sim.stack().frame_pointer();
    let sp = sim.stack().stack_pointer();

    let return_address = sim.call(&classic()).unwrap().return_address;
    let outcome = sim.ret().unwrap();

    assert_eq!(outcome.return_address, return_address);
    assert_eq!(outcome.caller_frame_pointer, fp);
    assert!(!outcome.is_hijacked());
    assert_eq!(sim.stack().frame_pointer(), fp);
    assert_eq!(sim.stack().stack_pointer(), sp);
    assert_eq!(sim.current_frame().unwrap().function, "main");
}

#[test]
fn test_stdcall_callee_cleans() {
    let config = SimConfig::default().with_cleanup(Cleanup::Callee);
    let mut sim = Simulation::new(config).unwrap();
    sim.call(&classic()).unwrap();

    let outcome = sim.ret().unwrap();
    assert_eq!(outcome.cleaned_by, Cleanup::Callee);
    assert_eq!(sim.stack().stack_pointer(), 256);
}

#[test]
fn test_register_convention_places_seventh_on_stack() {
    let sizes = [8; 7];
    let sysv = CallingConvention::system_v().layout_parameters(&sizes);
    for (i, placement) in sysv.iter().take(6).enumerate() {
        assert_eq!(placement.location, ParamLocation::Register(i));
    }
    assert_eq!(sysv[6].location, ParamLocation::StackOffset(0));

    let cdecl = CallingConvention::cdecl();
    let stack_only = cdecl.layout_parameters(&[4; 7]);
    let offsets: Vec<ParamLocation> = stack_only.iter().map(|p| p.location).collect();
    assert_eq!(
        offsets,
        (0..7).map(|i| ParamLocation::StackOffset(i * 4)).collect::<Vec<_>>()
    );
    assert_eq!(cdecl.stack_push_order(&[4; 7]), vec![6, 5, 4, 3, 2, 1, 0]);
}

#[test]
fn test_register_convention_frame() {
    let config = SimConfig::new(
        ConventionKind::RegisterFirstSix,
        8,
        GrowthDirection::TowardLow,
        512,
    );
    let mut sim = Simulation::new(config).unwrap();
    let decl = ["a", "b", "c", "d", "e", "f", "g"]
        .iter()
        .enumerate()
        .fold(FrameDecl::new("seven").local("name", 16), |decl, (i, name)| {
            decl.param(*name, 8, i as u64 + 1)
        });
    let frame = sim.call(&decl).unwrap().clone();

    assert!(frame.params[..6].iter().all(|p| p.address.is_none()));
    let g = frame.param("g").unwrap();
    assert_eq!(g.address, Some(504));
    assert_eq!(sim.memory().read_word(504, 8).unwrap(), 7);
    assert_eq!(frame.total_size(), 16 + 2 * 8 + 8);
}

#[test]
fn test_upward_growth_never_reaches_return_address() {
    let config = SimConfig::new(ConventionKind::StackOnly, 4, GrowthDirection::TowardHigh, 256);
    let mut sim = Simulation::new(config).unwrap();
    sim.call(&classic()).unwrap();

    let report = sim.write_buffer("buffer2", &[0x41; 20]).unwrap();
    assert_eq!(report.summary(), summary(&[("buffer2", 12), ("buffer1", 8)]));
    assert_eq!(report.hijacked_return_address, None);

    let outcome = sim.ret().unwrap();
    assert!(!outcome.is_hijacked());
    assert_eq!(sim.stack().stack_pointer(), 0);
}

#[test]
fn test_clobbered_frame_pointer_reaches_caller_registers_only() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    sim.call(&FrameDecl::new("main").local("argc", 4)).unwrap();
    let main_return = sim.current_frame().unwrap().return_address;
    sim.call(&classic()).unwrap();

    // Full overwrite of both saved slots
    let report = sim.write_buffer("buffer1", &[0x41; 28]).unwrap();
    assert_eq!(report.clobbered_frame_pointer, Some(0x4141_4141));
    assert_eq!(report.hijacked_return_address, Some(0x4141_4141));

    let inner = sim.ret().unwrap();
    assert!(inner.is_hijacked());
    assert_eq!(inner.caller_frame_pointer, 0x4141_4141);
    assert_eq!(sim.stack().frame_pointer(), 0x4141_4141);

    // main's own slots are intact, so its return still goes home
    let outer = sim.ret().unwrap();
    assert_eq!(outer.return_address, main_return);
    assert!(!outer.is_hijacked());
    assert_eq!(outer.caller_frame_pointer, 256);
    assert!(sim.stack().is_empty());
    assert_eq!(sim.stack().stack_pointer(), 256);
}

#[test]
fn test_in_range_forged_frame_pointer_does_not_redirect_caller() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    sim.call(&FrameDecl::new("main").local("argc", 4)).unwrap();
    let main_return = sim.current_frame().unwrap().return_address;
    sim.call(&classic()).unwrap();

    let mut payload = vec![0x41; 20];
    payload.extend_from_slice(&[0x10, 0x00, 0x00, 0x00]);
    sim.write_buffer("buffer1", &payload).unwrap();

    assert_eq!(sim.ret().unwrap().caller_frame_pointer, 0x10);
    let outer = sim.ret().unwrap();
    assert_eq!(outer.return_address, main_return);
    assert_eq!(sim.stack().instruction_pointer(), main_return);
}

#[test]
fn test_overflow_into_stack_parameter() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    sim.call(&classic()).unwrap();

    let report = sim.write_buffer("buffer1", &[0x41; 32]).unwrap();
    assert_eq!(
        report.summary(),
        summary(&[
            ("buffer1", 8),
            ("buffer2", 12),
            ("savedFramePointer", 4),
            ("savedReturnAddress", 4),
            ("a", 4),
        ])
    );
    let a = report.touched(&FieldKind::Parameter("a".into())).unwrap();
    assert_eq!(a.offsets, 28..32);

    let frame = sim.current_frame().unwrap();
    let address = frame.param("a").unwrap().address.unwrap();
    assert_eq!(sim.memory().read_word(address, 4).unwrap(), 0x4141_4141);
    assert_eq!(sim.memory().read_word(address + 4, 4).unwrap(), 2);
}

#[test]
fn test_error_kinds() {
    let mut sim = Simulation::new(SimConfig::default()).unwrap();
    assert_eq!(sim.ret().unwrap_err(), SimError::EmptyStack);
    assert_eq!(sim.current_frame().unwrap_err(), SimError::EmptyStack);
    assert_eq!(sim.write_buffer("buffer1", b"A").unwrap_err(), SimError::EmptyStack);

    sim.call(&classic()).unwrap();
    assert_eq!(
        sim.write_buffer("buffer3", b"A").unwrap_err(),
        SimError::UnknownBuffer {
            name: "buffer3".to_string(),
            function: "function".to_string(),
        }
    );

    // buffer1 starts 40 bytes below the top of a 256-byte stack
    let before = sim.memory().clone();
    let err = sim.write_buffer("buffer1", &[0x41; 41]).unwrap_err();
    assert_eq!(
        err,
        SimError::OutOfBounds {
            address: 216,
            length: 41,
            capacity: 256,
        }
    );
    assert_eq!(sim.memory(), &before);

    let bad_word = SimConfig::new(ConventionKind::StackOnly, 2, GrowthDirection::TowardLow, 256);
    assert_eq!(Simulation::new(bad_word).unwrap_err().kind(), "InvalidConfiguration");
    let no_memory = SimConfig::new(ConventionKind::StackOnly, 4, GrowthDirection::TowardLow, 0);
    assert_eq!(Simulation::new(no_memory).unwrap_err().kind(), "InvalidConfiguration");
    assert_eq!(
        sim.call(&FrameDecl::new("g").local("empty", 0)).unwrap_err().kind(),
        "InvalidConfiguration"
    );
}

#[test]
fn test_runs_are_deterministic() {
    let run = || {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.call(&FrameDecl::new("main").local("argc", 4)).unwrap();
        sim.call(&classic()).unwrap();
        let report = sim.write_buffer("buffer1", &[0x41; 26]).unwrap();
        (sim.memory().clone(), report, sim.trace().get_output())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_sessions_are_independent() {
    let mut first = Simulation::new(SimConfig::default()).unwrap();
    let second = Simulation::new(SimConfig::default()).unwrap();
    first.call(&classic()).unwrap();
    first.write_buffer("buffer1", &[0x41; 26]).unwrap();

    assert!(second.stack().is_empty());
    assert!(second.memory().as_bytes().iter().all(|&b| b == 0));
}
