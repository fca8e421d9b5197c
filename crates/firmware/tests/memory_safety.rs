//! Memory safety architecture tests.
// Architecture test file: expect/unwrap and cast lints are intentional.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
)]
//! Tests verify static declaration invariants at source level: no `static mut`
//! anywhere, const-initialized rendezvous statics, `StaticCell` for anything
//! that needs a one-time `&'static mut`.

/// No `static mut` in the firmware entry points.
///
/// `static mut` is UB the moment two references exist (Rust 2024 makes
/// `static_mut_refs` a hard error). Everything shared between the two
/// executors goes through const-initialized sync primitives or `StaticCell`.
#[test]
fn firmware_has_no_static_mut() {
    let main_rs = include_str!("../src/main.rs");
    let board_rs = include_str!("../src/board.rs");

    assert!(
        !main_rs.contains("static mut"),
        "main.rs must not declare `static mut` — use StaticCell for one-time \
         &'static mut handout"
    );
    assert!(
        !board_rs.contains("static mut"),
        "board.rs must not declare `static mut` — the rendezvous statics are \
         all const-initialized sync types"
    );
}

/// The cross-executor rendezvous statics must be const-initialized.
///
/// The interrupt-mode executor can preempt thread mode at any instant after
/// `start()`; a lazily initialized static would race its own initialization.
/// Const init (`const fn new()`) makes the statics valid from reset.
#[test]
fn rendezvous_statics_are_const_initialized() {
    let board_rs = include_str!("../src/board.rs");

    for (name, ctor) in [
        ("static FRAME_HANDOFF", "FrameHandoff::new()"),
        ("static PANEL_PORT", "PanelPort::new()"),
        ("static CURRENT_TOUCH", "CurrentTouch::new()"),
        ("static POLLER_GATE", "PollerGate::new()"),
        ("static ACTIVITY", "ActivityClock::new()"),
    ] {
        assert!(
            board_rs.contains(name),
            "board.rs must declare `{name}` for the cross-executor handoff"
        );
        assert!(
            board_rs.contains(ctor),
            "{name} must be const-initialized via {ctor}"
        );
    }
}

/// The application and its host are handed to the render task as
/// `&'static mut` through `StaticCell`, never through `static mut`.
#[test]
fn app_storage_uses_static_cell() {
    let main_rs = include_str!("../src/main.rs");

    assert!(
        main_rs.contains("StaticCell"),
        "main.rs must use StaticCell for the one-time &'static mut handout"
    );
    assert!(
        main_rs.contains("static APP") && main_rs.contains("static HOST"),
        "main.rs must declare the app and host storage as StaticCell statics"
    );
}
