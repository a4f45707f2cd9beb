//! Deterministic controller tests against the stepped scheduler.

use std::time::Duration;

use ledmode::activity::ActivityKind;
use ledmode::app::events::ControllerEvent;
use ledmode::app::ports::OutputSink;
use ledmode::app::service::Outcome;
use ledmode::config::ControllerConfig;
use ledmode::error::{Error, ResourceError};
use ledmode::fsm::Mode;
use ledmode::scheduler::StepScheduler;

use super::mock_hw::{FlakyScheduler, Rig, rig};

fn stepped() -> Rig<StepScheduler> {
    rig(
        ControllerConfig::default().with_manual_refresh(None),
        StepScheduler::new(),
    )
}

// ── Individual: one output per tick, in order ────────────────

#[test]
fn individual_visits_each_output_in_order() {
    let r = stepped();
    r.ctl.handle_event(1).unwrap();

    for expected in 0..4 {
        assert_eq!(r.sched.fire_all(), 1);
        let levels = r.outputs.levels();
        assert_eq!(levels.iter().filter(|l| **l).count(), 1, "tick {expected}");
        assert!(levels[expected], "tick {expected}: {levels:?}");
    }
    r.sched.fire_all();
    assert_eq!(r.outputs.levels(), vec![true, false, false, false]);
}

#[test]
fn interval_drives_ticks() {
    let r = rig(
        ControllerConfig::default()
            .with_tick_interval(Duration::from_millis(2000))
            .with_manual_refresh(None),
        StepScheduler::new(),
    );
    r.ctl.handle_event(0).unwrap();
    assert_eq!(r.sched.advance(Duration::from_millis(1999)), 0);
    assert_eq!(r.sched.advance(Duration::from_millis(1)), 1);
    assert_eq!(r.outputs.levels(), vec![true; 4]);
    assert_eq!(r.sched.advance(Duration::from_millis(4000)), 2);
    assert_eq!(r.outputs.levels(), vec![true; 4]);
}

// ── Manual toggle accounting ──────────────────────────────────

#[test]
fn double_toggle_restores_value_with_two_writes() {
    let r = stepped();
    r.ctl.select_mode(Mode::Manual).unwrap();
    r.outputs.take_writes();
    let before = r.outputs.level(1);

    assert!(r.ctl.toggle_manual(1).unwrap());
    assert!(!r.ctl.toggle_manual(1).unwrap());

    assert_eq!(r.outputs.level(1), before);
    assert_eq!(r.outputs.write_count(1), 2);
    for other in [0, 2, 3] {
        assert_eq!(r.outputs.write_count(other), 0, "output {other}");
    }
}

#[test]
fn repeated_manual_button_keeps_toggling() {
    let r = stepped();
    let values: Vec<_> = (0..4)
        .map(|_| match r.ctl.handle_event(2).unwrap() {
            Outcome::Toggled { value, .. } => value,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(values, vec![true, false, true, false]);
}

#[test]
fn entering_manual_reasserts_levels() {
    let r = stepped();
    r.ctl.select_mode(Mode::Manual).unwrap();
    r.ctl.toggle_manual(0).unwrap();
    r.ctl.handle_event(0).unwrap();
    r.sched.fire_all();
    r.sched.fire_all();
    assert_eq!(r.outputs.levels(), vec![false; 4]);

    r.ctl.select_mode(Mode::Manual).unwrap();
    assert_eq!(r.outputs.levels(), vec![true, false, false, false]);
}

// ── No restart on a repeated periodic event ──────────────────

#[test]
fn duplicate_all_event_keeps_activity() {
    let r = stepped();
    r.ctl.handle_event(0).unwrap();
    let (id, kind) = r.ctl.snapshot().activity.unwrap();
    assert_eq!(kind, ActivityKind::Blink);

    // Blink phase is the sentinel: one tick leaves it high.
    r.sched.fire_all();
    assert_eq!(r.outputs.levels(), vec![true; 4]);

    assert_eq!(r.ctl.handle_event(0).unwrap(), Outcome::Unchanged);
    assert_eq!(r.ctl.snapshot().activity.unwrap().0, id);
    assert_eq!(r.sched.job_ids(), vec![id]);

    // A fresh Blink would write high again; the surviving one goes low.
    r.sched.fire_all();
    assert_eq!(r.outputs.levels(), vec![false; 4]);
    assert_eq!(
        r.events.count(|e| matches!(e, ControllerEvent::ActivityStarted { .. })),
        1
    );
}

// ── Reset ─────────────────────────────────────────────────────

#[test]
fn reset_from_every_mode_clears_outputs() {
    for button in [0, 1, 2] {
        let r = stepped();
        r.ctl.handle_event(button).unwrap();
        r.sched.fire_all();
        r.ctl.reset().unwrap();
        assert_eq!(r.outputs.levels(), vec![false; 4], "after button {button}");
        assert_eq!(r.sched.live_jobs(), 0);
        r.outputs.take_writes();
        r.sched.fire_all();
        assert!(r.outputs.writes().is_empty());
    }
}

#[test]
fn reset_while_off_still_writes_every_output() {
    let r = stepped();
    r.ctl.handle_event(3).unwrap();
    assert_eq!(r.outputs.writes().len(), 4);
}

// ── Resource exhaustion leaves the prior mode intact ─────────

#[test]
fn failed_reservation_keeps_running_activity() {
    let r = rig(
        ControllerConfig::default().with_manual_refresh(None),
        FlakyScheduler::new(StepScheduler::new(), 2),
    );
    r.ctl.handle_event(1).unwrap();
    r.sched.inner().fire_all();
    let before = r.ctl.snapshot();

    let err = r.ctl.handle_event(0).unwrap_err();
    assert_eq!(err, Error::Resource(ResourceError::SpawnFailed));
    assert_eq!(r.ctl.snapshot(), before);

    // The Individual activity still owns the outputs.
    r.sched.inner().fire_all();
    assert_eq!(r.outputs.levels(), vec![false, true, false, false]);
    assert!(
        r.events
            .count(|e| matches!(e, ControllerEvent::EventRejected { .. }))
            >= 1
    );
}

#[test]
fn failed_manual_entry_does_not_toggle() {
    let r = rig(ControllerConfig::default(), StepScheduler::new());
    r.ctl.handle_event(0).unwrap();
    r.sched.set_available(false);
    assert!(r.ctl.handle_event(2).is_err());
    assert_eq!(r.ctl.mode(), Mode::All);
    assert_eq!(r.ctl.snapshot().manual.as_slice(), &[false; 4]);
}

// ── Event stream ──────────────────────────────────────────────

#[test]
fn transitions_stop_before_start() {
    let r = stepped();
    for button in [0, 1, 0, 2, 1, 3, 1] {
        r.ctl.handle_event(button).unwrap();
    }
    assert_eq!(r.events.peak_live_activities(), 1);

    let events = r.events.events();
    let stops = events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::ActivityStopped { .. }))
        .count();
    let starts = events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::ActivityStarted { .. }))
        .count();
    assert_eq!(starts, stops + 1);
}
