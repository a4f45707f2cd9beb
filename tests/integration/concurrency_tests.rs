//! Real-thread tests: activities tick on their own workers while requests
//! arrive from several threads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ledmode::config::ControllerConfig;
use ledmode::drivers::timer::ThreadScheduler;
use ledmode::fsm::Mode;

use super::mock_hw::{Rig, rig, wait_for};

const TICK: Duration = Duration::from_millis(20);

fn threaded() -> Rig<ThreadScheduler> {
    rig(
        ControllerConfig::default()
            .with_tick_interval(TICK)
            .with_manual_refresh(Some(TICK)),
        ThreadScheduler::new(),
    )
}

/// After `reset()` returns, no write from the stopped activity may land.
fn assert_quiet_after_reset(r: &Rig<ThreadScheduler>) {
    r.ctl.reset().unwrap();
    assert_eq!(r.outputs.levels(), vec![false; 4]);
    let settled = r.outputs.writes().len();
    thread::sleep(TICK * 3);
    assert_eq!(r.outputs.writes().len(), settled, "write after reset");
    assert_eq!(r.outputs.levels(), vec![false; 4]);
}

#[test]
fn reset_after_blinking_is_race_free() {
    let r = threaded();
    r.ctl.handle_event(0).unwrap();
    assert!(wait_for(|| !r.outputs.writes().is_empty()), "All never ticked");
    assert_quiet_after_reset(&r);
    assert_eq!(r.sched.running(), 0);
}

#[test]
fn reset_after_chase_is_race_free() {
    let r = threaded();
    r.ctl.handle_event(1).unwrap();
    assert!(wait_for(|| r.outputs.writes().len() >= 8));
    assert_quiet_after_reset(&r);
}

#[test]
fn manual_refresh_never_writes_after_reset() {
    let r = threaded();
    r.ctl.handle_event(2).unwrap();
    r.outputs.take_writes();
    assert!(wait_for(|| r.outputs.writes().len() >= 4), "refresh never ran");
    assert_quiet_after_reset(&r);
}

#[test]
fn stopped_activity_never_overlaps_its_successor() {
    let r = threaded();
    for button in [0, 1, 0, 1, 2, 0, 2, 1] {
        r.ctl.handle_event(button).unwrap();
        thread::sleep(TICK / 2);
    }
    assert!(r.sched.peak_running() <= 1);
    assert_eq!(r.events.peak_live_activities(), 1);
    assert_quiet_after_reset(&r);
}

#[test]
fn concurrent_requests_serialize() {
    let r = threaded();
    let ctl = r.ctl.clone();

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let ctl = ctl.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let button = (t + i) % 4;
                    // Rejections are allowed; corrupted state is not.
                    let _ = ctl.handle_event(button);
                    thread::sleep(Duration::from_millis(((t * 7 + i * 3) % 5) as u64));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let snap = r.ctl.snapshot();
    match snap.mode {
        Mode::Off => assert!(snap.activity.is_none()),
        _ => assert!(snap.activity.is_some()),
    }
    assert!(r.sched.peak_running() <= 1);
    assert_eq!(r.events.peak_live_activities(), 1);
    assert_quiet_after_reset(&r);
}

#[test]
fn shutdown_leaves_last_levels() {
    let r = threaded();
    r.ctl.handle_event(2).unwrap();
    r.ctl.shutdown();
    let at_shutdown = r.outputs.levels();
    assert_eq!(at_shutdown, vec![false, false, true, false]);
    let settled = r.outputs.writes().len();
    thread::sleep(TICK * 3);
    assert_eq!(r.outputs.writes().len(), settled);
    assert!(r.ctl.handle_event(0).is_err());
    assert!(wait_for(|| r.sched.live_workers() == 0));
}

#[test]
fn controller_is_shareable_across_threads() {
    let r = threaded();
    let ctl = Arc::new(r.ctl.clone());
    let reader = {
        let ctl = Arc::clone(&ctl);
        thread::spawn(move || {
            for _ in 0..50 {
                let snap = ctl.snapshot();
                if let Some((_, kind)) = snap.activity {
                    assert_ne!(snap.mode, Mode::Off, "{kind:?} running while Off");
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
    };
    for button in [0, 1, 3, 1, 0, 3] {
        ctl.handle_event(button).unwrap();
        thread::sleep(Duration::from_millis(5));
    }
    reader.join().unwrap();
}
