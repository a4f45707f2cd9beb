//! Button event source driving a controller end to end.

use std::thread;
use std::time::Duration;

use ledmode::app::events::ControllerEvent;
use ledmode::config::ControllerConfig;
use ledmode::drivers::button::{ButtonBank, EVENT_QUEUE_DEPTH};
use ledmode::drivers::timer::ThreadScheduler;
use ledmode::error::{Error, ResourceError};
use ledmode::fsm::Mode;
use ledmode::scheduler::StepScheduler;

use super::mock_hw::{rig, wait_for};

#[test]
fn presses_from_many_threads_are_all_delivered() {
    let r = rig(
        ControllerConfig::default().with_manual_refresh(None),
        StepScheduler::new(),
    );
    let bank = ButtonBank::start(r.ctl.clone()).unwrap();

    // Button 2 toggles on every press, so the final level counts them.
    let senders: Vec<_> = (0..4u32)
        .map(|t| {
            let n = bank.notifier();
            thread::spawn(move || {
                for i in 0..5u32 {
                    // Stamps 100ms apart per thread clear the debounce window.
                    let stamp = 1_000 + t * 10_000 + i * 100;
                    while matches!(
                        n.notify_at(2, stamp),
                        Err(Error::Resource(ResourceError::EventQueueFull))
                    ) {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();
    for s in senders {
        s.join().unwrap();
    }
    bank.stop();

    let toggles = r
        .events
        .count(|e| matches!(e, ControllerEvent::ManualToggled { index: 2, .. }));
    let debounced = 20 - toggles;
    // Threads share one per-button window, so some presses may be dropped,
    // but every accepted press must have been applied.
    assert!(toggles >= 1);
    assert_eq!(
        r.ctl.snapshot().manual.get(2),
        Some(toggles % 2 == 1),
        "{debounced} presses debounced"
    );
}

#[test]
fn bank_drives_threaded_controller() {
    let r = rig(
        ControllerConfig::default()
            .with_tick_interval(Duration::from_millis(20))
            .with_manual_refresh(None),
        ThreadScheduler::new(),
    );
    let bank = ButtonBank::start(r.ctl.clone()).unwrap();
    let n = bank.notifier();

    n.notify_at(0, 100).unwrap();
    assert!(wait_for(|| r.ctl.mode() == Mode::All));
    assert!(wait_for(|| !r.outputs.writes().is_empty()));

    n.notify_at(3, 200).unwrap();
    assert!(wait_for(|| r.ctl.mode() == Mode::Off));
    bank.stop();

    let settled = r.outputs.writes().len();
    thread::sleep(Duration::from_millis(60));
    assert_eq!(r.outputs.writes().len(), settled);
    assert_eq!(r.outputs.levels(), vec![false; 4]);
}

#[test]
fn queue_depth_is_bounded() {
    let r = rig(
        ControllerConfig {
            debounce_ms: 0,
            ..ControllerConfig::default()
        }
        .with_manual_refresh(None),
        StepScheduler::new(),
    );
    let bank = ButtonBank::start(r.ctl.clone()).unwrap();
    let n = bank.notifier();
    let mut accepted = 0;
    for i in 0..(EVENT_QUEUE_DEPTH as u32 * 4) {
        if n.notify_at(1, 1 + i).is_ok() {
            accepted += 1;
        }
    }
    assert!(accepted >= EVENT_QUEUE_DEPTH);
    bank.stop();
    assert_eq!(r.ctl.mode(), Mode::Individual);
}
