//! LedMode host simulator.
//!
//! Runs the controller against in-memory outputs and real worker threads,
//! fed by presses typed on stdin.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  stdin ──▶ ButtonBank (debounce · queue · dispatcher)      │
//! │                     │                                      │
//! │                     ▼                                      │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │            Controller (mode arbitration)             │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! │        │                  │                    │           │
//! │        ▼                  ▼                    ▼           │
//! │  ThreadScheduler     MemoryOutputs        LogEventSink     │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Input, one per line:
//!
//! | Line      | Meaning                                        |
//! |-----------|------------------------------------------------|
//! | `0`..`N`  | press button                                   |
//! | `m <c>`   | select mode by code (1 All, 2 Individual, 3 Manual, 4 Off) |
//! | `t <k>`   | toggle output `k` (Manual only)                |
//! | `s`       | print a snapshot                               |
//! | `q`       | quit                                           |

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::{info, warn};

use ledmode::adapters::config_file::JsonConfigFile;
use ledmode::adapters::log_sink::LogEventSink;
use ledmode::app::commands::ControlCommand;
use ledmode::app::ports::ConfigPort;
use ledmode::app::service::Controller;
use ledmode::config::ControllerConfig;
use ledmode::drivers::button::{ButtonBank, ButtonNotifier};
use ledmode::drivers::outputs::MemoryOutputs;
use ledmode::drivers::timer::ThreadScheduler;
use ledmode::fsm::Mode;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("LedMode simulator v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config = load_config()?;

    // ── 2. Adapters ───────────────────────────────────────────
    let outputs = Arc::new(MemoryOutputs::new(config.outputs));
    let controller = Controller::start(
        config,
        Arc::clone(&outputs) as _,
        Arc::new(ThreadScheduler::new()),
        Arc::new(LogEventSink::new()),
    )
    .context("controller start")?;
    let buttons = ButtonBank::start(controller.clone()).context("button bank start")?;
    let notifier = buttons.notifier();

    // ── 3. Console loop ───────────────────────────────────────
    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        match line.trim() {
            "" => {}
            "q" => break,
            "s" => {
                let snap = serde_json::to_string(&controller.snapshot()).context("snapshot")?;
                info!("{snap} leds={:?}", outputs.levels());
            }
            input => {
                if let Err(e) = console_command(input, &controller, &notifier) {
                    warn!("{e:#}");
                }
            }
        }
    }

    // ── 4. Teardown ───────────────────────────────────────────
    buttons.stop();
    controller.shutdown();
    info!("LEDs at exit: {:?}", outputs.levels());
    Ok(())
}

fn load_config() -> Result<ControllerConfig> {
    let mut args = std::env::args().skip(1);
    let mut path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().context("--config needs a path")?;
                path = Some(PathBuf::from(value));
            }
            other => bail!("unknown argument '{other}'"),
        }
    }

    match path {
        Some(path) => JsonConfigFile::new(path)
            .load()
            .context("loading configuration"),
        None => Ok(ControllerConfig::default()),
    }
}

fn console_command(input: &str, controller: &Controller, notifier: &ButtonNotifier) -> Result<()> {
    let mut words = input.split_whitespace();
    let head = words.next().unwrap_or_default();
    let arg = words.next();

    let cmd = match (head, arg) {
        ("m", Some(code)) => {
            let code: u8 = code.parse().context("mode code")?;
            let mode = Mode::from_code(code).with_context(|| format!("no mode with code {code}"))?;
            ControlCommand::Select(mode)
        }
        ("t", Some(index)) => ControlCommand::Toggle(index.parse().context("output index")?),
        (button, None) => {
            let button: usize = button.parse().context("button index")?;
            if !notifier.notify(button)? {
                info!("button {button}: debounced");
            }
            return Ok(());
        }
        _ => bail!("unrecognised input '{input}'"),
    };

    let outcome = controller.handle_command(cmd)?;
    info!("{cmd:?}: {outcome:?}");
    Ok(())
}
