use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use avrlink_frame::{Attribute, Value};
use avrlink_session::{Session, SessionConfig, StateSink};
use tracing::{info, warn};

use crate::cmd::{parse_duration, WatchArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_update, AttributeOutput, OutputFormat};

const WAIT_STEP: Duration = Duration::from_millis(25);

/// Prints every update it is notified of.
struct PrintSink {
    format: OutputFormat,
    printed: AtomicUsize,
}

impl PrintSink {
    fn print(&self, attribute: Attribute, value: Value) {
        print_update(&AttributeOutput::new(attribute, value), self.format);
        self.printed.fetch_add(1, Ordering::SeqCst);
    }

    fn printed(&self) -> usize {
        self.printed.load(Ordering::SeqCst)
    }
}

impl StateSink for PrintSink {
    fn notify(&self, attribute: Attribute, value: &Value) {
        self.print(attribute, value.clone());
    }
}

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let address = args.connection.device_address()?;
    let config = SessionConfig {
        poll_interval: parse_duration("poll interval", &args.poll_interval)?,
        ..args.connection.session_config()?
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let sink = Arc::new(PrintSink {
        format,
        printed: AtomicUsize::new(0),
    });
    let session = Session::connect(address, config, sink.clone())
        .map_err(|err| session_error("connect failed", err))?;
    info!(%address, "watching receiver");

    if args.initial {
        for attribute in Attribute::ALL {
            match session.request_attribute(attribute) {
                Ok(value) => sink.print(attribute, value),
                Err(err) => warn!(%attribute, error = %err, "initial query failed"),
            }
        }
    }

    let limit_reached = || args.count.is_some_and(|count| sink.printed() >= count);
    while running.load(Ordering::SeqCst) && !limit_reached() {
        thread::sleep(WAIT_STEP);
    }

    session.stop();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
