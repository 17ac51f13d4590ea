use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use avrlink_frame::parse_chunk;
use avrlink_transport::{AvrStream, ReadOutcome};
use tracing::{debug, trace, warn};

use crate::session::Shared;

const THREAD_NAME: &str = "avrlink-listener";

/// Start the background loop that drains unsolicited frames.
///
/// Each iteration waits one poll interval, takes the stream lock, performs a
/// single read and forwards whatever it decoded. The loop ends once the
/// session is no longer alive; `Session::stop` unparks it so shutdown does
/// not wait out the interval.
pub(crate) fn spawn<S: AvrStream + 'static>(
    shared: Arc<Shared<S>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || run(&shared))
}

fn run<S: AvrStream>(shared: &Shared<S>) {
    debug!("listener started");
    let mut failing = false;

    while shared.alive.load(Ordering::SeqCst) {
        thread::park_timeout(shared.config.poll_interval);
        if !shared.alive.load(Ordering::SeqCst) {
            break;
        }

        let mut stream = shared.lock_stream();
        match stream.read(shared.config.read_chunk_size) {
            Ok(ReadOutcome::Data(bytes)) => {
                failing = false;
                let parsed = parse_chunk(&bytes);
                if parsed.is_empty() {
                    trace!(len = bytes.len(), "chunk carried no known frames");
                } else {
                    shared.apply(parsed);
                }
            }
            Ok(ReadOutcome::NoData) => {
                failing = false;
                trace!("listener idle");
            }
            Err(err) if failing => debug!(error = %err, "listener read still failing"),
            Err(err) => {
                failing = true;
                warn!(error = %err, "listener read failed");
            }
        }
    }

    debug!("listener stopped");
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use avrlink_frame::{Attribute, Value};

    use crate::fake::{FakeReceiver, RecordingSink};
    use crate::session::{Session, SessionConfig};

    fn fast_config() -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_millis(10),
            ..SessionConfig::default()
        }
    }

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn forwards_unsolicited_updates() {
        let fake = FakeReceiver::new();
        let sink = std::sync::Arc::new(RecordingSink::default());
        let session = Session::from_stream(fake.clone(), fast_config(), sink.clone()).unwrap();

        fake.push("MV50\rZMON\rMUON\r");
        assert!(wait_for(|| sink.updates().len() == 2));
        assert_eq!(
            sink.updates(),
            vec![
                (Attribute::Volume, Value::Number(50.0)),
                (Attribute::Mute, Value::Bool(true)),
            ]
        );
        session.stop();
    }

    #[test]
    fn applies_volume_ceiling() {
        let fake = FakeReceiver::new();
        let sink = std::sync::Arc::new(RecordingSink::default());
        let session = Session::from_stream(fake.clone(), fast_config(), sink.clone()).unwrap();

        fake.push("MVMAX 705\r");
        assert!(wait_for(|| session.max_volume() == 70.5));
        assert!(sink.updates().is_empty());
        session.stop();
    }

    #[test]
    fn absorbs_read_errors() {
        let fake = FakeReceiver::new();
        let sink = std::sync::Arc::new(RecordingSink::default());
        let session = Session::from_stream(fake.clone(), fast_config(), sink.clone()).unwrap();

        fake.set_failing_reads(true);
        assert!(wait_for(|| fake.failed_reads() >= 3));
        assert!(session.is_alive());

        fake.set_failing_reads(false);
        fake.push("PWSTANDBY\r");
        assert!(wait_for(|| !sink.updates().is_empty()));
        assert_eq!(sink.updates(), vec![(Attribute::Power, Value::Bool(false))]);
        session.stop();
    }

    #[test]
    fn exits_when_session_stops() {
        let fake = FakeReceiver::new();
        let sink = std::sync::Arc::new(RecordingSink::default());
        let session = Session::from_stream(fake.clone(), fast_config(), sink).unwrap();

        session.stop();
        let reads = fake.reads();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(fake.reads(), reads);
        assert_eq!(fake.close_count(), 1);
    }
}
