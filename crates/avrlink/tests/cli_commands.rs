#![cfg(all(unix, feature = "cli"))]

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Loopback stand-in for a receiver: answers queries from a value table,
/// applies and echoes commands, and can push unsolicited frames.
struct FakeReceiver {
    address: String,
    frames: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Behavior {
    values: Vec<(&'static str, &'static str)>,
    /// Codes whose commands are echoed with the unchanged value.
    sticky: Vec<&'static str>,
    /// Frames pushed shortly after the client connects.
    unsolicited: Option<&'static str>,
}

impl FakeReceiver {
    fn spawn(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let address = listener
            .local_addr()
            .expect("listener should have an address")
            .to_string();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let seen = frames.clone();

        let handle = thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            serve(stream, behavior, &seen);
        });

        Self {
            address,
            frames,
            handle: Some(handle),
        }
    }

    fn frames(&self) -> Vec<String> {
        self.frames.lock().expect("frames lock").clone()
    }
}

impl Drop for FakeReceiver {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(mut stream: TcpStream, behavior: Behavior, seen: &Mutex<Vec<String>>) {
    stream
        .set_read_timeout(Some(Duration::from_millis(50)))
        .expect("read timeout should be settable");
    let mut values: HashMap<String, String> = behavior
        .values
        .iter()
        .map(|(code, token)| (code.to_string(), token.to_string()))
        .collect();

    let started = Instant::now();
    let mut pushed = behavior.unsolicited.is_none();
    let mut pending = Vec::new();
    let mut buf = [0u8; 512];

    while started.elapsed() < Duration::from_secs(10) {
        if !pushed && started.elapsed() >= Duration::from_millis(300) {
            pushed = true;
            if let Some(frames) = behavior.unsolicited {
                let _ = stream.write_all(frames.as_bytes());
            }
        }

        match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => pending.extend_from_slice(&buf[..n]),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue
            }
            Err(_) => return,
        }

        while let Some(end) = pending.iter().position(|b| *b == b'\r') {
            let frame: Vec<u8> = pending.drain(..=end).collect();
            let frame = String::from_utf8_lossy(&frame[..end]).to_string();
            seen.lock().expect("frames lock").push(frame.clone());
            if frame.len() < 2 {
                continue;
            }

            let (code, rest) = frame.split_at(2);
            if rest != "?" && !behavior.sticky.contains(&code) {
                values.insert(code.to_string(), rest.to_string());
            }
            let Some(token) = values.get(code) else {
                continue;
            };
            let mut reply = format!("{code}{token}\r");
            if code == "MV" {
                reply.push_str("MVMAX 80\r");
            }
            let _ = stream.write_all(reply.as_bytes());
        }
    }
}

fn avrlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_avrlink"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .args(args)
        .output()
        .expect("avrlink should run")
}

#[test]
fn get_prints_decoded_value() {
    let receiver = FakeReceiver::spawn(Behavior {
        values: vec![("MV", "455")],
        ..Behavior::default()
    });

    let output = avrlink(&["get", &receiver.address, "volume"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"attribute\":\"volume\""));
    assert!(stdout.contains("\"value\":45.5"));
    assert_eq!(receiver.frames(), vec!["MV?".to_string()]);
}

#[test]
fn set_reports_acknowledged_value() {
    let receiver = FakeReceiver::spawn(Behavior {
        values: vec![("SI", "CD")],
        ..Behavior::default()
    });

    let output = avrlink(&["set", &receiver.address, "input", "bd"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"value\":\"Blu-ray Player\""));
    assert!(stdout.contains("\"acknowledged\":true"));
    assert_eq!(receiver.frames(), vec!["SIBD".to_string()]);
}

#[test]
fn unacknowledged_set_exits_1() {
    let receiver = FakeReceiver::spawn(Behavior {
        values: vec![("MU", "OFF")],
        sticky: vec!["MU"],
        ..Behavior::default()
    });

    let output = avrlink(&["set", &receiver.address, "mute", "on"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not acknowledged"), "{stderr}");
}

#[test]
fn out_of_range_volume_exits_60_before_connecting() {
    let output = avrlink(&["set", "127.0.0.1:9", "volume", "120"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn host_name_exits_64() {
    let output = avrlink(&["get", "receiver.local", "power"]);
    assert_eq!(output.status.code(), Some(64));

    let output = avrlink(&["get", "127.0.0.1", "bass"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn refused_connection_exits_3() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        listener.local_addr().expect("local addr").port()
    };

    let output = avrlink(&["get", &format!("127.0.0.1:{port}"), "power"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn status_reports_every_attribute_and_ceiling() {
    let receiver = FakeReceiver::spawn(Behavior {
        values: vec![("PW", "ON"), ("SI", "GAME"), ("MV", "30"), ("MU", "OFF")],
        ..Behavior::default()
    });

    let output = avrlink(&["status", &receiver.address]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).expect("status is JSON");
    assert_eq!(report["address"], receiver.address.as_str());
    assert_eq!(report["max_volume"], 80.0);
    assert_eq!(report["attributes"].as_array().map(Vec::len), Some(4));
    assert_eq!(report["attributes"][1]["value"], "Game");
    assert_eq!(report["unavailable"].as_array().map(Vec::len), Some(0));
}

#[test]
fn watch_prints_pushed_updates() {
    let receiver = FakeReceiver::spawn(Behavior {
        unsolicited: Some("SIDVD\rMUON\rXXjunk\r"),
        ..Behavior::default()
    });

    let output = avrlink(&[
        "watch",
        &receiver.address,
        "--count",
        "2",
        "--poll-interval",
        "20ms",
    ]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "{stdout}");
    assert!(lines[0].contains("\"value\":\"DVD\""));
    assert!(lines[1].contains("\"attribute\":\"mute\""));
    assert!(lines[1].contains("\"value\":true"));
}

#[test]
fn version_prints_crate_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_avrlink"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("avrlink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_reports_build_provenance() {
    let output = Command::new(env!("CARGO_BIN_EXE_avrlink"))
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: avrlink"));
    assert!(stdout.contains("build_target: "));
    assert!(!stdout.contains("build_profile: unknown"), "{stdout}");
}
