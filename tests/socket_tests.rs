//! End-to-end tests over a real Unix socket.
//!
//! A small fake HAProxy admin socket answers `show info` and `show stat` the
//! way HAProxy does: one command per connection, then the server closes.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::thread;
use std::time::Duration;

use haproxy_stats_exporter::{
    Collector, CollectorSettings, ConfigOption, ControlSocket, EmittedMetric, HaproxyClient,
    StatsSocket, ValueKind,
};

const INFO: &str = "Name: HAProxy\nUptime_sec: 3600\nCurrConns: 7\n";
const STAT: &str = "# pxname,svname,scur,stot,bin,\nweb,FRONTEND,5,100,512,\napp,BACKEND,1,20,256,\n\n";

/// Serves `connections` commands and returns the commands received.
fn spawn_fake_haproxy(path: &Path, connections: usize) -> thread::JoinHandle<Vec<String>> {
    let listener = UnixListener::bind(path).expect("bind fake socket");
    thread::spawn(move || {
        let mut commands = Vec::new();
        for _ in 0..connections {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut command = String::new();
            reader.read_line(&mut command).expect("read command");

            let reply = match command.trim_end() {
                "show info" => INFO,
                "show stat" => STAT,
                _ => "Unknown command.\n",
            };
            reader
                .get_mut()
                .write_all(reply.as_bytes())
                .expect("write reply");
            commands.push(command);
        }
        commands
    })
}

#[test]
fn test_client_reads_both_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("admin.sock");
    let server = spawn_fake_haproxy(&path, 2);

    let client = HaproxyClient::new(StatsSocket::new(&path));
    let info = client.get_server_info().unwrap();
    let stats = client.get_server_stats().unwrap();

    assert_eq!(info.get("Uptime_sec"), Some("3600"));
    assert_eq!(stats.rows.len(), 2);
    assert_eq!(stats.rows[1].pxname(), "app");
    assert_eq!(server.join().unwrap(), vec!["show info\n", "show stat\n"]);
}

#[test]
fn test_collector_cycle_over_socket() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("admin.sock");
    let server = spawn_fake_haproxy(&path, 2);

    let settings = CollectorSettings::from_options(vec![
        ConfigOption::new("Socket", path.to_string_lossy()),
        ConfigOption::new("Timeout", "2000"),
    ]);
    let collector = Collector::from_settings(settings);

    let mut metrics: Vec<EmittedMetric> = Vec::new();
    let emitted = collector.run_cycle(&mut metrics);
    server.join().unwrap();

    metrics.sort_by(|a, b| a.name.cmp(&b.name));
    let names: Vec<_> = metrics.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(emitted, metrics.len());
    assert_eq!(
        names,
        vec![
            "backend.app.bytes_in",
            "backend.app.session_current",
            "backend.app.session_total",
            "connections",
            "frontend.web.bytes_in",
            "frontend.web.session_current",
            "frontend.web.session_total",
            "uptime_seconds",
        ]
    );
    assert_eq!(metrics[0].kind, ValueKind::Derive);
    assert_eq!(metrics[0].value, 256);
}

#[test]
fn test_unknown_command_reply_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("admin.sock");
    let server = spawn_fake_haproxy(&path, 1);

    let socket = StatsSocket::new(&path).with_timeout(Duration::from_secs(2));
    let reply = socket.communicate("show pools").unwrap();

    assert_eq!(reply, "Unknown command.\n");
    server.join().unwrap();
}

#[test]
fn test_missing_socket_gives_empty_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let settings = CollectorSettings::from_options(vec![ConfigOption::new(
        "Socket",
        dir.path().join("gone.sock").to_string_lossy(),
    )]);
    let collector = Collector::from_settings(settings);

    let mut metrics: Vec<EmittedMetric> = Vec::new();
    assert_eq!(collector.run_cycle(&mut metrics), 0);
    assert!(metrics.is_empty());
}
