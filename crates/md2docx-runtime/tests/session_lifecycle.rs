//! End-to-end session tests against a shell-script backend.
//!
//! The script only records the port it was given and sleeps; an in-process
//! axum server then answers on that port in its place.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::{Json, Router, routing::get};
use md2docx_core::{HealthState, ProcessFailure, ProcessState, SessionEvent};
use md2docx_runtime::{
    ExecutableLocator, HealthConfig, PortAllocator, ServerSession, SessionConfig, SessionError,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("md2docx-server");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn session_config(script: PathBuf, dir: &Path, preferred: u16) -> SessionConfig {
    SessionConfig::default()
        .with_host("127.0.0.1")
        .with_preferred_port(Some(preferred))
        .with_allocator(
            PortAllocator::new()
                .with_host("127.0.0.1")
                .with_scan_range(preferred..=preferred + 10),
        )
        .with_health(
            HealthConfig::default()
                .with_initial_delay(Duration::from_millis(100))
                .with_interval(Duration::from_millis(200))
                .with_probe_timeout(Duration::from_millis(500)),
        )
        .with_executable(ExecutableLocator::new(dir).with_override(Some(script)))
}

async fn read_marker(marker: &Path) -> u16 {
    for _ in 0..100 {
        if let Ok(raw) = fs::read_to_string(marker) {
            if let Ok(port) = raw.trim().parse() {
                return port;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("backend never wrote its port");
}

async fn serve_stub(port: u16) {
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let app = Router::new()
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .route(
            "/api/config",
            get(move || async move {
                Json(json!({
                    "success": true,
                    "pandoc_path": "pandoc",
                    "template_file": "",
                    "server_port": port
                }))
            }),
        );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn test_occupied_preferred_port_is_skipped_and_client_follows() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let preferred = occupied.local_addr().unwrap().port();

    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("port.txt");
    let script = write_script(
        dir.path(),
        &format!("echo \"$SERVER_PORT\" > '{}'\nexec sleep 30", marker.display()),
    );

    let session = ServerSession::new(session_config(script, dir.path(), preferred)).unwrap();
    let mut events = session.subscribe();

    let endpoint = session.start().await.unwrap();
    assert_ne!(endpoint.port(), preferred);
    assert!((preferred + 1..=preferred + 10).contains(&endpoint.port()));
    assert_eq!(session.process_state(), ProcessState::Running);
    assert!(session.client().is_err(), "not ready before a healthy probe");

    // The backend saw the same port the session published
    assert_eq!(read_marker(&marker).await, endpoint.port());
    serve_stub(endpoint.port()).await;

    session.wait_until_ready(Duration::from_secs(5)).await.unwrap();
    assert_eq!(session.health_state(), HealthState::Healthy);

    let client = session.client().unwrap();
    let expected = format!("http://127.0.0.1:{}", endpoint.port());
    assert_eq!(client.base_url(), expected);
    assert_eq!(session.current_base_url(), Some(expected));

    let config = client.get_config().await.unwrap();
    assert_eq!(config.server_port, endpoint.port());

    session.stop().await;
    assert_eq!(session.process_state(), ProcessState::Stopped);
    assert!(matches!(session.client(), Err(SessionError::NotReady { .. })));

    let events = drain(&mut events);
    assert_eq!(events.first(), Some(&SessionEvent::started(endpoint)));
    assert!(events.contains(&SessionEvent::health(HealthState::Healthy, None)));
    assert!(matches!(
        events.last(),
        Some(SessionEvent::ProcessStopped { .. })
    ));

    drop(occupied);
}

#[tokio::test]
async fn test_crash_during_startup_fails_wait() {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let preferred = probe.local_addr().unwrap().port();
    drop(probe);

    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "sleep 0.3\nexit 4");

    let session = ServerSession::new(session_config(script, dir.path(), preferred)).unwrap();
    let mut events = session.subscribe();
    session.start().await.unwrap();

    let err = session
        .wait_until_ready(Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::NotReady {
            process: ProcessState::Crashed,
            ..
        }
    ));

    let events = drain(&mut events);
    assert!(events.contains(&SessionEvent::stopped(Some(4))));
    assert!(events.contains(&SessionEvent::error(ProcessFailure::CrashedWithCode {
        code: Some(4)
    })));
}

#[tokio::test]
async fn test_restart_after_stop_publishes_new_endpoint() {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let preferred = probe.local_addr().unwrap().port();
    drop(probe);

    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "exec sleep 30");
    let session = ServerSession::new(session_config(script, dir.path(), preferred)).unwrap();
    let mut endpoints = session.subscribe_endpoint();

    let first = session.start().await.unwrap();
    assert!(endpoints.has_changed().unwrap());
    let _ = endpoints.borrow_and_update();

    // Already running: same endpoint, nothing republished
    assert_eq!(session.start().await.unwrap(), first);
    assert!(!endpoints.has_changed().unwrap());

    session.stop().await;
    let second = session.start().await.unwrap();
    assert!(endpoints.has_changed().unwrap());
    assert_eq!(session.endpoint(), Some(second));

    session.stop().await;
}

#[tokio::test]
async fn test_restart_endpoint_is_current_before_running() {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let preferred = probe.local_addr().unwrap().port();
    drop(probe);

    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "exec sleep 30");
    let session = ServerSession::new(session_config(script, dir.path(), preferred)).unwrap();

    let first = session.start().await.unwrap();
    assert_eq!(first.port(), preferred);
    session.stop().await;

    // Force the second run onto another port
    let _occupied = std::net::TcpListener::bind(("127.0.0.1", preferred)).unwrap();

    let mut process = session.subscribe_process();
    let endpoints = session.subscribe_endpoint();
    let observer = tokio::spawn(async move {
        process
            .wait_for(|s| matches!(s, ProcessState::Starting | ProcessState::Running))
            .await
            .unwrap();
        endpoints.borrow().clone()
    });

    let second = session.start().await.unwrap();
    assert_ne!(second, first);
    let seen = tokio::time::timeout(Duration::from_secs(5), observer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen, Some(second));

    session.stop().await;
}
