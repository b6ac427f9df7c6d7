//! Channel protocol integration tests
//!
//! `cargo test -p koderunner-core --test protocol_test`

#![cfg(unix)]

use koderunner_core::{
    ChannelHandle, ChannelSession, ChannelState, CloseReason, CommandRunnable, Endpoint,
    KodeRunner, Outbound, RunnableLoader, RunnablePackage, RunnableRegistry,
};
use koderunner_foundation::{Error, KodeConfig, Result, ShellConfig};
use koderunner_task::SessionCommand;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

const TIMEOUT: Duration = Duration::from_secs(10);

/// A `clang` runnable that only prints, plus a marker file for the build
struct FakeToolchain;

impl RunnablePackage for FakeToolchain {
    fn name(&self) -> &str {
        "fake-toolchain"
    }

    fn register(&self, registry: &mut RunnableRegistry) -> Result<()> {
        registry.register(Arc::new(
            CommandRunnable::new("fake-c", "clang")
                .with_build("touch {output} && printf 'compiled\\n'")
                .with_run("printf 'ran %s\\n' {project}"),
        ));
        registry.register(Arc::new(
            CommandRunnable::new("broken", "broken").with_build("printf 'bad\\n' >&2; exit 2"),
        ));
        registry.register(Arc::new(CommandRunnable::new("where", "where").with_run("pwd")));
        Ok(())
    }
}

async fn runner(temp: &TempDir) -> Arc<KodeRunner> {
    runner_with(KodeConfig::with_root(temp.path())).await
}

async fn runner_with(config: KodeConfig) -> Arc<KodeRunner> {
    config.ensure_layout().unwrap();
    let loader = RunnableLoader::new()
        .with_package(Arc::new(FakeToolchain))
        .with_search_dir(config.runnables_dir());
    KodeRunner::with_loader(config, loader).await
}

fn open(runner: &Arc<KodeRunner>, endpoint: Endpoint) -> (ChannelSession, UnboundedReceiver<Outbound>) {
    let (handle, rx) = ChannelHandle::new(endpoint);
    (ChannelSession::open(Arc::clone(runner), handle), rx)
}

/// Every text frame queued so far
fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<String> {
    let mut texts = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Outbound::Text(text) = message {
            texts.push(text);
        }
    }
    texts
}

/// Wait until the joined output contains `needle`
async fn wait_for_text(rx: &mut UnboundedReceiver<Outbound>, needle: &str) -> String {
    let mut seen = String::new();
    tokio::time::timeout(TIMEOUT, async {
        while !seen.contains(needle) {
            match rx.recv().await {
                Some(Outbound::Text(text)) => seen.push_str(&text),
                Some(Outbound::Close) | None => break,
            }
        }
    })
    .await
    .expect("timed out waiting for output");
    seen
}

const SOURCE: &str = "// File_name: main.c\n// Project: demo\nint main(void) { return 0; }\n";

const BUILD_AND_RUN: &str = r#"{"Project_Name":"demo","Main_File":"main.c","Project_Build_Systems":"clang","Project_Output":"main","Run_On_Build":"True"}"#;

#[tokio::test]
async fn test_code_submission_saves_full_message() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let (mut code, mut rx) = open(&runner, Endpoint::Code);

    code.handle_text(SOURCE).await.unwrap();

    let project_dir = runner.config().project_dir("demo");
    let saved = std::fs::read_to_string(project_dir.join("main.c")).unwrap();
    assert_eq!(saved, SOURCE);
    assert_eq!(
        drain(&mut rx),
        vec![format!("File: main.c saved to {}", project_dir.display())]
    );
    assert_eq!(code.state(), ChannelState::Receiving);
}

#[tokio::test]
async fn test_code_without_file_name_is_ignored() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let (mut code, mut rx) = open(&runner, Endpoint::Code);

    code.handle_text("# Project: demo\nprint('x')\n").await.unwrap();

    assert!(!runner.config().project_dir("demo").exists());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_build_and_run() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let (mut code, _code_rx) = open(&runner, Endpoint::Code);
    code.handle_text(SOURCE).await.unwrap();

    let (mut pms, mut rx) = open(&runner, Endpoint::Pms);
    pms.handle_text(BUILD_AND_RUN).await.unwrap();

    let output = drain(&mut rx).concat();
    assert!(output.contains("<color=#FF00FF>Building fake-c project...</color>"));
    assert!(output.contains("compiled\n"));
    assert!(output.contains("<color=#00FF00>Running program...</color>"));
    assert!(output.contains("ran demo\n"));
    assert!(output.ends_with(r#"{"status":"completed","project":"demo","build_system":"clang"}"#));

    assert!(runner.config().project_dir("demo").join("main").exists());
    assert!(runner.sessions().is_empty());
}

#[tokio::test]
async fn test_build_without_run() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    std::fs::create_dir_all(runner.config().project_dir("demo")).unwrap();

    let (mut pms, mut rx) = open(&runner, Endpoint::Pms);
    pms.handle_text(&BUILD_AND_RUN.replace("\"True\"", "\"true\""))
        .await
        .unwrap();

    let output = drain(&mut rx).concat();
    assert!(output.contains("compiled\n"));
    assert!(!output.contains("ran demo"));
}

#[tokio::test]
async fn test_failed_build_reports_error() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let (mut pms, mut rx) = open(&runner, Endpoint::Pms);

    pms.handle_text(r#"{"Project_Name":"demo","Project_Build_Systems":"broken","Run_On_Build":"True"}"#)
        .await
        .unwrap();

    let frames = drain(&mut rx);
    let output = frames.concat();
    assert!(output.contains("bad\n"));
    assert!(output.contains("Build failed with exit code 2"));

    let ack: serde_json::Value = serde_json::from_str(frames.last().unwrap()).unwrap();
    assert_eq!(ack["status"], "error");
    assert_eq!(ack["kind"], "runnable");
}

#[tokio::test]
async fn test_shell_spawn_failure_reports_error() {
    let temp = TempDir::new().unwrap();
    let mut config = KodeConfig::with_root(temp.path());
    config.shell = ShellConfig::new("/nonexistent/koderunner-shell", "-c");
    let runner = runner_with(config).await;
    let (mut pms, mut rx) = open(&runner, Endpoint::Pms);

    pms.handle_text(BUILD_AND_RUN).await.unwrap();

    let frames = drain(&mut rx);
    let ack: serde_json::Value = serde_json::from_str(frames.last().unwrap()).unwrap();
    assert_eq!(ack["status"], "error");
    assert_eq!(ack["kind"], "process_spawn");
    assert_eq!(pms.state(), ChannelState::Receiving);
    assert!(runner.sessions().is_empty());
}

#[tokio::test]
async fn test_run_starts_in_project_dir() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let project_dir = runner.config().project_dir("demo");
    std::fs::create_dir_all(&project_dir).unwrap();

    let (mut pms, mut rx) = open(&runner, Endpoint::Pms);
    pms.handle_text(r#"{"Project_Name":"demo","Project_Build_Systems":"where"}"#)
        .await
        .unwrap();

    let output = drain(&mut rx).concat();
    let cwd = output
        .lines()
        .find(|line| line.starts_with('/'))
        .expect("pwd printed nothing");
    assert_eq!(
        std::path::Path::new(cwd).canonicalize().unwrap(),
        project_dir.canonicalize().unwrap()
    );
}

#[tokio::test]
async fn test_unknown_build_system() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let (mut pms, mut rx) = open(&runner, Endpoint::Pms);

    pms.handle_text(r#"{"Project_Name":"demo","Project_Build_Systems":"cobol"}"#)
        .await
        .unwrap();

    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    let ack: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(ack["status"], "error");
    assert_eq!(ack["kind"], "not_found");
}

#[tokio::test]
async fn test_malformed_build_request_dropped() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let (mut pms, mut rx) = open(&runner, Endpoint::Pms);

    pms.handle_text("{ definitely not json").await.unwrap();
    pms.handle_text(r#"{"Main_File":"a.c"}"#).await.unwrap();

    assert!(drain(&mut rx).is_empty());
    assert_eq!(pms.state(), ChannelState::Receiving);
    assert_eq!(runner.hub().count(Endpoint::Pms), 1);
}

#[tokio::test]
async fn test_stop_kills_everything() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let shell = runner.config().shell.clone();

    let spawned: Vec<_> = (0..3)
        .map(|_| {
            runner
                .sessions()
                .spawn(&shell, SessionCommand::new("sleep 30"))
                .unwrap()
        })
        .collect();
    assert_eq!(runner.sessions().len(), 3);

    let (mut stop, mut rx) = open(&runner, Endpoint::Stop);
    stop.handle_text(r#"{"stopped": false}"#).await.unwrap();
    assert!(drain(&mut rx).is_empty());
    assert_eq!(runner.sessions().len(), 3);

    stop.handle_text(r#"{"stopped": true}"#).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![r#"{"stopped":true,"message":"All processes stopped"}"#.to_string()]
    );
    assert!(runner.sessions().is_empty());

    for s in &spawned {
        tokio::time::timeout(TIMEOUT, s.session.wait())
            .await
            .unwrap()
            .unwrap();
    }

    // same ack with nothing running
    stop.handle_text(r#"{"stopped": true}"#).await.unwrap();
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn test_terminal_input_roundtrip() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let (mut term, mut rx) = open(&runner, Endpoint::TermInput);

    let shell = runner.config().shell.clone();
    let spawned = runner
        .sessions()
        .spawn(&shell, SessionCommand::new("read line; printf '\\033[31mgot:%s\\033[0m\\n' \"$line\""))
        .unwrap();

    term.handle_text("hello").await.unwrap();

    let seen = wait_for_text(&mut rx, "</color>").await;
    assert!(seen.contains("<color=#FF0000>got:hello</color>"));
    assert_eq!(spawned.session.wait().await.unwrap(), 0);

    // nobody left to take input; still not an error
    term.handle_text("ignored").await.unwrap();
}

#[tokio::test]
async fn test_fault_close_reloads_runnables() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    assert!(runner.registry().snapshot().resolve("rust").is_err());

    let pkg = runner.config().runnables_dir().join("cargo");
    std::fs::create_dir_all(&pkg).unwrap();
    std::fs::write(
        pkg.join("runnable.json"),
        r#"{"name":"cargo","language":"rust","run":"cargo run"}"#,
    )
    .unwrap();

    let (mut code, mut rx) = open(&runner, Endpoint::Code);
    assert_eq!(runner.hub().count(Endpoint::Code), 1);

    code.close(CloseReason::Fault("connection reset".into())).await;

    assert_eq!(code.state(), ChannelState::Closed);
    assert_eq!(runner.hub().count(Endpoint::Code), 0);
    assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    assert_eq!(
        runner.registry().snapshot().resolve("rust").unwrap().name(),
        "cargo"
    );

    let err = code.handle_text(SOURCE).await.unwrap_err();
    assert!(matches!(err, Error::ChannelIo(_)));
}

#[tokio::test]
async fn test_client_close_keeps_sessions() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let shell = runner.config().shell.clone();
    let spawned = runner
        .sessions()
        .spawn(&shell, SessionCommand::new("sleep 30"))
        .unwrap();

    let (mut term, _rx) = open(&runner, Endpoint::TermInput);
    term.close(CloseReason::Client).await;

    assert!(runner.sessions().contains(spawned.session.id()));
    runner.stop_all();
}

#[tokio::test]
async fn test_reply_to_vanished_transport() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    let (mut stop, rx) = open(&runner, Endpoint::Stop);
    drop(rx);

    let err = stop.handle_text(r#"{"stopped": true}"#).await.unwrap_err();
    assert!(matches!(err, Error::ChannelIo(_)));
}

#[tokio::test]
async fn test_drop_detaches_channel() {
    let temp = TempDir::new().unwrap();
    let runner = runner(&temp).await;
    {
        let (_session, _rx) = open(&runner, Endpoint::Pms);
        assert_eq!(runner.hub().count(Endpoint::Pms), 1);
    }
    assert_eq!(runner.hub().count(Endpoint::Pms), 0);
}
