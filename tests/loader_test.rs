//! Module loading and hot-reload integration tests
//! Run with: cargo test --test loader_test

mod common;

use std::sync::{Arc, Barrier};
use std::time::Duration;

use admin_bot::application::errors::LoadError;
use admin_bot::domain::entities::{Attachment, Event};
use admin_bot::infrastructure::plugins::ManifestDirectory;
use admin_bot::plugins::builtin::modules::ModulesModule;
use admin_bot::plugins::{CompositeSource, ModuleSource, StaticModuleSource};

use common::{reply_binding, Harness, TestModule};

const GREETER: &str = r#"
description: Greetings
commands:
  - command: hello
    args: '(\w+)'
    auth: false
    reply: "Hello, $1!"
"#;

const GREETER_V2: &str = r#"
commands:
  - command: hello
    args: '(\w+)'
    auth: false
    reply: "Hi again, $1!"
"#;

fn labels(h: &Harness, text: &str) -> Vec<String> {
    h.loader
        .snapshot()
        .matching(&Event::real(100, 1, text))
        .iter()
        .map(|m| m.binding.label())
        .collect()
}

fn manifest_harness(dir: &std::path::Path) -> Harness {
    let statics = Arc::new(StaticModuleSource::new());
    let source = CompositeSource::new()
        .with_source(Arc::clone(&statics) as Arc<dyn ModuleSource>)
        .with_source(Arc::new(ManifestDirectory::new(dir)));
    Harness::with_source(&[100], Arc::new(source), statics)
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_bindings() {
    let h = Harness::new(&[100]);
    h.install("alpha", TestModule::replying("status", "v1"));
    let version = h.loader.snapshot().version();

    h.source.insert("alpha", Arc::new(TestModule::failing("syntax error")));
    let err = h.loader.reload("alpha").unwrap_err();

    assert!(matches!(err, LoadError::Registration { .. }));
    assert_eq!(h.loader.snapshot().version(), version);

    h.router.dispatch(Event::real(100, 1, "/status")).await;
    assert_eq!(h.transport.texts(), vec!["v1"]);
}

#[tokio::test]
async fn test_load_order_does_not_change_matches() {
    let forward = Harness::new(&[100]);
    forward.install("a", TestModule::replying("status", "a"));
    forward.install("b", TestModule::replying("status", "b"));

    let backward = Harness::new(&[100]);
    backward.install("b", TestModule::replying("status", "b"));
    backward.install("a", TestModule::replying("status", "a"));

    assert_eq!(labels(&forward, "/status"), labels(&backward, "/status"));
    assert_eq!(labels(&forward, "/status").len(), 2);
}

#[tokio::test]
async fn test_module_without_bindings_is_rejected() {
    let h = Harness::new(&[100]);
    h.source.insert("empty", Arc::new(TestModule::new(|| Ok(Vec::new()))));

    assert!(matches!(h.loader.load("empty"), Err(LoadError::Registration { .. })));
    assert!(!h.loader.is_loaded("empty"));
}

#[tokio::test]
async fn test_unload_removes_only_that_module() {
    let h = Harness::new(&[100]);
    h.install("a", TestModule::replying("status", "a"));
    h.install("b", TestModule::replying("status", "b"));

    h.loader.unload("a").unwrap();

    let remaining = labels(&h, "/status");
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].starts_with("b:"));
    assert!(matches!(h.loader.unload("a"), Err(LoadError::NotLoaded(_))));
}

#[tokio::test]
async fn test_change_for_vanished_module_unloads_it() {
    let h = Harness::new(&[100]);
    h.install("a", TestModule::replying("status", "a"));

    h.source.remove("a");
    h.loader.on_change("a");

    assert!(!h.loader.is_loaded("a"));
    assert!(h.loader.loaded().is_empty());
}

#[tokio::test]
async fn test_change_reloads_and_bumps_version() {
    let h = Harness::new(&[100]);
    h.install("a", TestModule::replying("status", "old"));

    h.source.insert(
        "a",
        Arc::new(TestModule::new(|| {
            Ok(vec![reply_binding("status", "new"), reply_binding("extra", "more")])
        })),
    );
    h.loader.on_change("a");

    let loaded = h.loader.loaded();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].version, 2);
    assert_eq!(loaded[0].bindings, 2);
}

#[tokio::test]
async fn test_load_all_skips_broken_modules() {
    let h = Harness::new(&[100]);
    h.source.insert("good", Arc::new(TestModule::replying("status", "ok")));
    h.source.insert("bad", Arc::new(TestModule::failing("nope")));

    assert_eq!(h.loader.load_all().unwrap(), 1);
    assert!(h.loader.is_loaded("good"));
    assert!(!h.loader.is_loaded("bad"));
}

#[tokio::test]
async fn test_manifest_modules_install_reload_and_vanish() {
    let dir = tempfile::tempdir().unwrap();
    let h = manifest_harness(dir.path());

    h.loader.install("greeter.yaml", GREETER.as_bytes()).unwrap();
    h.router.dispatch(Event::real(7, 1, "/hello bob")).await;
    assert_eq!(h.transport.texts(), vec!["Hello, bob!"]);

    // A broken edit leaves the loaded version in place
    std::fs::write(dir.path().join("greeter.yaml"), "commands: [").unwrap();
    h.loader.on_change("greeter.yaml");
    assert_eq!(h.loader.loaded()[0].version, 1);

    std::fs::write(dir.path().join("greeter.yaml"), GREETER_V2).unwrap();
    h.loader.on_change("greeter.yaml");
    h.transport.clear();
    h.router.dispatch(Event::real(7, 1, "/hello bob")).await;
    assert_eq!(h.transport.texts(), vec!["Hi again, bob!"]);

    std::fs::remove_file(dir.path().join("greeter.yaml")).unwrap();
    h.loader.on_change("greeter.yaml");
    assert!(!h.loader.is_loaded("greeter.yaml"));
}

#[tokio::test]
async fn test_uploaded_module_file_is_installed() {
    let dir = tempfile::tempdir().unwrap();
    let h = manifest_harness(dir.path());
    h.install("modules", ModulesModule);
    h.transport.add_file("file-1", GREETER.as_bytes());

    let upload = Event::real(100, 1, "").with_attachment(Attachment {
        file_ref: "file-1".to_string(),
        file_name: "greeter.yaml".to_string(),
    });
    h.router.dispatch(upload).await;

    assert!(h.loader.is_loaded("greeter.yaml"));
    assert!(dir.path().join("greeter.yaml").exists());
}

#[tokio::test]
async fn test_upload_from_non_admin_is_denied() {
    let dir = tempfile::tempdir().unwrap();
    let h = manifest_harness(dir.path());
    h.install("modules", ModulesModule);
    h.transport.add_file("file-1", GREETER.as_bytes());

    let upload = Event::real(7, 1, "").with_attachment(Attachment {
        file_ref: "file-1".to_string(),
        file_name: "greeter.yaml".to_string(),
    });
    h.router.dispatch(upload).await;

    assert!(!h.loader.is_loaded("greeter.yaml"));
    assert!(!dir.path().join("greeter.yaml").exists());
}

#[tokio::test]
async fn test_slow_reload_cannot_publish_over_a_newer_one() {
    let h = Harness::new(&[100]);
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let (e, r) = (Arc::clone(&entered), Arc::clone(&release));
    h.source.insert(
        "a",
        Arc::new(TestModule::new(move || {
            e.wait();
            r.wait();
            Ok(vec![reply_binding("status", "old")])
        })),
    );

    let loader = Arc::clone(&h.loader);
    let slow = std::thread::spawn(move || loader.load("a").map(|_| ()));
    entered.wait();

    // The file changes while the first load is still registering
    h.source.insert("a", Arc::new(TestModule::replying("status", "new")));
    let loader = Arc::clone(&h.loader);
    let fast = std::thread::spawn(move || loader.load("a").map(|_| ()));

    std::thread::sleep(Duration::from_millis(100));
    release.wait();
    slow.join().unwrap().unwrap();
    fast.join().unwrap().unwrap();

    h.router.dispatch(Event::real(100, 1, "/status")).await;
    assert_eq!(h.transport.texts(), vec!["new"]);
    assert_eq!(h.loader.loaded()[0].version, 2);
}
