//! Built-in command surface tests against a real SQLite store and config file
//! Run with: cargo test --test commands_test

mod common;

use std::sync::Arc;

use admin_bot::domain::entities::{Attachment, Event};
use admin_bot::domain::traits::{RelationalStore, SavedQueryStore};
use admin_bot::infrastructure::config::ConfigFile;
use admin_bot::infrastructure::database::Database;
use admin_bot::infrastructure::plugins::ManifestDirectory;
use admin_bot::plugins::builtin::{ModulesModule, QueriesModule, SettingsModule};
use admin_bot::plugins::{CompositeSource, ModuleSource, StaticModuleSource};

use common::Harness;

const SHIPPED_MODULES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/modules");

const SCHEMA: [&str; 2] = [
    "CREATE TABLE users (
        userId INTEGER PRIMARY KEY,
        referral_source TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        is_blocked INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE logs (
        userId INTEGER NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
];

/// Harness over `modules_dir` with an in-memory database attached
fn database_harness(modules_dir: &str) -> (Harness, Database) {
    let db = Database::in_memory().unwrap();
    let statics = Arc::new(StaticModuleSource::new());
    let source = CompositeSource::new()
        .with_source(Arc::clone(&statics) as Arc<dyn ModuleSource>)
        .with_source(Arc::new(ManifestDirectory::new(modules_dir)));

    let store = Arc::new(db.clone());
    let h = Harness::with_caps(&[100], Arc::new(source), statics, move |caps| {
        caps.with_relational(Arc::clone(&store) as Arc<dyn RelationalStore>)
            .with_queries(store as Arc<dyn SavedQueryStore>)
    });
    (h, db)
}

async fn seed(db: &Database) {
    for sql in SCHEMA {
        db.query(sql, &[]).await.unwrap();
    }
    db.query(
        "INSERT INTO users (userId, referral_source) VALUES (5, 'ads'), (6, 'ads'), (7, 'blog')",
        &[],
    )
    .await
    .unwrap();
    db.query("INSERT INTO logs (userId) VALUES (5), (7), (7), (7)", &[])
        .await
        .unwrap();
}

fn upload(file_ref: &str, file_name: &str) -> Event {
    Event::real(100, 1, "").with_attachment(Attachment {
        file_ref: file_ref.to_string(),
        file_name: file_name.to_string(),
    })
}

#[tokio::test]
async fn test_queryrun_offers_saved_queries_and_runs_the_chosen_one() {
    let dir = tempfile::tempdir().unwrap();
    let (h, db) = database_harness(dir.path().to_str().unwrap());
    h.install("queries", QueriesModule);

    h.router.dispatch(Event::real(100, 1, "/queryrun")).await;
    assert_eq!(h.transport.texts(), vec!["📭 No saved queries found."]);

    db.save_query("answer", "SELECT 42 AS answer").await.unwrap();
    h.transport.clear();
    h.router.dispatch(Event::real(100, 1, "/queryrun")).await;
    assert_eq!(h.transport.texts(), vec!["📌 Choose a saved query to run: [answer]"]);

    h.transport.clear();
    h.router.dispatch(Event::real(100, 1, "queryrun:answer")).await;
    let texts = h.transport.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains(r#"1. {"answer":42}"#));

    h.transport.clear();
    h.router.dispatch(Event::real(100, 1, "queryrun:missing")).await;
    assert_eq!(h.transport.texts(), vec!["⚠️ Query \"missing\" not found."]);
}

#[tokio::test]
async fn test_large_query_result_is_sent_as_a_document() {
    let dir = tempfile::tempdir().unwrap();
    let (h, _db) = database_harness(dir.path().to_str().unwrap());
    h.install("queries", QueriesModule);

    let sql = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 25) SELECT x FROM n";
    h.router.dispatch(Event::real(100, 4, format!("/query {}", sql))).await;

    assert!(h.transport.replies().is_empty());
    let documents = h.transport.documents();
    assert_eq!(documents.len(), 1);

    let (chat, name, bytes) = &documents[0];
    assert_eq!(*chat, 4);
    assert_eq!(name, "query_result.txt");
    let body = String::from_utf8(bytes.clone()).unwrap();
    assert_eq!(body.lines().count(), 25);
    assert!(body.ends_with(r#"25. {"x":25}"#));
}

#[tokio::test]
async fn test_shipped_stats_module_reports_activity() {
    let (h, db) = database_harness(SHIPPED_MODULES);
    seed(&db).await;
    h.loader.load_all().unwrap();

    h.router.dispatch(Event::real(100, 1, "/channels")).await;
    let channels = h.transport.texts().concat();
    assert!(channels.contains(r#""referral_source":"ads","total":2"#));
    assert!(channels.contains(r#""referral_source":"blog","total":1"#));

    h.transport.clear();
    h.router.dispatch(Event::real(100, 1, "/statfind week 1")).await;
    let top = h.transport.texts().concat();
    assert!(top.contains(r#""userId":7"#) && top.contains(r#""total":3"#));
    assert!(!top.contains("2. "));

    h.transport.clear();
    h.router.dispatch(Event::real(100, 1, "/activity")).await;
    let activity = h.transport.texts().concat();
    for stat in [r#""dau":2"#, r#""wau":2"#, r#""mau":2"#] {
        assert!(activity.contains(stat), "{} missing from {}", stat, activity);
    }

    h.transport.clear();
    h.router.dispatch(Event::real(100, 1, "/channeldata blog")).await;
    assert!(h.transport.texts().concat().contains(r#""userId":7"#));
}

#[tokio::test]
async fn test_shipped_block_command_updates_the_user() {
    let (h, db) = database_harness(SHIPPED_MODULES);
    seed(&db).await;
    h.loader.load_all().unwrap();

    h.router.dispatch(Event::real(100, 1, "/block 6 true")).await;
    let reply = h.transport.texts().concat();
    assert!(reply.contains(r#""is_blocked":1"#) && reply.contains(r#""userId":6"#));

    let rows = db
        .query("SELECT is_blocked FROM users WHERE userId = 6", &[])
        .await
        .unwrap();
    assert_eq!(rows[0]["is_blocked"], 1);

    h.transport.clear();
    h.router.dispatch(Event::real(7, 1, "/block 6 false")).await;
    let rows = db
        .query("SELECT is_blocked FROM users WHERE userId = 6", &[])
        .await
        .unwrap();
    assert_eq!(rows[0]["is_blocked"], 1);
}

#[tokio::test]
async fn test_listmodules_shows_module_descriptions() {
    let (h, _db) = database_harness(SHIPPED_MODULES);
    h.install("modules", ModulesModule);
    h.loader.load("users.yaml").unwrap();

    h.router.dispatch(Event::real(100, 1, "/listmodules")).await;
    let listing = h.transport.texts().concat();
    assert!(listing.contains("• users.yaml — User moderation (v1, 1 commands)"));
}

fn settings_harness(modules_dir: &std::path::Path, config: Arc<ConfigFile>) -> Harness {
    let statics = Arc::new(StaticModuleSource::new());
    let source = CompositeSource::new()
        .with_source(Arc::clone(&statics) as Arc<dyn ModuleSource>)
        .with_source(Arc::new(ManifestDirectory::new(modules_dir)));
    let h = Harness::with_caps(&[100], Arc::new(source), statics, move |caps| {
        caps.with_settings(config)
    });
    h.install("modules", ModulesModule);
    h.install("settings", SettingsModule);
    h
}

#[tokio::test]
async fn test_getsettings_sends_the_config_file() {
    let modules = tempfile::tempdir().unwrap();
    let conf = tempfile::tempdir().unwrap();
    let path = conf.path().join("config.yaml");
    std::fs::write(&path, "bot:\n  name: Ops\nadmins: [100]\n").unwrap();
    let h = settings_harness(modules.path(), Arc::new(ConfigFile::new(&path)));

    h.router.dispatch(Event::real(100, 3, "/getsettings")).await;

    assert_eq!(
        h.transport.documents(),
        vec![(
            3,
            "config.yaml".to_string(),
            b"bot:\n  name: Ops\nadmins: [100]\n".to_vec()
        )]
    );
}

#[tokio::test]
async fn test_uploaded_config_replaces_settings_and_is_not_a_module() {
    let modules = tempfile::tempdir().unwrap();
    let conf = tempfile::tempdir().unwrap();
    let path = conf.path().join("config.yaml");
    std::fs::write(&path, "admins: [100]\n").unwrap();
    let h = settings_harness(modules.path(), Arc::new(ConfigFile::new(&path)));

    let new_config = "bot:\n  name: Renamed\nadmins: [100, 101]\n";
    h.transport.add_file("file-1", new_config.as_bytes());
    h.router.dispatch(upload("file-1", "config.yaml")).await;

    assert_eq!(
        h.transport.texts(),
        vec!["✅ Configuration updated. Restart bot to apply."]
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), new_config);
    assert!(!h.loader.is_loaded("config.yaml"));
    assert!(!modules.path().join("config.yaml").exists());
}

#[tokio::test]
async fn test_invalid_config_upload_keeps_the_old_file() {
    let modules = tempfile::tempdir().unwrap();
    let conf = tempfile::tempdir().unwrap();
    let path = conf.path().join("config.yaml");
    std::fs::write(&path, "admins: [100]\n").unwrap();
    let h = settings_harness(modules.path(), Arc::new(ConfigFile::new(&path)));

    h.transport.add_file("file-1", b"admins: nobody\n");
    h.router.dispatch(upload("file-1", "config.yaml")).await;

    let texts = h.transport.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("❌ "));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "admins: [100]\n");
}
