//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use tokio::sync::mpsc;

use admin_bot::application::errors::{ConfigError, HandlerError, LoadError, TransportError};
use admin_bot::application::permissions::PermissionGuard;
use admin_bot::application::routing::{
    Capabilities, CommandRouter, HandlerBinding, HandlerContext, Pattern, SharedTable,
};
use admin_bot::application::scheduler::Scheduler;
use admin_bot::domain::entities::{ActorId, ChatId, Event};
use admin_bot::domain::traits::{AdminPersistence, KeyboardButton, Transport};
use admin_bot::infrastructure::config::Config;
use admin_bot::plugins::{CommandModule, ModuleSource, PluginLoader, RegistrationContext, StaticModuleSource};

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Records every reply instead of sending it
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChatId, String)>>,
    documents: Mutex<Vec<(ChatId, String, Vec<u8>)>>,
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingTransport {
    pub fn replies(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = self.replies().into_iter().map(|(_, t)| t).collect();
        texts.sort();
        texts
    }

    /// Sent files as (chat, file name, contents)
    pub fn documents(&self) -> Vec<(ChatId, String, Vec<u8>)> {
        self.documents.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.documents.lock().unwrap().clear();
    }

    pub fn add_file(&self, file_ref: &str, bytes: &[u8]) {
        self.files.lock().unwrap().push((file_ref.to_string(), bytes.to_vec()));
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_reply(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_with_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), TransportError> {
        let labels: Vec<String> = buttons.iter().flatten().map(|b| b.text.clone()).collect();
        self.sent
            .lock()
            .unwrap()
            .push((chat_id, format!("{} [{}]", text, labels.join(", "))));
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.documents
            .lock()
            .unwrap()
            .push((chat_id, file_name.to_string(), bytes));
        Ok(())
    }

    async fn fetch_uploaded_file(&self, file_ref: &str) -> Result<Vec<u8>, TransportError> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|(r, _)| r == file_ref)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| TransportError::Api(format!("unknown file {}", file_ref)))
    }
}

/// Keeps the last persisted admin list in memory
#[derive(Default)]
pub struct MemoryPersistence {
    pub saved: Mutex<Option<Vec<ActorId>>>,
}

#[async_trait]
impl AdminPersistence for MemoryPersistence {
    async fn persist(&self, admins: &[ActorId]) -> Result<(), ConfigError> {
        *self.saved.lock().unwrap() = Some(admins.to_vec());
        Ok(())
    }
}

type BuildFn = dyn Fn() -> Result<Vec<HandlerBinding>, LoadError> + Send + Sync;

/// Module whose bindings come from a closure
pub struct TestModule(Box<BuildFn>);

impl TestModule {
    pub fn new(build: impl Fn() -> Result<Vec<HandlerBinding>, LoadError> + Send + Sync + 'static) -> Self {
        Self(Box::new(build))
    }

    /// One binding for `/<command>` replying `text`
    pub fn replying(command: &'static str, text: &'static str) -> Self {
        Self::new(move || Ok(vec![reply_binding(command, text)]))
    }

    pub fn failing(reason: &'static str) -> Self {
        Self::new(move || {
            Err(LoadError::Registration {
                module: "test".to_string(),
                reason: reason.to_string(),
            })
        })
    }
}

impl CommandModule for TestModule {
    fn register(&self, _ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        (self.0)()
    }
}

pub fn reply_binding(command: &str, text: &'static str) -> HandlerBinding {
    HandlerBinding::from_fn(Pattern::command(command, None).unwrap(), move |_ctx: HandlerContext| async move {
        Ok::<_, HandlerError>(Some(text.to_string()))
    })
}

/// Everything wired the way the binary wires it, over a recording transport
pub struct Harness {
    pub router: Arc<CommandRouter>,
    pub transport: Arc<RecordingTransport>,
    pub persistence: Arc<MemoryPersistence>,
    pub guard: Arc<PermissionGuard>,
    pub scheduler: Arc<Scheduler>,
    pub loader: Arc<PluginLoader>,
    pub source: Arc<StaticModuleSource>,
    pub table: Arc<SharedTable>,
    pub inbound: mpsc::UnboundedReceiver<Event>,
}

impl Harness {
    pub fn new(admins: &[ActorId]) -> Self {
        let source = Arc::new(StaticModuleSource::new());
        Self::with_source(admins, Arc::clone(&source) as Arc<dyn ModuleSource>, source)
    }

    pub fn with_source(
        admins: &[ActorId],
        module_source: Arc<dyn ModuleSource>,
        source: Arc<StaticModuleSource>,
    ) -> Self {
        Self::with_caps(admins, module_source, source, |caps| caps)
    }

    /// Like `with_source`, with extra capabilities such as a database
    pub fn with_caps(
        admins: &[ActorId],
        module_source: Arc<dyn ModuleSource>,
        source: Arc<StaticModuleSource>,
        customize: impl FnOnce(Capabilities) -> Capabilities,
    ) -> Self {
        ensure_init();

        let persistence = Arc::new(MemoryPersistence::default());
        let guard = Arc::new(PermissionGuard::new(
            admins.iter().copied(),
            Arc::clone(&persistence) as Arc<dyn AdminPersistence>,
        ));
        let (tx, inbound) = mpsc::unbounded_channel();
        let scheduler = Arc::new(Scheduler::new(Arc::clone(&guard), tx));
        let table = Arc::new(SharedTable::new());
        let loader = Arc::new(PluginLoader::new(module_source, Arc::clone(&table)));
        let transport = Arc::new(RecordingTransport::default());

        let caps = Capabilities::new(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&guard),
            Arc::clone(&scheduler),
            Arc::clone(&loader),
            Arc::new(Config::default()),
        );
        let router = Arc::new(CommandRouter::new(Arc::clone(&table), customize(caps)));

        Self {
            router,
            transport,
            persistence,
            guard,
            scheduler,
            loader,
            source,
            table,
            inbound,
        }
    }

    /// Add a module to the static source and load it
    pub fn install<M: CommandModule + 'static>(&self, module_id: &str, module: M) {
        self.source.insert(module_id, Arc::new(module));
        self.loader.load(module_id).unwrap();
    }
}
