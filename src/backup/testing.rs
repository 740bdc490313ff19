//! Shared fixtures for orchestrator tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use super::BackupOrchestrator;
use crate::config::settings::Settings;
use crate::crypto::{CryptoEngine, KeyDerivationParams};
use crate::error::{VaultError, VaultResult};
use crate::notify::{Notifier, SuccessEvent};
use crate::remote::{
    LocalFolderStore, RemoteError, RemoteFile, RemoteResult, RemoteStore, UploadedFile,
};
use crate::snapshot::{DataSource, JsonDirSource, TableSpec};

pub const SECRET: &str = "retail-backup-secret-0123456789abcdef";
pub const OTHER_SECRET: &str = "another-backup-secret-fedcba9876543210";

/// Local store that counts folder lookups
pub struct CountingStore {
    inner: LocalFolderStore,
    ensure_calls: AtomicUsize,
}

impl CountingStore {
    pub fn ensure_folder_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for CountingStore {
    async fn ensure_folder(&self, name: &str) -> RemoteResult<String> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.ensure_folder(name).await
    }

    async fn upload(
        &self,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: &str,
        description: Option<&str>,
    ) -> RemoteResult<UploadedFile> {
        self.inner
            .upload(folder_id, file_name, bytes, mime_type, description)
            .await
    }

    async fn list(&self, folder_id: &str) -> RemoteResult<Vec<RemoteFile>> {
        self.inner.list(folder_id).await
    }

    async fn download(&self, file_id: &str) -> RemoteResult<Vec<u8>> {
        self.inner.download(file_id).await
    }

    async fn delete(&self, file_id: &str) -> RemoteResult<()> {
        self.inner.delete(file_id).await
    }

    fn destination(&self) -> String {
        self.inner.destination()
    }
}

/// Store whose every call fails at the transport level
pub struct FailingStore;

#[async_trait]
impl RemoteStore for FailingStore {
    async fn ensure_folder(&self, _name: &str) -> RemoteResult<String> {
        Err(RemoteError::Transport("store unreachable".into()))
    }

    async fn upload(
        &self,
        _folder_id: &str,
        _file_name: &str,
        _bytes: Vec<u8>,
        _mime_type: &str,
        _description: Option<&str>,
    ) -> RemoteResult<UploadedFile> {
        Err(RemoteError::Transport("store unreachable".into()))
    }

    async fn list(&self, _folder_id: &str) -> RemoteResult<Vec<RemoteFile>> {
        Err(RemoteError::Transport("store unreachable".into()))
    }

    async fn download(&self, _file_id: &str) -> RemoteResult<Vec<u8>> {
        Err(RemoteError::Transport("store unreachable".into()))
    }

    async fn delete(&self, _file_id: &str) -> RemoteResult<()> {
        Err(RemoteError::Transport("store unreachable".into()))
    }

    fn destination(&self) -> String {
        "failing".to_string()
    }
}

/// Records notification events by file name or failure context
#[derive(Default)]
pub struct RecordingNotifier {
    successes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_success(&self, event: &SuccessEvent) -> VaultResult<()> {
        self.successes.lock().unwrap().push(event.file_name.clone());
        Ok(())
    }

    async fn notify_error(&self, _error: &str, context: &str) -> VaultResult<()> {
        self.errors.lock().unwrap().push(context.to_string());
        Ok(())
    }
}

/// Notifier that always fails
pub struct FlakyNotifier;

#[async_trait]
impl Notifier for FlakyNotifier {
    async fn notify_success(&self, _event: &SuccessEvent) -> VaultResult<()> {
        Err(VaultError::Notification("webhook down".into()))
    }

    async fn notify_error(&self, _error: &str, _context: &str) -> VaultResult<()> {
        Err(VaultError::Notification("webhook down".into()))
    }
}

/// Notifier that panics instead of returning
pub struct PanickingNotifier;

#[async_trait]
impl Notifier for PanickingNotifier {
    async fn notify_success(&self, _event: &SuccessEvent) -> VaultResult<()> {
        panic!("notifier exploded")
    }

    async fn notify_error(&self, _error: &str, _context: &str) -> VaultResult<()> {
        panic!("notifier exploded")
    }
}

/// Notifier that never completes
pub struct StalledNotifier;

#[async_trait]
impl Notifier for StalledNotifier {
    async fn notify_success(&self, _event: &SuccessEvent) -> VaultResult<()> {
        futures::future::pending().await
    }

    async fn notify_error(&self, _error: &str, _context: &str) -> VaultResult<()> {
        futures::future::pending().await
    }
}

/// Source that panics on any read
pub struct PanickingSource;

#[async_trait]
impl DataSource for PanickingSource {
    async fn read_all(&self, _table: &str) -> VaultResult<Vec<Value>> {
        panic!("table reader exploded")
    }
}

pub struct Fixture {
    pub settings: Settings,
    pub store: Arc<CountingStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: BackupOrchestrator,
    data_dir: std::path::PathBuf,
    _temp: TempDir,
}

impl Fixture {
    pub fn source(&self) -> Arc<dyn DataSource> {
        Arc::new(JsonDirSource::new(&self.data_dir))
    }

    pub fn engine(&self, secret: Option<&str>) -> CryptoEngine {
        CryptoEngine::configure(secret, KeyDerivationParams::for_tests())
    }

    pub fn folder_id(&self) -> String {
        self.settings.backup.folder_name.clone()
    }

    /// Overwrite one table's records
    pub fn write_table(&self, table: &str, records: Value) {
        std::fs::write(
            self.data_dir.join(format!("{}.json", table)),
            serde_json::to_vec(&records).unwrap(),
        )
        .unwrap();
    }
}

/// Three customers, no orders, registry of those two tables
pub async fn fixture(secret: Option<&str>) -> Fixture {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();

    let mut settings = Settings::default();
    settings.environment = "test".to_string();
    settings.kdf = KeyDerivationParams::for_tests();
    settings.tables = vec![
        TableSpec::new("customers").with_required(&["id", "email"]),
        TableSpec::new("orders").with_required(&["id", "customer_id"]),
    ];

    let store = Arc::new(CountingStore {
        inner: LocalFolderStore::new(temp.path().join("remote")).await.unwrap(),
        ensure_calls: AtomicUsize::new(0),
    });
    let notifier = Arc::new(RecordingNotifier::default());

    let orchestrator = BackupOrchestrator::new(
        &settings,
        Arc::new(JsonDirSource::new(&data_dir)),
        CryptoEngine::configure(secret, KeyDerivationParams::for_tests()),
        store.clone(),
        notifier.clone(),
    )
    .unwrap();

    let fx = Fixture {
        settings,
        store,
        notifier,
        orchestrator,
        data_dir,
        _temp: temp,
    };
    fx.write_table(
        "customers",
        json!([
            {"id": 1, "email": "ana@example.com"},
            {"id": 2, "email": "ben@example.com"},
            {"id": 3, "email": "cy@example.com"}
        ]),
    );
    fx.write_table("orders", json!([]));
    fx
}

/// Another orchestrator over the fixture's data and notifier
pub fn orchestrator_for(
    fx: &Fixture,
    store: Arc<dyn RemoteStore>,
    secret: Option<&str>,
) -> BackupOrchestrator {
    BackupOrchestrator::new(
        &fx.settings,
        fx.source(),
        fx.engine(secret),
        store,
        fx.notifier.clone(),
    )
    .unwrap()
}
