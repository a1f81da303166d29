//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_engine::{Actor, Engine};
use catalog_repository::{
    BatchOperationSummary, GroupRequest, IndexError, IndexGateway, IndexProvider,
    InMemoryProvider, ScanPage, ScanRequest,
};
use catalog_shared::{Catalog, Core, DocGroup, IndexDocument, Role, SearchPage, SearchRequest};
use serde_json::Value;

/// Delegates to an in-memory provider, failing writes of selected documents.
pub struct FailingProvider {
    pub inner: InMemoryProvider,
    failing_puts: Mutex<HashSet<String>>,
    failing_patches: Mutex<HashSet<(String, bool)>>,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self {
            inner: InMemoryProvider::new(),
            failing_puts: Mutex::new(HashSet::new()),
            failing_patches: Mutex::new(HashSet::new()),
        }
    }

    /// Reject every `put` containing `id`.
    pub fn fail_puts_of(&self, id: &str) {
        self.failing_puts.lock().unwrap().insert(id.to_string());
    }

    /// Reject patches of `id`'s lock flag to `locked`.
    pub fn fail_lock_patch(&self, id: &str, locked: bool) {
        self.failing_patches
            .lock()
            .unwrap()
            .insert((id.to_string(), locked));
    }

    pub fn heal(&self) {
        self.failing_puts.lock().unwrap().clear();
        self.failing_patches.lock().unwrap().clear();
    }
}

#[async_trait]
impl IndexProvider for FailingProvider {
    async fn ensure_core_exists(&self, core: Core) -> Result<(), IndexError> {
        self.inner.ensure_core_exists(core).await
    }

    async fn search(&self, core: Core, request: &SearchRequest) -> Result<SearchPage, IndexError> {
        self.inner.search(core, request).await
    }

    async fn get_documents(
        &self,
        core: Core,
        ids: &[String],
    ) -> Result<Vec<IndexDocument>, IndexError> {
        self.inner.get_documents(core, ids).await
    }

    async fn put_documents(
        &self,
        core: Core,
        docs: &[IndexDocument],
    ) -> Result<BatchOperationSummary, IndexError> {
        let rejected = {
            let failing = self.failing_puts.lock().unwrap();
            docs.iter()
                .any(|doc| doc.id().is_some_and(|id| failing.contains(id)))
        };
        if rejected {
            return Err(IndexError::update("injected write failure"));
        }
        self.inner.put_documents(core, docs).await
    }

    async fn patch_document(
        &self,
        core: Core,
        id: &str,
        field: &str,
        value: &Value,
    ) -> Result<(), IndexError> {
        let rejected = value.as_bool().is_some_and(|locked| {
            self.failing_patches
                .lock()
                .unwrap()
                .contains(&(id.to_string(), locked))
        });
        if rejected {
            return Err(IndexError::update("injected patch failure"));
        }
        self.inner.patch_document(core, id, field, value).await
    }

    async fn delete_document(&self, core: Core, id: &str) -> Result<(), IndexError> {
        self.inner.delete_document(core, id).await
    }

    async fn scan_page(&self, core: Core, request: &ScanRequest) -> Result<ScanPage, IndexError> {
        self.inner.scan_page(core, request).await
    }

    async fn group(
        &self,
        core: Core,
        request: &GroupRequest,
    ) -> Result<Vec<DocGroup>, IndexError> {
        self.inner.group(core, request).await
    }
}

pub struct Harness {
    pub provider: Arc<InMemoryProvider>,
    pub gateway: Arc<IndexGateway>,
    pub engine: Engine,
}

pub async fn harness() -> Harness {
    let provider = Arc::new(InMemoryProvider::new());
    let gateway = Arc::new(IndexGateway::new(provider.clone()));
    gateway.ensure_cores().await.unwrap();
    Harness {
        engine: Engine::new(gateway.clone()),
        provider,
        gateway,
    }
}

pub struct FailingHarness {
    pub provider: Arc<FailingProvider>,
    pub engine: Engine,
}

pub async fn failing_harness() -> FailingHarness {
    let provider = Arc::new(FailingProvider::new());
    let gateway = Arc::new(IndexGateway::new(provider.clone()));
    gateway.ensure_cores().await.unwrap();
    FailingHarness {
        engine: Engine::new(gateway),
        provider,
    }
}

pub fn user() -> Actor {
    Actor::new("editor", Role::User).with_catalog(Catalog::Rub)
}

pub fn admin() -> Actor {
    Actor::new("admin", Role::Admin).with_catalog(Catalog::Rub)
}

pub fn superadmin() -> Actor {
    Actor::new("root", Role::Superadmin).with_catalog(Catalog::Rub)
}
