//! In-memory stand-in for the vector service.

#![allow(dead_code)]

use async_trait::async_trait;
use helen_core::{
    AddContextRequest, AddContextResponse, CollectionDescriptor, ServiceHealth, StoreClient,
    VaultError, VaultResult,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Upserts by id like the real service; documents without ids get a fresh one.
#[derive(Default)]
pub struct FakeStore {
    down: AtomicBool,
    collections: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    failing: Mutex<HashSet<String>>,
    add_calls: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn fail_writes_to(&self, collection: &str) {
        self.failing.lock().unwrap().insert(collection.to_string());
    }

    pub fn heal_writes_to(&self, collection: &str) {
        self.failing.lock().unwrap().remove(collection);
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn documents(&self, collection: &str) -> Vec<String> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    fn unavailable(&self) -> VaultResult<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(VaultError::ServiceUnavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn health(&self) -> VaultResult<ServiceHealth> {
        self.unavailable()?;
        Ok(ServiceHealth {
            status: Some("healthy".into()),
            service: Some("fake".into()),
            ..Default::default()
        })
    }

    async fn list_collections(&self) -> VaultResult<Vec<CollectionDescriptor>> {
        self.unavailable()?;
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .map(|(name, docs)| CollectionDescriptor {
                name: name.clone(),
                count: docs.len() as u64,
                metadata: None,
            })
            .collect())
    }

    async fn add_context(&self, request: &AddContextRequest) -> VaultResult<AddContextResponse> {
        self.unavailable()?;
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&request.collection_name) {
            return Err(VaultError::RemoteWriteFailure {
                collection: request.collection_name.clone(),
                reason: "HTTP 500 Internal Server Error".into(),
            });
        }

        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(request.collection_name.clone()).or_default();
        let mut ids = Vec::new();
        for (i, document) in request.documents.iter().enumerate() {
            let id = request
                .ids
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("auto-{}", docs.len()));
            docs.insert(id.clone(), document.clone());
            ids.push(id);
        }
        Ok(AddContextResponse {
            status: Some("success".into()),
            added_count: Some(request.documents.len() as u64),
            collection: Some(request.collection_name.clone()),
            ids,
        })
    }

    fn base_url(&self) -> &str {
        "http://fake.local:8000"
    }
}
