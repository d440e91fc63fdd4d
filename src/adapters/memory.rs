//! In-memory port implementations for tests and local runs, with failure
//! injection for exercising the degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::ports::{Document, DocumentStore, ImageUploader, Notifier};
use crate::{Result, StorefrontError};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of documents currently in a collection.
    pub fn len(&self, collection: &str) -> usize {
        lock(&self.collections).get(collection).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorefrontError::StoreWrite("injected write failure".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorefrontError::StoreRead("injected read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, data: Value) -> Result<String> {
        self.check_write()?;
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .push(Document { id: id.clone(), data });
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_read()?;
        Ok(lock(&self.collections)
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn query(&self, collection: &str) -> Result<Vec<Document>> {
        self.check_read()?;
        Ok(lock(&self.collections).get(collection).cloned().unwrap_or_default())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        self.check_write()?;
        let mut collections = lock(&self.collections);
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(doc) => merge(&mut doc.data, patch),
            None => docs.push(Document { id: id.to_string(), data: patch }),
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.check_write()?;
        if let Some(docs) = lock(&self.collections).get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }
}

/// Shallow merge, matching the JSONB `||` semantics of the Postgres adapter.
fn merge(target: &mut Value, patch: Value) {
    match (target.as_object_mut(), patch) {
        (Some(target), Value::Object(patch)) => {
            for (key, value) in patch {
                target.insert(key, value);
            }
        }
        (_, patch) => *target = patch,
    }
}

/// Records every send; can be told to fail to exercise degraded success.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SentMail>>,
    fail: AtomicBool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMail {
    pub recipient: String,
    pub customer_name: String,
    pub order_id: String,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, recipient: &str, customer_name: &str, order_id: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorefrontError::Notification("injected mail failure".into()));
        }
        lock(&self.sent).push(SentMail {
            recipient: recipient.to_string(),
            customer_name: customer_name.to_string(),
            order_id: order_id.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUploader {
    count: AtomicU64,
    fail: AtomicBool,
}

impl MemoryUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageUploader for MemoryUploader {
    async fn upload(&self, _bytes: Vec<u8>) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorefrontError::Upload("injected upload failure".into()));
        }
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://images.example/{n}.png"))
    }
}
