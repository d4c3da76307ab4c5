#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use vlesync_store::DirectoryStore;
use vlesync_sync::{
    DirectoryConfig, Delivery, EventClassifier, GatewayError, GatewayResult, Reconciler,
    SyncGateway,
};
use vlesync_types::SyncOperation;

pub fn make_store() -> DirectoryStore {
    DirectoryStore::open_in_memory().unwrap()
}

pub fn make_classifier(store: &DirectoryStore) -> EventClassifier {
    EventClassifier::new(Arc::new(store.clone()), DirectoryConfig::default())
}

pub fn make_reconciler(store: &DirectoryStore) -> Reconciler {
    Reconciler::new(Arc::new(store.clone()), DirectoryConfig::default())
}

/// Gateway that records every operation it is asked to send.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SyncOperation>>,
}

impl RecordingGateway {
    pub fn sent(&self) -> Vec<SyncOperation> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncGateway for RecordingGateway {
    async fn send(&self, operation: &SyncOperation) -> GatewayResult<Delivery> {
        self.sent.lock().unwrap().push(operation.clone());
        Ok(Delivery::Delivered)
    }
}

/// Gateway that fails every send with the given HTTP status.
pub struct FailingGateway {
    pub status: u16,
}

#[async_trait]
impl SyncGateway for FailingGateway {
    async fn send(&self, _operation: &SyncOperation) -> GatewayResult<Delivery> {
        Err(GatewayError::Status {
            status: self.status,
            body: "boom".to_string(),
        })
    }
}

/// Gateway that never answers.
pub struct HangingGateway;

#[async_trait]
impl SyncGateway for HangingGateway {
    async fn send(&self, _operation: &SyncOperation) -> GatewayResult<Delivery> {
        std::future::pending::<()>().await;
        Ok(Delivery::Delivered)
    }
}
