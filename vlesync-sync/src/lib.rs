//! Synchronization engine for the VLE directory.
//!
//! Two complementary mechanisms keep the VLE in step with the
//! learning-management database:
//! - **Incremental**: each domain event is classified into at most one
//!   remote operation and handed to a gateway
//! - **Bulk**: on demand, the full synchronizable state is computed as a
//!   deduplicated snapshot
//!
//! ## Components
//!
//! - **Classifier**: pure decision logic mapping a `DomainEvent` to an
//!   optional `SyncOperation`, including transitions into and out of
//!   synchronizable status
//! - **Reconciler**: bulk snapshot of courses, groups and memberships with
//!   tutor precedence applied
//! - **Gateway**: outbound delivery of operations (`HttpGateway`)
//! - **Dispatcher**: the event loop; contains every per-event failure
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vlesync_store::DirectoryStore;
//! use vlesync_sync::{DirectoryConfig, EventClassifier};
//! use vlesync_types::{DomainEvent, SyncOperation};
//!
//! let store = DirectoryStore::open_in_memory().unwrap();
//! let course_id = store.insert_course("id002", "Course full name 002").unwrap();
//! let classifier = EventClassifier::new(Arc::new(store), DirectoryConfig::default());
//!
//! let op = classifier
//!     .classify(&DomainEvent::CourseUpdated {
//!         course_id,
//!         old_vle_course_id: String::new(),
//!         fullname: "Course full name 002".into(),
//!     })
//!     .unwrap();
//!
//! assert_eq!(
//!     op,
//!     Some(SyncOperation::CreateCourse {
//!         vle_course_id: "id002".into(),
//!         name: "Course full name 002".into(),
//!     })
//! );
//! ```

mod classifier;
mod config;
mod dispatcher;
mod error;
mod gateway;
mod reconcile;

pub use classifier::EventClassifier;
pub use config::DirectoryConfig;
pub use dispatcher::{DispatchOutcome, DispatchStats, DispatcherHandle, SyncDispatcher};
pub use error::{
    ClassifyError, ClassifyResult, DispatchError, GatewayError, GatewayResult,
};
pub use gateway::{BasicCredentials, Delivery, GatewayConfig, HttpGateway, SyncGateway};
pub use reconcile::{collapse_course_roles, Reconciler};
