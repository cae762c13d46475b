//! Business services shared by the API and the worker
//!
//! Each service owns an `Arc<dyn Store>` and, where it caches, a
//! [`CacheLayer`]. Store calls are bounded by the operation timeout; cache
//! calls never fail a request.

pub mod accounts;
pub mod error;
pub mod projects;
pub mod protocol;
pub mod tasks;

pub use accounts::{AccountService, Registration, Session};
pub use error::{FieldError, ServiceError};
pub use projects::{ProjectPage, ProjectService};
pub use tasks::TaskService;

use crate::cache::{CacheBackend, CacheLayer};
use crate::config::Config;
use crate::store::Store;
use std::sync::Arc;

/// All services wired from one configuration
#[derive(Clone)]
pub struct Services {
    pub projects: ProjectService,
    pub tasks: TaskService,
    pub accounts: AccountService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn CacheBackend>, config: &Config) -> Self {
        let layer = CacheLayer::new(cache);
        let timeout = config.operation_timeout;

        Self {
            projects: ProjectService::new(
                store.clone(),
                layer.clone(),
                config.cache.project_ttl,
                timeout,
            ),
            tasks: TaskService::new(store.clone(), layer, config.cache.task_list_ttl, timeout),
            accounts: AccountService::new(store, config.jwt.secret.clone(), timeout),
        }
    }
}
