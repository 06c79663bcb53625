//! Shared application state for all routes. Built once at startup; read-only afterwards.

use crate::access::AccessPolicy;
use crate::executor::OperationExecutor;
use crate::routing::RouteTable;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub access: Arc<AccessPolicy>,
    pub executor: Arc<dyn OperationExecutor>,
}

impl AppState {
    pub fn new(routes: RouteTable, access: AccessPolicy, executor: Arc<dyn OperationExecutor>) -> Self {
        AppState {
            routes: Arc::new(routes),
            access: Arc::new(access),
            executor,
        }
    }
}
