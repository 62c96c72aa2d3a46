use std::sync::Arc;

use crate::refresh::RefreshNotifier;
use crate::services::ScopedQueryService;

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ScopedQueryService,
    pub refresh: RefreshNotifier,
    pub jwt_secret: Arc<str>,
}
