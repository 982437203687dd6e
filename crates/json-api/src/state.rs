//! Shared handler state

use std::sync::Arc;

use catalog_app::context::AppContext;

/// Injected into every request via `affix_state`.
#[derive(Clone)]
pub(crate) struct State {
    pub(crate) app: AppContext,
    pub(crate) max_upload_bytes: u64,
}

impl State {
    #[must_use]
    pub(crate) fn new(app: AppContext, max_upload_bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            app,
            max_upload_bytes,
        })
    }
}
