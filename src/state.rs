// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, store::Store, utils::upload::FileStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub files: FileStore,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let files = FileStore::new(config.upload_dir.clone(), config.max_upload_bytes);
        Self {
            store,
            config,
            files,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for FileStore {
    fn from_ref(state: &AppState) -> Self {
        state.files.clone()
    }
}
