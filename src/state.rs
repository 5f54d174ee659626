use std::sync::Arc;

use crate::{config::Config, service::NoteService};

pub struct AppState {
    pub service: Arc<NoteService>,
    pub config: Config,
}

impl AppState {
    pub const fn new(service: Arc<NoteService>, config: Config) -> Self {
        Self { service, config }
    }
}
