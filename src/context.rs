use crate::config::Config;
use crate::db::DbPool;
use crate::service::ConversationService;
use std::sync::Arc;

/// Application context containing shared dependencies
/// This reduces parameter passing and makes it easier to add new dependencies
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<ConversationService>,
    pub db_pool: DbPool,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(service: Arc<ConversationService>, db_pool: DbPool, config: Arc<Config>) -> Self {
        Self {
            service,
            db_pool,
            config,
        }
    }
}
