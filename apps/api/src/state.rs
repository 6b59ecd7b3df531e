use std::sync::Arc;

use crate::auth::blacklist::TokenBlacklist;
use crate::auth::store::UserStore;
use crate::auth::tokens::TokenIssuer;
use crate::config::Config;
use crate::cover_letter::CoverLetterWriter;
use crate::documents::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every storage seam is a trait object so handlers run unchanged against
/// Postgres/Redis in production and in-memory stores in tests.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tokens: TokenIssuer,
    pub users: Arc<dyn UserStore>,
    pub blacklist: Arc<dyn TokenBlacklist>,
    pub documents: Arc<dyn DocumentStore>,
    /// Cover-letter backend. Default: `LlmCoverLetterWriter`.
    pub writer: Arc<dyn CoverLetterWriter>,
}
