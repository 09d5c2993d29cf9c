use std::sync::Arc;

use axum::http::HeaderName;
use tether_core::ShortCode;
use tether_shortener::Shortener;

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    redirect_base: String,
    principal_header: HeaderName,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        public_base_url: impl AsRef<str>,
        principal_header: HeaderName,
    ) -> Self {
        Self {
            shortener,
            redirect_base: format!("{}/r", public_base_url.as_ref().trim_end_matches('/')),
            principal_header,
        }
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn principal_header(&self) -> &HeaderName {
        &self.principal_header
    }

    /// Public URL that redirects to the target of `code`.
    pub fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.redirect_base)
    }
}
