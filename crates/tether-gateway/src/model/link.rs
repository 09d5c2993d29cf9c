use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tether_core::Link;
use tether_shortener::CreateLink;

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub target_url: String,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

impl From<CreateLinkRequest> for CreateLink {
    fn from(request: CreateLinkRequest) -> Self {
        CreateLink {
            target_url: request.target_url,
            expires_at: request.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub code: String,
    pub target_url: String,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub short_url: String,
}

impl LinkResponse {
    pub fn new(link: Link, short_url: String) -> Self {
        Self {
            code: link.code.to_string(),
            target_url: link.target_url,
            created_at: link.created_at,
            expires_at: link.expires_at,
            short_url,
        }
    }
}
