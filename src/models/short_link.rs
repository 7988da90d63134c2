use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{adapter::RequestBody, utils::time::iso_timestamp};

/// Body of `POST /shorten`
#[derive(Debug, Default, Validate)]
pub struct CreateShortLinkDto {
    #[validate(
        required(message = "URL is required"),
        length(min = 1, message = "URL is required")
    )]
    pub url: Option<String>,

    /// Caller-chosen short code, accepted verbatim when not taken
    pub short_code_input: Option<String>,
}

/// Body of `PUT /shorten/{code}`
#[derive(Debug, Default)]
pub struct UpdateShortLinkDto {
    pub url: Option<String>,
}

impl CreateShortLinkDto {
    pub fn from_body(body: &RequestBody) -> Self {
        Self {
            url: body.text_field("url"),
            short_code_input: body.text_field("shortCodeInput"),
        }
    }
}

impl UpdateShortLinkDto {
    pub fn from_body(body: &RequestBody) -> Self {
        Self {
            url: body.text_field("url"),
        }
    }
}

/// One row of the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLinkRecord {
    pub id: String,
    pub url: String,
    pub short_code: String,
    pub created_at: String,
    /// Written once at creation; url updates leave it untouched
    pub updated_at: String,
    pub count: u64,
}

impl ShortLinkRecord {
    pub fn new(url: String, short_code: String) -> Self {
        let timestamp = iso_timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            url,
            short_code,
            created_at: timestamp.clone(),
            updated_at: timestamp,
            count: 0,
        }
    }

    /// Cell values in column order A..F
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.url.clone(),
            self.short_code.clone(),
            self.created_at.clone(),
            self.updated_at.clone(),
            self.count.to_string(),
        ]
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
