//! Requests for the remote generation backend.
//!
//! Two techniques target the same backend: referencing a previously uploaded
//! file, or inlining the audio as base64.

use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::mime;
use crate::transport::{HttpRequest, RequestBody};
use crate::types::{AudioInput, UploadedFileHandle};

/// Prompt sent alongside the audio unless configuration overrides it.
pub const DEFAULT_PROMPT: &str = "You are listening to a short voice note recorded by a student. \
Assess the speaker's emotional state and stress level from tone, pace and energy. \
Reply with a short label (for example \"Calm\", \"Stressed\", \"Sad\" or \"Happy\") on the first line, \
followed by two or three sentences explaining what you heard.";

/// Largest payload the inline strategy will encode.
pub const MAX_INLINE_BYTES: usize = 20 * 1024 * 1024;

/// Path of the raw upload endpoint relative to the backend origin.
pub const UPLOAD_PATH: &str = "/upload/v1beta/files";

/// Generation request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    FileData { file_data: FileData },
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
}

impl GenerationPayload {
    fn user_turn(prompt: &str, media: Part, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    media,
                ],
            }],
            generation_config: GenerationConfig { temperature },
        }
    }

    /// Payload referencing an uploaded file.
    pub fn file_reference(file_uri: &str, mime_type: &str, prompt: &str, temperature: f32) -> Self {
        let media = Part::FileData {
            file_data: FileData {
                mime_type: mime_type.to_string(),
                file_uri: file_uri.to_string(),
            },
        };
        Self::user_turn(prompt, media, temperature)
    }

    /// Payload carrying the audio inline as base64.
    pub fn inline(input: &AudioInput, prompt: &str, temperature: f32) -> Self {
        let media = Part::InlineData {
            inline_data: InlineData {
                mime_type: mime::classify(&input.file_name).to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(&input.data),
            },
        };
        Self::user_turn(prompt, media, temperature)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Append the API key as the `key` query parameter.
pub fn keyed_url(endpoint: &str, api_key: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(endpoint.trim())?;
    url.query_pairs_mut().append_pair("key", api_key.trim());
    Ok(url.to_string())
}

/// Upload endpoint: the configured override, else derived from the generation endpoint's origin.
pub fn upload_url(generation_endpoint: &str, configured: Option<&str>) -> Result<String, url::ParseError> {
    if let Some(url) = configured.map(str::trim).filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }
    let mut url = Url::parse(generation_endpoint.trim())?;
    url.set_path(UPLOAD_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Raw-bytes upload request for the file-reference strategy.
pub fn build_upload_request(url: &str, input: &AudioInput) -> HttpRequest {
    HttpRequest {
        url: url.to_string(),
        headers: vec![("X-Goog-Upload-Protocol".to_string(), "raw".to_string())],
        body: RequestBody::Raw {
            content_type: mime::classify(&input.file_name).to_string(),
            data: input.data.clone(),
        },
    }
}

/// Read the file name and URI from an upload response.
///
/// Accepts both `{"file": {...}}` and a bare file object. Returns `None` when
/// neither field is present.
pub fn parse_upload_response(body: &str) -> Option<UploadedFileHandle> {
    let json: Value = serde_json::from_str(body).ok()?;
    let file = json.get("file").unwrap_or(&json);

    let field = |name: &str| {
        file.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let handle = UploadedFileHandle {
        name: field("name"),
        uri: field("uri"),
    };
    handle.reference().is_some().then_some(handle)
}
