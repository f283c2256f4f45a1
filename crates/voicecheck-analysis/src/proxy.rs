//! Multipart upload to the analysis proxy.

use crate::mime;
use crate::transport::{HttpRequest, RequestBody};
use crate::types::AudioInput;

/// Multipart field carrying the audio.
pub const FILE_FIELD: &str = "file";

/// Header carrying the application access key.
pub const APP_KEY_HEADER: &str = "X-APP-KEY";

/// Build the upload request for one proxy candidate.
pub fn build_request(url: &str, input: &AudioInput, app_key: Option<&str>) -> HttpRequest {
    let mut request = HttpRequest {
        url: url.to_string(),
        headers: Vec::new(),
        body: RequestBody::Multipart {
            field: FILE_FIELD.to_string(),
            file_name: input.file_name.clone(),
            mime: mime::classify(&input.file_name).to_string(),
            data: input.data.clone(),
        },
    };

    if let Some(key) = app_key.map(str::trim).filter(|k| !k.is_empty()) {
        request = request.with_header(APP_KEY_HEADER, key);
    }
    request
}
