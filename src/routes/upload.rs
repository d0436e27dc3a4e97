use axum::extract::Multipart;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::response::AppError;

const MALFORMED_BODY: &str = "Malformed multipart body";

/// Parts of a multipart request: one JSON document plus an optional image.
#[derive(Debug, Default)]
pub struct Upload {
    json: Option<Bytes>,
    pub image: Option<Bytes>,
}

impl Upload {
    pub async fn read(mut multipart: Multipart, json_part: &str) -> Result<Self, AppError> {
        let mut upload = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| AppError::bad_request(MALFORMED_BODY))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let slot = match name.as_str() {
                "image" => &mut upload.image,
                other if other == json_part => &mut upload.json,
                _ => continue,
            };
            let bytes = field
                .bytes()
                .await
                .map_err(|_| AppError::bad_request(MALFORMED_BODY))?;
            *slot = Some(bytes);
        }

        Ok(upload)
    }

    /// Decodes the JSON part; absent or undecodable documents are reported
    /// with `invalid`.
    pub fn document<T: DeserializeOwned>(&self, invalid: &'static str) -> Result<T, AppError> {
        let raw = self.json.as_ref().ok_or_else(|| AppError::bad_request(invalid))?;
        serde_json::from_slice(raw).map_err(|err| {
            tracing::debug!(error = %err, "multipart document rejected");
            AppError::bad_request(invalid)
        })
    }
}
