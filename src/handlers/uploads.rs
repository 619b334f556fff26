//! Multipart upload handling: text fields into a JSON map, files onto
//! disk under the uploads dir.

use crate::error::AppError;
use axum::extract::Multipart;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Everything a multipart form carried: the text fields as a JSON object
/// and the saved file paths (relative, e.g. `uploads/products/<name>`).
pub struct MultipartForm {
    pub fields: Map<String, Value>,
    pub files: Vec<String>,
}

/// Drain a multipart body. Files are stored as `<uuid>-<original name>` in
/// `{uploads_dir}/{subdir}`.
pub async fn collect_multipart(
    multipart: &mut Multipart,
    uploads_dir: &str,
    subdir: &str,
) -> Result<MultipartForm, AppError> {
    let dir = format!("{uploads_dir}/{subdir}");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("create {dir}: {e}")))?;

    let mut fields = Map::new();
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(sanitize_file_name) {
            Some(original) => {
                let stored = format!("{}-{}", Uuid::new_v4(), original);
                let path = format!("{dir}/{stored}");
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("reading upload: {e}")))?;
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| AppError::Internal(format!("write {path}: {e}")))?;
                files.push(path);
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("reading field {name}: {e}")))?;
                fields.insert(name, Value::String(text));
            }
        }
    }
    Ok(MultipartForm { fields, files })
}

/// Keep only the base name, dropping any path components a client sends.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_path_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(r"C:\pics\me.jpg"), "me.jpg");
        assert_eq!(sanitize_file_name("saree (1).webp"), "saree1.webp");
    }
}
