//! Collecting `multipart/form-data` bodies

use axum::extract::Multipart;
use std::collections::HashMap;

use super::StorageError;

/// A file part read fully into memory
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Text fields and files of one multipart request
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Drain every part of `multipart`
    ///
    /// Parts with a filename are files, everything else is text. Empty file
    /// parts (a form submitted without choosing a file) are skipped.
    pub async fn collect(mut multipart: Multipart) -> Result<Self, StorageError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| StorageError::Multipart(format!("Cannot parse form data: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| StorageError::Multipart(format!("Cannot read file '{name}': {e}")))?;
                    if bytes.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name.clone(),
                        UploadedFile {
                            field: name,
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| StorageError::Multipart(format!("Cannot read field '{name}': {e}")))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed, non-empty text value
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    pub fn require_file(&mut self, name: &str) -> Result<UploadedFile, StorageError> {
        self.take_file(name)
            .ok_or_else(|| StorageError::MissingFile(name.to_string()))
    }
}

#[cfg(test)]
impl MultipartForm {
    pub fn from_parts(fields: &[(&str, &str)], files: Vec<UploadedFile>) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files.into_iter().map(|f| (f.field.clone(), f)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_trims_and_skips_blank() {
        let form = MultipartForm::from_parts(&[("name", "  Logo "), ("desc", "   ")], vec![]);
        assert_eq!(form.text("name"), Some("Logo"));
        assert_eq!(form.text("desc"), None);
        assert_eq!(form.text("missing"), None);
    }

    #[test]
    fn test_require_file() {
        let file = UploadedFile {
            field: "asset".to_string(),
            file_name: "logo.png".to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![1, 2, 3],
        };
        let mut form = MultipartForm::from_parts(&[], vec![file]);

        assert_eq!(form.require_file("asset").unwrap().file_name, "logo.png");
        assert!(matches!(
            form.require_file("asset"),
            Err(StorageError::MissingFile(name)) if name == "asset"
        ));
    }
}
