//! Saved-paper and PDF endpoints.

use reqwest::multipart::{Form, Part};

use super::ApiClient;
use crate::errors::ClientError;
use crate::models::{CreatePaperRequest, Paper, PdfUploadResponse};

impl ApiClient {
    /// GET /api/papers - List all saved papers.
    pub async fn list_papers(&self) -> Result<Vec<Paper>, ClientError> {
        let url = self.endpoint(&["api", "papers"])?;
        self.fetch_json(self.http.get(url)).await
    }

    /// POST /api/papers - Save a paper.
    pub async fn create_paper(&self, request: &CreatePaperRequest) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "papers"])?;
        self.fetch_empty(self.http.post(url).json(request)).await
    }

    /// DELETE /api/papers/:id - Remove a paper and its PDF.
    pub async fn delete_paper(&self, paper_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "papers", paper_id])?;
        self.fetch_empty(self.http.delete(url)).await
    }

    /// POST /api/papers/:id/upload-pdf - Attach a PDF to a paper.
    pub async fn upload_pdf(
        &self,
        paper_id: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<PdfUploadResponse, ClientError> {
        validate_pdf(file_name, &data)?;

        let url = self.endpoint(&["api", "papers", paper_id, "upload-pdf"])?;
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        self.fetch_json(self.http.post(url).multipart(form)).await
    }

    /// DELETE /api/pdfs/:id - Detach and delete a paper's PDF.
    pub async fn delete_pdf(&self, paper_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "pdfs", paper_id])?;
        self.fetch_empty(self.http.delete(url)).await
    }

    /// Location of a paper's stored PDF, for opening outside the client.
    pub fn pdf_url(&self, paper_id: &str) -> Result<String, ClientError> {
        Ok(self.endpoint(&["api", "pdfs", paper_id])?.to_string())
    }
}

/// Reject file names without a `.pdf` extension.
pub fn validate_pdf_name(file_name: &str) -> Result<(), ClientError> {
    let is_pdf_name = file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"));

    if !is_pdf_name {
        return Err(ClientError::Validation(
            "Please upload a PDF file".to_string(),
        ));
    }
    Ok(())
}

/// Reject anything that is not a PDF before it goes over the wire.
pub fn validate_pdf(file_name: &str, data: &[u8]) -> Result<(), ClientError> {
    validate_pdf_name(file_name)?;
    if !data.starts_with(b"%PDF-") {
        return Err(ClientError::Validation(format!(
            "{} does not look like a PDF document",
            file_name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pdf() {
        assert!(validate_pdf("paper.PDF", b"%PDF-1.7\n").is_ok());
        assert!(validate_pdf("paper.docx", b"%PDF-1.7\n").is_err());
        assert!(validate_pdf("paper", b"%PDF-1.7\n").is_err());
        assert!(validate_pdf("paper.pdf", b"PK\x03\x04").is_err());
        assert!(validate_pdf("paper.pdf", b"").is_err());
        assert!(validate_pdf_name("report.DOCX").is_err());
        assert!(validate_pdf_name("archive.pdf.zip").is_err());
        assert!(validate_pdf_name("thesis.Pdf").is_ok());
    }
}
