//! Upload form parsing and document validation.

use axum::extract::Multipart;

use crate::errors::AppError;
use crate::storage::UploadFile;
use crate::submission::workflow::AnalyzeRequest;

/// Largest accepted resume.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Raw form fields before validation.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub file: Option<UploadFile>,
}

impl UploadForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    if form.file.is_some() {
                        return Err(AppError::Validation("Only one resume file may be uploaded".to_string()));
                    }
                    let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                    let content_type = field.content_type().unwrap_or("application/pdf").to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;
                    form.file = Some(UploadFile::new(file_name, content_type, bytes));
                }
                "company-name" | "job-title" | "job-description" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;
                    let text = text.trim().to_string();
                    match name.as_str() {
                        "company-name" => form.company_name = text,
                        "job-title" => form.job_title = text,
                        _ => form.job_description = text,
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Validates the document and produces the workflow input.
    pub fn into_request(self) -> Result<AnalyzeRequest, AppError> {
        let file = self
            .file
            .ok_or_else(|| AppError::Validation("A resume file is required".to_string()))?;

        Ok(AnalyzeRequest {
            company_name: self.company_name,
            job_title: self.job_title,
            job_description: self.job_description,
            file: validate_document(file)?,
        })
    }
}

/// Accepts non-empty PDFs up to `MAX_UPLOAD_BYTES`. The content type is
/// normalised because browsers are inconsistent about it.
pub fn validate_document(file: UploadFile) -> Result<UploadFile, AppError> {
    if file.bytes.is_empty() {
        return Err(AppError::Validation("The uploaded file is empty".to_string()));
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "The uploaded file exceeds the {} MB limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    if !file.bytes.starts_with(PDF_MAGIC) {
        return Err(AppError::Validation("Only PDF resumes are supported".to_string()));
    }
    Ok(UploadFile {
        content_type: "application/pdf".to_string(),
        ..file
    })
}
