//! Axum route handlers for the Optimize API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{extract_blocking, UploadedDocument};
use crate::optimizer::OptimizedResume;
use crate::state::AppState;

pub const RESUME_FIELD: &str = "resume";
pub const JOB_DESCRIPTION_FIELD: &str = "jobDescription";
pub const DOWNLOAD_FILENAME: &str = "optimized_resume.txt";

/// The two files of an optimize request.
#[derive(Debug)]
pub struct OptimizeUpload {
    pub resume: UploadedDocument,
    pub job_description: UploadedDocument,
}

/// POST /api/optimize
///
/// `multipart/form-data` with file fields `resume` and `jobDescription`.
/// Returns `{ "optimizedResume": "..." }`.
pub async fn handle_optimize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OptimizedResume>, AppError> {
    let optimized = run_optimize(&state, multipart)
        .instrument(info_span!("optimize", request_id = %Uuid::new_v4()))
        .await?;
    Ok(Json(optimized))
}

/// POST /api/optimize/download
///
/// Same input as `/api/optimize`; the optimized text comes back as a plain-text attachment.
pub async fn handle_optimize_download(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let optimized = run_optimize(&state, multipart)
        .instrument(info_span!("optimize_download", request_id = %Uuid::new_v4()))
        .await?;

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
            ),
        ],
        optimized.optimized_resume,
    ))
}

async fn run_optimize(state: &AppState, multipart: Multipart) -> Result<OptimizedResume, AppError> {
    let upload = read_upload(multipart).await?;
    info!(
        resume = %upload.resume.filename,
        job_description = %upload.job_description.filename,
        "Received optimize request"
    );

    let resume = extract_blocking(upload.resume).await?;
    let job_description = extract_blocking(upload.job_description).await?;

    state.optimizer.optimize(&resume, &job_description).await
}

/// Collects the `resume` and `jobDescription` fields. Other fields are ignored and
/// a repeated field keeps its first occurrence.
pub async fn read_upload(mut multipart: Multipart) -> Result<OptimizeUpload, AppError> {
    let mut resume: Option<UploadedDocument> = None;
    let mut job_description: Option<UploadedDocument> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        let slot = match field.name() {
            Some(RESUME_FIELD) => &mut resume,
            Some(JOB_DESCRIPTION_FIELD) => &mut job_description,
            _ => continue,
        };
        if slot.is_some() {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read upload", e))?;
        *slot = Some(UploadedDocument::new(filename, bytes));
    }

    Ok(OptimizeUpload {
        resume: resume.ok_or_else(|| missing_field(RESUME_FIELD))?,
        job_description: job_description.ok_or_else(|| missing_field(JOB_DESCRIPTION_FIELD))?,
    })
}

/// Body-limit violations keep their 413; every other multipart failure is a bad request.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("{context}: {}", e.body_text()))
    }
}

fn missing_field(name: &str) -> AppError {
    AppError::Validation(format!("Missing file field '{name}'"))
}
