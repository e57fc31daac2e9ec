use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request};
use multer::{Constraints, Multipart, SizeLimit};
use thiserror::Error;
use tomato_serve::RawUpload;

/// Form field carrying the image.
pub const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("request is not multipart/form-data: {0}")]
    NotMultipart(String),

    #[error("malformed multipart body: {0}")]
    Malformed(#[from] multer::Error),

    #[error("form has no `{}` field", FILE_FIELD)]
    MissingFile,
}

/// Pull the `file` field out of a multipart request body.
///
/// Other fields are skipped. The whole stream is capped at `limit` bytes.
pub async fn read_upload(req: Request<Body>, limit: u64) -> Result<RawUpload, UploadError> {
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| UploadError::NotMultipart("missing content type".to_owned()))
        .and_then(|ct| {
            multer::parse_boundary(ct).map_err(|e| UploadError::NotMultipart(e.to_string()))
        })?;

    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
    let mut multipart = Multipart::with_constraints(req.into_body(), boundary, constraints);

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(|m| m.to_string());
        let data = field.bytes().await?;

        return Ok(RawUpload {
            data: data.to_vec(),
            content_type,
            file_name,
        });
    }

    Err(UploadError::MissingFile)
}
