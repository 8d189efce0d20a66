use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::executor::block_on;
use futures::{future, stream};
use http::header::CONTENT_TYPE;
use tracing::{debug, warn};
use ulid::Ulid;

use super::fail;
use crate::context::Context;
use crate::middleware::Handler;

/// Multipart field read when no other is configured
pub const DEFAULT_FILE_FIELD: &str = "file";

/// Directory receiving uploads under the default destination function
pub const DEFAULT_UPLOAD_DIR: &str = "testdata/upload";

/// Option applied by [`FileUploader::new`]
pub type UploaderOption = Box<dyn FnOnce(&mut FileUploader)>;

/// Maps an upload to the path it is written to
pub type DstPathFn = Arc<dyn Fn(&UploadedFile) -> PathBuf + Send + Sync>;

/// Part headers of the uploaded field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: String,
    /// `filename` from the part's `Content-Disposition`
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// Read the file from `field` instead of [`DEFAULT_FILE_FIELD`]
pub fn with_file_field(field: impl Into<String>) -> UploaderOption {
    let field = field.into();
    Box::new(move |uploader: &mut FileUploader| uploader.file_field = field)
}

/// Choose the destination of each upload
pub fn with_dst_path<F>(dst: F) -> UploaderOption
where
    F: Fn(&UploadedFile) -> PathBuf + Send + Sync + 'static,
{
    Box::new(move |uploader: &mut FileUploader| uploader.dst_path = Arc::new(dst))
}

/// Handler storing one file field of a `multipart/form-data` request
///
/// The default destination is a fresh ULID under [`DEFAULT_UPLOAD_DIR`].
/// Missing parent directories are created and an existing file is
/// overwritten. Success is a 200 with body `upload succeeded`; any
/// failure is a 500 whose body names the step that failed.
pub struct FileUploader {
    file_field: String,
    dst_path: DstPathFn,
}

impl Default for FileUploader {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FileUploader {
    /// Uploader reading [`DEFAULT_FILE_FIELD`], with `options` applied in order
    pub fn new(options: Vec<UploaderOption>) -> Self {
        let mut uploader = Self {
            file_field: DEFAULT_FILE_FIELD.to_string(),
            dst_path: Arc::new(|_: &UploadedFile| {
                Path::new(DEFAULT_UPLOAD_DIR).join(Ulid::new().to_string())
            }),
        };
        for option in options {
            option(&mut uploader);
        }
        uploader
    }

    pub fn handle(&self, ctx: &mut Context) {
        let (file, data) = match self.read_field(ctx) {
            Ok(Some(found)) => found,
            Ok(None) => {
                return fail(ctx, 500, format!("upload failed: no field {}", self.file_field));
            }
            Err(message) => return fail(ctx, 500, format!("upload failed: {message}")),
        };

        let dst = (self.dst_path)(&file);
        if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "Failed to create upload directory");
                return fail(ctx, 500, format!("failed to create file: {e}"));
            }
        }
        if let Err(e) = fs::write(&dst, &data) {
            warn!(path = %dst.display(), error = %e, "Failed to write upload");
            return fail(ctx, 500, format!("failed to write file: {e}"));
        }

        debug!(path = %dst.display(), bytes = data.len(), "Stored upload");
        ctx.resp_status = 200;
        ctx.resp_body = b"upload succeeded".to_vec();
    }

    /// Share the uploader as a route [`Handler`]
    pub fn into_handler(self) -> Handler {
        let this = Arc::new(self);
        Arc::new(move |ctx: &mut Context| this.handle(ctx))
    }

    fn read_field(&self, ctx: &Context) -> Result<Option<(UploadedFile, Vec<u8>)>, String> {
        let content_type = ctx
            .req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or("request is not multipart/form-data")?;
        let boundary = multer::parse_boundary(content_type).map_err(|e| e.to_string())?;

        let body = ctx.req.body().clone();
        let mut multipart = multer::Multipart::new(
            stream::once(future::ready(Ok::<_, Infallible>(body))),
            boundary,
        );
        let wanted = self.file_field.as_str();
        block_on(async {
            while let Some(field) = multipart.next_field().await? {
                if field.name() != Some(wanted) {
                    continue;
                }
                let file = UploadedFile {
                    field: wanted.to_string(),
                    file_name: field.file_name().map(str::to_string),
                    content_type: field.content_type().map(|m| m.to_string()),
                };
                let data = field.bytes().await?;
                return Ok(Some((file, data.to_vec())));
            }
            Ok::<_, multer::Error>(None)
        })
        .map_err(|e| e.to_string())
    }
}
