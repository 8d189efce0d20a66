use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use http::header::{
    HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, EXPIRES, PRAGMA,
};
use tracing::warn;

use super::{confined_path, fail};
use crate::context::Context;
use crate::middleware::Handler;

/// Directory files are served from when no other is configured
pub const DEFAULT_DOWNLOAD_DIR: &str = "testdata/download";

/// Option applied by [`FileDownloader::new`]
pub type DownloaderOption = Box<dyn FnOnce(&mut FileDownloader)>;

/// Serve downloads from `dir`
pub fn with_download_dir(dir: impl Into<PathBuf>) -> DownloaderOption {
    let dir = dir.into();
    Box::new(move |downloader: &mut FileDownloader| downloader.dir = dir)
}

/// Handler sending the file named by the `file` query or form value as an
/// attachment.
///
/// | Condition | Status |
/// |---|---|
/// | no `file` value | 400 |
/// | name escapes the directory | 403 |
/// | file missing | 404 |
/// | other read error | 500 |
#[derive(Debug, Clone)]
pub struct FileDownloader {
    dir: PathBuf,
}

impl Default for FileDownloader {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FileDownloader {
    pub fn new(options: Vec<DownloaderOption>) -> Self {
        let mut downloader = Self {
            dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        };
        for option in options {
            option(&mut downloader);
        }
        downloader
    }

    /// Write the file or an error status to `ctx`
    pub fn handle(&self, ctx: &mut Context) {
        let name = match ctx.query_value("file").or_else(|_| ctx.form_value("file")) {
            Ok(v) if !v.as_str().is_empty() => v.into_string(),
            _ => return fail(ctx, 400, "missing file name"),
        };
        let Some(path) = confined_path(&self.dir, &name) else {
            warn!(file = %name, "Rejected download outside the download directory");
            return fail(ctx, 403, "illegal file path");
        };
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return fail(ctx, 404, "file not found"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read download");
                return fail(ctx, 500, "failed to read file");
            }
        };

        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Ok(disposition) = HeaderValue::from_bytes(format!("attachment; filename={base}").as_bytes())
        else {
            return fail(ctx, 400, "file name not representable in a header");
        };

        let headers = &mut ctx.resp_headers;
        headers.insert(CONTENT_DISPOSITION, disposition);
        headers.insert(
            HeaderName::from_static("content-description"),
            HeaderValue::from_static("File Transfer"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        headers.insert(
            HeaderName::from_static("content-transfer-encoding"),
            HeaderValue::from_static("binary"),
        );
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("must-revalidate"));
        headers.insert(PRAGMA, HeaderValue::from_static("public"));
        ctx.resp_status = 200;
        ctx.resp_body = data;
    }

    pub fn into_handler(self) -> Handler {
        let this = Arc::new(self);
        Arc::new(move |ctx: &mut Context| this.handle(ctx))
    }
}
