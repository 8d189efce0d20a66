//! # File Handlers
//!
//! Ready-made handlers for the three file tasks a web application usually
//! needs. Each is configured with option functions, like
//! [`HttpServer`](crate::server::HttpServer), and turned into a [`Handler`]
//! with `into_handler`:
//!
//! - [`FileUploader`] stores one field of a `multipart/form-data` body
//! - [`FileDownloader`] sends a file from a directory as an attachment
//! - [`StaticResourceHandler`] serves the `:file` path parameter from a
//!   directory, keeping small files in an LRU cache
//!
//! ```rust,no_run
//! use segroute::file::{with_static_dir, StaticResourceHandler};
//! use segroute::HttpServer;
//!
//! let mut server = HttpServer::default();
//! let assets = StaticResourceHandler::new(vec![with_static_dir("public")]);
//! server.get("/assets/:file", assets.into_handler())?;
//! # Ok::<(), segroute::RouteError>(())
//! ```
//!
//! Failures are written to the context as a status and a short plain-text
//! body; none of the handlers panic.
//!
//! [`Handler`]: crate::middleware::Handler

mod download;
mod static_resource;
mod upload;


use std::path::{Component, Path, PathBuf};

pub use download::{with_download_dir, DownloaderOption, FileDownloader, DEFAULT_DOWNLOAD_DIR};
pub use static_resource::{
    with_cache_capacity, with_extensions, with_max_file_size, with_static_dir, StaticOption,
    StaticResourceHandler, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_FILE_SIZE, DEFAULT_STATIC_DIR,
};
pub use upload::{
    with_dst_path, with_file_field, FileUploader, UploadedFile, UploaderOption, DEFAULT_FILE_FIELD,
    DEFAULT_UPLOAD_DIR,
};

use crate::context::Context;

/// Join a client-supplied relative name onto `dir`
///
/// Returns `None` when the name is empty, absolute, or climbs out of `dir`
/// through `..`. Symlinks inside `dir` are followed.
pub(crate) fn confined_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let mut out = dir.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (depth > 0).then_some(out)
}

pub(crate) fn fail(ctx: &mut Context, status: u16, message: impl Into<String>) {
    ctx.resp_status = status;
    ctx.resp_body = message.into().into_bytes();
}
