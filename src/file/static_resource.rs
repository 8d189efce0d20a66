use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use lru::LruCache;
use tracing::{debug, warn};

use super::{confined_path, fail};
use crate::context::Context;
use crate::middleware::Handler;

/// Directory resources are served from when no other is configured
pub const DEFAULT_STATIC_DIR: &str = "testdata/static";

/// Number of files the cache holds by default
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Files up to this many bytes are cached by default (1 MiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 1024 * 1024;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Option applied by [`StaticResourceHandler::new`]
pub type StaticOption = Box<dyn FnOnce(&mut StaticResourceHandler)>;

/// Serve resources from `dir`
pub fn with_static_dir(dir: impl Into<PathBuf>) -> StaticOption {
    let dir = dir.into();
    Box::new(move |handler: &mut StaticResourceHandler| handler.dir = dir)
}

/// Replace the cache with an empty one holding at most `capacity` files
pub fn with_cache_capacity(capacity: NonZeroUsize) -> StaticOption {
    Box::new(move |handler: &mut StaticResourceHandler| {
        handler.cache = Mutex::new(LruCache::new(capacity));
    })
}

/// Largest file, in bytes, that is kept in the cache. Larger files are
/// still served, just read from disk on every request.
pub fn with_max_file_size(bytes: usize) -> StaticOption {
    Box::new(move |handler: &mut StaticResourceHandler| handler.max_file_size = bytes)
}

/// Add or override extension to content-type mappings. Extensions are given
/// without the dot.
pub fn with_extensions<I, K, V>(extensions: I) -> StaticOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let extensions: Vec<(String, String)> = extensions
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Box::new(move |handler: &mut StaticResourceHandler| {
        handler.content_types.extend(extensions);
    })
}

/// Handler serving the `:file` path parameter from a directory
///
/// The name must carry an extension; its content type comes from the
/// extension map (`jpeg`, `jpe`, `jpg`, `png` and `pdf` built in) and falls
/// back to `application/octet-stream`. Files no larger than the configured
/// maximum are cached, keyed by resolved path, and evicted least recently
/// used first. Cached files are not revalidated against the disk.
///
/// Register it on a route with a `file` parameter such as `/static/:file`.
pub struct StaticResourceHandler {
    dir: PathBuf,
    cache: Mutex<LruCache<PathBuf, Arc<Vec<u8>>>>,
    max_file_size: usize,
    content_types: HashMap<String, String>,
}

impl Default for StaticResourceHandler {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl StaticResourceHandler {
    /// Handler with the default directory, cache and extension map, then `options`
    pub fn new(options: Vec<StaticOption>) -> Self {
        let content_types = [
            ("jpeg", "image/jpeg"),
            ("jpe", "image/jpeg"),
            ("jpg", "image/jpeg"),
            ("png", "image/png"),
            ("pdf", "application/pdf"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut handler = Self {
            dir: PathBuf::from(DEFAULT_STATIC_DIR),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            content_types,
        };
        for option in options {
            option(&mut handler);
        }
        handler
    }

    /// Number of files currently cached
    pub fn cached_len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn handle(&self, ctx: &mut Context) {
        let name = match ctx.path_value("file") {
            Ok(v) => v.into_string(),
            Err(_) => return fail(ctx, 400, "missing file path"),
        };
        let Some(path) = confined_path(&self.dir, &name) else {
            warn!(file = %name, "Rejected static resource outside the static directory");
            return fail(ctx, 403, "illegal file path");
        };
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return fail(ctx, 400, "file name needs an extension");
        };
        let content_type = self
            .content_types
            .get(ext)
            .map_or(FALLBACK_CONTENT_TYPE, String::as_str);
        let content_type = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

        let cached = self.lock_cache().get(&path).map(Arc::clone);
        let data = match cached {
            Some(data) => data,
            None => match fs::read(&path) {
                Ok(data) => {
                    let data = Arc::new(data);
                    if data.len() <= self.max_file_size {
                        self.lock_cache().put(path.clone(), Arc::clone(&data));
                    }
                    debug!(path = %path.display(), bytes = data.len(), "Loaded static resource");
                    data
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return fail(ctx, 404, "file not found");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read static resource");
                    return fail(ctx, 500, "failed to read file");
                }
            },
        };

        ctx.resp_headers.insert(CONTENT_TYPE, content_type);
        ctx.resp_headers
            .insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
        ctx.resp_status = 200;
        ctx.resp_body = data.as_ref().clone();
    }

    /// Share the handler, and its cache, as a route [`Handler`]
    pub fn into_handler(self) -> Handler {
        let this = Arc::new(self);
        Arc::new(move |ctx: &mut Context| this.handle(ctx))
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<PathBuf, Arc<Vec<u8>>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
