use crate::context::Context;
use crate::error::HandlerResult;
use crate::handler::{BoxFuture, Handler};
use crate::router::NOT_FOUND_BODY;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Serves files below `root`, addressed by the `filepath` catch-all.
pub(crate) struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub(crate) fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Maps a request suffix onto the root, refusing anything that could
    /// step outside it.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(relative.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    fn content_type(path: &Path) -> &'static str {
        match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
            "html" => "text/html",
            "css" => "text/css",
            "js" => "text/javascript",
            "json" => "application/json",
            "txt" => "text/plain",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "ico" => "image/x-icon",
            _ => "application/octet-stream",
        }
    }

    async fn serve(&self, ctx: &mut Context) -> HandlerResult {
        let relative = ctx.param("filepath").unwrap_or("").to_string();
        let path = match self.resolve(&relative) {
            Some(path) => path,
            None => return ctx.string(404, NOT_FOUND_BODY),
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return ctx.string(404, NOT_FOUND_BODY),
            Err(err) if err.kind() == ErrorKind::NotFound => return ctx.string(404, NOT_FOUND_BODY),
            Err(err) => return Err(err.into()),
        };
        let contents = tokio::fs::read(&path).await?;

        let response = &mut ctx.response;
        response.header("Content-Type", Self::content_type(&path));
        response.header("Cache-Control", "public, max-age=31536000");
        if let Ok(modified) = metadata.modified() {
            response.header("Last-Modified", httpdate::fmt_http_date(modified));
            let secs = modified
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0);
            response.header("ETag", format!("\"{}-{}\"", metadata.len(), secs));
        }
        response.write_header(200);
        response.write(&contents);
        Ok(())
    }
}

impl Handler for StaticFiles {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.serve(ctx))
    }
}
