//! Maps a request onto a controller, API or view file.
//!
//! Lookup order is fixed: the exact file first, then the backward walk that
//! accepts the deepest existing handler along the path and hands the remaining
//! segments to it as positional parameters. The resolver only probes paths
//! under the root it was given and never loads what it finds.

use crate::apps::AppPaths;
use crate::logic::oracle::{Entry, FileExistenceOracle};
use crate::model::{HandlerKind, RequestContext, Resolution, ResolvedHandler};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const INDEX: &str = "index";
const NAMESPACE_SEPARATOR: &str = "::";
/// Views directory holding the pages rendered for errors.
pub const ERROR_VIEWS_DIR: &str = "errors";

/// One of the three handler roots of an application.
#[derive(Debug, Clone, Copy)]
pub struct Root<'a> {
    /// Application directory; not part of identifiers.
    pub base: &'a Path,
    /// Configured directory of the root, relative to `base` (e.g. `controllers`).
    pub dir: &'a str,
    pub extension: &'a str,
    pub kind: HandlerKind,
}

impl Root<'_> {
    fn dir_segments(&self) -> impl Iterator<Item = &str> {
        self.dir.split('/').filter(|s| !s.is_empty())
    }

    fn entry_path(&self, segments: &[&str]) -> PathBuf {
        let mut path = self.base.to_path_buf();
        path.extend(self.dir_segments());
        path.extend(segments);
        path
    }

    fn file_path(&self, segments: &[&str]) -> PathBuf {
        let mut path: OsString = self.entry_path(segments).into_os_string();
        path.push(".");
        path.push(self.extension);
        PathBuf::from(path)
    }

    fn handler(&self, segments: &[&str], extra_params: Vec<String>) -> ResolvedHandler {
        let identifier = self
            .dir_segments()
            .chain(segments.iter().copied())
            .collect::<Vec<_>>()
            .join(NAMESPACE_SEPARATOR);
        ResolvedHandler {
            identifier,
            extra_params,
            kind: self.kind,
            path: self.file_path(segments),
        }
    }
}

#[derive(Clone)]
pub struct PathResolver {
    oracle: Arc<dyn FileExistenceOracle>,
    handler_extension: String,
    view_extension: String,
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("handler_extension", &self.handler_extension)
            .field("view_extension", &self.view_extension)
            .finish_non_exhaustive()
    }
}

impl PathResolver {
    pub fn new(
        oracle: Arc<dyn FileExistenceOracle>,
        handler_extension: impl Into<String>,
        view_extension: impl Into<String>,
    ) -> Self {
        Self {
            oracle,
            handler_extension: handler_extension.into(),
            view_extension: view_extension.into(),
        }
    }

    pub fn oracle(&self) -> &dyn FileExistenceOracle {
        &*self.oracle
    }

    pub fn root<'a>(&'a self, paths: &'a AppPaths, kind: HandlerKind) -> Root<'a> {
        let (dir, extension) = match kind {
            HandlerKind::Controller => (&paths.controllers, &self.handler_extension),
            HandlerKind::Api => (&paths.apis, &self.handler_extension),
            HandlerKind::View => (&paths.views, &self.view_extension),
        };
        Root {
            base: &paths.root,
            dir,
            extension,
            kind,
        }
    }

    pub fn resolve_controller(&self, request: &RequestContext) -> Resolution {
        self.resolve(request, HandlerKind::Controller)
    }

    pub fn resolve_api(&self, request: &RequestContext) -> Resolution {
        self.resolve(request, HandlerKind::Api)
    }

    /// A missing view is a normal outcome, so this never fails. Error pages
    /// are not served as views.
    pub fn resolve_view(&self, request: &RequestContext) -> Option<ResolvedHandler> {
        let top = request.path_segments.first().unwrap_or(&request.resource_name);
        if top == ERROR_VIEWS_DIR {
            return None;
        }
        match self.resolve(request, HandlerKind::View) {
            Resolution::Resolved(handler) => Some(handler),
            Resolution::NotFound => None,
            Resolution::Failed(reason) => {
                log::warn!("View lookup for {} failed: {}", request.raw_url, reason);
                None
            }
        }
    }

    /// Exact lookup first, backward walk second.
    pub fn resolve(&self, request: &RequestContext, kind: HandlerKind) -> Resolution {
        let path: Vec<&str> = request.path_segments.iter().map(String::as_str).collect();
        let lookup = request.lookup_segments();
        let safe = lookup.iter().all(|s| is_safe_segment(s))
            && is_safe_segment(&request.resource_name);
        if !safe {
            return Resolution::NotFound;
        }

        let root = self.root(&request.configured_paths, kind);
        let outcome = self
            .resolve_exact(root, &path, &request.resource_name)
            .and_then(|exact| match exact {
                Some(handler) => Ok(Some(handler)),
                None => self.resolve_backward(root, &lookup),
            });

        match outcome {
            Ok(Some(handler)) => Resolution::Resolved(handler),
            Ok(None) => Resolution::NotFound,
            Err(err) => Resolution::Failed(err.to_string()),
        }
    }

    /// `root/path/name`, or `root/path/name/index` when that names a directory.
    pub fn resolve_exact(
        &self,
        root: Root<'_>,
        path: &[&str],
        name: &str,
    ) -> io::Result<Option<ResolvedHandler>> {
        let mut segments = path.to_vec();
        segments.push(if name.is_empty() { INDEX } else { name });

        if self.oracle.probe(&root.entry_path(&segments))? == Entry::Dir {
            segments.push(INDEX);
        }

        if self.oracle.is_file(&root.file_path(&segments))? {
            return Ok(Some(root.handler(&segments, Vec::new())));
        }
        Ok(None)
    }

    /// Walks `segments` from the root while each one names a directory,
    /// remembering the deepest handler file seen on the way: either
    /// `<prefix>/<segment>` itself or the `index` of a directory walked into.
    /// Segments after that handler become its parameters, in order.
    pub fn resolve_backward(
        &self,
        root: Root<'_>,
        segments: &[&str],
    ) -> io::Result<Option<ResolvedHandler>> {
        let mut best: Option<(Vec<&str>, usize)> = None;
        let mut prefix: Vec<&str> = Vec::with_capacity(segments.len() + 1);

        for (depth, segment) in segments.iter().copied().enumerate() {
            prefix.push(segment);

            if self.oracle.is_file(&root.file_path(&prefix))? {
                best = Some((prefix.clone(), depth + 1));
            }

            if !self.oracle.is_dir(&root.entry_path(&prefix))? {
                break;
            }

            let mut index = prefix.clone();
            index.push(INDEX);
            if self.oracle.is_file(&root.file_path(&index))? {
                best = Some((index, depth + 1));
            }
        }

        Ok(best.map(|(handler, consumed)| {
            let params = segments[consumed..].iter().map(|s| s.to_string()).collect();
            root.handler(&handler, params)
        }))
    }
}

fn is_safe_segment(segment: &str) -> bool {
    segment != ".." && segment != "." && !segment.contains(['\\', '\0', '/'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::MemoryOracle;
    use uuid::Uuid;

    fn resolver(oracle: MemoryOracle) -> PathResolver {
        PathResolver::new(Arc::new(oracle), "rs", "html")
    }

    fn request(path: &[&str], name: Option<&str>) -> RequestContext {
        RequestContext {
            request_id: Uuid::new_v4(),
            host: "site.test".to_string(),
            configured_paths: Arc::new(AppPaths::at("app")),
            source_address: None,
            method: "GET".to_string(),
            mime: "text/html".to_string(),
            raw_url: "/test".to_string(),
            path_segments: path.iter().map(|s| s.to_string()).collect(),
            resource_name: name.unwrap_or(INDEX).to_string(),
            default_name: name.is_none(),
            format: "html".to_string(),
            api: false,
            query: Vec::new(),
            params: Vec::new(),
        }
    }

    #[test]
    fn test_exact_match_has_no_params() {
        let resolver = resolver(MemoryOracle::new().with_file("app/controllers/blog/post.rs"));

        let handler = resolver
            .resolve_controller(&request(&["blog"], Some("post")))
            .handler()
            .unwrap();
        assert_eq!(handler.identifier, "controllers::blog::post");
        assert!(handler.extra_params.is_empty());
        assert_eq!(handler.kind, HandlerKind::Controller);
        assert_eq!(handler.path, PathBuf::from("app/controllers/blog/post.rs"));
    }

    #[test]
    fn test_directory_resolves_to_its_index() {
        let resolver = resolver(MemoryOracle::new().with_file("app/controllers/blog/index.rs"));

        let handler = resolver
            .resolve_controller(&request(&[], Some("blog")))
            .handler()
            .unwrap();
        assert_eq!(handler.identifier, "controllers::blog::index");
        assert!(handler.extra_params.is_empty());
    }

    #[test]
    fn test_root_index_for_empty_path() {
        let resolver = resolver(MemoryOracle::new().with_file("app/controllers/index.rs"));

        let handler = resolver
            .resolve_controller(&request(&[], None))
            .handler()
            .unwrap();
        assert_eq!(handler.identifier, "controllers::index");
    }

    #[test]
    fn test_backward_into_directory_index() {
        let resolver = resolver(MemoryOracle::new().with_file("app/controllers/blog/index.rs"));

        let handler = resolver
            .resolve_controller(&request(&["blog", "2024"], Some("my-post")))
            .handler()
            .unwrap();
        assert_eq!(handler.identifier, "controllers::blog::index");
        assert_eq!(handler.extra_params, vec!["2024", "my-post"]);
    }

    #[test]
    fn test_backward_prefers_deepest_handler() {
        let resolver = resolver(
            MemoryOracle::new()
                .with_file("app/controllers/shop.rs")
                .with_file("app/controllers/shop/items.rs")
                .with_dir("app/controllers/shop/items"),
        );

        let handler = resolver
            .resolve_controller(&request(&["shop", "items", "42"], Some("edit")))
            .handler()
            .unwrap();
        assert_eq!(handler.identifier, "controllers::shop::items");
        assert_eq!(handler.extra_params, vec!["42", "edit"]);

        let handler = resolver
            .resolve_controller(&request(&["shop"], Some("nope")))
            .handler()
            .unwrap();
        assert_eq!(handler.identifier, "controllers::shop");
        assert_eq!(handler.extra_params, vec!["nope"]);
    }

    #[test]
    fn test_defaulted_name_is_not_a_param() {
        let resolver = resolver(MemoryOracle::new().with_file("app/controllers/news.rs"));

        let handler = resolver
            .resolve_controller(&request(&["news", "2024"], None))
            .handler()
            .unwrap();
        assert_eq!(handler.identifier, "controllers::news");
        assert_eq!(handler.extra_params, vec!["2024"]);
    }

    #[test]
    fn test_directory_without_index_does_not_resolve() {
        let resolver = resolver(MemoryOracle::new().with_file("app/controllers/blog/archive.rs"));

        let outcome = resolver.resolve_controller(&request(&["blog", "2024"], Some("x")));
        assert_eq!(outcome, Resolution::NotFound);
        assert!(outcome.into_result("/blog/2024/x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_root_index_is_not_a_catch_all() {
        let resolver = resolver(MemoryOracle::new().with_file("app/controllers/index.rs"));

        let outcome = resolver.resolve_controller(&request(&["unknown"], Some("page")));
        assert_eq!(outcome, Resolution::NotFound);
    }

    #[test]
    fn test_missing_view_is_none() {
        let resolver = resolver(
            MemoryOracle::new()
                .with_file("app/controllers/about.rs")
                .with_file("app/views/contact.html"),
        );

        assert!(resolver.resolve_view(&request(&[], Some("about"))).is_none());

        let view = resolver.resolve_view(&request(&[], Some("contact"))).unwrap();
        assert_eq!(view.identifier, "views::contact");
        assert_eq!(view.kind, HandlerKind::View);
        assert_eq!(view.path, PathBuf::from("app/views/contact.html"));
    }

    #[test]
    fn test_error_pages_are_not_views() {
        let resolver = resolver(
            MemoryOracle::new()
                .with_file("app/views/errors/404.html")
                .with_file("app/views/errors/index.html"),
        );

        assert!(resolver.resolve_view(&request(&["errors"], Some("404"))).is_none());
        assert!(resolver.resolve_view(&request(&[], Some("errors"))).is_none());
    }

    #[test]
    fn test_api_root_is_separate() {
        let resolver = resolver(
            MemoryOracle::new()
                .with_file("app/apis/users.rs")
                .with_file("app/controllers/users.rs"),
        );

        let handler = resolver
            .resolve_api(&request(&["users"], Some("17")))
            .handler()
            .unwrap();
        assert_eq!(handler.identifier, "apis::users");
        assert_eq!(handler.kind, HandlerKind::Api);
        assert_eq!(handler.extra_params, vec!["17"]);
    }

    #[test]
    fn test_traversal_segments_never_resolve() {
        let resolver = resolver(MemoryOracle::new().with_file("app/secret.rs"));

        let outcome = resolver.resolve_controller(&request(&[".."], Some("secret")));
        assert_eq!(outcome, Resolution::NotFound);
    }

    #[test]
    fn test_nested_configured_dir_is_part_of_identifier() {
        let paths = AppPaths {
            controllers: "src/controllers".to_string(),
            ..AppPaths::at("app")
        };
        let resolver = resolver(MemoryOracle::new().with_file("app/src/controllers/home.rs"));
        let mut ctx = request(&[], Some("home"));
        ctx.configured_paths = Arc::new(paths);

        let handler = resolver.resolve_controller(&ctx).handler().unwrap();
        assert_eq!(handler.identifier, "src::controllers::home");
    }
}
