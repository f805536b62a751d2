use axum::http::Request;
use runrs::apps::AppPaths;
use runrs::{DiskOracle, Error, HandlerKind, PathResolver, RequestContext, RequestParser, Resolution};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "").unwrap();
}

fn webapp() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in [
        "controllers/blog/index.rs",
        "controllers/about.rs",
        "controllers/shop/cart.rs",
        "controllers/docs/index.rs",
        "apis/users.rs",
        "views/index.html",
        "views/help/faq.html",
    ] {
        touch(dir.path(), file);
    }
    dir
}

fn request(app: &TempDir, uri: &str) -> RequestContext {
    let head = Request::builder().uri(uri).body(()).unwrap().into_parts().0;
    RequestParser::new("api").parse(
        &head,
        None,
        "localhost".to_string(),
        Arc::new(AppPaths::at(app.path())),
    )
}

fn resolver() -> PathResolver {
    PathResolver::new(Arc::new(DiskOracle), "rs", "html")
}

#[test]
fn test_blog_post_resolves_to_blog_index() {
    let app = webapp();
    let handler = resolver()
        .resolve_controller(&request(&app, "/blog/2024/my-post"))
        .handler()
        .expect("blog index should handle the post");

    assert_eq!(handler.identifier, "controllers::blog::index");
    assert_eq!(handler.extra_params, vec!["2024", "my-post"]);
    assert_eq!(handler.path, app.path().join("controllers/blog/index.rs"));
}

#[test]
fn test_exact_file_and_directory_index() {
    let app = webapp();
    let resolver = resolver();

    let about = resolver
        .resolve_controller(&request(&app, "/about"))
        .handler()
        .unwrap();
    assert_eq!(about.identifier, "controllers::about");
    assert!(about.extra_params.is_empty());

    let docs = resolver
        .resolve_controller(&request(&app, "/docs"))
        .handler()
        .unwrap();
    assert_eq!(docs.identifier, "controllers::docs::index");
    assert!(docs.extra_params.is_empty());
}

#[test]
fn test_params_follow_the_handler_file() {
    let app = webapp();
    let handler = resolver()
        .resolve_controller(&request(&app, "/shop/cart/42/remove.json"))
        .handler()
        .unwrap();
    assert_eq!(handler.identifier, "controllers::shop::cart");
    assert_eq!(handler.extra_params, vec!["42", "remove"]);
}

#[test]
fn test_unknown_path_is_not_found() {
    let app = webapp();
    let context = request(&app, "/nothing/here");
    let resolution = resolver().resolve_controller(&context);
    assert_eq!(resolution, Resolution::NotFound);

    match resolution.into_result(&context.raw_url) {
        Err(Error::RouteNotFound { path }) => assert_eq!(path, "/nothing/here"),
        other => panic!("expected RouteNotFound, got {:?}", other),
    }
    assert!(resolver().resolve_view(&context).is_none());
}

#[test]
fn test_api_root_and_views() {
    let app = webapp();
    let resolver = resolver();

    let context = request(&app, "/api/users/17.json");
    assert!(context.api);
    let handler = resolver.resolve_api(&context).handler().unwrap();
    assert_eq!(handler.identifier, "apis::users");
    assert_eq!(handler.kind, HandlerKind::Api);
    assert_eq!(handler.extra_params, vec!["17"]);

    let home = resolver.resolve_view(&request(&app, "/")).unwrap();
    assert_eq!(home.identifier, "views::index");

    let faq = resolver.resolve_view(&request(&app, "/help/faq")).unwrap();
    assert_eq!(faq.path, app.path().join("views/help/faq.html"));
}

#[test]
fn test_parent_segments_never_escape_the_root() {
    let app = webapp();
    touch(app.path(), "secret.rs");
    let resolution = resolver().resolve_controller(&request(&app, "/blog/../../secret"));
    assert_eq!(resolution, Resolution::NotFound);
}
