//! Fallback handler turning every unrouted request into a handler invocation.

use crate::api::handlers::{ErrorBody, ErrorResponse};
use crate::api::Invocation;
use crate::error::{Error, Result};
use crate::framework::Framework;
use crate::logic::{HtmlEscape, Sanitizer, ERROR_VIEWS_DIR};
use crate::model::{HandlerKind, RequestContext, Resolution, ResolvedHandler};
use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub async fn dispatch(State(framework): State<Arc<Framework>>, request: Request) -> Response {
    let started = Instant::now();
    let (head, body) = request.into_parts();
    let source = head
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let context = framework.parse_request(&head, source);

    let outcome = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => handle(framework.clone(), context.clone(), body).await,
        Err(err) => Err(Error::handler(StatusCode::BAD_REQUEST, err.to_string())),
    };
    let response = match outcome {
        Ok(response) => response,
        Err(err) => render_error(&framework, &context, &err).await,
    };

    log::info!(
        target: "runrs::dispatch",
        "{} {} {} {} ms [{}]",
        context.method,
        context.raw_url,
        response.status().as_u16(),
        started.elapsed().as_millis(),
        context.request_id
    );
    response
}

/// Resolves the handler for `context` and runs it. HTML requests nobody
/// handles are served from a static view when one exists.
pub async fn handle(framework: Arc<Framework>, context: RequestContext, body: Bytes) -> Result<Response> {
    let resolution = if context.api {
        framework.resolve_api(&context)
    } else {
        framework.resolve_controller(&context)
    };

    let handler = match resolution {
        Resolution::NotFound if !context.api && context.is_html() => {
            if let Some(view) = framework.resolve_view(&context) {
                log::debug!(target: "runrs::dispatch", "{} -> view {}", context.raw_url, view.identifier);
                return serve_view(&view, StatusCode::OK).await;
            }
            Resolution::NotFound.into_result(&context.raw_url)?
        }
        other => other.into_result(&context.raw_url)?,
    };

    log::debug!(
        target: "runrs::dispatch",
        "{} -> {} {:?}",
        context.raw_url,
        handler.identifier,
        handler.extra_params
    );
    let controller = framework.registry.get(&handler.identifier)?;
    let request = context.with_params(handler.extra_params);
    controller
        .main(Invocation {
            request,
            framework,
            body,
        })
        .await
}

async fn serve_view(view: &ResolvedHandler, status: StatusCode) -> Result<Response> {
    let page = tokio::fs::read_to_string(&view.path).await?;
    Ok((status, Html(page)).into_response())
}

/// Logs `error` and renders it in the format the request asked for.
pub async fn render_error(framework: &Framework, context: &RequestContext, error: &Error) -> Response {
    let status = error.status();
    if status.is_server_error() {
        log::error!(target: "runrs::dispatch", "{} {}: {}", context.method, context.raw_url, error);
    } else {
        log::warn!(target: "runrs::dispatch", "{} {}: {}", context.method, context.raw_url, error);
    }

    if context.is_html() {
        return html_error(framework, context, error, status).await;
    }
    match context.format.as_str() {
        "xml" => xml_error(error, status),
        _ => (status, Json(error_payload(error, status))).into_response(),
    }
}

fn error_payload(error: &Error, status: StatusCode) -> ErrorResponse {
    ErrorResponse {
        error: ErrorBody {
            message: error.to_string(),
            http_status: status.as_u16(),
            details: error.details(),
        },
    }
}

async fn html_error(
    framework: &Framework,
    context: &RequestContext,
    error: &Error,
    status: StatusCode,
) -> Response {
    let name = if error.is_not_found() { "404" } else { "default" };
    let root = framework
        .resolver
        .root(&context.configured_paths, HandlerKind::View);

    match framework.resolver.resolve_exact(root, &[ERROR_VIEWS_DIR], name) {
        Ok(Some(view)) => match serve_view(&view, status).await {
            Ok(response) => return response,
            Err(err) => log::warn!("Error view {} unreadable: {}", view.path.display(), err),
        },
        Ok(None) => {}
        Err(err) => log::warn!("Error view lookup failed: {}", err),
    }

    let message = HtmlEscape.sanitize(&error.to_string());
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let page = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<p>{message}</p>\n</body>\n</html>\n"
    );
    (status, Html(page)).into_response()
}

fn xml_error(error: &Error, status: StatusCode) -> Response {
    let payload = error_payload(error, status);
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<error>");
    xml.push_str(&format!("<message>{}</message>", HtmlEscape.sanitize(&payload.error.message)));
    xml.push_str(&format!("<httpStatus>{}</httpStatus>", payload.error.http_status));
    xml.push_str(&xml_element("details", &payload.error.details));
    xml.push_str("</error>\n");

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/xml")
        .body(Body::from(xml))
        .unwrap_or_else(|_| status.into_response())
}

fn xml_element(name: &str, value: &Value) -> String {
    let inner = match value {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| xml_element(key, value))
            .collect::<String>(),
        Value::Array(items) => items
            .iter()
            .map(|item| xml_element("item", item))
            .collect::<String>(),
        Value::String(text) => HtmlEscape.sanitize(text),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    format!("<{name}>{inner}</{name}>")
}
