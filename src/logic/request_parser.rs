use crate::apps::AppPaths;
use crate::model::RequestContext;
use axum::http::{header, request::Parts};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_FORMAT: &str = "html";
const DEFAULT_NAME: &str = "index";

/// Builds a [`RequestContext`] from an HTTP request head.
///
/// The URL path is split like a file path: the last segment is the resource
/// name (its extension is the response format) and everything before it is
/// the directory path. Trailing slashes are ignored.
#[derive(Debug, Clone)]
pub struct RequestParser<'a> {
    api_prefix: Vec<&'a str>,
}

impl<'a> RequestParser<'a> {
    pub fn new(api_prefix: &'a str) -> Self {
        Self {
            api_prefix: api_prefix.split('/').filter(|s| !s.is_empty()).collect(),
        }
    }

    /// Host the request was addressed to, without port, lower-cased.
    pub fn host(head: &Parts) -> String {
        let raw = head
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| head.uri.host())
            .unwrap_or("localhost");

        let host = if raw.starts_with('[') {
            raw.split_inclusive(']').next().unwrap_or(raw)
        } else {
            raw.split(':').next().unwrap_or(raw)
        };
        host.to_ascii_lowercase()
    }

    pub fn parse(
        &self,
        head: &Parts,
        source_address: Option<SocketAddr>,
        host: String,
        configured_paths: Arc<AppPaths>,
    ) -> RequestContext {
        let mut segments: Vec<String> = head
            .uri
            .path()
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect();

        let api = self.strip_api_prefix(&mut segments);

        let basename = segments.pop().unwrap_or_default();
        let (name, extension) = split_extension(&basename);
        let default_name = name.is_empty();
        let format = extension
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());

        let query = head
            .uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        RequestContext {
            request_id: Uuid::new_v4(),
            host,
            configured_paths,
            source_address,
            method: head.method.to_string(),
            mime: mime_for_format(&format).to_string(),
            raw_url: head.uri.to_string(),
            path_segments: segments,
            resource_name: (if default_name { DEFAULT_NAME } else { name }).to_string(),
            default_name,
            format,
            api,
            query,
            params: Vec::new(),
        }
    }

    fn strip_api_prefix(&self, segments: &mut Vec<String>) -> bool {
        let prefix = &self.api_prefix;
        let matches = !prefix.is_empty()
            && segments.len() >= prefix.len()
            && segments.iter().zip(prefix).all(|(segment, p)| segment == p);
        if matches {
            segments.drain(..prefix.len());
        }
        matches
    }
}

/// `post.json` -> (`post`, `json`); `.json` -> (``, `json`); `post.` -> (`post`, none).
fn split_extension(basename: &str) -> (&str, Option<&str>) {
    match basename.rfind('.') {
        Some(dot) => {
            let extension = &basename[dot + 1..];
            (&basename[..dot], Some(extension).filter(|e| !e.is_empty()))
        }
        None => (basename, None),
    }
}

pub fn mime_for_format(format: &str) -> &'static str {
    match format {
        "html" | "htm" => "text/html; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}
