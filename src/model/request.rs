use crate::apps::AppPaths;
use crate::error::Error;
use crate::logic::Sanitizer;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Normalized view of one inbound request, threaded explicitly through routing
/// and handler invocation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub host: String,
    pub configured_paths: Arc<AppPaths>,
    pub source_address: Option<SocketAddr>,
    pub method: String,
    pub mime: String,
    pub raw_url: String,
    /// Directory segments of the URL, without the resource name.
    pub path_segments: Vec<String>,
    pub resource_name: String,
    /// `true` when `resource_name` was not part of the URL and defaulted to `index`.
    pub default_name: bool,
    pub format: String,
    /// `true` when the URL carried the API prefix (already stripped from `path_segments`).
    pub api: bool,
    pub query: Vec<(String, String)>,
    /// Positional parameters left over by backward resolution.
    pub params: Vec<String>,
}

impl RequestContext {
    /// Consumes the context, attaching the positional parameters found by routing.
    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    pub fn is_html(&self) -> bool {
        matches!(self.format.as_str(), "html" | "htm")
    }

    /// Query value for `key` (last occurrence wins), passed through `sanitizer`.
    pub fn input(&self, key: &str, sanitizer: &dyn Sanitizer) -> Option<String> {
        self.query
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| sanitizer.sanitize(value))
    }

    /// Segments looked up by backward resolution: the directory path plus the
    /// resource name when the URL spelled it out.
    pub fn lookup_segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.path_segments.iter().map(String::as_str).collect();
        if !self.default_name {
            segments.push(&self.resource_name);
        }
        segments
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Controller,
    Api,
    View,
}

/// The outcome of a successful route resolution. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedHandler {
    /// Namespaced identifier, e.g. `controllers::blog::index`.
    pub identifier: String,
    pub extra_params: Vec<String>,
    pub kind: HandlerKind,
    /// File that matched on disk.
    pub path: PathBuf,
}

/// Tagged routing result so callers branch explicitly instead of unwinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedHandler),
    NotFound,
    Failed(String),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn handler(self) -> Option<ResolvedHandler> {
        match self {
            Self::Resolved(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn into_result(self, path: &str) -> Result<ResolvedHandler, Error> {
        match self {
            Self::Resolved(handler) => Ok(handler),
            Self::NotFound => Err(Error::RouteNotFound {
                path: path.to_string(),
            }),
            Self::Failed(reason) => Err(Error::ResolutionFailed { reason }),
        }
    }
}
