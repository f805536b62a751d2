use crate::api::HandlerRegistry;
use crate::apps::AppCatalog;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::logic::{DiskOracle, FileExistenceOracle, PathResolver, RequestParser};
use crate::model::{RequestContext, Resolution, ResolvedHandler};
use crate::store::{RepositoryPool, SqlRepository};
use axum::http::request::Parts;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared, read-only state behind every request.
#[derive(Debug)]
pub struct Framework {
    pub config: AppConfig,
    pub apps: AppCatalog,
    pub resolver: PathResolver,
    pub registry: HandlerRegistry,
    pool: Option<RepositoryPool>,
}

impl Framework {
    pub fn new(config: AppConfig, registry: HandlerRegistry) -> Self {
        Self::with_oracle(config, registry, Arc::new(DiskOracle))
    }

    pub fn with_oracle(
        config: AppConfig,
        registry: HandlerRegistry,
        oracle: Arc<dyn FileExistenceOracle>,
    ) -> Self {
        let apps = AppCatalog::new(config.webapps_dir(), config.framework.default_app.clone());
        let resolver = PathResolver::new(
            oracle,
            config.framework.handler_extension.clone(),
            config.framework.view_extension.clone(),
        );
        Self {
            config,
            apps,
            resolver,
            registry,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: RepositoryPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn pool(&self) -> Option<&RepositoryPool> {
        self.pool.as_ref()
    }

    /// Request context for `head`, bound to the application serving its host.
    pub fn parse_request(&self, head: &Parts, source: Option<SocketAddr>) -> RequestContext {
        let host = RequestParser::host(head);
        let paths = self.apps.resolve(&host, self.resolver.oracle());
        RequestParser::new(&self.config.framework.api_prefix).parse(head, source, host, paths)
    }

    pub fn resolve_controller(&self, request: &RequestContext) -> Resolution {
        self.resolver.resolve_controller(request)
    }

    pub fn resolve_api(&self, request: &RequestContext) -> Resolution {
        self.resolver.resolve_api(request)
    }

    pub fn resolve_view(&self, request: &RequestContext) -> Option<ResolvedHandler> {
        self.resolver.resolve_view(request)
    }

    /// Repository leased from the shared pool for the application of `request`.
    pub async fn repository(&self, request: &RequestContext) -> Result<SqlRepository> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| Error::PersistenceUnavailable {
                resource: request.host.clone(),
                message: "no connection string configured".to_string(),
            })?;
        Ok(pool
            .lease()
            .await?
            .with_resources_dir(request.configured_paths.resources_dir()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::MemoryOracle;
    use axum::http::Request;

    #[tokio::test]
    async fn test_request_bound_to_host_app() {
        let oracle = MemoryOracle::new()
            .with_dir("webapps/blog.test")
            .with_dir("webapps/taosmi.es");
        let framework =
            Framework::with_oracle(AppConfig::default(), HandlerRegistry::new(), Arc::new(oracle));

        let head = Request::builder()
            .uri("/posts/1.json")
            .header("host", "blog.test:3001")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let context = framework.parse_request(&head, None);
        assert_eq!(context.configured_paths.root, std::path::PathBuf::from("webapps/blog.test"));
        assert_eq!(context.format, "json");

        let missing = framework.repository(&context).await;
        assert!(matches!(missing, Err(Error::PersistenceUnavailable { .. })));
    }
}
