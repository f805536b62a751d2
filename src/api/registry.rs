//! Statically registered request handlers.
//!
//! Routing only yields an identifier such as `controllers::blog::index`; the
//! registry turns it into a fresh handler instance for each request.

use crate::error::{Error, Result};
use crate::framework::Framework;
use crate::model::RequestContext;
use crate::store::SqlRepository;
use axum::body::Bytes;
use axum::response::Response;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a handler receives for one request.
pub struct Invocation {
    pub request: RequestContext,
    pub framework: Arc<Framework>,
    pub body: Bytes,
}

impl Invocation {
    /// Positional parameters left over by routing.
    pub fn params(&self) -> &[String] {
        &self.request.params
    }

    /// Repository over a pooled connection, backing up into the app's resources.
    pub async fn repository(&self) -> Result<SqlRepository> {
        self.framework.repository(&self.request).await
    }
}

#[async_trait::async_trait]
pub trait Controller: Send + Sync {
    async fn main(&self, call: Invocation) -> Result<Response>;
}

pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, C>(&mut self, identifier: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        let identifier = identifier.into();
        log::debug!("Registered handler {}", identifier);
        self.factories.insert(
            identifier,
            Arc::new(move || Box::new(factory()) as Box<dyn Controller>),
        );
        self
    }

    /// Chaining form of [`HandlerRegistry::register`].
    pub fn with<F, C>(mut self, identifier: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        self.register(identifier, factory);
        self
    }

    /// New handler instance for `identifier`.
    pub fn get(&self, identifier: &str) -> Result<Box<dyn Controller>> {
        self.factories
            .get(identifier)
            .map(|factory| factory())
            .ok_or_else(|| Error::HandlerNotRegistered {
                identifier: identifier.to_string(),
            })
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut identifiers: Vec<&String> = self.factories.keys().collect();
        identifiers.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &identifiers)
            .finish()
    }
}
