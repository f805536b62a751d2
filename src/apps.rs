//! Per-host application catalog.
//!
//! Every served host maps to `<webapps_dir>/<host>/`, whose optional
//! `app.toml` overrides the directory layout in a `[paths]` table. Hosts
//! without a directory of their own are served by the default application.

use crate::logic::FileExistenceOracle;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory layout of one application, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppPaths {
    #[serde(skip)]
    pub root: PathBuf,
    pub controllers: String,
    pub apis: String,
    pub views: String,
    pub resources: String,
}

impl Default for AppPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            controllers: "controllers".to_string(),
            apis: "apis".to_string(),
            views: "views".to_string(),
            resources: "resources".to_string(),
        }
    }
}

impl AppPaths {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.root.join(trim_slashes(&self.resources))
    }

    // `PATHS.controllers = "/controllers"` style values are accepted as-is
    fn normalized(mut self) -> Self {
        for value in [
            &mut self.controllers,
            &mut self.apis,
            &mut self.views,
            &mut self.resources,
        ] {
            *value = trim_slashes(value).to_string();
        }
        self
    }
}

fn trim_slashes(value: &str) -> &str {
    value.trim_matches('/')
}

#[derive(Debug, Default, Deserialize)]
struct AppFile {
    #[serde(default)]
    paths: AppPaths,
}

#[derive(Debug)]
pub struct AppCatalog {
    webapps_dir: PathBuf,
    default_app: String,
    // Keyed by application root, so unknown hosts share the default entry
    cache: RwLock<HashMap<PathBuf, Arc<AppPaths>>>,
}

impl AppCatalog {
    pub fn new(webapps_dir: impl Into<PathBuf>, default_app: impl Into<String>) -> Self {
        Self {
            webapps_dir: webapps_dir.into(),
            default_app: default_app.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_root(&self) -> PathBuf {
        self.webapps_dir.join(&self.default_app)
    }

    /// Layout of the default application.
    pub fn default_paths(&self, oracle: &dyn FileExistenceOracle) -> Arc<AppPaths> {
        self.resolve(&self.default_app, oracle)
    }

    /// Layout for the application serving `host`. Broken `app.toml` files are
    /// logged and replaced by the default layout.
    pub fn resolve(&self, host: &str, oracle: &dyn FileExistenceOracle) -> Arc<AppPaths> {
        let root = self.root_for(host, oracle);
        if let Some(paths) = self.cache.read().get(&root) {
            return paths.clone();
        }

        let paths = Arc::new(load_app_paths(&root));
        self.cache.write().entry(root).or_insert(paths).clone()
    }

    /// Number of application layouts loaded so far.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    fn root_for(&self, host: &str, oracle: &dyn FileExistenceOracle) -> PathBuf {
        let valid_name = !host.is_empty()
            && !host.starts_with('.')
            && !host.contains(['/', '\\']);
        if valid_name {
            let candidate = self.webapps_dir.join(host);
            match oracle.is_dir(&candidate) {
                Ok(true) => return candidate,
                Ok(false) => {}
                Err(err) => log::warn!("Cannot inspect application dir {:?}: {}", candidate, err),
            }
        }
        self.default_root()
    }
}

fn load_app_paths(root: &Path) -> AppPaths {
    let file = root.join("app");
    let loaded = config::Config::builder()
        .add_source(config::File::with_name(&file.to_string_lossy()).required(false))
        .build()
        .and_then(|config| config.try_deserialize::<AppFile>());

    let paths = match loaded {
        Ok(app_file) => app_file.paths,
        Err(err) => {
            log::warn!("Ignoring invalid app config in {:?}: {}", root, err);
            AppPaths::default()
        }
    };

    AppPaths {
        root: root.to_path_buf(),
        ..paths.normalized()
    }
}
