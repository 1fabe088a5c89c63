//! Settings source backed by figment (YAML files, environment variables).

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::errors::SourceError;
use crate::domain::models::SettingsNode;
use crate::domain::ports::{SettingsSource, Subscription, TreeObserver};
use crate::services::broadcast::Broadcast;

type FigmentBuilder = Arc<dyn Fn() -> Figment + Send + Sync>;

/// Source extracting its tree from a [`Figment`].
///
/// Figment reads its providers when they are merged, so the source keeps a
/// builder and rebuilds the figment on every [`reload`](Self::reload). The
/// first snapshot or subscription loads the tree lazily; a failed lazy load
/// is logged and leaves the source without a snapshot.
pub struct FigmentSource {
    name: String,
    build: FigmentBuilder,
    trees: Broadcast<Arc<SettingsNode>>,
    loaded: Mutex<bool>,
}

impl FigmentSource {
    /// Wrap an already-built figment. [`reload`](Self::reload) re-extracts
    /// the same data.
    pub fn from_figment(name: impl Into<String>, figment: Figment) -> Self {
        Self::from_builder(name, Arc::new(move || figment.clone()))
    }

    /// Source reading a YAML file. A missing file yields an empty map.
    pub fn yaml_file(path: impl AsRef<Path>) -> Self {
        let path: PathBuf = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self::from_builder(name, Arc::new(move || Figment::new().merge(Yaml::file(&path))))
    }

    /// Source parsing YAML text.
    pub fn yaml_str(name: impl Into<String>, yaml: impl Into<String>) -> Self {
        let yaml = yaml.into();
        Self::from_builder(name, Arc::new(move || Figment::new().merge(Yaml::string(&yaml))))
    }

    fn from_builder(name: impl Into<String>, build: FigmentBuilder) -> Self {
        Self {
            name: name.into(),
            build,
            trees: Broadcast::new(),
            loaded: Mutex::new(false),
        }
    }

    /// Layer environment variables starting with `prefix` over the
    /// current providers. Nested keys are separated by `__`.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let base = Arc::clone(&self.build);
        self.name = format!("{} + env:{prefix}*", self.name);
        self.build = Arc::new(move || base().merge(Env::prefixed(&prefix).split("__")));
        self
    }

    /// Extract the tree without publishing it.
    pub fn extract(&self) -> Result<SettingsNode, SourceError> {
        let value: serde_json::Value =
            (self.build)()
                .extract()
                .map_err(|e| SourceError::Extraction {
                    source_name: self.name.clone(),
                    message: e.to_string(),
                })?;
        Ok(SettingsNode::from(value))
    }

    /// Re-extract and publish the tree when it changed. Returns whether a
    /// new tree was published.
    pub fn reload(&self) -> Result<bool, SourceError> {
        let mut loaded = self.loaded.lock();
        *loaded = true;
        let tree = self.extract()?;
        if self.trees.current().as_deref() == Some(&tree) {
            tracing::debug!(source = %self.name, "settings unchanged");
            return Ok(false);
        }
        drop(loaded);
        tracing::info!(source = %self.name, "settings reloaded");
        self.trees.publish(Arc::new(tree));
        Ok(true)
    }

    fn ensure_loaded(&self) {
        if *self.loaded.lock() {
            return;
        }
        if let Err(error) = self.reload() {
            tracing::warn!(source = %self.name, %error, "initial settings load failed");
        }
    }
}

impl SettingsSource for FigmentSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn snapshot(&self) -> Option<Arc<SettingsNode>> {
        self.ensure_loaded();
        self.trees.current()
    }

    fn subscribe(&self, observer: TreeObserver) -> Subscription {
        self.ensure_loaded();
        self.trees.subscribe(observer)
    }

    fn release(&self) {
        self.trees.close();
    }
}
