//! Plugin micro-kernel: registry, dependency-ordered lifecycle, shared
//! context, and the async event bus.
//!
//! One kernel instance lives for one application run; there is no
//! process-wide registry. Plugins are initialized in dependency order
//! (dependencies before dependents) regardless of registration order.

pub mod bus;
pub mod plugin;
pub mod topo;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::events::AppEvent;
use self::bus::{EventBus, HandlerId};
use self::plugin::Plugin;
use self::topo::{dependency_order, TopoError};

/// Kernel lifecycle failures. Always fatal; nothing is retried.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("plugin '{plugin}' depends on '{dependency}', which is not registered")]
    MissingDependency { plugin: String, dependency: String },

    #[error("circular plugin dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("plugin '{plugin}' failed to install: {source}")]
    Install { plugin: String, source: anyhow::Error },

    #[error("plugin '{plugin}' failed to initialize: {source}")]
    Init { plugin: String, source: anyhow::Error },
}

/// Open key→value map shared across plugins.
///
/// Mutable only while `initialize()` runs; each plugin receives it in
/// dependency order. Keys are write-once by convention; an overwrite is
/// logged, not rejected.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    entries: BTreeMap<String, serde_json::Value>,
}

impl SharedContext {
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        if self.entries.insert(key.clone(), value).is_some() {
            warn!(key = %key, "shared context key overwritten");
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// The plugin micro-kernel.
pub struct Kernel {
    plugins: HashMap<String, Arc<dyn Plugin>>,
    registration_order: Vec<String>,
    bus: EventBus,
    context: SharedContext,
    frozen: Option<Arc<SharedContext>>,
    initialized: bool,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            registration_order: Vec::new(),
            bus: EventBus::new(),
            context: SharedContext::default(),
            frozen: None,
            initialized: false,
        }
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Register a plugin and run its `install` hook synchronously.
    ///
    /// On an install failure the plugin is not stored: its `on_error` is
    /// notified and the failure propagates.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), KernelError> {
        let name = plugin.name().to_string();
        if self.plugins.contains_key(&name) {
            return Err(KernelError::DuplicatePlugin(name));
        }

        if let Err(source) = plugin.install(self) {
            plugin.on_error(&source);
            return Err(KernelError::Install { plugin: name, source });
        }

        debug!(plugin = %name, version = plugin.version(), "plugin registered");
        self.registration_order.push(name.clone());
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Remove a plugin, running its `on_destroy` hook first. A destroy
    /// failure is routed to `on_error` and swallowed; absence is a no-op.
    pub fn unregister(&mut self, name: &str) {
        let Some(plugin) = self.plugins.remove(name) else {
            return;
        };
        self.registration_order.retain(|n| n != name);
        if let Err(err) = plugin.on_destroy() {
            warn!(plugin = %name, error = %err, "on_destroy failed");
            plugin.on_error(&err);
        }
        debug!(plugin = %name, "plugin unregistered");
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.registration_order.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Initialize every registered plugin in dependency order. Idempotent:
    /// a second call is a no-op and no `on_init` runs twice.
    pub async fn initialize(&mut self) -> Result<(), KernelError> {
        if self.initialized {
            return Ok(());
        }

        let order = dependency_order(&self.registration_order, |name| {
            self.plugins
                .get(name)
                .map(|p| p.dependencies())
                .unwrap_or_default()
        })
        .map_err(|err| match err {
            TopoError::Missing { node, dependency } => KernelError::MissingDependency {
                plugin: node,
                dependency,
            },
            TopoError::Cycle { path } => KernelError::CircularDependency { path },
        })?;

        for name in &order {
            let Some(plugin) = self.plugins.get(name).cloned() else {
                continue;
            };
            debug!(plugin = %name, "on_init");
            plugin
                .on_init(&mut self.context)
                .await
                .map_err(|source| KernelError::Init {
                    plugin: name.clone(),
                    source,
                })?;
        }

        self.initialized = true;
        self.frozen = Some(Arc::new(self.context.clone()));
        debug!(plugins = order.len(), "kernel initialized");
        Ok(())
    }

    /// The shared context as seen after initialization. Before
    /// `initialize()` completes this is a snapshot of the current state.
    pub fn shared(&self) -> Arc<SharedContext> {
        match &self.frozen {
            Some(frozen) => frozen.clone(),
            None => Arc::new(self.context.clone()),
        }
    }

    // ------------------------------------------------------------------
    // Event bus
    // ------------------------------------------------------------------

    pub fn on<F, Fut>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(AppEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.bus.on(event, handler)
    }

    pub fn off(&mut self, event: &str) {
        self.bus.off(event)
    }

    pub fn off_handler(&mut self, event: &str, id: HandlerId) -> bool {
        self.bus.off_handler(event, id)
    }

    pub async fn emit(&self, event: &AppEvent) -> anyhow::Result<()> {
        self.bus.emit(event).await
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.bus.handler_count(event)
    }
}

// ============================================================================
// Tests
// ============================================================================
