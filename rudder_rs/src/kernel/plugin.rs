//! The plugin trait.

use futures::future::BoxFuture;

use super::{Kernel, SharedContext};

/// An extension installed into the [`Kernel`].
///
/// `install` runs synchronously at registration time and is the plugin's
/// chance to subscribe event handlers. `on_init` runs once per kernel,
/// awaited in dependency order, and may publish values into the shared
/// context. `on_destroy` runs at unregistration; its failures are routed
/// to `on_error` and swallowed.
pub trait Plugin: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Names of plugins that must initialize before this one.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Subscribe handlers and inspect the kernel. A failure here aborts
    /// registration and the plugin is not stored.
    fn install(&self, kernel: &mut Kernel) -> anyhow::Result<()>;

    /// Initialize once, after every dependency has initialized.
    fn on_init<'a>(&'a self, _context: &'a mut SharedContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Tear down at unregistration.
    fn on_destroy(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Notified of this plugin's own lifecycle failures.
    fn on_error(&self, _error: &anyhow::Error) {}
}
