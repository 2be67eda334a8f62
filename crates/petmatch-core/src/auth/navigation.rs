use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

/// Screens the session layer can send the application to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Unauthenticated entry point
    Login,
    /// Main view after authentication
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Receives navigation side effects from the session layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

impl Navigator for mpsc::UnboundedSender<Route> {
    fn navigate(&self, route: Route) {
        if self.send(route).is_err() {
            debug!(route = route.path(), "Navigation dropped - no receiver");
        }
    }
}

/// A navigator that queues routes for the application to drain.
pub fn navigation_channel() -> (Arc<dyn Navigator>, mpsc::UnboundedReceiver<Route>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}
