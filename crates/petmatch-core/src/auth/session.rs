//! Session lifecycle: login, registration, logout, silent restore and
//! periodic token refresh.
//!
//! `SessionController` owns the session. Observers follow it through a
//! `watch` channel of `SessionSnapshot`s; navigation side effects go to
//! the `Navigator` the `ApiClient` was built with.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, Registration, ValidationErrors};
use crate::config::Config;
use crate::models::User;

use super::navigation::{navigation_channel, Navigator, Route};

/// Shortest background refresh period; `interval_at` rejects zero
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// Point-in-time view of the session.
///
/// `user` is present exactly when `state` is `Authenticated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub user: Option<User>,
}

impl SessionSnapshot {
    fn unauthenticated() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            user: None,
        }
    }

    fn authenticating() -> Self {
        Self {
            state: SessionState::Authenticating,
            user: None,
        }
    }

    fn authenticated(user: User) -> Self {
        Self {
            state: SessionState::Authenticated,
            user: Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// True while credentials are being checked
    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Authenticating
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

struct Inner {
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    snapshot: watch::Sender<SessionSnapshot>,
    refresh_interval: Duration,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn publish(&self, snapshot: SessionSnapshot) {
        self.snapshot.send_replace(snapshot);
    }

    fn stop_refresh_timer(&self) {
        let task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            debug!("Background refresh stopped");
        }
    }

    /// Drop identity and timer. Tokens and navigation are the caller's business.
    fn reset(&self) {
        self.stop_refresh_timer();
        self.publish(SessionSnapshot::unauthenticated());
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop_refresh_timer();
    }
}

/// Owner of the session. Clone is cheap; clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Wrap `api`. Refresh failures inside the request pipeline end this session.
    ///
    /// `refresh_interval` is raised to at least one second.
    pub fn new(api: ApiClient, refresh_interval: Duration) -> Self {
        let refresh_interval = refresh_interval.max(MIN_REFRESH_INTERVAL);
        let navigator = Arc::clone(api.navigator());
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let api = api.with_session_lost_hook(Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    info!("Session lost after failed token refresh");
                    inner.reset();
                }
            }));
            Inner {
                api,
                navigator,
                snapshot: watch::channel(SessionSnapshot::unauthenticated()).0,
                refresh_interval,
                refresh_task: Mutex::new(None),
            }
        });
        Self { inner }
    }

    /// Controller talking HTTP to the configured API, plus the navigation feed.
    pub fn from_config(config: &Config) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<Route>)> {
        let tokens = config.open_token_store()?;
        let (navigator, routes) = navigation_channel();
        let api = ApiClient::from_config(config, tokens, navigator)?;
        Ok((Self::new(api, config.refresh_interval()), routes))
    }

    /// Client for authenticated resource calls
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.snapshot.borrow().state
    }

    pub fn user(&self) -> Option<User> {
        self.inner.snapshot.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.snapshot.borrow().is_loading()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Log in and load the user. On failure nothing of the attempt is kept.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        info!(email, "Logging in");
        self.inner.stop_refresh_timer();
        self.inner.publish(SessionSnapshot::authenticating());

        match self.authenticate(email, password).await {
            Ok(user) => {
                info!(user_id = user.id, "Login successful");
                self.establish(user.clone());
                self.inner.navigator.navigate(Route::Dashboard);
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.inner.api.tokens().clear();
                self.inner.reset();
                Err(e)
            }
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let pair = self.inner.api.obtain_tokens(email, password).await?;
        self.inner.api.tokens().set(&pair.access, &pair.refresh);
        self.inner.api.identify().await
    }

    /// Create an account, then log in with the same credentials.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, ApiError> {
        if password != password_confirm {
            return Err(ApiError::Validation(ValidationErrors::single(
                "password_confirm",
                "Passwords do not match",
            )));
        }

        let registration = Registration {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            password_confirm: password_confirm.to_string(),
        };
        self.inner.api.register_account(&registration).await?;
        info!(email, username, "Account registered");

        self.login(email, password).await
    }

    /// End the session locally. No network involved.
    pub fn logout(&self) {
        info!("Logging out");
        self.inner.api.tokens().clear();
        self.inner.reset();
        self.inner.navigator.navigate(Route::Login);
    }

    /// Re-establish a session from stored tokens at startup.
    ///
    /// Failures are not reported; they leave the session logged out.
    pub async fn restore_session(&self) -> SessionState {
        if self.inner.api.tokens().access().is_none() {
            debug!("No stored access token");
            return self.state();
        }

        self.inner.publish(SessionSnapshot::authenticating());
        let restored = match self.inner.api.current_user().await {
            Ok(user) => Ok(user),
            // The pipeline's own refresh failed and already ended the session
            Err(e) if self.has_ended() => {
                info!(error = %e, "Could not restore session");
                return self.state();
            }
            Err(e) => {
                debug!(error = %e, "Stored access token rejected, trying a refresh");
                self.refresh_identity().await
            }
        };

        match restored {
            Ok(user) if !self.has_ended() => {
                info!(user_id = user.id, "Session restored");
                self.establish(user);
            }
            Ok(_) => debug!("Logged out while restoring"),
            Err(e) => {
                info!(error = %e, "Could not restore session");
                self.end_unless_ended();
            }
        }
        self.state()
    }

    /// Renew the access token and reload the user; log out if that fails.
    pub async fn background_refresh(&self) {
        if self.state() != SessionState::Authenticated {
            debug!("Skipping background refresh - not authenticated");
            return;
        }

        match self.refresh_identity().await {
            Ok(user) if !self.has_ended() => {
                debug!(user_id = user.id, "Background refresh complete");
                self.inner.publish(SessionSnapshot::authenticated(user));
            }
            Ok(_) => debug!("Logged out during background refresh"),
            Err(e) => {
                warn!(error = %e, "Background refresh failed");
                self.end_unless_ended();
            }
        }
    }

    /// One explicit refresh, then identity with the new token. Neither call
    /// goes through the pipeline's retry, so this makes one refresh request.
    async fn refresh_identity(&self) -> Result<User, ApiError> {
        self.inner.api.refresh_access_token().await?;
        self.inner.api.identify().await
    }

    fn has_ended(&self) -> bool {
        self.state() == SessionState::Unauthenticated
    }

    /// Logout for failure paths; a session already ended elsewhere is left alone.
    fn end_unless_ended(&self) {
        if !self.has_ended() {
            self.logout();
        }
    }

    fn establish(&self, user: User) {
        self.inner.publish(SessionSnapshot::authenticated(user));
        self.start_refresh_timer();
    }

    fn start_refresh_timer(&self) {
        self.inner.stop_refresh_timer();

        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.refresh_interval;
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                SessionController { inner }.background_refresh().await;
            }
        });

        *self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
        debug!(interval_secs = period.as_secs(), "Background refresh scheduled");
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::api::testing::{user_json, Fixture};

    fn controller(fx: &Fixture) -> SessionController {
        SessionController::new(fx.api.clone(), Duration::from_secs(60))
    }

    fn script_login(fx: &Fixture, access: &str, refresh: &str) {
        fx.transport.respond(
            Method::POST,
            "/auth/login/",
            200,
            json!({"access": access, "refresh": refresh}),
        );
        fx.transport.respond(Method::GET, "/auth/me/", 200, user_json(1, "a@b.com", "a"));
    }

    #[tokio::test]
    async fn test_login_establishes_session() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");

        let user = session.login("a@b.com", "pw").await.unwrap();

        assert_eq!(user.email, "a@b.com");
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.user(), Some(user));
        assert!(!session.is_loading());
        assert_eq!(fx.tokens.access().as_deref(), Some("A1"));
        assert_eq!(fx.tokens.refresh().as_deref(), Some("R1"));
        assert_eq!(fx.drain_routes(), vec![Route::Dashboard]);

        // Identity is fetched with the freshly issued token
        assert_eq!(fx.transport.requests_to("/auth/me/")[0].bearer(), Some("A1"));
    }

    #[tokio::test]
    async fn test_login_failure_keeps_nothing() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        fx.transport.respond(
            Method::POST,
            "/auth/login/",
            401,
            json!({"detail": "No active account found with the given credentials"}),
        );

        let err = session.login("a@b.com", "wrong").await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(session.snapshot(), SessionSnapshot::default());
        assert!(fx.tokens.is_empty());
        assert!(fx.drain_routes().is_empty());
        assert!(fx.transport.requests_to("/auth/refresh/").is_empty());
    }

    #[tokio::test]
    async fn test_login_identity_failure_discards_tokens() {
        let fx = Fixture::new();
        let session = controller(&fx);
        fx.transport.respond(Method::POST, "/auth/login/", 200, json!({"access": "A1", "refresh": "R1"}));
        fx.transport.respond(Method::GET, "/auth/me/", 500, json!({}));

        let err = session.login("a@b.com", "pw").await.unwrap_err();

        assert!(matches!(err, ApiError::ServerError(_)));
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.user().is_none());
        assert!(fx.tokens.is_empty());
    }

    #[tokio::test]
    async fn test_register_password_mismatch_fails_before_network() {
        let fx = Fixture::new();
        let session = controller(&fx);

        let err = session.register("a@b.com", "a", "pw1", "pw2").await.unwrap_err();

        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.field("password_confirm"), ["Passwords do not match"])
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(fx.transport.requests().is_empty());
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_then_auto_login_matches_direct_login() {
        let mut registered = Fixture::new();
        let registered_session = controller(&registered);
        registered
            .transport
            .respond(Method::POST, "/auth/register/", 201, json!({"email": "a@b.com", "username": "a"}));
        script_login(&registered, "A1", "R1");

        registered_session.register("a@b.com", "a", "pw", "pw").await.unwrap();

        let mut direct = Fixture::new();
        let direct_session = controller(&direct);
        script_login(&direct, "A1", "R1");
        direct_session.login("a@b.com", "pw").await.unwrap();

        assert_eq!(registered_session.snapshot(), direct_session.snapshot());
        assert_eq!(registered.tokens.access(), direct.tokens.access());
        assert_eq!(registered.tokens.refresh(), direct.tokens.refresh());
        assert_eq!(registered.drain_routes(), direct.drain_routes());

        let register_request = &registered.transport.requests_to("/auth/register/")[0];
        assert_eq!(
            register_request.body,
            Some(json!({"email": "a@b.com", "username": "a", "password": "pw", "password_confirm": "pw"}))
        );
        assert_eq!(register_request.bearer(), None);
    }

    #[tokio::test]
    async fn test_register_backend_rejection_is_surfaced() {
        let fx = Fixture::new();
        let session = controller(&fx);
        fx.transport.respond(
            Method::POST,
            "/auth/register/",
            400,
            json!({"email": ["user with this email already exists."]}),
        );

        let err = session.register("a@b.com", "a", "pw", "pw").await.unwrap_err();

        assert_eq!(err.user_message(), "user with this email already exists.");
        assert!(fx.transport.requests_to("/auth/login/").is_empty());
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();
        fx.drain_routes();

        session.logout();
        assert_eq!(session.snapshot(), SessionSnapshot::default());
        assert!(fx.tokens.is_empty());

        session.logout();
        assert_eq!(session.snapshot(), SessionSnapshot::default());
        assert!(fx.tokens.is_empty());
        assert_eq!(fx.drain_routes(), vec![Route::Login, Route::Login]);
    }

    #[tokio::test]
    async fn test_logout_when_never_logged_in() {
        let fx = Fixture::new();
        let session = controller(&fx);
        session.logout();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(fx.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_restore_without_tokens_stays_unauthenticated() {
        let fx = Fixture::new();
        let session = controller(&fx);

        assert_eq!(session.restore_session().await, SessionState::Unauthenticated);
        assert!(fx.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_restore_with_valid_token() {
        let fx = Fixture::new();
        let session = controller(&fx);
        fx.tokens.set("A1", "R1");
        fx.transport.respond(Method::GET, "/auth/me/", 200, user_json(1, "a@b.com", "a"));

        assert_eq!(session.restore_session().await, SessionState::Authenticated);
        assert_eq!(session.user().map(|u| u.id), Some(1));
    }

    #[tokio::test]
    async fn test_restore_with_expired_access_token_refreshes() {
        let fx = Fixture::new();
        let session = controller(&fx);
        fx.tokens.set("A1", "R1");
        fx.transport.respond(Method::GET, "/auth/me/", 401, json!({"detail": "expired"}));
        fx.transport.respond(Method::POST, "/auth/refresh/", 200, json!({"access": "A2"}));
        fx.transport.respond(Method::GET, "/auth/me/", 200, user_json(1, "a@b.com", "a"));

        assert_eq!(session.restore_session().await, SessionState::Authenticated);
        assert_eq!(fx.tokens.access().as_deref(), Some("A2"));
        assert_eq!(fx.tokens.refresh().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_restore_with_dead_refresh_token_logs_out_silently() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        fx.tokens.set("A1", "R1");
        fx.transport.respond(Method::GET, "/auth/me/", 401, json!({"detail": "expired"}));
        fx.transport.respond(Method::POST, "/auth/refresh/", 401, json!({"detail": "Token is invalid or expired"}));

        assert_eq!(session.restore_session().await, SessionState::Unauthenticated);
        assert!(session.user().is_none());
        assert!(fx.tokens.is_empty());
        assert_eq!(fx.drain_routes(), vec![Route::Login]);
        assert_eq!(fx.transport.requests_to("/auth/refresh/").len(), 1);
    }

    #[tokio::test]
    async fn test_restore_without_refresh_token_logs_out_once() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        fx.tokens.set_access("A1");
        fx.transport.respond(Method::GET, "/auth/me/", 401, json!({"detail": "expired"}));

        assert_eq!(session.restore_session().await, SessionState::Unauthenticated);
        assert!(fx.tokens.is_empty());
        assert_eq!(fx.drain_routes(), vec![Route::Login]);
        assert!(fx.transport.requests_to("/auth/refresh/").is_empty());
    }

    #[tokio::test]
    async fn test_restore_refreshes_once_more_after_non_auth_failure() {
        let fx = Fixture::new();
        let session = controller(&fx);
        fx.tokens.set("A1", "R1");
        fx.transport.respond(Method::GET, "/auth/me/", 502, json!({}));
        fx.transport.respond(Method::POST, "/auth/refresh/", 200, json!({"access": "A2"}));
        fx.transport.respond(Method::GET, "/auth/me/", 200, user_json(1, "a@b.com", "a"));

        assert_eq!(session.restore_session().await, SessionState::Authenticated);
        assert_eq!(fx.transport.requests_to("/auth/refresh/").len(), 1);
    }

    #[tokio::test]
    async fn test_background_refresh_replaces_access_token() {
        let fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();

        fx.transport.respond(Method::POST, "/auth/refresh/", 200, json!({"access": "A2"}));
        fx.transport.respond(Method::GET, "/auth/me/", 200, user_json(1, "a@b.com", "renamed"));
        session.background_refresh().await;

        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.user().map(|u| u.username), Some("renamed".to_string()));
        assert_eq!(fx.tokens.access().as_deref(), Some("A2"));
        assert_eq!(fx.tokens.refresh().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_background_refresh_failure_logs_out() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();
        fx.drain_routes();

        fx.transport.respond(Method::POST, "/auth/refresh/", 401, json!({"detail": "Token is blacklisted"}));
        session.background_refresh().await;

        assert_eq!(session.snapshot(), SessionSnapshot::default());
        assert!(fx.tokens.is_empty());
        assert_eq!(fx.drain_routes(), vec![Route::Login]);
    }

    #[tokio::test]
    async fn test_background_refresh_makes_a_single_refresh_call() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();
        fx.drain_routes();

        fx.transport.respond(Method::POST, "/auth/refresh/", 200, json!({"access": "A2"}));
        fx.transport.respond(Method::GET, "/auth/me/", 401, json!({"detail": "User is inactive"}));
        // Would only be used by a second refresh in the same cycle
        fx.transport.respond(Method::POST, "/auth/refresh/", 200, json!({"access": "A3"}));
        session.background_refresh().await;

        assert_eq!(fx.transport.requests_to("/auth/refresh/").len(), 1);
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(fx.tokens.is_empty());
        assert_eq!(fx.drain_routes(), vec![Route::Login]);
    }

    #[tokio::test]
    async fn test_logout_during_pipeline_refresh_keeps_store_empty() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();
        fx.drain_routes();

        fx.transport.respond(Method::GET, "/pets/", 401, json!({"detail": "expired"}));
        fx.transport.respond(Method::POST, "/auth/refresh/", 200, json!({"access": "A2"}));
        fx.transport.respond(Method::GET, "/pets/", 200, json!([]));
        let gate = fx.transport.hold("/auth/refresh/");

        let api = session.api().clone();
        let pending = tokio::spawn(async move { api.list_pets().await });
        gate.entered.notified().await;

        session.logout();
        gate.release.notify_one();

        let err = pending.await.unwrap().unwrap_err();
        assert!(err.is_unauthorized());
        assert!(fx.tokens.is_empty());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(fx.transport.requests_to("/pets/").len(), 1);
        assert_eq!(fx.drain_routes(), vec![Route::Login]);

        // Nothing left behind for the next start
        assert_eq!(session.restore_session().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_zero_refresh_interval_is_clamped() {
        let fx = Fixture::new();
        let session = SessionController::new(fx.api.clone(), Duration::ZERO);
        assert_eq!(session.inner.refresh_interval, Duration::from_secs(1));

        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        session.logout();
    }

    #[tokio::test]
    async fn test_background_refresh_skipped_when_logged_out() {
        let fx = Fixture::new();
        let session = controller(&fx);
        session.background_refresh().await;
        assert!(fx.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_refresh_failure_ends_session() {
        let mut fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();
        fx.drain_routes();

        fx.transport.respond(Method::GET, "/pets/", 401, json!({"detail": "expired"}));
        fx.transport.respond(Method::POST, "/auth/refresh/", 401, json!({"detail": "Token is invalid or expired"}));

        assert!(session.api().list_pets().await.is_err());

        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.user().is_none());
        assert!(fx.tokens.is_empty());
        assert_eq!(fx.drain_routes(), vec![Route::Login]);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let fx = Fixture::new();
        let session = controller(&fx);
        let mut rx = session.subscribe();
        assert!(!rx.borrow_and_update().is_authenticated());

        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());

        session.logout();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timer_runs_while_authenticated() {
        let fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();

        fx.transport.respond(Method::POST, "/auth/refresh/", 200, json!({"access": "A2"}));
        fx.transport.respond(Method::GET, "/auth/me/", 200, user_json(1, "a@b.com", "a"));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(fx.transport.requests_to("/auth/refresh/").is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fx.transport.requests_to("/auth/refresh/").len(), 1);
        assert_eq!(fx.tokens.access().as_deref(), Some("A2"));
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_stops_refresh_timer() {
        let fx = Fixture::new();
        let session = controller(&fx);
        script_login(&fx, "A1", "R1");
        session.login("a@b.com", "pw").await.unwrap();

        session.logout();
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert!(fx.transport.requests_to("/auth/refresh/").is_empty());
    }
}
