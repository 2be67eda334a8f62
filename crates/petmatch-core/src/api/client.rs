//! API client for communicating with the PetMatch REST API.
//!
//! `ApiClient::send` is the authenticated request pipeline: it attaches
//! the stored access token and recovers from one expired token per
//! request by refreshing it and dispatching again. The typed endpoint
//! methods below all go through it.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{Navigator, Route, TokenStore};
use crate::config::Config;
use crate::models::{Like, Match, Message, NewPet, Pass, Pet, PetImage, PetUpdate, User};

use super::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use super::{ApiError, ValidationErrors};

// ============================================================================
// Endpoints
// ============================================================================

const LOGIN_PATH: &str = "/auth/login/";
const REGISTER_PATH: &str = "/auth/register/";
const REFRESH_PATH: &str = "/auth/refresh/";
const CURRENT_USER_PATH: &str = "/auth/me/";

/// Access and refresh token issued at login
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Account registration form
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Serialize)]
struct PetPair {
    from_pet: i64,
    to_pet: i64,
}

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    sender_pet: i64,
    content: &'a str,
}

/// Where one request is in its refresh-and-retry lifecycle.
///
/// `Retried` has no edge back to `Unauthorized`, so a request is
/// re-dispatched at most once no matter what the second attempt returns.
enum RequestState {
    Sent(ApiResponse),
    Unauthorized(ApiResponse),
    Refreshing(String),
    Retried(ApiResponse),
    Failed(ApiError),
}

type SessionLostHook = Arc<dyn Fn() + Send + Sync>;

fn session_ended() -> ApiError {
    ApiError::Unauthorized("Session ended during token refresh".to_string())
}

/// API client for PetMatch.
/// Clone is cheap - transport, token store and navigator are shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    session_lost: Option<SessionLostHook>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            tokens,
            navigator,
            session_lost: None,
        }
    }

    /// Client talking to the configured API over HTTP
    pub fn from_config(
        config: &Config,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config.api_url, config.request_timeout())?;
        Ok(Self::new(Arc::new(transport), tokens, navigator))
    }

    /// Run `hook` whenever a failed refresh ends the session.
    pub(crate) fn with_session_lost_hook(mut self, hook: SessionLostHook) -> Self {
        self.session_lost = Some(hook);
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub(crate) fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    // ===== Request Pipeline =====

    /// Dispatch `request` with the stored access token attached.
    ///
    /// Any non-401 response is returned as is. On a 401 the access token is
    /// refreshed once and the request re-sent with the new token; the second
    /// response is returned as is, even a 401. A 401 with no stored refresh
    /// token is also returned as the original response. Callers map non-2xx
    /// responses to errors.
    ///
    /// If the refresh itself fails the token store is cleared, the
    /// application is sent to the login screen and the refresh error is
    /// returned. If the session ended while the refresh was in flight, the
    /// new token is discarded and the request is not re-sent.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        request.set_bearer(self.tokens.access());
        let mut state = RequestState::Sent(self.transport.execute(&request).await?);

        loop {
            state = match state {
                RequestState::Sent(response) if response.is_unauthorized() => {
                    debug!(path = %request.path, "Request unauthorized");
                    RequestState::Unauthorized(response)
                }
                RequestState::Sent(response) | RequestState::Retried(response) => {
                    return Ok(response);
                }
                RequestState::Unauthorized(response) => match self.tokens.refresh() {
                    Some(refresh) => RequestState::Refreshing(refresh),
                    None => {
                        debug!(path = %request.path, "No refresh token stored, giving up");
                        return Ok(response);
                    }
                },
                RequestState::Refreshing(refresh) => {
                    match self.request_new_access_token(&refresh).await {
                        Ok(Some(access)) => {
                            request.set_bearer(Some(access));
                            RequestState::Retried(self.transport.execute(&request).await?)
                        }
                        Ok(None) => RequestState::Failed(session_ended()),
                        Err(e) => {
                            self.end_session(&e);
                            RequestState::Failed(e)
                        }
                    }
                }
                RequestState::Failed(e) => return Err(e),
            };
        }
    }

    /// Dispatch without credentials or refresh handling (login, register, refresh).
    async fn send_public(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.transport.execute(&request).await?.into_result()
    }

    fn end_session(&self, error: &ApiError) {
        warn!(error = %error, "Token refresh failed, ending session");
        self.tokens.clear();
        self.navigator.navigate(Route::Login);
        if let Some(ref hook) = self.session_lost {
            hook();
        }
    }

    /// Exchange `refresh` for a new access token and store it.
    ///
    /// `Ok(None)` when the stored tokens changed while the call was in
    /// flight (logout or a new login); the new token is dropped.
    async fn request_new_access_token(&self, refresh: &str) -> Result<Option<String>, ApiError> {
        debug!("Refreshing access token");
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest { refresh })?;
        let response: RefreshResponse = self.send_public(request).await?.json()?;
        if !self.tokens.set_access_if_refresh(&response.access, refresh) {
            debug!("Tokens changed during refresh, discarding new access token");
            return Ok(None);
        }
        Ok(Some(response.access))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.into_result()?.json()
    }

    async fn send_ok(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await?.into_result()?;
        Ok(())
    }

    // ===== Authentication =====

    /// Exchange credentials for a token pair. Does not touch the token store.
    pub async fn obtain_tokens(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { email, password })?;
        self.send_public(request).await?.json()
    }

    pub async fn register_account(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = ApiRequest::post(REGISTER_PATH).json(registration)?;
        self.send_public(request).await?;
        Ok(())
    }

    /// Replace the stored access token using the stored refresh token.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let refresh = self
            .tokens
            .refresh()
            .ok_or_else(|| ApiError::Unauthorized("No refresh token stored".to_string()))?;
        self.request_new_access_token(&refresh)
            .await?
            .ok_or_else(session_ended)
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.fetch(ApiRequest::get(CURRENT_USER_PATH)).await
    }

    /// Fetch the current user with the stored access token, without the
    /// refresh-and-retry path. Used right after tokens were (re)issued.
    pub(crate) async fn identify(&self) -> Result<User, ApiError> {
        let mut request = ApiRequest::get(CURRENT_USER_PATH);
        request.set_bearer(self.tokens.access());
        self.transport.execute(&request).await?.into_result()?.json()
    }

    // ===== Pets =====

    /// Pets owned by the current user
    pub async fn list_pets(&self) -> Result<Vec<Pet>, ApiError> {
        self.fetch(ApiRequest::get("/pets/")).await
    }

    pub async fn get_pet(&self, pet_id: i64) -> Result<Pet, ApiError> {
        self.fetch(ApiRequest::get(format!("/pets/{}/", pet_id))).await
    }

    pub async fn create_pet(&self, pet: &NewPet) -> Result<Pet, ApiError> {
        pet.validate().map_err(ApiError::Validation)?;
        self.fetch(ApiRequest::post("/pets/").json(pet)?).await
    }

    pub async fn update_pet(&self, pet_id: i64, update: &PetUpdate) -> Result<Pet, ApiError> {
        update.validate().map_err(ApiError::Validation)?;
        self.fetch(ApiRequest::put(format!("/pets/{}/", pet_id)).json(update)?)
            .await
    }

    pub async fn delete_pet(&self, pet_id: i64) -> Result<(), ApiError> {
        self.send_ok(ApiRequest::delete(format!("/pets/{}/", pet_id)))
            .await
    }

    /// Make this pet the one used for discovery; the backend deactivates the rest
    pub async fn set_active_pet(&self, pet_id: i64) -> Result<Pet, ApiError> {
        self.fetch(ApiRequest::post(format!("/pets/{}/set_active/", pet_id)))
            .await
    }

    pub async fn pet_images(&self, pet_id: i64) -> Result<Vec<PetImage>, ApiError> {
        self.fetch(ApiRequest::get(format!("/pets/{}/images/", pet_id)))
            .await
    }

    // ===== Discovery =====

    /// Candidate pets for `pet_id` to swipe on
    pub async fn discover(&self, pet_id: i64) -> Result<Vec<Pet>, ApiError> {
        self.fetch(ApiRequest::get("/discover/").query("pet_id", pet_id))
            .await
    }

    pub async fn like(&self, from_pet: i64, to_pet: i64) -> Result<Like, ApiError> {
        let request = ApiRequest::post("/likes/").json(&PetPair { from_pet, to_pet })?;
        self.fetch(request).await
    }

    pub async fn pass(&self, from_pet: i64, to_pet: i64) -> Result<Pass, ApiError> {
        let request = ApiRequest::post("/passes/").json(&PetPair { from_pet, to_pet })?;
        self.fetch(request).await
    }

    // ===== Matches & Messages =====

    pub async fn list_matches(&self) -> Result<Vec<Match>, ApiError> {
        self.fetch(ApiRequest::get("/matches/")).await
    }

    pub async fn list_messages(&self, match_id: i64) -> Result<Vec<Message>, ApiError> {
        self.fetch(ApiRequest::get(format!("/matches/{}/messages/", match_id)))
            .await
    }

    pub async fn send_message(
        &self,
        match_id: i64,
        sender_pet: i64,
        content: &str,
    ) -> Result<Message, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation(ValidationErrors::single(
                "content",
                "Message cannot be empty",
            )));
        }
        let request = ApiRequest::post(format!("/matches/{}/messages/create/", match_id))
            .json(&NewMessage { sender_pet, content })?;
        self.fetch(request).await
    }

    /// Mark the partner's messages in a match as read
    pub async fn mark_messages_read(&self, match_id: i64) -> Result<(), ApiError> {
        self.send_ok(ApiRequest::patch(format!("/matches/{}/messages/read/", match_id)))
            .await
    }
}
