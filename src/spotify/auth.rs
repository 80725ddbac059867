use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    config, error,
    errors::ShuffleError,
    info,
    management::{CursorManager, TokenManager},
    server::start_auth_server,
    success,
    types::{PkceToken, Token, UserProfile},
    utils, warning,
};

/// Initiates the complete OAuth 2.0 PKCE authentication flow with Spotify.
///
/// This function orchestrates the entire login:
/// 1. Generating PKCE code verifier and challenge
/// 2. Starting a local callback server
/// 3. Opening the authorization URL in the user's browser
/// 4. Waiting until the callback handler completed the login, see
///    [`complete_login`]
///
/// # Arguments
///
/// * `shared_state` - Shared state for the PKCE verifier and the resulting
///   token, filled in by the callback handler
///
/// # Error Handling
///
/// - Browser launch failures result in a warning with manual URL instructions
/// - Failed exchanges are reported by the callback page; the flow then
///   times out
/// - Authentication timeouts terminate with an error message
pub async fn auth(shared_state: Arc<Mutex<Option<PkceToken>>>) {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let server_state = Arc::clone(&shared_state);
    tokio::spawn(async move {
        if let Err(e) = start_auth_server(server_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = format!(
        "{spotify_auth_url}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&code_challenge={code_challenge}&code_challenge_method=S256&scope={scope}",
        spotify_auth_url = &config::spotify_apiauth_url(),
        client_id = &config::spotify_client_id(),
        redirect_uri = &config::spotify_redirect_uri(),
        code_challenge = code_challenge,
        scope = &config::spotify_scope()
    );

    // Store verifier in shared state before redirect
    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier: code_verifier.clone(),
            token: None,
        });
    }

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let Some(token) = wait_for_token(shared_state).await else {
        error!("Authentication failed or timed out.");
    };

    match token.user_id.as_deref() {
        Some(user_id) => success!("Authentication successful! Logged in as {}", user_id),
        None => {
            warning!("Logged in, but the user profile could not be read. Set SPOTIFY_USER_ID.");
            success!("Authentication successful!");
        }
    }
}

/// Finishes a login from the OAuth callback.
///
/// Exchanges the code, looks up the profile of the token's owner (`GET /me`)
/// so later commands know whose library, cursor and bundles they work on,
/// persists the token and registers the user's cursor row.
pub async fn complete_login(code: &str, verifier: &str) -> Result<Token, String> {
    let mut token = exchange_code_pkce(code, verifier).await?;

    match get_current_user(&token.access_token).await {
        Ok(profile) => {
            info!(
                "Logged in as {}",
                profile.display_name.as_deref().unwrap_or(&profile.id)
            );
            token.user_id = Some(profile.id);
        }
        Err(e) => warning!("Failed to look up user profile: {}", e),
    }

    store_login(token.clone()).await?;
    Ok(token)
}

/// Persists a freshly exchanged token and registers its user's cursor row.
pub async fn store_login(token: Token) -> Result<(), String> {
    let user_id = token.user_id.clone();
    TokenManager::new(token).persist().await?;

    if let Some(user_id) = user_id {
        let cursors = CursorManager::load().await.map_err(|e| e.to_string())?;
        cursors
            .register(&user_id)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Polls the shared state for the token written by the callback handler.
///
/// Gives up after 60 seconds, checking once per second.
async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(pkce_token) = lock.as_ref() {
            if let Some(token) = &pkce_token.token {
                return Some(token.clone());
            }
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Fetches the profile of the token's owner (`GET /me`).
pub async fn get_current_user(token: &str) -> Result<UserProfile, ShuffleError> {
    let client = Client::new();
    let response = client
        .get(format!("{}/me", config::spotify_apiurl()))
        .bearer_auth(token)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ShuffleError::remote(status.as_u16(), message));
    }

    Ok(response.json::<UserProfile>().await?)
}

/// Exchanges a refresh token for a new access token.
///
/// The returned token carries no `user_id`; [`TokenManager`] copies it over
/// from the token being replaced. An empty `refresh_token` means Spotify did
/// not rotate it.
pub async fn refresh_token(refresh_token: &str) -> Result<Token, String> {
    let client = Client::new();
    let res = client
        .post(&config::spotify_apitoken_url())
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &config::spotify_client_id()),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let json: Value = res.json().await.map_err(|e| e.to_string())?;
    token_from_json(&json)
}

/// Exchanges an authorization code for an access token using PKCE.
///
/// # Arguments
///
/// * `code` - Authorization code received from the OAuth callback
/// * `verifier` - PKCE code verifier generated at the start of the flow
async fn exchange_code_pkce(code: &str, verifier: &str) -> Result<Token, String> {
    let client_id = &config::spotify_client_id();
    let redirect_uri = &config::spotify_redirect_uri();

    let client = Client::new();
    let res = client
        .post(&config::spotify_apitoken_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let json: Value = res.json().await.map_err(|e| e.to_string())?;
    token_from_json(&json)
}

fn token_from_json(json: &Value) -> Result<Token, String> {
    let Some(access_token) = json["access_token"].as_str() else {
        let reason = json["error_description"]
            .as_str()
            .or(json["error"].as_str())
            .unwrap_or("missing access_token");
        return Err(reason.to_string());
    };

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: json["refresh_token"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_i64().unwrap_or(3600) as u64,
        obtained_at: Utc::now().timestamp() as u64,
        user_id: None,
    })
}
