//! Authorization-request URLs for the admin console login flow

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use reqwest::Url;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::EnvironmentConfig;
use crate::error::{ConfigError, E2eResult};

/// Client the admin console authenticates as
pub const CLIENT_ID: &str = "security-admin-console";

/// Admin console path, relative to the base URL
pub const ADMIN_CONSOLE_PATH: &str = "admin/master/console/";

/// Authorization endpoint, relative to the base URL
pub const AUTH_ENDPOINT_PATH: &str = "realms/master/protocol/openid-connect/auth";

/// End-session endpoint, relative to the base URL
pub const LOGOUT_ENDPOINT_PATH: &str = "realms/master/protocol/openid-connect/logout";

/// URL glob of the admin console
pub const ADMIN_CONSOLE_GLOB: &str = "*/admin/master/console*";

/// URL glob of the login flow
pub const AUTH_FLOW_GLOB: &str = "*/protocol/openid-connect/auth*";

/// URL glob of login form re-renders after a failed submit
pub const LOGIN_ACTIONS_GLOB: &str = "*/login-actions/*";

/// A built authorization request
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub nonce: String,
    pub code_verifier: String,
}

/// Build a fresh authorization request against `env`.
///
/// `state`, `nonce` and the PKCE verifier are new on every call.
pub fn authorization_request(env: &EnvironmentConfig) -> E2eResult<AuthorizationRequest> {
    let state = Uuid::new_v4().to_string();
    let nonce = Uuid::new_v4().to_string();
    let code_verifier = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));

    let mut url = parse(&env.url(AUTH_ENDPOINT_PATH))?;
    url.query_pairs_mut()
        .append_pair("client_id", CLIENT_ID)
        .append_pair("redirect_uri", &env.url(ADMIN_CONSOLE_PATH))
        .append_pair("state", &state)
        .append_pair("response_mode", "fragment")
        .append_pair("response_type", "code")
        .append_pair("scope", "openid")
        .append_pair("nonce", &nonce)
        .append_pair("code_challenge", &code_challenge)
        .append_pair("code_challenge_method", "S256");

    Ok(AuthorizationRequest {
        url: url.into(),
        state,
        nonce,
        code_verifier,
    })
}

/// End-session URL that returns to the admin console afterwards.
pub fn logout_url(env: &EnvironmentConfig) -> E2eResult<String> {
    let mut url = parse(&env.url(LOGOUT_ENDPOINT_PATH))?;
    url.query_pairs_mut()
        .append_pair("client_id", CLIENT_ID)
        .append_pair("post_logout_redirect_uri", &env.url(ADMIN_CONSOLE_PATH));
    Ok(url.into())
}

fn parse(raw: &str) -> E2eResult<Url> {
    Url::parse(raw).map_err(|e| {
        ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
