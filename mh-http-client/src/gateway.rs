//! Session-aware request pipeline
//!
//! Every authenticated call goes through [`SessionGateway::send`]: the form is
//! assembled from the protocol defaults, the call parameters and the unique
//! hash; the response is classified; an expired session is refreshed with one
//! touch of the camp page and the call is sent once more.

use crate::error::MhError;
use crate::path::{JsonPath, extract_one};
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Body text the game shows in place of data once a session has lapsed
pub const DEFAULT_EXPIRED_MARKER: &str = "Your session has expired.";

/// Page requested to revive a lapsed session
pub const DEFAULT_REFRESH_PATH: &str = "/camp.php";

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Accept header the game's own frontend sends for AJAX calls
pub const AJAX_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

const TOKEN_COOKIE: &str = "HG_TOKEN";
const UNIQUE_HASH_PARAM: &str = "uh";

/// Session credentials of one hunter
///
/// The token travels as the `HG_TOKEN` cookie and the unique hash as the `uh`
/// form field. Both are wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    token: Zeroizing<String>,
    unique_hash: Zeroizing<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, unique_hash: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            unique_hash: Zeroizing::new(unique_hash.into()),
        }
    }

    pub fn unique_hash(&self) -> &str {
        &self.unique_hash
    }

    /// Cookie header carrying the session token, marked sensitive
    fn cookie_header(&self) -> Result<HeaderValue, MhError> {
        let mut cookie_string = format!("{TOKEN_COOKIE}={}", self.token.as_str());
        let header_value = HeaderValue::from_bytes(cookie_string.as_bytes())
            .map_err(|_| MhError::Authentication("Invalid session token format".to_string()));
        cookie_string.zeroize();

        let mut sensitive_header = header_value?;
        sensitive_header.set_sensitive(true);
        Ok(sensitive_header)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Which family of upstream endpoints a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointFamily {
    /// `/managers/ajax/...` page and action handlers
    Ajax,
    /// `/api/...` endpoints, which report failures in an error envelope
    Api,
}

/// What to do when the response says the hunter has a pending puzzle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePolicy {
    /// Fail with [`MhError::ChallengeRequired`]
    Reject,
    /// Return the document anyway
    Ignore,
}

/// A single upstream call, fixed once built
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    segments: Vec<String>,
    method: Method,
    family: EndpointFamily,
    params: Vec<(String, String)>,
    challenge: ChallengePolicy,
}

impl EndpointRequest {
    /// POST to an AJAX handler, e.g. `["managers", "ajax", "pages", "page.php"]`
    pub fn ajax<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(EndpointFamily::Ajax, segments)
    }

    /// POST to an `/api` endpoint
    pub fn api<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(EndpointFamily::Api, segments)
    }

    fn new<I, S>(family: EndpointFamily, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            method: Method::POST,
            family,
            params: Vec::new(),
            challenge: ChallengePolicy::Reject,
        }
    }

    /// Append a call parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Append several call parameters in order
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Override the method; a GET carries the form in the query string
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_challenge_policy(mut self, policy: ChallengePolicy) -> Self {
        self.challenge = policy;
        self
    }

    /// Path relative to the base URL, for logging
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn family(&self) -> EndpointFamily {
        self.family
    }

    pub fn call_params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn challenge_policy(&self) -> ChallengePolicy {
        self.challenge
    }
}

/// Tunables for response classification
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Protocol parameters sent before the call parameters
    pub default_params: Vec<(String, String)>,
    /// Body text that marks an expired session
    pub expired_marker: String,
    /// Content types that mean the game answered with a page instead of data
    pub markup_content_types: Vec<String>,
    /// Page touched to revive an expired session
    pub refresh_path: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            default_params: vec![
                ("sn".to_string(), "Hitgrab".to_string()),
                ("hg_is_ajax".to_string(), "1".to_string()),
            ],
            expired_marker: DEFAULT_EXPIRED_MARKER.to_string(),
            markup_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }
}

/// Classification of one upstream response
#[derive(Debug)]
pub(crate) enum SessionState {
    Valid(Value),
    Expired,
}

/// Sends requests with session handling
#[derive(Debug, Clone)]
pub struct SessionGateway {
    http: reqwest::Client,
    base_url: Url,
    settings: GatewaySettings,
}

impl SessionGateway {
    pub(crate) fn new(http: reqwest::Client, base_url: Url, settings: GatewaySettings) -> Self {
        Self {
            http,
            base_url,
            settings,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Form fields for a request: defaults not overridden by the call, then the
    /// call parameters, then the unique hash
    pub fn build_form(
        &self,
        credentials: &Credentials,
        request: &EndpointRequest,
    ) -> Vec<(String, String)> {
        let overridden = |key: &str| request.params.iter().any(|(k, _)| k == key);

        self.settings
            .default_params
            .iter()
            .filter(|(key, _)| !overridden(key) && key != UNIQUE_HASH_PARAM)
            .chain(request.params.iter().filter(|(key, _)| key != UNIQUE_HASH_PARAM))
            .cloned()
            .chain(std::iter::once((
                UNIQUE_HASH_PARAM.to_string(),
                credentials.unique_hash().to_string(),
            )))
            .collect()
    }

    /// Send an authenticated request, refreshing the session at most once
    ///
    /// # Errors
    ///
    /// * `MhError::SessionRefreshIneffective` - Still expired after one refresh
    /// * `MhError::Authentication` - Markup response, or the refresh itself failed
    /// * `MhError::ChallengeRequired` - Pending puzzle under `ChallengePolicy::Reject`
    /// * `MhError::Transport` / `MhError::Request` / `MhError::Decode` / `MhError::Upstream`
    pub async fn send(
        &self,
        credentials: &Credentials,
        request: &EndpointRequest,
    ) -> Result<Value, MhError> {
        let form = self.build_form(credentials, request);

        if let SessionState::Valid(document) =
            self.dispatch(Some(credentials), request, &form).await?
        {
            return Ok(document);
        }

        log::info!("Session expired calling {}, refreshing", request.path());
        self.refresh(credentials).await?;

        match self.dispatch(Some(credentials), request, &form).await? {
            SessionState::Valid(document) => Ok(document),
            SessionState::Expired => {
                log::warn!("Session still expired after refresh calling {}", request.path());
                Err(MhError::SessionRefreshIneffective)
            }
        }
    }

    /// Touch the refresh page with the session cookie; the body is ignored
    pub async fn refresh(&self, credentials: &Credentials) -> Result<(), MhError> {
        let url = self.endpoint_url(self.settings.refresh_path.split('/'))?;

        let response = self
            .http
            .get(url)
            .header(COOKIE, credentials.cookie_header()?)
            .send()
            .await
            .map_err(|e| MhError::Authentication(format!("Session refresh failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MhError::Authentication(format!(
                "Session refresh returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Unauthenticated GET returning a JSON document
    ///
    /// Classified like any `/api` call; there is no session to refresh, so an
    /// expired marker is an authentication failure.
    pub async fn get_public<I, S>(&self, segments: I) -> Result<Value, MhError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = EndpointRequest::api(segments)
            .with_method(Method::GET)
            .with_challenge_policy(ChallengePolicy::Ignore);

        match self.dispatch(None, &request, &[]).await? {
            SessionState::Valid(document) => Ok(document),
            SessionState::Expired => Err(MhError::Authentication(format!(
                "{} answered with an expired session",
                request.path()
            ))),
        }
    }

    async fn dispatch(
        &self,
        credentials: Option<&Credentials>,
        request: &EndpointRequest,
        form: &[(String, String)],
    ) -> Result<SessionState, MhError> {
        let url = self.endpoint_url(&request.segments)?;

        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(credentials) = credentials {
            builder = builder.header(COOKIE, credentials.cookie_header()?);
        }
        let builder = if request.method == Method::GET {
            builder.query(form)
        } else {
            builder.form(form)
        };

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        classify(
            &self.settings,
            request,
            status,
            content_type.as_deref(),
            &body,
        )
    }

    /// Base URL with its path replaced by the given segments
    fn endpoint_url<I, S>(&self, segments: I) -> Result<Url, MhError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| MhError::ClientInit("Cannot modify base URL path".to_string()))?;
            path.clear();
            for segment in segments {
                let segment = segment.as_ref();
                if !segment.is_empty() {
                    path.push(segment);
                }
            }
        }
        Ok(url)
    }
}

/// Decide what a response means for the session
pub(crate) fn classify(
    settings: &GatewaySettings,
    request: &EndpointRequest,
    status: StatusCode,
    content_type: Option<&str>,
    body: &str,
) -> Result<SessionState, MhError> {
    if !status.is_success() {
        return Err(MhError::Transport { status });
    }

    if let Some(essence) = content_type.map(mime_essence) {
        if settings
            .markup_content_types
            .iter()
            .any(|markup| markup.eq_ignore_ascii_case(&essence))
        {
            return Err(MhError::Authentication(format!(
                "Received {essence} instead of data, credentials are not valid"
            )));
        }
    }

    let document: Value = serde_json::from_str(body)?;

    if request.family == EndpointFamily::Api {
        if let Some(error) = api_error(&document) {
            return Err(error);
        }
    }

    if is_expired(&document, &settings.expired_marker) {
        return Ok(SessionState::Expired);
    }

    if request.challenge == ChallengePolicy::Reject && has_puzzle(&document) {
        let user_id = document.pointer("/user/user_id").and_then(id_value);
        log::warn!("Hunter {user_id:?} has a pending King's Reward");
        return Err(MhError::ChallengeRequired { user_id });
    }

    Ok(SessionState::Valid(document))
}

fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn expired_marker_path() -> JsonPath {
    JsonPath::root()
        .key("messageData")
        .key("popup")
        .key("messages")
        .index(0)
        .key("messageData")
        .key("body")
}

fn is_expired(document: &Value, marker: &str) -> bool {
    extract_one(document, &expired_marker_path())
        .ok()
        .and_then(Value::as_str)
        .is_some_and(|body| body == marker)
}

fn has_puzzle(document: &Value) -> bool {
    match document.pointer("/user/has_puzzle") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_i64() == Some(1),
        Some(Value::String(text)) => text == "1" || text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn api_error(document: &Value) -> Option<MhError> {
    let error = document.get("error")?;
    let message = error.get("message")?.as_str()?;
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    Some(MhError::Upstream {
        code,
        message: message.to_string(),
    })
}

fn id_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAGE: &str = "/managers/ajax/pages/page.php";

    fn page_request() -> EndpointRequest {
        EndpointRequest::ajax(["managers", "ajax", "pages", "page.php"]).param("page_class", "Camp")
    }

    fn credentials() -> Credentials {
        Credentials::new("token123", "hash456")
    }

    fn gateway(url: &str) -> SessionGateway {
        SessionGateway::new(
            reqwest::Client::new(),
            Url::parse(url).unwrap(),
            GatewaySettings::default(),
        )
    }

    fn expired_body() -> String {
        json!({
            "messageData": {"popup": {"messages": [
                {"messageData": {"body": DEFAULT_EXPIRED_MARKER}}
            ]}}
        })
        .to_string()
    }

    fn keys(form: &[(String, String)]) -> Vec<&str> {
        form.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_form_order() {
        let gateway = gateway("http://localhost");
        let form = gateway.build_form(&credentials(), &page_request());
        assert_eq!(keys(&form), vec!["sn", "hg_is_ajax", "page_class", "uh"]);
        assert_eq!(form[3].1, "hash456");
    }

    #[test]
    fn test_call_param_overrides_default() {
        let gateway = gateway("http://localhost");
        let request = page_request().param("sn", "Facebook");
        let form = gateway.build_form(&credentials(), &request);
        assert_eq!(keys(&form), vec!["hg_is_ajax", "page_class", "sn", "uh"]);
        assert_eq!(form[2].1, "Facebook");
    }

    #[test]
    fn test_call_cannot_replace_unique_hash() {
        let gateway = gateway("http://localhost");
        let request = page_request().param("uh", "forged");
        let form = gateway.build_form(&credentials(), &request);
        let hashes: Vec<_> = form.iter().filter(|(k, _)| k == "uh").collect();
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes[0].1, "hash456");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_unique_hash_is_last_and_keys_unique(
            call_keys in prop::collection::btree_set(
                prop::sample::select(vec!["sn", "hg_is_ajax", "page_class", "tab", "sub_tab", "action"]),
                0..6,
            ),
        ) {
            let gateway = gateway("http://localhost");
            let request = EndpointRequest::ajax(["x.php"])
                .params(call_keys.iter().map(|k| (*k, "v")));
            let form = gateway.build_form(&credentials(), &request);

            prop_assert_eq!(form.last().map(|(k, _)| k.as_str()), Some("uh"));
            let mut seen = std::collections::HashSet::new();
            for (key, value) in &form {
                prop_assert!(seen.insert(key.clone()), "duplicate key {}", key);
                if call_keys.contains(key.as_str()) {
                    prop_assert_eq!(value, "v");
                }
            }
            prop_assert_eq!(form.len(), call_keys.len() + 3 - call_keys.iter().filter(|k| **k == "sn" || **k == "hg_is_ajax").count());
        }
    }

    #[test]
    fn test_classify_order() {
        let settings = GatewaySettings::default();
        let request = page_request();

        let result = classify(&settings, &request, StatusCode::BAD_GATEWAY, Some("text/html"), "");
        assert!(matches!(result, Err(MhError::Transport { status }) if status == StatusCode::BAD_GATEWAY));

        let result = classify(&settings, &request, StatusCode::OK, Some("text/html; charset=UTF-8"), "{}");
        assert!(matches!(result, Err(MhError::Authentication(_))));

        let result = classify(&settings, &request, StatusCode::OK, Some("application/json"), "<html>");
        assert!(matches!(result, Err(MhError::Decode(_))));

        let result = classify(&settings, &request, StatusCode::OK, None, &expired_body());
        assert!(matches!(result, Ok(SessionState::Expired)));

        let result = classify(&settings, &request, StatusCode::OK, None, r#"{"user": {}}"#);
        assert!(matches!(result, Ok(SessionState::Valid(_))));
    }

    #[test]
    fn test_classify_api_envelope_only_for_api_family() {
        let settings = GatewaySettings::default();
        let body = r#"{"error": {"message": "Invalid user", "code": 404}}"#;

        let api = EndpointRequest::api(["api", "get", "user", "me"]);
        let result = classify(&settings, &api, StatusCode::OK, None, body);
        assert!(matches!(result, Err(MhError::Upstream { code: 404, .. })));

        let result = classify(&settings, &page_request(), StatusCode::OK, None, body);
        assert!(matches!(result, Ok(SessionState::Valid(_))));
    }

    #[test]
    fn test_classify_custom_marker() {
        let settings = GatewaySettings {
            expired_marker: "Session over".to_string(),
            ..GatewaySettings::default()
        };
        let result = classify(&settings, &page_request(), StatusCode::OK, None, &expired_body());
        assert!(matches!(result, Ok(SessionState::Valid(_))));
    }

    #[test]
    fn test_classify_puzzle_policy() {
        let settings = GatewaySettings::default();
        let body = r#"{"user": {"has_puzzle": true, "user_id": "77"}}"#;

        let result = classify(&settings, &page_request(), StatusCode::OK, None, body);
        assert!(matches!(result, Err(MhError::ChallengeRequired { user_id: Some(77) })));

        let request = page_request().with_challenge_policy(ChallengePolicy::Ignore);
        let result = classify(&settings, &request, StatusCode::OK, None, body);
        assert!(matches!(result, Ok(SessionState::Valid(_))));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let debug = format!("{:?}", credentials());
        assert!(!debug.contains("token123"));
        assert!(!debug.contains("hash456"));
    }

    #[tokio::test]
    async fn test_sends_cookie_and_ordered_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PAGE)
            .match_header("cookie", "HG_TOKEN=token123")
            .match_body(Matcher::Exact(
                "sn=Hitgrab&hg_is_ajax=1&page_class=Camp&uh=hash456".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"page": {}}"#)
            .expect(1)
            .create_async()
            .await;

        let document = gateway(&server.url())
            .send(&credentials(), &page_request())
            .await
            .unwrap();
        assert_eq!(document, json!({"page": {}}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_request_carries_form_in_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", PAGE)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("sn".into(), "Hitgrab".into()),
                Matcher::UrlEncoded("page_class".into(), "Camp".into()),
                Matcher::UrlEncoded("uh".into(), "hash456".into()),
            ]))
            .match_header("cookie", "HG_TOKEN=token123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"page": {}}"#)
            .expect(1)
            .create_async()
            .await;

        let request = page_request().with_method(Method::GET);
        gateway(&server.url())
            .send(&credentials(), &request)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_always_expired_refreshes_once() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("POST", PAGE)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(expired_body())
            .expect(2)
            .create_async()
            .await;
        let camp = server
            .mock("GET", "/camp.php")
            .match_header("cookie", "HG_TOKEN=token123")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html></html>")
            .expect(1)
            .create_async()
            .await;

        let result = gateway(&server.url())
            .send(&credentials(), &page_request())
            .await;
        assert!(matches!(result, Err(MhError::SessionRefreshIneffective)));
        page.assert_async().await;
        camp.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_then_valid_after_refresh() {
        let mut server = mockito::Server::new_async().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let expired = expired_body();
        let page = server
            .mock("POST", PAGE)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    expired.clone().into_bytes()
                } else {
                    br#"{"page": {"ok": true}}"#.to_vec()
                }
            })
            .expect(2)
            .create_async()
            .await;
        let camp = server
            .mock("GET", "/camp.php")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let document = gateway(&server.url())
            .send(&credentials(), &page_request())
            .await
            .unwrap();
        assert_eq!(document, json!({"page": {"ok": true}}));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        page.assert_async().await;
        camp.assert_async().await;
    }

    #[tokio::test]
    async fn test_markup_response_is_authentication_failure() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("POST", PAGE)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body>Log in</body></html>")
            .expect(1)
            .create_async()
            .await;
        let camp = server
            .mock("GET", "/camp.php")
            .expect(0)
            .create_async()
            .await;

        let result = gateway(&server.url())
            .send(&credentials(), &page_request())
            .await;
        assert!(matches!(result, Err(MhError::Authentication(_))));
        page.assert_async().await;
        camp.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_refresh_is_authentication_failure() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("POST", PAGE)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(expired_body())
            .expect(1)
            .create_async()
            .await;
        let _camp = server
            .mock("GET", "/camp.php")
            .with_status(500)
            .create_async()
            .await;

        let result = gateway(&server.url())
            .send(&credentials(), &page_request())
            .await;
        assert!(matches!(result, Err(MhError::Authentication(_))));
        page.assert_async().await;
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_non_success_status_is_transport(
            status_code in prop::sample::select(vec![400usize, 401, 403, 404, 429, 500, 502, 503]),
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let mut server = mockito::Server::new_async().await;
                let page = server
                    .mock("POST", PAGE)
                    .with_status(status_code)
                    .with_body("error")
                    .expect(1)
                    .create_async()
                    .await;

                let result = gateway(&server.url())
                    .send(&credentials(), &page_request())
                    .await;
                match result {
                    Err(MhError::Transport { status }) => {
                        assert_eq!(status.as_u16() as usize, status_code);
                    }
                    other => panic!("Expected MhError::Transport, got {other:?}"),
                }
                page.assert_async().await;
            });
        }
    }
}
