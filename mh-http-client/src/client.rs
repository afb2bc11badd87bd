//! MouseHunt HTTP client implementation

use crate::error::{ExtractError, MhError};
use crate::gateway::{
    AJAX_ACCEPT, ChallengePolicy, Credentials, DEFAULT_USER_AGENT, EndpointRequest,
    GatewaySettings, SessionGateway,
};
use crate::journal::JournalParser;
use crate::path::{JsonPath, Rows, extract_one, extract_rows};
use crate::records::{
    CampUser, CorkboardMessage, Friend, JournalSummary, Me, MouseRef, Profile, PuzzleResult,
};
use crate::schema::{FieldSet, validate, validate_rows};
use itertools::Itertools;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;

/// Default upstream
pub const DEFAULT_BASE_URL: &str = "https://www.mousehuntgame.com";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE: [&str; 4] = ["managers", "ajax", "pages", "page.php"];
const FRIENDS: [&str; 4] = ["managers", "ajax", "pages", "friends.php"];
const USER_DATA: [&str; 4] = ["managers", "ajax", "users", "userData.php"];
const PUZZLE: [&str; 4] = ["managers", "ajax", "users", "puzzle.php"];

/// The main MouseHunt client
///
/// Each query builds its parameters, sends them through the
/// [`SessionGateway`], extracts the interesting sub-tree and validates it.
///
/// # Example
///
/// ```no_run
/// use mh_http_client::{Credentials, MhClient};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = MhClient::new()?;
/// let credentials = Credentials::new("hg_token", "unique_hash");
///
/// let snuid = client.resolve_snuid(&credentials, 1234567).await?;
/// let profile = client.fetch_profile(&credentials, &snuid).await?;
/// println!("{} has caught {} kinds of mice", profile.user_id, profile.mice.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MhClient {
    gateway: SessionGateway,
    journal: JournalParser,
}

impl MhClient {
    /// Create a client against the live game with default settings
    ///
    /// # Errors
    ///
    /// Returns `MhError::ClientInit` if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, MhError> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mh_http_client::MhClient;
    /// use std::time::Duration;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = MhClient::builder()
    ///     .base_url("http://localhost:1234")?
    ///     .timeout(Duration::from_secs(5))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> MhClientBuilder {
        MhClientBuilder::new()
    }

    pub fn gateway(&self) -> &SessionGateway {
        &self.gateway
    }

    /// Look up the session id (`sn_user_id`) of a profile id
    ///
    /// # Errors
    ///
    /// * `MhError::NotFound` - No hunter with that profile id
    /// * `MhError::Authentication` - The credentials were rejected
    pub async fn resolve_snuid(
        &self,
        credentials: &Credentials,
        profile_id: u64,
    ) -> Result<String, MhError> {
        let request = EndpointRequest::ajax(FRIENDS)
            .param("action", "community_search_by_id")
            .param("user_id", profile_id.to_string());
        let document = self.gateway.send(credentials, &request).await?;

        let friend = match extract_one(&document, &JsonPath::root().key("friend")) {
            Ok(Value::Null) | Err(ExtractError::NotFound { .. }) => None,
            Ok(friend) => Some(validate::<Friend>(friend)?),
            Err(e) => return Err(e.into()),
        };

        friend
            .map(|friend| friend.sn_user_id)
            .filter(|snuid| !snuid.is_empty())
            .ok_or_else(|| MhError::NotFound(format!("No hunter with profile id {profile_id}")))
    }

    /// Fetch the fields declared by `T` for a hunter
    pub async fn fetch_profile_fields<T: FieldSet>(
        &self,
        credentials: &Credentials,
        snuid: &str,
    ) -> Result<T, MhError> {
        let fields = T::FIELDS.iter().join(",");
        let request = EndpointRequest::api(["api", "get", "user", snuid, fields.as_str()]);
        let document = self.gateway.send(credentials, &request).await?;
        Ok(validate(&document)?)
    }

    /// Profile id, title and catch counts of a hunter
    pub async fn fetch_profile(
        &self,
        credentials: &Credentials,
        snuid: &str,
    ) -> Result<Profile, MhError> {
        self.fetch_profile_fields::<Profile>(credentials, snuid).await
    }

    /// Fetch a page and return the value at `path` under its `page` object
    ///
    /// The caller validates the result.
    pub async fn fetch_page_subview<I, K, V>(
        &self,
        credentials: &Credentials,
        params: I,
        path: &JsonPath,
    ) -> Result<Value, MhError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = EndpointRequest::ajax(PAGE).params(params);
        let page = self.fetch_page(credentials, &request).await?;
        Ok(extract_one(&page, path)?.clone())
    }

    /// Fetch batched user data and return the value at `path` under `user_data`
    pub async fn fetch_user_data<I, K, V>(
        &self,
        credentials: &Credentials,
        params: I,
        path: &JsonPath,
    ) -> Result<Value, MhError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = EndpointRequest::ajax(USER_DATA).params(params);
        let mut document = self.gateway.send(credentials, &request).await?;
        let user_data = take_child(&mut document, "user_data")?;
        Ok(extract_one(&user_data, path)?.clone())
    }

    /// First `limit` corkboard messages of a hunter, newest first as the
    /// game orders them
    pub async fn fetch_corkboard_messages(
        &self,
        credentials: &Credentials,
        snuid: &str,
        limit: usize,
    ) -> Result<Vec<CorkboardMessage>, MhError> {
        let request = hunter_profile(snuid);
        let page = self.fetch_page(credentials, &request).await?;

        let path = JsonPath::root()
            .key("tabs")
            .key("profile")
            .key("subtabs")
            .index(0)
            .key("message_board_view")
            .key("messages");
        let rows = extract_rows(&page, &path, Rows::AllowEmpty)?;
        let rows = &rows[..limit.min(rows.len())];

        Ok(validate_rows(rows)?)
    }

    /// Answer a pending King's Reward; `true` when the game accepted it
    pub async fn submit_challenge_response(
        &self,
        credentials: &Credentials,
        code: &str,
    ) -> Result<bool, MhError> {
        let request = EndpointRequest::ajax(PUZZLE)
            .param("action", "solve")
            .param("code", code)
            .with_challenge_policy(ChallengePolicy::Ignore);
        let document = self.gateway.send(credentials, &request).await?;
        let result: PuzzleResult = validate(&document)?;
        Ok(result.success)
    }

    /// Profile id of the hunter the credentials belong to
    pub async fn fetch_me(&self, credentials: &Credentials) -> Result<u64, MhError> {
        let request = EndpointRequest::api(["api", "get", "user", "me"]);
        let document = self.gateway.send(credentials, &request).await?;
        let me: Me = validate(&document)?;
        Ok(me.user_id)
    }

    /// The hunter the credentials belong to, including a pending puzzle flag
    pub async fn fetch_camp_user(&self, credentials: &Credentials) -> Result<CampUser, MhError> {
        let request = EndpointRequest::ajax(PAGE)
            .param("page_class", "Camp")
            .with_challenge_policy(ChallengePolicy::Ignore);
        let document = self.gateway.send(credentials, &request).await?;
        let user = extract_one(&document, &JsonPath::root().key("user"))?;
        Ok(validate(user)?)
    }

    /// Every mouse in the game
    pub async fn fetch_mouse_catalog(&self) -> Result<Vec<MouseRef>, MhError> {
        let document = self.gateway.get_public(["api", "get", "mouse", "all"]).await?;
        let rows = extract_rows(&document, &JsonPath::root(), Rows::NonEmpty)?;
        Ok(validate_rows(rows)?)
    }

    /// Raw HTML of a hunter's recent journal entries
    pub async fn fetch_journal_entries(
        &self,
        credentials: &Credentials,
        snuid: &str,
    ) -> Result<String, MhError> {
        let request = hunter_profile(snuid);
        let page = self.fetch_page(credentials, &request).await?;

        let path = JsonPath::root()
            .key("tabs")
            .key("profile")
            .key("subtabs")
            .index(0)
            .key("journals")
            .key("entries_string");
        Ok(validate(extract_one(&page, &path)?)?)
    }

    /// Summary line of a hunter's journal, if the journal shows one
    pub async fn fetch_journal_summary(
        &self,
        credentials: &Credentials,
        snuid: &str,
    ) -> Result<Option<JournalSummary>, MhError> {
        let html = self.fetch_journal_entries(credentials, snuid).await?;
        Ok(self.journal.parse_summary(&html)?)
    }

    async fn fetch_page(
        &self,
        credentials: &Credentials,
        request: &EndpointRequest,
    ) -> Result<Value, MhError> {
        let mut document = self.gateway.send(credentials, request).await?;
        take_child(&mut document, "page")
    }
}

fn hunter_profile(snuid: &str) -> EndpointRequest {
    EndpointRequest::ajax(PAGE)
        .param("page_class", "HunterProfile")
        .param("page_arguments[snuid]", snuid)
}

fn take_child(document: &mut Value, key: &str) -> Result<Value, MhError> {
    document
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| {
            ExtractError::NotFound {
                path: JsonPath::root().key(key).to_string(),
            }
            .into()
        })
}

/// Builder for configuring a MouseHunt client
///
/// Redirects are never followed: a redirect from the game means the request
/// was not understood as an AJAX call.
///
/// # Example
///
/// ```no_run
/// use mh_http_client::MhClient;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Custom base URL for testing
/// let client = MhClient::builder()
///     .base_url("http://localhost:1234")?
///     .build()?;
///
/// // Different expired-session wording
/// let client = MhClient::builder()
///     .expired_marker("Session expired")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MhClientBuilder {
    base_url: Option<reqwest::Url>,
    client_builder: Option<reqwest::ClientBuilder>,
    timeout: Duration,
    settings: GatewaySettings,
}

impl MhClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            base_url: None,
            client_builder: None,
            timeout: DEFAULT_TIMEOUT,
            settings: GatewaySettings::default(),
        }
    }

    /// Set a custom base URL for the client
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn base_url(mut self, url: impl reqwest::IntoUrl) -> Result<Self, MhError> {
        self.base_url = Some(url.into_url()?);
        Ok(self)
    }

    /// Set a custom HTTP client builder
    ///
    /// Timeout, default headers and redirect policy are always applied on top.
    pub fn client_builder(mut self, builder: reqwest::ClientBuilder) -> Self {
        self.client_builder = Some(builder);
        self
    }

    /// Timeout for every request, including the session refresh
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Body text that marks an expired session
    pub fn expired_marker(mut self, marker: impl Into<String>) -> Self {
        self.settings.expired_marker = marker.into();
        self
    }

    /// Content types treated as a rejected-credentials page
    pub fn markup_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.markup_content_types = content_types.into_iter().map(Into::into).collect();
        self
    }

    /// Build the client with the configured settings
    ///
    /// # Errors
    ///
    /// Returns `MhError::ClientInit` if the HTTP client cannot be initialized.
    pub fn build(self) -> Result<MhClient, MhError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => reqwest::Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| MhError::ClientInit(e.to_string()))?,
        };

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(AJAX_ACCEPT));

        let builder = self
            .client_builder
            .unwrap_or_else(|| reqwest::Client::builder().use_rustls_tls());

        let http = builder
            .default_headers(headers)
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| MhError::ClientInit(e.to_string()))?;

        Ok(MhClient {
            gateway: SessionGateway::new(http, base_url, self.settings),
            journal: JournalParser::new(),
        })
    }
}

impl Default for MhClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
