//! HTTP routes

use crate::auth::{credentials_from_headers, require_api_key};
use crate::error::ApiError;
use crate::identity::{IdentityKey, IdentityLink, IdentityStore};
use crate::notify::{ChallengeNotifier, puzzle_image_url};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router, middleware};
use mh_http_client::achievements::{
    Achievement, AchievementService, CrownSummary, UnknownAchievement,
};
use mh_http_client::records::{CorkboardMessage, JournalSummary, Profile};
use mh_http_client::{Credentials, MhClient, MhError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Length of a King's Reward answer
const PUZZLE_LENGTH: usize = 5;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    client: MhClient,
    store: Arc<IdentityStore>,
    notifier: Arc<dyn ChallengeNotifier>,
    api_key: Option<Arc<Zeroizing<String>>>,
}

impl AppState {
    pub fn new(
        client: MhClient,
        store: IdentityStore,
        notifier: Arc<dyn ChallengeNotifier>,
        api_key: Option<Zeroizing<String>>,
    ) -> Self {
        Self {
            client,
            store: Arc::new(store),
            notifier,
            api_key: api_key.map(Arc::new),
        }
    }

    /// Convert a client failure, telling the notifier about a pending puzzle
    fn upstream(&self, error: MhError) -> ApiError {
        if let MhError::ChallengeRequired { user_id: Some(user_id) } = &error {
            let base_url = self.client.gateway().base_url().as_str();
            self.notifier
                .notify_challenge(&puzzle_image_url(base_url, *user_id));
        }
        ApiError::from(error)
    }

    /// Caller credentials and the session id of the requested profile
    async fn hunter(
        &self,
        headers: &HeaderMap,
        id: &str,
    ) -> Result<(Credentials, String), ApiError> {
        let profile_id = parse_id(id)?;
        let credentials = credentials_from_headers(headers)?;
        let snuid = self
            .client
            .resolve_snuid(&credentials, profile_id)
            .await
            .map_err(|e| self.upstream(e))?;
        Ok((credentials, snuid))
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let identify = Router::new()
        .route("/api/identify", axum::routing::post(create_identity))
        .route(
            "/api/identify/discord/{id}",
            get(get_by_discord).delete(delete_by_discord),
        )
        .route(
            "/api/identify/mousehunt/{id}",
            get(get_by_mousehunt).delete(delete_by_mousehunt),
        )
        .route_layer(middleware::from_fn_with_state(
            state.api_key.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/user/{id}", get(user_profile))
        .route("/api/user/{id}/snuid", get(user_snuid))
        .route("/api/user/{id}/corkboard", get(user_corkboard))
        .route("/api/user/{id}/journal", get(user_journal))
        .route("/api/user/{id}/achievements", get(user_achievements))
        .route("/api/user/{id}/achievements/{kind}", get(user_achievement))
        .route("/api/user/{id}/crowns", get(user_crowns))
        .route("/api/kr", get(kings_reward_status).post(kings_reward_submit))
        .merge(identify)
        .fallback(route_not_found)
        .with_state(state)
}

fn parse_id(id: &str) -> Result<u64, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid id `{id}`")))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

#[derive(Serialize)]
struct SnuidResponse {
    id: u64,
    snuid: String,
}

async fn user_snuid(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SnuidResponse>, ApiError> {
    let (_, snuid) = state.hunter(&headers, &id).await?;
    Ok(Json(SnuidResponse {
        id: parse_id(&id)?,
        snuid,
    }))
}

async fn user_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Profile>, ApiError> {
    let (credentials, snuid) = state.hunter(&headers, &id).await?;
    let profile = state
        .client
        .fetch_profile(&credentials, &snuid)
        .await
        .map_err(|e| state.upstream(e))?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
struct CorkboardQuery {
    limit: Option<String>,
}

async fn user_corkboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CorkboardQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<CorkboardMessage>>, ApiError> {
    let limit = match query.limit.as_deref() {
        None => 1,
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit >= 1)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid limit `{raw}`, expected 1 or more")))?,
    };

    let (credentials, snuid) = state.hunter(&headers, &id).await?;
    let messages = state
        .client
        .fetch_corkboard_messages(&credentials, &snuid, limit)
        .await
        .map_err(|e| state.upstream(e))?;
    Ok(Json(messages))
}

async fn user_journal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JournalSummary>, ApiError> {
    let (credentials, snuid) = state.hunter(&headers, &id).await?;
    state
        .client
        .fetch_journal_summary(&credentials, &snuid)
        .await
        .map_err(|e| state.upstream(e))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No journal summary found".to_string()))
}

#[derive(Serialize)]
struct AchievementsResponse {
    id: u64,
    snuid: String,
    achievements: BTreeMap<Achievement, bool>,
}

async fn user_achievements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AchievementsResponse>, ApiError> {
    let (credentials, snuid) = state.hunter(&headers, &id).await?;
    let achievements = AchievementService::new(&state.client, &credentials)
        .evaluate_all(&snuid)
        .await
        .map_err(|e| state.upstream(e))?;
    Ok(Json(AchievementsResponse {
        id: parse_id(&id)?,
        snuid,
        achievements,
    }))
}

#[derive(Serialize)]
struct AchievementResponse {
    id: u64,
    achievement: Achievement,
    eligible: bool,
}

async fn user_achievement(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<AchievementResponse>, ApiError> {
    let achievement: Achievement = kind
        .parse()
        .map_err(|e: UnknownAchievement| ApiError::BadRequest(e.to_string()))?;

    let (credentials, snuid) = state.hunter(&headers, &id).await?;
    let eligible = AchievementService::new(&state.client, &credentials)
        .evaluate(achievement, &snuid)
        .await
        .map_err(|e| state.upstream(e))?;
    Ok(Json(AchievementResponse {
        id: parse_id(&id)?,
        achievement,
        eligible,
    }))
}

async fn user_crowns(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CrownSummary>, ApiError> {
    let (credentials, snuid) = state.hunter(&headers, &id).await?;
    let summary = AchievementService::new(&state.client, &credentials)
        .crown_summary(&snuid)
        .await
        .map_err(|e| state.upstream(e))?;
    Ok(Json(summary))
}

#[derive(Serialize)]
struct KingsRewardStatus {
    user_id: u64,
    has_puzzle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
}

async fn kings_reward_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<KingsRewardStatus>, ApiError> {
    let credentials = credentials_from_headers(&headers)?;
    let user = state
        .client
        .fetch_camp_user(&credentials)
        .await
        .map_err(|e| state.upstream(e))?;

    let image_url = user.has_puzzle.then(|| {
        let url = puzzle_image_url(state.client.gateway().base_url().as_str(), user.user_id);
        state.notifier.notify_challenge(&url);
        url
    });

    Ok(Json(KingsRewardStatus {
        user_id: user.user_id,
        has_puzzle: user.has_puzzle,
        image_url,
    }))
}

#[derive(Deserialize)]
struct PuzzleSubmission {
    puzzle: String,
}

async fn kings_reward_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PuzzleSubmission>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let credentials = credentials_from_headers(&headers)?;
    let Json(submission) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let code = submission.puzzle.trim();
    if code.len() != PUZZLE_LENGTH || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::BadRequest(format!(
            "Puzzle answer must be {PUZZLE_LENGTH} letters or digits"
        )));
    }

    let success = state
        .client
        .submit_challenge_response(&credentials, code)
        .await
        .map_err(|e| state.upstream(e))?;
    Ok(Json(json!({ "success": success })))
}

async fn create_identity(
    State(state): State<AppState>,
    payload: Result<Json<IdentityLink>, JsonRejection>,
) -> Result<(StatusCode, Json<IdentityLink>), ApiError> {
    let Json(link) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let link = state.store.create(link).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn find_identity(state: &AppState, key: IdentityKey) -> Result<Json<IdentityLink>, ApiError> {
    state
        .store
        .find(key)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Identity not found".to_string()))
}

async fn delete_identity(state: &AppState, key: IdentityKey) -> Result<StatusCode, ApiError> {
    match state.store.delete(key).await? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::NotFound("Identity not found".to_string())),
    }
}

async fn get_by_discord(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IdentityLink>, ApiError> {
    find_identity(&state, IdentityKey::Discord(parse_id(&id)?)).await
}

async fn get_by_mousehunt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IdentityLink>, ApiError> {
    find_identity(&state, IdentityKey::MouseHunt(parse_id(&id)?)).await
}

async fn delete_by_discord(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_identity(&state, IdentityKey::Discord(parse_id(&id)?)).await
}

async fn delete_by_mousehunt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_identity(&state, IdentityKey::MouseHunt(parse_id(&id)?)).await
}
