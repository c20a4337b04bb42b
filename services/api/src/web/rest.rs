//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{user_facing, HandlerError};
use crate::web::auth::{RecoverRequest, RecoverResponse, SigninRequest, SignupRequest};
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use flashcard_core::domain::{Flashcard, FlashcardSet, UploadedFile};
use flashcard_core::{generate_from_file, FlashcardApp, FlashcardError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        state_handler,
        toggle_theme_handler,
        upload_handler,
        update_card_handler,
        save_set_handler,
        create_new_handler,
        list_sets_handler,
        import_set_handler,
        export_set_handler,
        study_set_handler,
        delete_set_handler,
        my_sets_handler,
        crate::web::auth::signup_handler,
        crate::web::auth::signin_handler,
        crate::web::auth::recover_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(
            StateResponse, CardPayload, SetSummary, SaveSetRequest, SavedSetResponse,
            ImportRequest, ExportResponse, SignupRequest, SigninRequest, RecoverRequest, RecoverResponse
        )
    ),
    tags(
        (name = "Flashcards API", description = "API endpoints for generating, studying and sharing flashcard sets.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One card as sent over the API.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CardPayload {
    pub question: String,
    pub answer: String,
}

impl From<&Flashcard> for CardPayload {
    fn from(card: &Flashcard) -> Self {
        Self {
            question: card.question.clone(),
            answer: card.answer.clone(),
        }
    }
}

impl From<CardPayload> for Flashcard {
    fn from(card: CardPayload) -> Self {
        Flashcard::new(card.question, card.answer)
    }
}

/// A set as listed on the "My Sets" view.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetSummary {
    pub id: String,
    pub name: String,
    pub card_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Everything the client needs to render the current view.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub view: String,
    pub theme: String,
    pub email: Option<String>,
    pub active_flashcards: Vec<CardPayload>,
    /// The id of the stored set being studied, if any.
    pub editing_set: Option<String>,
    pub sets: Vec<SetSummary>,
    /// Set once saving failed; changes are then kept in memory only.
    pub persistence_degraded: bool,
}

impl StateResponse {
    pub fn from_app(app: &FlashcardApp) -> Self {
        let session = app.session();
        let user = app.current_user();
        Self {
            view: app.view().to_string(),
            theme: format!("{:?}", session.theme).to_lowercase(),
            email: user.map(|u| u.email.clone()),
            active_flashcards: session.active_flashcards.iter().map(CardPayload::from).collect(),
            editing_set: app.editing_set().map(|s| s.id.clone()),
            sets: user.map(|u| u.sets.iter().map(summarize).collect()).unwrap_or_default(),
            persistence_degraded: app.persistence_degraded(),
        }
    }
}

fn summarize(set: &FlashcardSet) -> SetSummary {
    SetSummary {
        id: set.id.clone(),
        name: set.name.clone(),
        card_count: set.flashcards.len(),
        created_at: set.created_at,
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SaveSetRequest {
    pub name: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct SavedSetResponse {
    pub id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ImportRequest {
    /// A set as produced by the export endpoint.
    pub payload: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ExportResponse {
    pub payload: String,
}

async fn current_state(app_state: &AppState) -> Json<StateResponse> {
    let app = app_state.app.lock().await;
    Json(StateResponse::from_app(&app))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Returns the current view, theme, working cards and the user's sets.
#[utoipa::path(
    get,
    path = "/state",
    responses((status = 200, description = "The current session", body = StateResponse))
)]
pub async fn state_handler(State(app_state): State<Arc<AppState>>) -> Json<StateResponse> {
    current_state(&app_state).await
}

/// Switches between the light and dark theme. Valid from any view.
#[utoipa::path(
    post,
    path = "/theme/toggle",
    responses((status = 200, description = "Theme toggled", body = StateResponse))
)]
pub async fn toggle_theme_handler(State(app_state): State<Arc<AppState>>) -> Json<StateResponse> {
    let mut app = app_state.app.lock().await;
    app.toggle_theme();
    Json(StateResponse::from_app(&app))
}

/// Generates flashcards from an uploaded file.
///
/// Accepts a multipart/form-data request with a `file` part and an optional
/// `max_cards` part.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "The file to study, plus an optional `max_cards`."),
    responses(
        (status = 200, description = "Cards generated; the session is on the flashcards view", body = StateResponse),
        (status = 400, description = "Missing file or not on the upload view"),
        (status = 409, description = "The user navigated away, or started a newer upload, before generation finished"),
        (status = 415, description = "The file could not be read"),
        (status = 422, description = "No flashcards could be generated"),
        (status = 502, description = "The generation service failed")
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<StateResponse>, HandlerError> {
    let mut file: Option<UploadedFile> = None;
    let mut max_cards: Option<usize> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("untitled").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file bytes: {}", e),
                    )
                })?;
                file = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("max_cards") => {
                let raw = field.text().await.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                let parsed = raw.trim().parse::<usize>().map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("max_cards must be a whole number, got '{}'", raw),
                    )
                })?;
                max_cards = Some(parsed);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        )
    })?;
    run_upload(&app_state, file, max_cards).await
}

/// Extracts and generates without holding the session, then applies the result
/// only if the upload is still the current one.
pub async fn run_upload(
    app_state: &AppState,
    file: UploadedFile,
    max_cards: Option<usize>,
) -> Result<Json<StateResponse>, HandlerError> {
    let max_cards = app_state.config.clamp_max_cards(max_cards);
    let ticket = app_state.app.lock().await.begin_generation().map_err(user_facing)?;
    info!(file = %file.file_name, max_cards, "Generating flashcards");

    let outcome = generate_from_file(
        app_state.extractor.as_ref(),
        app_state.generator.as_ref(),
        &file,
        max_cards,
    )
    .await;

    let mut app = app_state.app.lock().await;
    app.complete_generation(ticket, outcome).map_err(user_facing)?;
    Ok(Json(StateResponse::from_app(&app)))
}

/// Replaces one card of the working list.
#[utoipa::path(
    put,
    path = "/cards/{index}",
    params(("index" = usize, Path, description = "Position of the card in the working list")),
    request_body = CardPayload,
    responses(
        (status = 200, description = "Card updated", body = StateResponse),
        (status = 404, description = "No card at that position")
    )
)]
pub async fn update_card_handler(
    State(app_state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(card): Json<CardPayload>,
) -> Result<Json<StateResponse>, HandlerError> {
    let mut app = app_state.app.lock().await;
    app.update_active_card(index, card.into()).map_err(user_facing)?;
    Ok(Json(StateResponse::from_app(&app)))
}

/// Saves the working list as a set, updating it in place when it came from one.
#[utoipa::path(
    post,
    path = "/sets",
    request_body = SaveSetRequest,
    responses(
        (status = 201, description = "Set saved", body = SavedSetResponse),
        (status = 400, description = "Empty name or no cards to save")
    )
)]
pub async fn save_set_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SaveSetRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = app_state.app.lock().await.save_set(&req.name).map_err(user_facing)?;
    Ok((StatusCode::CREATED, Json(SavedSetResponse { id })))
}

/// Discards the working list and returns to the upload view.
#[utoipa::path(
    post,
    path = "/sets/new",
    responses((status = 200, description = "Back on the upload view", body = StateResponse))
)]
pub async fn create_new_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<StateResponse>, HandlerError> {
    let mut app = app_state.app.lock().await;
    app.create_new().map_err(user_facing)?;
    Ok(Json(StateResponse::from_app(&app)))
}

/// Lists the signed-in user's sets.
#[utoipa::path(
    get,
    path = "/sets",
    responses(
        (status = 200, description = "The user's sets", body = [SetSummary]),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_sets_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<SetSummary>>, HandlerError> {
    let app = app_state.app.lock().await;
    let user = app
        .current_user()
        .ok_or_else(|| user_facing(FlashcardError::NotSignedIn))?;
    Ok(Json(user.sets.iter().map(summarize).collect()))
}

/// Adds a shared set to the user's collection.
#[utoipa::path(
    post,
    path = "/sets/import",
    request_body = ImportRequest,
    responses(
        (status = 201, description = "Set imported", body = SavedSetResponse),
        (status = 400, description = "The payload is not a valid set")
    )
)]
pub async fn import_set_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = app_state.app.lock().await.import_set(&req.payload).map_err(|e| {
        warn!("Import rejected: {}", e);
        user_facing(e)
    })?;
    Ok((StatusCode::CREATED, Json(SavedSetResponse { id })))
}

/// Returns a set as a shareable JSON payload.
#[utoipa::path(
    get,
    path = "/sets/{id}/export",
    params(("id" = String, Path, description = "The set id")),
    responses(
        (status = 200, description = "The shareable payload", body = ExportResponse),
        (status = 404, description = "No such set")
    )
)]
pub async fn export_set_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ExportResponse>, HandlerError> {
    let payload = app_state.app.lock().await.export_set(&id).map_err(user_facing)?;
    Ok(Json(ExportResponse { payload }))
}

/// Loads a stored set as the working list.
#[utoipa::path(
    post,
    path = "/sets/{id}/study",
    params(("id" = String, Path, description = "The set id")),
    responses(
        (status = 200, description = "On the flashcards view", body = StateResponse),
        (status = 404, description = "No such set")
    )
)]
pub async fn study_set_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StateResponse>, HandlerError> {
    let mut app = app_state.app.lock().await;
    app.study_set(&id).map_err(user_facing)?;
    Ok(Json(StateResponse::from_app(&app)))
}

/// Deletes a stored set.
#[utoipa::path(
    delete,
    path = "/sets/{id}",
    params(("id" = String, Path, description = "The set id")),
    responses(
        (status = 204, description = "Set deleted"),
        (status = 404, description = "No such set")
    )
)]
pub async fn delete_set_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    app_state.app.lock().await.delete_set(&id).map_err(user_facing)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Opens the "My Sets" view.
#[utoipa::path(
    post,
    path = "/view/my-sets",
    responses((status = 200, description = "On the my sets view", body = StateResponse))
)]
pub async fn my_sets_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<StateResponse>, HandlerError> {
    let mut app = app_state.app.lock().await;
    app.show_my_sets().map_err(user_facing)?;
    Ok(Json(StateResponse::from_app(&app)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FileExtractor;
    use crate::web::auth::signup_handler;
    use crate::web::state::test_app_state;
    use async_trait::async_trait;
    use flashcard_core::domain::FileData;
    use flashcard_core::error::GenerationError;
    use flashcard_core::ports::FlashcardGenerationService;
    use tokio::sync::Notify;

    /// Returns fixed cards once the gate is opened.
    struct GatedGenerator {
        gate: Arc<Notify>,
        cards: Vec<Flashcard>,
    }

    #[async_trait]
    impl FlashcardGenerationService for GatedGenerator {
        async fn generate_flashcards(&self, _file: &FileData, _max_cards: usize) -> Result<Vec<Flashcard>, GenerationError> {
            self.gate.notified().await;
            Ok(self.cards.clone())
        }
    }

    fn notes() -> UploadedFile {
        UploadedFile {
            file_name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            bytes: b"Paris is the capital of France.".to_vec(),
        }
    }

    fn cards() -> Vec<Flashcard> {
        vec![
            Flashcard::new("Capital of France?", "Paris"),
            Flashcard::new("2+2?", "4"),
            Flashcard::new("Largest planet?", "Jupiter"),
        ]
    }

    async fn signed_in_state(gate: Arc<Notify>) -> Arc<AppState> {
        let state = test_app_state(
            Arc::new(FileExtractor::new()),
            Arc::new(GatedGenerator { gate, cards: cards() }),
        );
        let response = signup_handler(
            State(state.clone()),
            Json(SignupRequest {
                email: "a@x.com".to_string(),
                password: "pw".to_string(),
                confirm_password: "pw".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        state
    }

    #[tokio::test]
    async fn upload_then_save_list_export_import_and_delete() {
        let gate = Arc::new(Notify::new());
        gate.notify_one();
        let state = signed_in_state(gate).await;

        let Json(after_upload) = run_upload(&state, notes(), Some(2)).await.unwrap();
        assert_eq!(after_upload.view, "flashcards");
        assert_eq!(after_upload.active_flashcards.len(), 2);

        let response = save_set_handler(
            State(state.clone()),
            Json(SaveSetRequest { name: "Geo".to_string() }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let Json(sets) = list_sets_handler(State(state.clone())).await.unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].card_count, 2);
        let original_id = sets[0].id.clone();

        let Json(export) = export_set_handler(State(state.clone()), Path(original_id.clone()))
            .await
            .unwrap();
        let response = import_set_handler(State(state.clone()), Json(ImportRequest { payload: export.payload }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let Json(sets) = list_sets_handler(State(state.clone())).await.unwrap();
        assert_eq!(sets.len(), 2);
        assert_ne!(sets[0].id, sets[1].id);

        let status = delete_set_handler(State(state.clone()), Path(original_id)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let Json(sets) = list_sets_handler(State(state.clone())).await.unwrap();
        assert_eq!(sets.len(), 1);
    }

    #[tokio::test]
    async fn navigating_away_discards_the_pending_upload() {
        let gate = Arc::new(Notify::new());
        let state = signed_in_state(gate.clone()).await;

        let pending = {
            let state = state.clone();
            tokio::spawn(async move { run_upload(&state, notes(), None).await })
        };
        // Let the upload reach the generator before moving on.
        tokio::task::yield_now().await;
        my_sets_handler(State(state.clone())).await.unwrap();
        gate.notify_one();

        let (status, _) = pending.await.unwrap().unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        let Json(current) = state_handler(State(state.clone())).await;
        assert_eq!(current.view, "mySets");
        assert!(current.active_flashcards.is_empty());
    }

    #[tokio::test]
    async fn unreadable_upload_stays_on_the_upload_view() {
        let gate = Arc::new(Notify::new());
        let state = signed_in_state(gate).await;
        let empty = UploadedFile {
            bytes: Vec::new(),
            ..notes()
        };

        let (status, _) = run_upload(&state, empty, None).await.unwrap_err();
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let Json(current) = state_handler(State(state)).await;
        assert_eq!(current.view, "upload");
    }

    #[tokio::test]
    async fn theme_toggles_without_signing_in() {
        let state = test_app_state(
            Arc::new(FileExtractor::new()),
            Arc::new(GatedGenerator {
                gate: Arc::new(Notify::new()),
                cards: Vec::new(),
            }),
        );
        let Json(current) = toggle_theme_handler(State(state)).await;
        assert_eq!(current.theme, "light");
        assert_eq!(current.view, "auth");
    }

    #[tokio::test]
    async fn card_edits_and_missing_sets_map_to_statuses() {
        let gate = Arc::new(Notify::new());
        gate.notify_one();
        let state = signed_in_state(gate).await;
        run_upload(&state, notes(), None).await.unwrap();

        let Json(updated) = update_card_handler(
            State(state.clone()),
            Path(1),
            Json(CardPayload {
                question: "3+3?".to_string(),
                answer: "6".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.active_flashcards[1].answer, "6");

        let (status, _) = update_card_handler(
            State(state.clone()),
            Path(99),
            Json(CardPayload {
                question: "q".to_string(),
                answer: "a".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = export_set_handler(State(state), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
