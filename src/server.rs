use crate::config::Config;
use crate::engine::{LayoutMode, RecognizeOptions};
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::AppError;
use crate::raster::{self, PreprocessOptions, SelectionArea};
use crate::session::{Capture, Session, HISTORY_LIMIT};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engines: Arc<EngineRegistry>,
    pub session: Arc<Mutex<Session>>,
    pub config: Arc<Config>,
}

/// One history entry as reported to the front end
#[derive(Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub selected: bool,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub captures: Vec<HistoryEntry>,
    pub selection: Vec<u64>,
}

#[derive(Serialize)]
pub struct SelectionResponse {
    pub selection: Vec<u64>,
}

#[derive(Serialize)]
pub struct RecognizeResponse {
    pub text: String,
    pub confidence: f32,
    pub engine: String,
    pub processing_time_ms: u64,
}

#[derive(Serialize)]
pub struct ResultResponse {
    pub text: Option<String>,
}

#[derive(Serialize)]
pub struct ClipboardResponse {
    pub copied_chars: usize,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_engine: String,
    pub available_engines: Vec<EngineInfo>,
    pub default_language: String,
    pub max_upload_size_bytes: usize,
    pub history_limit: usize,
}

#[cfg(feature = "capture")]
#[derive(Deserialize, Default)]
struct CaptureRequest {
    source_id: Option<String>,
}

#[derive(Deserialize, Clone, Copy)]
struct DisplayedSize {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct PreprocessRequest {
    id: u64,
    area: Option<SelectionArea>,
    /// When set, `area` is in displayed coordinates of a view this size
    displayed: Option<DisplayedSize>,
    #[serde(default)]
    preprocess: PreprocessOptions,
}

#[derive(Deserialize)]
struct RecognizeRequest {
    id: u64,
    area: Option<SelectionArea>,
    displayed: Option<DisplayedSize>,
    #[serde(default)]
    preprocess: PreprocessOptions,
    engine: Option<String>,
    language: Option<String>,
    #[serde(default)]
    layout: LayoutMode,
}

#[derive(Deserialize, Default)]
struct ClipboardRequest {
    text: Option<String>,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engines = EngineRegistry::new(&config)?;
    let session = Arc::new(Mutex::new(Session::new()));
    let addr = format!("{}:{}", config.host, config.port);
    let max_upload_size = config.max_upload_size;

    #[cfg(feature = "capture")]
    {
        if !config.disable_hotkey {
            crate::capture::hotkey::spawn_listener(session.clone());
        }
    }

    let state = AppState {
        engines: Arc::new(engines),
        session,
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/import", post(handle_import))
        .route("/history", get(handle_history))
        .route("/history/:id/image", get(handle_history_image))
        .route("/history/:id/select", post(handle_select))
        .route("/stack", post(handle_stack))
        .route("/preprocess", post(handle_preprocess))
        .route("/recognize", post(handle_recognize))
        .route("/result", get(handle_result))
        .route("/clipboard", post(handle_clipboard));

    #[cfg(feature = "capture")]
    let app = app
        .route("/sources", get(handle_sources))
        .route("/displays", get(handle_displays))
        .route("/capture", post(handle_capture));

    let app = app
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn lock_session(state: &AppState) -> Result<MutexGuard<'_, Session>, AppError> {
    state
        .session
        .lock()
        .map_err(|_| AppError::Internal("Session state poisoned".to_string()))
}

fn history_entry(capture: &Capture, selection: &[u64]) -> HistoryEntry {
    HistoryEntry {
        id: capture.id,
        width: capture.image.width(),
        height: capture.image.height(),
        selected: selection.contains(&capture.id),
    }
}

fn get_capture_image(state: &AppState, id: u64) -> Result<Arc<RgbaImage>, AppError> {
    let session = lock_session(state)?;
    session
        .get(id)
        .map(|capture| capture.image.clone())
        .ok_or(AppError::HistoryEntryNotFound(id))
}

/// Resolve an optional selection area against the image it crops.
///
/// Display-space areas are mapped back to native pixels first; the result is
/// clamped to the image bounds before the (non-clamping) crop runs.
fn resolve_area(
    area: Option<SelectionArea>,
    displayed: Option<DisplayedSize>,
    image: &RgbaImage,
) -> Result<Option<SelectionArea>, AppError> {
    let Some(area) = area else {
        return Ok(None);
    };

    let natural = (image.width(), image.height());
    let area = match displayed {
        Some(displayed) => SelectionArea::from_display(
            area.x as f32,
            area.y as f32,
            area.width as f32,
            area.height as f32,
            natural,
            (displayed.width, displayed.height),
        ),
        None => area,
    };

    area.clamp_to(natural.0, natural.1)
        .map(Some)
        .ok_or_else(|| AppError::InvalidRequest("Selection area lies outside the image".to_string()))
}

fn prepare(image: &RgbaImage, area: Option<SelectionArea>, options: &PreprocessOptions) -> RgbaImage {
    let cropped = match area {
        Some(area) => raster::crop(image, &area),
        None => image.clone(),
    };
    raster::preprocess(&cropped, options)
}

fn png_response(image: &RgbaImage) -> Result<Response, AppError> {
    let png = raster::png::encode(image)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_engine: state.engines.default_name().to_string(),
        available_engines: state.engines.info(),
        default_language: state.config.default_language.clone(),
        max_upload_size_bytes: state.config.max_upload_size,
        history_limit: HISTORY_LIMIT,
    })
}

/// List capture sources (monitors and windows) with preview thumbnails
#[cfg(feature = "capture")]
async fn handle_sources() -> Result<Json<Vec<crate::capture::CaptureSource>>, AppError> {
    Ok(Json(crate::capture::enumerate_sources().await?))
}

/// Per-display metadata
#[cfg(feature = "capture")]
async fn handle_displays() -> Result<Json<Vec<crate::capture::DisplayInfo>>, AppError> {
    Ok(Json(crate::capture::display_info().await?))
}

/// Capture a source (or the primary display) into the history
#[cfg(feature = "capture")]
async fn handle_capture(
    State(state): State<AppState>,
    payload: Option<Json<CaptureRequest>>,
) -> Result<Json<HistoryEntry>, AppError> {
    let source_id = payload.and_then(|Json(request)| request.source_id);

    let image = match source_id {
        Some(id) => crate::capture::capture_by_id(id).await?,
        None => crate::capture::capture_primary().await?,
    };

    let entry = {
        let mut session = lock_session(&state)?;
        let capture = session.push(image);
        history_entry(&capture, session.selection())
    };

    tracing::info!(
        "Captured {}x{} as history entry {}",
        entry.width,
        entry.height,
        entry.id
    );
    Ok(Json(entry))
}

/// Import an uploaded image file into the history
async fn handle_import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<HistoryEntry>, AppError> {
    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            content_type = field.content_type().map(|s| s.to_string());
            file_data = Some(field.bytes().await.map_err(|e| {
                AppError::InvalidRequest(format!("Failed to read file data: {}", e))
            })?);
        }
    }

    let data = file_data.ok_or(AppError::MissingFile)?;

    if data.len() > state.config.max_upload_size {
        return Err(AppError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_upload_size,
        });
    }

    // Only files declaring an image content type are accepted; nothing is
    // added to the session for anything else
    let mime = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    if !mime.starts_with("image/") {
        return Err(AppError::InvalidFileType(mime));
    }

    let image = raster::png::decode(&data)?;

    let entry = {
        let mut session = lock_session(&state)?;
        let capture = session.push(image);
        history_entry(&capture, session.selection())
    };

    tracing::info!(
        "Imported {} ({} bytes) as history entry {}",
        mime,
        data.len(),
        entry.id
    );
    Ok(Json(entry))
}

/// List the capture history, most recent first
async fn handle_history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, AppError> {
    let session = lock_session(&state)?;
    let captures = session
        .history()
        .iter()
        .map(|capture| history_entry(capture, session.selection()))
        .collect();
    Ok(Json(HistoryResponse {
        captures,
        selection: session.selection().to_vec(),
    }))
}

/// Return one history entry as PNG
async fn handle_history_image(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, AppError> {
    let image = get_capture_image(&state, id)?;
    png_response(&image)
}

/// Toggle a history entry in the stacking selection
async fn handle_select(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SelectionResponse>, AppError> {
    let mut session = lock_session(&state)?;
    let selection = session.toggle_selection(id)?.to_vec();
    Ok(Json(SelectionResponse { selection }))
}

/// Stack the current selection, in selection order, into a new history entry
async fn handle_stack(State(state): State<AppState>) -> Result<Json<HistoryEntry>, AppError> {
    // Snapshot the inputs; the insufficient-input check happens inside the
    // stacker before any canvas is allocated
    let images = {
        let session = lock_session(&state)?;
        session.selected_images()
    };
    let refs: Vec<&RgbaImage> = images.iter().map(|image| image.as_ref()).collect();
    let stacked = raster::stack(&refs)?;

    let entry = {
        let mut session = lock_session(&state)?;
        let capture = session.push(stacked);
        session.clear_selection();
        history_entry(&capture, session.selection())
    };

    tracing::info!(
        "Stacked {} captures into history entry {} ({}x{})",
        refs.len(),
        entry.id,
        entry.width,
        entry.height
    );
    Ok(Json(entry))
}

/// Crop + preprocess preview, returned as PNG
async fn handle_preprocess(
    State(state): State<AppState>,
    Json(request): Json<PreprocessRequest>,
) -> Result<Response, AppError> {
    let image = get_capture_image(&state, request.id)?;
    let area = resolve_area(request.area, request.displayed, &image)?;
    let prepared = prepare(&image, area, &request.preprocess);
    png_response(&prepared)
}

/// Crop, preprocess and recognize one history entry
async fn handle_recognize(
    State(state): State<AppState>,
    Json(request): Json<RecognizeRequest>,
) -> Result<Json<RecognizeResponse>, AppError> {
    let start = Instant::now();

    let engine = match &request.engine {
        Some(name) => state
            .engines
            .get(name)
            .ok_or_else(|| AppError::UnknownEngine(name.clone()))?,
        None => state
            .engines
            .default()
            .ok_or_else(|| AppError::Internal("No default engine registered".to_string()))?,
    };

    let image = get_capture_image(&state, request.id)?;
    let area = resolve_area(request.area, request.displayed, &image)?;
    let prepared = prepare(&image, area, &request.preprocess);

    let options = RecognizeOptions {
        language: request
            .language
            .clone()
            .unwrap_or_else(|| state.config.default_language.clone()),
        layout: request.layout,
    };

    let engine_name = engine.name();
    let recognition = tokio::task::spawn_blocking(move || {
        let report = move |percent: u8| {
            tracing::debug!(engine = engine_name, progress = percent, "recognizing");
        };
        engine.recognize(&prepared, &options, &report)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Recognition task failed: {}", e)))??;

    // Only a successful run replaces the session's last result; failures
    // above leave the previous text untouched
    {
        let mut session = lock_session(&state)?;
        session.set_last_text(recognition.text.clone());
    }

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Recognition completed in {}ms, confidence: {:.2}, text length: {}",
        processing_time_ms,
        recognition.confidence,
        recognition.text.len()
    );

    Ok(Json(RecognizeResponse {
        text: recognition.text,
        confidence: recognition.confidence,
        engine: engine_name.to_string(),
        processing_time_ms,
    }))
}

/// The session's last recognized text
async fn handle_result(State(state): State<AppState>) -> Result<Json<ResultResponse>, AppError> {
    let session = lock_session(&state)?;
    Ok(Json(ResultResponse {
        text: session.last_text().map(str::to_string),
    }))
}

/// Copy the given text, or the last recognized text, to the clipboard
async fn handle_clipboard(
    State(state): State<AppState>,
    payload: Option<Json<ClipboardRequest>>,
) -> Result<Json<ClipboardResponse>, AppError> {
    let requested = payload.and_then(|Json(request)| request.text);
    let text = match requested {
        Some(text) => text,
        None => {
            let session = lock_session(&state)?;
            session
                .last_text()
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::InvalidRequest("No recognized text to copy".to_string())
                })?
        }
    };

    crate::clipboard::copy_text(&text)?;
    tracing::info!("Copied {} characters to the clipboard", text.chars().count());

    Ok(Json(ClipboardResponse {
        copied_chars: text.chars().count(),
    }))
}
