use utoipa::OpenApi;

use crate::routes::{analyze, export, health, rooms, settings, upload, validate_key, visualization};

#[derive(OpenApi)]
#[openapi(
    info(title = "Chatlens API", description = "Chat export ingestion, statistics and AI analysis"),
    paths(
        health::health_check,
        upload::upload,
        rooms::list_rooms,
        rooms::get_room,
        rooms::delete_room,
        rooms::search_messages,
        rooms::list_analyses,
        analyze::analyze,
        analyze::get_analysis,
        analyze::cancel_analysis,
        visualization::visualization,
        export::export_all,
        export::export_room,
        export::download_export,
        settings::get_settings,
        settings::save_settings,
        validate_key::validate_key,
    ),
    components(schemas(
        health::HealthResponse,
        upload::UploadResponse,
        rooms::ListRoomsResponse,
        rooms::RoomResponse,
        rooms::DeleteRoomResponse,
        rooms::SearchMessagesResponse,
        rooms::AnalysisHistoryResponse,
        analyze::AnalyzeRequest,
        analyze::AnalyzeResponse,
        visualization::PeakHour,
        export::ExportResponse,
        settings::SettingsResponse,
        validate_key::ValidateKeyRequest,
        validate_key::ValidateKeyResponse,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "upload", description = "Chat export ingestion"),
        (name = "rooms", description = "Rooms and their history"),
        (name = "analysis", description = "AI analysis requests"),
        (name = "statistics", description = "Activity statistics"),
        (name = "export", description = "Room exports"),
        (name = "settings", description = "Client settings and key checks")
    )
)]
pub struct ApiDoc;
