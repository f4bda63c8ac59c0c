use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod ownership;
pub mod server;
pub mod uploads;


// Re-export server functions for convenience
pub use server::{build_cors, start_server, ApiConfig};

use handlers::{comments, guestbook, health, profiles};
use uploads::{UploadStore, MAX_UPLOAD_BYTES};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<database::Database>,
    pub guard: Arc<authz::OwnershipGuard>,
    pub uploads: Arc<UploadStore>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::guestbook::list_entries,
        handlers::guestbook::create_entry,
        handlers::guestbook::update_entry,
        handlers::guestbook::delete_entry,
        handlers::guestbook::create_reply,
        handlers::guestbook::update_reply,
        handlers::guestbook::delete_reply,
        handlers::guestbook::verify_reply,
        handlers::profiles::list_posts,
        handlers::profiles::create_post,
        handlers::profiles::get_post,
        handlers::comments::list_comments,
        handlers::comments::create_comment,
        handlers::comments::update_comment,
        handlers::comments::delete_comment,
        handlers::comments::like_comment,
        handlers::comments::verify_comment,
        handlers::comments::list_replies,
        handlers::comments::create_reply,
        handlers::comments::update_reply,
        handlers::comments::delete_reply,
        handlers::comments::verify_reply,
        handlers::uploads::upload_image,
    ),
    components(
        schemas(
            models::CredentialFields,
            models::EntryResponse,
            models::ReplyResponse,
            models::EntryPageResponse,
            models::EntryEnvelope,
            models::ReplyEnvelope,
            models::CreateEntryRequest,
            models::CreateReplyRequest,
            models::UpdateContentRequest,
            models::PostResponse,
            models::PostListResponse,
            models::PostEnvelope,
            models::CreatePostRequest,
            models::CommentResponse,
            models::CommentListResponse,
            models::CommentEnvelope,
            models::CreateCommentRequest,
            models::UpdateCommentRequest,
            models::CommentReplyResponse,
            models::CommentReplyListResponse,
            models::CommentReplyEnvelope,
            models::LikeResponse,
            models::GrantResponse,
            models::VerifyResponse,
            models::UploadForm,
            models::UploadResponse,
            models::OkResponse,
            models::HealthResponse,
            models::DatabaseHealth,
            error::ApiErrorResponse,
            error::ErrorDetail,
        )
    ),
    tags(
        (name = "guestbook", description = "Guestbook entries and replies"),
        (name = "profiles", description = "Profile posts"),
        (name = "comments", description = "Profile comments and their replies"),
        (name = "uploads", description = "Image uploads"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Guestbook API",
        version = "1.0.0",
        description = "Guestbook and profile comments with password ownership",
    ),
)]
pub struct ApiDoc;

/// Create the main API router with all routes and middleware
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    let api_v1 = Router::new()
        .route("/health", get(health::health_check))
        // Guestbook
        .route(
            "/guestbook",
            get(guestbook::list_entries).post(guestbook::create_entry),
        )
        .route(
            "/guestbook/:id",
            put(guestbook::update_entry).delete(guestbook::delete_entry),
        )
        .route("/guestbook/:id/replies", post(guestbook::create_reply))
        .route(
            "/guestbook/:id/replies/:reply_id",
            put(guestbook::update_reply).delete(guestbook::delete_reply),
        )
        .route(
            "/guestbook/:id/replies/:reply_id/verify",
            post(guestbook::verify_reply),
        )
        // Profiles
        .route(
            "/profiles",
            get(profiles::list_posts).post(profiles::create_post),
        )
        .route("/profiles/:id", get(profiles::get_post))
        // Profile comments
        .route(
            "/profiles/:id/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/profiles/:id/comments/:comment_id",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route(
            "/profiles/:id/comments/:comment_id/like",
            post(comments::like_comment),
        )
        .route(
            "/profiles/:id/comments/:comment_id/verify",
            post(comments::verify_comment),
        )
        .route(
            "/profiles/:id/comments/:comment_id/replies",
            get(comments::list_replies).post(comments::create_reply),
        )
        .route(
            "/profiles/:id/comments/:comment_id/replies/:reply_id",
            patch(comments::update_reply).delete(comments::delete_reply),
        )
        .route(
            "/profiles/:id/comments/:comment_id/replies/:reply_id/verify",
            post(comments::verify_reply),
        )
        // Uploads; the limit leaves room for multipart framing
        .route(
            "/uploads",
            post(handlers::uploads::upload_image)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        );

    let uploaded_files = ServeDir::new(state.uploads.base_path());

    Router::new()
        .nest("/api/v1", api_v1)
        .nest_service("/uploads", uploaded_files)
        .merge(SwaggerUi::new("/api/v1/swagger").url("/api/v1/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
