//! Axum router construction.
//!
//! Builds the full application router with all route groups, middleware
//! layers, and static file serving.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    info(title = "folio", description = "Personal library and reading tracker API"),
    paths(
        routes::health::health_check,
        routes::auth::register,
        routes::auth::login,
        routes::auth::logout,
        routes::auth::auth_status,
        routes::auth::change_password,
        routes::books::create_book,
        routes::books::get_book,
        routes::books::list_books,
        routes::books::delete_book,
        routes::books::set_status,
        routes::goals::set_goal,
        routes::reading_logs::calendar,
        routes::reading_logs::streaks,
        routes::stats::get_stats,
        routes::stats::get_badges,
        routes::roulette::spin,
        routes::theme::get_theme,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::auth::LoginRequest,
        routes::auth::AuthResponse,
        routes::auth::AuthStatusResponse,
        routes::auth::ChangePasswordRequest,
        routes::auth::UserInfo,
        routes::books::CreateBookRequest,
        routes::books::StatusRequest,
        routes::goals::GoalRequest,
        routes::reading_logs::CalendarResponse,
        folio_core::calendar::Streaks,
        folio_core::calendar::CalendarDay,
        folio_core::stats::ReadingStats,
        folio_core::badges::BadgeProgress,
        folio_core::goals::GoalProgress,
        folio_core::theme::Theme,
        folio_core::BookStatus,
        folio_core::Role,
    ))
)]
struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Login and registration share one quota.
    let limited_auth = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(Extension(ctx.login_limiter.clone()));

    let public_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/status", get(routes::auth::auth_status))
        .route("/theme", get(routes::theme::get_theme))
        .merge(limited_auth);

    let upload_limit = DefaultBodyLimit::max(ctx.images.max_upload_bytes());

    let protected_routes = Router::new()
        .route("/auth/password", put(routes::auth::change_password))
        // Users (admin)
        .route("/users", get(routes::users::list_users))
        .route("/users/{id}", axum::routing::delete(routes::users::delete_user))
        .route("/users/{id}/role", put(routes::users::update_role))
        // Books
        .route(
            "/books",
            get(routes::books::list_books).post(routes::books::create_book),
        )
        .route(
            "/books/{id}",
            get(routes::books::get_book)
                .put(routes::books::update_book)
                .delete(routes::books::delete_book),
        )
        .route("/books/{id}/status", put(routes::books::set_status))
        .route("/books/{id}/rating", put(routes::books::rate_book))
        .route("/books/{id}/favorite", put(routes::books::set_favorite))
        .route(
            "/books/{id}/quotes",
            get(routes::quotes::book_quotes).post(routes::quotes::create_quote),
        )
        .route(
            "/books/{id}/images",
            get(routes::images::list_images)
                .post(routes::images::upload_image)
                .layer(upload_limit),
        )
        .route(
            "/books/{id}/images/from-url",
            post(routes::images::image_from_url),
        )
        // Authors / genres
        .route("/authors", get(routes::authors::list_authors))
        .route(
            "/authors/{id}",
            get(routes::authors::get_author)
                .put(routes::authors::rename_author)
                .delete(routes::authors::delete_author),
        )
        .route("/authors/{id}/enrich", post(routes::authors::enrich_author))
        .route("/genres", get(routes::genres::list_genres))
        .route(
            "/genres/{id}",
            put(routes::genres::rename_genre).delete(routes::genres::delete_genre),
        )
        // Collections
        .route(
            "/collections",
            get(routes::collections::list_collections).post(routes::collections::create_collection),
        )
        .route(
            "/collections/{id}",
            get(routes::collections::get_collection)
                .put(routes::collections::update_collection)
                .delete(routes::collections::delete_collection),
        )
        .route(
            "/collections/{id}/books/{book_id}",
            put(routes::collections::add_book).delete(routes::collections::remove_book),
        )
        // Series
        .route(
            "/series",
            get(routes::series::list_series).post(routes::series::create_series),
        )
        .route(
            "/series/{id}",
            get(routes::series::get_series)
                .put(routes::series::update_series)
                .delete(routes::series::delete_series),
        )
        // Quotes
        .route("/quotes", get(routes::quotes::list_quotes))
        .route("/quotes/random", get(routes::quotes::random_quote))
        .route(
            "/quotes/{id}",
            put(routes::quotes::update_quote).delete(routes::quotes::delete_quote),
        )
        // Lexicon
        .route(
            "/words",
            get(routes::words::list_words).post(routes::words::create_word),
        )
        .route("/words/lookup", get(routes::words::lookup_word))
        .route(
            "/words/{id}",
            get(routes::words::get_word)
                .put(routes::words::update_word)
                .delete(routes::words::delete_word),
        )
        // Goals
        .route("/goals", get(routes::goals::list_goals))
        .route(
            "/goals/{year}",
            get(routes::goals::get_goal)
                .put(routes::goals::set_goal)
                .delete(routes::goals::delete_goal),
        )
        // Reading logs
        .route(
            "/logs",
            get(routes::reading_logs::list_logs).post(routes::reading_logs::create_log),
        )
        .route(
            "/logs/{id}",
            get(routes::reading_logs::get_log)
                .put(routes::reading_logs::update_log)
                .delete(routes::reading_logs::delete_log),
        )
        .route("/calendar", get(routes::reading_logs::calendar))
        .route("/streaks", get(routes::reading_logs::streaks))
        // Aggregates
        .route(
            "/top",
            get(routes::top_books::get_top).put(routes::top_books::replace_top),
        )
        .route("/stats", get(routes::stats::get_stats))
        .route("/badges", get(routes::stats::get_badges))
        .route("/roulette", get(routes::roulette::spin))
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route("/export", get(routes::export::export_library))
        // Metadata providers
        .route("/metadata/search", get(routes::metadata::search))
        .route("/metadata/isbn/{isbn}", get(routes::metadata::by_isbn))
        .route("/metadata/volumes/{id}", get(routes::metadata::volume))
        .route("/metadata/authors", get(routes::metadata::author_summary))
        .route("/metadata/import", post(routes::metadata::import))
        // Images
        .route("/images/{id}/file", get(routes::images::image_file))
        .route("/images/{id}/cover", put(routes::images::set_cover))
        .route("/images/{id}", axum::routing::delete(routes::images::delete_image))
        // Maintenance (admin)
        .route("/maintenance/ratings", get(routes::maintenance::scan_ratings))
        .route(
            "/maintenance/ratings/repair",
            post(routes::maintenance::repair_ratings),
        );

    let protected_routes =
        protected_routes.layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware));

    let api = public_routes.merge(protected_routes);

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", api)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Static file serving for the front-end build.
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                tower_http::services::ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(tower_http::services::ServeFile::new(index_path)),
            );
        }
    }

    app
}
