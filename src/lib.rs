use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access control: token codec, authenticator and the guard middleware.
pub mod auth;
pub mod authenticator;
pub mod token;

// Catalog: read side, write side and the stores behind them.
pub mod catalog;
pub mod memory;
pub mod query;
pub mod repository;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

// Routing segregated by access level (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use memory::InMemoryRepository;
pub use repository::{CatalogState, CredentialState, PostgresRepository};
pub use token::{TokenCodec, TokenState};

/// Every route lives under this prefix.
pub const BASE_PATH: &str = "/filmlibrary";

/// ApiDoc
///
/// OpenAPI document for the service, served at `/api-docs/openapi.json`.
/// Catalog reads are documented under their user-group paths; the admin group
/// mirrors them under `/filmlibrary/admin`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::register_user,
        handlers::get_sorted_films, handlers::get_films_by_fragment, handlers::get_actors,
        handlers::create_film, handlers::create_actor,
        handlers::update_film, handlers::update_actor,
        handlers::delete_film, handlers::delete_actor,
    ),
    components(
        schemas(
            models::LoginRequest, models::UserRequest, models::Film, models::Actor, models::FilmRef,
            models::ActorWithFilms, models::FilmInput, models::FilmUpdate,
            models::ActorInput, models::ActorUpdate, models::IdRequest,
            models::SearchTarget, models::FragmentQuery, models::MessageResponse,
        )
    ),
    tags(
        (name = "film-library", description = "Film and actor catalog API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Single shared container for the stores, the token codec and the loaded
/// configuration. Handlers pull the component they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// User records, consulted only by the authenticator.
    pub credentials: CredentialState,
    /// Films, actors and their associations.
    pub catalog: CatalogState,
    /// Signs and verifies session tokens.
    pub tokens: TokenState,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state from already-initialised stores. The token codec is
    /// derived from the configured secret.
    pub fn new(credentials: CredentialState, catalog: CatalogState, config: AppConfig) -> Self {
        let tokens = TokenState::new(TokenCodec::new(&config.jwt_secret));
        Self {
            credentials,
            catalog,
            tokens,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// The guards and the `AuthUser` extractor need only the codec. Authenticator,
// QueryEngine and CatalogMutator implement `FromRef<AppState>` in their own
// modules.
impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.tokens.clone()
    }
}

/// create_router
///
/// Assembles the route groups under `/filmlibrary`, attaches each group's
/// guard, and wraps everything in the request-id, tracing and CORS layers.
///
/// Guards are attached with `route_layer`, so an unknown path under a group
/// still answers 404 instead of 401. The admin group is nested under
/// `/admin` and repeats the read routes, which lets an admin client use one
/// prefix for everything.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration (the token travels back in `Authorization`)
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any)
        .expose_headers([axum::http::header::AUTHORIZATION]);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Route Groups, each behind its own guard
    let library = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::user_guard,
            )),
        )
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::admin_guard,
            )),
        );

    // 3. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(BASE_PATH, library)
        .with_state(state);

    // 4. Observability and Correlation Layers, then CORS outermost
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens one span per request carrying the method, the URI and the
/// `x-request-id`, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
