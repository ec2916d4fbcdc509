use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Read-only catalog access for any caller holding a valid, unexpired token.
/// The same handlers are mounted again in the admin group.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /filmssorted
        // Body is the bare sort selector (`rating`, `name`, `date` or empty).
        .route("/filmssorted", post(handlers::get_sorted_films))
        // POST /filmspiece
        .route("/filmspiece", post(handlers::get_films_by_fragment))
        // GET /actors
        .route("/actors", get(handlers::get_actors))
}
