use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Everything a regular user can read, plus every catalog mutation. Mounted
/// under `/admin` behind the admin guard, which rejects tokens whose role
/// claim is not `Admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Reads (mirrors of the user group) ---
        .route("/filmssorted", post(handlers::get_sorted_films))
        .route("/filmspiece", post(handlers::get_films_by_fragment))
        // GET lists, POST creates.
        .route(
            "/actors",
            get(handlers::get_actors).post(handlers::create_actor),
        )
        // --- Mutations ---
        // POST /films
        .route("/films", post(handlers::create_film))
        // PUT/DELETE /film
        // The target id travels in the JSON body, not the path.
        .route(
            "/film",
            put(handlers::update_film).delete(handlers::delete_film),
        )
        // PUT/DELETE /actor
        .route(
            "/actor",
            put(handlers::update_actor).delete(handlers::delete_actor),
        )
}
