use axum::extract::FromRef;

use crate::{
    AppState,
    error::ApiError,
    models::{ActorWithFilms, Film, SearchTarget, SortKey},
    repository::CatalogState,
};

const NO_FILMS: &str = "No films found";

/// QueryEngine
///
/// Read side of the catalog, shared by the user and admin routes. Every call
/// goes straight to the store; nothing is cached.
///
/// Film listings treat an empty result as a miss (`NotFound`), the actor
/// listing does not.
#[derive(Clone)]
pub struct QueryEngine {
    catalog: CatalogState,
}

impl FromRef<AppState> for QueryEngine {
    fn from_ref(state: &AppState) -> Self {
        QueryEngine::new(state.catalog.clone())
    }
}

fn non_empty(films: Vec<Film>) -> Result<Vec<Film>, ApiError> {
    if films.is_empty() {
        Err(ApiError::not_found(NO_FILMS))
    } else {
        Ok(films)
    }
}

impl QueryEngine {
    pub fn new(catalog: CatalogState) -> Self {
        Self { catalog }
    }

    /// list_sorted
    ///
    /// All films ordered by `key`: rating descending, name ascending or date
    /// ascending; ties are broken by id.
    pub async fn list_sorted(&self, key: SortKey) -> Result<Vec<Film>, ApiError> {
        non_empty(self.catalog.films_sorted(key).await?)
    }

    /// search_by_fragment
    ///
    /// Case-insensitive substring search. For `Film` the fragment is matched
    /// against film names; for `Actor` against actor names and surnames, and
    /// the films those actors appear in are returned. Results are distinct
    /// and ordered by id.
    pub async fn search_by_fragment(
        &self,
        target: SearchTarget,
        fragment: &str,
    ) -> Result<Vec<Film>, ApiError> {
        let films = match target {
            SearchTarget::Film => self.catalog.films_by_name(fragment).await?,
            SearchTarget::Actor => self.catalog.films_by_actor(fragment).await?,
        };
        non_empty(films)
    }

    /// list_actors
    pub async fn list_actors(&self) -> Result<Vec<ActorWithFilms>, ApiError> {
        Ok(self.catalog.actors_with_films().await?)
    }
}
