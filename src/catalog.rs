use axum::extract::FromRef;
use chrono::NaiveDate;

use crate::{
    AppState,
    error::{ApiError, StoreError},
    models::{Actor, ActorInput, Film, FilmInput},
    repository::CatalogState,
};

const MAX_RATING: f32 = 10.0;

/// CatalogMutator
///
/// Validated create/replace/delete for films and actors. It does not look at
/// roles: it is only reachable through routes behind the admin guard.
#[derive(Clone)]
pub struct CatalogMutator {
    catalog: CatalogState,
}

impl FromRef<AppState> for CatalogMutator {
    fn from_ref(state: &AppState) -> Self {
        CatalogMutator::new(state.catalog.clone())
    }
}

/// Dates are optional, but when present must be a real `YYYYMMDD` day.
fn validate_date(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() != 8 || NaiveDate::parse_from_str(value, "%Y%m%d").is_err() {
        return Err(ApiError::validation(format!(
            "{field} must be a YYYYMMDD date, got '{value}'"
        )));
    }
    Ok(())
}

fn validate_film(film: &FilmInput) -> Result<(), ApiError> {
    if film.name.trim().is_empty() {
        return Err(ApiError::validation("film name must not be empty"));
    }
    validate_date("date", &film.date)?;
    if !film.rating.is_finite() || !(0.0..=MAX_RATING).contains(&film.rating) {
        return Err(ApiError::validation(format!(
            "rating must be between 0 and {MAX_RATING}"
        )));
    }
    Ok(())
}

fn validate_actor(actor: &ActorInput) -> Result<(), ApiError> {
    if actor.name.trim().is_empty() {
        return Err(ApiError::validation("actor name must not be empty"));
    }
    validate_date("birthdate", &actor.birth_date)
}

/// An unknown id in an association list is the caller's mistake, not a store fault.
fn reference_error(err: StoreError) -> ApiError {
    match err {
        StoreError::MissingReference(what) => {
            ApiError::validation(format!("unknown reference: {what}"))
        }
        other => other.into(),
    }
}

impl CatalogMutator {
    pub fn new(catalog: CatalogState) -> Self {
        Self { catalog }
    }

    pub async fn create_film(&self, film: FilmInput) -> Result<Film, ApiError> {
        validate_film(&film)?;
        let created = self.catalog.insert_film(film).await.map_err(reference_error)?;
        tracing::info!(film_id = created.id, name = %created.name, "film created");
        Ok(created)
    }

    pub async fn create_actor(&self, actor: ActorInput) -> Result<Actor, ApiError> {
        validate_actor(&actor)?;
        let created = self.catalog.insert_actor(actor).await.map_err(reference_error)?;
        tracing::info!(actor_id = created.id, name = %created.name, "actor created");
        Ok(created)
    }

    /// update_film
    ///
    /// Full replace: every field, including the actor list, takes the value
    /// from `film`.
    pub async fn update_film(&self, id: i32, film: FilmInput) -> Result<Film, ApiError> {
        validate_film(&film)?;
        let updated = self
            .catalog
            .replace_film(id, film)
            .await
            .map_err(reference_error)?
            .ok_or_else(|| ApiError::not_found(format!("film {id} not found")))?;
        tracing::info!(film_id = id, "film replaced");
        Ok(updated)
    }

    pub async fn update_actor(&self, id: i32, actor: ActorInput) -> Result<Actor, ApiError> {
        validate_actor(&actor)?;
        let updated = self
            .catalog
            .replace_actor(id, actor)
            .await
            .map_err(reference_error)?
            .ok_or_else(|| ApiError::not_found(format!("actor {id} not found")))?;
        tracing::info!(actor_id = id, "actor replaced");
        Ok(updated)
    }

    pub async fn delete_film(&self, id: i32) -> Result<(), ApiError> {
        if !self.catalog.delete_film(id).await? {
            return Err(ApiError::not_found(format!("film {id} not found")));
        }
        tracing::info!(film_id = id, "film deleted");
        Ok(())
    }

    pub async fn delete_actor(&self, id: i32) -> Result<(), ApiError> {
        if !self.catalog.delete_actor(id).await? {
            return Err(ApiError::not_found(format!("actor {id} not found")));
        }
        tracing::info!(actor_id = id, "actor deleted");
        Ok(())
    }
}
