use crate::{
    auth::AuthUser,
    authenticator::Authenticator,
    catalog::CatalogMutator,
    error::ApiError,
    models::{
        Actor, ActorInput, ActorUpdate, ActorWithFilms, Film, FilmInput, FilmUpdate,
        FragmentQuery, IdRequest, LoginRequest, MessageResponse, SortKey, UserRequest,
    },
    query::QueryEngine,
};
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::de::DeserializeOwned;

/// AppJson
///
/// A JSON body with every rejection routed through `ApiError`, so a malformed
/// body gets the same `{"error": ...}` shape as every other failure.
///
/// Unlike `Json`, the `Content-Type` header is not inspected: clients that
/// post JSON without declaring it are served as well.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(request, state).await?;
        let Json(value) = Json::<T>::from_bytes(&body)?;
        Ok(AppJson(value))
    }
}

/// PlainText
///
/// A raw UTF-8 body. Invalid UTF-8 becomes a validation error instead of
/// axum's plain-text rejection.
pub struct PlainText(pub String);

impl<S> FromRequest<S> for PlainText
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(request, state).await?;
        let text = String::from_utf8(body.to_vec())
            .map_err(|_| ApiError::validation("request body must be valid UTF-8"))?;
        Ok(PlainText(text))
    }
}

// --- Public ---

/// login
///
/// [Public Route] Exchanges a login and password for a session token. The
/// token is returned in the `Authorization` response header and is valid for
/// 24 hours.
#[utoipa::path(
    post,
    path = "/filmlibrary/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued in the Authorization header", body = MessageResponse,
            headers(("Authorization" = String, description = "Session token"))),
        (status = 401, description = "Unknown login or wrong password")
    )
)]
pub async fn login(
    State(auth): State<Authenticator>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = auth.login(&payload.login, &payload.password).await?;
    Ok((
        [(header::AUTHORIZATION, token)],
        Json(MessageResponse::new("ok")),
    ))
}

/// register_user
///
/// [Public Route] Creates a user with the requested role. The password is
/// stored only as an Argon2 hash.
#[utoipa::path(
    post,
    path = "/filmlibrary/registration",
    request_body = UserRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Empty field or login already taken")
    )
)]
pub async fn register_user(
    State(auth): State<Authenticator>,
    AppJson(payload): AppJson<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("created"))))
}

// --- Reads (user and admin groups) ---

/// get_sorted_films
///
/// [Authenticated Route] Lists every film. The raw request body selects the
/// order: `rating` (default, also for an empty body), `name` or `date`.
/// Mirrored at `/filmlibrary/admin/filmssorted`.
#[utoipa::path(
    post,
    path = "/filmlibrary/filmssorted",
    request_body(content = String, description = "Sort selector", content_type = "text/plain"),
    responses(
        (status = 200, description = "Films in the requested order", body = [Film]),
        (status = 400, description = "Unknown sort selector or a body that is not UTF-8"),
        (status = 404, description = "Catalog holds no films")
    )
)]
pub async fn get_sorted_films(
    State(engine): State<QueryEngine>,
    PlainText(body): PlainText,
) -> Result<Json<Vec<Film>>, ApiError> {
    let key = SortKey::parse(&body).ok_or_else(|| {
        ApiError::validation(format!(
            "unknown sort key '{}', expected rating, name or date",
            body.trim()
        ))
    })?;
    Ok(Json(engine.list_sorted(key).await?))
}

/// get_films_by_fragment
///
/// [Authenticated Route] Finds films by a case-insensitive name fragment,
/// either of the film itself (`key: "film"`) or of an actor in it
/// (`key: "actor"`). Mirrored at `/filmlibrary/admin/filmspiece`.
#[utoipa::path(
    post,
    path = "/filmlibrary/filmspiece",
    request_body = FragmentQuery,
    responses(
        (status = 200, description = "Matching films", body = [Film]),
        (status = 400, description = "Unknown search key"),
        (status = 404, description = "No film matches")
    )
)]
pub async fn get_films_by_fragment(
    State(engine): State<QueryEngine>,
    AppJson(query): AppJson<FragmentQuery>,
) -> Result<Json<Vec<Film>>, ApiError> {
    let films = engine.search_by_fragment(query.key, &query.fragment).await?;
    Ok(Json(films))
}

/// get_actors
///
/// [Authenticated Route] Lists every actor with the films they appear in.
/// Mirrored at `/filmlibrary/admin/actors`.
#[utoipa::path(
    get,
    path = "/filmlibrary/actors",
    responses((status = 200, description = "All actors", body = [ActorWithFilms]))
)]
pub async fn get_actors(
    State(engine): State<QueryEngine>,
) -> Result<Json<Vec<ActorWithFilms>>, ApiError> {
    Ok(Json(engine.list_actors().await?))
}

// --- Mutations (admin group only) ---

/// create_film
#[utoipa::path(
    post,
    path = "/filmlibrary/admin/films",
    request_body = FilmInput,
    responses(
        (status = 201, description = "Film created", body = Film),
        (status = 400, description = "Invalid field or unknown actor id")
    )
)]
pub async fn create_film(
    AuthUser { login, .. }: AuthUser,
    State(catalog): State<CatalogMutator>,
    AppJson(payload): AppJson<FilmInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(admin = %login, "creating film");
    let film = catalog.create_film(payload).await?;
    Ok((StatusCode::CREATED, Json(film)))
}

/// create_actor
#[utoipa::path(
    post,
    path = "/filmlibrary/admin/actors",
    request_body = ActorInput,
    responses(
        (status = 201, description = "Actor created", body = Actor),
        (status = 400, description = "Invalid field or unknown film id")
    )
)]
pub async fn create_actor(
    AuthUser { login, .. }: AuthUser,
    State(catalog): State<CatalogMutator>,
    AppJson(payload): AppJson<ActorInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(admin = %login, "creating actor");
    let actor = catalog.create_actor(payload).await?;
    Ok((StatusCode::CREATED, Json(actor)))
}

/// update_film
///
/// [Admin Route] Replaces every field of the film named by `id`, its actor
/// list included.
#[utoipa::path(
    put,
    path = "/filmlibrary/admin/film",
    request_body = FilmUpdate,
    responses(
        (status = 200, description = "Film replaced", body = Film),
        (status = 400, description = "Invalid field or unknown actor id"),
        (status = 404, description = "No film with this id")
    )
)]
pub async fn update_film(
    AuthUser { login, .. }: AuthUser,
    State(catalog): State<CatalogMutator>,
    AppJson(payload): AppJson<FilmUpdate>,
) -> Result<Json<Film>, ApiError> {
    tracing::debug!(admin = %login, film_id = payload.id, "replacing film");
    Ok(Json(catalog.update_film(payload.id, payload.film).await?))
}

/// update_actor
#[utoipa::path(
    put,
    path = "/filmlibrary/admin/actor",
    request_body = ActorUpdate,
    responses(
        (status = 200, description = "Actor replaced", body = Actor),
        (status = 400, description = "Invalid field or unknown film id"),
        (status = 404, description = "No actor with this id")
    )
)]
pub async fn update_actor(
    AuthUser { login, .. }: AuthUser,
    State(catalog): State<CatalogMutator>,
    AppJson(payload): AppJson<ActorUpdate>,
) -> Result<Json<Actor>, ApiError> {
    tracing::debug!(admin = %login, actor_id = payload.id, "replacing actor");
    Ok(Json(catalog.update_actor(payload.id, payload.actor).await?))
}

/// delete_film
///
/// [Admin Route] Removes a film together with its actor associations.
#[utoipa::path(
    delete,
    path = "/filmlibrary/admin/film",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "No film with this id")
    )
)]
pub async fn delete_film(
    AuthUser { login, .. }: AuthUser,
    State(catalog): State<CatalogMutator>,
    AppJson(IdRequest { id }): AppJson<IdRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    tracing::debug!(admin = %login, film_id = id, "deleting film");
    catalog.delete_film(id).await?;
    Ok(Json(MessageResponse::new("deleted")))
}

/// delete_actor
#[utoipa::path(
    delete,
    path = "/filmlibrary/admin/actor",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "No actor with this id")
    )
)]
pub async fn delete_actor(
    AuthUser { login, .. }: AuthUser,
    State(catalog): State<CatalogMutator>,
    AppJson(IdRequest { id }): AppJson<IdRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    tracing::debug!(admin = %login, actor_id = id, "deleting actor");
    catalog.delete_actor(id).await?;
    Ok(Json(MessageResponse::new("deleted")))
}
