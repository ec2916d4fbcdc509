use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    extract::{FromRef, FromRequest, Request, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use film_library::{
    AppConfig, AppState, InMemoryRepository,
    auth::AuthUser,
    authenticator::Authenticator,
    catalog::CatalogMutator,
    error::{ApiError, StoreError},
    handlers::{self, AppJson, PlainText},
    models::{
        Actor, ActorInput, ActorWithFilms, Film, FilmInput, FilmUpdate, FragmentQuery, IdRequest,
        LoginRequest, Role, SearchTarget, SortKey, UserRequest,
    },
    query::QueryEngine,
    repository::{CatalogState, CatalogStore},
};
use serde_json::Value;
use std::sync::Arc;

// --- Failing Store ---

// Every catalog call fails, to check that store faults surface as 500s
// without leaking the underlying message.
struct BrokenCatalog;

#[async_trait]
impl CatalogStore for BrokenCatalog {
    async fn films_sorted(&self, _key: SortKey) -> Result<Vec<Film>, StoreError> {
        Err(StoreError::Timeout)
    }
    async fn films_by_name(&self, _fragment: &str) -> Result<Vec<Film>, StoreError> {
        Err(StoreError::Backend("connection reset by peer".to_string()))
    }
    async fn films_by_actor(&self, _fragment: &str) -> Result<Vec<Film>, StoreError> {
        Err(StoreError::Backend("connection reset by peer".to_string()))
    }
    async fn actors_with_films(&self) -> Result<Vec<ActorWithFilms>, StoreError> {
        Err(StoreError::Timeout)
    }
    async fn insert_film(&self, _film: FilmInput) -> Result<Film, StoreError> {
        Err(StoreError::Timeout)
    }
    async fn insert_actor(&self, _actor: ActorInput) -> Result<Actor, StoreError> {
        Err(StoreError::Timeout)
    }
    async fn replace_film(&self, _id: i32, _film: FilmInput) -> Result<Option<Film>, StoreError> {
        Err(StoreError::Timeout)
    }
    async fn replace_actor(
        &self,
        _id: i32,
        _actor: ActorInput,
    ) -> Result<Option<Actor>, StoreError> {
        Err(StoreError::Timeout)
    }
    async fn delete_film(&self, _id: i32) -> Result<bool, StoreError> {
        Err(StoreError::Timeout)
    }
    async fn delete_actor(&self, _id: i32) -> Result<bool, StoreError> {
        Err(StoreError::Timeout)
    }
}

// --- Test Utilities ---

fn memory_catalog() -> CatalogState {
    Arc::new(InMemoryRepository::new())
}

fn admin_user() -> AuthUser {
    AuthUser {
        login: "root".to_string(),
        role: Role::Admin,
    }
}

fn film(name: &str, date: &str, rating: f32) -> FilmInput {
    FilmInput {
        name: name.to_string(),
        description: format!("{name} description"),
        date: date.to_string(),
        rating,
        actors: vec![],
    }
}

async fn seed_films(catalog: &CatalogState) -> Vec<Film> {
    let mutator = CatalogMutator::new(catalog.clone());
    let mut created = Vec::new();
    for input in [
        film("Interstellar", "20141106", 8.9),
        film("Arrival", "20161110", 7.9),
        film("Solaris", "19720320", 8.9),
    ] {
        created.push(mutator.create_film(input).await.unwrap());
    }
    created
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn names(films: &[Film]) -> Vec<&str> {
    films.iter().map(|f| f.name.as_str()).collect()
}

// --- Sorted Listing ---

#[tokio::test]
async fn test_sorted_films_by_each_key() {
    let catalog = memory_catalog();
    seed_films(&catalog).await;
    let engine = || State(QueryEngine::new(catalog.clone()));

    // Rating descending; the 8.9 tie keeps id order.
    let by_rating = handlers::get_sorted_films(engine(), PlainText(String::new())).await.unwrap();
    assert_eq!(names(&by_rating.0), ["Interstellar", "Solaris", "Arrival"]);

    let by_name = handlers::get_sorted_films(engine(), PlainText("name".to_string())).await.unwrap();
    assert_eq!(names(&by_name.0), ["Arrival", "Interstellar", "Solaris"]);

    // The selector may arrive JSON-quoted.
    let by_date = handlers::get_sorted_films(engine(), PlainText("\"date\"\n".to_string()))
        .await
        .unwrap();
    assert_eq!(names(&by_date.0), ["Solaris", "Interstellar", "Arrival"]);
}

#[tokio::test]
async fn test_unknown_sort_key_is_a_validation_error() {
    let engine = State(QueryEngine::new(memory_catalog()));
    let err = handlers::get_sorted_films(engine, PlainText("popularity".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_catalog_lists_are_not_found() {
    let engine = State(QueryEngine::new(memory_catalog()));
    let err = handlers::get_sorted_films(engine, PlainText("rating".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    // The actor listing is the exception: empty is a plain empty list.
    let engine = State(QueryEngine::new(memory_catalog()));
    let actors = handlers::get_actors(engine).await.unwrap();
    assert!(actors.0.is_empty());
}

// --- Body Extractors ---

fn post_body(body: impl Into<Body>) -> Request {
    Request::builder()
        .method("POST")
        .uri("/filmlibrary/filmssorted")
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn test_plain_text_rejects_invalid_utf8_as_json_error() {
    let Err(err) = PlainText::from_request(post_body(vec![0xff_u8, 0xfe]), &()).await else {
        panic!("invalid UTF-8 must be rejected");
    };
    assert!(matches!(err, ApiError::Validation(_)));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let Ok(PlainText(text)) = PlainText::from_request(post_body("name"), &()).await else {
        panic!("UTF-8 body must be accepted");
    };
    assert_eq!(text, "name");
}

#[tokio::test]
async fn test_app_json_ignores_content_type() {
    // No Content-Type header at all.
    let Ok(AppJson(query)) =
        AppJson::<FragmentQuery>::from_request(post_body(r#"{"key":"film","fragment":"sol"}"#), &())
            .await
    else {
        panic!("JSON without a Content-Type must be accepted");
    };
    assert_eq!(query.key, SearchTarget::Film);
    assert_eq!(query.fragment, "sol");

    let Err(err) = AppJson::<FragmentQuery>::from_request(post_body("{\"key\": "), &()).await
    else {
        panic!("truncated JSON must be rejected");
    };
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

// --- Fragment Search ---

#[tokio::test]
async fn test_fragment_search_by_film_and_actor() {
    let catalog = memory_catalog();
    let films = seed_films(&catalog).await;
    let mutator = CatalogMutator::new(catalog.clone());
    mutator
        .create_actor(ActorInput {
            name: "Matthew".to_string(),
            surname: "McConaughey".to_string(),
            films: vec![films[0].id],
            ..ActorInput::default()
        })
        .await
        .unwrap();

    let engine = || State(QueryEngine::new(catalog.clone()));

    let by_film = handlers::get_films_by_fragment(
        engine(),
        AppJson(FragmentQuery {
            key: SearchTarget::Film,
            fragment: "SOLAR".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(names(&by_film.0), ["Solaris"]);

    let by_actor = handlers::get_films_by_fragment(
        engine(),
        AppJson(FragmentQuery {
            key: SearchTarget::Actor,
            fragment: "mcconau".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(names(&by_actor.0), ["Interstellar"]);

    let miss = handlers::get_films_by_fragment(
        engine(),
        AppJson(FragmentQuery {
            key: SearchTarget::Film,
            fragment: "zzz".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(miss.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fragment_wildcards_are_literal() {
    let catalog = memory_catalog();
    let mutator = CatalogMutator::new(catalog.clone());
    mutator.create_film(film("100% Love", "", 5.0)).await.unwrap();
    mutator.create_film(film("1000 Days", "", 5.0)).await.unwrap();

    let found = QueryEngine::new(catalog)
        .search_by_fragment(SearchTarget::Film, "0%")
        .await
        .unwrap();
    assert_eq!(names(&found), ["100% Love"]);
}

// --- Mutations ---

#[tokio::test]
async fn test_create_film_returns_created_record() {
    let catalog = memory_catalog();
    let response = handlers::create_film(
        admin_user(),
        State(CatalogMutator::new(catalog.clone())),
        AppJson(film("Interstellar", "20141106", 8.9)),
    )
    .await
    .unwrap()
    .into_response();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Interstellar");
    assert_eq!(body["date"], "20141106");
    assert!(body["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_create_film_validation() {
    let mutator = || State(CatalogMutator::new(memory_catalog()));

    for input in [
        film("", "20141106", 5.0),
        film("Bad date", "20141341", 5.0),
        film("Short date", "2014", 5.0),
        film("Too good", "", 10.5),
        film("Negative", "", -1.0),
        film("NaN", "", f32::NAN),
    ] {
        let name = input.name.clone();
        let err = handlers::create_film(admin_user(), mutator(), AppJson(input))
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "film '{name}'");
    }
}

#[tokio::test]
async fn test_create_film_with_unknown_actor_is_rejected() {
    let err = CatalogMutator::new(memory_catalog())
        .create_film(FilmInput {
            actors: vec![42],
            ..film("Lonely", "", 1.0)
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_update_film_replaces_fields_and_cast() {
    let catalog = memory_catalog();
    let films = seed_films(&catalog).await;
    let mutator = CatalogMutator::new(catalog.clone());
    let actor = mutator
        .create_actor(ActorInput {
            name: "Natalie".to_string(),
            films: vec![films[0].id],
            ..ActorInput::default()
        })
        .await
        .unwrap();

    let updated = handlers::update_film(
        admin_user(),
        State(mutator.clone()),
        AppJson(FilmUpdate {
            id: films[0].id,
            film: film("Interstellar (IMAX)", "20141107", 9.1),
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.0.name, "Interstellar (IMAX)");
    assert_eq!(updated.0.id, films[0].id);

    // The empty actor list replaced the old association.
    let actors = QueryEngine::new(catalog).list_actors().await.unwrap();
    let natalie = actors.iter().find(|a| a.id == actor.id).unwrap();
    assert!(natalie.films.is_empty());
}

#[tokio::test]
async fn test_update_missing_film_is_not_found() {
    let err = handlers::update_film(
        admin_user(),
        State(CatalogMutator::new(memory_catalog())),
        AppJson(FilmUpdate {
            id: 999,
            film: film("Ghost", "", 1.0),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_film_cascades_to_actor_listing() {
    let catalog = memory_catalog();
    let films = seed_films(&catalog).await;
    let mutator = CatalogMutator::new(catalog.clone());
    mutator
        .create_actor(ActorInput {
            name: "Donatas".to_string(),
            surname: "Banionis".to_string(),
            films: vec![films[0].id, films[2].id],
            ..ActorInput::default()
        })
        .await
        .unwrap();

    let response = handlers::delete_film(
        admin_user(),
        State(mutator.clone()),
        AppJson(IdRequest { id: films[2].id }),
    )
    .await
    .unwrap();
    assert_eq!(response.0.message, "deleted");

    let actors = QueryEngine::new(catalog).list_actors().await.unwrap();
    let film_ids: Vec<i32> = actors[0].films.iter().map(|f| f.id).collect();
    assert_eq!(film_ids, [films[0].id]);

    let again = handlers::delete_film(
        admin_user(),
        State(mutator),
        AppJson(IdRequest { id: films[2].id }),
    )
    .await
    .unwrap_err();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_actor_removes_it_from_actor_search() {
    let catalog = memory_catalog();
    let films = seed_films(&catalog).await;
    let mutator = CatalogMutator::new(catalog.clone());
    let actor = mutator
        .create_actor(ActorInput {
            name: "Amy".to_string(),
            surname: "Adams".to_string(),
            films: vec![films[1].id],
            ..ActorInput::default()
        })
        .await
        .unwrap();

    mutator.delete_actor(actor.id).await.unwrap();

    let err = QueryEngine::new(catalog)
        .search_by_fragment(SearchTarget::Actor, "adams")
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// --- Store Failures ---

#[tokio::test]
async fn test_store_failure_is_an_opaque_500() {
    let broken: CatalogState = Arc::new(BrokenCatalog);

    let err = handlers::get_films_by_fragment(
        State(QueryEngine::new(broken.clone())),
        AppJson(FragmentQuery {
            key: SearchTarget::Film,
            fragment: "x".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Store(_)));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "internal server error");

    let err = CatalogMutator::new(broken)
        .delete_film(1)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- Login / Registration Handlers ---

#[tokio::test]
async fn test_register_and_login_handlers() {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState::new(repo.clone(), repo, AppConfig::default());
    let auth = || State(Authenticator::from_ref(&state));

    let request = UserRequest {
        login: "johndoe".to_string(),
        password: "psjfb10".to_string(),
        role: Role::Regular,
    };

    let response = handlers::register_user(auth(), AppJson(request.clone()))
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["message"], "created");

    let login = LoginRequest {
        login: request.login,
        password: request.password,
    };
    let response = handlers::login(auth(), AppJson(login))
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let token = response
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let claims = state.tokens.verify(&token).unwrap();
    assert_eq!(claims.login, "johndoe");
    assert_eq!(claims.role, Role::Regular);
}
