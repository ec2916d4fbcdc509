use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Identity ---

/// Role
///
/// Access tier of a user. Travels over the wire (and inside tokens) as the
/// integers 0 and 1; any other value fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Role {
    #[default]
    Regular,
    Admin,
}

impl TryFrom<i32> for Role {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Regular),
            1 => Ok(Role::Admin),
            other => Err(format!("unknown role {other}, expected 0 (regular) or 1 (admin)")),
        }
    }
}

impl From<Role> for i32 {
    fn from(role: Role) -> i32 {
        match role {
            Role::Regular => 0,
            Role::Admin => 1,
        }
    }
}

/// User
///
/// A credential record as held by the credential store. `password_hash` is an
/// Argon2 PHC string; the plaintext never reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub login: String,
    pub password_hash: String,
    pub role: Role,
}

/// LoginRequest
///
/// Body of `POST /login`. Any other field, a `role` included, is ignored:
/// the token always carries the role stored at registration.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[schema(example = "johndoe")]
    pub login: String,
    #[schema(example = "psjfb10")]
    pub password: String,
}

/// UserRequest
///
/// Body of `POST /registration`. An absent role registers a regular user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserRequest {
    #[schema(example = "johndoe")]
    pub login: String,
    #[schema(example = "psjfb10")]
    pub password: String,
    #[serde(default)]
    #[ts(type = "number")]
    #[schema(value_type = i32, example = 1)]
    pub role: Role,
}

// --- Catalog ---

/// Film
///
/// Release dates are kept as `YYYYMMDD` strings, so byte order is
/// chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Film {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "Interstellar")]
    pub name: String,
    pub description: String,
    #[sqlx(rename = "release_date")]
    #[schema(example = "20141106")]
    pub date: String,
    #[schema(example = 8.9)]
    pub rating: f32,
}

/// Actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Actor {
    pub id: i32,
    #[schema(example = "Matthew")]
    pub name: String,
    #[schema(example = "McConaughey")]
    pub surname: String,
    #[serde(rename = "fathername")]
    pub father_name: String,
    #[serde(rename = "birthdate")]
    #[schema(example = "19691104")]
    pub birth_date: String,
    #[schema(example = "m")]
    pub sex: String,
}

/// FilmRef
///
/// The `{id, name}` pair embedded in an actor listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct FilmRef {
    pub id: i32,
    pub name: String,
}

/// ActorWithFilms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActorWithFilms {
    pub id: i32,
    pub name: String,
    pub surname: String,
    #[serde(rename = "fathername")]
    pub father_name: String,
    #[serde(rename = "birthdate")]
    pub birth_date: String,
    pub sex: String,
    pub films: Vec<FilmRef>,
}

impl ActorWithFilms {
    pub fn new(actor: Actor, films: Vec<FilmRef>) -> Self {
        Self {
            id: actor.id,
            name: actor.name,
            surname: actor.surname,
            father_name: actor.father_name,
            birth_date: actor.birth_date,
            sex: actor.sex,
            films,
        }
    }
}

// --- Request Payloads ---

/// FilmInput
///
/// Create/replace payload for a film. `actors` lists the ids of the actors
/// starring in it; on update the list replaces the existing associations.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FilmInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub actors: Vec<i32>,
}

/// FilmUpdate
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FilmUpdate {
    pub id: i32,
    #[serde(flatten)]
    pub film: FilmInput,
}

/// ActorInput
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ActorInput {
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default, rename = "fathername")]
    pub father_name: String,
    #[serde(default, rename = "birthdate")]
    pub birth_date: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub films: Vec<i32>,
}

/// ActorUpdate
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ActorUpdate {
    pub id: i32,
    #[serde(flatten)]
    pub actor: ActorInput,
}

/// IdRequest
///
/// Body of the delete endpoints. Extra fields (a whole film or actor, as older
/// clients send) are ignored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct IdRequest {
    pub id: i32,
}

/// SearchTarget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SearchTarget {
    Film,
    Actor,
}

/// FragmentQuery
///
/// Body of `POST /filmspiece`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FragmentQuery {
    pub key: SearchTarget,
    #[schema(example = "inter")]
    pub fragment: String,
}

/// SortKey
///
/// Ordering requested through the raw body of `POST /filmssorted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Rating descending, ties by id.
    #[default]
    Rating,
    /// Name ascending (byte-wise), ties by id.
    Name,
    /// Release date ascending, ties by id.
    Date,
}

impl SortKey {
    /// Parses the raw selector. Surrounding whitespace and JSON quotes are
    /// tolerated; an empty selector means the default.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed)
            .trim();
        match unquoted {
            "" | "rating" => Some(SortKey::Rating),
            "name" => Some(SortKey::Name),
            "date" => Some(SortKey::Date),
            _ => None,
        }
    }
}

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
