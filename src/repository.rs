use crate::{
    error::StoreError,
    models::{Actor, ActorInput, ActorWithFilms, Film, FilmInput, FilmRef, Role, SortKey, User},
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::{collections::HashMap, sync::Arc};

/// CredentialStore
///
/// Persistence contract for user credentials. Consulted only by the
/// authenticator. The unique index on `login` is the real integrity guarantee
/// for registration: an insert that violates it fails with
/// `StoreError::UniqueViolation`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user(&self, login: &str) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;
}

/// CatalogStore
///
/// Persistence contract for films, actors and their association. Reads return
/// whatever the store holds at call time; ordering and matching rules are
/// part of the contract so every implementation answers identically.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- Reads ---
    // All films in the requested order (see `SortKey` for tie-breaks).
    async fn films_sorted(&self, key: SortKey) -> Result<Vec<Film>, StoreError>;
    // Films whose name contains `fragment`, case-insensitively, ordered by id.
    async fn films_by_name(&self, fragment: &str) -> Result<Vec<Film>, StoreError>;
    // Distinct films featuring an actor whose name or surname contains `fragment`.
    async fn films_by_actor(&self, fragment: &str) -> Result<Vec<Film>, StoreError>;
    // Every actor ordered by id, each with its films ordered by id.
    async fn actors_with_films(&self) -> Result<Vec<ActorWithFilms>, StoreError>;

    // --- Writes ---
    // Referencing an unknown actor/film id fails with `StoreError::MissingReference`.
    async fn insert_film(&self, film: FilmInput) -> Result<Film, StoreError>;
    async fn insert_actor(&self, actor: ActorInput) -> Result<Actor, StoreError>;
    // Full replace, associations included. `None` when the id does not exist.
    async fn replace_film(&self, id: i32, film: FilmInput) -> Result<Option<Film>, StoreError>;
    async fn replace_actor(&self, id: i32, actor: ActorInput) -> Result<Option<Actor>, StoreError>;
    // Deletes the record and every association row referencing it. `false` when absent.
    async fn delete_film(&self, id: i32) -> Result<bool, StoreError>;
    async fn delete_actor(&self, id: i32) -> Result<bool, StoreError>;
}

/// CredentialState
pub type CredentialState = Arc<dyn CredentialStore>;

/// CatalogState
pub type CatalogState = Arc<dyn CatalogStore>;

/// PostgresRepository
///
/// Implements both stores on one connection pool. Single-statement writes rely
/// on Postgres atomicity; writes touching the association table run in a
/// transaction.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILM_COLUMNS: &str = "f.id, f.name, f.description, f.release_date, f.rating";

/// Escapes LIKE metacharacters and wraps the fragment for a substring match.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Inserts `(film_id, actor_id)` association rows inside `tx`.
async fn link(
    tx: &mut Transaction<'_, Postgres>,
    pairs: impl Iterator<Item = (i32, i32)>,
) -> Result<(), StoreError> {
    for (film_id, actor_id) in pairs {
        sqlx::query(
            "INSERT INTO film_actors (film_id, actor_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(film_id)
        .bind(actor_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl CredentialStore for PostgresRepository {
    async fn find_user(&self, login: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT login, password_hash, role FROM users WHERE login = $1")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: i32 = row.try_get("role")?;

        Ok(Some(User {
            login: row.try_get("login")?,
            password_hash: row.try_get("password_hash")?,
            role: Role::try_from(role).map_err(StoreError::Corrupt)?,
        }))
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (login, password_hash, role) VALUES ($1, $2, $3)")
            .bind(&user.login)
            .bind(&user.password_hash)
            .bind(i32::from(user.role))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresRepository {
    /// films_sorted
    ///
    /// Names compare under the "C" collation so the order is byte-wise and
    /// does not depend on the database locale.
    async fn films_sorted(&self, key: SortKey) -> Result<Vec<Film>, StoreError> {
        let order = match key {
            SortKey::Rating => "f.rating DESC, f.id ASC",
            SortKey::Name => "f.name COLLATE \"C\" ASC, f.id ASC",
            SortKey::Date => "f.release_date COLLATE \"C\" ASC, f.id ASC",
        };
        let query = format!("SELECT {FILM_COLUMNS} FROM films f ORDER BY {order}");

        Ok(sqlx::query_as::<_, Film>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn films_by_name(&self, fragment: &str) -> Result<Vec<Film>, StoreError> {
        let query = format!("SELECT {FILM_COLUMNS} FROM films f WHERE f.name ILIKE $1 ORDER BY f.id");

        Ok(sqlx::query_as::<_, Film>(&query)
            .bind(like_pattern(fragment))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn films_by_actor(&self, fragment: &str) -> Result<Vec<Film>, StoreError> {
        let query = format!(
            r#"
            SELECT DISTINCT {FILM_COLUMNS}
            FROM films f
            JOIN film_actors fa ON fa.film_id = f.id
            JOIN actors a ON a.id = fa.actor_id
            WHERE a.name ILIKE $1 OR a.surname ILIKE $1
            ORDER BY f.id
            "#
        );

        Ok(sqlx::query_as::<_, Film>(&query)
            .bind(like_pattern(fragment))
            .fetch_all(&self.pool)
            .await?)
    }

    /// actors_with_films
    ///
    /// Two queries (actors, then every association joined to its film name)
    /// folded together in memory, which keeps actors without films in the
    /// result.
    async fn actors_with_films(&self) -> Result<Vec<ActorWithFilms>, StoreError> {
        let actors = sqlx::query_as::<_, Actor>(
            "SELECT id, name, surname, father_name, birth_date, sex FROM actors ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let links = sqlx::query(
            r#"
            SELECT fa.actor_id, f.id, f.name
            FROM film_actors fa
            JOIN films f ON f.id = fa.film_id
            ORDER BY fa.actor_id, f.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut films_by_actor: HashMap<i32, Vec<FilmRef>> = HashMap::new();
        for row in links {
            let actor_id: i32 = row.try_get("actor_id")?;
            films_by_actor.entry(actor_id).or_default().push(FilmRef {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            });
        }

        Ok(actors
            .into_iter()
            .map(|actor| {
                let films = films_by_actor.remove(&actor.id).unwrap_or_default();
                ActorWithFilms::new(actor, films)
            })
            .collect())
    }

    async fn insert_film(&self, film: FilmInput) -> Result<Film, StoreError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Film>(
            r#"
            INSERT INTO films (name, description, release_date, rating)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, release_date, rating
            "#,
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(&film.date)
        .bind(film.rating)
        .fetch_one(&mut *tx)
        .await?;

        link(&mut tx, film.actors.iter().map(|&actor_id| (created.id, actor_id))).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn insert_actor(&self, actor: ActorInput) -> Result<Actor, StoreError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Actor>(
            r#"
            INSERT INTO actors (name, surname, father_name, birth_date, sex)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, surname, father_name, birth_date, sex
            "#,
        )
        .bind(&actor.name)
        .bind(&actor.surname)
        .bind(&actor.father_name)
        .bind(&actor.birth_date)
        .bind(&actor.sex)
        .fetch_one(&mut *tx)
        .await?;

        link(&mut tx, actor.films.iter().map(|&film_id| (film_id, created.id))).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn replace_film(&self, id: i32, film: FilmInput) -> Result<Option<Film>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Film>(
            r#"
            UPDATE films
            SET name = $2, description = $3, release_date = $4, rating = $5
            WHERE id = $1
            RETURNING id, name, description, release_date, rating
            "#,
        )
        .bind(id)
        .bind(&film.name)
        .bind(&film.description)
        .bind(&film.date)
        .bind(film.rating)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM film_actors WHERE film_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link(&mut tx, film.actors.iter().map(|&actor_id| (id, actor_id))).await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn replace_actor(&self, id: i32, actor: ActorInput) -> Result<Option<Actor>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Actor>(
            r#"
            UPDATE actors
            SET name = $2, surname = $3, father_name = $4, birth_date = $5, sex = $6
            WHERE id = $1
            RETURNING id, name, surname, father_name, birth_date, sex
            "#,
        )
        .bind(id)
        .bind(&actor.name)
        .bind(&actor.surname)
        .bind(&actor.father_name)
        .bind(&actor.birth_date)
        .bind(&actor.sex)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM film_actors WHERE actor_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link(&mut tx, actor.films.iter().map(|&film_id| (film_id, id))).await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// delete_film
    ///
    /// Association rows go with the film through `ON DELETE CASCADE`.
    async fn delete_film(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM films WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_actor(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM actors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
