use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    models::{Actor, ActorInput, ActorWithFilms, Film, FilmInput, FilmRef, SortKey, User},
    repository::{CatalogStore, CredentialStore},
};

/// InMemoryRepository
///
/// A process-local implementation of both stores. Used when the service runs
/// locally without `DATABASE_URL`, and by the test suite. It enforces the same
/// rules as the Postgres schema: unique logins, association rows must point at
/// existing records, deletes cascade to associations.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<HashMap<String, User>>,
    catalog: RwLock<Catalog>,
}

#[derive(Default)]
struct Catalog {
    next_film_id: i32,
    next_actor_id: i32,
    films: BTreeMap<i32, Film>,
    actors: BTreeMap<i32, Actor>,
    // (film_id, actor_id)
    links: BTreeSet<(i32, i32)>,
}

impl Catalog {
    fn check_actors(&self, ids: &[i32]) -> Result<(), StoreError> {
        match ids.iter().find(|id| !self.actors.contains_key(*id)) {
            Some(id) => Err(StoreError::MissingReference(format!("actor {id}"))),
            None => Ok(()),
        }
    }

    fn check_films(&self, ids: &[i32]) -> Result<(), StoreError> {
        match ids.iter().find(|id| !self.films.contains_key(*id)) {
            Some(id) => Err(StoreError::MissingReference(format!("film {id}"))),
            None => Ok(()),
        }
    }

    fn films_where(&self, mut keep: impl FnMut(&Film) -> bool) -> Vec<Film> {
        self.films.values().filter(|f| keep(*f)).cloned().collect()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryRepository {
    async fn find_user(&self, login: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(login).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.login) {
            return Err(StoreError::UniqueViolation(format!("users.login = {}", user.login)));
        }
        users.insert(user.login.clone(), user);
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryRepository {
    async fn films_sorted(&self, key: SortKey) -> Result<Vec<Film>, StoreError> {
        // BTreeMap iteration is by id, and sort_by is stable, so ties keep id order.
        let mut films = self.catalog.read().await.films_where(|_| true);
        match key {
            SortKey::Rating => films.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
            SortKey::Name => films.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::Date => films.sort_by(|a, b| a.date.cmp(&b.date)),
        }
        Ok(films)
    }

    async fn films_by_name(&self, fragment: &str) -> Result<Vec<Film>, StoreError> {
        Ok(self
            .catalog
            .read()
            .await
            .films_where(|f| contains_ignore_case(&f.name, fragment)))
    }

    async fn films_by_actor(&self, fragment: &str) -> Result<Vec<Film>, StoreError> {
        let catalog = self.catalog.read().await;
        let matching_actors: BTreeSet<i32> = catalog
            .actors
            .values()
            .filter(|a| {
                contains_ignore_case(&a.name, fragment) || contains_ignore_case(&a.surname, fragment)
            })
            .map(|a| a.id)
            .collect();

        let film_ids: BTreeSet<i32> = catalog
            .links
            .iter()
            .filter(|(_, actor_id)| matching_actors.contains(actor_id))
            .map(|&(film_id, _)| film_id)
            .collect();

        Ok(catalog.films_where(|f| film_ids.contains(&f.id)))
    }

    async fn actors_with_films(&self) -> Result<Vec<ActorWithFilms>, StoreError> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .actors
            .values()
            .map(|actor| {
                let films = catalog
                    .links
                    .iter()
                    .filter(|&&(_, actor_id)| actor_id == actor.id)
                    .filter_map(|(film_id, _)| catalog.films.get(film_id))
                    .map(|f| FilmRef {
                        id: f.id,
                        name: f.name.clone(),
                    })
                    .collect();
                ActorWithFilms::new(actor.clone(), films)
            })
            .collect())
    }

    async fn insert_film(&self, film: FilmInput) -> Result<Film, StoreError> {
        let mut catalog = self.catalog.write().await;
        catalog.check_actors(&film.actors)?;

        catalog.next_film_id += 1;
        let id = catalog.next_film_id;
        let created = Film {
            id,
            name: film.name,
            description: film.description,
            date: film.date,
            rating: film.rating,
        };
        catalog.films.insert(id, created.clone());
        catalog.links.extend(film.actors.iter().map(|&actor_id| (id, actor_id)));
        Ok(created)
    }

    async fn insert_actor(&self, actor: ActorInput) -> Result<Actor, StoreError> {
        let mut catalog = self.catalog.write().await;
        catalog.check_films(&actor.films)?;

        catalog.next_actor_id += 1;
        let id = catalog.next_actor_id;
        let created = Actor {
            id,
            name: actor.name,
            surname: actor.surname,
            father_name: actor.father_name,
            birth_date: actor.birth_date,
            sex: actor.sex,
        };
        catalog.actors.insert(id, created.clone());
        catalog.links.extend(actor.films.iter().map(|&film_id| (film_id, id)));
        Ok(created)
    }

    async fn replace_film(&self, id: i32, film: FilmInput) -> Result<Option<Film>, StoreError> {
        let mut catalog = self.catalog.write().await;
        if !catalog.films.contains_key(&id) {
            return Ok(None);
        }
        catalog.check_actors(&film.actors)?;

        let updated = Film {
            id,
            name: film.name,
            description: film.description,
            date: film.date,
            rating: film.rating,
        };
        catalog.films.insert(id, updated.clone());
        catalog.links.retain(|&(film_id, _)| film_id != id);
        catalog.links.extend(film.actors.iter().map(|&actor_id| (id, actor_id)));
        Ok(Some(updated))
    }

    async fn replace_actor(&self, id: i32, actor: ActorInput) -> Result<Option<Actor>, StoreError> {
        let mut catalog = self.catalog.write().await;
        if !catalog.actors.contains_key(&id) {
            return Ok(None);
        }
        catalog.check_films(&actor.films)?;

        let updated = Actor {
            id,
            name: actor.name,
            surname: actor.surname,
            father_name: actor.father_name,
            birth_date: actor.birth_date,
            sex: actor.sex,
        };
        catalog.actors.insert(id, updated.clone());
        catalog.links.retain(|&(_, actor_id)| actor_id != id);
        catalog.links.extend(actor.films.iter().map(|&film_id| (film_id, id)));
        Ok(Some(updated))
    }

    async fn delete_film(&self, id: i32) -> Result<bool, StoreError> {
        let mut catalog = self.catalog.write().await;
        if catalog.films.remove(&id).is_none() {
            return Ok(false);
        }
        catalog.links.retain(|&(film_id, _)| film_id != id);
        Ok(true)
    }

    async fn delete_actor(&self, id: i32) -> Result<bool, StoreError> {
        let mut catalog = self.catalog.write().await;
        if catalog.actors.remove(&id).is_none() {
            return Ok(false);
        }
        catalog.links.retain(|&(_, actor_id)| actor_id != id);
        Ok(true)
    }
}
