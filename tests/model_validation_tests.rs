use film_library::models::{
    Actor, ActorUpdate, FilmUpdate, FragmentQuery, IdRequest, Role, SearchTarget, SortKey,
    UserRequest,
};
use serde_json::json;

// --- Role ---

#[test]
fn test_role_travels_as_integer() {
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!(1));
    assert_eq!(serde_json::to_value(Role::Regular).unwrap(), json!(0));
    assert_eq!(serde_json::from_value::<Role>(json!(1)).unwrap(), Role::Admin);
    assert!(serde_json::from_value::<Role>(json!(2)).is_err());
    assert!(serde_json::from_value::<Role>(json!("admin")).is_err());
}

#[test]
fn test_user_request_role_defaults_to_regular() {
    let request: UserRequest =
        serde_json::from_value(json!({ "login": "johndoe", "password": "psjfb10" })).unwrap();
    assert_eq!(request.role, Role::Regular);
}

// --- Wire Names ---

#[test]
fn test_actor_uses_legacy_field_names() {
    let actor = Actor {
        id: 3,
        name: "Matthew".to_string(),
        surname: "McConaughey".to_string(),
        father_name: "David".to_string(),
        birth_date: "19691104".to_string(),
        sex: "m".to_string(),
    };
    let value = serde_json::to_value(&actor).unwrap();

    assert_eq!(value["fathername"], "David");
    assert_eq!(value["birthdate"], "19691104");
    assert!(value.get("father_name").is_none());
}

#[test]
fn test_update_bodies_are_flat() {
    let update: FilmUpdate = serde_json::from_value(json!({
        "id": 5,
        "name": "Solaris",
        "rating": 8.1,
        "actors": [1, 2]
    }))
    .unwrap();
    assert_eq!(update.id, 5);
    assert_eq!(update.film.name, "Solaris");
    assert_eq!(update.film.date, "");
    assert_eq!(update.film.actors, vec![1, 2]);

    let update: ActorUpdate = serde_json::from_value(json!({
        "id": 9,
        "name": "Donatas",
        "birthdate": "19240428"
    }))
    .unwrap();
    assert_eq!(update.actor.birth_date, "19240428");
    assert!(update.actor.films.is_empty());
}

#[test]
fn test_film_input_requires_a_name() {
    let missing = serde_json::from_value::<FilmUpdate>(json!({ "id": 1, "rating": 2.0 }));
    assert!(missing.is_err());
}

#[test]
fn test_id_request_ignores_extra_fields() {
    let request: IdRequest =
        serde_json::from_value(json!({ "id": 4, "name": "whatever", "rating": 1.0 })).unwrap();
    assert_eq!(request.id, 4);
}

// --- Query Selectors ---

#[test]
fn test_search_target_is_lowercase_and_closed() {
    let query: FragmentQuery =
        serde_json::from_value(json!({ "key": "actor", "fragment": "mc" })).unwrap();
    assert_eq!(query.key, SearchTarget::Actor);

    assert!(serde_json::from_value::<FragmentQuery>(json!({ "key": "Film", "fragment": "" })).is_err());
    assert!(
        serde_json::from_value::<FragmentQuery>(json!({ "key": "director", "fragment": "" })).is_err()
    );
}

#[test]
fn test_sort_key_parsing() {
    assert_eq!(SortKey::parse(""), Some(SortKey::Rating));
    assert_eq!(SortKey::parse("  \n"), Some(SortKey::Rating));
    assert_eq!(SortKey::parse("rating"), Some(SortKey::Rating));
    assert_eq!(SortKey::parse("name"), Some(SortKey::Name));
    assert_eq!(SortKey::parse("\"date\""), Some(SortKey::Date));
    assert_eq!(SortKey::parse("\"\""), Some(SortKey::Rating));
    assert_eq!(SortKey::parse("Name"), None);
    assert_eq!(SortKey::parse("popularity"), None);
}
