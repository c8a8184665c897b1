//! End-to-end queries over a movie catalogue and a user profile.

use pretty_assertions::assert_eq;
use serde::Serialize;
use serde_json::json;
use varql::prelude::*;

fn state() -> serde_json::Value {
    json!({
        "movies": [
            {"title": "Movie 1", "status": "active", "rating": 4.5, "tags": ["action", "drama"], "released": "2023-10-15"},
            {"title": "Movie 2", "status": "canceled", "rating": 3.8, "tags": ["comedy"], "released": "2022-03-01"},
            {"title": "Movie 3", "status": "active", "rating": 4.2, "tags": ["drama"], "released": "2021-07-30"},
        ],
        "user": {
            "profile": {"firstname": "John", "lastname": "Doe"}
        }
    })
}

fn ctx() -> Context {
    Context::builder().source("state", state()).build()
}

fn titles(value: &Value) -> Vec<String> {
    value
        .as_list()
        .unwrap()
        .iter()
        .map(|row| row.as_record().unwrap().field("title").unwrap().to_text())
        .collect()
}

#[test]
fn all_movies() {
    let result = ctx().query("FROM state.movies").unwrap();
    assert_eq!(titles(&result), vec!["Movie 1", "Movie 2", "Movie 3"]);
}

#[test]
fn filter_by_status() {
    let result = ctx().query("FROM state.movies WHERE status == active").unwrap();
    assert_eq!(titles(&result), vec!["Movie 1", "Movie 3"]);
}

#[test]
fn filter_by_status_and_rating() {
    let result = ctx()
        .query("FROM state.movies WHERE status == active AND rating > 4.0")
        .unwrap();
    assert_eq!(titles(&result), vec!["Movie 1", "Movie 3"]);
}

#[test]
fn filter_by_tag() {
    let result = ctx().query("FROM state.movies WHERE tags CONTAINS drama").unwrap();
    assert_eq!(titles(&result), vec!["Movie 1", "Movie 3"]);

    let result = ctx()
        .query("FROM state.movies WHERE tags NOT_CONTAINS drama")
        .unwrap();
    assert_eq!(titles(&result), vec!["Movie 2"]);
}

#[test]
fn concatenate_names() {
    let result = ctx()
        .query("FROM state.user.profile.firstname + state.user.profile.lastname")
        .unwrap();
    assert_eq!(result, Value::from("John Doe"));
}

#[test]
fn string_against_number_is_false() {
    let result = ctx().query("FROM state.movies WHERE title > 3").unwrap();
    assert_eq!(result, Value::List(vec![]));
}

#[test]
fn timestamps_compare_chronologically() {
    let result = ctx()
        .query("FROM state.movies WHERE released >= 2022-01-01")
        .unwrap();
    assert_eq!(titles(&result), vec!["Movie 1", "Movie 2"]);
}

#[test]
fn or_folds_left_to_right() {
    let result = ctx()
        .query("FROM state.movies WHERE status == canceled OR rating > 4.4")
        .unwrap();
    assert_eq!(titles(&result), vec!["Movie 1", "Movie 2"]);
}

#[test]
fn projection_keys_are_field_paths() {
    let result = ctx()
        .query("SELECT title, rating FROM state.movies WHERE rating < 4.0")
        .unwrap();
    assert_eq!(result.to_json(), json!([{"title": "Movie 2", "rating": 3.8}]));
}

#[test]
fn repeated_evaluation_is_stable() {
    let ctx = ctx();
    let expr = ctx
        .compile("SELECT title FROM state.movies WHERE tags CONTAINS DRAMA")
        .unwrap();
    let first = expr.evaluate(&ctx).unwrap();
    let second = expr.evaluate(&ctx).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_list().unwrap().len(), 2);
}

#[test]
fn unknown_source_is_reported_at_compile_time() {
    assert!(matches!(
        ctx().compile("FROM films.all"),
        Err(VarqlError::UnknownSource(name)) if name == "films"
    ));
}

#[derive(Serialize)]
struct Movie {
    title: &'static str,
    year: i64,
}

#[test]
fn serializable_sources() {
    let movies = vec![
        Movie { title: "Alien", year: 1979 },
        Movie { title: "Heat", year: 1995 },
    ];
    let ctx = Context::builder()
        .source("catalogue", Value::from_serialize(&movies).unwrap())
        .build();
    let result = ctx.query("SELECT title FROM catalogue WHERE year > 1990").unwrap();
    assert_eq!(result.to_json(), json!([{"title": "Heat"}]));
}

#[test]
fn structured_records() {
    let people = Value::List(vec![
        Record::new("Person").with("name", "Ada").with("born", 1815).into(),
        Record::new("Person").with("name", "Grace").with("born", 1906).into(),
    ]);
    let ctx = Context::builder().source("people", people).build();
    let result = ctx.query("FROM people WHERE born < 1900").unwrap();
    assert_eq!(result.to_text(), "[Person(name='Ada', born=1815)]");
}

#[test]
fn query_set_and_template() {
    let set = QuerySet::parse([
        "FROM state.user.profile.firstname",
        "SELECT title FROM state.movies WHERE rating > 4.4",
    ])
    .unwrap();
    let values = set.evaluate(&ctx()).unwrap();
    assert_eq!(values["FROM state.user.profile.firstname"], Value::from("John"));

    let template = Template::parse(
        "Hello {FROM state.user.profile.firstname}! Tonight: {SELECT title FROM state.movies WHERE rating > 4.4}",
    )
    .unwrap();
    assert_eq!(
        template.render(&ctx()).unwrap(),
        "Hello John! Tonight: [{'title': 'Movie 1'}]"
    );
}
