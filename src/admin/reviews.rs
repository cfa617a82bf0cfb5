use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, Response},
    routing::{get, post},
};
use maud::{Markup, html};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use super::{
    ListQuery, object_id,
    form::{Cleaner, Errors, FormData},
    widgets::{self, Column, Row, Sort},
};
use crate::{
    AppState,
    entities::{movie, review},
    error::{AppError, AppResult},
    models::has_parent_cycle,
};

const SLUG: &str = "reviews";
const COLUMNS: &[Column] = &[
    Column::new("name", "Name"),
    Column::new("email", "Email"),
    Column::new("parent", "Parent"),
    Column::new("movie", "Movie"),
    Column::new("id", "Id"),
];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/reviews/", get(list))
        .route("/admin/reviews/add/", get(add_form).post(create))
        .route("/admin/reviews/{id}/", get(edit_form).post(update))
        .route("/admin/reviews/{id}/delete/", post(delete))
}

/// Checks parent links of `movie_id`'s reviews once `changes` are applied.
/// Each change is `(review id, new parent)`; a `None` id is a review not
/// stored yet. Parents must be other reviews of the same movie and the
/// links must not loop.
pub(super) async fn parent_error<C: ConnectionTrait>(
    db: &C,
    movie_id: i32,
    changes: &[(Option<i32>, Option<i32>)],
) -> AppResult<Option<&'static str>> {
    let mut parents: HashMap<i32, Option<i32>> = review::Entity::find()
        .filter(review::Column::MovieId.eq(movie_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r.parent_id))
        .collect();

    for (id, parent) in changes {
        if let Some(id) = id {
            parents.insert(*id, *parent);
        }
    }

    for (id, parent) in changes {
        if let Some(parent) = parent {
            if Some(*parent) == *id || !parents.contains_key(parent) {
                return Ok(Some("Select a review of the same movie."));
            }
        }
    }

    if has_parent_cycle(&parents) {
        return Ok(Some("A review cannot reply to one of its own replies."));
    }
    Ok(None)
}

struct Choices {
    reviews: Vec<(i32, String)>,
    movies: Vec<(i32, String)>,
}

impl Choices {
    async fn load(state: &AppState) -> AppResult<Self> {
        let db = state.catalog.db();
        let reviews = review::Entity::find().order_by_asc(review::Column::Id).all(db).await?;
        let movies = movie::Entity::find().order_by_asc(movie::Column::Title).all(db).await?;
        Ok(Self {
            reviews: widgets::options(&reviews, |r| (r.id, label(r))),
            movies: widgets::options(&movies, |m| (m.id, m.title.clone())),
        })
    }
}

fn label(review: &review::Model) -> String {
    format!("{} - {}", review.name, review.movie_id)
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Html<String>> {
    let sort = Sort::parse(q.o.as_deref(), COLUMNS, "id");
    let column = match sort.key {
        "name" => review::Column::Name,
        "email" => review::Column::Email,
        "parent" => review::Column::ParentId,
        "movie" => review::Column::MovieId,
        _ => review::Column::Id,
    };
    let reviews = sort
        .apply(review::Entity::find(), column, review::Column::Id)
        .find_also_related(movie::Entity)
        .all(state.catalog.db())
        .await?;

    let rows: Vec<Row> = reviews
        .iter()
        .map(|(r, movie)| Row {
            id: r.id,
            cells: vec![
                html! { (r.name) },
                html! { (r.email) },
                html! { @if let Some(parent) = r.parent_id { (parent) } @else { "-" } },
                html! { @if let Some(movie) = movie { (movie.title) } },
                html! { (r.id) },
            ],
        })
        .collect();

    Ok(widgets::render(
        "Reviews",
        html! {
            (widgets::list_header(SLUG, "Reviews", rows.len()))
            (widgets::list_table(SLUG, COLUMNS, sort, "", &rows))
        },
    ))
}

fn form_body(
    data: &FormData,
    errors: &Errors,
    choices: &Choices,
    current: Option<&review::Model>,
) -> Markup {
    let action = match current {
        Some(r) => format!("/admin/{SLUG}/{}/", r.id),
        None => format!("/admin/{SLUG}/add/"),
    };
    let parents: Vec<(i32, String)> = choices
        .reviews
        .iter()
        .filter(|(id, _)| current.is_none_or(|r| r.id != *id))
        .cloned()
        .collect();

    html! {
        (widgets::form(&action, errors, html! {
            @match current {
                Some(r) => {
                    (widgets::readonly("Email", html! { (r.email) }))
                    (widgets::readonly("Name", html! { (r.name) }))
                }
                None => {
                    (widgets::email_input("Email", "email", data, errors))
                    (widgets::text_input("Name", "name", data, errors, 150))
                }
            }
            (widgets::textarea("Message", "text", data, errors))
            (widgets::select("Parent", "parent", &parents, true, data, errors))
            (widgets::select("Movie", "movie", &choices.movies, true, data, errors))
            (widgets::submit_row(false))
        }))
        @if let Some(r) = current {
            (widgets::delete_button(SLUG, r.id))
        }
    }
}

/// Cleans text, parent and movie. Name and email are only read on create.
async fn clean(
    state: &AppState,
    data: &FormData,
    current: Option<&review::Model>,
) -> AppResult<(review::ActiveModel, Errors)> {
    let mut c = Cleaner::new(data);
    let mut active: review::ActiveModel = Default::default();

    if current.is_none() {
        active.email = Set(c.email("email"));
        active.name = Set(c.string("name", 150));
    }
    active.text = Set(c.text("text", Some(5000)));
    let parent_id = c.choice("parent", false);
    let movie_id = c.choice("movie", true);

    if let Some(movie_id) = movie_id {
        let db = state.catalog.db();
        if movie::Entity::find_by_id(movie_id).one(db).await?.is_none() {
            c.error("movie", "Select a valid choice.");
        } else if let Some(message) =
            parent_error(db, movie_id, &[(current.map(|r| r.id), parent_id)]).await?
        {
            c.error("parent", message);
        }
    }

    active.parent_id = Set(parent_id);
    active.movie_id = Set(movie_id.unwrap_or_default());
    Ok((active, c.finish()))
}

async fn add_form(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let choices = Choices::load(&state).await?;
    Ok(widgets::render("Add review", form_body(&FormData::new(), &Errors::new(), &choices, None)))
}

async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let (active, errors) = clean(&state, &data, None).await?;
    if !errors.is_empty() {
        let choices = Choices::load(&state).await?;
        return Ok(widgets::invalid("Add review", form_body(&data, &errors, &choices, None)));
    }

    let saved = active.insert(state.catalog.db()).await?;
    tracing::info!(id = saved.id, movie_id = saved.movie_id, "review created");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn find(state: &AppState, raw: &str) -> AppResult<review::Model> {
    review::Entity::find_by_id(object_id(raw)?)
        .one(state.catalog.db())
        .await?
        .ok_or_else(|| AppError::not_found("review"))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let review = find(&state, &id).await?;
    let choices = Choices::load(&state).await?;

    let mut data = FormData::new();
    data.set("text", &review.text).set("movie", review.movie_id);
    if let Some(parent) = review.parent_id {
        data.set("parent", parent);
    }

    Ok(widgets::render("Change review", form_body(&data, &Errors::new(), &choices, Some(&review))))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let review = find(&state, &id).await?;
    let data = FormData::from_multipart(multipart).await?;

    let (mut active, errors) = clean(&state, &data, Some(&review)).await?;
    if !errors.is_empty() {
        let choices = Choices::load(&state).await?;
        return Ok(widgets::invalid(
            "Change review",
            form_body(&data, &errors, &choices, Some(&review)),
        ));
    }

    active.id = Unchanged(review.id);
    let saved = active.update(state.catalog.db()).await?;
    tracing::info!(id = saved.id, "review updated");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let review = find(&state, &id).await?;
    review::Entity::delete_by_id(review.id).exec(state.catalog.db()).await?;
    tracing::info!(id = review.id, "review deleted");
    Ok(widgets::redirect(&format!("/admin/{SLUG}/")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use tower::ServiceExt;

    use super::parent_error;
    use crate::{
        entities::review,
        test_support::{
            body_string, create_category, create_movie, create_review, multipart_post, test_state,
        },
    };

    #[tokio::test]
    async fn parent_links_stay_on_one_movie_without_loops() {
        let (state, db) = test_state().await;
        let cat = create_category(&db, "Feature", "feature").await;
        let heat = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        let alien = create_movie(&db, cat.id, "Alien", "alien", 1979, false).await;
        let root = create_review(&db, heat.id, "Neil", None).await;
        let reply = create_review(&db, heat.id, "Vincent", Some(root.id)).await;
        let other = create_review(&db, alien.id, "Ripley", None).await;
        let db = state.catalog.db();

        assert_eq!(parent_error(db, heat.id, &[(None, Some(root.id))]).await.unwrap(), None);
        assert_eq!(parent_error(db, heat.id, &[(Some(reply.id), None)]).await.unwrap(), None);
        assert!(parent_error(db, heat.id, &[(None, Some(other.id))]).await.unwrap().is_some());
        assert!(parent_error(db, heat.id, &[(Some(root.id), Some(root.id))]).await.unwrap().is_some());
        assert!(parent_error(db, heat.id, &[(Some(root.id), Some(reply.id))]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_stores_a_reply_from_the_console() {
        let (state, db) = test_state().await;
        let app = crate::router(state);
        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        let root = create_review(&db, movie.id, "Neil", None).await;
        let (movie_id, parent_id) = (movie.id.to_string(), root.id.to_string());

        let resp = app
            .oneshot(multipart_post(
                "/admin/reviews/add/",
                &[
                    ("name", "Vincent"),
                    ("email", "vincent@example.com"),
                    ("text", "Told you"),
                    ("parent", &parent_id),
                    ("movie", &movie_id),
                ],
                &[],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let replies = review::Entity::find()
            .filter(review::Column::ParentId.eq(root.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].name, "Vincent");
        assert_eq!(replies[0].email, "vincent@example.com");
        assert_eq!(replies[0].movie_id, movie.id);
    }

    #[tokio::test]
    async fn edit_keeps_name_and_email_read_only() {
        let (state, db) = test_state().await;
        let app = crate::router(state);
        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        let review = create_review(&db, movie.id, "Neil", None).await;
        let uri = format!("/admin/reviews/{}/", review.id);

        let req = Request::builder().uri(&uri).body(Body::empty()).unwrap();
        let html = body_string(app.clone().oneshot(req).await.unwrap()).await;
        assert!(html.contains("neil@example.com"));
        assert!(!html.contains(r#"name="email""#));
        assert!(!html.contains(r#"name="name""#));

        let movie_id = movie.id.to_string();
        let resp = app
            .oneshot(multipart_post(
                &uri,
                &[
                    ("name", "Changed"),
                    ("email", "changed@example.com"),
                    ("text", "Edited"),
                    ("movie", &movie_id),
                ],
                &[],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let stored = review::Entity::find_by_id(review.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.text, "Edited");
        assert_eq!(stored.name, "Neil");
        assert_eq!(stored.email, "neil@example.com");
    }

    #[tokio::test]
    async fn deleting_a_parent_orphans_its_replies() {
        let (state, db) = test_state().await;
        let app = crate::router(state);
        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        let root = create_review(&db, movie.id, "Neil", None).await;
        let reply = create_review(&db, movie.id, "Vincent", Some(root.id)).await;

        let resp = app
            .oneshot(multipart_post(&format!("/admin/reviews/{}/delete/", root.id), &[], &[]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let reply = review::Entity::find_by_id(reply.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reply.parent_id, None);
    }
}
