use std::sync::Arc;

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, Response},
    routing::{get, post},
};
use maud::{Markup, html};
use sea_orm::{ActiveModelTrait, ActiveValue::Unchanged, EntityTrait, QueryOrder, Set};

use super::{
    ListQuery, object_id,
    form::{Cleaner, Errors, FormData},
    widgets::{self, Column, Row, Sort},
};
use crate::{
    AppState,
    entities::{movie, movie_short},
    error::{AppError, AppResult},
    media,
};

const SLUG: &str = "shorts";
const COLUMNS: &[Column] =
    &[Column::new("title", "Title"), Column::new("movie", "Movie"), Column::fixed("image", "Image")];
pub const THUMB: (u32, Option<u32>) = (200, Some(100));

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/shorts/", get(list))
        .route("/admin/shorts/add/", get(add_form).post(create))
        .route("/admin/shorts/{id}/", get(edit_form).post(update))
        .route("/admin/shorts/{id}/delete/", post(delete))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Html<String>> {
    let sort = Sort::parse(q.o.as_deref(), COLUMNS, "title");
    let column = match sort.key {
        "movie" => movie_short::Column::MovieId,
        _ => movie_short::Column::Title,
    };
    let shorts = sort
        .apply(movie_short::Entity::find(), column, movie_short::Column::Id)
        .find_also_related(movie::Entity)
        .all(state.catalog.db())
        .await?;

    let rows: Vec<Row> = shorts
        .iter()
        .map(|(short, movie)| Row {
            id: short.id,
            cells: vec![
                html! { (short.title) },
                html! { @if let Some(movie) = movie { (movie.title) } },
                widgets::thumbnail(&short.image, THUMB.0, THUMB.1),
            ],
        })
        .collect();

    Ok(widgets::render(
        "Movie shorts",
        html! {
            (widgets::list_header(SLUG, "Movie shorts", rows.len()))
            (widgets::list_table(SLUG, COLUMNS, sort, "", &rows))
        },
    ))
}

async fn movie_options(state: &AppState) -> AppResult<Vec<(i32, String)>> {
    let movies =
        movie::Entity::find().order_by_asc(movie::Column::Title).all(state.catalog.db()).await?;
    Ok(widgets::options(&movies, |m| (m.id, m.title.clone())))
}

fn form_body(
    data: &FormData,
    errors: &Errors,
    movies: &[(i32, String)],
    current: Option<&movie_short::Model>,
) -> Markup {
    let action = match current {
        Some(short) => format!("/admin/{SLUG}/{}/", short.id),
        None => format!("/admin/{SLUG}/add/"),
    };
    html! {
        (widgets::form(&action, errors, html! {
            (widgets::text_input("Title", "title", data, errors, 150))
            (widgets::textarea("Description", "description", data, errors))
            (widgets::file_input("Image", "image", current.map(|s| s.image.as_str()), THUMB, errors))
            (widgets::select("Movie", "movie", movies, true, data, errors))
            (widgets::submit_row(false))
        }))
        @if let Some(short) = current {
            (widgets::delete_button(SLUG, short.id))
        }
    }
}

async fn clean(
    state: &AppState,
    data: &FormData,
    image_required: bool,
) -> AppResult<(movie_short::ActiveModel, Errors)> {
    let mut c = Cleaner::new(data);
    let title = c.string("title", 150);
    let description = c.text("description", None);
    if image_required && data.file("image").is_none() {
        c.error("image", "This field is required.");
    }
    let movie_id = c.choice("movie", true);
    if let Some(id) = movie_id {
        if movie::Entity::find_by_id(id).one(state.catalog.db()).await?.is_none() {
            c.error("movie", "Select a valid choice.");
        }
    }

    let active = movie_short::ActiveModel {
        title: Set(title),
        description: Set(description),
        movie_id: Set(movie_id.unwrap_or_default()),
        ..Default::default()
    };
    Ok((active, c.finish()))
}

async fn add_form(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let movies = movie_options(&state).await?;
    Ok(widgets::render("Add movie short", form_body(&FormData::new(), &Errors::new(), &movies, None)))
}

async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let (mut active, errors) = clean(&state, &data, true).await?;
    if !errors.is_empty() {
        let movies = movie_options(&state).await?;
        return Ok(widgets::invalid("Add movie short", form_body(&data, &errors, &movies, None)));
    }

    if let Some(upload) = data.file("image") {
        active.image = Set(state.media.save(media::SHORTS, &upload.file_name, &upload.bytes).await?);
    }
    let saved = active.insert(state.catalog.db()).await?;
    tracing::info!(id = saved.id, movie_id = saved.movie_id, "movie short created");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn find(state: &AppState, raw: &str) -> AppResult<movie_short::Model> {
    movie_short::Entity::find_by_id(object_id(raw)?)
        .one(state.catalog.db())
        .await?
        .ok_or_else(|| AppError::not_found("movie short"))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let short = find(&state, &id).await?;
    let movies = movie_options(&state).await?;

    let mut data = FormData::new();
    data.set("title", &short.title)
        .set("description", &short.description)
        .set("movie", short.movie_id);

    Ok(widgets::render(
        "Change movie short",
        form_body(&data, &Errors::new(), &movies, Some(&short)),
    ))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let short = find(&state, &id).await?;
    let data = FormData::from_multipart(multipart).await?;

    let (mut active, errors) = clean(&state, &data, false).await?;
    if !errors.is_empty() {
        let movies = movie_options(&state).await?;
        return Ok(widgets::invalid(
            "Change movie short",
            form_body(&data, &errors, &movies, Some(&short)),
        ));
    }

    active.id = Unchanged(short.id);
    if let Some(upload) = data.file("image") {
        active.image = Set(state.media.save(media::SHORTS, &upload.file_name, &upload.bytes).await?);
    }
    let saved = active.update(state.catalog.db()).await?;
    tracing::info!(id = saved.id, "movie short updated");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let short = find(&state, &id).await?;
    movie_short::Entity::delete_by_id(short.id).exec(state.catalog.db()).await?;
    tracing::info!(id = short.id, "movie short deleted");
    Ok(widgets::redirect(&format!("/admin/{SLUG}/")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sea_orm::EntityTrait;
    use tower::ServiceExt;

    use crate::{
        entities::movie_short,
        test_support::{body_string, create_category, create_movie, multipart_post, test_state_with_media},
    };

    #[tokio::test]
    async fn creates_a_short_with_thumbnail_in_the_list() {
        let (state, db, media) = test_state_with_media().await;
        let app = crate::router(state);
        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        let movie_id = movie.id.to_string();

        let resp = app
            .clone()
            .oneshot(multipart_post(
                "/admin/shorts/add/",
                &[("title", "Diner"), ("description", "Scene"), ("movie", "9999")],
                &[("image", "diner.png", b"png".as_slice())],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .clone()
            .oneshot(multipart_post(
                "/admin/shorts/add/",
                &[("title", "Diner"), ("description", "Scene"), ("movie", &movie_id)],
                &[("image", "diner.png", b"png".as_slice())],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let short = movie_short::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(short.movie_id, movie.id);
        assert_eq!(short.image, "movie_shorts/diner.png");
        assert_eq!(std::fs::read(media.path().join(&short.image)).unwrap(), b"png");

        let req = Request::builder().uri("/admin/shorts/").body(Body::empty()).unwrap();
        let html = body_string(app.oneshot(req).await.unwrap()).await;
        assert!(html.contains(r#"src="/media/movie_shorts/diner.png" width="200" height="100""#));
        assert!(html.contains("Heat"));
    }
}
