use std::sync::Arc;

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, Response},
    routing::{get, post},
};
use maud::{Markup, html};
use sea_orm::{ActiveModelTrait, ActiveValue::Unchanged, EntityTrait, Set};

use super::{
    ListQuery, object_id,
    form::{Cleaner, Errors, FormData},
    widgets::{self, Column, Row, Sort},
};
use crate::{
    AppState,
    entities::actor,
    error::{AppError, AppResult},
    media,
};

const SLUG: &str = "actors";
const COLUMNS: &[Column] =
    &[Column::new("name", "Name"), Column::new("age", "Age"), Column::fixed("image", "Image")];
const THUMB: (u32, Option<u32>) = (50, Some(60));

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/actors/", get(list))
        .route("/admin/actors/add/", get(add_form).post(create))
        .route("/admin/actors/{id}/", get(edit_form).post(update))
        .route("/admin/actors/{id}/delete/", post(delete))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Html<String>> {
    let sort = Sort::parse(q.o.as_deref(), COLUMNS, "name");
    let column = match sort.key {
        "age" => actor::Column::Age,
        _ => actor::Column::Name,
    };
    let actors = sort
        .apply(actor::Entity::find(), column, actor::Column::Id)
        .all(state.catalog.db())
        .await?;

    let rows: Vec<Row> = actors
        .iter()
        .map(|a| Row {
            id: a.id,
            cells: vec![
                html! { (a.name) },
                html! { (a.age) },
                widgets::thumbnail(&a.image, THUMB.0, THUMB.1),
            ],
        })
        .collect();

    Ok(widgets::render(
        "Actors and directors",
        html! {
            (widgets::list_header(SLUG, "Actors and directors", rows.len()))
            (widgets::list_table(SLUG, COLUMNS, sort, "", &rows))
        },
    ))
}

fn form_body(data: &FormData, errors: &Errors, current: Option<&actor::Model>) -> Markup {
    let action = match current {
        Some(actor) => format!("/admin/{SLUG}/{}/", actor.id),
        None => format!("/admin/{SLUG}/add/"),
    };
    html! {
        (widgets::form(&action, errors, html! {
            (widgets::text_input("Name", "name", data, errors, 150))
            (widgets::number_input("Age", "age", data, errors))
            (widgets::textarea("Description", "description", data, errors))
            (widgets::file_input("Image", "image", current.map(|a| a.image.as_str()), THUMB, errors))
            (widgets::submit_row(false))
        }))
        @if let Some(actor) = current {
            (widgets::delete_button(SLUG, actor.id))
        }
    }
}

/// Cleans the text fields. The image is handled by the caller since it is
/// only required on create.
fn clean(data: &FormData, image_required: bool) -> (actor::ActiveModel, Errors) {
    let mut c = Cleaner::new(data);
    let name = c.string("name", 150);
    let age = c.small("age");
    let description = c.text("description", None);
    if image_required && data.file("image").is_none() {
        c.error("image", "This field is required.");
    }

    let active = actor::ActiveModel {
        name: Set(name),
        age: Set(age),
        description: Set(description),
        ..Default::default()
    };
    (active, c.finish())
}

async fn store_image(state: &AppState, data: &FormData, active: &mut actor::ActiveModel) -> AppResult<()> {
    if let Some(upload) = data.file("image") {
        let path = state.media.save(media::ACTORS, &upload.file_name, &upload.bytes).await?;
        active.image = Set(path);
    }
    Ok(())
}

async fn add_form() -> Html<String> {
    let mut data = FormData::new();
    data.set("age", 0);
    widgets::render("Add actor", form_body(&data, &Errors::new(), None))
}

async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let (mut active, errors) = clean(&data, true);
    if !errors.is_empty() {
        return Ok(widgets::invalid("Add actor", form_body(&data, &errors, None)));
    }

    store_image(&state, &data, &mut active).await?;
    let saved = active.insert(state.catalog.db()).await?;
    tracing::info!(id = saved.id, name = %saved.name, "actor created");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn find(state: &AppState, raw: &str) -> AppResult<actor::Model> {
    actor::Entity::find_by_id(object_id(raw)?)
        .one(state.catalog.db())
        .await?
        .ok_or_else(|| AppError::not_found("actor"))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let actor = find(&state, &id).await?;

    let mut data = FormData::new();
    data.set("name", &actor.name).set("age", actor.age).set("description", &actor.description);

    Ok(widgets::render("Change actor", form_body(&data, &Errors::new(), Some(&actor))))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let actor = find(&state, &id).await?;
    let data = FormData::from_multipart(multipart).await?;

    let (mut active, errors) = clean(&data, false);
    if !errors.is_empty() {
        return Ok(widgets::invalid("Change actor", form_body(&data, &errors, Some(&actor))));
    }

    active.id = Unchanged(actor.id);
    store_image(&state, &data, &mut active).await?;
    let saved = active.update(state.catalog.db()).await?;
    tracing::info!(id = saved.id, "actor updated");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let actor = find(&state, &id).await?;
    actor::Entity::delete_by_id(actor.id).exec(state.catalog.db()).await?;
    tracing::info!(id = actor.id, "actor deleted");
    Ok(widgets::redirect(&format!("/admin/{SLUG}/")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sea_orm::{EntityTrait, PaginatorTrait};
    use tower::ServiceExt;

    use crate::{
        entities::actor,
        test_support::{body_string, create_actor, multipart_post, test_state, test_state_with_media},
    };

    #[tokio::test]
    async fn create_requires_and_stores_an_image() {
        let (state, db, media) = test_state_with_media().await;
        let app = crate::router(state);
        let fields = [("name", "Al Pacino"), ("age", "84"), ("description", "Actor")];

        let resp = app
            .clone()
            .oneshot(multipart_post("/admin/actors/add/", &fields, &[]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("This field is required."));

        let resp = app
            .oneshot(multipart_post(
                "/admin/actors/add/",
                &fields,
                &[("image", "al pacino.jpg", b"jpeg".as_slice())],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let stored = actor::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(stored.image, "actors/al_pacino.jpg");
        assert_eq!(std::fs::read(media.path().join(&stored.image)).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn edit_without_upload_keeps_the_image() {
        let (state, db) = test_state().await;
        let app = crate::router(state);
        let actor = create_actor(&db, "Robert De Niro").await;

        let resp = app
            .clone()
            .oneshot(multipart_post(
                &format!("/admin/actors/{}/", actor.id),
                &[("name", "Robert De Niro"), ("age", "80"), ("description", "Actor")],
                &[],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let stored = actor::Entity::find_by_id(actor.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.age, 80);
        assert_eq!(stored.image, actor.image);

        let req = Request::builder().uri("/admin/actors/").body(Body::empty()).unwrap();
        let html = body_string(app.oneshot(req).await.unwrap()).await;
        assert!(html.contains(r#"src="/media/actors/face.jpg" width="50" height="60""#));
        assert_eq!(actor::Entity::find().count(&db).await.unwrap(), 1);
    }
}
