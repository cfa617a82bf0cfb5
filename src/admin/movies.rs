//! Movie screens: the filterable list with inline draft flags, and the edit
//! form with its reviews and clips inline.

use std::{collections::HashSet, sync::Arc};

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, Response},
    routing::{get, post},
};
use maud::{Markup, html};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Unchanged},
    ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LikeExpr},
};
use serde::Deserialize;

use super::{
    object_id,
    form::{Cleaner, Errors, FormData},
    reviews::parent_error,
    shorts,
    widgets::{self, Column, Row, Sort},
};
use crate::{
    AppState,
    catalog::contains_pattern,
    entities::{
        actor, category, genre, movie, movie_actor, movie_director, movie_genre, movie_short, review,
    },
    error::{AppError, AppResult},
    media,
};

const SLUG: &str = "movies";
const COLUMNS: &[Column] = &[
    Column::new("title", "Title"),
    Column::new("category", "Category"),
    Column::new("url", "Url"),
    Column::new("draft", "Draft"),
];
const POSTER_WIDTH: u32 = 100;
const DEFAULT_YEAR: i32 = 2023;
const REQUIRED: &str = "This field is required.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/movies/", get(list).post(save_drafts))
        .route("/admin/movies/add/", get(add_form).post(create))
        .route("/admin/movies/{id}/", get(edit_form).post(update))
        .route("/admin/movies/{id}/delete/", post(delete))
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieListQuery {
    o: Option<String>,
    category: Option<String>,
    year: Option<String>,
    q: Option<String>,
}

impl MovieListQuery {
    fn category_id(&self) -> Option<i32> {
        self.category.as_deref().and_then(|c| c.trim().parse().ok())
    }

    fn year(&self) -> Option<i32> {
        self.year.as_deref().and_then(|y| y.trim().parse().ok())
    }

    fn term(&self) -> &str {
        self.q.as_deref().unwrap_or_default().trim()
    }

    /// Active filters as a query string, empty or ending in `&`.
    fn filters(&self) -> String {
        [("category", &self.category), ("year", &self.year), ("q", &self.q)]
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value.as_deref()?.trim();
                (!value.is_empty()).then(|| format!("{key}={}&", urlencoding::encode(value)))
            })
            .collect()
    }

    /// Link to this list with `key` replaced by `value`.
    fn with(&self, key: &str, value: Option<String>) -> String {
        let mut next = self.clone();
        match key {
            "category" => next.category = value,
            "year" => next.year = value,
            _ => next.q = value,
        }
        format!("?{}", next.filters())
    }
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MovieListQuery>,
) -> AppResult<Html<String>> {
    let db = state.catalog.db();
    let sort = Sort::parse(q.o.as_deref(), COLUMNS, "title");
    let column = match sort.key {
        "category" => movie::Column::CategoryId,
        "url" => movie::Column::Url,
        "draft" => movie::Column::Draft,
        _ => movie::Column::Title,
    };

    let mut select = sort
        .apply(movie::Entity::find(), column, movie::Column::Id)
        .find_also_related(category::Entity);
    if let Some(id) = q.category_id() {
        select = select.filter(movie::Column::CategoryId.eq(id));
    }
    if let Some(year) = q.year() {
        select = select.filter(movie::Column::Year.eq(year));
    }
    if !q.term().is_empty() {
        let pattern = contains_pattern(q.term());
        select = select.filter(
            Condition::any()
                .add(
                    Expr::col((movie::Entity, movie::Column::Title))
                        .like(LikeExpr::new(pattern.as_str()).escape('\\')),
                )
                .add(
                    Expr::col((category::Entity, category::Column::Name))
                        .like(LikeExpr::new(pattern.as_str()).escape('\\')),
                ),
        );
    }
    let movies = select.all(db).await?;

    let categories = category::Entity::find().order_by_asc(category::Column::Name).all(db).await?;
    let years: Vec<i32> = movie::Entity::find()
        .select_only()
        .column(movie::Column::Year)
        .distinct()
        .order_by_desc(movie::Column::Year)
        .into_tuple()
        .all(db)
        .await?;

    let rows: Vec<Row> = movies
        .iter()
        .map(|(m, category)| Row {
            id: m.id,
            cells: vec![
                html! { (m.title) },
                html! { @if let Some(category) = category { (category.name) } },
                html! { (m.url) },
                html! {
                    input type="hidden" name="ids" value=(m.id);
                    input type="checkbox" name=(format!("draft-{}", m.id)) checked[m.draft];
                },
            ],
        })
        .collect();

    Ok(widgets::render(
        "Movies",
        html! {
            div class="grid gap-6 md:grid-cols-4" {
                div class="md:col-span-3" {
                    form method="get" action="/admin/movies/" class="mb-4 flex gap-2" {
                        input class="flex-1 rounded-md border border-gray-300 px-3 py-2 text-sm" type="search" name="q" value=(q.term()) placeholder="Title or category";
                        @if let Some(category) = &q.category {
                            input type="hidden" name="category" value=(category);
                        }
                        @if let Some(year) = &q.year {
                            input type="hidden" name="year" value=(year);
                        }
                        button class="rounded-md border border-gray-300 bg-white px-4 py-2 text-sm" type="submit" { "Search" }
                    }
                    (widgets::list_header(SLUG, "Movies", rows.len()))
                    form method="post" action="/admin/movies/" enctype="multipart/form-data" {
                        (widgets::list_table(SLUG, COLUMNS, sort, &q.filters(), &rows))
                        @if !rows.is_empty() {
                            button class="mt-4 rounded-md bg-blue-600 px-4 py-2 text-sm font-semibold text-white hover:bg-blue-700" type="submit" { "Save" }
                        }
                    }
                }
                aside class="bg-white shadow rounded-lg p-4 text-sm space-y-4" {
                    div {
                        h3 class="font-semibold text-gray-700" { "By category" }
                        ul class="mt-2 space-y-1" {
                            li { a class="text-blue-600" href=(q.with("category", None)) { "All" } }
                            @for category in &categories {
                                li { a class="text-blue-600" href=(q.with("category", Some(category.id.to_string()))) { (category.name) } }
                            }
                        }
                    }
                    div {
                        h3 class="font-semibold text-gray-700" { "By year" }
                        ul class="mt-2 space-y-1" {
                            li { a class="text-blue-600" href=(q.with("year", None)) { "All" } }
                            @for year in &years {
                                li { a class="text-blue-600" href=(q.with("year", Some(year.to_string()))) { (year) } }
                            }
                        }
                    }
                }
            }
        },
    ))
}

/// Saves the draft column of the list. Each listed row posts its id in
/// `ids` and is a draft only if `draft-<id>` is checked.
async fn save_drafts(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let ids = data.ids("ids");

    let txn = state.catalog.db().begin().await?;
    let mut changed = 0u32;
    for movie in movie::Entity::find().filter(movie::Column::Id.is_in(ids)).all(&txn).await? {
        let draft = data.checked(&format!("draft-{}", movie.id));
        if movie.draft != draft {
            let mut active: movie::ActiveModel = movie.into();
            active.draft = Set(draft);
            active.update(&txn).await?;
            changed += 1;
        }
    }
    txn.commit().await?;

    tracing::info!(changed, "movie draft flags saved");
    Ok(widgets::redirect("/admin/movies/"))
}

struct Choices {
    categories: Vec<(i32, String)>,
    people: Vec<(i32, String)>,
    genres: Vec<(i32, String)>,
}

impl Choices {
    async fn load(state: &AppState) -> AppResult<Self> {
        let db = state.catalog.db();
        let categories =
            category::Entity::find().order_by_asc(category::Column::Name).all(db).await?;
        let people = actor::Entity::find().order_by_asc(actor::Column::Name).all(db).await?;
        let genres = genre::Entity::find().order_by_asc(genre::Column::Name).all(db).await?;
        Ok(Self {
            categories: widgets::options(&categories, |c| (c.id, c.name.clone())),
            people: widgets::options(&people, |a| (a.id, a.name.clone())),
            genres: widgets::options(&genres, |g| (g.id, g.name.clone())),
        })
    }
}

fn known(options: &[(i32, String)], id: i32) -> bool {
    options.iter().any(|(i, _)| *i == id)
}

/// Rows edited inline on a movie's screen.
#[derive(Default)]
struct Inline {
    reviews: Vec<review::Model>,
    shorts: Vec<movie_short::Model>,
}

impl Inline {
    async fn load(state: &AppState, movie_id: i32) -> AppResult<Self> {
        let db = state.catalog.db();
        let reviews = review::Entity::find()
            .filter(review::Column::MovieId.eq(movie_id))
            .order_by_asc(review::Column::Id)
            .all(db)
            .await?;
        let shorts = movie_short::Entity::find()
            .filter(movie_short::Column::MovieId.eq(movie_id))
            .order_by_asc(movie_short::Column::Id)
            .all(db)
            .await?;
        Ok(Self { reviews, shorts })
    }
}

fn form_body(
    data: &FormData,
    errors: &Errors,
    choices: &Choices,
    current: Option<&movie::Model>,
    inline: &Inline,
) -> Markup {
    let action = match current {
        Some(movie) => format!("/admin/{SLUG}/{}/", movie.id),
        None => format!("/admin/{SLUG}/add/"),
    };
    let editing = current.is_some();

    html! {
        (widgets::form(&action, errors, html! {
            (widgets::submit_row(editing))
            (widgets::fieldset("Movie", html! {
                div class="grid gap-4 sm:grid-cols-2" {
                    (widgets::text_input("Title", "title", data, errors, 150))
                    (widgets::text_input("Subtitle", "subtitle", data, errors, 150))
                }
                (widgets::rich_text("Description", "description", data, errors))
                (widgets::file_input("Poster", "poster", current.map(|m| m.poster.as_str()), (POSTER_WIDTH, None), errors))
            }))
            (widgets::fieldset("Release", html! {
                div class="grid gap-4 sm:grid-cols-3" {
                    (widgets::number_input("Year", "year", data, errors))
                    (widgets::date_input("World premiere", "world_premiere", data, errors))
                    (widgets::text_input("Country", "country", data, errors, 150))
                }
            }))
            (widgets::fieldset("Actors", html! {
                div class="grid gap-4 sm:grid-cols-2" {
                    (widgets::multi_select("Actors", "actors", &choices.people, data, errors))
                    (widgets::multi_select("Directors", "directors", &choices.people, data, errors))
                    (widgets::multi_select("Genres", "genres", &choices.genres, data, errors))
                    (widgets::select("Category", "category", &choices.categories, true, data, errors))
                }
            }))
            (widgets::fieldset("Box office", html! {
                div class="grid gap-4 sm:grid-cols-3" {
                    (widgets::number_input("Budget", "budget", data, errors))
                    (widgets::number_input("Fees in USA", "fees_in_usa", data, errors))
                    (widgets::number_input("Fees in world", "fees_in_world", data, errors))
                }
            }))
            (widgets::fieldset("Options", html! {
                div class="grid gap-4 sm:grid-cols-2" {
                    (widgets::text_input("Url", "url", data, errors, 150))
                    (widgets::checkbox("Draft", "draft", data, errors))
                }
            }))
            @if editing {
                (review_rows(data, errors, inline))
            }
            (short_rows(data, errors, inline))
            (widgets::submit_row(editing))
        }))
        @if let Some(movie) = current {
            div class="flex items-center gap-4" {
                (widgets::delete_button(SLUG, movie.id))
                a class="mt-4 text-sm text-blue-600 hover:text-blue-800" href=(movie.absolute_url()) { "View on site" }
            }
        }
    }
}

fn review_rows(data: &FormData, errors: &Errors, inline: &Inline) -> Markup {
    let parents: Vec<(i32, String)> =
        inline.reviews.iter().map(|r| (r.id, format!("{} (#{})", r.name, r.id))).collect();

    widgets::fieldset(
        "Reviews",
        html! {
            @if let Some(message) = errors.get("reviews") {
                p class="mb-4 text-sm text-red-600" { (message) }
            }
            @if inline.reviews.is_empty() {
                p class="text-sm text-gray-500" { "No reviews yet." }
            }
            @for r in &inline.reviews {
                @let prefix = format!("review-{}-", r.id);
                @let others: Vec<(i32, String)> = parents.iter().filter(|(id, _)| *id != r.id).cloned().collect();
                div class="border-b border-gray-200 py-4" {
                    input type="hidden" name="review_ids" value=(r.id);
                    div class="grid gap-4 sm:grid-cols-2" {
                        (widgets::readonly("Name", html! { (r.name) }))
                        (widgets::readonly("Email", html! { (r.email) }))
                    }
                    (widgets::textarea("Message", &format!("{prefix}text"), data, errors))
                    (widgets::select("Parent", &format!("{prefix}parent"), &others, true, data, errors))
                    (widgets::checkbox("Delete", &format!("{prefix}delete"), data, errors))
                }
            }
        },
    )
}

fn short_rows(data: &FormData, errors: &Errors, inline: &Inline) -> Markup {
    widgets::fieldset(
        "Movie shorts",
        html! {
            @for s in &inline.shorts {
                @let prefix = format!("short-{}-", s.id);
                div class="border-b border-gray-200 py-4" {
                    input type="hidden" name="short_ids" value=(s.id);
                    (widgets::text_input("Title", &format!("{prefix}title"), data, errors, 150))
                    (widgets::textarea("Description", &format!("{prefix}description"), data, errors))
                    (widgets::file_input("Image", &format!("{prefix}image"), Some(s.image.as_str()), shorts::THUMB, errors))
                    (widgets::checkbox("Delete", &format!("{prefix}delete"), data, errors))
                }
            }
            div class="py-4" {
                h3 class="mb-2 text-sm font-semibold text-gray-700" { "Add another movie short" }
                (widgets::text_input("Title", "short-new-title", data, errors, 150))
                (widgets::textarea("Description", "short-new-description", data, errors))
                (widgets::file_input("Image", "short-new-image", None, shorts::THUMB, errors))
            }
        },
    )
}

struct ReviewEdit {
    id: i32,
    delete: bool,
    text: String,
    parent_id: Option<i32>,
}

struct ShortEdit {
    /// `None` for the blank row.
    id: Option<i32>,
    delete: bool,
    title: String,
    description: String,
    upload: String,
    image: Option<String>,
}

/// A cleaned movie form with its associations and inline rows.
struct Submission {
    movie: movie::ActiveModel,
    actors: Vec<i32>,
    directors: Vec<i32>,
    genres: Vec<i32>,
    reviews: Vec<ReviewEdit>,
    shorts: Vec<ShortEdit>,
}

/// Cleans the whole screen. `copy` marks a save-as-new submission: the url
/// must be free of every existing row and inline reviews are left behind.
async fn clean(
    state: &AppState,
    data: &FormData,
    choices: &Choices,
    current: Option<&movie::Model>,
    inline: &Inline,
    copy: bool,
) -> AppResult<(Submission, Errors)> {
    let db = state.catalog.db();
    let mut c = Cleaner::new(data);

    let title = c.string("title", 150);
    let subtitle = c.optional_string("subtitle", 150);
    let description = c.text("description", None);
    let year = c.small("year");
    let country = c.string("country", 150);
    let world_premiere = c.date("world_premiere");
    let budget = c.non_negative("budget");
    let fees_in_usa = c.non_negative("fees_in_usa");
    let fees_in_world = c.non_negative("fees_in_world");
    let url = c.slug("url", 150);
    let draft = c.checkbox("draft");

    let category_id = c.choice("category", true);
    if category_id.is_some_and(|id| !known(&choices.categories, id)) {
        c.error("category", "Select a valid choice.");
    }

    let actors = c.choices("actors");
    let directors = c.choices("directors");
    let genres = c.choices("genres");
    for (name, ids, options) in [
        ("actors", &actors, &choices.people),
        ("directors", &directors, &choices.people),
        ("genres", &genres, &choices.genres),
    ] {
        if let Some(id) = ids.iter().find(|id| !known(options, **id)) {
            c.error(name, format!("Select a valid choice. {id} is not one of the available choices."));
        }
    }

    let has_poster = data.file("poster").is_some() || current.is_some_and(|m| !m.poster.is_empty());
    if !has_poster {
        c.error("poster", REQUIRED);
    }

    if !url.is_empty() {
        let mut taken = movie::Entity::find().filter(movie::Column::Url.eq(url.as_str()));
        if let Some(movie) = current.filter(|_| !copy) {
            taken = taken.filter(movie::Column::Id.ne(movie.id));
        }
        if taken.count(db).await? > 0 {
            c.error("url", "Movie with this Url already exists.");
        }
    }

    let mut movie = movie::ActiveModel {
        title: Set(title),
        subtitle: Set(subtitle),
        description: Set(description),
        year: Set(year),
        country: Set(country),
        world_premiere: Set(world_premiere),
        budget: Set(budget),
        fees_in_usa: Set(fees_in_usa),
        fees_in_world: Set(fees_in_world),
        category_id: Set(category_id.unwrap_or_default()),
        url: Set(url),
        draft: Set(draft),
        ..Default::default()
    };
    if let Some(current) = current.filter(|_| copy) {
        movie.poster = Set(current.poster.clone());
    }

    let mut errors = c.finish();

    let mut reviews = Vec::new();
    if let Some(current) = current.filter(|_| !copy) {
        let own: HashSet<i32> = inline.reviews.iter().map(|r| r.id).collect();
        for id in data.ids("review_ids").into_iter().filter(|id| own.contains(id)) {
            let mut rc = Cleaner::with_prefix(data, format!("review-{id}-"));
            let edit = if rc.checkbox("delete") {
                ReviewEdit { id, delete: true, text: String::new(), parent_id: None }
            } else {
                let text = rc.text("text", Some(5000));
                let parent_id = rc.choice("parent", false);
                ReviewEdit { id, delete: false, text, parent_id }
            };
            errors.extend(rc.finish());
            reviews.push(edit);
        }

        let changes: Vec<(Option<i32>, Option<i32>)> =
            reviews.iter().filter(|r| !r.delete).map(|r| (Some(r.id), r.parent_id)).collect();
        if let Some(message) = parent_error(db, current.id, &changes).await? {
            errors.insert("reviews".to_string(), message.to_string());
        }
    }

    let mut shorts = Vec::new();
    let own: HashSet<i32> = inline.shorts.iter().map(|s| s.id).collect();
    for id in data.ids("short_ids").into_iter().filter(|id| own.contains(id)) {
        let prefix = format!("short-{id}-");
        let mut sc = Cleaner::with_prefix(data, prefix.as_str());
        let image = inline.shorts.iter().find(|s| s.id == id).map(|s| s.image.clone());
        let edit = if sc.checkbox("delete") {
            ShortEdit {
                id: Some(id),
                delete: true,
                title: String::new(),
                description: String::new(),
                upload: String::new(),
                image,
            }
        } else {
            ShortEdit {
                id: Some(id),
                delete: false,
                title: sc.string("title", 150),
                description: sc.text("description", None),
                upload: format!("{prefix}image"),
                image,
            }
        };
        errors.extend(sc.finish());
        shorts.push(edit);
    }

    let blank_row_used = !data.text("short-new-title").trim().is_empty()
        || !data.text("short-new-description").trim().is_empty()
        || data.file("short-new-image").is_some();
    if blank_row_used {
        let mut sc = Cleaner::with_prefix(data, "short-new-");
        let title = sc.string("title", 150);
        let description = sc.text("description", None);
        if data.file("short-new-image").is_none() {
            sc.error("image", REQUIRED);
        }
        errors.extend(sc.finish());
        shorts.push(ShortEdit {
            id: None,
            delete: false,
            title,
            description,
            upload: "short-new-image".to_string(),
            image: None,
        });
    }

    Ok((Submission { movie, actors, directors, genres, reviews, shorts }, errors))
}

/// Stores uploads, then writes the movie, its associations and inline rows
/// in one transaction. `target` is the row to update; `None` inserts, and
/// kept clips are then copied onto the new row.
async fn persist(
    state: &AppState,
    data: &FormData,
    mut sub: Submission,
    target: Option<i32>,
) -> AppResult<movie::Model> {
    if let Some(upload) = data.file("poster") {
        sub.movie.poster =
            Set(state.media.save(media::POSTERS, &upload.file_name, &upload.bytes).await?);
    }
    for short in sub.shorts.iter_mut().filter(|s| !s.delete) {
        if let Some(upload) = data.file(&short.upload) {
            short.image =
                Some(state.media.save(media::SHORTS, &upload.file_name, &upload.bytes).await?);
        }
    }

    let txn = state.catalog.db().begin().await?;

    let saved = match target {
        Some(id) => {
            sub.movie.id = Unchanged(id);
            sub.movie.update(&txn).await?
        }
        None => sub.movie.insert(&txn).await?,
    };

    replace_links(&txn, saved.id, &sub.actors, &sub.directors, &sub.genres).await?;

    for edit in &sub.reviews {
        if edit.delete {
            review::Entity::delete_by_id(edit.id).exec(&txn).await?;
        } else {
            review::ActiveModel {
                id: Unchanged(edit.id),
                text: Set(edit.text.clone()),
                parent_id: Set(edit.parent_id),
                ..Default::default()
            }
            .update(&txn)
            .await?;
        }
    }

    let copying = target.is_none();
    for edit in &sub.shorts {
        match edit.id {
            Some(id) if edit.delete => {
                if !copying {
                    movie_short::Entity::delete_by_id(id).exec(&txn).await?;
                }
            }
            Some(id) if !copying => {
                movie_short::ActiveModel {
                    id: Unchanged(id),
                    title: Set(edit.title.clone()),
                    description: Set(edit.description.clone()),
                    image: edit.image.clone().map(Set).unwrap_or(NotSet),
                    movie_id: Unchanged(saved.id),
                }
                .update(&txn)
                .await?;
            }
            _ => {
                movie_short::ActiveModel {
                    title: Set(edit.title.clone()),
                    description: Set(edit.description.clone()),
                    image: Set(edit.image.clone().unwrap_or_default()),
                    movie_id: Set(saved.id),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    txn.commit().await?;
    Ok(saved)
}

async fn replace_links(
    txn: &DatabaseTransaction,
    movie_id: i32,
    actors: &[i32],
    directors: &[i32],
    genres: &[i32],
) -> Result<(), DbErr> {
    movie_actor::Entity::delete_many()
        .filter(movie_actor::Column::MovieId.eq(movie_id))
        .exec(txn)
        .await?;
    if !actors.is_empty() {
        movie_actor::Entity::insert_many(actors.iter().map(|&actor_id| movie_actor::ActiveModel {
            movie_id: Set(movie_id),
            actor_id: Set(actor_id),
        }))
        .exec_without_returning(txn)
        .await?;
    }

    movie_director::Entity::delete_many()
        .filter(movie_director::Column::MovieId.eq(movie_id))
        .exec(txn)
        .await?;
    if !directors.is_empty() {
        movie_director::Entity::insert_many(directors.iter().map(|&actor_id| {
            movie_director::ActiveModel { movie_id: Set(movie_id), actor_id: Set(actor_id) }
        }))
        .exec_without_returning(txn)
        .await?;
    }

    movie_genre::Entity::delete_many()
        .filter(movie_genre::Column::MovieId.eq(movie_id))
        .exec(txn)
        .await?;
    if !genres.is_empty() {
        movie_genre::Entity::insert_many(genres.iter().map(|&genre_id| movie_genre::ActiveModel {
            movie_id: Set(movie_id),
            genre_id: Set(genre_id),
        }))
        .exec_without_returning(txn)
        .await?;
    }

    Ok(())
}

async fn linked_ids<C: ConnectionTrait>(db: &C, movie_id: i32) -> AppResult<[Vec<i32>; 3]> {
    let actors: Vec<i32> = movie_actor::Entity::find()
        .filter(movie_actor::Column::MovieId.eq(movie_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.actor_id)
        .collect();
    let directors: Vec<i32> = movie_director::Entity::find()
        .filter(movie_director::Column::MovieId.eq(movie_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.actor_id)
        .collect();
    let genres: Vec<i32> = movie_genre::Entity::find()
        .filter(movie_genre::Column::MovieId.eq(movie_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.genre_id)
        .collect();
    Ok([actors, directors, genres])
}

async fn add_form(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let choices = Choices::load(&state).await?;

    let mut data = FormData::new();
    data.set("year", DEFAULT_YEAR)
        .set("world_premiere", jiff::Zoned::now().date())
        .set("budget", 0)
        .set("fees_in_usa", 0)
        .set("fees_in_world", 0);

    Ok(widgets::render(
        "Add movie",
        form_body(&data, &Errors::new(), &choices, None, &Inline::default()),
    ))
}

async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let choices = Choices::load(&state).await?;
    let inline = Inline::default();

    let (sub, errors) = clean(&state, &data, &choices, None, &inline, false).await?;
    if !errors.is_empty() {
        return Ok(widgets::invalid("Add movie", form_body(&data, &errors, &choices, None, &inline)));
    }

    let saved = persist(&state, &data, sub, None).await?;
    tracing::info!(id = saved.id, url = %saved.url, "movie created");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn find(state: &AppState, raw: &str) -> AppResult<movie::Model> {
    movie::Entity::find_by_id(object_id(raw)?)
        .one(state.catalog.db())
        .await?
        .ok_or_else(|| AppError::not_found("movie"))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let movie = find(&state, &id).await?;
    let choices = Choices::load(&state).await?;
    let inline = Inline::load(&state, movie.id).await?;
    let [actors, directors, genres] = linked_ids(state.catalog.db(), movie.id).await?;

    let mut data = FormData::new();
    data.set("title", &movie.title)
        .set("subtitle", &movie.subtitle)
        .set("description", &movie.description)
        .set("year", movie.year)
        .set("country", &movie.country)
        .set("world_premiere", &movie.world_premiere)
        .set("budget", movie.budget)
        .set("fees_in_usa", movie.fees_in_usa)
        .set("fees_in_world", movie.fees_in_world)
        .set("category", movie.category_id)
        .set("url", &movie.url)
        .set_checked("draft", movie.draft)
        .set_all("actors", actors)
        .set_all("directors", directors)
        .set_all("genres", genres);
    for r in &inline.reviews {
        data.set(format!("review-{}-text", r.id), &r.text);
        if let Some(parent) = r.parent_id {
            data.set(format!("review-{}-parent", r.id), parent);
        }
    }
    for s in &inline.shorts {
        data.set(format!("short-{}-title", s.id), &s.title)
            .set(format!("short-{}-description", s.id), &s.description);
    }

    Ok(widgets::render(
        "Change movie",
        form_body(&data, &Errors::new(), &choices, Some(&movie), &inline),
    ))
}

/// Saves the edit screen, or inserts a copy when `_saveasnew` is posted.
async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let movie = find(&state, &id).await?;
    let data = FormData::from_multipart(multipart).await?;
    let choices = Choices::load(&state).await?;
    let inline = Inline::load(&state, movie.id).await?;
    let copy = data.has("_saveasnew");

    let (sub, errors) = clean(&state, &data, &choices, Some(&movie), &inline, copy).await?;
    if !errors.is_empty() {
        return Ok(widgets::invalid(
            "Change movie",
            form_body(&data, &errors, &choices, Some(&movie), &inline),
        ));
    }

    let saved = persist(&state, &data, sub, (!copy).then_some(movie.id)).await?;
    if copy {
        tracing::info!(id = saved.id, from = movie.id, "movie saved as new");
    } else {
        tracing::info!(id = saved.id, "movie updated");
    }
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let movie = find(&state, &id).await?;
    movie::Entity::delete_by_id(movie.id).exec(state.catalog.db()).await?;
    tracing::info!(id = movie.id, url = %movie.url, "movie deleted");
    Ok(widgets::redirect(&format!("/admin/{SLUG}/")))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
        QueryOrder, Set,
    };
    use tower::ServiceExt;

    use super::{MovieListQuery, linked_ids};
    use crate::{
        entities::{movie, movie_short, review},
        test_support::{
            body_string, create_actor, create_category, create_genre, create_movie, create_review,
            multipart_post, test_state, test_state_with_media,
        },
    };

    type Fields = Vec<(String, String)>;

    async fn app() -> (Router, DatabaseConnection) {
        let (state, db) = test_state().await;
        (crate::router(state), db)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    /// Every main field of the movie form.
    fn movie_fields(category_id: i32) -> Fields {
        [
            ("title", "Heat".to_string()),
            ("subtitle", "A Los Angeles crime saga".to_string()),
            ("description", "<p>Cops and robbers.</p>".to_string()),
            ("year", "1995".to_string()),
            ("country", "USA".to_string()),
            ("world_premiere", "1995-12-15".to_string()),
            ("budget", "60000000".to_string()),
            ("fees_in_usa", "67436818".to_string()),
            ("fees_in_world", "187436818".to_string()),
            ("category", category_id.to_string()),
            ("url", "heat".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn push(fields: &mut Fields, key: impl Into<String>, value: impl Into<String>) {
        fields.push((key.into(), value.into()));
    }

    fn without(mut fields: Fields, key: &str) -> Fields {
        fields.retain(|(k, _)| k != key);
        fields
    }

    fn post(uri: &str, fields: &Fields, files: &[(&str, &str, &[u8])]) -> Request<Body> {
        let borrowed: Vec<(&str, &str)> =
            fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        multipart_post(uri, &borrowed, files)
    }

    #[test]
    fn list_query_keeps_filters_in_links() {
        let q = MovieListQuery {
            o: Some("-title".into()),
            category: Some("2".into()),
            year: None,
            q: Some("the matrix".into()),
        };
        assert_eq!(q.filters(), "category=2&q=the%20matrix&");
        assert_eq!(q.with("year", Some("1999".into())), "?category=2&year=1999&q=the%20matrix&");
        assert_eq!(q.with("category", None), "?q=the%20matrix&");
    }

    #[tokio::test]
    async fn create_with_associations_and_a_clip() {
        let (state, db, media) = test_state_with_media().await;
        let app = crate::router(state);
        let cat = create_category(&db, "Feature", "feature").await;
        let pacino = create_actor(&db, "Al Pacino").await;
        let mann = create_actor(&db, "Michael Mann").await;
        let crime = create_genre(&db, "Crime", "crime").await;

        let mut fields = movie_fields(cat.id);
        push(&mut fields, "actors", pacino.id.to_string());
        push(&mut fields, "directors", mann.id.to_string());
        push(&mut fields, "genres", crime.id.to_string());
        push(&mut fields, "short-new-title", "Diner");
        push(&mut fields, "short-new-description", "Coffee");

        let resp = app
            .clone()
            .oneshot(post(
                "/admin/movies/add/",
                &fields,
                &[
                    ("poster", "heat.jpg", b"poster".as_slice()),
                    ("short-new-image", "diner.jpg", b"still".as_slice()),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let movie = movie::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(movie.poster, "movies/heat.jpg");
        assert_eq!(std::fs::read(media.path().join(&movie.poster)).unwrap(), b"poster");
        assert_eq!(movie.world_premiere, "1995-12-15");
        assert!(!movie.draft);
        let [actors, directors, genres] = linked_ids(&db, movie.id).await.unwrap();
        assert_eq!(actors, vec![pacino.id]);
        assert_eq!(directors, vec![mann.id]);
        assert_eq!(genres, vec![crime.id]);

        let short = movie_short::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(short.movie_id, movie.id);
        assert_eq!(short.image, "movie_shorts/diner.jpg");

        let html = body_string(app.oneshot(get("/heat/")).await.unwrap()).await;
        assert!(html.contains("Al Pacino"));
        assert!(html.contains("Michael Mann"));
    }

    #[tokio::test]
    async fn invalid_submission_rerenders_with_errors() {
        let (app, db) = app().await;
        let cat = create_category(&db, "Feature", "feature").await;
        create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;

        let mut fields = without(movie_fields(cat.id), "title");
        push(&mut fields, "actors", "9999");

        let resp = app.oneshot(post("/admin/movies/add/", &fields, &[])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let html = body_string(resp).await;
        assert!(html.contains("Please correct the errors below."));
        assert!(html.contains("Movie with this Url already exists."));
        assert!(html.contains("9999 is not one of the available choices."));
        assert!(html.contains(r#"value="A Los Angeles crime saga""#));
        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn edit_applies_inline_reviews_and_clips() {
        let (app, db) = app().await;
        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        let keep = create_review(&db, movie.id, "Neil", None).await;
        let dropped = create_review(&db, movie.id, "Waingro", None).await;
        let clip = movie_short::ActiveModel {
            title: Set("Old".into()),
            description: Set("Old clip".into()),
            image: Set("movie_shorts/old.jpg".into()),
            movie_id: Set(movie.id),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let uri = format!("/admin/movies/{}/", movie.id);
        let html = body_string(app.clone().oneshot(get(&uri)).await.unwrap()).await;
        assert!(html.contains("Waingro"));
        assert!(html.contains(r#"src="/media/movie_shorts/old.jpg" width="200" height="100""#));
        assert!(html.contains(r#"src="/media/movies/heat.jpg" width="100""#));
        assert_eq!(html.matches(r#"name="_saveasnew""#).count(), 2);

        let mut fields = movie_fields(cat.id);
        push(&mut fields, "draft", "on");
        push(&mut fields, "review_ids", keep.id.to_string());
        push(&mut fields, format!("review-{}-text", keep.id), "Edited");
        push(&mut fields, "review_ids", dropped.id.to_string());
        push(&mut fields, format!("review-{}-text", dropped.id), "Bye");
        push(&mut fields, format!("review-{}-delete", dropped.id), "on");
        push(&mut fields, "short_ids", clip.id.to_string());
        push(&mut fields, format!("short-{}-title", clip.id), "New title");
        push(&mut fields, format!("short-{}-description", clip.id), "Clip");

        let resp = app.oneshot(post(&uri, &fields, &[])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/admin/movies/");

        let reviews = review::Entity::find().all(&db).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].text, "Edited");
        assert_eq!(reviews[0].name, "Neil");

        let clip = movie_short::Entity::find_by_id(clip.id).one(&db).await.unwrap().unwrap();
        assert_eq!(clip.title, "New title");
        assert_eq!(clip.image, "movie_shorts/old.jpg");

        let stored = movie::Entity::find_by_id(movie.id).one(&db).await.unwrap().unwrap();
        assert!(stored.draft);
        assert_eq!(stored.poster, "movies/heat.jpg");
    }

    #[tokio::test]
    async fn inline_review_loops_are_rejected() {
        let (app, db) = app().await;
        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        let root = create_review(&db, movie.id, "Neil", None).await;
        let reply = create_review(&db, movie.id, "Chris", Some(root.id)).await;

        let mut fields = movie_fields(cat.id);
        push(&mut fields, "review_ids", root.id.to_string());
        push(&mut fields, format!("review-{}-text", root.id), "Root");
        push(&mut fields, format!("review-{}-parent", root.id), reply.id.to_string());
        push(&mut fields, "review_ids", reply.id.to_string());
        push(&mut fields, format!("review-{}-text", reply.id), "Reply");
        push(&mut fields, format!("review-{}-parent", reply.id), root.id.to_string());

        let resp =
            app.oneshot(post(&format!("/admin/movies/{}/", movie.id), &fields, &[])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let root = review::Entity::find_by_id(root.id).one(&db).await.unwrap().unwrap();
        assert_eq!(root.parent_id, None);
    }

    #[tokio::test]
    async fn save_as_new_copies_instead_of_updating() {
        let (app, db) = app().await;
        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        create_review(&db, movie.id, "Neil", None).await;

        let mut fields = without(movie_fields(cat.id), "url");
        push(&mut fields, "url", "heat-remaster");
        push(&mut fields, "_saveasnew", "");

        let resp =
            app.oneshot(post(&format!("/admin/movies/{}/", movie.id), &fields, &[])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let movies = movie::Entity::find().order_by_asc(movie::Column::Id).all(&db).await.unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].url, "heat");
        assert_eq!(movies[1].url, "heat-remaster");
        assert_eq!(movies[1].poster, movie.poster);
        let location = format!("/admin/movies/{}/", movies[1].id);
        assert_eq!(resp.headers()[header::LOCATION], location.as_str());

        let copied = review::Entity::find()
            .filter(review::Column::MovieId.eq(movies[1].id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(copied, 0);
    }

    #[tokio::test]
    async fn list_filters_searches_and_saves_drafts_inline() {
        let (app, db) = app().await;
        let feature = create_category(&db, "Feature", "feature").await;
        let cartoon = create_category(&db, "Cartoon", "cartoon").await;
        let heat = create_movie(&db, feature.id, "Heat", "heat", 1995, false).await;
        let shrek = create_movie(&db, cartoon.id, "Shrek", "shrek", 2001, true).await;

        let html =
            body_string(app.clone().oneshot(get("/admin/movies/?q=cartoon")).await.unwrap()).await;
        assert!(html.contains(">Shrek</a>"));
        assert!(!html.contains(">Heat</a>"));

        let uri = format!("/admin/movies/?category={}", feature.id);
        let html = body_string(app.clone().oneshot(get(&uri)).await.unwrap()).await;
        assert!(html.contains(">Heat</a>"));
        assert!(!html.contains(">Shrek</a>"));

        let html =
            body_string(app.clone().oneshot(get("/admin/movies/?year=2001")).await.unwrap()).await;
        assert!(html.contains(">Shrek</a>"));
        assert!(!html.contains(">Heat</a>"));

        let html =
            body_string(app.clone().oneshot(get("/admin/movies/?o=-title")).await.unwrap()).await;
        assert!(html.find(">Shrek</a>").unwrap() < html.find(">Heat</a>").unwrap());

        let mut fields = Fields::new();
        push(&mut fields, "ids", heat.id.to_string());
        push(&mut fields, "ids", shrek.id.to_string());
        push(&mut fields, format!("draft-{}", heat.id), "on");
        let resp = app.oneshot(post("/admin/movies/", &fields, &[])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let heat = movie::Entity::find_by_id(heat.id).one(&db).await.unwrap().unwrap();
        let shrek = movie::Entity::find_by_id(shrek.id).one(&db).await.unwrap().unwrap();
        assert!(heat.draft);
        assert!(!shrek.draft);
    }

    #[tokio::test]
    async fn delete_cascades_to_clips_and_reviews() {
        let (app, db) = app().await;
        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        create_review(&db, movie.id, "Neil", None).await;

        let resp = app
            .oneshot(post(&format!("/admin/movies/{}/delete/", movie.id), &Fields::new(), &[]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(review::Entity::find().count(&db).await.unwrap(), 0);
    }
}
