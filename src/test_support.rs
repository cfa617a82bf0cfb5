use std::{path::PathBuf, sync::Arc};

use axum::{
    body::{Body, to_bytes},
    http::Response,
};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use tempfile::TempDir;

use crate::{
    AppState,
    catalog::Catalog,
    config::{AdminCredentials, Config},
    entities::{actor, category, genre, movie, movie_genre, review},
    media::MediaStore,
};

pub async fn setup_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.expect("connect in-memory sqlite");
    crate::db::prepare(&db).await.expect("migrate");
    db
}

/// A temporary media root, removed when the guard drops.
pub fn media_dir() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

pub fn test_config(admin: Option<AdminCredentials>, media_root: PathBuf) -> Config {
    Config {
        addr: "127.0.0.1:0".parse().expect("addr"),
        database_url: "sqlite::memory:".to_string(),
        media_root,
        page_size: 2,
        last_movies: 2,
        admin,
    }
}

async fn build_state(
    admin: Option<AdminCredentials>,
    media_root: PathBuf,
) -> (Arc<AppState>, DatabaseConnection) {
    let db = setup_db().await;
    let config = Arc::new(test_config(admin, media_root));
    let state = Arc::new(AppState {
        catalog: Catalog::new(db.clone(), config.page_size, config.last_movies),
        media: MediaStore::new(config.media_root.clone()),
        config,
    });
    (state, db)
}

/// State for tests that never upload; the media root is not created.
pub async fn test_state_with(
    admin: Option<AdminCredentials>,
) -> (Arc<AppState>, DatabaseConnection) {
    build_state(admin, PathBuf::from("unused-media")).await
}

pub async fn test_state() -> (Arc<AppState>, DatabaseConnection) {
    test_state_with(None).await
}

/// State whose uploads land in a temporary directory. Keep the guard alive
/// for the length of the test.
pub async fn test_state_with_media() -> (Arc<AppState>, DatabaseConnection, TempDir) {
    let media = media_dir();
    let (state, db) = build_state(None, media.path().to_path_buf()).await;
    (state, db, media)
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn create_category(db: &DatabaseConnection, name: &str, url: &str) -> category::Model {
    category::ActiveModel {
        name: Set(name.to_string()),
        description: Set(format!("{name} description")),
        url: Set(url.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert category")
}

pub async fn create_genre(db: &DatabaseConnection, name: &str, url: &str) -> genre::Model {
    genre::ActiveModel {
        name: Set(name.to_string()),
        description: Set(String::new()),
        url: Set(url.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert genre")
}

pub async fn create_actor(db: &DatabaseConnection, name: &str) -> actor::Model {
    actor::ActiveModel {
        name: Set(name.to_string()),
        age: Set(40),
        description: Set(format!("About {name}")),
        image: Set("actors/face.jpg".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert actor")
}

pub async fn create_movie(
    db: &DatabaseConnection,
    category_id: i32,
    title: &str,
    url: &str,
    year: i32,
    draft: bool,
) -> movie::Model {
    movie::ActiveModel {
        title: Set(title.to_string()),
        subtitle: Set(String::new()),
        description: Set(format!("<p>{title}</p>")),
        poster: Set(format!("movies/{url}.jpg")),
        year: Set(year),
        country: Set("USA".to_string()),
        world_premiere: Set(format!("{year}-01-01")),
        budget: Set(0),
        fees_in_usa: Set(0),
        fees_in_world: Set(0),
        category_id: Set(category_id),
        url: Set(url.to_string()),
        draft: Set(draft),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert movie")
}

pub async fn tag_genre(db: &DatabaseConnection, movie_id: i32, genre_id: i32) {
    movie_genre::ActiveModel { movie_id: Set(movie_id), genre_id: Set(genre_id) }
        .insert(db)
        .await
        .expect("insert movie genre");
}

pub async fn create_review(
    db: &DatabaseConnection,
    movie_id: i32,
    name: &str,
    parent_id: Option<i32>,
) -> review::Model {
    review::ActiveModel {
        email: Set(format!("{}@example.com", name.to_lowercase())),
        name: Set(name.to_string()),
        text: Set(format!("{name} says hi")),
        parent_id: Set(parent_id),
        movie_id: Set(movie_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert review")
}

/// Encodes `fields` as a `multipart/form-data` body. Returns the content type
/// header value and the body.
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "cinema-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// `POST uri` with a multipart body built by [`multipart_body`].
pub fn multipart_post(
    uri: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> axum::http::Request<Body> {
    let (content_type, body) = multipart_body(fields, files);
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("multipart request")
}
