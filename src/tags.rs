//! Read-through queries the page layout calls directly.

use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, QuerySelect};

use crate::{
    entities::{category, movie},
    error::AppResult,
};

pub const DEFAULT_LAST_MOVIES: u64 = 2;

/// Every category, in primary key order.
pub async fn categories(db: &DatabaseConnection) -> AppResult<Vec<category::Model>> {
    Ok(category::Entity::find().order_by_asc(category::Column::Id).all(db).await?)
}

/// The first `count` movies by ascending id, so the oldest rows come first
/// despite the name. Drafts are not excluded.
pub async fn last_movies(db: &DatabaseConnection, count: u64) -> AppResult<Vec<movie::Model>> {
    Ok(movie::Entity::find().order_by_asc(movie::Column::Id).limit(count).all(db).await?)
}
