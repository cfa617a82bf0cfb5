use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
    sea_query::{Expr, LikeExpr, OnConflict, Query},
};

use crate::{
    entities::{actor, genre, movie, movie_genre, movie_short, rating, rating_star, review},
    error::{AppError, AppResult},
    models::{ActorDetail, Frame, MovieDetail, Page, review_tree},
    tags,
};

/// Public read and write paths over the catalog schema.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
    page_size: u64,
    last_movies: u64,
}

/// A validated review ready to be stored.
#[derive(Clone, Debug)]
pub struct NewReview {
    pub name: String,
    pub email: String,
    pub text: String,
    pub parent_id: Option<i32>,
}

impl Catalog {
    pub fn new(db: DatabaseConnection, page_size: u64, last_movies: u64) -> Self {
        Self { db, page_size, last_movies }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Layout context shared by the public pages.
    pub async fn frame(&self) -> AppResult<Frame> {
        let genres = genre::Entity::find().order_by_asc(genre::Column::Id).all(&self.db).await?;

        let years = movie::Entity::find()
            .select_only()
            .column(movie::Column::Year)
            .filter(movie::Column::Draft.eq(false))
            .distinct()
            .order_by_asc(movie::Column::Year)
            .into_tuple::<i32>()
            .all(&self.db)
            .await?;

        Ok(Frame {
            categories: tags::categories(&self.db).await?,
            last_movies: tags::last_movies(&self.db, self.last_movies).await?,
            genres,
            years,
        })
    }

    pub async fn published(&self, page: u64) -> AppResult<Page<movie::Model>> {
        self.paginate(published(), page).await
    }

    /// Published movies released in one of `years` OR tagged with one of
    /// `genres`. Empty sets match nothing.
    pub async fn filter(
        &self,
        years: &[i32],
        genres: &[i32],
        page: u64,
    ) -> AppResult<Page<movie::Model>> {
        if years.is_empty() && genres.is_empty() {
            return if page == 1 { Ok(Page::empty()) } else { Err(AppError::not_found("page")) };
        }

        let mut any = Condition::any();
        if !years.is_empty() {
            any = any.add(movie::Column::Year.is_in(years.iter().copied()));
        }
        if !genres.is_empty() {
            any = any.add(
                movie::Column::Id.in_subquery(
                    Query::select()
                        .column(movie_genre::Column::MovieId)
                        .from(movie_genre::Entity)
                        .and_where(movie_genre::Column::GenreId.is_in(genres.iter().copied()))
                        .to_owned(),
                ),
            );
        }

        self.paginate(published().filter(any), page).await
    }

    /// Published movies whose title contains `q`, ignoring ASCII case.
    pub async fn search(&self, q: &str, page: u64) -> AppResult<Page<movie::Model>> {
        let select = published().filter(
            Expr::col((movie::Entity, movie::Column::Title))
                .like(LikeExpr::new(contains_pattern(q)).escape('\\')),
        );
        self.paginate(select, page).await
    }

    /// Resolves a movie by slug. Drafts resolve too.
    pub async fn movie_detail(&self, slug: &str) -> AppResult<MovieDetail> {
        let movie = movie::Entity::find()
            .filter(movie::Column::Url.eq(slug))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("movie"))?;

        let category = movie.find_related(crate::entities::category::Entity).one(&self.db).await?;
        let genres = movie.find_related(genre::Entity).all(&self.db).await?;
        let actors = movie.find_linked(movie::Actors).all(&self.db).await?;
        let directors = movie.find_linked(movie::Directors).all(&self.db).await?;
        let shorts = movie
            .find_related(movie_short::Entity)
            .order_by_asc(movie_short::Column::Id)
            .all(&self.db)
            .await?;
        let reviews = movie
            .find_related(review::Entity)
            .order_by_asc(review::Column::Id)
            .all(&self.db)
            .await?;
        let stars = rating_star::Entity::find_ordered().all(&self.db).await?;

        Ok(MovieDetail {
            movie,
            category,
            genres,
            actors,
            directors,
            shorts,
            reviews: review_tree(reviews),
            stars,
        })
    }

    /// Resolves an actor by exact name.
    pub async fn actor_detail(&self, name: &str) -> AppResult<ActorDetail> {
        let actor = actor::Entity::find()
            .filter(actor::Column::Name.eq(name))
            .order_by_asc(actor::Column::Id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("actor"))?;

        let acted_in = actor
            .find_linked(actor::ActedIn)
            .filter(movie::Column::Draft.eq(false))
            .all(&self.db)
            .await?;
        let directed = actor
            .find_linked(actor::Directed)
            .filter(movie::Column::Draft.eq(false))
            .all(&self.db)
            .await?;

        Ok(ActorDetail { actor, acted_in, directed })
    }

    pub async fn movie_by_id(&self, id: i32) -> AppResult<movie::Model> {
        movie::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("movie"))
    }

    /// Creates or updates the rating for `(ip, movie_id)`. The unique index on
    /// that pair makes this a single atomic statement.
    pub async fn rate(&self, ip: &str, movie_id: i32, star_id: i32) -> AppResult<()> {
        if rating_star::Entity::find_by_id(star_id).one(&self.db).await?.is_none() {
            return Err(AppError::validation("unknown star"));
        }
        if movie::Entity::find_by_id(movie_id).one(&self.db).await?.is_none() {
            return Err(AppError::validation("unknown movie"));
        }

        let model = rating::ActiveModel {
            id: Default::default(),
            ip: Set(ip.to_string()),
            star_id: Set(star_id),
            movie_id: Set(movie_id),
        };

        rating::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([rating::Column::Ip, rating::Column::MovieId])
                    .update_column(rating::Column::StarId)
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }

    /// Stores a review on `movie`. A parent must be a review of the same movie.
    pub async fn add_review(
        &self,
        movie: &movie::Model,
        review: NewReview,
    ) -> AppResult<review::Model> {
        if let Some(parent_id) = review.parent_id {
            let parent = review::Entity::find_by_id(parent_id).one(&self.db).await?;
            if parent.is_none_or(|p| p.movie_id != movie.id) {
                return Err(AppError::validation("unknown parent review"));
            }
        }

        let model = review::ActiveModel {
            email: Set(review.email),
            name: Set(review.name),
            text: Set(review.text),
            parent_id: Set(review.parent_id),
            movie_id: Set(movie.id),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn paginate(&self, select: Select<movie::Entity>, page: u64) -> AppResult<Page<movie::Model>> {
        let paginator = select.order_by_asc(movie::Column::Id).paginate(&self.db, self.page_size);
        let counts = paginator.num_items_and_pages().await?;
        let num_pages = counts.number_of_pages.max(1);

        if page == 0 || page > num_pages {
            return Err(AppError::not_found("page"));
        }

        let items = paginator.fetch_page(page - 1).await?;
        Ok(Page { items, number: page, num_pages, total: counts.number_of_items })
    }
}

fn published() -> Select<movie::Entity> {
    movie::Entity::find().filter(movie::Column::Draft.eq(false))
}

/// `LIKE` pattern matching `q` anywhere, with wildcards in `q` escaped.
pub(crate) fn contains_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
