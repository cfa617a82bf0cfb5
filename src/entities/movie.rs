use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub subtitle: String,
    /// Rich text authored in the admin console.
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub poster: String,
    pub year: i32,
    pub country: String,
    /// `YYYY-MM-DD`.
    pub world_premiere: String,
    pub budget: i64,
    pub fees_in_usa: i64,
    pub fees_in_world: i64,
    pub category_id: i32,
    #[sea_orm(unique)]
    pub url: String,
    pub draft: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
    #[sea_orm(has_many = "super::movie_short::Entity")]
    MovieShort,
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
    #[sea_orm(has_many = "super::movie_genre::Entity")]
    MovieGenre,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::movie_short::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieShort.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl Related<super::movie_genre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieGenre.def()
    }
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_genre::Relation::Genre.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_genre::Relation::Movie.def().rev())
    }
}

/// Cast members. Kept apart from [`Directors`] so the two memberships stay
/// independent.
pub struct Actors;

impl Linked for Actors {
    type FromEntity = Entity;
    type ToEntity = super::actor::Entity;

    fn link(&self) -> Vec<RelationDef> {
        vec![
            super::movie_actor::Relation::Movie.def().rev(),
            super::movie_actor::Relation::Actor.def(),
        ]
    }
}

pub struct Directors;

impl Linked for Directors {
    type FromEntity = Entity;
    type ToEntity = super::actor::Entity;

    fn link(&self) -> Vec<RelationDef> {
        vec![
            super::movie_director::Relation::Movie.def().rev(),
            super::movie_director::Relation::Actor.def(),
        ]
    }
}

impl Model {
    pub fn absolute_url(&self) -> String {
        format!("/{}/", self.url)
    }
}

impl ActiveModelBehavior for ActiveModel {}
