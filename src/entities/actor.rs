use sea_orm::entity::prelude::*;

/// A person credited on a movie, either in the cast or as a director.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "actors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub age: i32,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub image: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::movie_actor::Entity")]
    MovieActor,
    #[sea_orm(has_many = "super::movie_director::Entity")]
    MovieDirector,
}

impl Related<super::movie_actor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieActor.def()
    }
}

impl Related<super::movie_director::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieDirector.def()
    }
}

/// Movies this person plays in.
pub struct ActedIn;

impl Linked for ActedIn {
    type FromEntity = Entity;
    type ToEntity = super::movie::Entity;

    fn link(&self) -> Vec<RelationDef> {
        vec![
            super::movie_actor::Relation::Actor.def().rev(),
            super::movie_actor::Relation::Movie.def(),
        ]
    }
}

/// Movies this person directed.
pub struct Directed;

impl Linked for Directed {
    type FromEntity = Entity;
    type ToEntity = super::movie::Entity;

    fn link(&self) -> Vec<RelationDef> {
        vec![
            super::movie_director::Relation::Actor.def().rev(),
            super::movie_director::Relation::Movie.def(),
        ]
    }
}

impl ActiveModelBehavior for ActiveModel {}
