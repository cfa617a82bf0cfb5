use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rating_stars")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub value: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl Entity {
    /// Stars in display order, highest value first.
    pub fn find_ordered() -> Select<Entity> {
        Self::find().order_by_desc(Column::Value)
    }
}

impl ActiveModelBehavior for ActiveModel {}
