use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RatingStars::Table)
                    .if_not_exists()
                    .col(pk_auto(RatingStars::Id))
                    .col(integer(RatingStars::Value).default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(pk_auto(Ratings::Id))
                    .col(string_len(Ratings::Ip, 150))
                    .col(integer(Ratings::StarId))
                    .col(integer(Ratings::MovieId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ratings_star")
                            .from(Ratings::Table, Ratings::StarId)
                            .to(RatingStars::Table, RatingStars::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ratings_movie")
                            .from(Ratings::Table, Ratings::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The rating upsert conflicts on this index.
        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_ip_movie_unique")
                    .table(Ratings::Table)
                    .col(Ratings::Ip)
                    .col(Ratings::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(pk_auto(Reviews::Id))
                    .col(string_len(Reviews::Email, 254))
                    .col(string_len(Reviews::Name, 150))
                    .col(text(Reviews::Text))
                    .col(integer_null(Reviews::ParentId))
                    .col(integer(Reviews::MovieId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_parent")
                            .from(Reviews::Table, Reviews::ParentId)
                            .to(Reviews::Table, Reviews::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_movie")
                            .from(Reviews::Table, Reviews::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_movie")
                    .table(Reviews::Table)
                    .col(Reviews::MovieId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Reviews::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Ratings::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(RatingStars::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum RatingStars {
    Table,
    Id,
    Value,
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    Id,
    Ip,
    StarId,
    MovieId,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    Email,
    Name,
    Text,
    ParentId,
    MovieId,
}
