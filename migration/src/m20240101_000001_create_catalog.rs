use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(string_len(Categories::Name, 150))
                    .col(text(Categories::Description))
                    .col(string_len(Categories::Url, 150).unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actors::Table)
                    .if_not_exists()
                    .col(pk_auto(Actors::Id))
                    .col(string_len(Actors::Name, 150))
                    .col(integer(Actors::Age).default(0))
                    .col(text(Actors::Description))
                    .col(string_len(Actors::Image, 255))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_actors_name")
                    .table(Actors::Table)
                    .col(Actors::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(pk_auto(Genres::Id))
                    .col(string_len(Genres::Name, 150))
                    .col(text(Genres::Description))
                    .col(string_len(Genres::Url, 150).unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string_len(Movies::Title, 150))
                    .col(string_len(Movies::Subtitle, 150).default(""))
                    .col(text(Movies::Description))
                    .col(string_len(Movies::Poster, 255))
                    .col(integer(Movies::Year).default(2023))
                    .col(string_len(Movies::Country, 150))
                    .col(string_len(Movies::WorldPremiere, 10))
                    .col(big_integer(Movies::Budget).default(0))
                    .col(big_integer(Movies::FeesInUsa).default(0))
                    .col(big_integer(Movies::FeesInWorld).default(0))
                    .col(integer(Movies::CategoryId))
                    .col(string_len(Movies::Url, 150).unique_key())
                    .col(boolean(Movies::Draft).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_category")
                            .from(Movies::Table, Movies::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_draft_year")
                    .table(Movies::Table)
                    .col(Movies::Draft)
                    .col(Movies::Year)
                    .to_owned(),
            )
            .await?;

        create_movie_link(
            manager,
            "movie_actors",
            MovieActors::Table,
            MovieActors::ActorId,
            Actors::Table,
            Actors::Id,
        )
        .await?;
        create_movie_link(
            manager,
            "movie_directors",
            MovieDirectors::Table,
            MovieDirectors::ActorId,
            Actors::Table,
            Actors::Id,
        )
        .await?;
        create_movie_link(
            manager,
            "movie_genres",
            MovieGenres::Table,
            MovieGenres::GenreId,
            Genres::Table,
            Genres::Id,
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieShorts::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieShorts::Id))
                    .col(string_len(MovieShorts::Title, 150))
                    .col(text(MovieShorts::Description))
                    .col(string_len(MovieShorts::Image, 255))
                    .col(integer(MovieShorts::MovieId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_shorts_movie")
                            .from(MovieShorts::Table, MovieShorts::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieShorts::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieGenres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieDirectors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieActors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Categories::Table).to_owned()).await?;
        Ok(())
    }
}

/// Association table between `movies` and another table, keyed by both ids.
async fn create_movie_link<T, C, R, K>(
    manager: &SchemaManager<'_>,
    name: &str,
    table: T,
    other: C,
    other_table: R,
    other_key: K,
) -> Result<(), DbErr>
where
    T: IntoIden + Copy + 'static,
    C: IntoIden + Copy + 'static,
    R: IntoIden + Copy + 'static,
    K: IntoIden + Copy + 'static,
{
    manager
        .create_table(
            Table::create()
                .table(table)
                .if_not_exists()
                .col(integer(MovieLink::MovieId))
                .col(integer(other))
                .primary_key(Index::create().col(MovieLink::MovieId).col(other))
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{name}_movie"))
                        .from(table, MovieLink::MovieId)
                        .to(Movies::Table, Movies::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{name}_other"))
                        .from(table, other)
                        .to(other_table, other_key)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .to_owned(),
        )
        .await
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Description,
    Url,
}

#[derive(DeriveIden, Clone, Copy)]
enum Actors {
    Table,
    Id,
    Name,
    Age,
    Description,
    Image,
}

#[derive(DeriveIden, Clone, Copy)]
enum Genres {
    Table,
    Id,
    Name,
    Description,
    Url,
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    Subtitle,
    Description,
    Poster,
    Year,
    Country,
    WorldPremiere,
    Budget,
    FeesInUsa,
    FeesInWorld,
    CategoryId,
    Url,
    Draft,
}

#[derive(DeriveIden)]
enum MovieLink {
    MovieId,
}

#[derive(DeriveIden, Clone, Copy)]
enum MovieActors {
    Table,
    ActorId,
}

#[derive(DeriveIden, Clone, Copy)]
enum MovieDirectors {
    Table,
    ActorId,
}

#[derive(DeriveIden, Clone, Copy)]
enum MovieGenres {
    Table,
    GenreId,
}

#[derive(DeriveIden)]
enum MovieShorts {
    Table,
    Id,
    Title,
    Description,
    Image,
    MovieId,
}
