use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(string(Movies::Id).primary_key())
                    .col(string(Movies::Title))
                    .col(string(Movies::ReleaseYear))
                    .col(string(Movies::AgeRating))
                    .col(string(Movies::ReleaseDate))
                    .col(string(Movies::Runtime))
                    .col(string(Movies::Genre))
                    .col(string(Movies::Director))
                    .col(string(Movies::Writer))
                    .col(string(Movies::Actors))
                    .col(text(Movies::Plot))
                    .col(big_integer(Movies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_title")
                    .table(Movies::Table)
                    .col(Movies::Title)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_index(Index::drop().name("idx_movies_title").table(Movies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    ReleaseYear,
    AgeRating,
    ReleaseDate,
    Runtime,
    Genre,
    Director,
    Writer,
    Actors,
    Plot,
    UpdatedAt,
}
