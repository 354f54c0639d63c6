use sea_orm::entity::prelude::*;

use crate::models::MovieRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub release_year: String,
    pub age_rating: String,
    pub release_date: String,
    pub runtime: String,
    pub genre: String,
    pub director: String,
    pub writer: String,
    pub actors: String,
    #[sea_orm(column_type = "Text")]
    pub plot: String,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MovieRecord {
    fn from(row: Model) -> Self {
        Self {
            id: row.id,
            title: row.title,
            release_year: row.release_year,
            age_rating: row.age_rating,
            release_date: row.release_date,
            runtime: row.runtime,
            genre: row.genre,
            director: row.director,
            writer: row.writer,
            actors: row.actors,
            plot: row.plot,
        }
    }
}
