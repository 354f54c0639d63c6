use std::{collections::HashSet, sync::Arc};

use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::OnConflict,
};
use tokio::sync::watch;

use crate::{entities::movie, error::AppResult, models::MovieRecord};

/// Filters supported by the live queries.
///
/// Substring matches go through SQLite `LIKE`, which ignores ASCII case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MovieQuery {
    All,
    TitleContains(String),
    ActorContains(String),
}

/// The on-device movie table.
///
/// Every write bumps a revision counter so that live queries re-run and see it.
#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
    revision: Arc<watch::Sender<u64>>,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        let (revision, _) = watch::channel(0);
        Self { db, revision: Arc::new(revision) }
    }

    /// Inserts the record, replacing every column of an existing row with the same id.
    pub async fn upsert(&self, movie: &MovieRecord) -> AppResult<()> {
        movie::Entity::insert(active_model(movie, now_sec()))
            .on_conflict(replace_on_id())
            .exec_without_returning(&self.db)
            .await?;

        self.bump();
        Ok(())
    }

    pub async fn upsert_many(&self, movies: &[MovieRecord]) -> AppResult<u64> {
        if movies.is_empty() {
            return Ok(0);
        }

        let now = now_sec();
        let written = movie::Entity::insert_many(movies.iter().map(|m| active_model(m, now)))
            .on_conflict(replace_on_id())
            .exec_without_returning(&self.db)
            .await?;

        self.bump();
        Ok(written)
    }

    pub async fn get(&self, id: &str) -> AppResult<Option<MovieRecord>> {
        let row = movie::Entity::find_by_id(id.to_string()).one(&self.db).await?;
        Ok(row.map(MovieRecord::from))
    }

    pub async fn first_with_title(&self, fragment: &str) -> AppResult<Option<MovieRecord>> {
        let row = movie::Entity::find()
            .filter(movie::Column::Title.contains(fragment))
            .order_by_asc(movie::Column::Title)
            .one(&self.db)
            .await?;
        Ok(row.map(MovieRecord::from))
    }

    pub async fn ids(&self) -> AppResult<HashSet<String>> {
        let ids: Vec<String> = movie::Entity::find()
            .select_only()
            .column(movie::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn query(&self, query: &MovieQuery) -> AppResult<Vec<MovieRecord>> {
        let select = match query {
            MovieQuery::All => movie::Entity::find(),
            MovieQuery::TitleContains(q) => {
                movie::Entity::find().filter(movie::Column::Title.contains(q.as_str()))
            },
            MovieQuery::ActorContains(q) => {
                movie::Entity::find().filter(movie::Column::Actors.contains(q.as_str()))
            },
        };

        let rows = select.order_by_asc(movie::Column::Title).all(&self.db).await?;
        Ok(rows.into_iter().map(MovieRecord::from).collect())
    }

    /// Runs `query` now and again after every subsequent write.
    ///
    /// Writes that land while a query is running are coalesced into one re-run.
    pub fn watch(&self, query: MovieQuery) -> BoxStream<'static, AppResult<Vec<MovieRecord>>> {
        let rx = self.revision.subscribe();

        stream::unfold((self.clone(), rx, query, true), |(store, mut rx, query, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            rx.borrow_and_update();

            let result = store.query(&query).await;
            Some((result, (store, rx, query, false)))
        })
        .boxed()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

fn active_model(movie: &MovieRecord, updated_at: i64) -> movie::ActiveModel {
    movie::ActiveModel {
        id: Set(movie.id.clone()),
        title: Set(movie.title.clone()),
        release_year: Set(movie.release_year.clone()),
        age_rating: Set(movie.age_rating.clone()),
        release_date: Set(movie.release_date.clone()),
        runtime: Set(movie.runtime.clone()),
        genre: Set(movie.genre.clone()),
        director: Set(movie.director.clone()),
        writer: Set(movie.writer.clone()),
        actors: Set(movie.actors.clone()),
        plot: Set(movie.plot.clone()),
        updated_at: Set(updated_at),
    }
}

fn replace_on_id() -> OnConflict {
    OnConflict::column(movie::Column::Id)
        .update_columns([
            movie::Column::Title,
            movie::Column::ReleaseYear,
            movie::Column::AgeRating,
            movie::Column::ReleaseDate,
            movie::Column::Runtime,
            movie::Column::Genre,
            movie::Column::Director,
            movie::Column::Writer,
            movie::Column::Actors,
            movie::Column::Plot,
            movie::Column::UpdatedAt,
        ])
        .to_owned()
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
