use std::sync::Arc;

use futures::{StreamExt, stream, stream::BoxStream};
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    models::{MovieRecord, PersistReport},
    omdb::MovieInfoProvider,
    store::{MovieQuery, MovieStore},
};

/// Upper bound on records assembled from one keyword search.
pub const SEARCH_RESULT_LIMIT: usize = 10;

/// Business rules over the provider and the local store.
///
/// Never retries: every failure is translated into an [`AppError`] and returned.
pub struct CatalogService {
    store: MovieStore,
    provider: Arc<dyn MovieInfoProvider>,
    detail_concurrency: usize,
}

impl CatalogService {
    pub fn new(
        store: MovieStore,
        provider: Arc<dyn MovieInfoProvider>,
        detail_concurrency: usize,
    ) -> Self {
        Self { store, provider, detail_concurrency: detail_concurrency.max(1) }
    }

    /// Every stored record ordered by title, re-emitted after each write.
    pub fn list_all(&self) -> BoxStream<'static, AppResult<Vec<MovieRecord>>> {
        self.store.watch(MovieQuery::All)
    }

    pub fn find_by_actor_substring(&self, q: &str) -> BoxStream<'static, AppResult<Vec<MovieRecord>>> {
        self.store.watch(MovieQuery::ActorContains(q.to_string()))
    }

    pub fn find_by_title_substring(&self, q: &str) -> BoxStream<'static, AppResult<Vec<MovieRecord>>> {
        self.store.watch(MovieQuery::TitleContains(q.to_string()))
    }

    pub async fn find_exact_first_by_title(&self, q: &str) -> AppResult<MovieRecord> {
        self.store
            .first_with_title(q)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no stored movie with title containing \"{q}\"")))
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<MovieRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no stored movie with id \"{id}\"")))
    }

    /// Looks `title` up remotely and stores the answer, replacing any earlier copy.
    pub async fn fetch_and_persist_by_title(&self, title: &str) -> AppResult<MovieRecord> {
        let movie = self.provider.lookup_by_title(title).await?;
        if !movie.is_valid() {
            debug!(title = %title, provider = self.provider.name(), "provider returned an incomplete record");
            return Err(AppError::NotFound(format!("no movie found with title \"{title}\"")));
        }

        self.store.upsert(&movie).await?;
        info!(id = %movie.id, title = %movie.title, "movie saved");
        Ok(movie)
    }

    /// Live keyword search. Nothing found here is written to the store.
    ///
    /// Listings keep their provider order; a listing whose detail lookup fails
    /// is returned with placeholder fields instead of being dropped.
    pub async fn search_provider_by_keyword(&self, term: &str) -> AppResult<Vec<MovieRecord>> {
        let listings = self.provider.search(term, 1).await?;
        debug!(term = %term, listings = listings.len(), "enriching search listings");

        let provider = &self.provider;
        let movies: Vec<MovieRecord> = stream::iter(listings.into_iter().take(SEARCH_RESULT_LIMIT))
            .map(|listing| async move {
                match provider.lookup_by_id(&listing.id).await {
                    Ok(movie) => movie,
                    Err(err) => {
                        warn!(id = %listing.id, error = %err, "detail lookup failed, keeping basic listing");
                        listing.into_record()
                    },
                }
            })
            .buffered(self.detail_concurrency)
            .collect()
            .await;

        Ok(movies)
    }

    /// Bulk insert that never overwrites an id already in the store.
    ///
    /// The id read and the insert are separate round-trips.
    pub async fn persist_many(&self, records: Vec<MovieRecord>) -> AppResult<PersistReport> {
        let mut report = PersistReport::default();
        if records.is_empty() {
            return Ok(report);
        }

        let existing = self.store.ids().await?;
        debug!(incoming = records.len(), existing = existing.len(), "filtering bulk insert");

        let mut fresh = Vec::with_capacity(records.len());
        for movie in records {
            if !movie.is_valid() {
                debug!(id = %movie.id, title = %movie.title, "skipping invalid movie");
                report.skipped_invalid.push(movie.id);
            } else if existing.contains(&movie.id) || fresh.iter().any(|m: &MovieRecord| m.id == movie.id) {
                debug!(id = %movie.id, title = %movie.title, "skipping existing movie");
                report.skipped_existing.push(movie.id);
            } else {
                fresh.push(movie);
            }
        }

        self.store.upsert_many(&fresh).await?;
        report.inserted = fresh.into_iter().map(|m| m.id).collect();

        info!(
            inserted = report.inserted.len(),
            skipped_invalid = report.skipped_invalid.len(),
            skipped_existing = report.skipped_existing.len(),
            "bulk insert completed"
        );
        Ok(report)
    }

    /// Deleting the catalog is not supported; this only records the request.
    pub async fn clear_all(&self) -> AppResult<()> {
        warn!("clearing all movies is not implemented, store left untouched");
        Ok(())
    }
}
