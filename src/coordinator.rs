use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    catalog::CatalogService,
    error::{AppError, AppResult},
    models::{MovieRecord, UiState},
};

/// Drives the catalog on behalf of the presentation layer and publishes what happened.
///
/// Each operation publishes `Loading` before returning and spawns its work on
/// the runtime. Every call (and [`SearchCoordinator::reset`]) starts a new
/// generation; a task whose generation has been superseded stops publishing,
/// so the most recently started operation owns the observable state. Live
/// queries end as soon as they are superseded.
#[derive(Clone)]
pub struct SearchCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    catalog: Arc<CatalogService>,
    state: watch::Sender<UiState>,
    results: watch::Sender<Vec<MovieRecord>>,
    /// Bumped by every operation. Publishing happens while holding its lock.
    generation: watch::Sender<u64>,
}

impl SearchCoordinator {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        let (state, _) = watch::channel(UiState::Idle);
        let (results, _) = watch::channel(Vec::new());
        let (generation, _) = watch::channel(0);
        Self { inner: Arc::new(Inner { catalog, state, results, generation }) }
    }

    pub fn state(&self) -> watch::Receiver<UiState> {
        self.inner.state.subscribe()
    }

    pub fn results(&self) -> watch::Receiver<Vec<MovieRecord>> {
        self.inner.results.subscribe()
    }

    pub fn current_state(&self) -> UiState {
        self.inner.state.borrow().clone()
    }

    pub fn current_results(&self) -> Vec<MovieRecord> {
        self.inner.results.borrow().clone()
    }

    /// Back to `Idle` with an empty result set. In-flight work is left to finish
    /// but can no longer publish.
    pub fn reset(&self) {
        self.inner.generation.send_modify(|generation| {
            *generation += 1;
            self.inner.results.send_replace(Vec::new());
            self.inner.state.send_replace(UiState::Idle);
        });
    }

    /// Bulk-inserts seed records. The message counts what was submitted.
    pub fn add_seed_movies(&self, records: Vec<MovieRecord>) -> JoinHandle<()> {
        let ticket = self.begin();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let attempted = records.len();
            match inner.catalog.persist_many(records).await {
                Ok(report) => {
                    debug!(attempted = attempted, inserted = report.inserted.len(), "seed movies stored");
                    inner.publish(
                        ticket,
                        Vec::new(),
                        UiState::Success(format!("{attempted} movies added to database")),
                    );
                },
                Err(err) => {
                    warn!(error = %err, "failed to add seed movies");
                    inner.fail(ticket, format!("Failed to add movies: {err}"));
                },
            }
        })
    }

    /// Remote lookup first, then the first local title match.
    pub fn search_by_title(&self, title: &str) -> JoinHandle<()> {
        let ticket = self.begin();
        let inner = self.inner.clone();
        let title = title.trim().to_string();
        tokio::spawn(async move {
            if title.is_empty() {
                inner.fail(ticket, "Please enter a movie title".to_string());
                return;
            }

            match inner.catalog.fetch_and_persist_by_title(&title).await {
                Ok(movie) => {
                    let message = format!("Movie found: {}", movie.title);
                    inner.publish(ticket, vec![movie], UiState::Success(message));
                },
                Err(err @ AppError::PersistenceFailed(_)) => {
                    warn!(title = %title, error = %err, "failed to store looked up movie");
                    inner.fail(ticket, format!("Failed to fetch movie: {err}"));
                },
                Err(err) => {
                    debug!(title = %title, error = %err, "provider lookup failed, trying local store");
                    match inner.catalog.find_exact_first_by_title(&title).await {
                        Ok(movie) => {
                            inner.publish(ticket, vec![movie], UiState::Success("Movie found".to_string()))
                        },
                        Err(_) => inner.fail(
                            ticket,
                            "Movie not found. Please try a different title or use Web Search."
                                .to_string(),
                        ),
                    }
                },
            }
        })
    }

    /// Remote lookup only; the result is stored.
    pub fn save_by_title(&self, title: &str) -> JoinHandle<()> {
        let ticket = self.begin();
        let inner = self.inner.clone();
        let title = title.trim().to_string();
        tokio::spawn(async move {
            if title.is_empty() {
                inner.fail(ticket, "Please enter a movie title".to_string());
                return;
            }

            match inner.catalog.fetch_and_persist_by_title(&title).await {
                Ok(movie) => {
                    let message = format!("Movie \"{}\" saved to database", movie.title);
                    inner.publish(ticket, vec![movie], UiState::Success(message));
                },
                Err(err) => inner.fail(ticket, format!("No movie found with title \"{title}\": {err}")),
            }
        })
    }

    /// Follows the local title query until a newer operation takes over.
    pub fn list_local_by_title(&self, title: &str) -> JoinHandle<()> {
        let ticket = self.begin();
        let inner = self.inner.clone();
        let title = title.trim().to_string();
        tokio::spawn(async move {
            if title.is_empty() {
                inner.fail(ticket, "Please enter a movie title".to_string());
                return;
            }

            let live = inner.catalog.find_by_title_substring(&title);
            inner
                .follow(
                    ticket,
                    live,
                    |count| format!("Found {count} movies"),
                    || format!("No movies found with title \"{title}\""),
                )
                .await;
        })
    }

    pub fn list_local_by_actor(&self, actor: &str) -> JoinHandle<()> {
        let ticket = self.begin();
        let inner = self.inner.clone();
        let actor = actor.trim().to_string();
        tokio::spawn(async move {
            if actor.is_empty() {
                inner.fail(ticket, "Please enter an actor name".to_string());
                return;
            }

            let live = inner.catalog.find_by_actor_substring(&actor);
            inner
                .follow(
                    ticket,
                    live,
                    |count| format!("Found {count} movies with actor \"{actor}\""),
                    || format!("No movies found with actor \"{actor}\""),
                )
                .await;
        })
    }

    /// Provider keyword search; results are shown but never stored.
    pub fn web_search(&self, term: &str) -> JoinHandle<()> {
        let ticket = self.begin();
        let inner = self.inner.clone();
        let term = term.trim().to_string();
        tokio::spawn(async move {
            if term.is_empty() {
                inner.fail(ticket, "Please enter a search term".to_string());
                return;
            }

            match inner.catalog.search_provider_by_keyword(&term).await {
                Ok(movies) if movies.is_empty() => {
                    inner.fail(ticket, format!("No movies found containing \"{term}\""))
                },
                Ok(movies) => {
                    let message = format!("Found {} movies for \"{term}\"", movies.len());
                    inner.publish(ticket, movies, UiState::Success(message));
                },
                Err(err) => inner.fail(ticket, format!("Search failed: {err}")),
            }
        })
    }

    fn begin(&self) -> u64 {
        let mut ticket = 0;
        self.inner.generation.send_modify(|generation| {
            *generation += 1;
            ticket = *generation;
            self.inner.state.send_replace(UiState::Loading);
        });
        ticket
    }
}

impl Inner {
    fn publish(&self, ticket: u64, results: Vec<MovieRecord>, state: UiState) {
        self.generation.send_if_modified(|generation| {
            if *generation == ticket {
                self.results.send_replace(results);
                self.state.send_replace(state);
            } else {
                debug!(ticket = ticket, current = *generation, "dropping stale result");
            }
            false
        });
    }

    fn fail(&self, ticket: u64, message: String) {
        self.publish(ticket, Vec::new(), UiState::Error(message));
    }

    async fn follow(
        &self,
        ticket: u64,
        mut live: BoxStream<'static, AppResult<Vec<MovieRecord>>>,
        found: impl Fn(usize) -> String,
        empty: impl Fn() -> String,
    ) {
        let stop = superseded(self.generation.subscribe(), ticket);
        tokio::pin!(stop);

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut stop => {
                    debug!(ticket = ticket, "live query superseded");
                    return;
                },
                next = live.next() => next,
            };
            let Some(next) = next else { return };

            match next {
                Ok(movies) if movies.is_empty() => self.fail(ticket, empty()),
                Ok(movies) => {
                    let message = found(movies.len());
                    self.publish(ticket, movies, UiState::Success(message));
                },
                Err(err) => {
                    self.fail(ticket, format!("Search failed: {err}"));
                    return;
                },
            }
        }
    }
}

/// Resolves once the generation moves past `ticket`.
async fn superseded(mut generation: watch::Receiver<u64>, ticket: u64) {
    while *generation.borrow_and_update() == ticket {
        if generation.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        error::AppError,
        models::BasicListing,
        omdb::MockMovieInfoProvider,
        store::{
            MovieStore,
            tests::{broken_store, memory_store, movie},
        },
    };

    fn coordinator(store: &MovieStore, mut provider: MockMovieInfoProvider) -> SearchCoordinator {
        provider.expect_name().return_const("mock");
        SearchCoordinator::new(Arc::new(CatalogService::new(store.clone(), Arc::new(provider), 1)))
    }

    fn failing_lookup() -> MockMovieInfoProvider {
        let mut provider = MockMovieInfoProvider::new();
        provider
            .expect_lookup_by_title()
            .returning(|_| Err(AppError::FetchFailed("Movie not found!".to_string())));
        provider
    }

    async fn settle(coordinator: &SearchCoordinator) -> UiState {
        let mut rx = coordinator.state();
        let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(UiState::is_terminal))
            .await
            .expect("no terminal state published")
            .unwrap();
        state.clone()
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let store = memory_store().await;
        let coordinator = coordinator(&store, MockMovieInfoProvider::new());
        assert_eq!(coordinator.current_state(), UiState::Idle);
        assert!(coordinator.current_results().is_empty());
    }

    #[tokio::test]
    async fn test_add_seed_movies_empty() {
        let store = memory_store().await;
        let coordinator = coordinator(&store, MockMovieInfoProvider::new());

        let handle = coordinator.add_seed_movies(Vec::new());
        assert_eq!(coordinator.current_state(), UiState::Loading);
        handle.await.unwrap();

        assert_eq!(
            coordinator.current_state(),
            UiState::Success("0 movies added to database".to_string())
        );
        assert!(store.ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_seed_movies_reports_attempted_count() {
        let store = memory_store().await;
        store.upsert(&movie("tt0133093", "The Matrix", "Keanu Reeves")).await.unwrap();
        let coordinator = coordinator(&store, MockMovieInfoProvider::new());

        coordinator.add_seed_movies(crate::seed::predefined_movies()).await.unwrap();

        assert_eq!(
            coordinator.current_state(),
            UiState::Success("5 movies added to database".to_string())
        );
        assert_eq!(store.ids().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_search_by_title_uses_provider() {
        let store = memory_store().await;
        let mut provider = MockMovieInfoProvider::new();
        provider
            .expect_lookup_by_title()
            .returning(|_| Ok(movie("tt1375666", "Inception", "Leonardo DiCaprio")));
        let coordinator = coordinator(&store, provider);

        coordinator.search_by_title("Inception").await.unwrap();

        assert_eq!(coordinator.current_state(), UiState::Success("Movie found: Inception".to_string()));
        assert_eq!(coordinator.current_results().len(), 1);
        assert!(store.get("tt1375666").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_by_title_falls_back_to_local() {
        let store = memory_store().await;
        store.upsert(&movie("tt0133093", "The Matrix", "Keanu Reeves")).await.unwrap();
        let coordinator = coordinator(&store, failing_lookup());

        coordinator.search_by_title("Matrix").await.unwrap();

        assert_eq!(coordinator.current_state(), UiState::Success("Movie found".to_string()));
        assert_eq!(coordinator.current_results()[0].id, "tt0133093");
    }

    #[tokio::test]
    async fn test_search_by_title_double_failure_suggests_web_search() {
        let store = memory_store().await;
        let coordinator = coordinator(&store, failing_lookup());

        coordinator.search_by_title("Paddington").await.unwrap();

        match coordinator.current_state() {
            UiState::Error(message) => assert!(message.contains("Web Search")),
            other => panic!("unexpected state {other:?}"),
        }
        assert!(coordinator.current_results().is_empty());
    }

    #[tokio::test]
    async fn test_save_by_title_has_no_local_fallback() {
        let store = memory_store().await;
        store.upsert(&movie("tt0133093", "The Matrix", "Keanu Reeves")).await.unwrap();
        let coordinator = coordinator(&store, failing_lookup());

        coordinator.save_by_title("The Matrix").await.unwrap();

        match coordinator.current_state() {
            UiState::Error(message) => {
                assert!(message.starts_with("No movie found with title \"The Matrix\""))
            },
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_inputs_short_circuit() {
        let store = memory_store().await;
        let coordinator = coordinator(&store, MockMovieInfoProvider::new());

        coordinator.web_search("   ").await.unwrap();
        assert_eq!(coordinator.current_state(), UiState::Error("Please enter a search term".to_string()));

        coordinator.list_local_by_actor("").await.unwrap();
        assert_eq!(coordinator.current_state(), UiState::Error("Please enter an actor name".to_string()));
    }

    #[tokio::test]
    async fn test_web_search_publishes_without_storing() {
        let store = memory_store().await;
        let mut provider = MockMovieInfoProvider::new();
        provider.expect_search().returning(|_, _| {
            Ok(vec![BasicListing {
                id: "tt0372784".to_string(),
                title: "Batman Begins".to_string(),
                year: "2005".to_string(),
            }])
        });
        provider
            .expect_lookup_by_id()
            .returning(|id| Ok(movie(id, "Batman Begins", "Christian Bale")));
        let coordinator = coordinator(&store, provider);

        coordinator.web_search("batman").await.unwrap();

        assert_eq!(
            coordinator.current_state(),
            UiState::Success("Found 1 movies for \"batman\"".to_string())
        );
        assert_eq!(coordinator.current_results()[0].actors, "Christian Bale");
        assert!(store.ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_web_search_empty_result_is_error() {
        let store = memory_store().await;
        let mut provider = MockMovieInfoProvider::new();
        provider.expect_search().returning(|_, _| Ok(Vec::new()));
        let coordinator = coordinator(&store, provider);

        coordinator.web_search("qqqq").await.unwrap();
        assert_eq!(
            coordinator.current_state(),
            UiState::Error("No movies found containing \"qqqq\"".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_local_by_actor_follows_writes() {
        let store = memory_store().await;
        let coordinator = coordinator(&store, MockMovieInfoProvider::new());

        let handle = coordinator.list_local_by_actor("cruise");
        let first = settle(&coordinator).await;
        assert_eq!(first, UiState::Error("No movies found with actor \"cruise\"".to_string()));

        let mut rx = coordinator.state();
        rx.borrow_and_update();
        store.upsert(&movie("tt0325710", "The Last Samurai", "Tom Cruise")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), rx.changed()).await.unwrap().unwrap();
        assert_eq!(
            coordinator.current_state(),
            UiState::Success("Found 1 movies with actor \"cruise\"".to_string())
        );
        assert_eq!(coordinator.current_results()[0].id, "tt0325710");

        coordinator.reset();
        assert_eq!(coordinator.current_state(), UiState::Idle);
        store.upsert(&movie("tt0092099", "Top Gun", "Tom Cruise")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert_eq!(coordinator.current_state(), UiState::Idle);
        assert!(coordinator.current_results().is_empty());
    }

    #[tokio::test]
    async fn test_list_local_by_title_success() {
        let store = memory_store().await;
        store.upsert(&movie("tt0372784", "Batman Begins", "Christian Bale")).await.unwrap();
        store.upsert(&movie("tt0468569", "The Dark Knight", "Christian Bale")).await.unwrap();
        let coordinator = coordinator(&store, MockMovieInfoProvider::new());

        let _live = coordinator.list_local_by_title("BATMAN");
        assert_eq!(settle(&coordinator).await, UiState::Success("Found 1 movies".to_string()));
        assert_eq!(coordinator.current_results()[0].title, "Batman Begins");
    }

    #[tokio::test]
    async fn test_newer_operation_wins() {
        let store = memory_store().await;
        let mut provider = MockMovieInfoProvider::new();
        provider
            .expect_lookup_by_title()
            .returning(|_| Ok(movie("tt1375666", "Inception", "Leonardo DiCaprio")));
        let coordinator = coordinator(&store, provider);

        let slow = coordinator.save_by_title("Inception");
        coordinator.reset();
        slow.await.unwrap();

        assert_eq!(coordinator.current_state(), UiState::Idle);
        assert!(coordinator.current_results().is_empty());
    }

    #[tokio::test]
    async fn test_search_by_title_reports_store_failure() {
        let store = broken_store().await;
        let mut provider = MockMovieInfoProvider::new();
        provider
            .expect_lookup_by_title()
            .returning(|_| Ok(movie("tt1375666", "Inception", "Leonardo DiCaprio")));
        let coordinator = coordinator(&store, provider);

        coordinator.search_by_title("Inception").await.unwrap();

        match coordinator.current_state() {
            UiState::Error(message) => {
                assert!(message.starts_with("Failed to fetch movie: Persistence failed"), "{message}")
            },
            other => panic!("unexpected state {other:?}"),
        }
        assert!(coordinator.current_results().is_empty());
    }

    #[tokio::test]
    async fn test_add_seed_movies_reports_store_failure() {
        let store = broken_store().await;
        let coordinator = coordinator(&store, MockMovieInfoProvider::new());

        coordinator.add_seed_movies(crate::seed::predefined_movies()).await.unwrap();

        match coordinator.current_state() {
            UiState::Error(message) => {
                assert!(message.starts_with("Failed to add movies: Persistence failed"), "{message}")
            },
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_superseded_live_queries_end_without_writes() {
        let store = memory_store().await;
        store.upsert(&movie("tt0325710", "The Last Samurai", "Tom Cruise")).await.unwrap();
        let coordinator = coordinator(&store, MockMovieInfoProvider::new());

        let mut handles = Vec::new();
        for _ in 0..50 {
            handles.push(coordinator.list_local_by_actor("cruise"));
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        coordinator.reset();

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("superseded live query kept running")
                .unwrap();
        }
        assert_eq!(coordinator.current_state(), UiState::Idle);
        assert!(coordinator.current_results().is_empty());
    }

    #[tokio::test]
    async fn test_stale_result_never_replaces_newer_loading() {
        let store = memory_store().await;
        let mut provider = MockMovieInfoProvider::new();
        provider
            .expect_lookup_by_title()
            .returning(|_| Ok(movie("tt1375666", "Inception", "Leonardo DiCaprio")));
        let coordinator = coordinator(&store, provider);

        let stale = coordinator.save_by_title("Inception");
        let ticket = coordinator.begin();
        stale.await.unwrap();
        assert_eq!(coordinator.current_state(), UiState::Loading);

        coordinator.inner.fail(ticket, "done".to_string());
        assert_eq!(coordinator.current_state(), UiState::Error("done".to_string()));
    }
}
