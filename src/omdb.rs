use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    models::{BasicListing, MovieRecord},
};

/// Remote movie metadata lookups.
///
/// Transport errors, non-success statuses and payloads that carry an explicit
/// error all come back as [`AppError::FetchFailed`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieInfoProvider: Send + Sync {
    /// Full record for the best match of `title`.
    async fn lookup_by_title(&self, title: &str) -> AppResult<MovieRecord>;

    /// Full record for an external id.
    async fn lookup_by_id(&self, id: &str) -> AppResult<MovieRecord>;

    /// One page of basic listings for a keyword. Pages hold up to ten entries.
    async fn search(&self, term: &str, page: u32) -> AppResult<Vec<BasicListing>>;

    fn name(&self) -> &'static str;
}

pub struct OmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OmdbClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no OMDB_API_KEY provided, provider lookups will be rejected");
        }
        Self { client, api_key, base_url }
    }

    async fn get(&self, params: &[(&str, &str)]) -> AppResult<String> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::FetchFailed(format!("OMDb returned status {status}: {body}")));
        }

        Ok(resp.text().await?)
    }
}

#[async_trait::async_trait]
impl MovieInfoProvider for OmdbClient {
    async fn lookup_by_title(&self, title: &str) -> AppResult<MovieRecord> {
        debug!(title = %title, "looking up movie by title");
        let body = self.get(&[("t", title)]).await?;
        parse_movie(&body)
    }

    async fn lookup_by_id(&self, id: &str) -> AppResult<MovieRecord> {
        debug!(id = %id, "looking up movie by id");
        let body = self.get(&[("i", id)]).await?;
        parse_movie(&body)
    }

    async fn search(&self, term: &str, page: u32) -> AppResult<Vec<BasicListing>> {
        let page = page.max(1).to_string();
        debug!(term = %term, page = %page, "searching movies");
        let body = self.get(&[("s", term), ("page", page.as_str())]).await?;
        let listings = parse_search(&body)?;
        debug!(term = %term, listings = listings.len(), "search returned");
        Ok(listings)
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}

fn parse_movie(body: &str) -> AppResult<MovieRecord> {
    if body.trim().is_empty() {
        return Err(AppError::FetchFailed("empty response body".to_string()));
    }

    let resp: MovieResponse = serde_json::from_str(body)?;
    check_response(resp.response.as_deref(), resp.error)?;

    let movie = MovieRecord {
        id: resp.imdb_id.unwrap_or_default(),
        title: resp.title.unwrap_or_default(),
        release_year: resp.year.unwrap_or_default(),
        age_rating: resp.rated.unwrap_or_default(),
        release_date: resp.released.unwrap_or_default(),
        runtime: resp.runtime.unwrap_or_default(),
        genre: resp.genre.unwrap_or_default(),
        director: resp.director.unwrap_or_default(),
        writer: resp.writer.unwrap_or_default(),
        actors: resp.actors.unwrap_or_default(),
        plot: resp.plot.unwrap_or_default(),
    };

    Ok(movie.with_generated_id())
}

fn parse_search(body: &str) -> AppResult<Vec<BasicListing>> {
    if body.trim().is_empty() {
        return Err(AppError::FetchFailed("empty response body".to_string()));
    }

    let resp: SearchResponse = serde_json::from_str(body)?;
    check_response(resp.response.as_deref(), resp.error)?;

    let listings = resp
        .search
        .into_iter()
        .map(|hit| BasicListing {
            id: hit
                .imdb_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title: hit.title.unwrap_or_default(),
            year: hit.year.unwrap_or_default(),
        })
        .collect();

    Ok(listings)
}

fn check_response(response: Option<&str>, error: Option<String>) -> AppResult<()> {
    if let Some(error) = error {
        return Err(AppError::FetchFailed(error));
    }
    if response.is_some_and(|r| r.eq_ignore_ascii_case("false")) {
        return Err(AppError::FetchFailed("provider reported failure".to_string()));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct MovieResponse {
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    title: Option<String>,
    year: Option<String>,
    rated: Option<String>,
    released: Option<String>,
    runtime: Option<String>,
    genre: Option<String>,
    director: Option<String>,
    writer: Option<String>,
    actors: Option<String>,
    plot: Option<String>,
    response: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SearchResponse {
    search: Vec<SearchHit>,
    response: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SearchHit {
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    title: Option<String>,
    year: Option<String>,
}
