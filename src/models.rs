use serde::{Deserialize, Serialize};

/// Placeholder used for fields a keyword search listing does not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// One movie's metadata, keyed by its external id.
///
/// Every field is a plain string; a missing value is the empty string.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
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
    pub plot: String,
}

impl MovieRecord {
    /// A record may only be persisted once both its title and id are non-blank.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.id.trim().is_empty()
    }

    /// Assigns a fresh id when the provider left it blank.
    pub fn with_generated_id(mut self) -> Self {
        if self.id.trim().is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
        self
    }
}

/// A keyword search hit before it is enriched with a detail lookup.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BasicListing {
    pub id: String,
    pub title: String,
    pub year: String,
}

impl BasicListing {
    pub fn into_record(self) -> MovieRecord {
        MovieRecord {
            id: self.id,
            title: self.title,
            release_year: self.year,
            age_rating: NOT_AVAILABLE.to_string(),
            release_date: NOT_AVAILABLE.to_string(),
            runtime: NOT_AVAILABLE.to_string(),
            genre: NOT_AVAILABLE.to_string(),
            director: NOT_AVAILABLE.to_string(),
            writer: NOT_AVAILABLE.to_string(),
            actors: NOT_AVAILABLE.to_string(),
            plot: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Outcome of a bulk insert.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct PersistReport {
    pub inserted: Vec<String>,
    pub skipped_invalid: Vec<String>,
    pub skipped_existing: Vec<String>,
}

/// What the presentation side observes about the latest operation.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum UiState {
    #[default]
    Idle,
    Loading,
    Success(String),
    Error(String),
}

impl UiState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UiState::Success(_) | UiState::Error(_))
    }
}
