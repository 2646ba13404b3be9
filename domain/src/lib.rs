//! Domain library for the record catalog.
//!
//! This crate is dependency-free (inherits workspace metadata only) and holds
//! the domain types, ports (traits), and error definitions. Keep adapters and
//! IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque album identifier.
///
/// Each storage backend owns the encoding (decimal integer, time UUID, ...).
/// The domain only ever compares ids as strings.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlbumId(String);

impl AlbumId {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for AlbumId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AlbumId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AlbumId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Input data for an album that has not been assigned an identity yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAlbum {
    pub title: String,
    pub artist: String,
    pub price: f64,
    pub year: i32,
    pub image_url: String,
    pub genre: String,
}

/// Stored album record.
#[derive(Clone, Debug, PartialEq)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub artist: String,
    pub price: f64,
    pub year: i32,
    pub image_url: String,
    pub genre: String,
}

impl Album {
    /// Attach an assigned identity to a new album.
    pub fn from_new(id: AlbumId, new: NewAlbum) -> Self {
        Self {
            id,
            title: new.title,
            artist: new.artist,
            price: new.price,
            year: new.year,
            image_url: new.image_url,
            genre: new.genre,
        }
    }

    /// Everything except the identity.
    pub fn to_new(&self) -> NewAlbum {
        NewAlbum {
            title: self.title.clone(),
            artist: self.artist.clone(),
            price: self.price,
            year: self.year,
            image_url: self.image_url.clone(),
            genre: self.genre.clone(),
        }
    }
}

/// One album as reported by the external catalog search. Never persisted.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct AlbumResponse {
    pub title: String,
    pub artist: String,
    pub price: f64,
    pub year: i32,
    pub genre: String,
    pub image_url: String,
}

/// Repository port for persisting and loading albums.
///
/// Implementations are selected once at startup and shared across requests,
/// so they must be usable from many threads at once.
pub trait AlbumRepository: Send + Sync {
    /// All stored albums. Ordering is backend-defined.
    fn get_all(&self) -> Result<Vec<Album>, CoreError>;
    fn get_by_id(&self, id: &AlbumId) -> Result<Album, CoreError>;
    /// Persist a new album and return the identity the backend assigned.
    fn create(&self, album: &NewAlbum) -> Result<AlbumId, CoreError>;
    /// Replace every field of an existing album except its id.
    fn update(&self, album: &Album) -> Result<(), CoreError>;
    fn delete(&self, id: &AlbumId) -> Result<(), CoreError>;
    /// Release pooled connections or sessions. Safe to call more than once;
    /// afterwards every operation fails with `StorageUnavailable`.
    fn close(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Port for the external album catalog search.
pub trait AlbumSearch: Send + Sync {
    fn search(&self, term: &str) -> Result<Vec<AlbumResponse>, CoreError>;
}

/// Core domain errors (no external error crates to keep deps at zero).
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    InvalidArgument(String),
    InvalidIdentifier(String),
    NotFound,
    StorageUnavailable(String),
    /// The external search endpoint failed. `status` is set when the endpoint
    /// answered with a non-success HTTP status.
    Upstream {
        status: Option<u16>,
        message: String,
    },
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            CoreError::InvalidIdentifier(msg) => write!(f, "invalid identifier: {}", msg),
            CoreError::NotFound => write!(f, "not found"),
            CoreError::StorageUnavailable(msg) => write!(f, "storage unavailable: {}", msg),
            CoreError::Upstream {
                status: Some(code),
                message,
            } => write!(f, "upstream returned status {}: {}", code, message),
            CoreError::Upstream {
                status: None,
                message,
            } => write!(f, "upstream error: {}", message),
        }
    }
}

impl Error for CoreError {}

pub mod adapters;
pub mod service;
pub mod validate;
