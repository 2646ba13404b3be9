//! Lightweight input validation helpers. Keep logic minimal and deterministic.
//!
//! Storage does not enforce any of these rules; they apply at the boundary
//! before an album reaches a repository.

use crate::{CoreError, NewAlbum};

/// Validate the fields of an album about to be created or replaced.
pub fn validate_album(album: &NewAlbum) -> Result<(), CoreError> {
    require_text("title", &album.title)?;
    require_text("artist", &album.artist)?;
    if !album.price.is_finite() || album.price < 0.0 {
        return Err(CoreError::InvalidArgument(
            "price must be a non-negative number".into(),
        ));
    }
    if album.year <= 0 {
        return Err(CoreError::InvalidArgument("year must be positive".into()));
    }
    require_text("imageUrl", &album.image_url)?;
    require_text("genre", &album.genre)?;
    Ok(())
}

/// Validate a catalog search term. Returns the trimmed term.
pub fn validate_search_term(term: &str) -> Result<&str, CoreError> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument(
            "search term cannot be empty".into(),
        ));
    }
    Ok(trimmed)
}

fn require_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidArgument(format!(
            "{} is required and cannot be empty",
            field
        )));
    }
    Ok(())
}
