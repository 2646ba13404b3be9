use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{Album, AlbumId, AlbumRepository, CoreError, NewAlbum};

/// Simple in-memory repository for tests.
///
/// Hands out sequential integer ids like a relational backend would, so
/// `get_all` returns albums in insertion order.
pub struct InMemoryAlbumRepo {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    albums: BTreeMap<u64, Album>,
}

impl InMemoryAlbumRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State {
                next_id: 1,
                albums: BTreeMap::new(),
            }),
        }
    }

    fn key(id: &AlbumId) -> Result<u64, CoreError> {
        id.as_str()
            .parse::<u64>()
            .map_err(|e| CoreError::InvalidIdentifier(format!("{:?}: {}", id.as_str(), e)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::StorageUnavailable("mutex poisoned".into()))
    }
}

impl Default for InMemoryAlbumRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl AlbumRepository for InMemoryAlbumRepo {
    fn get_all(&self) -> Result<Vec<Album>, CoreError> {
        let state = self.lock()?;
        Ok(state.albums.values().cloned().collect())
    }

    fn get_by_id(&self, id: &AlbumId) -> Result<Album, CoreError> {
        let key = Self::key(id)?;
        let state = self.lock()?;
        state.albums.get(&key).cloned().ok_or(CoreError::NotFound)
    }

    fn create(&self, album: &NewAlbum) -> Result<AlbumId, CoreError> {
        let mut state = self.lock()?;
        let key = state.next_id;
        state.next_id += 1;
        let id = AlbumId::new(key.to_string());
        state
            .albums
            .insert(key, Album::from_new(id.clone(), album.clone()));
        Ok(id)
    }

    fn update(&self, album: &Album) -> Result<(), CoreError> {
        let key = Self::key(&album.id)?;
        let mut state = self.lock()?;
        match state.albums.get_mut(&key) {
            Some(stored) => {
                *stored = album.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound),
        }
    }

    fn delete(&self, id: &AlbumId) -> Result<(), CoreError> {
        let key = Self::key(id)?;
        let mut state = self.lock()?;
        state
            .albums
            .remove(&key)
            .map(|_| ())
            .ok_or(CoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(title: &str) -> NewAlbum {
        NewAlbum {
            title: title.into(),
            artist: "Aretha Franklin".into(),
            price: 35.5,
            year: 1968,
            image_url: "https://example.com/lady-soul.jpg".into(),
            genre: "Soul".into(),
        }
    }

    #[test]
    fn create_assigns_fresh_sequential_ids() {
        let repo = InMemoryAlbumRepo::new();
        let a = repo.create(&sample("Lady Soul")).unwrap();
        let b = repo.create(&sample("Aretha Now")).unwrap();
        assert_eq!(a.as_str(), "1");
        assert_eq!(b.as_str(), "2");

        let all = repo.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Lady Soul");
        assert_eq!(all[1].title, "Aretha Now");
    }

    #[test]
    fn delete_twice_reports_not_found() {
        let repo = InMemoryAlbumRepo::new();
        let id = repo.create(&sample("Lady Soul")).unwrap();
        repo.delete(&id).unwrap();
        assert_eq!(repo.delete(&id).unwrap_err(), CoreError::NotFound);
    }

    #[test]
    fn malformed_ids_are_invalid_identifiers() {
        let repo = InMemoryAlbumRepo::new();
        let bad = AlbumId::from("not-a-number");
        assert!(matches!(repo.get_by_id(&bad), Err(CoreError::InvalidIdentifier(_))));
        assert!(matches!(repo.delete(&bad), Err(CoreError::InvalidIdentifier(_))));
        let album = Album::from_new(bad, sample("x"));
        assert!(matches!(repo.update(&album), Err(CoreError::InvalidIdentifier(_))));
    }

    #[test]
    fn missing_id_is_not_found() {
        let repo = InMemoryAlbumRepo::new();
        assert_eq!(
            repo.get_by_id(&AlbumId::from("12")).unwrap_err(),
            CoreError::NotFound
        );
    }
}
