use std::sync::Arc;

use crate::validate::validate_album;
use crate::{Album, AlbumId, AlbumRepository, AlbumResponse, AlbumSearch, CoreError, NewAlbum};

/// Application service in front of the album repository and catalog search.
///
/// It is the boundary where album fields are validated; repositories accept
/// whatever they are given. It stays generic over both ports so tests can use
/// the in-memory adapter while the server uses trait objects.
pub struct CatalogService<R: AlbumRepository + ?Sized, S: AlbumSearch + ?Sized> {
    repo: Arc<R>,
    search: Arc<S>,
}

impl<R: AlbumRepository + ?Sized, S: AlbumSearch + ?Sized> Clone for CatalogService<R, S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            search: Arc::clone(&self.search),
        }
    }
}

impl<R: AlbumRepository + ?Sized, S: AlbumSearch + ?Sized> CatalogService<R, S> {
    pub fn new(repo: Arc<R>, search: Arc<S>) -> Self {
        Self { repo, search }
    }

    /// List every stored album.
    pub fn list(&self) -> Result<Vec<Album>, CoreError> {
        self.repo.get_all()
    }

    pub fn get(&self, id: &AlbumId) -> Result<Album, CoreError> {
        self.repo.get_by_id(id)
    }

    /// Validate and persist a new album, returning it with its assigned id.
    pub fn create(&self, input: NewAlbum) -> Result<Album, CoreError> {
        validate_album(&input)?;
        let id = self.repo.create(&input)?;
        Ok(Album::from_new(id, input))
    }

    /// Validate and fully replace the album stored under `id`.
    pub fn replace(&self, id: AlbumId, input: NewAlbum) -> Result<Album, CoreError> {
        validate_album(&input)?;
        let album = Album::from_new(id, input);
        self.repo.update(&album)?;
        Ok(album)
    }

    pub fn delete(&self, id: &AlbumId) -> Result<(), CoreError> {
        self.repo.delete(id)
    }

    /// Search the external catalog.
    pub fn search(&self, term: &str) -> Result<Vec<AlbumResponse>, CoreError> {
        self.search.search(term)
    }

    /// Release the repository's connections.
    pub fn close(&self) -> Result<(), CoreError> {
        self.repo.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::InMemoryAlbumRepo;

    struct NoSearch;
    impl AlbumSearch for NoSearch {
        fn search(&self, _term: &str) -> Result<Vec<AlbumResponse>, CoreError> {
            Ok(Vec::new())
        }
    }

    fn svc() -> CatalogService<InMemoryAlbumRepo, NoSearch> {
        CatalogService::new(Arc::new(InMemoryAlbumRepo::new()), Arc::new(NoSearch))
    }

    fn new_album(title: &str) -> NewAlbum {
        NewAlbum {
            title: title.to_string(),
            artist: "Y".into(),
            price: 9.99,
            year: 1970,
            image_url: "https://example.com/x.jpg".into(),
            genre: "Soul".into(),
        }
    }

    #[test]
    fn create_list_delete_scenario() {
        let svc = svc();
        assert!(svc.list().unwrap().is_empty());

        let created = svc.create(new_album("X")).expect("created");
        let all = svc.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "X");
        assert_eq!(all[0].id, created.id);

        svc.delete(&created.id).unwrap();
        assert!(svc.list().unwrap().is_empty());
    }

    #[test]
    fn create_rejects_invalid_album() {
        let svc = svc();
        let mut bad = new_album("X");
        bad.price = -1.0;
        let err = svc.create(bad).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(svc.list().unwrap().is_empty());
    }

    #[test]
    fn replace_changes_fields_but_not_id() {
        let svc = svc();
        let created = svc.create(new_album("X")).unwrap();

        let mut changed = new_album("Z");
        changed.artist = "W".into();
        changed.price = 1.5;
        changed.year = 1999;
        changed.genre = "Funk".into();
        svc.replace(created.id.clone(), changed.clone()).unwrap();

        let got = svc.get(&created.id).unwrap();
        assert_eq!(got.id, created.id);
        assert_eq!(got.to_new(), changed);
    }

    #[test]
    fn replace_missing_is_not_found() {
        let svc = svc();
        let err = svc
            .replace(AlbumId::from("99"), new_album("X"))
            .unwrap_err();
        assert_eq!(err, CoreError::NotFound);
    }
}
