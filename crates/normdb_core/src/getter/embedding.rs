//! Host-state embedding.

use crate::schema::Schema;
use crate::storage::BackingStorage;

/// Maps a host state value to the backing storage it embeds.
///
/// Getters built by a [`Database`](crate::Database) take the host state as
/// input, so they work with any state shape that carries a storage of the
/// right schema. A getter for one schema cannot be fed a host of another:
/// the `Schema` associated type must match at compile time.
///
/// ```rust,ignore
/// struct AppState {
///     library: Arc<BackingStorage<Library>>,
///     selected: Option<EntityId>,
/// }
///
/// impl DatabaseEmbedding for AppState {
///     type Schema = Library;
///     fn backing_storage(&self) -> &BackingStorage<Library> {
///         &self.library
///     }
/// }
/// ```
pub trait DatabaseEmbedding: 'static {
    /// Schema of the embedded storage.
    type Schema: Schema;

    /// Returns the embedded storage.
    fn backing_storage(&self) -> &BackingStorage<Self::Schema>;
}

impl<S: Schema> DatabaseEmbedding for BackingStorage<S> {
    type Schema = S;

    fn backing_storage(&self) -> &BackingStorage<S> {
        self
    }
}
