// Library management module
// Scanning, indexing, the in-memory track library and favorites

pub mod collection;
pub mod favorites;
pub mod indexer;
pub mod scanner;

pub use collection::TrackLibrary;
pub use favorites::FavoritesSync;
pub use indexer::{IndexingResult, LibraryIndexer};
pub use scanner::DirectoryScanner;
