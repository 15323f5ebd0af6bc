pub mod cursor_store;
pub mod token_cache;

pub use cursor_store::CursorStore;
pub use token_cache::TokenCache;
