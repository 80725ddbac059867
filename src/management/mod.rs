mod auth;
mod bundle;
mod cursor;
mod library;
mod session;

pub use auth::TokenManager;
pub use bundle::BundleManager;
pub use cursor::CursorManager;
pub use library::LibraryManager;
pub use session::SessionManager;
