pub mod document;
pub mod encryption;
pub mod format;
pub mod session;
pub mod vault;
