//! IMAP command handlers for the fake server.
//!
//! One module per command. Read handlers get a snapshot of the
//! mailbox; write handlers (COPY, STORE, EXPUNGE, CLOSE) lock the
//! shared state briefly, never across an await.

mod capability;
mod expunge;
mod select;
mod uid_search;

pub use capability::handle_capability;
pub use close::handle_close;
pub use expunge::handle_expunge;
pub use login::handle_login;
pub use logout::handle_logout;
pub use noop::handle_noop;
pub use select::handle_select;
pub use uid_copy::handle_uid_copy;
pub use uid_fetch::handle_uid_fetch;
pub use uid_search::handle_uid_search;
pub use uid_store::handle_uid_store;
