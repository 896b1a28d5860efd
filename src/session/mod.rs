mod selector;
mod store;

pub(crate) use selector::parse_selection;
pub use selector::{print_sessions, select_session};
pub use store::SessionStore;
