// urlnav state managers
// Managers own mutable state: the bookmark tree and its search cursor.

pub mod tree_search;
pub mod tree_store;
