// urlnav services
// Services move the bookmark tree to and from disk and hold configuration.

pub mod backup;
pub mod interchange;
pub mod random_pick;
pub mod settings_engine;
