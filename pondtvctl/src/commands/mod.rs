pub mod channels;
pub mod guide;
pub mod playlists;
pub mod schedule;
pub mod stream;
