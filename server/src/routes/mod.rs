pub mod playback;
pub mod search;
pub mod stream;
pub mod system;
pub mod users;
