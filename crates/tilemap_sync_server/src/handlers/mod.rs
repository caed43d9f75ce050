pub mod api;
pub mod room_context;
pub mod ws;

pub use api::{ApiState, api_routes};
pub use room_context::{ROOM_HEADER, RoomContext};
