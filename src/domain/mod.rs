pub mod event;
pub mod helpers;

pub use event::{event_id, Event, LocationType};
pub use helpers::{detect_location_type, normalize_cost, parse_speakers};
