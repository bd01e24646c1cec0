mod borough;
mod tract_id;
mod zone_id;

pub use borough::Borough;
pub use tract_id::{TractId, TractIdError};
pub use zone_id::ZoneId;
