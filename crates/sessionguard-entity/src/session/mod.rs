//! Session domain entities.

pub mod fields;
pub mod login_time;
pub mod record;
pub mod view;

pub use login_time::decode_login_time;
pub use record::SessionRecord;
pub use view::{SessionDetail, SessionView};
