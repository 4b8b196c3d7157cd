pub mod clock;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ttl::{Cached, TtlCache, TtlCell};
