/// Domain types shared by the controllers, the store, and the views
pub mod advisory;
pub mod schedule;
pub mod user;

pub use advisory::{AdvisoryRequest, AdvisoryStatus, AdvisoryType, WireAdvisory};
pub use schedule::{AvailableSlot, DayOfWeek, NewWindow, ScheduleWindow, TimeOfDay, TimeRange};
pub use user::{Professor, Role, User};
