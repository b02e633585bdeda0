mod change;
mod shot;
mod table;

pub use change::{ChangeAction, ChangeRecord, Payload};
pub use shot::{analyze, HitZone, ShotAssessment, ShotObservation, TRACKING_DOG};
pub use table::SyncTable;
