mod task;

pub use task::{CompletionEntry, DEFAULT_GRACE_PERIOD_MINUTES, RecurrenceKind, Task};
