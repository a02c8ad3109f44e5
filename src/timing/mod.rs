pub mod clock;
pub mod daily;
pub mod hours;
pub mod schedule;
