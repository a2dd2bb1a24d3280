pub mod dashboard;
pub mod modal;
pub mod sheet;
