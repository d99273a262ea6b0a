pub mod dashboard;
pub mod desktop;
pub mod notifications;
pub mod sound;
