pub mod ai;
pub mod board;
pub mod mailer;
pub mod report;
