pub mod anchors;
pub mod board;
pub mod models;
pub mod report;
pub mod scoring;
