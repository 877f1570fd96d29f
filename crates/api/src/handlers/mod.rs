pub mod analytics;
pub mod audio;
pub mod catalogs;
pub mod tickets;
