pub mod forecast;
pub mod listings;
pub mod statistics;
