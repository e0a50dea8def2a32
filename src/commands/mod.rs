pub mod convert;
pub mod query;
pub mod scrape;
