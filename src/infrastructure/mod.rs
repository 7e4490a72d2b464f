// CSV-backed quote source
pub mod csv_history;

pub use csv_history::CsvQuoteSource;
