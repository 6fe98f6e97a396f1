pub mod export;
pub mod grouping;
pub mod records;
pub mod severity;
pub mod trends;
