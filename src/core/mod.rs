mod txn;

pub use txn::{coerce_amount, Category, Kind, Transaction};
pub(crate) use txn::DATE_FORMAT;
