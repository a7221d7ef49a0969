//! Data access port trait.

use crate::domain::error::DcaError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `ticker` in timestamp order, restricted to the inclusive date range
    /// when bounds are given.
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, DcaError>;

    fn list_symbols(&self) -> Result<Vec<String>, DcaError>;
}
