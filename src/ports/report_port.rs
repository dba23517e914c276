//! Report output port.

use crate::domain::error::ForwardtestError;
use crate::domain::walk_forward::ReportRecord;

pub trait ReportPort {
    fn write(&self, records: &[ReportRecord], output_path: &str) -> Result<(), ForwardtestError>;
}
