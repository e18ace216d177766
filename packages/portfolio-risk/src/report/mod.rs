//! Risk report assembly.
//!
//! The assembler drives every engine over one dataset; the rules module
//! turns the resulting metrics into a risk level and recommendations.

mod assembler;
pub mod rules;

pub use assembler::{AssemblerState, ExecutiveSummary, ReportPeriod, RiskReport, RiskReportAssembler};
