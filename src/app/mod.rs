pub mod monitor_use_case;
pub mod ports;
pub mod supervisor_use_case;

pub use monitor_use_case::{MonitorOutcome, MonitorReport, MonitorStats, SourceMonitor};
pub use supervisor_use_case::Supervisor;
