pub mod file_tail_adapter;
pub mod pushgateway_adapter;

pub use file_tail_adapter::{FileTailFactory, FileTailer};
pub use pushgateway_adapter::PushgatewayPublisher;
