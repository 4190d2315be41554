mod config_cmd;
mod log_cmd;
mod plan_cmd;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use log_cmd::LogCommand;
pub use plan_cmd::PlanCommand;
pub use sync_cmd::SyncCommand;
