mod config_cmd;
mod todo;
mod watch;

pub use config_cmd::ConfigCommand;
pub use todo::TodoCommand;
pub use watch::WatchCommand;
