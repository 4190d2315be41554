use clap::{Args, Subcommand};

use coachtrack::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Show the resolved configuration
    Show,

    /// Write a template config file if none exists
    Init,
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show => {
                println!("database_path: {}", config.database_path.display());
                println!("modified_by: {}", config.modified_by);
                println!(
                    "sync.server_url: {}",
                    config.sync.server_url.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "sync.client_name: {}",
                    config.sync.client_name.as_deref().unwrap_or("(not set)")
                );
                println!("sync.timeout_secs: {}", config.sync.timeout_secs);
                println!("sync.auto_sync: {}", config.sync.auto_sync);
                println!("sync.debounce_secs: {}", config.sync.debounce_secs);
            }
            ConfigSubcommand::Init => {
                let path = Config::default_config_path();
                if path.exists() {
                    println!("Config already exists at {}", path.display());
                    return Ok(());
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(
                    &path,
                    "# coachtrack configuration\n\
                     #database_path: ~/.coachtrack/coachtrack.db\n\
                     #modified_by: local\n\
                     #sync:\n\
                     #  server_url: http://localhost:8787\n\
                     #  client_name: my-laptop\n\
                     #  timeout_secs: 30\n\
                     #  auto_sync: true\n\
                     #  debounce_secs: 3\n",
                )?;
                println!("Wrote {}", path.display());
            }
        }
        Ok(())
    }
}
