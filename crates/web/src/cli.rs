use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nl2cq-web",
    version,
    about = "Web front for the NL2CQ natural language to Cypher translator"
)]
pub(crate) struct Args {
    /// TOML config; built-in defaults are used when the default path is absent.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Overrides `listen_addr` from the config file.
    #[arg(long)]
    pub(crate) listen_addr: Option<String>,
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
    /// Also write JSON logs to a daily rolling file in this directory.
    #[arg(long)]
    pub(crate) log_dir: Option<PathBuf>,
}
