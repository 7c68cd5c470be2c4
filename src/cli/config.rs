use anyhow::Result;
use chat_topics::config::AppConfig;

/// `config`: print the effective configuration as TOML.
pub fn run_show(config: &AppConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
