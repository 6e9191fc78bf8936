use anyhow::Result;

use super::common::{load_config, GlobalArgs};

/// Prints the effective configuration after file, env and flag overrides.
pub fn show(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
