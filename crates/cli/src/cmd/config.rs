//! Configuration helper commands

use anyhow::Result;

/// Print an annotated example configuration
pub async fn run_example() -> Result<()> {
    print!("{}", cli_lib::config::example_config());
    Ok(())
}
