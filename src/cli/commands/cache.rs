//! Cache command implementation.

use crate::models::config::Config;
use crate::services::cache::ProviderCache;
use crate::Result;
use colored::Colorize;

/// Delete expired entries from the provider cache.
pub async fn purge(config: &Config) -> Result<()> {
    let cache = ProviderCache::new(&config.cache);
    if !cache.is_enabled() {
        println!("{}", "Cache is disabled in the configuration.".yellow());
        return Ok(());
    }

    let removed = cache.purge_expired().await?;
    println!(
        "{} {} expired entries from {}",
        "🧹 Removed".bold().green(),
        removed,
        config.cache.path.display()
    );
    Ok(())
}
