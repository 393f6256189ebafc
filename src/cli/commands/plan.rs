//! Plan command implementation.
//!
//! Wires the TMDB provider (behind the cache) and the optional Ollama model
//! into the planner, then prints and saves the plan.

use crate::cli::args::PlanArgs;
use crate::core::planner::{self, Planner};
use crate::models::config::Config;
use crate::models::plan::{PlanOutcome, PlanStatus};
use crate::services::cache::{CachedProvider, ProviderCache};
use crate::services::ollama::OllamaClient;
use crate::services::tmdb::TmdbClient;
use crate::utils::fs::ensure_directory;
use crate::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fold command line flags into the loaded configuration.
pub fn apply_overrides(args: &PlanArgs, config: &mut Config) {
    let rules = &mut config.rules;
    if let Some(show) = &args.show {
        rules.show_name = Some(show.clone());
    }
    if let Some(season) = args.season {
        rules.season = Some(season);
    }
    if let Some(id) = &args.tmdb_id {
        rules.provider_id = Some(id.clone());
    }
    if let Some(platform) = args.platform {
        rules.platform = platform.into();
    }
    if let Some(model) = &args.model {
        rules.llm_model = Some(model.clone());
    }
    rules.anthology |= args.anthology;
    rules.strict_structure |= args.strict;
    rules.verify |= args.verify;
    if args.no_cache {
        config.cache.enabled = false;
    }
}

/// Default library root: `<source>_organized` next to the source.
pub fn default_target(source: &Path) -> PathBuf {
    let source_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("videos");
    let organized_name = format!("{}_organized", source_name);
    source
        .parent()
        .map(|p| p.join(&organized_name))
        .unwrap_or_else(|| PathBuf::from(organized_name))
}

/// Execute the plan command.
pub async fn plan(args: &PlanArgs, mut config: Config) -> Result<()> {
    ensure_directory(&args.source)?;
    apply_overrides(args, &mut config);

    let target_path = args
        .target
        .clone()
        .unwrap_or_else(|| default_target(&args.source));

    println!("{}", "📺 Planning episode renames...".bold().cyan());
    println!();
    println!("  {} {}", "Source:".bold(), args.source.display());
    println!("  {} {}", "Target:".bold(), target_path.display());
    println!("  {} {}", "Platform:".bold(), config.rules.platform);
    println!();

    let cache = Arc::new(ProviderCache::new(&config.cache));
    let provider = CachedProvider::new(TmdbClient::new(&config.tmdb)?, cache);
    let llm = if args.no_llm {
        None
    } else {
        connect_llm(&config).await
    };

    let planner = Planner::new(provider, llm, config.rules.clone(), &target_path);
    let outcome = planner.plan_directory(&args.source).await?;

    print_summary(&outcome);

    if !target_path.exists() {
        std::fs::create_dir_all(&target_path)?;
    }
    let output_path = match &args.output {
        Some(o) => o.clone(),
        None => planner::default_plan_path(&args.source, Some(&target_path)),
    };

    planner::save_plan(&outcome.plan, &output_path)?;
    println!(
        "{} {}",
        "✅ Plan saved to:".bold().green(),
        output_path.display()
    );

    match planner::save_to_sessions(&outcome.plan, &config.sessions_dir) {
        Ok(session_dir) => {
            println!("{} {}", "📁 Session saved to:".bold(), session_dir.display());
        }
        Err(e) => {
            tracing::warn!("Failed to save session: {}", e);
        }
    }

    Ok(())
}

/// Connect to Ollama, or continue without a model when it is unreachable.
async fn connect_llm(config: &Config) -> Option<OllamaClient> {
    let client = match OllamaClient::new(&config.ollama) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Cannot create Ollama client: {}", e);
            return None;
        }
    };
    let client = match &config.rules.llm_model {
        Some(model) => client.with_model(model),
        None => client,
    };

    if client.health_check().await {
        match client.list_models().await {
            Ok(models) if !models.iter().any(|m| m.name.starts_with(client.model())) => {
                tracing::warn!("Model {} is not installed in Ollama", client.model());
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Cannot list Ollama models: {}", e),
        }
        tracing::info!("Using language model {}", client.model());
        Some(client)
    } else {
        tracing::warn!(
            "Ollama not reachable at {}; continuing without a language model",
            config.ollama.base_url
        );
        None
    }
}

fn print_summary(outcome: &PlanOutcome) {
    let plan = &outcome.plan;

    println!();
    println!("{}", "📋 Plan Summary".bold().green());
    println!("  {} {}", "Pending:".bold(), plan.count(PlanStatus::Pending));
    println!("  {} {}", "Duplicate:".bold(), plan.count(PlanStatus::Duplicate));
    println!("  {} {}", "Conflict:".bold(), plan.count(PlanStatus::Conflict));
    println!("  {} {}", "Failed:".bold(), plan.count(PlanStatus::Failed));
    println!("  {} {}", "Skipped:".bold(), outcome.skipped.len());
    println!();

    let problems: Vec<_> = plan
        .items
        .iter()
        .filter(|i| matches!(i.status, PlanStatus::Conflict | PlanStatus::Failed))
        .collect();
    if !problems.is_empty() {
        println!("{}", "⚠️  Needs attention:".bold().yellow());
        for item in problems {
            println!(
                "  [{}] {} - {}",
                item.status.to_string().red(),
                item.source.display(),
                item.reason.as_deref().unwrap_or("")
            );
        }
        println!();
    }

    if !outcome.skipped.is_empty() {
        println!("{}", "⚠️  Unparseable files:".bold().yellow());
        for skipped in &outcome.skipped {
            println!("  {} - {}", skipped.source.display().to_string().red(), skipped.reason);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::PlatformArg;
    use crate::models::config::Platform;

    fn args() -> PlanArgs {
        PlanArgs {
            source: PathBuf::from("/downloads/tv"),
            target: None,
            output: None,
            show: Some("Bluey".into()),
            season: Some(3),
            tmdb_id: Some("82728".into()),
            platform: Some(PlatformArg::Jellyfin),
            anthology: true,
            strict: false,
            verify: true,
            no_cache: true,
            no_llm: false,
            model: None,
        }
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        apply_overrides(&args(), &mut config);

        assert_eq!(config.rules.show_name.as_deref(), Some("Bluey"));
        assert_eq!(config.rules.season, Some(3));
        assert_eq!(config.rules.provider_id.as_deref(), Some("82728"));
        assert_eq!(config.rules.platform, Platform::Jellyfin);
        assert!(config.rules.anthology);
        assert!(config.rules.verify);
        assert!(!config.rules.strict_structure);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_default_target() {
        assert_eq!(
            default_target(Path::new("/downloads/tv")),
            PathBuf::from("/downloads/tv_organized")
        );
    }
}
