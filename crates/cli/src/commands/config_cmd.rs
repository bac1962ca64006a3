//! `rolectx config` — Configuration display.

use rolectx_config::AppConfig;

const REDACTED: &str = "[REDACTED]";

pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(&redacted(config))?;
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{toml_str}");
    Ok(())
}

pub fn show_default() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}

/// Copy of `config` with secrets masked.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    for secret in [
        &mut shown.llm.api_key,
        &mut shown.memory.redis_url,
        &mut shown.memory.supabase_key,
    ] {
        if secret.is_some() {
            *secret = Some(REDACTED.into());
        }
    }
    shown
}
