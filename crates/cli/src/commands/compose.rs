//! `rolectx compose` — Seed memories and print the composed prompt.

use rolectx_config::AppConfig;
use rolectx_context::{PromptComposer, ScopeKeys};
use rolectx_core::memory::MemoryScope;

/// One `--remember scope:key=value` argument.
#[derive(Debug, PartialEq, Eq)]
pub struct Remember {
    pub scope: MemoryScope,
    pub key: String,
    pub value: String,
}

pub fn parse_remember(raw: &str) -> Result<Remember, String> {
    let (scope, rest) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected scope:key=value, got '{raw}'"))?;
    let (key, value) = rest
        .split_once('=')
        .ok_or_else(|| format!("expected scope:key=value, got '{raw}'"))?;

    let scope: MemoryScope = scope.parse()?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty memory key in '{raw}'"));
    }

    Ok(Remember {
        scope,
        key: key.to_string(),
        value: value.to_string(),
    })
}

pub async fn run(
    config: &AppConfig,
    role: &str,
    remember: &[String],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let memories = remember
        .iter()
        .map(|raw| parse_remember(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let service = super::local_service(config)?;
    let mut keys = ScopeKeys::new();
    for memory in memories {
        service
            .remember(memory.scope, &memory.key, memory.value, None)
            .await?;
        keys.insert(memory.scope, memory.key);
    }

    let (context, prompt) = service
        .resolver()
        .prompt_for(role, &keys, &PromptComposer)
        .await?;
    print!("{prompt}");

    if json {
        println!();
        println!("{}", serde_json::to_string_pretty(&context)?);
    }

    Ok(())
}
