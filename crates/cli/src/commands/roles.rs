//! `rolectx roles` / `rolectx role` — Role inspection commands.

use rolectx_config::AppConfig;
use rolectx_core::role::RoleFilter;

pub async fn list(
    config: &AppConfig,
    domain: Option<String>,
    tone: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::local_service(config)?;
    let roles = service.roles().list(&RoleFilter { domain, tone }).await;

    if roles.is_empty() {
        println!("No matching roles.");
        return Ok(());
    }

    println!("🎭 Roles ({})", roles.len());
    println!("==========");
    for role in &roles {
        let marker = if role.is_default { "default" } else { "custom" };
        let domains: Vec<&str> = role.domains.iter().map(String::as_str).collect();
        println!("  {:<20} {:<12} [{marker}]", role.id, role.tone);
        println!("  {:<20} {}", "", role.description);
        if !domains.is_empty() {
            println!("  {:<20} domains: {}", "", domains.join(", "));
        }
    }

    Ok(())
}

pub async fn show(config: &AppConfig, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::local_service(config)?;
    let role = service.roles().get(id).await?;
    println!("{}", serde_json::to_string_pretty(&role)?);
    Ok(())
}
