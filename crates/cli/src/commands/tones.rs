//! `rolectx tones` — List the tone catalog.

use rolectx_config::AppConfig;

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::local_service(config)?;
    let tones = service.roles().tones().await;

    println!("🎨 Tone Profiles ({})", tones.len());
    println!("==================");
    for tone in &tones {
        println!("  {:<14} {}", tone.id, tone.description);
        println!("  {:<14} {}", "", tone.modifiers);
    }

    Ok(())
}
