use anyhow::{Context, Result};
use rancher_config::HomesteadConfig;
use rancher_core::{rancher_println, rancher_success};
use rancher_provider::LifecycleController;

pub fn handle_show(controller: &LifecycleController, json: bool) -> Result<()> {
    let config = controller.parse_config();
    if json {
        let rendered =
            serde_json::to_string_pretty(&config).context("Failed to serialize Homestead config")?;
        rancher_println!("{}", rendered);
    } else {
        rancher_println!("{}", render_text(&config));
    }
    Ok(())
}

pub fn handle_edit(controller: &LifecycleController) -> Result<()> {
    controller
        .edit_config()
        .context("Failed to open Homestead.yaml")?;
    rancher_success!("Opened Homestead.yaml");
    Ok(())
}

fn render_text(config: &HomesteadConfig) -> String {
    let or_dash = |value: &str| {
        if value.is_empty() {
            "-".to_string()
        } else {
            value.to_string()
        }
    };
    [
        format!("IP:        {}", or_dash(&config.ip)),
        format!("Memory:    {} MB", config.memory_mb),
        format!("CPUs:      {}", config.cpu_count),
        format!("Provider:  {}", or_dash(&config.provider)),
        format!("Sites:     {}", or_dash(&config.sites.join(", "))),
        format!("Databases: {}", or_dash(&config.databases.join(", "))),
    ]
    .join("\n")
}
