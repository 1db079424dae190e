//! Export of generated machines and campaigns.
//!
//! Layout of one exported machine:
//!
//! ```text
//! <machine_id>/
//! ├── config.json   # the full machine configuration
//! ├── flag.txt      # bare flag content
//! ├── hints.txt     # plaintext hint listing
//! └── README.md     # human summary
//! ```
//!
//! A campaign directory holds one such directory per machine plus a
//! `manifest.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use tracing::info;

use crate::config::ForgeConfig;
use crate::error::ExportError;
use crate::generator::Campaign;
use crate::machine::MachineConfig;

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

const HINTS_TEMPLATE: &str = "Machine: {{ machine.machine_id }}
Name: {{ machine.metadata.vuln_name }}
Variant: {{ machine.variant }}
Difficulty: {{ machine.difficulty }}/5

Hints:
{% for hint in machine.metadata.exploit_hints %}  - {{ hint }}
{% endfor %}";

const README_TEMPLATE: &str = "# {{ machine.metadata.vuln_name }}

**Machine ID:** `{{ machine.machine_id }}`
**Variant:** {{ machine.variant }}
**Difficulty:** {{ machine.difficulty }}/5
**Category:** {{ machine.metadata.category }}
**Estimated solve time:** {{ machine.metadata.estimated_solve_time }}

## Description

{% if machine.metadata.description %}{{ machine.metadata.description }}{% else %}No description available{% endif %}

## Flag

Flag location: `flag.txt`

## Next Steps

1. Render the vulnerable application from `config.json`
2. Deploy the rendered bundle in a sandbox
";

pub const CONFIG_FILE: &str = "config.json";
pub const FLAG_FILE: &str = "flag.txt";
pub const HINTS_FILE: &str = "hints.txt";
pub const README_FILE: &str = "README.md";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Contents of a campaign's `manifest.json`.
#[derive(Debug, Serialize)]
pub struct CampaignManifest<'a> {
    pub campaign_id: &'a str,
    pub user_id: &'a str,
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    pub created_at: String,
    pub difficulty: u8,
    pub machines: &'a [MachineConfig],
    pub total: usize,
}

impl<'a> CampaignManifest<'a> {
    pub fn new(campaign: &'a Campaign) -> Self {
        Self {
            campaign_id: &campaign.campaign_id,
            user_id: &campaign.user_id,
            created_at: campaign.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            difficulty: campaign.difficulty,
            machines: &campaign.machines,
            total: campaign.machines.len(),
        }
    }
}

/// Renders the plaintext hint listing for a machine.
pub fn render_hints(machine: &MachineConfig) -> Result<String> {
    render(HINTS_TEMPLATE, machine)
}

/// Renders the README for a machine.
pub fn render_readme(machine: &MachineConfig) -> Result<String> {
    render(README_TEMPLATE, machine)
}

fn render(template: &str, machine: &MachineConfig) -> Result<String> {
    let mut context = Context::new();
    context.insert("machine", machine);
    Ok(Tera::one_off(template, &context, false)?)
}

/// Writes machines and campaigns to disk.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    campaigns_dir: PathBuf,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>, campaigns_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            campaigns_dir: campaigns_dir.into(),
        }
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        Self::new(&config.output_dir, &config.campaigns_dir)
    }

    /// Exports one machine under the output directory.
    ///
    /// Returns the machine directory.
    pub fn export_machine(&self, machine: &MachineConfig) -> Result<PathBuf> {
        let dir = self.output_dir.join(&machine.machine_id);
        write_machine(&dir, machine)?;
        info!(machine_id = %machine.machine_id, dir = %dir.display(), "Exported machine");
        Ok(dir)
    }

    /// Exports every machine of a campaign plus its manifest.
    ///
    /// Returns the campaign directory. A directory that already holds a
    /// manifest is never written into.
    pub fn export_campaign(&self, campaign: &Campaign) -> Result<PathBuf> {
        if campaign.is_empty() {
            return Err(ExportError::NoMachines);
        }

        let dir = self.campaigns_dir.join(&campaign.campaign_id);
        if dir.join(MANIFEST_FILE).exists() {
            return Err(ExportError::CampaignExists(dir));
        }
        for machine in &campaign.machines {
            write_machine(&dir.join(&machine.machine_id), machine)?;
        }

        let manifest = serde_json::to_string_pretty(&CampaignManifest::new(campaign))?;
        fs::write(dir.join(MANIFEST_FILE), manifest)?;

        info!(
            campaign = %campaign.campaign_id,
            machines = campaign.len(),
            dir = %dir.display(),
            "Exported campaign"
        );
        Ok(dir)
    }
}

/// Writes the four per-machine artifacts into `dir`.
pub fn write_machine(dir: &Path, machine: &MachineConfig) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(CONFIG_FILE), machine.to_json_pretty()?)?;
    fs::write(dir.join(FLAG_FILE), &machine.flag.content)?;
    fs::write(dir.join(HINTS_FILE), render_hints(machine)?)?;
    fs::write(dir.join(README_FILE), render_readme(machine)?)?;
    Ok(())
}
