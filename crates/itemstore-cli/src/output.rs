//! Output formatting for the CLI.

use anyhow::Result;
use chrono::{DateTime, Utc};
use console::style;
use itemstore_core::Item;
use serde::Serialize;
use serde_json::json;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// Print output in the specified format.
pub fn print<T: Serialize + HumanDisplay>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => println!("{}", value.human_display()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

/// Print a list of item summaries with dynamic column widths.
pub fn print_item_list(items: &[ItemSummary], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            if items.is_empty() {
                println!("No items found.");
                return Ok(());
            }
            print!("{}", render_table(items));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(items)?),
    }
    Ok(())
}

/// Print a success message.
pub fn print_success(message: &str, format: OutputFormat) -> Result<()> {
    let report = json!({ "status": "ok", "message": message });
    match format {
        OutputFormat::Human => println!("{} {message}", style("✓").green().bold()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
    }
    Ok(())
}

/// Trait for human-readable display.
pub trait HumanDisplay {
    fn human_display(&self) -> String;
}

impl HumanDisplay for Item {
    fn human_display(&self) -> String {
        let data = serde_json::to_string_pretty(&self.data).unwrap_or_else(|_| "null".into());

        let mut out = String::new();
        out.push_str(&format!("Type:      {}\n", self.item_type));
        out.push_str(&format!("Name:      {}\n", self.name));
        out.push_str(&format!("ID:        {}\n", self.id));
        out.push_str(&format!("Created:   {}\n", format_time(&self.created_at)));
        out.push_str(&format!("Updated:   {}\n", format_time(&self.updated_at)));
        out.push_str("Data:\n");
        for line in data.lines() {
            out.push_str(&format!("  {line}\n"));
        }
        out
    }
}

fn format_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Summary view of an item for list output.
#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub name: String,
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            id: item.id.clone(),
            updated_at: item.updated_at,
        }
    }
}

fn render_table(items: &[ItemSummary]) -> String {
    let name_width = items.iter().map(|i| i.name.len()).max().unwrap_or(4).max(4);
    let id_width = items.iter().map(|i| i.id.len()).max().unwrap_or(2).max(2);

    let header = format!("{:<name_width$}  {:<id_width$}  UPDATED", "NAME", "ID");
    let mut out = format!("{}\n", style(header).bold());
    out.push_str(&"-".repeat(name_width + id_width + 27));
    out.push('\n');

    for item in items {
        out.push_str(&format!(
            "{:<name_width$}  {:<id_width$}  {}\n",
            item.name,
            item.id,
            format_time(&item.updated_at),
        ));
    }
    out
}
