use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

const EXAMPLE_PAGE: &str = "page.json";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Output directory for rendered HTML
    #[arg(short, long, default_value = "dist")]
    pub out_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!(
        "{}",
        "📝 Initializing Blockpress project...".bright_blue().bold()
    );

    // Create example page
    let example_file = PathBuf::from(cwd).join(EXAMPLE_PAGE);
    if !example_file.exists() {
        let example_content = r#"[
  {
    "id": "intro-1",
    "type": "heading",
    "attributes": { "content": "Welcome", "level": 1, "align": "left" }
  },
  {
    "id": "intro-2",
    "type": "columns",
    "attributes": {
      "columnCount": 2,
      "gap": 24,
      "columns": [
        [{ "id": "intro-3", "type": "paragraph", "attributes": { "content": "Left <b>column</b>" } }],
        [{ "id": "intro-4", "type": "paragraph", "attributes": { "content": "Right column" } }]
      ]
    }
  }
]
"#;
        fs::write(&example_file, example_content)?;
        println!("  {} Created {}", "✓".green(), EXAMPLE_PAGE);
    }

    let config = Config {
        out_dir: args.out_dir.clone(),
        ..Config::default()
    };

    // Write config file
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}", EXAMPLE_PAGE);
    println!("  2. Run: blockpress render {}", EXAMPLE_PAGE);
    println!("  3. Check output in {}/", args.out_dir);

    Ok(())
}
