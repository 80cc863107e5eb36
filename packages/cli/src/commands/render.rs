use crate::config::Config;
use anyhow::{Context, Result};
use blockpress_editor::render_tree;
use blockpress_html::{compile_to_html, CompileOptions};
use blockpress_model::BlockTree;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Page document (JSON block array)
    pub input: String,

    /// Output to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Wrap the blocks in a complete HTML page
    #[arg(long)]
    pub full_page: bool,

    /// Page title for --full-page
    #[arg(long)]
    pub title: Option<String>,
}

pub fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = PathBuf::from(cwd).join(&args.input);
    let html = render_file(&input, &config, &args, cwd)?;

    if args.stdout {
        print!("{}", html);
        return Ok(());
    }

    let out_dir = match &args.out_dir {
        Some(dir) => PathBuf::from(cwd).join(dir),
        None => config.get_out_dir(cwd),
    };
    fs::create_dir_all(&out_dir)?;
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    let output = out_dir.join(format!("{}.html", stem));
    fs::write(&output, html)?;

    println!(
        "  {} {} → {}",
        "✓".green(),
        args.input,
        output.display()
    );
    Ok(())
}

/// Load, render and compile one page
pub fn render_file(input: &Path, config: &Config, args: &RenderArgs, cwd: &str) -> Result<String> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("cannot read {}", input.display()))?;
    let tree = BlockTree::from_json(&source)
        .with_context(|| format!("invalid page {}", input.display()))?;
    let registry = config.load_registry(cwd)?;

    let document = render_tree(&tree, &registry);
    let options = CompileOptions {
        pretty: config.pretty,
        full_page: args.full_page,
        title: args.title.clone().unwrap_or_else(|| CompileOptions::default().title),
        ..CompileOptions::default()
    };
    Ok(compile_to_html(&document, options)?)
}
