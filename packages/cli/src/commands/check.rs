use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use blockpress_editor::parse_inline;
use blockpress_model::{
    walk_tree, BlockRegistry, BlockTree, BlockVisitor, Container, LeafBlock, TypeCounter,
};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Page document (JSON block array)
    pub input: String,

    /// Print block counts by type
    #[arg(short, long)]
    pub verbose: bool,
}

/// Problems that do not stop the page from loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub location: String,
    pub message: String,
}

struct IssueCollector<'a> {
    registry: &'a BlockRegistry,
    issues: Vec<Issue>,
}

impl BlockVisitor for IssueCollector<'_> {
    fn visit_leaf(&mut self, leaf: &LeafBlock, container: &Container) {
        let location = format!("{} in {}", leaf.id(), container);
        if !self.registry.contains(leaf.block_type()) {
            self.issues.push(Issue {
                location,
                message: format!("unknown block type `{}`", leaf.block_type()),
            });
            return;
        }

        let Some(attribute) = self.registry.text_attribute(leaf.block_type()) else {
            return;
        };
        if let Some(markup) = leaf.attributes.get(attribute).and_then(|v| v.as_str()) {
            if let Err(err) = parse_inline(markup) {
                self.issues.push(Issue {
                    location,
                    message: format!("malformed `{}`: {}", attribute, err),
                });
            }
        }
    }
}

/// Issues in a tree that already passed structural validation
pub fn collect_issues(tree: &BlockTree, registry: &BlockRegistry) -> Vec<Issue> {
    let mut collector = IssueCollector {
        registry,
        issues: Vec::new(),
    };
    walk_tree(&mut collector, tree);
    collector.issues
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let registry = config.load_registry(cwd)?;
    let input = PathBuf::from(cwd).join(&args.input);

    println!("🔍 {} {}", "Checking".green().bold(), args.input);

    let source = fs::read_to_string(&input)
        .with_context(|| format!("cannot read {}", input.display()))?;
    let tree = BlockTree::from_json(&source)
        .with_context(|| format!("{} is not a valid page", args.input))?;
    tree.validate()?;

    if args.verbose {
        let mut counter = TypeCounter::default();
        walk_tree(&mut counter, &tree);
        for (block_type, count) in &counter.counts {
            println!("   {:>4} × {}", count, block_type);
        }
    }

    let issues = collect_issues(&tree, &registry);
    for issue in &issues {
        println!("   {} {}: {}", "✗".red(), issue.location, issue.message);
    }

    println!();
    if issues.is_empty() {
        println!(
            "{} {} blocks, no issues",
            "✅".green(),
            tree.total_blocks()
        );
        Ok(())
    } else {
        Err(anyhow!("{} issue(s) found", issues.len()))
    }
}
