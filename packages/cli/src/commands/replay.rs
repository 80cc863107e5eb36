//! Replays a script of editor commands against a page and saves it.
//!
//! A script is a JSON array. Each step is either a block mutation
//! (`{"op": "addAt", "blockType": "paragraph", "index": 0}`) or a session
//! command (`{"op": "undo"}`, `{"op": "clickColumn", "parent": "c1",
//! "column": 0}`).

use crate::config::Config;
use crate::persistence::FilePersistence;
use anyhow::{anyhow, Context, Result};
use blockpress_editor::{BlockId, EditorSession, Mutation, MutationOutcome};
use clap::Args;
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Page document (JSON block array)
    pub input: String,

    /// Script of editor commands (JSON array)
    pub script: String,

    /// Where to save the result (defaults to overwriting the input)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Post id used for block ids
    #[arg(long, default_value = "page")]
    pub post_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Mutation(Mutation),
    Command(SessionCommand),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SessionCommand {
    Undo,
    Redo,
    Checkpoint,
    ClickBlock { block_id: BlockId },
    ClickColumn { parent: BlockId, column: usize },
    ClickCanvas,
    SetTitle { title: String },
    SetPageSettings { page_settings: Value },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
}

/// Run every step. Steps that hit a stale block id are skipped, as a host
/// would ignore them; any other failure stops the replay.
pub fn run_script(session: &mut EditorSession, steps: Vec<Step>) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, step) in steps.into_iter().enumerate() {
        let result = match step {
            Step::Mutation(mutation) => session.apply(mutation).map(describe),
            Step::Command(command) => run_command(session, command),
        };

        match result {
            Ok(note) => {
                summary.applied += 1;
                println!("  {} step {}: {}", "✓".green(), index + 1, note);
            }
            Err(err) if err.is_block_not_found() => {
                summary.skipped += 1;
                warn!(step = index + 1, error = %err, "skipping step");
                println!("  {} step {}: {}", "⚠️".yellow(), index + 1, err);
            }
            Err(err) => return Err(anyhow!(err).context(format!("step {} failed", index + 1))),
        }
    }

    Ok(summary)
}

fn run_command(
    session: &mut EditorSession,
    command: SessionCommand,
) -> blockpress_editor::EditorResult<String> {
    let note = match command {
        SessionCommand::Undo => {
            if session.undo() {
                "undo".to_string()
            } else {
                "undo (nothing to undo)".to_string()
            }
        }
        SessionCommand::Redo => {
            if session.redo() {
                "redo".to_string()
            } else {
                "redo (nothing to redo)".to_string()
            }
        }
        SessionCommand::Checkpoint => {
            session.checkpoint();
            "checkpoint".to_string()
        }
        SessionCommand::ClickBlock { block_id } => {
            session.click_block(&block_id)?;
            format!("selected {}", block_id)
        }
        SessionCommand::ClickColumn { parent, column } => {
            session.click_column(&parent, column)?;
            format!("column {}[{}]", parent, column)
        }
        SessionCommand::ClickCanvas => {
            session.click_canvas();
            "cleared selection".to_string()
        }
        SessionCommand::SetTitle { title } => {
            let note = format!("title {:?}", title);
            session.set_title(title);
            note
        }
        SessionCommand::SetPageSettings { page_settings } => {
            session.set_page_settings(page_settings);
            "page settings".to_string()
        }
    };
    Ok(note)
}

fn describe(outcome: MutationOutcome) -> String {
    match outcome {
        MutationOutcome::Inserted(id) => format!("inserted {}", id),
        MutationOutcome::Removed(id) => format!("removed {}", id),
        MutationOutcome::Moved { block_id, location } => {
            format!("moved {} to {}@{}", block_id, location.container, location.index)
        }
        MutationOutcome::Updated(id) => format!("updated {}", id),
    }
}

pub async fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let registry = config.load_registry(cwd)?;
    let input = PathBuf::from(cwd).join(&args.input);
    let script_path = PathBuf::from(cwd).join(&args.script);

    let source = fs::read_to_string(&input)
        .with_context(|| format!("cannot read {}", input.display()))?;
    let mut session = EditorSession::load(&args.post_id, &source, registry, config.editor.clone())
        .with_context(|| format!("invalid page {}", input.display()))?;
    if let Some(meta) = FilePersistence::new(input.clone()).load_meta()? {
        session = session
            .with_title(meta.title)
            .with_page_settings(meta.page_settings)
            .with_id_counter(meta.id_counter);
    }

    let script = fs::read_to_string(&script_path)
        .with_context(|| format!("cannot read {}", script_path.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&script)
        .with_context(|| format!("invalid script {}", script_path.display()))?;

    println!(
        "{}",
        format!("▶ Replaying {} steps...", steps.len()).bright_blue().bold()
    );
    let summary = run_script(&mut session, steps)?;

    let output = match &args.output {
        Some(path) => PathBuf::from(cwd).join(path),
        None => input.clone(),
    };
    let client = FilePersistence::new(output.clone());
    session.save(&client).await?;

    println!();
    println!(
        "{} {} applied, {} skipped → {}",
        "✅".green(),
        summary.applied,
        summary.skipped,
        client.document_path().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockpress_editor::{BlockRegistry, BlockTree, Container, EditorConfig};
    use serde_json::json;

    fn session() -> EditorSession {
        EditorSession::new(
            "page",
            BlockTree::new(),
            BlockRegistry::builtin(),
            EditorConfig::default(),
        )
    }

    #[test]
    fn test_steps_parse_both_shapes() {
        let steps: Vec<Step> = serde_json::from_value(json!([
            { "op": "add", "blockType": "paragraph" },
            { "op": "undo" },
            { "op": "clickColumn", "parent": "c", "column": 1 }
        ]))
        .unwrap();

        assert!(matches!(steps[0], Step::Mutation(Mutation::Add { .. })));
        assert_eq!(steps[1], Step::Command(SessionCommand::Undo));
        assert_eq!(
            steps[2],
            Step::Command(SessionCommand::ClickColumn {
                parent: BlockId::from("c"),
                column: 1
            })
        );
    }

    #[test]
    fn test_stale_ids_are_skipped() {
        let mut session = session();
        let steps: Vec<Step> = serde_json::from_value(json!([
            { "op": "addAt", "blockType": "paragraph", "index": 0 },
            { "op": "delete", "blockId": "missing" },
            { "op": "addAt", "blockType": "divider", "index": 1 }
        ]))
        .unwrap();

        let summary = run_script(&mut session, steps).unwrap();

        assert_eq!(summary, ReplaySummary { applied: 2, skipped: 1 });
        assert_eq!(session.tree().len(), 2);
    }

    #[test]
    fn test_invalid_step_stops_replay() {
        let mut session = session();
        let steps: Vec<Step> = serde_json::from_value(json!([
            { "op": "add", "blockType": "nope" },
            { "op": "add", "blockType": "paragraph" }
        ]))
        .unwrap();

        assert!(run_script(&mut session, steps).is_err());
        assert!(session.tree().is_empty());
    }

    #[test]
    fn test_column_context_from_script() {
        let mut session = session();
        let cols = session.add("columns", None).unwrap();
        let steps: Vec<Step> = serde_json::from_value(json!([
            { "op": "clickColumn", "parent": cols.as_str(), "column": 1 },
            { "op": "add", "blockType": "quote" }
        ]))
        .unwrap();

        run_script(&mut session, steps).unwrap();

        let ids = session
            .tree()
            .container_ids(&Container::column(cols, 1))
            .unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_replay_does_not_reissue_deleted_ids() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();
        fs::write(dir.path().join("page.json"), "[]").unwrap();
        let args = |script: &str| ReplayArgs {
            input: "page.json".to_string(),
            script: script.to_string(),
            output: None,
            post_id: "page".to_string(),
        };

        fs::write(
            dir.path().join("first.json"),
            r#"[
                { "op": "addAt", "blockType": "paragraph", "index": 0 },
                { "op": "addAt", "blockType": "paragraph", "index": 1 }
            ]"#,
        )
        .unwrap();
        replay(args("first.json"), cwd).await.unwrap();
        let saved = BlockTree::from_json(&fs::read_to_string(dir.path().join("page.json")).unwrap())
            .unwrap();
        let deleted = saved.all_ids()[1].clone();

        fs::write(
            dir.path().join("second.json"),
            format!(r#"[{{ "op": "delete", "blockId": "{}" }}]"#, deleted),
        )
        .unwrap();
        replay(args("second.json"), cwd).await.unwrap();
        fs::write(
            dir.path().join("third.json"),
            r#"[{ "op": "addAt", "blockType": "heading", "index": 0 }]"#,
        )
        .unwrap();
        replay(args("third.json"), cwd).await.unwrap();

        let saved = BlockTree::from_json(&fs::read_to_string(dir.path().join("page.json")).unwrap())
            .unwrap();
        assert_eq!(saved.len(), 2);
        assert!(!saved.contains(&deleted));
    }

    #[tokio::test]
    async fn test_replay_saves_output() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();
        fs::write(dir.path().join("page.json"), "[]").unwrap();
        fs::write(
            dir.path().join("script.json"),
            r#"[
                { "op": "addAt", "blockType": "heading", "index": 0 },
                { "op": "setTitle", "title": "Replayed" }
            ]"#,
        )
        .unwrap();

        replay(
            ReplayArgs {
                input: "page.json".to_string(),
                script: "script.json".to_string(),
                output: Some("out/page.json".to_string()),
                post_id: "page".to_string(),
            },
            cwd,
        )
        .await
        .unwrap();

        let saved = fs::read_to_string(dir.path().join("out/page.json")).unwrap();
        let tree = BlockTree::from_json(&saved).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(dir.path().join("out/page.meta.json").exists());
        assert_eq!(fs::read_to_string(dir.path().join("page.json")).unwrap(), "[]");
    }
}
