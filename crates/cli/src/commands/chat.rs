//! `sidekick chat` — interactive or single-message chat mode.

use anyhow::Context;
use async_trait::async_trait;
use sidekick_backends::build_from_config;
use sidekick_config::{AppConfig, FileConfigStore};
use sidekick_engine::{ApprovalHandler, Orchestrator, Session};
use sidekick_retrieval::InMemoryIndex;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Source file extensions worth indexing for retrieval.
const INDEXED_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "py", "go", "java", "c", "cpp", "h", "css", "html", "md",
    "toml", "json",
];

/// Directories that never hold user source.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", ".git", "dist", "build"];

const MAX_INDEXED_FILES: usize = 200;
const MAX_INDEX_DEPTH: usize = 3;

/// Approval prompts on stdin: `y` approves, anything else denies.
struct StdinApproval;

#[async_trait]
impl ApprovalHandler for StdinApproval {
    async fn request(&self, tool_name: &str, parameters: &serde_json::Value) -> bool {
        let prompt = format!(
            "\n  Tool '{}' wants to run with parameters:\n  {}\n  Allow? [y/N] ",
            tool_name,
            serde_json::to_string(parameters).unwrap_or_default()
        );

        tokio::task::spawn_blocking(move || {
            print!("{prompt}");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            if std::io::stdin().lock().read_line(&mut line).is_err() {
                return false;
            }
            matches!(line.trim(), "y" | "Y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

pub async fn run(message: Option<String>, plan: bool) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    let cwd = std::env::current_dir().context("No working directory")?;

    // Build the collaborators
    let router = build_from_config(&config);
    let backend = router.active().context("No model backend configured")?;
    let tools = Arc::new(sidekick_tools::default_registry(&cwd));

    let index = Arc::new(InMemoryIndex::new());
    let indexed = index_workspace(&index, &cwd).await;
    debug!(files = indexed, "Workspace indexed for retrieval");

    let orchestrator = Orchestrator::new(
        backend,
        tools,
        Arc::new(FileConfigStore::default_location()),
        Arc::new(StdinApproval),
    )
    .with_index(index)
    .with_planning(plan);

    let session = Session::new(
        config.context.max_context_tokens,
        config.context.max_output_tokens(),
    );

    if config.autonomy.level == 5 {
        eprintln!("  WARNING: autonomy level 5 — tools execute without approval.");
    }

    if let Some(message) = message {
        return send_one(&orchestrator, &session, &message).await;
    }

    println!("Sidekick — model '{}', {} indexed files.", config.default_model, indexed);
    println!("Type a message, '/reset' to clear the session, or Ctrl-D to exit.\n");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == "/reset" {
            session.reset().await;
            println!("(conversation cleared)");
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        if let Err(e) = send_one(&orchestrator, &session, line).await {
            eprintln!("  error: {e}");
        }
    }

    Ok(())
}

async fn send_one(
    orchestrator: &Orchestrator,
    session: &Session,
    message: &str,
) -> anyhow::Result<()> {
    let outcome = orchestrator.run_turn(session, message).await?;

    if let Some(plan) = &outcome.plan {
        println!(
            "  [plan] intent={:?} confidence={:.2} steps={}",
            plan.intent,
            plan.confidence,
            plan.steps.len()
        );
    }
    if outcome.tool_calls_made > 0 {
        println!(
            "  [{} tool call(s) over {} iteration(s)]",
            outcome.tool_calls_made, outcome.iterations
        );
    }

    println!("{}\n", outcome.text);
    Ok(())
}

/// Register workspace source files with the retrieval index.
async fn index_workspace(index: &InMemoryIndex, root: &Path) -> usize {
    let mut count = 0;
    let mut stack = vec![(root.to_path_buf(), 0usize)];

    while let Some((dir, depth)) = stack.pop() {
        if depth > MAX_INDEX_DEPTH || count >= MAX_INDEXED_FILES {
            continue;
        }

        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };

        for entry in entries.flatten() {
            if count >= MAX_INDEXED_FILES {
                break;
            }
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if path.is_dir() {
                if !SKIPPED_DIRS.contains(&name.as_str()) && !name.starts_with('.') {
                    stack.push((path, depth + 1));
                }
                continue;
            }

            let indexable = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| INDEXED_EXTENSIONS.contains(&ext));
            if !indexable {
                continue;
            }

            if let Ok(content) = std::fs::read_to_string(&path) {
                let rel = path
                    .strip_prefix(root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                index.insert(rel, content).await;
                count += 1;
            }
        }
    }

    count
}
