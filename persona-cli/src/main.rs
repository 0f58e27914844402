//! persona CLI: persona admin, passage ingestion and interactive streaming chat.
//! Config from env (`.env` is loaded first).

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use embedding::EnvEmbeddingConfig;
use llm_client::{EnvLlmConfig, LlmConfig, OpenAILlmClient};
use memory::{ChatRequest, RelayState};
use persona_cli::{init_tracing, App, AppConfig, CategoryAction, Cli, Commands, PersonaDraft};
use tokio::io::{AsyncBufReadExt, BufReader};

const CONTENT_PREVIEW_LEN: usize = 60;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    init_tracing(&config.log_file)?;

    let app = App::connect(config, EnvEmbeddingConfig::from_env()?).await?;

    match cli.command {
        Commands::Categories { action } => handle_categories(&app, action).await,
        Commands::Create {
            name,
            description,
            instructions_file,
            seed_file,
            category,
            src,
            user,
            user_name,
        } => {
            let draft = PersonaDraft {
                user_name: user_name.unwrap_or_else(|| user.clone()),
                user_id: user,
                src,
                name,
                description,
                instructions: read_file(&instructions_file)?,
                seed: read_file(&seed_file)?,
                category,
            };
            let persona = app.create_persona(draft).await?;
            println!("Created persona {} ({})", persona.name, persona.id);
            Ok(())
        }
        Commands::List { category, search } => {
            handle_list(&app, category.as_deref(), search.as_deref()).await
        }
        Commands::Delete { id, user } => {
            let persona = app.delete_persona(&id, &user).await?;
            println!("Deleted persona {} ({})", persona.name, persona.id);
            Ok(())
        }
        Commands::Ingest { persona_id, file } => {
            let document = read_file(&file)?;
            let count = app.ingest(&persona_id, &document).await?;
            println!("Indexed {} passage(s) for persona {}", count, persona_id);
            Ok(())
        }
        Commands::History {
            persona_id,
            user,
            limit,
        } => {
            let lines = app.history(&persona_id, &user, limit).await?;
            if lines.is_empty() {
                println!("No history.");
            }
            for line in lines {
                println!("{}", line);
            }
            Ok(())
        }
        Commands::Chat { persona_id, user } => handle_chat(&app, persona_id, user).await,
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

async fn handle_categories(app: &App, action: CategoryAction) -> Result<()> {
    if action == CategoryAction::Seed {
        let inserted = app.seed_categories().await?;
        println!("Inserted {} categor(ies)", inserted);
    }
    for category in app.list_categories().await? {
        println!("{:<36} {}", category.id, category.name);
    }
    Ok(())
}

async fn handle_list(app: &App, category: Option<&str>, search: Option<&str>) -> Result<()> {
    let listings = app.list_personas(category, search).await?;
    if listings.is_empty() {
        println!("No personas.");
        return Ok(());
    }

    println!(
        "{:<36} {:<24} {:<8} {}",
        "id", "name", "messages", "description"
    );
    println!("{}", "-".repeat(100));
    for listing in &listings {
        let p = &listing.persona;
        let preview: String = p.description.chars().take(CONTENT_PREVIEW_LEN).collect();
        println!(
            "{:<36} {:<24} {:<8} {}",
            p.id,
            p.name,
            listing.message_count,
            preview.replace('\n', " ")
        );
    }
    Ok(())
}

/// Reads lines from stdin and streams each reply to stdout as tokens arrive.
async fn handle_chat(app: &App, persona_id: String, user: String) -> Result<()> {
    let llm_config = EnvLlmConfig::from_env()?;
    let provider = Arc::new(OpenAILlmClient::from_config(&llm_config));
    let service = app.chat_service(provider, llm_config.temperature(), llm_config.max_tokens());

    let persona = app
        .personas()
        .find_persona(&persona_id)
        .await?
        .with_context(|| format!("persona not found: {}", persona_id))?;
    println!("Chatting with {}. Empty line to quit.", persona.name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        let (mut rx, handle) =
            service.spawn(ChatRequest::new(persona_id.as_str(), user.as_str(), message));
        while let Some(token) = rx.recv().await {
            print!("{}", token);
            std::io::stdout().flush()?;
        }
        println!();

        match handle.await? {
            Ok(report) if report.state == RelayState::Completed && !report.persisted => {
                if let Some(e) = report.persistence_error {
                    eprintln!("(reply not saved: {})", e);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "chat request rejected"),
        }
    }
    Ok(())
}
