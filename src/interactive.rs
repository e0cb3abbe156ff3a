use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::info;

use crate::rag::{QueryOptions, RagEngine};

/// Interactive query loop shared by the processor and query tools.
pub async fn run(engine: &RagEngine, opts: QueryOptions) -> Result<()> {
    println!("\n🩺 Interactive medical query mode (type 'quit' or 'exit' to leave)");

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("❓ ") {
            Ok(line) => {
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if matches!(query.to_lowercase().as_str(), "quit" | "exit" | "q") {
                    println!("👋 Exiting interactive mode");
                    break;
                }
                rl.add_history_entry(query).ok();

                info!("Querying: {query}");
                match engine.query(query, opts).await {
                    Ok(result) => {
                        println!("\n💡 {}", result.answer.bright_green());
                        for (i, hit) in result.hits.iter().enumerate() {
                            println!(
                                "   [{}] {} page {} (score {:.2})",
                                i + 1,
                                hit.source,
                                hit.page,
                                hit.score
                            );
                        }
                    }
                    Err(e) => println!("{}", format!("❌ Query error: {e}").red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("👋 Exiting interactive mode");
                break;
            }
            Err(err) => {
                println!("{}", format!("Readline error: {err}").red());
                break;
            }
        }
    }
    Ok(())
}
