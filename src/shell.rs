//! The interactive shell: a `(<nodeId>) >` prompt where plain text submits
//! a chat message and a handful of `/` commands inspect or stop the node.

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commit::{self, SubmitError};
use crate::node::Node;

pub async fn run(node: Arc<Node>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_prompt(&node);
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = node.shutdown.wait() => break,
        };

        let line = match line {
            Ok(Some(l)) => l,
            Ok(None) => break, // stdin closed
            Err(e) => {
                log::warn!("{}: shell read error: {}", node.id, e);
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            print_prompt(&node);
            continue;
        }

        match trimmed {
            "/exit" => {
                node.shutdown.trigger();
                break;
            }
            "/help" => print_help(),
            "/history" => print_history(&node).await,
            text => {
                if let Err(SubmitError::NoLeader) = commit::submit(&node, text.to_string()).await {
                    println!("no leader available right now; try again shortly");
                }
            }
        }

        if node.shutdown.is_set() {
            break;
        }
        print_prompt(&node);
    }
}

fn print_prompt(node: &Node) {
    print!("({}) > ", node.id);
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("commands:");
    println!("  /history   show this node's committed message log");
    println!("  /exit      shut this node down");
    println!("  /help      show this message");
    println!("  <text>     submit <text> as a chat message");
}

async fn print_history(node: &Node) {
    match node.log.history().await {
        Ok(entries) => {
            for e in entries {
                println!("[{}] {}: {}", e.appended_at.to_rfc3339(), e.sender, e.content);
            }
        }
        Err(e) => println!("failed to read history: {e}"),
    }
}
