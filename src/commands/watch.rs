use clap::Args;

use todo_sync::client::{ClientError, SyncListener};
use todo_sync::protocol::ServerMessage;

/// Print todo changes as they happen
#[derive(Args)]
pub struct WatchCommand {
    /// Skip printing the initial list
    #[arg(long)]
    quiet: bool,
}

impl WatchCommand {
    pub async fn run(&self, server_url: &str) -> Result<(), ClientError> {
        let mut listener = SyncListener::connect(server_url).await?;

        while let Some(message) = listener.next_message().await? {
            match message {
                ServerMessage::Init { todos } => {
                    if self.quiet {
                        continue;
                    }
                    println!("Connected to {} ({} todo(s))", server_url, todos.len());
                    for todo in &todos {
                        println!("  {}", todo);
                    }
                    println!();
                }
                ServerMessage::Create { todo } => println!("+ {}", todo),
                ServerMessage::Update { todo } => println!("~ {}", todo),
                ServerMessage::Delete { id } => println!("- {}", id),
            }
        }

        println!("Server closed the connection.");
        Ok(())
    }
}
