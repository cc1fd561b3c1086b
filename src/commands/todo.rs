use clap::{Subcommand, ValueEnum};

use todo_sync::client::{ClientError, TodoTools, NOT_FOUND_MESSAGE};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Todo actions, one per tool the server exposes to agents
#[derive(Subcommand)]
pub enum TodoCommand {
    /// List all todo items
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a new todo item
    Add {
        /// Title of the todo item
        title: String,
    },

    /// Show a todo item
    Show {
        /// Todo ID (UUID)
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change the title of a todo item
    Update {
        /// Todo ID (UUID)
        id: String,

        /// New title
        title: String,
    },

    /// Delete a todo item
    Delete {
        /// Todo ID (UUID)
        id: String,
    },
}

impl TodoCommand {
    pub async fn run(&self, tools: &TodoTools) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            TodoCommand::List { format } => match format {
                OutputFormat::Text => println!("{}", tools.list_todos().await?),
                OutputFormat::Json => {
                    let todos = tools.client().list().await?;
                    println!("{}", serde_json::to_string_pretty(&todos)?);
                }
            },
            TodoCommand::Add { title } => println!("{}", tools.add_todo(title).await?),
            TodoCommand::Show { id, format } => match format {
                OutputFormat::Text => println!("{}", tools.get_todo(id).await?),
                OutputFormat::Json => match tools.client().get(id).await {
                    Ok(todo) => println!("{}", serde_json::to_string_pretty(&todo)?),
                    Err(ClientError::NotFound) => println!("{}", NOT_FOUND_MESSAGE),
                    Err(e) => return Err(e.into()),
                },
            },
            TodoCommand::Update { id, title } => {
                println!("{}", tools.update_todo(id, title).await?)
            }
            TodoCommand::Delete { id } => println!("{}", tools.delete_todo(id).await?),
        }
        Ok(())
    }
}
