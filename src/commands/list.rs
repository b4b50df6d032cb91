use clap::Subcommand;
use uuid::Uuid;

use grocery_list_core::ListPayload;
use grocerylist::client::ListClient;

use super::OutputFormat;

#[derive(Subcommand)]
pub enum ListCommand {
    /// List the lists you own or that are shared with you
    Lists {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a list's items and sharing
    Show {
        /// List ID
        id: Uuid,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a new list
    New {
        /// Name of the list
        name: String,

        /// Create a template instead of a plain list
        #[arg(long, conflicts_with = "from")]
        template: bool,

        /// Start with the items of one of your templates
        #[arg(long, value_name = "TEMPLATE_ID")]
        from: Option<Uuid>,
    },

    /// Add items to a list
    Add {
        /// List ID
        id: Uuid,

        /// Item names
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Remove items from a list
    Remove {
        /// List ID
        id: Uuid,

        /// Item names
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Rename a list
    Rename {
        /// List ID
        id: Uuid,

        /// New name
        name: String,
    },

    /// Delete a list
    Delete {
        /// List ID
        id: Uuid,
    },

    /// Give another user read access to a list
    Share {
        /// List ID
        id: Uuid,

        username: String,
    },

    /// Revoke another user's access to a list
    Unshare {
        /// List ID
        id: Uuid,

        username: String,
    },
}

impl ListCommand {
    pub async fn run(&self, client: &ListClient) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            ListCommand::Lists { format } => {
                let names = client.list_names().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
                    OutputFormat::Text => {
                        if names.is_empty() {
                            println!("No lists found.");
                        } else {
                            println!("{:<38} NAME", "ID");
                            println!("{}", "-".repeat(60));
                            for (id, name) in &names {
                                println!("{:<38} {}", id, name);
                            }
                        }
                    }
                }
            }
            ListCommand::Show { id, format } => {
                let list = client.get_list(*id).await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                    OutputFormat::Text => print!("{}", render(&list)),
                }
            }
            ListCommand::New {
                name,
                template,
                from,
            } => {
                let list = client.create_list(name, *template, *from).await?;
                println!("Created list: {} ({})", list.name, list.id);
            }
            ListCommand::Add { id, items } => {
                let list = client.get_list(*id).await?;
                let saved = client.save_list(&with_items_added(list, items)).await?;
                print!("{}", render(&saved));
            }
            ListCommand::Remove { id, items } => {
                let list = client.get_list(*id).await?;
                let saved = client.save_list(&with_items_removed(list, items)).await?;
                print!("{}", render(&saved));
            }
            ListCommand::Rename { id, name } => {
                let mut list = client.get_list(*id).await?;
                list.name = name.clone();
                let saved = client.save_list(&list).await?;
                println!("Renamed list {} to {}", saved.id, saved.name);
            }
            ListCommand::Delete { id } => {
                client.delete_list(*id).await?;
                println!("Deleted list: {}", id);
            }
            ListCommand::Share { id, username } => {
                client.share_list(*id, username).await?;
                println!("Shared list {} with {}", id, username);
            }
            ListCommand::Unshare { id, username } => {
                client.unshare_list(*id, username).await?;
                println!("Unshared list {} from {}", id, username);
            }
        }
        Ok(())
    }
}

/// The list with `names` appended. Names already present are left alone;
/// the server discards duplicates in any case.
fn with_items_added(mut list: ListPayload, names: &[String]) -> ListPayload {
    for name in names {
        let name = name.trim();
        if !list.items.iter().any(|existing| existing == name) {
            list.items.push(name.to_string());
        }
    }
    list
}

/// The list without `names`. Matching is exact, as on the server.
fn with_items_removed(mut list: ListPayload, names: &[String]) -> ListPayload {
    list.items
        .retain(|existing| !names.iter().any(|name| name.trim() == existing));
    list
}

fn render(list: &ListPayload) -> String {
    let mut out = String::new();
    if list.is_template {
        out.push_str(&format!("{} (template)\n", list.name));
    } else {
        out.push_str(&format!("{}\n", list.name));
    }
    out.push_str(&format!("ID: {}\n", list.id));
    out.push_str(&format!("Owner: {}\n", list.owner));
    if !list.shared_users.is_empty() {
        out.push_str(&format!("Shared with: {}\n", list.shared_users.join(", ")));
    }

    if list.items.is_empty() {
        out.push_str("\nNo items.\n");
    } else {
        out.push_str("\nItems:\n");
        for item in &list.items {
            out.push_str(&format!("  - {}\n", item));
        }
    }
    out
}
