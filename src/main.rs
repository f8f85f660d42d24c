use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use todostore::{
    Backend, Config, FilterUpdate, NewTodo, Todo, TodoPriority, TodoStatus, TodoStore, TodoUpdate, parse_timestamp,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - manage a persisted todo list")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/todostore/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the data directory from the config
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Override the storage backend (file or sqlite)
    #[arg(short, long)]
    backend: Option<Backend>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a todo
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "medium")]
        priority: TodoPriority,
        #[arg(short, long, default_value = "")]
        category: String,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// List todos, optionally filtered
    List {
        #[arg(short, long)]
        status: Option<TodoStatus>,
        #[arg(short, long)]
        priority: Option<TodoPriority>,
        #[arg(short, long)]
        category: Option<String>,
        /// Case-insensitive search over title, description and tags
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Keep todos carrying any of these tags
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Show one todo in full
    Show { id: String },

    /// Change fields of a todo
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TodoStatus>,
        #[arg(long)]
        priority: Option<TodoPriority>,
        #[arg(long)]
        category: Option<String>,
        /// Replace the tag list
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },

    /// Advance status: todo -> in-progress -> done -> todo
    Toggle { id: String },

    /// Delete a todo
    Delete { id: String },

    /// Move a todo to a position (0 = first)
    Move { id: String, position: usize },

    /// Counts per status
    Stats,

    /// Distinct categories
    Categories,

    /// Distinct tags
    Tags,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let mut store = TodoStore::open(config.open_backend()?)?;

    match cli.command {
        Commands::Add {
            title,
            description,
            priority,
            category,
            tags,
            due,
        } => {
            let mut data = NewTodo::new(title)
                .description(description)
                .priority(priority)
                .category(category)
                .tags(tags);
            if let Some(due) = due {
                data = data.due_date(parse_timestamp(&due)?);
            }
            let id = store.add_todo(data)?;
            println!("Added {}", id.bold());
        }
        Commands::List {
            status,
            priority,
            category,
            search,
            tags,
        } => {
            let mut filter = FilterUpdate::new();
            if status.is_some() {
                filter = filter.status(status);
            }
            if priority.is_some() {
                filter = filter.priority(priority);
            }
            if category.is_some() {
                filter = filter.category(category);
            }
            if search.is_some() {
                filter = filter.search_query(search);
            }
            if !tags.is_empty() {
                filter = filter.tags(Some(tags));
            }
            store.update_filter(filter);

            let todos = store.filtered_todos();
            if todos.is_empty() {
                println!("No todos");
            }
            for todo in todos {
                print_line(todo);
            }
        }
        Commands::Show { id } => {
            let id = resolve_id(&store, &id)?;
            if let Some(todo) = store.get_todo_by_id(&id) {
                print_full(todo);
            }
        }
        Commands::Update {
            id,
            title,
            description,
            status,
            priority,
            category,
            tags,
            due,
            clear_due,
        } => {
            let id = resolve_id(&store, &id)?;
            let updates = TodoUpdate {
                title,
                description,
                status,
                priority,
                category,
                tags: (!tags.is_empty()).then_some(tags),
                due_date: match (due, clear_due) {
                    (Some(due), _) => Some(Some(parse_timestamp(&due)?)),
                    (None, true) => Some(None),
                    (None, false) => None,
                },
                completed_at: None,
            };
            if updates.is_empty() {
                println!("Nothing to update for {}", id.bold());
            } else {
                store.update_todo(&id, updates)?;
                println!("Updated {}", id.bold());
            }
        }
        Commands::Toggle { id } => {
            let id = resolve_id(&store, &id)?;
            store.toggle_todo_status(&id)?;
            if let Some(todo) = store.get_todo_by_id(&id) {
                print_line(todo);
            }
        }
        Commands::Delete { id } => {
            let id = resolve_id(&store, &id)?;
            store.delete_todo(&id)?;
            println!("Deleted {}", id.bold());
        }
        Commands::Move { id, position } => {
            let id = resolve_id(&store, &id)?;
            store.move_todo(&id, position)?;
            println!("Moved {} to {}", id.bold(), position);
        }
        Commands::Stats => {
            let stats = store.stats();
            println!("{:<12} {}", "total", stats.total.to_string().bold());
            println!("{:<12} {}", TodoStatus::Todo.to_string().yellow(), stats.todo);
            println!("{:<12} {}", TodoStatus::InProgress.to_string().cyan(), stats.in_progress);
            println!("{:<12} {}", TodoStatus::Done.to_string().green(), stats.done);
        }
        Commands::Categories => {
            for category in store.categories() {
                println!("{}", category);
            }
        }
        Commands::Tags => {
            for tag in store.all_tags() {
                println!("{}", tag);
            }
        }
    }

    Ok(())
}

/// Accept a full id or an unambiguous prefix of one
fn resolve_id(store: &TodoStore, input: &str) -> Result<String> {
    if store.get_todo_by_id(input).is_some() {
        return Ok(input.to_string());
    }

    let matches: Vec<&Todo> = store.todos().iter().filter(|t| t.id.starts_with(input)).collect();
    match matches.as_slice() {
        [todo] => Ok(todo.id.clone()),
        [] => Err(eyre!("No todo with id {}", input)),
        _ => Err(eyre!("Id prefix {} is ambiguous ({} matches)", input, matches.len())),
    }
}

fn status_label(status: TodoStatus) -> colored::ColoredString {
    match status {
        TodoStatus::Todo => status.as_str().yellow(),
        TodoStatus::InProgress => status.as_str().cyan(),
        TodoStatus::Done => status.as_str().green(),
    }
}

fn priority_label(priority: TodoPriority) -> colored::ColoredString {
    match priority {
        TodoPriority::Low => priority.as_str().dimmed(),
        TodoPriority::Medium => priority.as_str().normal(),
        TodoPriority::High => priority.as_str().magenta(),
        TodoPriority::Urgent => priority.as_str().red().bold(),
    }
}

fn print_line(todo: &Todo) {
    let short_id: String = todo.id.chars().take(8).collect();
    let mut line = format!(
        "{} [{:^11}] {:<6} {}",
        short_id.dimmed(),
        status_label(todo.status),
        priority_label(todo.priority),
        todo.title
    );
    if !todo.category.is_empty() {
        line.push_str(&format!(" ({})", todo.category.blue()));
    }
    if !todo.tags.is_empty() {
        line.push_str(&format!(" #{}", todo.tags.join(" #")));
    }
    println!("{}", line);
}

fn print_full(todo: &Todo) {
    println!("{:<12} {}", "id", todo.id);
    println!("{:<12} {}", "title", todo.title.bold());
    if !todo.description.is_empty() {
        println!("{:<12} {}", "description", todo.description);
    }
    println!("{:<12} {}", "status", status_label(todo.status));
    println!("{:<12} {}", "priority", priority_label(todo.priority));
    if !todo.category.is_empty() {
        println!("{:<12} {}", "category", todo.category);
    }
    if !todo.tags.is_empty() {
        println!("{:<12} {}", "tags", todo.tags.join(", "));
    }
    println!("{:<12} {}", "created", todo.created_at.to_rfc3339());
    println!("{:<12} {}", "updated", todo.updated_at.to_rfc3339());
    if let Some(due) = todo.due_date {
        println!("{:<12} {}", "due", due.to_rfc3339());
    }
    if let Some(completed) = todo.completed_at {
        println!("{:<12} {}", "completed", completed.to_rfc3339());
    }
}
