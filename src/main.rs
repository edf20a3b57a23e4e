//! # Lectern CLI Application
//!
//! Command-line access to the catalogue and its natural-language search.
//!
//! - `search`: interpret a prompt and list matching books
//! - `interpret`: show the filters a prompt produces, without searching
//! - `filter`: run a JSON filter document through the query compiler
//! - `browse`, `show`, `categories`: read the catalogue
//! - `add`, `delete`, `import`: manage inventory
//! - `checkout`, `checkin`, `loans`: manage loans
//!
//! The AI provider is configured through the environment (see
//! `AiConfig::from_env`); without one every prompt is interpreted by the
//! rule-based fallback.

mod telemetry;

use anyhow::{Context, anyhow};
use chrono::DateTime;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lectern::catalog::{Book, BookQuery, Database, DbError, Loan, NewBook};
use lectern::interpreter::{InterpretationResult, Interpreter};
use lectern::search::{SearchSystem, filters_from_json, search_by_filters};
use std::path::PathBuf;
use tracing::{instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Natural-language search for a library catalogue", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Database path
    #[arg(long, global = true, default_value = "lectern.db")]
    database: PathBuf,

    /// Output format (text|json)
    #[arg(short, long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Also write logs to lectern.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

impl GlobalArgs {
    fn json(&self) -> bool {
        self.format == "json"
    }

    async fn open_database(&self) -> anyhow::Result<Database> {
        let path = self.database.to_string_lossy();
        Database::new_from_path(&path)
            .await
            .with_context(|| format!("Failed to open database {}", path))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the catalogue in plain language
    Search(SearchArgs),

    /// Show how a prompt is interpreted, without searching
    Interpret(InterpretArgs),

    /// Search with a JSON filter document
    Filter(FilterArgs),

    /// Browse the catalogue page by page
    Browse(BrowseArgs),

    /// Show a single book
    Show(BookIdArgs),

    /// Add a book to the catalogue
    Add(AddArgs),

    /// Delete a book and its loan history
    Delete(BookIdArgs),

    /// Import books from a JSON array
    Import(ImportArgs),

    /// List the catalogue's categories
    Categories,

    /// Lend a copy of a book
    Checkout(CheckoutArgs),

    /// Return a borrowed copy
    Checkin(CheckinArgs),

    /// List loans
    Loans(LoansArgs),
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search prompt, e.g. "available french cooking books"
    #[arg(required = true)]
    prompt: String,
}

#[derive(Args, Debug)]
struct InterpretArgs {
    /// Prompt to interpret
    #[arg(required = true)]
    prompt: String,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Filter document, e.g. '{"author": "Tolkien", "sortBy": "year"}'
    #[arg(required_unless_present = "file")]
    filters: Option<String>,

    /// Read the filter document from a file
    #[arg(long, conflicts_with = "filters")]
    file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BrowseArgs {
    /// Match title, author, ISBN, category or tags
    #[arg(short, long)]
    search: Option<String>,

    /// Exact category
    #[arg(short, long)]
    category: Option<String>,

    /// Only books with copies on the shelf
    #[arg(short, long)]
    available: bool,

    /// Earliest publish year
    #[arg(long)]
    from: Option<i64>,

    /// Latest publish year
    #[arg(long)]
    to: Option<i64>,

    /// Page number
    #[arg(short, long, default_value = "1")]
    page: usize,

    /// Books per page
    #[arg(long, default_value = "10")]
    page_size: usize,
}

#[derive(Args, Debug)]
struct BookIdArgs {
    /// Book ID
    #[arg(required = true)]
    id: i64,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(short, long)]
    title: String,

    #[arg(short, long)]
    author: String,

    #[arg(long)]
    isbn: Option<String>,

    #[arg(short, long)]
    category: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    tags: Option<String>,

    #[arg(short, long)]
    description: Option<String>,

    /// Publish year
    #[arg(short, long)]
    year: Option<i64>,

    #[arg(short, long)]
    language: Option<String>,

    /// Shelf location
    #[arg(long)]
    shelf: Option<String>,

    #[arg(long)]
    cover_url: Option<String>,

    /// Number of copies
    #[arg(long, default_value = "1")]
    copies: i64,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// JSON file holding an array of books
    #[arg(required = true)]
    file: PathBuf,
}

#[derive(Args, Debug)]
struct CheckoutArgs {
    /// Book ID
    #[arg(required = true)]
    book_id: i64,

    /// Borrower identifier
    #[arg(required = true)]
    borrower: String,

    /// Loan period in days
    #[arg(short, long)]
    days: Option<i64>,
}

#[derive(Args, Debug)]
struct CheckinArgs {
    /// Loan ID
    #[arg(required = true)]
    loan_id: i64,
}

#[derive(Args, Debug)]
struct LoansArgs {
    /// Only loans of this book
    #[arg(short, long)]
    book: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber(cli.global.log_dir.as_deref())?;

    let global = &cli.global;
    match cli.command {
        Some(Commands::Search(args)) => search_command(global, args).await?,
        Some(Commands::Interpret(args)) => interpret_command(global, args).await?,
        Some(Commands::Filter(args)) => filter_command(global, args).await?,
        Some(Commands::Browse(args)) => browse_command(global, args).await?,
        Some(Commands::Show(args)) => show_command(global, args).await?,
        Some(Commands::Add(args)) => add_command(global, args).await?,
        Some(Commands::Delete(args)) => delete_command(global, args).await?,
        Some(Commands::Import(args)) => import_command(global, args).await?,
        Some(Commands::Categories) => categories_command(global).await?,
        Some(Commands::Checkout(args)) => checkout_command(global, args).await?,
        Some(Commands::Checkin(args)) => checkin_command(global, args).await?,
        Some(Commands::Loans(args)) => loans_command(global, args).await?,
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["lectern", "--help"]);
        }
    }

    Ok(())
}

#[instrument(skip(global))]
async fn search_command(global: &GlobalArgs, args: SearchArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;
    let search = SearchSystem::new(db, Interpreter::from_env()?);

    let outcome = search.search(&args.prompt).await?;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_interpretation(&outcome.interpretation);
        println!();
        print_books(&outcome.books);
    }

    Ok(())
}

#[instrument(skip(global))]
async fn interpret_command(global: &GlobalArgs, args: InterpretArgs) -> anyhow::Result<()> {
    let prompt = args.prompt.trim();
    if prompt.is_empty() {
        return Err(anyhow!("Prompt cannot be empty"));
    }

    let interpretation = Interpreter::from_env()?.interpret(prompt).await;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&interpretation)?);
    } else {
        print_interpretation(&interpretation);
        println!(
            "Filters: {}",
            serde_json::to_string_pretty(&interpretation.filters)?
        );
    }

    Ok(())
}

#[instrument(skip(global))]
async fn filter_command(global: &GlobalArgs, args: FilterArgs) -> anyhow::Result<()> {
    let document = match (args.filters, args.file) {
        (Some(filters), _) => filters,
        (None, Some(file)) => tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None) => return Err(anyhow!("No filter document given")),
    };

    let filters = filters_from_json(&document)?;
    let db = global.open_database().await?;
    let books = search_by_filters(&db, &filters).await?;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&books)?);
    } else {
        print_books(&books);
    }

    Ok(())
}

#[instrument(skip(global))]
async fn browse_command(global: &GlobalArgs, args: BrowseArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;

    let query = BookQuery {
        search_term: args.search,
        category: args.category,
        available_only: args.available,
        publish_year_min: args.from,
        publish_year_max: args.to,
        page: args.page,
        page_size: args.page_size,
    };
    let page = db.browse(&query).await?;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print_books(&page.books);
        println!(
            "Page {} of {} ({} books)",
            page.page,
            page.total_pages().max(1),
            page.total_count
        );
    }

    Ok(())
}

#[instrument(skip(global))]
async fn show_command(global: &GlobalArgs, args: BookIdArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;

    let book = db
        .get_book(args.id)
        .await?
        .ok_or_else(|| anyhow!("Book {} not found", args.id))?;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&book)?);
        return Ok(());
    }

    println!("{}", book.title);
    println!("Author: {}", book.author);
    let optional = [
        ("ISBN", book.isbn.as_deref()),
        ("Category", book.category.as_deref()),
        ("Tags", book.tags.as_deref()),
        ("Language", book.language.as_deref()),
        ("Shelf", book.location_shelf.as_deref()),
        ("Cover", book.cover_image_url.as_deref()),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
    if let Some(year) = book.publish_year {
        println!("Published: {}", year);
    }
    println!(
        "Copies: {} of {} available",
        book.available_copies, book.total_copies
    );
    if let Some(description) = &book.description {
        println!();
        println!("{}", description);
    }

    Ok(())
}

#[instrument(skip(global))]
async fn add_command(global: &GlobalArgs, args: AddArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;

    let book = NewBook {
        title: args.title,
        author: args.author,
        isbn: args.isbn,
        category: args.category,
        tags: args.tags,
        description: args.description,
        publish_year: args.year,
        language: args.language,
        location_shelf: args.shelf,
        cover_image_url: args.cover_url,
        total_copies: args.copies,
        available_copies: args.copies,
    };
    let id = db.add_book(&book).await?;

    if global.json() {
        println!("{}", serde_json::json!({ "id": id }));
    } else {
        println!("Added '{}' with ID {}", book.title, id);
    }

    Ok(())
}

#[instrument(skip(global))]
async fn delete_command(global: &GlobalArgs, args: BookIdArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;

    db.delete_book(args.id).await?;
    println!("Deleted book {}", args.id);

    Ok(())
}

#[instrument(skip(global))]
async fn import_command(global: &GlobalArgs, args: ImportArgs) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let books: Vec<NewBook> = serde_json::from_str(&content)?;

    let db = global.open_database().await?;

    let progress_bar = ProgressBar::new(books.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.set_message("Importing books...");

    let mut imported = 0;
    let mut rejected = 0;
    for book in &books {
        match db.add_book(book).await {
            Ok(_) => imported += 1,
            Err(DbError::Validation(reason)) => {
                warn!(title = %book.title, %reason, "Skipping invalid book");
                rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
        progress_bar.inc(1);
        progress_bar.set_message(format!("Imported '{}'", book.title));
    }
    progress_bar.finish_with_message("Import completed");

    println!("Imported {} books ({} rejected)", imported, rejected);

    Ok(())
}

#[instrument(skip(global))]
async fn categories_command(global: &GlobalArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;
    let categories = db.list_categories().await?;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for category in categories {
            println!("{}", category);
        }
    }

    Ok(())
}

#[instrument(skip(global))]
async fn checkout_command(global: &GlobalArgs, args: CheckoutArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;
    let loan = db.checkout(args.book_id, &args.borrower, args.days).await?;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&loan)?);
    } else {
        println!(
            "Loan {}: book {} lent to {}, due {}",
            loan.id,
            loan.book_id,
            loan.borrower,
            format_timestamp(loan.due_at)
        );
    }

    Ok(())
}

#[instrument(skip(global))]
async fn checkin_command(global: &GlobalArgs, args: CheckinArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;
    let loan = db.checkin(args.loan_id).await?;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&loan)?);
    } else {
        println!("Loan {} returned", loan.id);
    }

    Ok(())
}

#[instrument(skip(global))]
async fn loans_command(global: &GlobalArgs, args: LoansArgs) -> anyhow::Result<()> {
    let db = global.open_database().await?;
    let loans = db.loans(args.book).await?;

    if global.json() {
        println!("{}", serde_json::to_string_pretty(&loans)?);
    } else {
        println!("Loans: {}", loans.len());
        for loan in &loans {
            print_loan(loan);
        }
    }

    Ok(())
}

fn print_interpretation(interpretation: &InterpretationResult) {
    println!("{}", interpretation.explanation);
    if interpretation.used_fallback {
        println!("(rule-based interpretation)");
    }
}

fn print_books(books: &[Book]) {
    println!("Found {} books", books.len());
    for (i, book) in books.iter().enumerate() {
        let year = book
            .publish_year
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        println!("{}. {} by {}{}", i + 1, book.title, book.author, year);

        let category = book.category.as_deref().unwrap_or("Uncategorised");
        let availability = if book.is_available() {
            format!("{}/{} available", book.available_copies, book.total_copies)
        } else {
            "all copies on loan".to_string()
        };
        println!("   [{}] {} - {}", book.id, category, availability);
    }
}

fn print_loan(loan: &Loan) {
    let returned = loan
        .returned_at
        .map(|ts| format!(", returned {}", format_timestamp(ts)))
        .unwrap_or_default();
    println!(
        "{}. book {} - {} ({}) borrowed {}, due {}{}",
        loan.id,
        loan.book_id,
        loan.borrower,
        loan.status.as_str(),
        format_timestamp(loan.borrowed_at),
        format_timestamp(loan.due_at),
        returned
    );
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
