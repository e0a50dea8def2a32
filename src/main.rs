mod commands;
mod logging;

use std::path::PathBuf;

use bookshelf_pipeline::config::{DEFAULT_PAGE_SIZE, USER_ID_ENV};
use bookshelf_pipeline::query::SortMode;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bookshelf",
    version,
    about = "Book-rating catalog converter and incremental read-list scraper"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the Douban and Goodreads exports into one catalog
    Convert {
        /// Douban export (ID, Rating, Votes, Title)
        #[arg(long, default_value = "data/douban.csv")]
        douban: PathBuf,
        /// Goodreads export (id, rating, num_ratings, title, author)
        #[arg(long, default_value = "data/goodreads.csv")]
        goodreads: PathBuf,
        /// Read list used to drop other editions of read books
        #[arg(long, default_value = "data/read.json")]
        read: PathBuf,
        /// Skip the edition cross-reference
        #[arg(long)]
        no_read: bool,
        /// Catalog output
        #[arg(long, default_value = "data/books.json")]
        output: PathBuf,
    },
    /// Convert a single Douban export, adding subject URLs
    ConvertSingle {
        #[arg(long, default_value = "books.csv")]
        input: PathBuf,
        #[arg(long, default_value = "books.json")]
        output: PathBuf,
    },
    /// Convert the six-column Douban text export
    ConvertDetailed {
        #[arg(long, default_value = "books.txt")]
        input: PathBuf,
        #[arg(long, default_value = "books.json")]
        output: PathBuf,
    },
    /// Fetch newly read books and merge them into the read list
    Scrape {
        /// Douban account id
        #[arg(long, env = USER_ID_ENV, hide_env_values = true)]
        user_id: Option<String>,
        /// Persisted read list
        #[arg(long, default_value = "data/read.json")]
        read: PathBuf,
        /// Douban export to backfill with unknown books
        #[arg(long, default_value = "data/douban.csv")]
        douban: PathBuf,
        /// Interests requested per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
        /// Pause between page requests, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    /// Filter and sort a generated catalog
    Query {
        /// Catalog to read
        #[arg(long, default_value = "data/books.json")]
        input: PathBuf,
        /// Sort order: rating, count or none
        #[arg(long, default_value = "rating")]
        sort: SortMode,
        /// Maximum number of books to print
        #[arg(long, default_value_t = 30)]
        limit: usize,
        /// Conditions such as `评分:>=8.5 人数:>1000 标题:三体`
        conditions: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Convert {
            douban,
            goodreads,
            read,
            no_read,
            output,
        } => {
            let read = (!no_read).then_some(read);
            commands::convert::catalog(douban, goodreads, read, output).await
        }
        Commands::ConvertSingle { input, output } => {
            commands::convert::single(input, output).await
        }
        Commands::ConvertDetailed { input, output } => {
            commands::convert::detailed(input, output).await
        }
        Commands::Scrape {
            user_id,
            read,
            douban,
            page_size,
            delay_ms,
        } => commands::scrape::execute(user_id, read, douban, page_size, delay_ms).await,
        Commands::Query {
            input,
            sort,
            limit,
            conditions,
        } => commands::query::execute(&input, sort, limit, &conditions.join(" ")),
    }
}
