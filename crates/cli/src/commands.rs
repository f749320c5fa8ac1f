use bigdecimal::BigDecimal;
use clap::{Args, Subcommand};
use connectors::sql::mysql::query::DEFAULT_TABLE;
use model::pagination::page_size::PageSize;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Print every record, one page at a time
    Stream {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the users older than a given age
    Batches {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value = "25", help = "Only users strictly older than this")]
        min_age: BigDecimal,
    },
    /// Print whole pages instead of single records
    Paginate {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, help = "Stop after this many pages")]
        max_pages: Option<usize>,
    },
    /// Compute the average age without loading the whole table
    AverageAge {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Count users older than an age and compute the average age, reading the
    /// source twice at once through the page cache
    Report {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value = "25", help = "Only users strictly older than this")]
        min_age: BigDecimal,
    },
    /// Read all users and the users older than an age concurrently, over two
    /// separate streams
    Concurrent {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value = "40", help = "Only users strictly older than this")]
        min_age: BigDecimal,
    },
    /// Run one parameterised query for the users older than an age
    Query {
        #[command(flatten)]
        db: DatabaseArgs,

        #[arg(long, default_value = "25", help = "Only users strictly older than this")]
        min_age: BigDecimal,
    },
    /// Create the database and table, then load users from a CSV file
    Seed {
        #[command(flatten)]
        db: DatabaseArgs,

        #[arg(long, help = "CSV file with a user_id,name,email,age header")]
        csv: PathBuf,
    },
    /// Change one user's email inside a transaction
    UpdateEmail {
        #[command(flatten)]
        db: DatabaseArgs,

        #[arg(long)]
        user_id: String,

        #[arg(long)]
        email: String,
    },
    /// Test a connection string against a given source kind
    TestConn {
        /// Source kind: "mysql" or "csv"
        #[arg(long, default_value = "mysql")]
        source: String,

        /// Connection URL, or a file path for csv. Falls back to DATABASE_URL.
        #[arg(long)]
        url: Option<String>,
    },
}

/// Where records are read from and how.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[arg(long, default_value = "mysql", help = "Source kind: mysql or csv")]
    pub source: String,

    #[arg(
        long,
        help = "Connection URL, or a file path for csv. Falls back to DATABASE_URL"
    )]
    pub url: Option<String>,

    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    #[arg(long, default_value = "100", help = "Records per fetch")]
    pub page_size: PageSize,

    #[arg(long, help = "Print records as JSON, one per line")]
    pub json: bool,

    #[arg(long, default_value_t = 3, help = "Attempts per page before giving up")]
    pub retries: usize,

    #[arg(long, default_value_t = 200, help = "Base delay between attempts")]
    pub retry_delay_ms: u64,

    #[arg(long, default_value_t = 0, help = "Pages kept in the cache, 0 disables it")]
    pub cache_pages: usize,
}

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    #[arg(long, help = "MySQL connection URL. Falls back to DATABASE_URL")]
    pub url: Option<String>,

    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,
}
