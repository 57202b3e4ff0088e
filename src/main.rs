use chrono::{DateTime, Utc};
use clap::Parser;
use contribscores::{
    dump_parser::DumpParser,
    report::compute_report_at,
    request::{ReportDefaults, ReportRequest},
    store::{read_real_names, read_user_ids, MemoryRevisionStore, MemoryUserStatus},
    AuthorAggregate,
};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing_subscriber::EnvFilter;

/// Ranks the contributors of a MediaWiki XML history dump.
#[derive(Debug, clap::Parser)]
#[command(version, about)]
struct CommandLine {
    /// XML dump, optionally zstd compressed (`.zst`)
    input_file: PathBuf,
    /// Only count edits of the last N days, 0 for the whole history
    #[arg(long, allow_negative_numbers = true)]
    days: Option<i64>,
    /// Maximum number of authors, 0 for no limit
    #[arg(long, allow_negative_numbers = true)]
    limit: Option<i64>,
    /// Include parameters `limit/days/options`, overrides --days and --limit
    #[arg(long)]
    include: Option<String>,
    /// Compute the default set of reports (last week, last month, top 50 of all time)
    #[arg(long, conflicts_with_all = ["include", "days", "limit"])]
    default_reports: bool,
    /// Ignore edits of members of the bot group
    #[arg(long)]
    no_bots: bool,
    /// Ignore edits of blocked users
    #[arg(long)]
    no_blocked: bool,
    /// Count edits of user pages
    #[arg(long)]
    user_namespace: bool,
    /// Count edits in every namespace, including talk pages
    #[arg(long)]
    all_namespaces: bool,
    /// File with the ids of bot users, one per line
    #[arg(long)]
    bots: Option<PathBuf>,
    /// File with the ids of blocked users, one per line
    #[arg(long)]
    blocked: Option<PathBuf>,
    /// Show real names instead of user names where one is set
    #[arg(long, requires = "real_names")]
    use_real_name: bool,
    /// File with real names, one `id<TAB>name` pair per line
    #[arg(long)]
    real_names: Option<PathBuf>,
    /// End of the report window (RFC 3339), defaults to the current time
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ReportLine<'a> {
    window_days: i64,
    rank: usize,
    user_id: i32,
    user_name: &'a str,
    display_name: &'a str,
    score: f64,
    page_count: u64,
    edit_count: u64,
    size_diff: i64,
    pos_diff: i64,
    neg_diff: i64,
}

impl<'a> ReportLine<'a> {
    fn new(window_days: i64, rank: usize, author: &'a AuthorAggregate) -> Self {
        Self {
            window_days,
            rank,
            user_id: author.author_id,
            user_name: author.author_name.as_str(),
            display_name: author.display_name.as_str(),
            score: author.score,
            page_count: author.page_count,
            edit_count: author.edit_count,
            size_diff: author.size_diff,
            pos_diff: author.pos_diff,
            neg_diff: author.neg_diff,
        }
    }
}

fn open_dump(path: &Path) -> Result<Box<dyn BufRead>, Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    if path.extension().is_some_and(|extension| extension == "zst") {
        let decoder = zstd::stream::Decoder::with_buffer(reader)?;
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(reader))
    }
}

fn read_user_list(path: Option<&Path>) -> Result<Vec<i32>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(read_user_ids(BufReader::new(File::open(path)?))?
            .into_iter()
            .collect()),
        None => Ok(Vec::new()),
    }
}

fn requests(args: &CommandLine) -> Vec<ReportRequest> {
    let defaults = ReportDefaults {
        exclude_bots: args.no_bots,
        exclude_blocked: args.no_blocked,
        use_real_name: args.use_real_name,
        ..ReportDefaults::default()
    };

    let mut requests = if args.default_reports {
        defaults.default_reports()
    } else if let Some(include) = &args.include {
        // presentation options are for renderers, JSON lines have no title or tools
        vec![ReportRequest::from_include_params(include, &defaults).0]
    } else {
        let window_days = args.days.unwrap_or(defaults.window_days).max(0);
        vec![defaults.request(window_days, args.limit.unwrap_or(defaults.limit))]
    };

    for request in &mut requests {
        request.include_user_namespace |= args.user_namespace;
        if args.all_namespaces {
            request.content_namespaces_only = false;
        }
    }
    requests
}

fn run(args: &CommandLine) -> Result<(), Box<dyn std::error::Error>> {
    let mut parser = DumpParser::new(open_dump(&args.input_file)?)?;
    tracing::info!(site_info = ?parser.site_info());

    let revisions = MemoryRevisionStore::from_dump(&mut parser)?;
    let real_names = match &args.real_names {
        Some(path) => read_real_names(BufReader::new(File::open(path)?))?,
        None => Default::default(),
    };
    let users = MemoryUserStatus::new()
        .with_bots(read_user_list(args.bots.as_deref())?)
        .with_blocked(read_user_list(args.blocked.as_deref())?)
        .with_real_names(real_names);
    let now = args.now.unwrap_or_else(Utc::now);

    let stdout = std::io::stdout();
    let mut output = BufWriter::new(stdout.lock());
    for request in requests(args) {
        let report = compute_report_at(&request, now, &revisions, &users)?;
        tracing::info!(
            message = "computed report",
            window_days = request.window_days,
            limit = request.limit,
            authors = report.len()
        );

        for (index, author) in report.iter().enumerate() {
            serde_json::to_writer(
                &mut output,
                &ReportLine::new(request.window_days, index + 1, author),
            )?;
            writeln!(output)?;
        }
    }
    output.flush()?;

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CommandLine::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(message = "failed to compute report", error = %error);
            ExitCode::FAILURE
        }
    }
}
