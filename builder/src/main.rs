use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use recommender::normalize::RecordNormalizer;
use recommender::recommend::TreePickParams;
use recommender::snapshot::{load_snapshot, save_snapshot, SnapshotPaths};
use recommender::Snapshot;
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Parser)]
#[command(name = "builder")]
#[command(about = "Build and query game recommendation snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot from JSON-lines dumps of games, user items and reviews
    Build {
        /// Game metadata, one object per line
        #[arg(long)]
        games: String,
        /// User-owned items, one user per line
        #[arg(long)]
        items: String,
        /// User reviews, one user per line
        #[arg(long)]
        reviews: Option<String>,
        /// Output snapshot directory
        #[arg(long)]
        output: String,
        /// Lines of the items file to load (0 = all)
        #[arg(long, default_value_t = 0)]
        max_item_lines: usize,
        /// Lines of the reviews file to load (0 = all)
        #[arg(long, default_value_t = 0)]
        max_review_lines: usize,
    },
    /// Print the most popular games, overall or within a genre
    Top {
        #[arg(long, default_value = "./snapshot")]
        snapshot: String,
        #[arg(long)]
        genre: Option<String>,
    },
    /// Print graph, tree and hybrid recommendations for a game
    Recommend {
        #[arg(long, default_value = "./snapshot")]
        snapshot: String,
        /// Game name (case-insensitive)
        #[arg(long)]
        game: String,
        #[arg(long, default_value = "Action")]
        genre: String,
        /// Seed for the random tree picks
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { games, items, reviews, output, max_item_lines, max_review_lines } => {
            let snapshot = build_snapshot(Path::new(&games), Path::new(&items), reviews.as_deref().map(Path::new), max_item_lines, max_review_lines)?;
            let meta = save_snapshot(&SnapshotPaths::new(&output), &snapshot)?;
            tracing::info!(output = %output, graph_nodes = meta.graph_nodes, graph_edges = meta.graph_edges, "snapshot written");
            print_ranking("TOP 10 MOST POPULAR GAMES (OVERALL)", &snapshot.popularity.top10_overall());
            Ok(())
        }
        Commands::Top { snapshot, genre } => {
            let snapshot = load_snapshot(&SnapshotPaths::new(&snapshot))?;
            match genre {
                Some(g) => print_ranking(&format!("TOP 10 MOST POPULAR GAMES IN GENRE '{g}'"), &snapshot.popularity.top10_in_category(&g)),
                None => print_ranking("TOP 10 MOST POPULAR GAMES (OVERALL)", &snapshot.popularity.top10_overall()),
            }
            Ok(())
        }
        Commands::Recommend { snapshot, game, genre, seed } => {
            let snapshot = load_snapshot(&SnapshotPaths::new(&snapshot))?;
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            recommend(&snapshot, &game, &genre, &mut rng)
        }
    }
}

fn build_snapshot(games: &Path, items: &Path, reviews: Option<&Path>, max_item_lines: usize, max_review_lines: usize) -> Result<Snapshot> {
    let mut normalizer = RecordNormalizer::new();
    for_each_record(games, 0, "games", |v| { normalizer.push_game(v); })?;
    let loaded = normalizer.stats();
    if loaded.games_skipped > 0 {
        tracing::warn!(skipped = loaded.games_skipped, kept = loaded.games, "game records without an id were skipped");
    }
    for_each_record(items, max_item_lines, "user_items", |v| normalizer.push_user_items(v))?;
    if let Some(reviews) = reviews {
        for_each_record(reviews, max_review_lines, "user_reviews", |v| normalizer.push_user_reviews(v))?;
    }
    let normalized = normalizer.finish();
    let stats = normalized.stats;
    tracing::info!(games = stats.games, games_skipped = stats.games_skipped, ownership_pairs = stats.ownership_pairs, reviews = stats.reviews, "records normalized");
    Ok(Snapshot::build(normalized.catalog, &normalized.ownership, normalized.ratings))
}

/// Feeds the first `max_lines` lines (0 = all) of a JSON-lines file to `f`,
/// logging progress about every 5%. Returns the number of records parsed.
fn for_each_record(path: &Path, max_lines: usize, label: &str, mut f: impl FnMut(&Value)) -> Result<usize> {
    let total = count_lines(path)?;
    let limit = if max_lines == 0 || max_lines > total { total } else { max_lines };
    tracing::info!(file = %path.display(), limit, total, "loading {label}");

    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let step = (limit / 20).max(1);
    let mut records = 0usize;
    for (idx, line) in reader.lines().take(limit).enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("{}:{line_no}: unreadable line", path.display()))?;
        if line_no % step == 0 {
            tracing::info!("loading {label}: {}% ({line_no}/{limit} lines)", line_no * 100 / limit);
        }
        if line.trim().is_empty() { continue; }
        let record: Value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{line_no}: malformed JSON record", path.display()))?;
        f(&record);
        records += 1;
    }
    Ok(records)
}

fn count_lines(path: &Path) -> Result<usize> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(f).lines().count())
}

fn recommend(snapshot: &Snapshot, game: &str, genre: &str, rng: &mut StdRng) -> Result<()> {
    let Some(game_id) = snapshot.resolve(game) else {
        bail!("game not found: {game}");
    };
    let params = TreePickParams::default();

    let top_genre = snapshot.popularity.top10_in_category(genre);
    if top_genre.is_empty() {
        println!("No games found in genre '{genre}'.");
    } else {
        print_ranking(&format!("TOP 10 MOST POPULAR GAMES IN GENRE '{genre}'"), &top_genre);
    }
    let by_tree = snapshot.recommend_by_tree(genre, params, rng);
    let by_graph = snapshot.recommend_by_graph(game_id, 5);
    let hybrid = snapshot.hybrid(game_id, genre, params, rng);

    println!("\n[Tree-based: random highly rated in '{genre}'] {by_tree:?}");
    println!("[Graph similarity to '{game}' (ID: {game_id})] {by_graph:?}");
    match hybrid.notice {
        Some(notice) => println!("[Hybrid] {notice}"),
        None => println!("[Hybrid] {:?}", hybrid.names),
    }
    Ok(())
}

fn print_ranking(title: &str, names: &[String]) {
    println!("\n===== {title} =====");
    for (i, name) in names.iter().enumerate() {
        println!("{}. {name}", i + 1);
    }
}
