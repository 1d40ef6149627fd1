use clap::{Args, Parser, Subcommand, ValueEnum};
use dialoguer::{Confirm, Input, Select};
use std::error::Error;
use std::path::PathBuf;
use std::process;
use streamiz::{
    BACKDROP_SIZE, CatalogItem, Config, EditorSession, EpisodeEntry, ExternalId, FileBackend,
    ItemDetails, LocalStore, MediaType, MetadataError, MetadataProvider, POSTER_SIZE, Page, Show,
    StreamSource, TimeWindow, TrendingScope, WorkingSet, backdrop_url, flatten_show, image_url,
    cached_title, open_metadata_provider, open_store, resolve_episode_stream, resolve_movie_stream,
    sort_for_display,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

/// Browse TMDB and manage a local catalog of streaming links
#[derive(Parser, Debug)]
#[command(name = "streamiz", version, about)]
struct Cli {
    /// Directory holding the catalog (defaults to the platform data dir)
    #[arg(long, global = true, env = "STREAMIZ_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// TMDB API key
    #[arg(long, global = true, env = "TMDB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Do not read or write the metadata cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Trending titles
    Trending {
        #[arg(long, value_enum, default_value_t = ScopeArg::All)]
        scope: ScopeArg,
        #[arg(long, value_enum, default_value_t = WindowArg::Week)]
        window: WindowArg,
    },
    /// Popular titles
    Popular(ListingArgs),
    /// Top rated titles
    TopRated(ListingArgs),
    /// Genres of a media type
    Genres {
        #[arg(short = 't', long = "type", value_enum, default_value_t = MediaArg::Movie)]
        media_type: MediaArg,
    },
    /// Titles of a genre
    Discover {
        genre_id: u32,
        #[command(flatten)]
        listing: ListingArgs,
    },
    /// Search titles
    Search {
        query: String,
        #[command(flatten)]
        listing: ListingArgs,
    },
    /// Show details of a title and its saved links
    Details {
        id: ExternalId,
        #[arg(short = 't', long = "type", value_enum, default_value_t = MediaArg::Movie)]
        media_type: MediaArg,
    },
    /// List the episodes of a season
    Season { id: ExternalId, season: u32 },
    /// List everything in the local catalog
    Library,
    /// Interactively edit the links of a title
    Edit {
        id: ExternalId,
        #[arg(short = 't', long = "type", value_enum, default_value_t = MediaArg::Movie)]
        media_type: MediaArg,
    },
    /// Save the streaming URL of a movie
    SetMovie { id: ExternalId, url: String },
    /// Save episode URLs of a show, given as SEASON:EPISODE=URL
    AddEpisodes {
        id: ExternalId,
        #[arg(required = true, value_parser = parse_episode_entry)]
        episodes: Vec<EpisodeEntry>,
    },
    /// Remove a title from the catalog
    Remove {
        id: ExternalId,
        #[arg(short = 't', long = "type", value_enum, default_value_t = MediaArg::Movie)]
        media_type: MediaArg,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Write the catalog to streamiz_db.json
    Export {
        /// Target directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Replace the catalog with an exported file
    Import { file: PathBuf },
    /// Print the URL to play a movie or an episode
    Watch {
        id: ExternalId,
        #[arg(short = 't', long = "type", value_enum, default_value_t = MediaArg::Movie)]
        media_type: MediaArg,
        #[arg(long, default_value_t = 1)]
        season: u32,
        #[arg(long, default_value_t = 1)]
        episode: u32,
    },
}

#[derive(Args, Debug)]
struct ListingArgs {
    #[arg(short = 't', long = "type", value_enum, default_value_t = MediaArg::Movie)]
    media_type: MediaArg,
    #[arg(long, default_value_t = 1)]
    page: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MediaArg {
    Movie,
    Tv,
}

impl From<MediaArg> for MediaType {
    fn from(arg: MediaArg) -> Self {
        match arg {
            MediaArg::Movie => MediaType::Movie,
            MediaArg::Tv => MediaType::Tv,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    All,
    Movie,
    Tv,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WindowArg {
    Day,
    Week,
}

/// Parses `SEASON:EPISODE=URL`
fn parse_episode_entry(s: &str) -> Result<EpisodeEntry, String> {
    let (numbers, url) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SEASON:EPISODE=URL, got '{}'", s))?;
    let (season, episode) = numbers
        .split_once(':')
        .ok_or_else(|| format!("expected SEASON:EPISODE before '=', got '{}'", numbers))?;
    let season = season
        .trim()
        .parse()
        .map_err(|_| format!("invalid season number '{}'", season))?;
    let episode = episode
        .trim()
        .parse()
        .map_err(|_| format!("invalid episode number '{}'", episode))?;
    if url.trim().is_empty() {
        return Err("URL must not be empty".to_string());
    }
    Ok(EpisodeEntry::new(season, episode, url.trim()))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Falls back to an empty page when a listing cannot be loaded
fn listing_or_empty(result: Result<Page, MetadataError>, what: &str) -> Page {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "failed to load {}", what);
        eprintln!("Error loading {}: {}", what, e);
        Page::empty()
    })
}

fn print_item(item: &CatalogItem) {
    let year = item
        .release_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let rating = item
        .vote_average
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "N/A".to_string());
    println!(
        "  [{} {:>7}] {} ({}) - rating {}",
        item.media_type, item.id, item.title, year, rating
    );
}

fn print_page(title: &str, page: &Page) {
    println!("=== {} ===", title);
    if page.items.is_empty() {
        println!("No content available.");
        return;
    }
    for item in &page.items {
        print_item(item);
    }
    if page.total_pages > 1 {
        println!("Page {} of {}", page.page, page.total_pages);
    }
}

fn print_saved_show(show: &Show) {
    let entries = flatten_show(show);
    for entry in sort_for_display(&entries).iter() {
        println!("    S{:02}E{:02}  {}", entry.season, entry.episode, entry.url);
    }
}

fn print_details(details: &ItemDetails, store: &LocalStore<FileBackend>) {
    let item = &details.item;
    println!("=== {} ===", item.title);
    if let Some(year) = item.release_year {
        println!("Year: {}", year);
    }
    if let Some(rating) = item.vote_average {
        println!("Rating: {:.1}", rating);
    }
    if !details.genres.is_empty() {
        let names: Vec<&str> = details.genres.iter().map(|g| g.name.as_str()).collect();
        println!("Genres: {}", names.join(", "));
    }
    if let Some(runtime) = details.runtime {
        println!("Runtime: {} min", runtime);
    }
    if let Some(overview) = &item.overview {
        println!("\n{}\n", overview);
    }
    println!("Poster: {}", image_url(item.poster_path.as_deref(), POSTER_SIZE));
    let backdrop = backdrop_url(item.backdrop_path.as_deref(), BACKDROP_SIZE);
    if !backdrop.is_empty() {
        println!("Backdrop: {}", backdrop);
    }
    if let Some(key) = &details.trailer_key {
        println!("Trailer: https://www.youtube.com/watch?v={}", key);
    }
    if !details.cast.is_empty() {
        println!("Cast: {}", details.cast.join(", "));
    }

    match item.media_type {
        MediaType::Movie => match store.get_movie(item.id) {
            Some(movie) => println!("\nSaved link: {}", movie.url),
            None => println!("\nNo saved link."),
        },
        MediaType::Tv => {
            println!("\nSeasons:");
            for season in &details.seasons {
                println!(
                    "  {:>2}. {} ({} episodes)",
                    season.season_number, season.name, season.episode_count
                );
            }
            match store.get_show(item.id) {
                Some(show) => {
                    println!("\nSaved links ({} episodes):", show.episode_count());
                    print_saved_show(show);
                }
                None => println!("\nNo saved links."),
            }
        }
    }

    if !details.similar.is_empty() {
        println!("\nSimilar:");
        for similar in details.similar.iter().take(8) {
            print_item(similar);
        }
    }
}

fn print_library(store: &LocalStore<FileBackend>) {
    let catalog = store.get_all();

    println!("=== Movies ({}) ===", catalog.movies.len());
    for movie in &catalog.movies {
        println!("  {:>7}  {}", movie.external_id, movie.url);
    }

    println!("\n=== TV Shows ({}) ===", catalog.shows.len());
    for show in &catalog.shows {
        println!(
            "  {:>7}  {} season(s), {} episode(s)",
            show.external_id,
            show.seasons.len(),
            show.episode_count()
        );
        print_saved_show(show);
    }
}

/// Runs an interactive editor session until it is saved or cancelled
fn edit_interactively(
    store: &mut LocalStore<FileBackend>,
    media_type: MediaType,
    id: ExternalId,
    title: Option<String>,
) -> CliResult {
    let mut session = EditorSession::open(&*store, media_type, id, title);
    if let Some(entry) = session.entry() {
        println!(
            "Edit: {}",
            entry.title.clone().unwrap_or_else(|| format!("{} {}", media_type, id))
        );
    }

    if media_type == MediaType::Movie {
        let current = match session.entry().map(|e| &e.working_set) {
            Some(WorkingSet::Movie { url }) => url.clone(),
            _ => String::new(),
        };
        let url: String = Input::new()
            .with_prompt("Streaming URL")
            .with_initial_text(current)
            .allow_empty(true)
            .interact_text()?;
        session.set_movie_url(url)?;
        if let Err(e) = session.save(store) {
            eprintln!("Error: {}", e);
            return Ok(());
        }
        println!("Saved successfully!");
        return Ok(());
    }

    loop {
        let episodes = session.display_episodes();
        let has_episodes = !episodes.is_empty();
        if !has_episodes {
            println!("\nNo episodes added yet.");
        } else {
            println!();
            for (position, entry) in episodes.iter().enumerate() {
                println!(
                    "  {:>3}. S{} E{}  {}",
                    position + 1,
                    entry.season,
                    entry.episode,
                    entry.url
                );
            }
        }

        let choice = Select::new()
            .with_prompt("Action")
            .items(&["Add episode", "Remove episode", "Save", "Cancel"])
            .default(0)
            .interact()?;

        match choice {
            0 => {
                let season: u32 = Input::new().with_prompt("Season").interact_text()?;
                let episode: u32 = Input::new().with_prompt("Episode").interact_text()?;
                let url: String = Input::new().with_prompt("URL").interact_text()?;
                if let Err(e) = session.add_episode(EpisodeEntry::new(season, episode, url)) {
                    eprintln!("{}", e);
                }
            }
            1 => {
                if !has_episodes {
                    continue;
                }
                let position: usize = Input::new()
                    .with_prompt("Number to remove")
                    .interact_text()?;
                if let Err(e) = session.remove_episode(position.saturating_sub(1)) {
                    eprintln!("{}", e);
                }
            }
            2 => match session.save(store) {
                Ok(()) => {
                    println!("Saved successfully!");
                    return Ok(());
                }
                Err(e) => eprintln!("{}", e),
            },
            _ => {
                session.close();
                println!("Discarded changes.");
                return Ok(());
            }
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let mut config = Config::default()
        .with_data_dir(cli.data_dir)
        .with_api_key(cli.api_key);
    config.use_cache = !cli.no_cache;

    let provider = || -> Result<Box<dyn MetadataProvider>, Box<dyn Error>> {
        Ok(open_metadata_provider(&config)?)
    };

    match cli.command {
        Command::Trending { scope, window } => {
            let scope = match scope {
                ScopeArg::All => TrendingScope::All,
                ScopeArg::Movie => TrendingScope::Only(MediaType::Movie),
                ScopeArg::Tv => TrendingScope::Only(MediaType::Tv),
            };
            let window = match window {
                WindowArg::Day => TimeWindow::Day,
                WindowArg::Week => TimeWindow::Week,
            };
            let page = listing_or_empty(provider()?.trending(scope, window), "trending titles");
            print_page(&format!("Trending this {}", window), &page);
        }
        Command::Popular(listing) => {
            let media_type: MediaType = listing.media_type.into();
            let page = listing_or_empty(
                provider()?.popular(media_type, listing.page),
                "popular titles",
            );
            print_page(&format!("Popular ({})", media_type), &page);
        }
        Command::TopRated(listing) => {
            let media_type: MediaType = listing.media_type.into();
            let page = listing_or_empty(
                provider()?.top_rated(media_type, listing.page),
                "top rated titles",
            );
            print_page(&format!("Top rated ({})", media_type), &page);
        }
        Command::Genres { media_type } => {
            let genres = provider()?.genres(media_type.into()).unwrap_or_else(|e| {
                eprintln!("Error loading genres: {}", e);
                Vec::new()
            });
            for genre in genres {
                println!("  {:>6}  {}", genre.id, genre.name);
            }
        }
        Command::Discover { genre_id, listing } => {
            let media_type: MediaType = listing.media_type.into();
            let page = listing_or_empty(
                provider()?.discover_by_genre(genre_id, media_type, listing.page),
                "genre listing",
            );
            print_page(&format!("Genre {}", genre_id), &page);
        }
        Command::Search { query, listing } => {
            let page = listing_or_empty(
                provider()?.search(&query, listing.media_type.into(), listing.page),
                "search results",
            );
            print_page(&format!("Results for '{}'", query), &page);
        }
        Command::Details { id, media_type } => {
            let store = open_store(&config)?;
            match provider()?.details(id, media_type.into()) {
                Ok(details) => print_details(&details, &store),
                Err(e) => eprintln!("Error loading details: {}", e),
            }
        }
        Command::Season { id, season } => match provider()?.season_details(id, season) {
            Ok(details) => {
                println!("=== {} ===", details.name);
                for episode in &details.episodes {
                    println!(
                        "  E{:02}  {}{}",
                        episode.episode_number,
                        episode.name,
                        episode
                            .air_date
                            .as_deref()
                            .map(|d| format!(" ({})", d))
                            .unwrap_or_default()
                    );
                }
            }
            Err(e) => eprintln!("Error loading season: {}", e),
        },
        Command::Library => {
            let store = open_store(&config)?;
            print_library(&store);
        }
        Command::Edit { id, media_type } => {
            let media_type: MediaType = media_type.into();
            let mut store = open_store(&config)?;
            // Titles are only for display; editing never waits on the network
            let title = cached_title(&config, id, media_type);
            edit_interactively(&mut store, media_type, id, title)?;
        }
        Command::SetMovie { id, url } => {
            let mut store = open_store(&config)?;
            let mut session = EditorSession::open(&store, MediaType::Movie, id, None);
            session.set_movie_url(url)?;
            session.save(&mut store)?;
            println!("Saved successfully!");
        }
        Command::AddEpisodes { id, episodes } => {
            let mut store = open_store(&config)?;
            let mut session = EditorSession::open(&store, MediaType::Tv, id, None);
            for entry in episodes {
                session.add_episode(entry)?;
            }
            session.save(&mut store)?;
            println!("Saved successfully!");
        }
        Command::Remove {
            id,
            media_type,
            yes,
        } => {
            let mut store = open_store(&config)?;
            let media_type: MediaType = media_type.into();
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("Remove {} {} from the catalog?", media_type, id))
                    .default(false)
                    .interact()?;
            if !confirmed {
                return Ok(());
            }
            let removed = match media_type {
                MediaType::Movie => store.remove_movie(id)?,
                MediaType::Tv => store.remove_show(id)?,
            };
            if removed {
                println!("Removed {} {}.", media_type, id);
            } else {
                println!("Nothing to remove.");
            }
        }
        Command::Export { dir } => {
            let store = open_store(&config)?;
            let (path, size) = store.export_to(&dir)?;
            println!(
                "Exported catalog to {} ({})",
                path.display(),
                humansize::format_size(size, humansize::DECIMAL)
            );
        }
        Command::Import { file } => {
            let mut store = open_store(&config)?;
            let blob = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
            store.import_snapshot(&blob)?;
            let catalog = store.get_all();
            println!(
                "Data imported successfully! {} movie(s), {} show(s).",
                catalog.movies.len(),
                catalog.shows.len()
            );
        }
        Command::Watch {
            id,
            media_type,
            season,
            episode,
        } => {
            let store = open_store(&config)?;
            let media_type: MediaType = media_type.into();
            let link = match media_type {
                MediaType::Movie => resolve_movie_stream(&store, id),
                MediaType::Tv => resolve_episode_stream(&store, id, season, episode),
            };
            if link.source == StreamSource::Embed {
                eprintln!("No saved link, using the embed player.");
            }
            println!("{}", link.url);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
