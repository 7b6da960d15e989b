use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use songshelf::config::{expand, DEFAULT_LIBRARY_PATH};
use songshelf::formats::Editable;
use songshelf::library::ScanProgress;
use songshelf::{
    FormatRegistry, GroupSummary, LibraryConfig, LibraryStore, PlaylistMux, PlaylistSequencer,
    ShuffleMode, TagRecord,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "songshelf")]
#[command(about = "Index music file tags and plan playback order", long_about = None)]
struct Args {
    /// Path to the library snapshot
    #[arg(short = 'l', long, default_value = DEFAULT_LIBRARY_PATH, global = true)]
    library: String,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan directories and add their songs to the library
    Scan {
        /// Directories to scan
        #[arg(required = true)]
        dirs: Vec<String>,
    },

    /// List the library in album order
    List,

    /// Show one file's tags
    Show {
        file: PathBuf,
    },

    /// Summarize the tags several files have in common
    Summary {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the order songs would play in
    Order {
        #[arg(long, value_enum, default_value_t = ShuffleArg::Off)]
        shuffle: ShuffleArg,

        /// Start over when the end is reached
        #[arg(long)]
        repeat: bool,

        /// Number of songs to print (default: library size)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Songs to play before the library (can be specified multiple times)
        #[arg(long = "queue")]
        queue: Vec<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ShuffleArg {
    Off,
    Uniform,
    Weighted,
}

impl From<ShuffleArg> for ShuffleMode {
    fn from(arg: ShuffleArg) -> Self {
        match arg {
            ShuffleArg::Off => ShuffleMode::Off,
            ShuffleArg::Uniform => ShuffleMode::Uniform,
            ShuffleArg::Weighted => ShuffleMode::Weighted,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = LibraryConfig::new(expand(&args.library));
    let registry = FormatRegistry::with_available();

    match args.command {
        Command::Scan { dirs } => scan(config.with_scan_roots(dirs), &registry),
        Command::List => list(&config, &registry),
        Command::Show { file } => show(&file, &registry),
        Command::Summary { files } => summary(&files, &registry),
        Command::Order {
            shuffle,
            repeat,
            count,
            queue,
        } => order(
            &config.with_shuffle(shuffle.into()).with_repeat(repeat),
            &registry,
            count,
            &queue,
        ),
    }
}

fn load(config: &LibraryConfig, registry: &FormatRegistry) -> LibraryStore {
    let mut library = LibraryStore::new();
    if config.library_path.exists() {
        library.load(&config.library_path, registry);
    } else {
        log::info!("No library at {}; starting empty", config.library_path.display());
    }
    library
}

fn scan(config: LibraryConfig, registry: &FormatRegistry) -> Result<()> {
    let mut library = load(&config, registry);

    let roots: Vec<String> = config
        .scan_roots
        .iter()
        .map(|root| root.to_string_lossy().into_owned())
        .collect();
    let mut progress = ScanProgress::default();
    for (step, snapshot) in library.scan(registry, &roots).enumerate() {
        if step > 0 && step % 500 == 0 {
            log::info!(
                "Scanned {} files: {} added, {} changed",
                step,
                snapshot.added,
                snapshot.changed
            );
        }
        progress = snapshot;
    }
    log::info!(
        "Scan finished: {} added, {} changed",
        progress.added,
        progress.changed
    );

    let saved = library
        .save(&config.library_path)
        .with_context(|| format!("Failed to save {}", config.library_path.display()))?;
    log::info!("Library holds {} songs", saved);
    Ok(())
}

fn list(config: &LibraryConfig, registry: &FormatRegistry) -> Result<()> {
    let library = load(config, registry);
    for record in library.sorted() {
        println!(
            "{} - {} - {}\t{}",
            record.comma("artist"),
            record.comma("album"),
            record.comma("title"),
            record.path().display()
        );
    }
    Ok(())
}

fn read(path: &Path, registry: &FormatRegistry) -> Result<TagRecord> {
    let Some(adapter) = registry.adapter_for_path(path) else {
        bail!("Unsupported file type: {}", path.display());
    };
    adapter
        .read(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn show(path: &Path, registry: &FormatRegistry) -> Result<()> {
    let record = read(path, registry)?;
    println!("{}", record.describe());
    println!();
    print!("{}", record.to_dump());
    println!();
    println!("Played: {}", record.play_summary());
    match record.find_cover_art() {
        Some(cover) => println!("Cover: {}", cover.display()),
        None => println!("Cover: none"),
    }
    Ok(())
}

fn summary(files: &[PathBuf], registry: &FormatRegistry) -> Result<()> {
    let records = files
        .iter()
        .map(|path| read(path, registry))
        .collect::<Result<Vec<_>>>()?;
    let group = GroupSummary::build(&records);

    for (key, field) in group.iter() {
        if songshelf::model::keys::is_computed(key) {
            continue;
        }
        println!("{}: {}", key, field.display());
    }

    match group.can_change(registry) {
        Editable::Any => println!("Editable: any key"),
        Editable::Keys(keys) => {
            let keys: Vec<String> = keys.into_iter().collect();
            println!("Editable: {}", keys.join(", "));
        }
    }
    Ok(())
}

fn order(
    config: &LibraryConfig,
    registry: &FormatRegistry,
    count: Option<usize>,
    queue_files: &[PathBuf],
) -> Result<()> {
    let library = load(config, registry);

    let mut queue = PlaylistSequencer::new();
    let queued = queue_files
        .iter()
        .map(|path| match library.get(path) {
            Some(record) => Ok(record.clone()),
            None => read(path, registry),
        })
        .collect::<Result<Vec<_>>>()?;
    queue.set(queued);

    let mut playlist = PlaylistSequencer::new();
    playlist.set(library.sorted().into_iter().cloned().collect());
    playlist.set_shuffle(config.shuffle);
    playlist.set_repeat(config.repeat);

    let total = count.unwrap_or(queue.len() + playlist.len());
    let mut position = 0;
    let mut mux = PlaylistMux::new(
        |song: &TagRecord| {
            position += 1;
            println!(
                "{:>4}. {} - {}",
                position,
                song.comma("artist"),
                song.comma("title")
            );
        },
        queue,
        playlist,
    );

    for _ in 0..total {
        if mux.next().is_none() {
            break;
        }
    }
    Ok(())
}
