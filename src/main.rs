use std::sync::Arc;

use clap::{
    ArgGroup, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use shufflr::{cli, config, error, types::PkceToken, types::ShuffleChoice};
use tokio::sync::Mutex;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Cache liked songs and playlists
    Sync,

    /// Shuffle liked songs or a playlist through the player queue
    Shuffle(ShuffleOptions),

    /// Show what is playing and the stored shuffle sessions
    Status,

    /// Handle bundles (intro tracks pinned in front of a main track)
    Bundles(BundlesOptions),

    /// Keep bundles together in the current playback
    Check(CheckOptions),

    /// Run the HTTP API
    Serve,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["liked", "playlist", "random"])
))]
pub struct ShuffleOptions {
    /// Shuffle liked songs
    #[clap(long)]
    pub liked: bool,

    /// Shuffle the playlist with this id
    #[clap(long)]
    pub playlist: Option<String>,

    /// Shuffle a randomly picked playlist
    #[clap(long)]
    pub random: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct BundlesOptions {
    /// Subcommands under `bundles`; lists bundles when omitted
    #[command(subcommand)]
    pub command: Option<BundlesSubcommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BundlesSubcommand {
    /// List bundles
    List,

    /// Pin MAIN behind INTRO (track ids or spotify:track: URIs)
    Add {
        intro: String,
        main: String,
        /// Also react when the main track comes up first
        #[clap(long)]
        strict: bool,
    },

    /// Make a bundle strict, or lenient again with --off
    Strict {
        id: u64,
        #[clap(long)]
        off: bool,
    },

    /// Remove a bundle
    Remove { id: u64 },
}

#[derive(Parser, Debug, Clone)]
pub struct CheckOptions {
    /// Keep checking on every track change
    #[clap(long)]
    pub watch: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => {
            let oauth_result: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));
            cli::auth(Arc::clone(&oauth_result)).await;
        }
        Command::Sync => cli::sync().await,
        Command::Shuffle(opt) => {
            let choice = match (opt.liked, &opt.playlist) {
                (true, _) => ShuffleChoice::Liked,
                (false, Some(_)) => ShuffleChoice::Playlist,
                (false, None) => ShuffleChoice::Random,
            };
            cli::shuffle(choice, opt.playlist).await
        }
        Command::Status => cli::status().await,
        Command::Bundles(opt) => match opt.command {
            None | Some(BundlesSubcommand::List) => cli::list_bundles().await,
            Some(BundlesSubcommand::Add {
                intro,
                main,
                strict,
            }) => cli::add_bundle(intro, main, strict).await,
            Some(BundlesSubcommand::Strict { id, off }) => cli::set_bundle_strict(id, !off).await,
            Some(BundlesSubcommand::Remove { id }) => cli::remove_bundle(id).await,
        },
        Command::Check(opt) => cli::check(opt.watch).await,
        Command::Serve => cli::serve().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
