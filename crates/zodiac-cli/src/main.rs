use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;
use zodiac_core::clock::SystemClock;
use zodiac_core::feed::{self, FeedOrder};
use zodiac_core::leaderboard;
use zodiac_core::ledger::ImageIngestor;
use zodiac_core::paths::{store_path, STORE_FILE};
use zodiac_core::puzzle::{PhraseBook, PuzzleDesk, TropicalZodiac};
use zodiac_core::settings::GameSettings;
use zodiac_core::{
    storage, AccountStore, DeedLedger, FileStore, LedgerRules, LikesRegistry, Profile,
    ProfileUpdate, Theme,
};

mod ingest;

use crate::ingest::DataUrlIngestor;

const PASSWORD_ENV: &str = "ZODIAC_PASSWORD";

#[derive(Parser)]
#[command(name = "zodiac")]
#[command(about = "Decode the daily deed, keep your streak", long_about = None)]
struct Cli {
    /// Directory holding store.json (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Light => Theme::Light,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FeedSort {
    Recent,
    Likes,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        email: String,
        /// Birthday as YYYY-MM-DD
        #[arg(long)]
        birthday: Option<NaiveDate>,
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in with email or username
    SignIn {
        identifier: String,
        #[arg(long)]
        password: Option<String>,
    },

    SignOut,

    /// Show the signed-in profile
    Whoami,

    /// Show today's puzzle, issuing one if needed
    Puzzle,

    /// Submit a decoded sentence
    Solve { answer: String },

    /// Show points, streak and recent deeds
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Attach a photo to a deed (replaces an existing one)
    AttachPhoto {
        file: PathBuf,
        /// Deed date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Remove a deed's photo and its upload points
    RetractPhoto {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Like or unlike a feed entry
    Like { entry_id: String },

    Leaderboard {
        /// Filter by name; ranks stay as on the full board
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        top: Option<usize>,
    },

    Feed {
        #[arg(long, value_enum, default_value = "recent")]
        sort: FeedSort,
    },

    UpdateProfile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
        #[arg(long)]
        birthday: Option<NaiveDate>,
    },

    ResetPassword,

    /// Delete the signed-in account and its history
    DeleteAccount {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView<'a> {
    email: &'a str,
    username: &'a str,
    birthday: NaiveDate,
    theme: Theme,
}

impl<'a> From<&'a Profile> for ProfileView<'a> {
    fn from(profile: &'a Profile) -> Self {
        Self {
            email: &profile.email,
            username: profile.display_name(),
            birthday: profile.birthday,
            theme: profile.theme,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedItem<'a> {
    #[serde(flatten)]
    entry: &'a feed::FeedEntry,
    liked_by_me: bool,
}

struct App {
    store: FileStore,
    settings: GameSettings,
}

impl App {
    fn open(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let path = match data_dir_override {
            Some(dir) => dir.join(STORE_FILE),
            None => store_path()?,
        };
        let store = FileStore::open(path)?;
        let settings = storage::load_settings(&store)?;
        debug!(path = %store.path().display(), "store ready");
        Ok(Self { store, settings })
    }

    fn accounts(&self) -> AccountStore<&FileStore> {
        AccountStore::new(&self.store, self.settings.clone())
    }

    fn ledger(&self) -> DeedLedger<&FileStore, SystemClock> {
        DeedLedger::new(&self.store, SystemClock, LedgerRules::from(&self.settings))
    }

    fn desk(&self) -> PuzzleDesk<&FileStore, SystemClock> {
        PuzzleDesk::new(&self.store, SystemClock, self.settings.sentences.clone())
    }

    fn signed_in(&self) -> Result<Profile> {
        self.accounts()
            .current_profile()?
            .ok_or_else(|| anyhow!("not signed in; run `zodiac sign-in` first"))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn password_or_prompt(flag: Option<String>, prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = flag {
        return Ok(Zeroizing::new(pw));
    }
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }
    let pw = rpassword::prompt_password(prompt).map_err(|e| anyhow!("password prompt: {e}"))?;
    Ok(Zeroizing::new(pw))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = App::open(cli.data_dir)?;

    match cli.command {
        Commands::Register {
            email,
            birthday,
            password,
        } => {
            let password = password_or_prompt(password, "Choose a password: ")?;
            let profile = app.accounts().register(&email, &password, birthday)?;
            print_json(&ProfileView::from(&profile))?;
        }

        Commands::SignIn {
            identifier,
            password,
        } => {
            let password = password_or_prompt(password, "Password: ")?;
            let profile = app.accounts().sign_in(&identifier, &password)?;
            print_json(&ProfileView::from(&profile))?;
        }

        Commands::SignOut => {
            app.accounts().sign_out()?;
            println!("Signed out.");
        }

        Commands::Whoami => {
            let profile = app.signed_in()?;
            print_json(&ProfileView::from(&profile))?;
        }

        Commands::Puzzle => {
            let profile = app.signed_in()?;
            if app.ledger().has_completed_today(&profile.email)? {
                println!("Today's deed is already done. Come back tomorrow.");
                return Ok(());
            }
            let puzzle = app
                .desk()
                .issue(&profile, &PhraseBook::default(), &TropicalZodiac)?;
            println!("Sign: {}", puzzle.sign);
            println!("Puzzle: {}", puzzle.encoded);
            println!("Hint: shift every letter forward by {}", puzzle.hint);
        }

        Commands::Solve { answer } => {
            let profile = app.signed_in()?;
            let puzzle = app
                .desk()
                .current(&profile.email)?
                .ok_or_else(|| anyhow!("no puzzle yet today; run `zodiac puzzle`"))?;
            if !puzzle.check(&answer) {
                println!("Incorrect, try again.");
                return Ok(());
            }
            let ledger = app.ledger().record_solve(&profile.email, &puzzle.sentence)?;
            println!(
                "Correct! Streak {} · {} points total.",
                ledger.streak, ledger.points
            );
        }

        Commands::History { limit } => {
            let profile = app.signed_in()?;
            let mut ledger = app.ledger().ledger(&profile.email)?;
            ledger.past_deeds.truncate(limit);
            print_json(&ledger)?;
        }

        Commands::AttachPhoto { file, date } => {
            let profile = app.signed_in()?;
            let deeds = app.ledger();
            let date = date.unwrap_or_else(|| deeds.today());
            let image = DataUrlIngestor.to_data_reference(&file)?;
            let current = deeds.ledger(&profile.email)?;
            let already_rewarded = current
                .deed_on(date)
                .is_some_and(|deed| deed.upload_points > 0);
            let ledger = if already_rewarded {
                deeds.replace_photo(&profile.email, date, &image)?
            } else {
                deeds.attach_photo(&profile.email, date, &image)?
            };
            println!("Photo saved. {} points total.", ledger.points);
        }

        Commands::RetractPhoto { date } => {
            let profile = app.signed_in()?;
            let deeds = app.ledger();
            let date = date.unwrap_or_else(|| deeds.today());
            let ledger = deeds.retract_photo(&profile.email, date)?;
            println!("Photo removed. {} points total.", ledger.points);
        }

        Commands::Like { entry_id } => {
            let profile = app.signed_in()?;
            let likers = LikesRegistry::new(&app.store).toggle(&entry_id, &profile.email)?;
            let state = if likers.contains(&profile.email) {
                "Liked"
            } else {
                "Unliked"
            };
            println!("{state} ({} likes).", likers.len());
        }

        Commands::Leaderboard { search, top } => {
            let board = leaderboard::from_store(&app.store)?;
            let mut rows: Vec<_> = match search.as_deref() {
                Some(query) => board.search(query),
                None => board.entries().iter().collect(),
            };
            if let Some(n) = top {
                rows.truncate(n);
            }
            print_json(&rows)?;
        }

        Commands::Feed { sort } => {
            let me = app.accounts().current_profile()?;
            let likes = LikesRegistry::new(&app.store).snapshot()?;
            let mut entries = feed::from_store(&app.store)?;
            let order = match sort {
                FeedSort::Recent => FeedOrder::Recent,
                FeedSort::Likes => FeedOrder::MostLiked,
            };
            feed::sort_feed(&mut entries, order, &likes);
            let items: Vec<_> = entries
                .iter()
                .map(|entry| FeedItem {
                    entry,
                    liked_by_me: me
                        .as_ref()
                        .is_some_and(|p| likes.has_liked(&entry.entry_id, &p.email)),
                })
                .collect();
            print_json(&items)?;
        }

        Commands::UpdateProfile {
            username,
            theme,
            birthday,
        } => {
            let profile = app.signed_in()?;
            let update = ProfileUpdate {
                username,
                theme: theme.map(Theme::from),
                birthday,
            };
            let profile = app.accounts().update_profile(&profile.email, update)?;
            print_json(&ProfileView::from(&profile))?;
        }

        Commands::ResetPassword => {
            let profile = app.signed_in()?;
            let current = password_or_prompt(None, "Current password: ")?;
            let next = Zeroizing::new(
                rpassword::prompt_password("New password: ")
                    .map_err(|e| anyhow!("password prompt: {e}"))?,
            );
            let confirm = Zeroizing::new(
                rpassword::prompt_password("Confirm new password: ")
                    .map_err(|e| anyhow!("password prompt: {e}"))?,
            );
            app.accounts()
                .reset_password(&profile.email, &current, &next, &confirm)?;
            println!("Password updated.");
        }

        Commands::DeleteAccount { yes } => {
            let profile = app.signed_in()?;
            if !yes {
                return Err(anyhow!(
                    "this removes {} and all its deeds; pass --yes to confirm",
                    profile.email
                ));
            }
            app.accounts().delete_account(&profile.email)?;
            println!("Account {} deleted.", profile.email);
        }
    }

    Ok(())
}

