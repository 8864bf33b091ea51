use anyhow::{Context, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use dashboard_core::{
    Config, Coordinate, Dashboard, Identity, PredictionSlice, SessionHub, Subscription, ViewState,
    provider::{Predictor, prediction::PredictionClient},
};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode, Text};
use tokio::sync::watch;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dash", version, about = "Weather dashboard")]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Display name to sign in as; overrides `identity` from the config file.
    #[arg(long, env = "WEATHER_DASH_USER", global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, prediction endpoint, identity and home coordinate.
    Configure,

    /// Show weather for a coordinate, or for the current position.
    Show {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Search for a place by name and show its weather.
    Search {
        /// Place name, e.g. "Lima, Peru".
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Pick a point (prompted when not given) and show its weather.
    Pick {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Check whether the prediction service is up and its model is loaded.
    Health,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let Cli { user, command, .. } = self;

        match command {
            Command::Configure => configure(),
            Command::Health => health().await,
            Command::Show { lat, lon } => {
                let view = View::open(user)?;
                let vs = match coordinate_arg(lat, lon)? {
                    Some(coordinate) => view.dashboard.resolve_and_fetch_all(coordinate).await,
                    None => view.dashboard.locate_and_fetch().await,
                };
                view.print(&vs);
                Ok(())
            }
            Command::Search { query } => {
                let view = View::open(user)?;
                match view.dashboard.search_by_text(&query.join(" ")).await {
                    Some(vs) => view.print(&vs),
                    None => println!("Nothing to search for."),
                }
                Ok(())
            }
            Command::Pick { lat, lon } => {
                let view = View::open(user)?;
                view.dashboard.open_map_picker();
                let coordinate = match coordinate_arg(lat, lon)? {
                    Some(coordinate) => coordinate,
                    None => prompt_coordinate()?,
                };
                let vs = view.dashboard.select_from_map(coordinate).await;
                view.print(&vs);
                Ok(())
            }
        }
    }
}

/// A signed-in dashboard session. The session observer stays registered for
/// as long as the view lives.
struct View {
    dashboard: Dashboard,
    identity: Identity,
    _session: SessionHub,
    _subscription: Subscription,
}

impl View {
    fn open(user: Option<String>) -> anyhow::Result<Self> {
        let config = Config::load()?;

        let session = SessionHub::new();
        let subscription = session.subscribe(|state| match state.identity() {
            Some(identity) => tracing::info!(user = %identity.display_name, "signed in"),
            None => tracing::debug!("no active session"),
        });

        if let Some(name) = user
            .or_else(|| config.identity.clone())
            .filter(|name| !name.trim().is_empty())
        {
            session.sign_in(name.trim());
        }
        let identity = session.require_identity()?;

        let dashboard = Dashboard::from_config(&config)?;
        spawn_progress(dashboard.subscribe());

        Ok(Self {
            dashboard,
            identity,
            _session: session,
            _subscription: subscription,
        })
    }

    fn print(&self, vs: &ViewState) {
        println!("{}", render::render(vs, &self.identity));
    }
}

/// Stderr notices for the first-load spinner and the prediction indicator.
fn spawn_progress(mut rx: watch::Receiver<ViewState>) {
    tokio::spawn(async move {
        let mut spinner_shown = false;
        let mut predicting_shown = false;

        while rx.changed().await.is_ok() {
            let vs = rx.borrow_and_update().clone();

            if vs.shows_full_page_spinner() && !spinner_shown {
                eprintln!("Loading weather...");
                spinner_shown = true;
            }
            if vs.prediction == PredictionSlice::Predicting && !predicting_shown {
                eprintln!("Predicting...");
                predicting_shown = true;
            }
            tracing::debug!(generation = vs.generation, place = vs.place_label(), "view updated");
        }
    });
}

fn coordinate_arg(lat: Option<f64>, lon: Option<f64>) -> anyhow::Result<Option<Coordinate>> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => checked(Coordinate::new(lat, lon)).map(Some),
        _ => Ok(None),
    }
}

fn checked(coordinate: Coordinate) -> anyhow::Result<Coordinate> {
    if !coordinate.is_valid() {
        bail!(
            "Coordinate {coordinate} is out of range.\n\
             Latitude must be within [-90, 90] and longitude within [-180, 180]."
        );
    }
    Ok(coordinate)
}

/// Parse `lat, lon`; blank input means "no coordinate".
pub fn parse_coordinate(input: &str) -> anyhow::Result<Option<Coordinate>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let (lat, lon) = input
        .split_once(',')
        .ok_or_else(|| anyhow!("Expected `lat, lon`, got '{input}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("Invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .with_context(|| format!("Invalid longitude '{}'", lon.trim()))?;

    checked(Coordinate::new(lat, lon)).map(Some)
}

fn prompt_coordinate() -> anyhow::Result<Coordinate> {
    let lat = CustomType::<f64>::new("Latitude:")
        .with_error_message("Please type a number, e.g. 48.85")
        .prompt()?;
    let lon = CustomType::<f64>::new("Longitude:")
        .with_error_message("Please type a number, e.g. 2.35")
        .prompt()?;
    checked(Coordinate::new(lat, lon))
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key (blank keeps the current one):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.set_openweather_api_key(api_key.trim().to_string());
    }

    let prediction = Text::new("Prediction endpoint:")
        .with_default(&config.endpoints.prediction)
        .prompt()?;
    config.endpoints.prediction = prediction.trim().to_string();

    let identity = Text::new("Display name (blank to stay signed out):")
        .with_default(config.identity.as_deref().unwrap_or(""))
        .prompt()?;
    config.identity = Some(identity.trim().to_string()).filter(|name| !name.is_empty());

    config.allow_geolocation = Confirm::new("Use your home coordinate as the current position?")
        .with_default(config.allow_geolocation)
        .prompt()?;

    let current_home = config
        .home
        .map(|c| format!("{}, {}", c.latitude, c.longitude))
        .unwrap_or_default();
    let home = Text::new("Home coordinate as `lat, lon` (blank for none):")
        .with_default(&current_home)
        .prompt()?;
    config.home = parse_coordinate(&home)?;

    config.save()?;
    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );

    if !config.is_openweather_configured() {
        println!("Note: no OpenWeather API key is set yet; weather commands will fail.");
    }

    Ok(())
}

async fn health() -> anyhow::Result<()> {
    let config = Config::load()?;
    let client = PredictionClient::from_config(&config)?;
    let status = client.health().await?;

    println!(
        "Prediction service at {}: {} (model ready: {})",
        config.endpoints.prediction,
        status.status,
        if status.model_ready { "yes" } else { "no" }
    );
    Ok(())
}
