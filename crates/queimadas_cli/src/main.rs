//! Command-line front-end for the Queimadas dashboard state.

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use queimadas_client::{spawn_backend, ApiClient, BackendHandle};
use queimadas_core::config::normalize_base_url;
use queimadas_core::constants::{FILTER_DATE_FORMAT, NO_GRAPHIC_DATA_MESSAGE};
use queimadas_core::date_pattern::format_date;
use queimadas_core::feature_info::FeatureInfoReport;
use queimadas_core::graphics::{GraphicPanel, PanelContent};
use queimadas_core::registry::LayerTimeUpdate;
use queimadas_core::subtitles::LegendSnapshot;
use queimadas_core::widget::{HeadlessExplorer, HeadlessMap};
use queimadas_core::{
    Config, Configurations, Dashboard, EventSink, FetchCmd, FetchEvent, FilterInput,
    LayerRegistry,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qdash", about = "Queimadas dashboard CLI", version)]
struct Cli {
    /// Dashboard configuration document (can also be set via QUEIMADAS_CONFIG)
    #[arg(short, long, env = "QUEIMADAS_CONFIG")]
    config: Option<PathBuf>,

    /// Backend URL (can also be set via QUEIMADAS_SERVER)
    #[arg(short, long, env = "QUEIMADAS_SERVER")]
    server: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Reference day (YYYY-MM-DD); defaults to the local date
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Map resolution used to decide which layers are drawable
    #[arg(long, global = true, default_value = "1000")]
    resolution: f64,

    #[command(subcommand)]
    command: Commands,
}

/// Filter form values; without `--from`/`--to` the initial filter is used.
#[derive(Args, Debug, Clone, Default, PartialEq)]
struct FilterArgs {
    /// First day (YYYY/MM/DD)
    #[arg(long)]
    from: Option<String>,
    /// Last day (YYYY/MM/DD)
    #[arg(long)]
    to: Option<String>,
    #[arg(long, default_value = "00:00")]
    time_from: String,
    #[arg(long, default_value = "23:59")]
    time_to: String,
    #[arg(long, value_delimiter = ',')]
    satellites: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    biomes: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    countries: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    states: Vec<String>,
    #[arg(long)]
    city: Option<String>,
}

impl FilterArgs {
    fn to_input(&self, today: NaiveDate) -> Option<FilterInput> {
        if self.from.is_none() && self.to.is_none() {
            return None;
        }
        let today_label = format_date(today, FILTER_DATE_FORMAT);
        Some(FilterInput {
            date_from: self.from.clone().unwrap_or_else(|| today_label.clone()),
            date_to: self.to.clone().unwrap_or(today_label),
            time_from: self.time_from.clone(),
            time_to: self.time_to.clone(),
            satellites: self.satellites.clone(),
            biomes: self.biomes.clone(),
            countries: self.countries.clone(),
            states: self.states.clone(),
            city: self.city.clone(),
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(flatten)]
    Session(SessionCommand),
}

/// Commands that run against a loaded dashboard.
#[derive(Subcommand)]
enum SessionCommand {
    /// Show added, not-added and visible layers after the initial load
    Layers {
        /// Add a not-added layer after the initial load (repeatable)
        #[arg(long)]
        add: Vec<String>,
        /// Switch the visible background layer
        #[arg(long)]
        background: Option<String>,
    },
    /// Show the legend for a filter
    Legend {
        #[command(flatten)]
        filter: FilterArgs,
        /// Add a not-added layer before computing the legend (repeatable)
        #[arg(long)]
        add: Vec<String>,
    },
    /// Load the fires-count graphics from the backend
    Graphics {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print the data export link of a graphic
    ExportUrl {
        id: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Query fire attributes for a GetFeatureInfo URL
    FeatureInfo { url: String },
    /// Resolve the dated time of a layer
    LayerTime {
        id: String,
        /// Current local time (YYYY-MM-DDTHH:MM:SS); defaults to now
        #[arg(long)]
        now: Option<NaiveDateTime>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("queimadas_core=warn,queimadas_client=warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Runtime config from the environment with command-line overrides applied.
fn resolve_config(
    base: Config,
    config_path: Option<PathBuf>,
    server: Option<String>,
    timeout: Option<u64>,
) -> Config {
    let mut config = base;
    if let Some(path) = config_path {
        config.config_path = Some(path);
    }
    if let Some(server) = server.filter(|value| !value.trim().is_empty()) {
        config.server_url = normalize_base_url(&server);
    }
    if let Some(secs) = timeout.filter(|secs| *secs > 0) {
        config.request_timeout_secs = secs;
    }
    config
}

fn load_configurations(config: &Config) -> anyhow::Result<Configurations> {
    let Some(path) = &config.config_path else {
        bail!("no configuration document; pass --config or set QUEIMADAS_CONFIG");
    };
    let mut configurations = Configurations::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    configurations.apply_overrides(config);
    Ok(configurations)
}

struct Session {
    dashboard: Dashboard,
    map: HeadlessMap,
    explorer: HeadlessExplorer,
    today: NaiveDate,
}

impl Session {
    fn start(config: &Config, configurations: Configurations, today: NaiveDate, resolution: f64) -> Self {
        let mut dashboard =
            Dashboard::new(configurations, &config.server_url, EventSink::detached(), today);
        let mut map = HeadlessMap::new(resolution);
        let mut explorer = HeadlessExplorer::default();
        dashboard.init(&mut map, &mut explorer, today);
        Self {
            dashboard,
            map,
            explorer,
            today,
        }
    }

    fn add_layers(&mut self, ids: &[String]) -> anyhow::Result<()> {
        for id in ids {
            self.dashboard
                .add_layer(id, &mut self.map, &mut self.explorer, self.today)
                .with_context(|| format!("cannot add layer '{}'", id))?;
        }
        Ok(())
    }

    fn filter_commands(&mut self, filter: &FilterArgs) -> anyhow::Result<Vec<FetchCmd>> {
        let commands = match filter.to_input(self.today) {
            Some(input) => self.dashboard.apply_filter(&input, self.today)?,
            None => self.dashboard.update_graphics(None)?,
        };
        Ok(commands)
    }
}

fn backend(config: &Config) -> anyhow::Result<BackendHandle> {
    let client = ApiClient::new(config)?;
    Ok(spawn_backend(client)?)
}

fn reply_wait(config: &Config) -> Duration {
    Duration::from_secs(config.request_timeout_secs.saturating_add(5))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("response encoding error")
}

fn format_layers(registry: &LayerRegistry, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(&serde_json::json!({
            "added": registry.layers(),
            "not_added": registry.not_added_layers(),
            "visible": registry.visible_layers(),
            "removable": registry.removable_layer_ids(),
        }));
    }

    let mut lines = vec!["Added:".to_string()];
    for layer in registry.layers() {
        lines.push(format!(
            "  {:<32} {:<6} {}",
            layer.id(),
            layer.config.kind.label(),
            layer.current_time.as_deref().unwrap_or("-")
        ));
    }
    lines.push("Not added:".to_string());
    for layer in registry.not_added_layers() {
        lines.push(format!("  {:<32} {}", layer.id(), layer.config.kind.label()));
    }
    lines.push("Visible:".to_string());
    for entry in registry.visible_layers() {
        lines.push(format!("  {}{}", entry.parent_name, entry.layer_name));
    }
    Ok(lines.join("\n"))
}

fn format_legend(snapshot: &LegendSnapshot, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(snapshot);
    }
    if snapshot.no_legends {
        return Ok("No legends to display.".to_string());
    }

    let mut lines = Vec::new();
    for group in snapshot.groups.iter().filter(|group| group.visible) {
        lines.push(group.layer_name.clone());
        for row in group.rows.iter().filter(|row| row.visible) {
            lines.push(format!("  - {}", row.text));
        }
    }
    Ok(lines.join("\n"))
}

fn format_panels(panels: &[GraphicPanel], json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(panels);
    }
    let visible: Vec<&GraphicPanel> = panels.iter().filter(|panel| panel.visible).collect();
    if visible.is_empty() {
        return Ok(NO_GRAPHIC_DATA_MESSAGE.to_string());
    }

    let mut blocks = Vec::with_capacity(visible.len());
    for panel in visible {
        let mut lines = vec![panel.full_title()];
        if let PanelContent::Chart(chart) = &panel.content {
            lines.extend(chart.labels.iter().map(|label| format!("  {}", label)));
        }
        blocks.push(lines.join("\n"));
    }
    Ok(blocks.join("\n\n"))
}

fn format_feature_info(report: Option<&FeatureInfoReport>, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(&report);
    }
    let Some(report) = report else {
        return Ok("No fire at this location.".to_string());
    };

    let mut lines = vec![report.title.to_string()];
    for fire in &report.fires {
        lines.push(String::new());
        for (label, value) in [
            ("Id", &fire.id),
            ("Latitude", &fire.latitude_dms),
            ("Longitude", &fire.longitude_dms),
            ("Date/time", &fire.date_time),
            ("Satellite", &fire.satellite),
            ("City", &fire.city),
            ("State", &fire.state),
            ("Country", &fire.country),
            ("Biome", &fire.biome),
            ("Map", &fire.map_link),
        ] {
            if !value.is_empty() {
                lines.push(format!("{:<10} {}", label, value));
            }
        }
    }
    Ok(lines.join("\n"))
}

fn format_layer_time(update: &LayerTimeUpdate, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(update);
    }
    let mut line = format!("{} ({})", update.name, update.time);
    if update.used_previous_day {
        line.push_str(" [previous day]");
    }
    Ok(line)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let Cli {
        config: config_path,
        server,
        json,
        timeout,
        today,
        resolution,
        command,
    } = Cli::parse();

    let command = match command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Session(command) => command,
    };

    let config = resolve_config(Config::from_env(), config_path, server, timeout);
    tracing::debug!(server = %config.server_url, timeout = config.request_timeout_secs, "runtime config resolved");
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let configurations = load_configurations(&config)?;
    let mut session = Session::start(&config, configurations, today, resolution);

    let output = match command {
        SessionCommand::Layers { add, background } => {
            session.add_layers(&add)?;
            if let Some(id) = background {
                session.dashboard.set_layer_visibility(
                    &id,
                    true,
                    &mut session.map,
                    &session.explorer,
                    today,
                )?;
            }
            format_layers(session.dashboard.registry(), json)?
        }
        SessionCommand::Legend { filter, add } => {
            session.add_layers(&add)?;
            session.filter_commands(&filter)?;
            format_legend(&session.dashboard.subtitles().snapshot(), json)?
        }
        SessionCommand::Graphics { filter } => {
            let commands = session.filter_commands(&filter)?;
            let backend = backend(&config)?;
            for cmd in commands {
                backend.cmd_tx.send(cmd).context("fetch worker stopped")?;
            }
            while session.dashboard.graphics().is_loading() {
                let event = backend
                    .evt_rx
                    .recv_timeout(reply_wait(&config))
                    .context("backend did not answer")?;
                session.dashboard.handle_fetch_event(event);
            }
            let _ = backend.cmd_tx.send(FetchCmd::Shutdown);
            if let Some(message) = session.dashboard.last_error() {
                eprintln!("warning: {}", message);
            }
            format_panels(session.dashboard.graphics().panels(), json)?
        }
        SessionCommand::ExportUrl { id, filter } => {
            session.filter_commands(&filter)?;
            let query = session.dashboard.export_graphic_data(&id)?;
            ApiClient::new(&config)?.export_url(&query)?.to_string()
        }
        SessionCommand::FeatureInfo { url } => {
            let backend = backend(&config)?;
            backend
                .cmd_tx
                .send(session.dashboard.feature_info_command(&url))
                .context("fetch worker stopped")?;
            let event = backend
                .evt_rx
                .recv_timeout(reply_wait(&config))
                .context("backend did not answer")?;
            let _ = backend.cmd_tx.send(FetchCmd::Shutdown);
            if let FetchEvent::Failed { message, .. } = &event {
                bail!("feature info failed: {}", message);
            }
            session.dashboard.handle_fetch_event(event);
            format_feature_info(session.dashboard.feature_info(), json)?
        }
        SessionCommand::LayerTime { id, now } => {
            let now = now.unwrap_or_else(|| Local::now().naive_local());
            let update = session.dashboard.update_layer_time(&id, &mut session.map, now)?;
            format_layer_time(&update, json)?
        }
    };

    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
