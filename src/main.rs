// src/main.rs - geoprint command line client
use clap::{Args, Parser, Subcommand};
use geoprint_rs::{load_config, FitMode, JobState, MapState, PrintControl, PrintForm};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "geoprint", about = "Encode map snapshots and print them through a MapFish print service.")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "geoprint.toml")]
    config: String,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct FormArgs {
    /// Document title
    #[arg(long, default_value = "")]
    title: String,

    /// Document description
    #[arg(long, default_value = "")]
    description: String,

    /// Layout name as advertised by the service
    #[arg(long)]
    layout: Option<String>,

    /// DPI name or value
    #[arg(long)]
    dpi: Option<String>,

    /// Output format (pdf, png, ...)
    #[arg(long)]
    format: Option<String>,

    /// Print at the map's current scale instead of its extent
    #[arg(long)]
    force_scale: bool,

    /// Fit pages to the advertised scales (closest, printer, screen)
    #[arg(long)]
    fit: Option<FitMode>,

    /// Include layer legends
    #[arg(long)]
    legend: bool,
}

impl FormArgs {
    fn form(&self) -> PrintForm {
        PrintForm {
            title: self.title.clone(),
            description: self.description.clone(),
            layout: self.layout.clone(),
            dpi: self.dpi.clone(),
            format: self.format.clone(),
            force_scale: self.force_scale,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the layouts, DPIs and formats the service offers
    Capabilities,
    /// Write the print request for a map snapshot to stdout
    Encode {
        /// Map snapshot (JSON)
        #[arg(long)]
        map: PathBuf,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Submit one print job per map snapshot and wait for the results
    Print {
        /// Map snapshots (JSON); may be repeated
        #[arg(long, required = true)]
        map: Vec<PathBuf>,
        #[command(flatten)]
        form: FormArgs,
    },
}

fn read_map(path: &Path) -> Result<MapState, Box<dyn std::error::Error + Send + Sync + 'static>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read map snapshot '{}': {}", path.display(), e);
        e
    })?;
    Ok(serde_json::from_str(&contents)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Loading configuration from: {}", cli.config);
    let config = load_config(&cli.config)?;
    let legend_default = config.print.legend;

    let mut control = PrintControl::from_config(&config)?;
    let caps = control.provider_mut().load_capabilities().await?;

    match cli.command {
        Commands::Capabilities => {
            println!("Service: {}", control.provider().service_url());
            for layout in &caps.layouts {
                println!(
                    "layout  {:<20} {}x{} pt{}",
                    layout.name,
                    layout.page_size.width,
                    layout.page_size.height,
                    if layout.supports_rotation { " (rotatable)" } else { "" }
                );
            }
            for dpi in &caps.dpis {
                println!("dpi     {:<20} {}", dpi.name, dpi.value);
            }
            for format in &caps.output_formats {
                println!("format  {}", format.name);
            }
            for scale in &caps.scales {
                println!("scale   {}", scale.name);
            }
        }
        Commands::Encode { map, form } => {
            let map = read_map(&map)?;
            if form.fit.is_some() {
                control = control.with_fit_mode(form.fit);
            }
            let request = control.build(&map, &form.form(), form.legend || legend_default)?;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Commands::Print { map, form } => {
            if form.fit.is_some() {
                control = control.with_fit_mode(form.fit);
            }
            let snapshots = map.iter().map(|path| read_map(path)).collect::<Result<Vec<_>, _>>()?;
            let batch = control.print_all(&snapshots, &form.form(), form.legend || legend_default).await;
            for (path, job) in map.iter().zip(&batch.jobs) {
                match (&job.state, &job.result_url) {
                    (JobState::Completed, Some(url)) => println!("{} {}", job.id, url),
                    (JobState::Failed(reason), _) => eprintln!("{} ({}) failed: {}", job.id, path.display(), reason),
                    _ => eprintln!("{} ({}) did not settle", job.id, path.display()),
                }
            }
            if let Some((index, error)) = &batch.rejected {
                return Err(format!("{} could not be printed: {}", map[*index].display(), error).into());
            }
            let failures = batch.failures();
            if failures > 0 {
                return Err(format!("{} of {} print jobs failed", failures, map.len()).into());
            }
        }
    }

    Ok(())
}
