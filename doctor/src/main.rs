use agri_doctor::components::{
    render_report_banner, render_results, render_upload_section,
};
use agri_doctor::{
    AgriDoctor, AgriDoctorApp, ApiStatus, ClientConfig, Coordinates, DiseaseDetectionClient,
    HealthMapClient, Msg, Session, Stage, UserLocation,
};
use clap::{Args, Parser, Subcommand};
use colored::{ColoredString, Colorize};
use shared::{
    DetectionOptions, DetectionResult, ImageUpload, SeverityColor, format_disease_name,
    get_severity_color,
};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "agri-doctor")]
#[command(version)]
#[command(about = "Crop disease detection from leaf photos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Session file (defaults to the user config directory)
    #[arg(long, global = true)]
    session: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the detection service is up
    Health,

    /// List the disease classes the model knows
    Classes,

    /// Show reference information for a disease
    Info { crop: String, disease: String },

    /// Analyze a single leaf image
    Analyze(AnalyzeArgs),

    /// Analyze several images in one request
    Batch {
        images: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Set the farm location used for reports
    Onboard {
        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        district: Option<String>,

        #[arg(long, requires = "lng")]
        lat: Option<f64>,

        #[arg(long, requires = "lat")]
        lng: Option<f64>,

        /// Use the default location
        #[arg(long, conflicts_with_all = ["state", "district"])]
        skip: bool,
    },

    /// Forget the stored session
    SignOut,
}

#[derive(Args)]
struct AnalyzeArgs {
    image: PathBuf,

    /// Skip the Grad-CAM explanation
    #[arg(long)]
    no_explain: bool,

    #[arg(long)]
    humidity: Option<f32>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    rainfall: Option<f32>,

    #[arg(long)]
    growth_stage: Option<String>,

    /// Report the result to the community health map for this pincode
    #[arg(long)]
    pincode: Option<String>,

    /// Write the explanation heatmap to this file
    #[arg(long)]
    save_heatmap: Option<PathBuf>,

    /// Print the normalized result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let session_path = cli.session.unwrap_or_else(Session::default_path);
    let config = ClientConfig::from_env()?;

    match cli.command {
        Commands::Health => {
            let client = DiseaseDetectionClient::new(&config)?;
            if client.health_check().await {
                println!("{} ({})", ApiStatus::Online.to_string().as_str().green(), client.base_url());
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{} ({})", ApiStatus::Offline.to_string().as_str().red(), client.base_url());
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Classes => {
            let client = DiseaseDetectionClient::new(&config)?;
            for class in client.get_disease_classes().await? {
                println!("{:<50} {}", class, format_disease_name(&class).as_str().dimmed());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Info { crop, disease } => {
            let client = DiseaseDetectionClient::new(&config)?;
            let info = client.get_disease_info(&crop, &disease).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Analyze(args) => analyze(&config, &session_path, args).await,
        Commands::Batch { images, json } => batch(&config, images, json).await,
        Commands::Onboard {
            state,
            district,
            lat,
            lng,
            skip,
        } => {
            let mut session = Session::load(&session_path)?;
            if skip {
                session.skip_onboarding();
            } else {
                let coordinates = lat.zip(lng).map(|(lat, lng)| Coordinates { lat, lng });
                let location = (state.is_some() || district.is_some() || coordinates.is_some())
                    .then(|| {
                        let fallback = UserLocation::default();
                        UserLocation {
                            state: state.unwrap_or(fallback.state),
                            district: district.unwrap_or(fallback.district),
                            coordinates,
                        }
                    });
                session.complete_onboarding(location);
            }
            session.save(&session_path)?;
            if let Some(location) = session.location() {
                println!("Location set to {}, {}", location.district, location.state);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::SignOut => {
            Session::load(&session_path)?.sign_out(&session_path)?;
            println!("Signed out");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn analyze(
    config: &ClientConfig,
    session_path: &Path,
    args: AnalyzeArgs,
) -> Result<ExitCode, Box<dyn Error>> {
    let session = Session::load(session_path)?;
    if session.needs_onboarding() {
        log::info!("No farm location saved yet; run `agri-doctor onboard` to set one");
    }

    let options = DetectionOptions {
        include_explanation: Some(!args.no_explain),
        weather_humidity: args.humidity,
        weather_temperature: args.temperature,
        weather_rainfall: args.rainfall,
        growth_stage: args.growth_stage,
    };
    let mut app = AgriDoctorApp::with_model(
        AgriDoctor::with_options(options),
        DiseaseDetectionClient::new(config)?,
        HealthMapClient::new(config)?,
    );

    app.dispatch(Msg::CheckConnectivity).await;
    app.dispatch(Msg::SelectImage(ImageUpload::from_path(&args.image)?))
        .await;
    if !args.json {
        print!("{}", render_upload_section(app.model()));
    }
    if let Stage::ValidationError { message, .. } = app.model().stage() {
        if args.json {
            eprintln!("{}", message.red());
        }
        return Ok(ExitCode::FAILURE);
    }

    app.dispatch(Msg::Analyze).await;
    let result = match app.model().stage() {
        Stage::Resulted { result, .. } => result.clone(),
        _ => {
            if let Some(message) = app.model().error_message() {
                eprintln!("{}", message.red());
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if let Some(path) = &args.save_heatmap {
        save_heatmap(&result, path)?;
    }

    if let Some(pincode) = args.pincode {
        app.dispatch(Msg::PincodeChanged(pincode)).await;
        app.dispatch(Msg::SubmitReport).await;
        if let Some(report) = app.model().report() {
            if let Some(banner) = render_report_banner(report) {
                if report.error().is_some() {
                    eprintln!("{}", banner.as_str().red());
                    return Ok(ExitCode::FAILURE);
                }
                println!("{}", banner.as_str().green());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn batch(
    config: &ClientConfig,
    paths: Vec<PathBuf>,
    json: bool,
) -> Result<ExitCode, Box<dyn Error>> {
    let images = paths
        .iter()
        .map(|path| ImageUpload::from_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    let client = DiseaseDetectionClient::new(config)?;
    let results = client.batch_detect_disease(&images).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print_result(result);
            println!();
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_result(result: &DetectionResult) {
    let rendered = render_results(result);
    let (heading, rest) = rendered.split_once('\n').unwrap_or((rendered.as_str(), ""));
    let color = get_severity_color(&result.risk_assessment.overall_risk);
    println!("{}", paint(heading, color).bold());
    print!("{}", rest);
}

fn paint(text: &str, color: SeverityColor) -> ColoredString {
    match color {
        SeverityColor::Red => text.red(),
        SeverityColor::Yellow => text.yellow(),
        SeverityColor::Green => text.green(),
        SeverityColor::Gray => text.normal(),
    }
}

fn save_heatmap(result: &DetectionResult, path: &Path) -> Result<(), Box<dyn Error>> {
    let decoded = result
        .explanation
        .as_ref()
        .and_then(|explanation| explanation.decode_image());
    match decoded {
        Some(bytes) => {
            fs::write(path, bytes?)?;
            println!("Heatmap saved to {}", path.display());
        }
        None => log::warn!("The service returned no heatmap for this image"),
    }
    Ok(())
}
