use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "starwars-server")]
#[command(about = "Star Wars catalog and favourites server", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "starwars-server.yaml")]
    config: String,

    /// Log at debug level.
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Load movies and planets from the external catalog API.
    LoadData,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match starwars_rs::config::Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    starwars_rs::logging::init(&config.logging, args.debug);
    tracing::info!("Using config file: {}", args.config);

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => starwars_rs::run(config).await,
        Command::LoadData => starwars_rs::load_data(config).await.map(|summary| {
            println!(
                "Loaded {} planets and {} movies",
                summary.planets, summary.movies
            );
        }),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
