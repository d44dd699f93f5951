use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "ledger-cli")]
#[command(about = "Command-line client for the station ledger API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API and blockchain status
    Health,
    /// List or add fueling stations
    Stations {
        #[command(subcommand)]
        action: StationAction,
    },
    /// List or create reservations
    Reservations {
        #[command(subcommand)]
        action: ReservationAction,
    },
    /// List payments
    Payments,
}

#[derive(Subcommand)]
enum StationAction {
    List,
    Add { name: String },
}

#[derive(Subcommand)]
enum ReservationAction {
    List,
    Create {
        client: String,
        car: String,
        station: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)),
        Commands::Stations { action } => match action {
            StationAction::List => client.get(format!("{}/postos", base)),
            StationAction::Add { name } => client
                .post(format!("{}/postos", base))
                .json(&json!({ "nome": name })),
        },
        Commands::Reservations { action } => match action {
            ReservationAction::List => client.get(format!("{}/reservas", base)),
            ReservationAction::Create {
                client: customer,
                car,
                station,
            } => client.post(format!("{}/reservas", base)).json(&json!({
                "nomeCliente": customer,
                "nomeCarro": car,
                "nomePosto": station,
            })),
        },
        Commands::Payments => client.get(format!("{}/pagamentos", base)),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body = res.text().await?;

    let rendered = match serde_json::from_str::<Value>(&body) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => body,
    };

    if status.is_success() {
        println!("{}", rendered);
        Ok(())
    } else {
        eprintln!("Error: API returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
}
