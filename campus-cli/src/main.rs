//! Campus CLI
//!
//! Command-line interface for the event registration API.

use anyhow::Result;
use clap::{Parser, Subcommand};

use campus_client::CampusClient;
use campus_types::{
    ConfirmPaymentRequest, CreateOrderRequest, Currency, EventId, RegistrationId, StudentId,
    SubeventId,
};

#[derive(Parser)]
#[command(name = "campus")]
#[command(author, version, about = "Event registration API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the registration API
    #[arg(long, env = "CAMPUS_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// API key for authentication
    #[arg(long, env = "CAMPUS_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Checkout operations (orders and confirmations)
    Checkout {
        #[command(subcommand)]
        action: CheckoutCommands,
    },
    /// Registration queries and admin mutations
    Registration {
        #[command(subcommand)]
        action: RegistrationCommands,
    },
    /// Show the ranked leaderboard for a sub-event
    Leaderboard {
        #[arg(long)]
        event: i64,
        #[arg(long)]
        subevent: i64,
    },
    /// API key management
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },
    /// Bootstrap the first API key
    Bootstrap {
        /// Name for the new API key
        #[arg(long, default_value = "bootstrap-key")]
        name: String,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum CheckoutCommands {
    /// Create a gateway order for a registration intent
    Order {
        #[arg(long)]
        student: i64,
        #[arg(long)]
        event: i64,
        #[arg(long)]
        subevent: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Fee in smallest currency unit (paise)
        #[arg(long)]
        fee: i64,
        /// Currency (INR, USD)
        #[arg(long, default_value = "INR")]
        currency: String,
    },
    /// Submit a gateway confirmation for an order
    Confirm {
        #[arg(long)]
        student: i64,
        #[arg(long)]
        event: i64,
        #[arg(long)]
        subevent: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        fee: i64,
        #[arg(long, default_value = "INR")]
        currency: String,
        #[arg(long)]
        order_id: String,
        #[arg(long)]
        payment_id: String,
        /// Hex-encoded HMAC signature from the gateway
        #[arg(long)]
        signature: String,
    },
    /// Record an abandoned checkout
    Cancel {
        #[arg(long)]
        order_id: String,
    },
}

#[derive(Subcommand)]
enum RegistrationCommands {
    /// List a student's registrations
    Student {
        /// Student ID
        id: i64,
    },
    /// List registrations for an event
    Event {
        /// Event ID
        id: i64,
        /// Narrow to one sub-event
        #[arg(long)]
        subevent: Option<i64>,
    },
    /// Count paid participants
    Count {
        /// Event ID
        id: i64,
        #[arg(long)]
        subevent: Option<i64>,
    },
    /// Mark attendance on one registration
    Attendance {
        /// Registration ID (UUID)
        id: String,
        /// Mark absent instead of present
        #[arg(long)]
        absent: bool,
    },
    /// Mark attendance for every paid registration of a sub-event
    BulkAttendance {
        #[arg(long)]
        event: i64,
        #[arg(long)]
        subevent: i64,
        #[arg(long)]
        absent: bool,
    },
    /// Assign a competition rank
    Rank {
        /// Registration ID (UUID)
        id: String,
        #[arg(long)]
        rank: i32,
    },
    /// Delete every registration of an event
    Purge {
        /// Event ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Create a new API key
    Create {
        /// Name for the new key
        #[arg(long)]
        name: String,
    },
    /// List all API keys
    List,
    /// Delete (deactivate) an API key
    Delete {
        /// API key ID (UUID)
        #[arg(long)]
        id: String,
    },
}

fn parse_currency(s: &str) -> Result<Currency> {
    match s.to_uppercase().as_str() {
        "INR" => Ok(Currency::INR),
        "USD" => Ok(Currency::USD),
        _ => anyhow::bail!("Unknown currency: {}. Supported: INR, USD", s),
    }
}

fn parse_registration_id(s: &str) -> Result<RegistrationId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid registration ID: {}", s))
}

#[allow(clippy::too_many_arguments)]
fn order_request(
    student: i64,
    event: i64,
    subevent: i64,
    name: String,
    email: String,
    fee: i64,
    currency: &str,
) -> Result<CreateOrderRequest> {
    Ok(CreateOrderRequest {
        student_id: StudentId::new(student),
        event_id: EventId::new(event),
        subevent_id: SubeventId::new(subevent),
        student_name: name,
        student_email: email,
        fee,
        currency: parse_currency(currency)?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = CampusClient::new(&cli.api_url);
    if let Some(key) = cli.api_key {
        client = client.with_api_key(key);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Checkout { action } => match action {
            CheckoutCommands::Order {
                student,
                event,
                subevent,
                name,
                email,
                fee,
                currency,
            } => {
                let req = order_request(student, event, subevent, name, email, fee, &currency)?;
                let order = client.create_order(&req).await?;
                println!("{}", serde_json::to_string_pretty(&order)?);
            }
            CheckoutCommands::Confirm {
                student,
                event,
                subevent,
                name,
                email,
                fee,
                currency,
                order_id,
                payment_id,
                signature,
            } => {
                let intent =
                    order_request(student, event, subevent, name, email, fee, &currency)?;
                let req = ConfirmPaymentRequest {
                    intent,
                    order_id,
                    payment_id,
                    signature,
                };
                let registration = client.confirm_payment(&req).await?;
                println!("{}", serde_json::to_string_pretty(&registration)?);
            }
            CheckoutCommands::Cancel { order_id } => {
                client.cancel_checkout(&order_id).await?;
                println!("✓ Checkout abandonment recorded");
            }
        },

        Commands::Registration { action } => match action {
            RegistrationCommands::Student { id } => {
                let regs = client.student_registrations(StudentId::new(id)).await?;
                println!("{}", serde_json::to_string_pretty(&regs)?);
            }
            RegistrationCommands::Event { id, subevent } => {
                let regs = client
                    .event_registrations(EventId::new(id), subevent.map(SubeventId::new))
                    .await?;
                println!("{}", serde_json::to_string_pretty(&regs)?);
            }
            RegistrationCommands::Count { id, subevent } => {
                let count = client
                    .participant_count(EventId::new(id), subevent.map(SubeventId::new))
                    .await?;
                println!("{}", count);
            }
            RegistrationCommands::Attendance { id, absent } => {
                let id = parse_registration_id(&id)?;
                let reg = client.mark_attendance(id, !absent).await?;
                println!("{}", serde_json::to_string_pretty(&reg)?);
            }
            RegistrationCommands::BulkAttendance {
                event,
                subevent,
                absent,
            } => {
                let regs = client
                    .bulk_attendance(EventId::new(event), SubeventId::new(subevent), !absent)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&regs)?);
            }
            RegistrationCommands::Rank { id, rank } => {
                let id = parse_registration_id(&id)?;
                let reg = client.assign_rank(id, rank).await?;
                println!("{}", serde_json::to_string_pretty(&reg)?);
            }
            RegistrationCommands::Purge { id } => {
                let removed = client.purge_event(EventId::new(id)).await?;
                println!("✓ Removed {} registrations", removed);
            }
        },

        Commands::Leaderboard { event, subevent } => {
            let board = client
                .leaderboard(EventId::new(event), SubeventId::new(subevent))
                .await?;
            println!("{}", serde_json::to_string_pretty(&board)?);
        }

        Commands::Key { action } => match action {
            KeyCommands::Create { name } => {
                let api_key = client.create_api_key(&name).await?;
                println!("{}", api_key);
            }
            KeyCommands::List => {
                let keys = client.list_api_keys().await?;
                println!("{}", serde_json::to_string_pretty(&keys)?);
            }
            KeyCommands::Delete { id } => {
                client.delete_api_key(&id).await?;
                println!("✓ API key deleted");
            }
        },

        Commands::Bootstrap { name } => {
            let api_key = client.bootstrap(&name).await?;
            println!("{}", api_key);
        }
    }

    Ok(())
}
