//! chargectl - command-line client for chargepoold

use anyhow::{bail, Context, Result};
use chargepool_api::{
    Command, PoolStateSnapshot, PricingModel, ResponsePayload, ResponseResult,
};
use chargepool_ipc::IpcClient;
use chargepool_util::{default_socket_path, AccountId, Amount, ChargerIndex};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chargectl", about = "Talk to the chargepool service", version)]
struct Cli {
    /// Socket path (or set CHARGEPOOL_SOCKET env var)
    #[arg(short, long, env = "CHARGEPOOL_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Print raw JSON responses
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show pool state
    Status,

    /// Reserve the lowest available charger
    Reserve {
        /// Reservation length in minutes
        minutes: u32,

        /// Amount to pay; overpayment is refunded
        #[arg(short, long)]
        payment: Amount,
    },

    /// Start charging (reservation pools need the reserved charger)
    Start {
        charger: Option<ChargerIndex>,
    },

    /// Stop charging
    Stop {
        charger: ChargerIndex,

        /// Settlement payment (metered pools)
        #[arg(short, long, default_value_t = 0)]
        payment: Amount,
    },

    /// Reclaim a charger whose reservation has expired
    Release { charger: ChargerIndex },

    /// Find the lowest available charger, reclaiming expired ones
    Find,

    /// Seconds left on a reservation
    Remaining { charger: ChargerIndex },

    /// Whether a charger can be claimed right now
    Available { charger: ChargerIndex },

    /// Estimated cost of a running metered session
    Cost { charger: ChargerIndex },

    /// Ledger balance (defaults to your own account)
    Balance { account: Option<String> },

    /// Halt all mutating operations (admin)
    Pause,

    /// Resume mutating operations (admin)
    Unpause,

    /// Pay the service balance out to the admin (admin)
    Withdraw,

    /// Show recent audit log entries (admin)
    Audit {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Stream events until interrupted
    Watch,
}

impl Commands {
    fn into_command(self) -> Command {
        match self {
            Commands::Status => Command::GetState,
            Commands::Reserve { minutes, payment } => Command::Reserve { minutes, payment },
            Commands::Start { charger } => Command::StartCharging { charger },
            Commands::Stop { charger, payment } => Command::StopCharging { charger, payment },
            Commands::Release { charger } => Command::ReleaseExpired { charger },
            Commands::Find => Command::FindAvailable,
            Commands::Remaining { charger } => Command::TimeRemaining { charger },
            Commands::Available { charger } => Command::IsAvailable { charger },
            Commands::Cost { charger } => Command::CurrentCost { charger },
            Commands::Balance { account } => Command::Balance {
                account: account.map(AccountId::from),
            },
            Commands::Pause => Command::Pause,
            Commands::Unpause => Command::Unpause,
            Commands::Withdraw => Command::Withdraw,
            Commands::Audit { limit } => Command::RecentAudit { limit },
            Commands::Watch => Command::SubscribeEvents,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = IpcClient::connect(&cli.socket)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.socket.display()))?;

    if matches!(cli.command, Commands::Watch) {
        return watch(client, cli.json).await;
    }

    let mut client = client;
    let command = cli.command.into_command();
    debug!(command = ?command, "Sending command");
    let response = client.send(command).await?;

    match response.result {
        ResponseResult::Ok(payload) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_payload(&payload);
            }
            Ok(())
        }
        ResponseResult::Err(e) => bail!("{:?}: {}", e.code, e.message),
    }
}

async fn watch(client: IpcClient, json: bool) -> Result<()> {
    let mut events = client.subscribe().await?;
    loop {
        let event = events.next().await?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{} {}", event.timestamp.to_rfc3339(), event.payload.name());
        }
    }
}

fn print_payload(payload: &ResponsePayload) {
    match payload {
        ResponsePayload::State(snapshot) => print_state(snapshot),
        ResponsePayload::Reserved {
            charger,
            end_time,
            cost,
            refund,
            ..
        } => println!(
            "Reserved charger {} until {} (cost {}, refunded {})",
            charger,
            end_time.to_datetime().to_rfc3339(),
            cost,
            refund
        ),
        ResponsePayload::ChargingStarted { charger } => {
            println!("Charging started on charger {}", charger)
        }
        ResponsePayload::ChargingStopped {
            charger,
            cost,
            refund,
        } => println!(
            "Charging stopped on charger {} (cost {}, refunded {})",
            charger, cost, refund
        ),
        ResponsePayload::Released { available } => println!(
            "{}",
            if *available { "Charger is available" } else { "Charger is still reserved" }
        ),
        ResponsePayload::Found { charger } => println!("Charger {} is available", charger),
        ResponsePayload::TimeRemaining { seconds } => {
            println!("{}m {}s remaining", seconds / 60, seconds % 60)
        }
        ResponsePayload::Available { available } => println!("{}", available),
        ResponsePayload::Cost { cost } => println!("{}", cost),
        ResponsePayload::Balance { account, balance } => println!("{}: {}", account, balance),
        ResponsePayload::Subscribed { client_id } => println!("Subscribed as {}", client_id),
        ResponsePayload::Unsubscribed => println!("Unsubscribed"),
        ResponsePayload::Paused => println!("Service paused"),
        ResponsePayload::Unpaused => println!("Service resumed"),
        ResponsePayload::Withdrawn { amount } => println!("Withdrew {}", amount),
        ResponsePayload::Audit { entries } => {
            for entry in entries {
                println!("{}", entry);
            }
        }
        ResponsePayload::Pong => println!("pong"),
    }
}

fn print_state(snapshot: &PoolStateSnapshot) {
    println!(
        "{} pool, {} per minute, admin {}{}",
        snapshot.model,
        snapshot.cost_per_unit,
        snapshot.admin,
        if snapshot.paused { " [PAUSED]" } else { "" }
    );
    println!(
        "{}/{} available, service balance {}",
        snapshot.available_count(),
        snapshot.slots.len(),
        snapshot.service_balance
    );

    for slot in &snapshot.slots {
        let occupant = slot
            .occupant
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".into());
        let until = match snapshot.model {
            PricingModel::Reservation if slot.occupant.is_some() => format!(
                " until {}",
                slot.end_time.to_datetime().to_rfc3339()
            ),
            _ => String::new(),
        };
        println!(
            "  #{:<2} {:<9} {}{}{}",
            slot.index,
            if slot.available { "free" } else { "taken" },
            occupant,
            if slot.active { " charging" } else { "" },
            until
        );
    }
}
