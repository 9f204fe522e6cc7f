mod theme;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use linktree_interface::state::LinkTreeAccount;
use linktree_sdk::{
    LinktreeClient, LinktreeError, LinktreeReader, LinktreeRpc, LinktreeSession,
    MutationOutcome, ProfileSummary, SessionConfig, SettingChange, SubmitConfig,
};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::{read_keypair, read_keypair_file, Keypair, Signer},
};
use std::{str::FromStr, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use theme::Theme;

fn parse_pubkey(s: &str) -> anyhow::Result<Pubkey> {
    Pubkey::from_str(s).with_context(|| format!("invalid address {s:?}"))
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CommitmentArg {
    Processed,
    Confirmed,
    Finalized,
}

impl CommitmentArg {
    fn to_config(self) -> CommitmentConfig {
        match self {
            CommitmentArg::Processed => CommitmentConfig::processed(),
            CommitmentArg::Confirmed => CommitmentConfig::confirmed(),
            CommitmentArg::Finalized => CommitmentConfig::finalized(),
        }
    }
}

#[derive(Clone, Debug, Args)]
struct SignerArg {
    /// Signer source: prompt|stdin|file:/path|env:VAR (Solana JSON keypair)
    #[arg(long = "payer", alias = "signer", default_value = "prompt")]
    signer: String,
}

fn keypair_from_source(source: &str) -> anyhow::Result<Keypair> {
    use std::io::Read as _;

    if let Some(path) = source.strip_prefix("file:") {
        return read_keypair_file(path).map_err(|e| anyhow::anyhow!("read keypair {path}: {e}"));
    }
    let secret = if let Some(var) = source.strip_prefix("env:") {
        Zeroizing::new(std::env::var(var).with_context(|| format!("env {var} not set"))?)
    } else if source == "stdin" {
        let mut buf = Zeroizing::new(String::new());
        std::io::stdin().read_to_string(&mut *buf)?;
        buf
    } else if source == "prompt" {
        Zeroizing::new(rpassword::prompt_password(
            "enter payer keypair (JSON byte array): ",
        )?)
    } else {
        anyhow::bail!("unknown signer source {source:?}, expected prompt|stdin|file:/path|env:VAR");
    };
    read_keypair(&mut secret.trim().as_bytes()).map_err(|e| anyhow::anyhow!("invalid keypair: {e}"))
}

fn parse_links(links: &[String]) -> anyhow::Result<(Vec<String>, Vec<String>)> {
    let mut urls = Vec::with_capacity(links.len());
    let mut titles = Vec::with_capacity(links.len());
    for link in links {
        let Some((title, url)) = link.split_once('=') else {
            anyhow::bail!("invalid --link {link:?}, expected title=url");
        };
        anyhow::ensure!(!title.is_empty() && !url.is_empty(), "empty title or url");
        titles.push(title.to_string());
        urls.push(url.to_string());
    }
    Ok((urls, titles))
}

fn summary_json(summary: &ProfileSummary) -> serde_json::Value {
    serde_json::json!({
        "username": summary.username,
        "address": summary.address.to_string(),
        "owner": summary.owner.to_string(),
    })
}

fn profile_json(address: &Pubkey, profile: &LinkTreeAccount, all: bool) -> serde_json::Value {
    let theme = Theme::from_color(&profile.color_hex);
    let links: Vec<_> = profile
        .links
        .iter()
        .filter(|link| all || link.active)
        .map(|link| {
            serde_json::json!({
                "id": link.id,
                "title": link.title,
                "url": link.url,
                "active": link.active,
            })
        })
        .collect();
    serde_json::json!({
        "address": address.to_string(),
        "owner": profile.owner.to_string(),
        "username": profile.username,
        "avatar_uri": profile.avatar_uri,
        "color_hex": profile.color_hex,
        "theme": theme,
        "link_counter": profile.link_counter,
        "links": links,
    })
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(operation: &str, outcome: MutationOutcome, profile: Option<Pubkey>) -> anyhow::Result<()> {
    let signature = outcome
        .into_result()
        .with_context(|| format!("{operation} failed"))?;
    info!(operation, %signature, "confirmed");
    print_json(&serde_json::json!({
        "operation": operation,
        "signature": signature.to_string(),
        "profile": profile.map(|p| p.to_string()),
    }))
}

#[derive(Parser, Debug)]
#[command(
    name = "linktree",
    version,
    about = "Solana linktree CLI",
    long_about = "Command-line interface for creating and managing linktree profiles.\nJSON is always printed to stdout; logs to stderr (RUST_LOG)."
)]
struct Cli {
    /// RPC endpoint URL
    #[arg(
        default_value = "http://localhost:8899",
        env = "LINKTREE_RPC",
        global = true,
        long
    )]
    rpc: String,

    /// Linktree program id (defaults to the declared program id)
    #[arg(env = "LINKTREE_PROGRAM_ID", global = true, long)]
    program_id: Option<String>,

    /// Commitment level reads use and transactions are waited for
    #[arg(global = true, long, value_enum, default_value_t = CommitmentArg::Confirmed)]
    commitment: CommitmentArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List profiles
    #[command(alias = "ls", about = "List all profiles, or those of one owner")]
    List {
        /// Only profiles owned by this address
        #[arg(long, conflicts_with = "mine")]
        owner: Option<String>,
        /// Only profiles owned by the payer
        #[arg(long)]
        mine: bool,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Show one profile
    #[command(alias = "get", about = "Show a profile with its theme and links")]
    Show {
        /// Profile account address
        #[arg(long, conflicts_with_all = ["username", "owner"], required_unless_present = "username")]
        address: Option<String>,
        /// Profile username (owner defaults to the payer)
        #[arg(long)]
        username: Option<String>,
        /// Profile owner
        #[arg(long, requires = "username")]
        owner: Option<String>,
        /// Include deleted links
        #[arg(long, default_value_t = false)]
        all: bool,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Derive a profile address
    #[command(about = "Derive the profile address for (username, owner)")]
    Pda {
        #[arg(long)]
        username: String,
        #[arg(long)]
        owner: String,
    },

    /// Create a profile
    #[command(alias = "new", about = "Create a profile owned by the payer")]
    Create {
        #[arg(long)]
        username: String,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Append links
    #[command(alias = "add", about = "Append links to a profile")]
    AddLinks {
        #[arg(long)]
        username: String,
        /// Repeatable title=url
        #[arg(long = "link", required = true)]
        links: Vec<String>,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Edit avatar and color
    #[command(alias = "set", about = "Edit a profile's avatar URI and/or color")]
    Edit {
        #[arg(long)]
        username: String,
        /// New avatar image URI
        #[arg(long)]
        avatar_uri: Option<String>,
        /// New color: red|yellow|blue|violet|green|pink or #rrggbb
        #[arg(long)]
        color: Option<String>,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Deactivate links
    #[command(alias = "rm-links", about = "Mark links inactive by id")]
    DeleteLinks {
        #[arg(long)]
        username: String,
        /// Repeatable link id
        #[arg(long = "id", required = true)]
        ids: Vec<u64>,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Delete a profile
    #[command(alias = "rm", about = "Close a profile account")]
    Delete {
        #[arg(long)]
        username: String,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Show a balance
    #[command(about = "Lamport balance of an address (defaults to the payer)")]
    Balance {
        #[arg(long)]
        address: Option<String>,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Show signature history
    #[command(
        alias = "history",
        about = "Recent transaction signatures of an address (defaults to the payer)"
    )]
    Signatures {
        #[arg(long)]
        address: Option<String>,
        #[command(flatten)]
        payer: SignerArg,
    },

    /// Request an airdrop
    #[command(about = "Request lamports for the payer (dev/test clusters)")]
    Airdrop {
        #[arg(long, default_value_t = LAMPORTS_PER_SOL)]
        lamports: u64,
        #[command(flatten)]
        payer: SignerArg,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_logging();

    let program_id = match args.program_id.as_deref() {
        Some(s) => parse_pubkey(s).context("--program-id or LINKTREE_PROGRAM_ID")?,
        None => linktree_interface::id(),
    };
    let commitment = args.commitment.to_config();
    let rpc: Arc<dyn LinktreeRpc> =
        Arc::new(RpcClient::new_with_commitment(args.rpc.clone(), commitment));
    let client = LinktreeClient::new(program_id);
    let reader = LinktreeReader::new(rpc.clone(), client);
    let config = SessionConfig {
        program_id,
        submit: SubmitConfig {
            commitment,
            ..SubmitConfig::default()
        },
    };
    let session = |payer: &SignerArg| -> anyhow::Result<LinktreeSession> {
        let keypair = keypair_from_source(&payer.signer)?;
        Ok(LinktreeSession::new(rpc.clone(), Arc::new(keypair), config))
    };
    let payer_pubkey =
        |payer: &SignerArg| -> anyhow::Result<Pubkey> { Ok(keypair_from_source(&payer.signer)?.pubkey()) };

    match args.command {
        Commands::List { owner, mine, payer } => {
            let owner = match (owner, mine) {
                (Some(owner), _) => Some(parse_pubkey(&owner)?),
                (None, true) => Some(payer_pubkey(&payer)?),
                (None, false) => None,
            };
            let profiles = match owner {
                Some(owner) => reader.list_profiles_by_owner(&owner).await?,
                None => reader.list_profiles().await?,
            };
            let rows: Vec<_> = profiles.iter().map(summary_json).collect();
            print_json(&serde_json::json!({ "profiles": rows }))?;
        }

        Commands::Show {
            address,
            username,
            owner,
            all,
            payer,
        } => {
            let address = match (address, username) {
                (Some(address), _) => parse_pubkey(&address)?,
                (None, Some(username)) => {
                    let owner = match owner {
                        Some(owner) => parse_pubkey(&owner)?,
                        None => payer_pubkey(&payer)?,
                    };
                    client.profile_pda(&username, &owner)?
                }
                (None, None) => anyhow::bail!("--address or --username required"),
            };
            let profile = reader
                .get_profile(&address)
                .await
                .with_context(|| format!("read profile {address}"))?
                .with_context(|| format!("no profile at {address}"))?;
            print_json(&profile_json(&address, &profile, all))?;
        }

        Commands::Pda { username, owner } => {
            let owner = parse_pubkey(&owner)?;
            let (address, bump) = client.profile_pda_and_bump(&username, &owner)?;
            print_json(&serde_json::json!({
                "address": address.to_string(),
                "bump": bump,
            }))?;
        }

        Commands::Create { username, payer } => {
            let session = session(&payer)?;
            let profile = client.profile_pda(&username, &session.owner())?;
            let outcome = session.create_profile(&username).await;
            report("create", outcome, Some(profile))?;
        }

        Commands::AddLinks {
            username,
            links,
            payer,
        } => {
            let (urls, titles) = parse_links(&links)?;
            let session = session(&payer)?;
            let profile = client.profile_pda(&username, &session.owner())?;
            let outcome = session.add_links(&username, urls, titles).await;
            report("add-links", outcome, Some(profile))?;
        }

        Commands::Edit {
            username,
            avatar_uri,
            color,
            payer,
        } => {
            let session = session(&payer)?;
            let profile = client.profile_pda(&username, &session.owner())?;
            let current = session
                .my_profile(&username)
                .await?
                .with_context(|| format!("no profile {username:?} for {}", session.owner()))?;
            let outcome = session
                .edit_settings(
                    &username,
                    SettingChange::diff(&current.avatar_uri, avatar_uri),
                    SettingChange::diff(&current.color_hex, color),
                )
                .await;
            if matches!(outcome.error, Some(LinktreeError::EmptyTransaction)) {
                info!("settings unchanged, nothing sent");
                print_json(&serde_json::json!({
                    "operation": "edit",
                    "changed": false,
                    "profile": profile.to_string(),
                }))?;
            } else {
                report("edit", outcome, Some(profile))?;
            }
        }

        Commands::DeleteLinks {
            username,
            ids,
            payer,
        } => {
            let session = session(&payer)?;
            let profile = client.profile_pda(&username, &session.owner())?;
            let outcome = session.delete_links(&username, ids).await;
            report("delete-links", outcome, Some(profile))?;
        }

        Commands::Delete { username, payer } => {
            let session = session(&payer)?;
            let profile = client.profile_pda(&username, &session.owner())?;
            let outcome = session.delete_profile(&username).await;
            report("delete", outcome, Some(profile))?;
        }

        Commands::Balance { address, payer } => {
            let address = match address {
                Some(address) => parse_pubkey(&address)?,
                None => payer_pubkey(&payer)?,
            };
            let lamports = reader.get_balance(&address).await?;
            print_json(&serde_json::json!({
                "address": address.to_string(),
                "lamports": lamports,
                "sol": lamports as f64 / LAMPORTS_PER_SOL as f64,
            }))?;
        }

        Commands::Signatures { address, payer } => {
            let address = match address {
                Some(address) => parse_pubkey(&address)?,
                None => payer_pubkey(&payer)?,
            };
            let records = reader.get_signatures(&address).await?;
            let rows: Vec<_> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "signature": r.signature,
                        "slot": r.slot,
                        "error": r.error,
                        "block_time": r.block_time,
                    })
                })
                .collect();
            print_json(&serde_json::json!({
                "address": address.to_string(),
                "signatures": rows,
            }))?;
        }

        Commands::Airdrop { lamports, payer } => {
            let session = session(&payer)?;
            let outcome = session.request_airdrop(lamports).await;
            report("airdrop", outcome, None)?;
        }
    }

    Ok(())
}
