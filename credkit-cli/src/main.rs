//! `credkit`: drives credential requests through `CredKit` against a scripted provider host.
//!
//! ```text
//! credkit create-password --id alice --password pw123
//! credkit --reply cancel create-passkey --rp-id example.com --user alice
//! credkit --reply error:GET_NO_CREDENTIALS get-credential --password
//! credkit --reply silent --config '{"response_timeout_ms": 500}' get-credential --password
//! ```

mod host;

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use clap::{Parser, Subcommand};
use credkit_core::{
    CancellationSignal, CreateCredentialResponse, CreatePasswordRequest,
    CreatePublicKeyCredentialRequest, Credential, CredentialOption, CredentialProvider,
    GetCredentialRequest, ProviderConfig, ProviderFailure, ProviderHost,
};
use eyre::{bail, WrapErr};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use host::{Reply, ScriptedHost, HOST_ID};

/// Used for `--reply silent` when the config sets no timeout, so the CLI terminates.
const SILENT_TIMEOUT_MS: u64 = 2_000;
const DEMO_CHALLENGE: &[u8] = b"credkit-demo-challenge";

#[derive(Parser)]
#[command(name = "credkit", version, about = "Drive CredKit against a scripted provider host")]
struct Cli {
    /// Provider configuration as JSON, e.g. '{"cancel_in_flight": false}'.
    #[arg(long, env = "CREDKIT_CONFIG", default_value = "{}", global = true)]
    config: String,

    /// How the provider answers: ok, cancel, error:<TAG>, dom:<CODE>, garbage, silent or refuse.
    #[arg(long, default_value = "ok", global = true)]
    reply: Reply,

    /// How long the provider takes to answer, in milliseconds.
    #[arg(long, default_value_t = 100, global = true)]
    delay_ms: u64,

    /// Cancel the request this many milliseconds after it starts.
    #[arg(long, global = true)]
    cancel_after_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save a password.
    CreatePassword {
        #[arg(long)]
        id: String,
        #[arg(long)]
        password: String,
    },
    /// Register a passkey.
    CreatePasskey {
        #[arg(long, default_value = "example.com")]
        rp_id: String,
        #[arg(long, default_value = "alice")]
        user: String,
        /// Creation options JSON to send as is instead of the generated request.
        #[arg(long)]
        request_json: Option<String>,
        #[arg(long)]
        prefer_immediately_available: bool,
    },
    /// Sign in with a saved password and/or a passkey.
    GetCredential {
        /// Accept a saved password.
        #[arg(long)]
        password: bool,
        /// Accept a passkey for this relying party.
        #[arg(long)]
        passkey_rp_id: Option<String>,
    },
}

fn init_tracing() -> eyre::Result<()> {
    tracing_log::LogTracer::init().wrap_err("failed to bridge log records")?;
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("failed to install tracing subscriber")?;
    Ok(())
}

fn creation_options_json(rp_id: &str, user: &str) -> String {
    serde_json::json!({
        "rp": { "id": rp_id, "name": rp_id },
        "user": {
            "id": URL_SAFE_NO_PAD.encode(user),
            "name": user,
            "displayName": user,
        },
        "challenge": URL_SAFE_NO_PAD.encode(DEMO_CHALLENGE),
        "pubKeyCredParams": [
            { "type": "public-key", "alg": -7 },
            { "type": "public-key", "alg": -257 },
        ],
        "authenticatorSelection": { "residentKey": "required", "userVerification": "preferred" },
        "attestation": "none",
    })
    .to_string()
}

fn request_options_json(rp_id: &str) -> String {
    serde_json::json!({
        "challenge": URL_SAFE_NO_PAD.encode(DEMO_CHALLENGE),
        "rpId": rp_id,
        "userVerification": "preferred",
    })
    .to_string()
}

fn print_json(json: &str) -> eyre::Result<()> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn failure<E: ProviderFailure + std::fmt::Display>(err: &E) -> eyre::Report {
    eyre::eyre!("[{}] {err}", err.error_type())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let mut config = ProviderConfig::from_json(&cli.config)?;
    if cli.reply == Reply::Silent && config.response_timeout_ms.is_none() {
        tracing::warn!("silent provider without a timeout, waiting at most {SILENT_TIMEOUT_MS} ms");
        config.response_timeout_ms = Some(SILENT_TIMEOUT_MS);
    }
    let provider = CredentialProvider::new(config);
    let host: Arc<dyn ProviderHost> = Arc::new(ScriptedHost::new(
        cli.reply,
        Duration::from_millis(cli.delay_ms),
    ));

    let cancellation = cli.cancel_after_ms.map(|ms| {
        let signal = Arc::new(CancellationSignal::new());
        let trigger = Arc::clone(&signal);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            tracing::info!("cancelling request");
            trigger.cancel();
        });
        signal
    });

    match cli.command {
        Command::CreatePassword { id, password } => {
            let request = CreatePasswordRequest { id, password };
            match provider
                .create_credential(request.into(), host, cancellation)
                .await
            {
                Ok(CreateCredentialResponse::Password) => println!("password saved"),
                Ok(other) => bail!("unexpected response {other:?}"),
                Err(err) => return Err(failure(&err)),
            }
        }
        Command::CreatePasskey {
            rp_id,
            user,
            request_json,
            prefer_immediately_available,
        } => {
            let request = CreatePublicKeyCredentialRequest {
                request_json: request_json
                    .unwrap_or_else(|| creation_options_json(&rp_id, &user)),
                prefer_immediately_available_credentials: prefer_immediately_available,
            };
            match provider
                .create_credential(request.into(), host, cancellation)
                .await
            {
                Ok(CreateCredentialResponse::PublicKeyCredential {
                    registration_response_json,
                }) => print_json(&registration_response_json)?,
                Ok(other) => bail!("unexpected response {other:?}"),
                Err(err) => return Err(failure(&err)),
            }
        }
        Command::GetCredential {
            password,
            passkey_rp_id,
        } => {
            let mut options = Vec::new();
            if password {
                options.push(CredentialOption::Password);
            }
            if let Some(rp_id) = passkey_rp_id {
                options.push(CredentialOption::PublicKeyCredential {
                    request_json: request_options_json(&rp_id),
                });
            }
            match provider
                .get_credential(GetCredentialRequest { options }, host, cancellation)
                .await
            {
                Ok(response) => match response.credential {
                    Credential::Password { id, password } => {
                        println!("id: {id}\npassword: {password}");
                    }
                    Credential::PublicKeyCredential {
                        authentication_response_json,
                    } => print_json(&authentication_response_json)?,
                },
                Err(err) => return Err(failure(&err)),
            }
        }
    }

    tracing::debug!(
        live = provider.live_invocations(HOST_ID),
        "provider invocations left"
    );
    Ok(())
}
