// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands, SecretArgs, TokenCommands};
use emporium_core::auth::TokenCodec;
use emporium_core::auth::jwt::load_jwt_secret;

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), emporium_core::version());
        }
        Commands::Token(cmd) => token(cmd)?,
    }

    Ok(())
}

fn token(cmd: TokenCommands) -> Result<()> {
    match cmd {
        TokenCommands::Issue {
            user_id,
            kind,
            ttl,
            secret,
        } => {
            if ttl == 0 {
                return Err(Error::Custom("--ttl must be positive".into()));
            }
            let token = codec(secret)?.issue(&user_id, kind.into(), ttl)?;
            println!("{token}");
        }
        TokenCommands::Verify { token, secret } => {
            let claims = codec(secret)?
                .verify(&token)
                .ok_or_else(|| Error::Custom("invalid or expired token".into()))?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        TokenCommands::Inspect { token } => {
            let claims = TokenCodec::decode_unverified(&token)
                .ok_or_else(|| Error::Custom("malformed token".into()))?;
            log::warn!("signature not checked");
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
    }
    Ok(())
}

/// Uses an existing secret only; the CLI never generates one.
fn codec(args: SecretArgs) -> Result<TokenCodec> {
    let secret = args
        .secret
        .filter(|s| !s.is_empty())
        .or_else(load_jwt_secret)
        .ok_or_else(|| {
            Error::Custom("no signing secret: pass --secret or set JWT_SECRET".into())
        })?;
    Ok(TokenCodec::new(secret.as_bytes()))
}
