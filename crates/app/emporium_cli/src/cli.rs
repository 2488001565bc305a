use clap::{Args, Parser, Subcommand, ValueEnum};
use emporium_core::models::auth::TokenKind;

#[derive(Parser, Debug)]
#[command(name = "emporium", version, about = "Emporium auth tooling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version
    Version,

    /// Issue and check session tokens
    #[command(subcommand)]
    Token(TokenCommands),
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Sign a new token for a user
    Issue {
        /// Subject user ID
        user_id: String,

        #[arg(long, value_enum, default_value_t = KindArg::Access)]
        kind: KindArg,

        /// Lifetime in seconds
        #[arg(long, default_value_t = emporium_core::auth::jwt::ACCESS_TOKEN_EXPIRY_SECS)]
        ttl: u64,

        #[command(flatten)]
        secret: SecretArgs,
    },

    /// Check signature and expiry, then print the claims
    Verify {
        token: String,

        #[command(flatten)]
        secret: SecretArgs,
    },

    /// Print the claims without checking the signature
    Inspect { token: String },
}

#[derive(Args, Debug)]
pub struct SecretArgs {
    /// Signing secret. Falls back to `AUTH_SECRET`, then the server's persisted
    /// secret file if one exists.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Access,
    Refresh,
}

impl From<KindArg> for TokenKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Access => TokenKind::Access,
            KindArg::Refresh => TokenKind::Refresh,
        }
    }
}
