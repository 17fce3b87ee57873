use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chrona",
    about = "Chrona: time-gated, access-controlled record vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Vault state file
    #[arg(long, global = true, default_value = "chrona-state.json")]
    pub state: PathBuf,

    /// Optional TOML configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Local account to act as
    #[arg(long = "as", global = true, default_value = "admin")]
    pub account: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new vault and its administrator account
    Init(InitArgs),
    /// Manage local accounts
    Account(AccountArgs),
    /// Encrypt and submit a record
    Submit(SubmitArgs),
    /// Show one record
    Get(RecordArgs),
    /// List records
    List(ListArgs),
    /// Check whether a record's disclosure time has passed
    CanDisclose(RecordArgs),
    /// Make an eligible record publicly decryptable
    MakePublic(RecordArgs),
    /// Request disclosure of a record's access field (administrator)
    RequestDisclosure(RecordArgs),
    /// Show disclosure requests awaiting completion
    Pending,
    /// Hand the administrator role to another account
    TransferOwnership(TransferArgs),
    /// Decrypt a record's content
    Decrypt(RecordArgs),
    /// Show record counts per phase
    Stats,
    /// Verify the transaction journal
    Verify,
    /// Move the vault's clock forward
    Warp(WarpArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing state file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub action: Option<AccountAction>,
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Generate a new account
    New { name: String },
    /// List accounts
    List,
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Content to store
    pub content: String,
    /// Account name or address revealed on administrator disclosure
    #[arg(long)]
    pub access: Option<String>,
    /// Seconds until the record becomes eligible
    #[arg(long, conflicts_with = "at")]
    pub delay: Option<u64>,
    /// Absolute disclosure time, in seconds since the UNIX epoch
    #[arg(long)]
    pub at: Option<u64>,
}

#[derive(Args)]
pub struct RecordArgs {
    pub id: u64,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only records of this account name or address
    #[arg(long)]
    pub owner: Option<String>,
}

#[derive(Args)]
pub struct TransferArgs {
    /// Account name or address of the new administrator
    pub to: String,
}

#[derive(Args)]
pub struct WarpArgs {
    pub secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_submit() {
        let cli =
            Cli::try_parse_from(["chrona", "submit", "hello", "--access", "bob", "--delay", "30"])
                .unwrap();
        if let Command::Submit(args) = cli.command {
            assert_eq!(args.content, "hello");
            assert_eq!(args.access.as_deref(), Some("bob"));
            assert_eq!(args.delay, Some(30));
            assert_eq!(args.at, None);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn delay_conflicts_with_at() {
        assert!(Cli::try_parse_from(["chrona", "submit", "x", "--delay", "1", "--at", "2"]).is_err());
    }

    #[test]
    fn global_defaults() {
        let cli = Cli::try_parse_from(["chrona", "stats"]).unwrap();
        assert_eq!(cli.state, PathBuf::from("chrona-state.json"));
        assert_eq!(cli.account, "admin");
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_as_after_subcommand() {
        let cli = Cli::try_parse_from(["chrona", "make-public", "3", "--as", "alice"]).unwrap();
        assert_eq!(cli.account, "alice");
        assert!(matches!(cli.command, Command::MakePublic(RecordArgs { id: 3 })));
    }

    #[test]
    fn parse_account_new() {
        let cli = Cli::try_parse_from(["chrona", "account", "new", "carol"]).unwrap();
        if let Command::Account(AccountArgs {
            action: Some(AccountAction::New { name }),
        }) = cli.command
        {
            assert_eq!(name, "carol");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_request_disclosure() {
        let cli = Cli::try_parse_from(["chrona", "request-disclosure", "0"]).unwrap();
        assert!(matches!(cli.command, Command::RequestDisclosure(RecordArgs { id: 0 })));
    }
}
