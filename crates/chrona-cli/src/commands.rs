use std::path::Path;

use anyhow::{bail, Context};
use chrona_sdk::{DisclosureRelay, SdkConfig};
use chrona_store::{Phase, Record};
use chrona_types::{Identity, RecordId, Timestamp};
use chrona_vault::{Operation, OperationOutput};
use colored::{ColoredString, Colorize};

use crate::cli::*;
use crate::state::LocalVault;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SdkConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => SdkConfig::default(),
    };
    match cli.command {
        Command::Init(args) => cmd_init(&cli.state, &cli.account, config, args),
        command => {
            let mut local = LocalVault::open(&cli.state, config)?;
            if dispatch(&mut local, &cli.account, command)? {
                local.save(&cli.state)?;
            }
            Ok(())
        }
    }
}

/// Run one command against an open vault. Returns whether state changed.
fn dispatch(local: &mut LocalVault, account: &str, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Init(_) => bail!("vault already open"),
        Command::Account(args) => cmd_account(local, args),
        Command::Submit(args) => cmd_submit(local, account, args).map(|_| true),
        Command::Get(args) => cmd_get(local, args).map(|_| false),
        Command::List(args) => cmd_list(local, args).map(|_| false),
        Command::CanDisclose(args) => cmd_can_disclose(local, args).map(|_| false),
        Command::MakePublic(args) => cmd_make_public(local, account, args).map(|_| true),
        Command::RequestDisclosure(args) => cmd_request_disclosure(local, account, args).map(|_| true),
        Command::Pending => cmd_pending(local).map(|_| false),
        Command::TransferOwnership(args) => cmd_transfer(local, account, args).map(|_| true),
        Command::Decrypt(args) => cmd_decrypt(local, account, args).map(|_| false),
        Command::Stats => cmd_stats(local).map(|_| false),
        Command::Verify => cmd_verify(local).map(|_| false),
        Command::Warp(args) => {
            local.warp(args.secs);
            println!("Clock now {}", format_time(local.client.vault().now()).bold());
            Ok(true)
        }
    }
}

fn cmd_init(path: &Path, admin: &str, config: SdkConfig, args: InitArgs) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let local = LocalVault::create(admin, config)?;
    local.save(path)?;
    let vault = local.client.vault();
    println!("{} Initialized vault in {}", "✓".green().bold(), path.display().to_string().bold());
    println!("  Scope: {}", vault.scope().to_string().cyan());
    println!("  Administrator: {} ({})", admin.bold(), vault.administrator()?);
    Ok(())
}

fn cmd_account(local: &mut LocalVault, args: AccountArgs) -> anyhow::Result<bool> {
    match args.action {
        Some(AccountAction::New { name }) => {
            let identity = local.add_account(&name)?;
            println!("{} Created account {} ({})", "✓".green().bold(), name.bold(), identity);
            Ok(true)
        }
        Some(AccountAction::List) | None => {
            let admin = local.client.vault().administrator()?;
            for (name, identity) in local.accounts() {
                let marker = if identity == admin { " (administrator)".yellow() } else { "".normal() };
                println!("  {:<12} {}{}", name.bold(), identity, marker);
            }
            Ok(false)
        }
    }
}

fn cmd_submit(local: &LocalVault, account: &str, args: SubmitArgs) -> anyhow::Result<()> {
    let owner = local.signing_key(account)?.identity();
    let access = match &args.access {
        Some(who) => local.resolve(who)?,
        None => owner,
    };
    let client = &local.client;
    let id = match args.at {
        Some(at) => client.submit_text(owner, access, &args.content, Timestamp::from_secs(at))?,
        None => client.submit_after(owner, access, args.content.as_bytes(), args.delay)?,
    };
    let record = client.vault().get(id)?;
    println!("{} Record {} submitted", "✓".green().bold(), id.to_string().yellow());
    println!("  Owner: {}", label(local, &owner));
    println!("  Access field: {}", label(local, &access));
    println!("  Discloses: {}", format_time(record.disclosure_time));
    Ok(())
}

fn cmd_get(local: &LocalVault, args: RecordArgs) -> anyhow::Result<()> {
    let vault = local.client.vault();
    let record = vault.get(RecordId::new(args.id))?;
    let now = vault.now();
    println!("Record {}  {}", record.id.to_string().yellow().bold(), phase_label(record.phase(now)));
    println!("  Owner: {}", label(local, &record.owner));
    println!("  Submitted: {}", format_time(record.submitted_at));
    println!("  Discloses: {}{}", format_time(record.disclosure_time), remaining(&record, now));
    println!("  Length: {} bytes", record.payload_len());
    if let Some(revealed) = record.revealed() {
        println!("  Revealed: {}", label(local, &revealed).green());
    }
    Ok(())
}

fn cmd_list(local: &LocalVault, args: ListArgs) -> anyhow::Result<()> {
    let vault = local.client.vault();
    let records = match &args.owner {
        Some(who) => {
            let owner = local.resolve(who)?;
            vault
                .records_of(&owner)?
                .into_iter()
                .map(|id| vault.get(id))
                .collect::<Result<Vec<_>, _>>()?
        }
        None => vault.records_in(0..vault.total_count()?)?,
    };
    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }
    let now = vault.now();
    for record in &records {
        println!(
            "{:<6} {:<22} {:<14} {}",
            record.id.to_string().yellow(),
            phase_label(record.phase(now)),
            label(local, &record.owner),
            format_time(record.disclosure_time).dimmed()
        );
    }
    Ok(())
}

fn cmd_can_disclose(local: &LocalVault, args: RecordArgs) -> anyhow::Result<()> {
    let vault = local.client.vault();
    let id = RecordId::new(args.id);
    if vault.can_be_disclosed(id)? {
        println!("{} Record {} can be disclosed", "✓".green().bold(), id);
    } else {
        let record = vault.get(id)?;
        println!("{} Record {} is locked{}", "✗".red().bold(), id, remaining(&record, vault.now()));
    }
    Ok(())
}

fn cmd_make_public(local: &LocalVault, account: &str, args: RecordArgs) -> anyhow::Result<()> {
    let caller = local.resolve(account)?;
    let id = RecordId::new(args.id);
    local.client.vault().make_public(caller, id)?;
    println!("{} Record {} is now public", "✓".green().bold(), id.to_string().yellow());
    Ok(())
}

fn cmd_request_disclosure(local: &LocalVault, account: &str, args: RecordArgs) -> anyhow::Result<()> {
    let caller = local.resolve(account)?;
    let vault = local.client.vault();
    let receipt = vault.submit_transaction(
        caller,
        Operation::RequestDisclosure {
            id: RecordId::new(args.id),
        },
    );
    let effects = receipt.effects.clone();
    if let OperationOutput::DisclosureRequested { id, correlation_id } = receipt.into_result()? {
        println!("{} Disclosure of {} requested", "✓".green().bold(), id.to_string().yellow());
        println!("  Correlation: {}", correlation_id.to_string().dimmed());
    }

    let relay = DisclosureRelay::new(vault.clone(), local.client.cipher().clone());
    let runtime = tokio::runtime::Runtime::new()?;
    for event in &effects {
        if let Some((id, revealed)) = runtime.block_on(relay.handle_event(event)) {
            println!("{} Record {} disclosed: {}", "✓".green().bold(), id, label(local, &revealed).green());
        }
    }
    if relay.stats().failed > 0 {
        println!("{} Decryption did not complete; the request stays pending", "!".yellow().bold());
    }
    Ok(())
}

fn cmd_pending(local: &LocalVault) -> anyhow::Result<()> {
    let pending = local.client.vault().pending_requests()?;
    if pending.is_empty() {
        println!("No pending disclosure requests.");
    }
    for (correlation_id, id) in pending {
        println!("{:<6} {}", id.to_string().yellow(), correlation_id.to_string().dimmed());
    }
    Ok(())
}

fn cmd_transfer(local: &LocalVault, account: &str, args: TransferArgs) -> anyhow::Result<()> {
    let caller = local.resolve(account)?;
    let to = local.resolve(&args.to)?;
    local.client.vault().transfer_ownership(caller, to)?;
    println!("{} Administrator is now {}", "✓".green().bold(), label(local, &to).bold());
    Ok(())
}

fn cmd_decrypt(local: &LocalVault, account: &str, args: RecordArgs) -> anyhow::Result<()> {
    let id = RecordId::new(args.id);
    let bytes = if local.client.vault().get(id)?.is_public() {
        local.client.read_public(id)?
    } else {
        let key = local.signing_key(account)?;
        local.client.decrypt_record(&key, id)?
    };
    println!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}

fn cmd_stats(local: &LocalVault) -> anyhow::Result<()> {
    let stats = local.client.vault().stats()?;
    println!("Records: {}", stats.total.to_string().bold());
    println!("  {:<20} {}", "locked".red(), stats.locked);
    println!("  {:<20} {}", "eligible".yellow(), stats.eligible);
    println!("  {:<20} {}", "publicly disclosed".green(), stats.publicly_disclosed);
    println!("  {:<20} {}", "pending".cyan(), stats.pending);
    println!("  {:<20} {}", "disclosed".green(), stats.disclosed);
    Ok(())
}

fn cmd_verify(local: &LocalVault) -> anyhow::Result<()> {
    let vault = local.client.vault();
    vault.verify_journal()?;
    let journal = vault.journal()?;
    println!("{} Journal integrity verified", "✓".green().bold());
    println!("  Entries: {}", journal.len());
    if let Some(last) = journal.last() {
        println!("  Head: {}", hex::encode(&last.entry_hash[..8]).dimmed());
    }
    Ok(())
}

fn label(local: &LocalVault, identity: &Identity) -> String {
    match local.name_of(identity) {
        Some(name) => name.to_string(),
        None => identity.short_id(),
    }
}

fn phase_label(phase: Phase) -> ColoredString {
    let text = phase.to_string();
    match phase {
        Phase::Locked => text.red(),
        Phase::Eligible => text.yellow(),
        Phase::DisclosureRequested => text.cyan(),
        Phase::PubliclyDisclosed | Phase::Disclosed => text.green(),
    }
}

fn remaining(record: &Record, now: Timestamp) -> String {
    if record.is_eligible_at(now) {
        String::new()
    } else {
        format!(" (in {}s)", now.secs_until(record.disclosure_time))
    }
}

fn format_time(ts: Timestamp) -> String {
    i64::try_from(ts.as_secs())
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
