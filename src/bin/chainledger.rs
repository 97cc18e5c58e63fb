#![forbid(unsafe_code)]
//! Command line front end for a durable ChainLedger store.

use chainledger::cli::{
    describe_block, describe_report, init_tracing, load_durable_config, open_ledger,
    render_chain_table,
};
use clap::{Parser, Subcommand};
use colored::*;

#[derive(Parser)]
#[command(name = "chainledger", version, about = "Append-only, tamper-evident transaction ledger")]
struct Cli {
    /// SQLite file to use instead of `storage.path` from the config.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a new transaction as the next block.
    Append {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// List all blocks, newest first.
    List,
    /// Show one block in full.
    Show { index: u64 },
    /// Check the hash chain for tampering.
    Verify,
    /// Discard every block.
    Clear {
        /// Skip the confirmation guard.
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_durable_config(cli.db.as_deref())?;
    init_tracing(&config)?;
    let ledger = open_ledger(&config)?;

    match cli.command {
        Command::Append {
            from,
            to,
            amount,
            note,
        } => match ledger.append_transaction(&from, &to, amount.as_str(), note.as_deref()) {
            Ok(block) => {
                println!(
                    "{}",
                    format!("✅ Block #{} added successfully!", block.index).green().bold()
                );
                println!("{}", describe_block(&block));
            }
            Err(e) if e.is_invalid_input() => {
                eprintln!("{} {}", "❌".red(), e.to_string().red());
                std::process::exit(2);
            }
            Err(e) => return Err(e.into()),
        },
        Command::List => {
            let chain = ledger.get_chain();
            if chain.is_empty() {
                println!("{}", "No transactions yet. Add one with `chainledger append`.".yellow());
            } else {
                println!("{}", render_chain_table(&chain));
                println!("{} block(s)", chain.len());
            }
        }
        Command::Show { index } => match ledger.get_block(index) {
            Some(block) => println!("{}", describe_block(&block)),
            None => {
                eprintln!("{}", format!("Block #{} not found", index).red());
                std::process::exit(1);
            }
        },
        Command::Verify => {
            let report = ledger.verify_integrity();
            println!("{}", describe_report(&report));
            if !report.valid {
                std::process::exit(1);
            }
        }
        Command::Clear { yes } => {
            if !yes {
                eprintln!(
                    "{}",
                    "Refusing to clear without --yes; this discards every block.".yellow()
                );
                std::process::exit(2);
            }
            ledger.clear_chain()?;
            println!("{}", "🧹 Ledger cleared.".bright_green());
        }
    }

    Ok(())
}
