//! Discount CLI Client
//!
//! Command-line interface for exercising a discount server by hand.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use discountd::network::Client;
use discountd::RedeemOutcome;

/// Discount CLI
#[derive(Parser, Debug)]
#[command(name = "discount-cli")]
#[command(about = "CLI for the discount code server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate discount codes
    Generate {
        /// How many codes (1-2000)
        count: u16,

        /// Code length (7 or 8)
        length: u8,
    },

    /// Use a discount code
    Use {
        /// The code to redeem
        code: String,
    },

    /// Interactive session over one connection
    Shell,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Connection error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Commands::Generate { count, length } => generate(&mut client, count, length),
        Commands::Use { code } => use_code(&mut client, &code),
        Commands::Shell => shell(&mut client, &args.server),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn generate(client: &mut Client, count: u16, length: u8) -> discountd::Result<()> {
    match client.generate(count, length)? {
        Some(codes) => {
            println!("Generated {} codes:", codes.len());
            for code in codes {
                println!("  {}", code);
            }
        }
        None => println!("Generate request failed"),
    }
    Ok(())
}

fn use_code(client: &mut Client, code: &str) -> discountd::Result<()> {
    let message = match client.use_code(code)? {
        RedeemOutcome::Success => "Code used successfully",
        RedeemOutcome::InvalidCode => "Invalid code",
        RedeemOutcome::AlreadyUsed => "Code already used",
        RedeemOutcome::ServerError => "Server error",
    };
    println!("{}", message);
    Ok(())
}

fn shell(client: &mut Client, server: &str) -> discountd::Result<()> {
    println!("Connected to {}", server);
    println!("Available commands:");
    println!("  generate <count> <length> - Generate discount codes");
    println!("  use <code>                - Use a discount code");
    println!("  exit                      - Exit the shell");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => continue,
            ["exit"] => return Ok(()),
            ["generate", count, length] => match (count.parse::<u16>(), length.parse::<u8>()) {
                (Ok(count), Ok(length)) => generate(client, count, length)?,
                _ => println!("Invalid number format"),
            },
            ["generate", ..] => println!("Usage: generate <count> <length>"),
            ["use", code] => use_code(client, code)?,
            ["use", ..] => println!("Usage: use <code>"),
            _ => println!("Unknown command. Available: generate, use, exit"),
        }
    }
}
