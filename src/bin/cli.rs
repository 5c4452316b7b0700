//! LedgerKV CLI Client
//!
//! Command-line interface for interacting with a LedgerKV server.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ledgerkv::protocol::{read_response, write_command, Command, Response, Status};
use ledgerkv::Result;

/// LedgerKV CLI
#[derive(Parser, Debug)]
#[command(name = "ledgerkv-cli")]
#[command(about = "CLI for the LedgerKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Get { key } => Command::Get { key },
            Commands::Set { key, value } => Command::Put { key, value },
            Commands::Del { key } => Command::Delete { key },
            Commands::Ping => Command::Ping,
        }
    }
}

fn send(server: &str, command: &Command) -> Result<Response> {
    let stream = TcpStream::connect(server)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    write_command(&mut writer, command)?;
    read_response(&mut reader)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let command = Command::from(args.command);

    let response = match send(&args.server, &command) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("(error) {}", e);
            return ExitCode::FAILURE;
        }
    };

    match response.status {
        Status::Ok => {
            println!("{}", response.payload.as_deref().unwrap_or("OK"));
            ExitCode::SUCCESS
        }
        Status::NotFound => {
            println!("(nil)");
            ExitCode::SUCCESS
        }
        Status::Error => {
            eprintln!("(error) {}", response.payload.as_deref().unwrap_or("unknown error"));
            ExitCode::FAILURE
        }
    }
}
