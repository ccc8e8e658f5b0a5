use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use regkey::{BoolDecoding, KeyConfig, NativeApi, RawValue, RegKey, RootKey};

#[derive(Parser, Debug)]
#[command(name = "regkey")]
#[command(about = "Typed access to the Windows Registry")]
struct Args {
    #[arg(
        long,
        default_value = "HKCU",
        help = "Root key (HKCR, HKCU, HKLM, HKU, HKCC or their HKEY_* names)"
    )]
    root: RootKey,

    #[arg(long, help = "Open keys without permission to set values")]
    read_only: bool,

    #[arg(long, help = "How get-bool decodes DWORD bytes: dword or varint")]
    bool_decoding: Option<BoolDecoding>,

    #[arg(long, help = "Print results as JSON")]
    json: bool,

    #[arg(
        short,
        long,
        help = "Enable verbose logging (shows every registry round-trip)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the subkeys of a key
    Subkeys { path: String },

    /// List the values of a key with their type
    Values { path: String },

    /// Read a DWORD value
    GetDword { path: String, name: String },

    /// Write a DWORD value
    SetDword {
        path: String,
        name: String,
        value: u32,
    },

    /// Read a DWORD value as a boolean
    GetBool { path: String, name: String },

    /// Read a string value
    GetString { path: String, name: String },

    /// Dump the raw bytes and type of a value
    GetRaw { path: String, name: String },
}

impl Command {
    fn path(&self) -> &str {
        match self {
            Command::Subkeys { path }
            | Command::Values { path }
            | Command::GetDword { path, .. }
            | Command::SetDword { path, .. }
            | Command::GetBool { path, .. }
            | Command::GetString { path, .. }
            | Command::GetRaw { path, .. } => path,
        }
    }
}

#[derive(Serialize)]
struct ValueReport<'a, T: Serialize> {
    key: &'a str,
    name: &'a str,
    value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    decoding: Option<BoolDecoding>,
}

#[derive(Serialize)]
struct RawReport {
    tag: String,
    len: usize,
    data: String,
}

impl From<&RawValue> for RawReport {
    fn from(value: &RawValue) -> Self {
        Self {
            tag: value.tag.to_string(),
            len: value.len(),
            data: value.data.iter().map(|b| format!("{b:02x}")).collect(),
        }
    }
}

fn check_platform() {
    if !NativeApi::instance().is_available() {
        eprintln!("\n⚠️  ERROR: The Windows registry is not available on this platform\n\nregkey only runs on Windows hosts.\n");
        std::process::exit(1);
    }
}

fn print_value<T: Serialize + std::fmt::Display>(
    json: bool,
    key: &RegKey<'_>,
    name: &str,
    value: T,
    decoding: Option<BoolDecoding>,
) -> anyhow::Result<()> {
    if json {
        let report = ValueReport {
            key: key.path(),
            name,
            value,
            decoding,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{value}");
    }
    Ok(())
}

fn run(args: &Args, key: &RegKey<'_>) -> anyhow::Result<()> {
    match &args.command {
        Command::Subkeys { .. } => {
            let subkeys = key.subkeys()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&subkeys)?);
            } else {
                for name in subkeys {
                    println!("{name}");
                }
            }
        }
        Command::Values { .. } => {
            let values = key.values()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                for (name, label) in values {
                    println!("{name}\t{label}");
                }
            }
        }
        Command::GetDword { name, .. } => {
            let value = key.dword_value(name)?;
            print_value(args.json, key, name, value, None)?;
        }
        Command::SetDword { name, value, .. } => {
            key.set_dword_value(name, *value)?;
            tracing::info!("Set {}\\{} = {}", key.path(), name, value);
        }
        Command::GetBool { name, .. } => {
            let value = key.bool_value(name)?;
            let decoding = Some(key.config().bool_decoding);
            print_value(args.json, key, name, value, decoding)?;
        }
        Command::GetString { name, .. } => {
            let value = key.string_value(name)?;
            print_value(args.json, key, name, value, None)?;
        }
        Command::GetRaw { name, .. } => {
            let value = key.raw_value(name)?;
            let report = RawReport::from(&value);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} ({} bytes): {}", report.tag, report.len, report.data);
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging based on verbose flag; RUST_LOG wins when set
    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Fail fast on hosts without a registry
    check_platform();

    let mut config = KeyConfig::from_env();
    if args.read_only {
        config = config.read_only();
    }
    if let Some(decoding) = args.bool_decoding {
        config = config.with_bool_decoding(decoding);
    }

    tracing::debug!("Using {:?}", config);

    let path = args.command.path();
    let key = RegKey::open_with(NativeApi::instance(), path, args.root, config)
        .with_context(|| format!("opening {}\\{}", args.root, path))?;

    run(&args, &key)?;

    key.close()?;
    Ok(())
}
