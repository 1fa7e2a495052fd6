use std::env;

use shellgram::config::Settings;
use shellgram::services::telegram;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("shellgram {} - Multi-user Telegram shell bot with jailed workspaces", VERSION);
    println!();
    println!("USAGE:");
    println!("    shellgram [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help              Print help information");
    println!("    -v, --version           Print version information");
    println!("    --token <BOT_TOKEN>     Save a bot token and start the bot");
    println!();
    println!("A bare invocation reuses the previously saved token.");
    println!("Settings live in ~/.shellgram/settings.json");
}

fn print_version() {
    println!("shellgram {}", VERSION);
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let mut token_arg: Option<String> = None;
    if args.len() > 1 {
        match args[1].as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "-v" | "--version" => {
                print_version();
                return;
            }
            "--token" => {
                if args.len() < 3 {
                    eprintln!("Error: --token requires a bot token argument");
                    eprintln!("Usage: shellgram --token <BOT_TOKEN>");
                    return;
                }
                token_arg = Some(args[2].clone());
            }
            _ => {
                eprintln!("Unknown option: {}", args[1]);
                eprintln!("Use --help for usage information");
                return;
            }
        }
    }

    let settings = Settings::load();

    let token = match token_arg {
        Some(token) => {
            telegram::remember_token(&token);
            token
        }
        None => {
            let mut stored = telegram::stored_tokens();
            if stored.len() > 1 {
                eprintln!("{} bot tokens saved, pass the one to use:", stored.len());
                eprintln!("    shellgram --token <BOT_TOKEN>");
                return;
            }
            match stored.pop() {
                Some(token) => token,
                None => {
                    eprintln!("No bot token saved. Run: shellgram --token <BOT_TOKEN>");
                    return;
                }
            }
        }
    };

    let ts = chrono::Local::now().format("%H:%M:%S");
    println!("shellgram v{}", VERSION);
    println!("  [{ts}] ✓ Starting bot (key: {})", telegram::token_hash(&token));
    telegram::run_bot(&token, settings).await;
}
