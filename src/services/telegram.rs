use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use sha2::{Digest, Sha256};

use crate::config::Settings;
use crate::services::exec::{self, ExecRequest};
use crate::services::safety;
use crate::services::workspace::{ChangeDir, Workspace};
use crate::utils::format::chunk_str;

/// Global debug log flag for Telegram API calls
static TG_DEBUG: AtomicBool = AtomicBool::new(false);

/// Log Telegram API call result to ~/.shellgram/debug/ file
fn tg_debug<T, E: std::fmt::Display>(name: &str, result: &Result<T, E>) {
    if !TG_DEBUG.load(Ordering::Relaxed) {
        return;
    }
    let Some(debug_dir) = Settings::config_dir().map(|d| d.join("debug")) else {
        return;
    };
    let _ = fs::create_dir_all(&debug_dir);
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let log_path = debug_dir.join(format!("{}.log", date));
    let ts = chrono::Local::now().format("%H:%M:%S%.3f");
    let status = match result {
        Ok(_) => "✓".to_string(),
        Err(e) => format!("✗ {e}"),
    };
    let line = format!("[{ts}] {name}: {status}\n");
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
}

/// Wrap a Telegram API call to log its result in debug mode
macro_rules! tg {
    ($name:expr, $fut:expr) => {{
        let r = $fut;
        tg_debug($name, &r);
        r
    }};
}

/// Telegram message length limit
const TELEGRAM_MSG_LIMIT: usize = 4096;

/// Payload size of one output chunk; the <pre> wrapper and HTML escaping
/// consume the headroom up to the message limit
const CHUNK: usize = 3800;

/// Per-bot settings persisted to disk
#[derive(Clone)]
struct BotSettings {
    /// User IDs allowed to talk to the bot; empty = public, every user
    /// gets an isolated workspace
    allowed_users: Vec<u64>,
    /// Debug logging toggle
    debug: bool,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            allowed_users: Vec::new(),
            debug: false,
        }
    }
}

/// Shared state: per-chat API pacing plus the resolved runtime options
struct SharedData {
    settings: BotSettings,
    /// Per-chat timestamp of the last Telegram API call (for rate limiting)
    api_timestamps: HashMap<ChatId, tokio::time::Instant>,
    /// Minimum gap between Telegram API calls in milliseconds
    polling_time_ms: u64,
    /// Timeout for a single shell command
    command_timeout_secs: u64,
    /// Base directory holding the per-user workspaces
    session_base: PathBuf,
}

type SharedState = Arc<Mutex<SharedData>>;

/// Compute a short hash key from the bot token (first 16 chars of SHA-256 hex)
pub fn token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8]) // 16 hex chars
}

/// Path to bot settings file: ~/.shellgram/bot_settings.json
fn bot_settings_path() -> Option<PathBuf> {
    Settings::config_dir().map(|d| d.join("bot_settings.json"))
}

/// Load bot settings from bot_settings.json
fn load_bot_settings(token: &str) -> BotSettings {
    let Some(path) = bot_settings_path() else {
        return BotSettings::default();
    };
    let Ok(content) = fs::read_to_string(&path) else {
        return BotSettings::default();
    };
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) else {
        return BotSettings::default();
    };
    let key = token_hash(token);
    let Some(entry) = json.get(&key) else {
        return BotSettings::default();
    };
    let allowed_users: Vec<u64> = entry
        .get("allowed_users")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_u64()).collect())
        .unwrap_or_default();
    let debug = entry.get("debug").and_then(|v| v.as_bool()).unwrap_or(false);

    BotSettings { allowed_users, debug }
}

/// Save bot settings to bot_settings.json
fn save_bot_settings(token: &str, settings: &BotSettings) {
    let Some(path) = bot_settings_path() else { return };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    // Load existing JSON or start fresh
    let mut json: serde_json::Value = if let Ok(content) = fs::read_to_string(&path) {
        serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };
    let key = token_hash(token);
    json[key] = serde_json::json!({
        "token": token,
        "allowed_users": settings.allowed_users,
        "debug": settings.debug,
    });
    if let Ok(s) = serde_json::to_string_pretty(&json) {
        let tmp_path = path.with_extension("json.tmp");
        if fs::write(&tmp_path, &s).is_ok() {
            let _ = fs::rename(&tmp_path, &path);
        }
    }
}

/// Persist a token so a bare `shellgram` invocation can reuse it
pub fn remember_token(token: &str) {
    let settings = load_bot_settings(token);
    save_bot_settings(token, &settings);
}

/// All tokens stored in bot_settings.json
pub fn stored_tokens() -> Vec<String> {
    let Some(path) = bot_settings_path() else {
        return Vec::new();
    };
    let Ok(content) = fs::read_to_string(&path) else {
        return Vec::new();
    };
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) else {
        return Vec::new();
    };
    let Some(obj) = json.as_object() else {
        return Vec::new();
    };
    obj.values()
        .filter_map(|entry| entry.get("token").and_then(|v| v.as_str()))
        .map(String::from)
        .collect()
}

/// Entry point: start the Telegram bot with long polling
pub async fn run_bot(token: &str, app_settings: Settings) {
    let bot = Bot::new(token);
    let bot_settings = load_bot_settings(token);

    if bot_settings.debug {
        TG_DEBUG.store(true, Ordering::Relaxed);
    }

    // Register bot commands for autocomplete
    let commands = vec![
        teloxide::types::BotCommand::new("start", "Show welcome message"),
        teloxide::types::BotCommand::new("help", "Show help"),
        teloxide::types::BotCommand::new("session", "Show your workspace folder"),
        teloxide::types::BotCommand::new("ghlogin", "Log in to GitHub CLI with a token"),
        teloxide::types::BotCommand::new("down", "Download a file from your workspace"),
        teloxide::types::BotCommand::new("debug", "Toggle debug logging"),
    ];
    if let Err(e) = tg!("set_my_commands", bot.set_my_commands(commands).await) {
        println!("  ⚠ Failed to set bot commands: {e}");
    }

    let session_base = app_settings.session_base_dir();
    if let Err(e) = fs::create_dir_all(&session_base) {
        eprintln!("  ✗ Cannot create session base {}: {e}", session_base.display());
        return;
    }

    match bot_settings.allowed_users.len() {
        0 => println!("  ⚠ Public mode — every user gets an isolated workspace"),
        n => println!("  ✓ Restricted mode — {n} allowed user(s)"),
    }
    println!("  ✓ Session base: {}", session_base.display());

    let state: SharedState = Arc::new(Mutex::new(SharedData {
        settings: bot_settings,
        api_timestamps: HashMap::new(),
        polling_time_ms: app_settings.telegram_polling_time.max(2500),
        command_timeout_secs: app_settings.command_timeout_secs,
        session_base,
    }));

    println!("  ✓ Bot connected — Listening for messages");

    let shared_state = state.clone();
    let token_owned = token.to_string();
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let state = shared_state.clone();
        let token = token_owned.clone();
        async move { handle_message(bot, msg, state, &token).await }
    })
    .await;
}

/// Route incoming messages to appropriate handlers
async fn handle_message(
    bot: Bot,
    msg: Message,
    state: SharedState,
    token: &str,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let user_name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.as_str())
        .unwrap_or("unknown");
    let timestamp = chrono::Local::now().format("%H:%M:%S");

    // No user info (e.g. channel post) → ignore
    let Some(uid) = msg.from.as_ref().map(|u| u.id.0) else {
        return Ok(());
    };

    // Authorization: a non-empty allowed list restricts the bot
    let authorized = {
        let data = state.lock().await;
        data.settings.allowed_users.is_empty() || data.settings.allowed_users.contains(&uid)
    };
    if !authorized {
        println!("  [{timestamp}] ✗ Rejected: {user_name} (id:{uid})");
        shared_rate_limit_wait(&state, chat_id).await;
        tg!("send_message", bot.send_message(chat_id, "Unauthorized access.").await)?;
        return Ok(());
    }

    let workspace = {
        let data = state.lock().await;
        Workspace::open(&data.session_base, uid)
    };
    let workspace = match workspace {
        Ok(ws) => ws,
        Err(e) => {
            println!("  [{timestamp}] ✗ Workspace error for id:{uid}: {e}");
            shared_rate_limit_wait(&state, chat_id).await;
            tg!(
                "send_message",
                bot.send_message(chat_id, format!("Error: failed to open workspace: {e}")).await
            )?;
            return Ok(());
        }
    };

    // Handle file/photo uploads into the workspace
    if msg.document().is_some() || msg.photo().is_some() {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] Upload");
        handle_file_upload(&bot, chat_id, &msg, &workspace, &state).await?;
        return Ok(());
    }

    let Some(raw_text) = msg.text() else {
        return Ok(());
    };
    let text = strip_bot_suffix(raw_text.trim());
    if text.is_empty() {
        return Ok(());
    }

    if text.starts_with("/start") {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] /start");
        handle_start_command(&bot, chat_id, user_name, &state).await?;
    } else if text.starts_with("/help") {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] /help");
        handle_help_command(&bot, chat_id, &state).await?;
    } else if text.starts_with("/session") {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] /session");
        handle_session_command(&bot, chat_id, &workspace, &state).await?;
    } else if text.starts_with("/ghlogin") {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] /ghlogin");
        handle_ghlogin_command(&bot, chat_id, &text, &workspace, &state).await?;
    } else if text.starts_with("/down") {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] /down");
        handle_down_command(&bot, chat_id, &text, &workspace, &state).await?;
    } else if text.starts_with("/debug") {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] /debug");
        handle_debug_command(&bot, chat_id, &state, token).await?;
    } else if text.starts_with('/') {
        shared_rate_limit_wait(&state, chat_id).await;
        tg!("send_message", bot.send_message(chat_id, "Unknown command. Use /help.").await)?;
    } else if text == "cd" || text.starts_with("cd ") {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] {text}");
        handle_cd_command(&bot, chat_id, &text, &workspace, &state).await?;
    } else {
        println!("  [{timestamp}] ◀ [{user_name}({uid})] {text}");
        handle_shell_command(&bot, chat_id, &text, &workspace, &state).await?;
    }

    Ok(())
}

/// Strip @botname suffix from commands (e.g. "/session@mybot" → "/session")
fn strip_bot_suffix(raw_text: &str) -> String {
    if !raw_text.starts_with('/') {
        return raw_text.to_string();
    }
    match raw_text.find(' ') {
        Some(space_pos) => {
            let cmd_part = &raw_text[..space_pos];
            let args_part = &raw_text[space_pos..];
            match cmd_part.find('@') {
                Some(at_pos) => format!("{}{}", &cmd_part[..at_pos], args_part),
                None => raw_text.to_string(),
            }
        }
        None => match raw_text.find('@') {
            Some(at_pos) => raw_text[..at_pos].to_string(),
            None => raw_text.to_string(),
        },
    }
}

/// Handle /start command
async fn handle_start_command(
    bot: &Bot,
    chat_id: ChatId,
    user_name: &str,
    state: &SharedState,
) -> ResponseResult<()> {
    let msg = format!(
        "Hello {}!\n\n\
         This bot runs shell commands on the server. Each user works in an \
         isolated workspace.\n\
         Send any command to run it, `cd <dir>` to navigate, /help for more.",
        user_name
    );
    shared_rate_limit_wait(state, chat_id).await;
    tg!("send_message", bot.send_message(chat_id, msg).await)?;
    Ok(())
}

/// Handle /help command
async fn handle_help_command(
    bot: &Bot,
    chat_id: ChatId,
    state: &SharedState,
) -> ResponseResult<()> {
    let help = "\
<b>shellgram</b>
Run shell commands in your own jailed workspace.

<b>Shell</b>
Any message is executed as a command in your workspace.
<code>cd &lt;dir&gt;</code> — Change directory (stays inside the workspace)
<code>cd</code> — Back to the workspace root

<b>Session</b>
<code>/session</code> — Show your workspace folder

<b>Files</b>
Send a file/photo — Upload into your current directory
<code>/down &lt;path&gt;</code> — Download a file from your workspace

<b>GitHub CLI</b>
<code>/ghlogin &lt;TOKEN&gt;</code> — Log in with a personal access token
Credentials are stored inside your workspace only.

<b>Settings</b>
<code>/debug</code> — Toggle debug logging

<code>/help</code> — Show this help";

    shared_rate_limit_wait(state, chat_id).await;
    tg!(
        "send_message",
        bot.send_message(chat_id, help).parse_mode(ParseMode::Html).await
    )?;
    Ok(())
}

/// Handle /session command - show the user's workspace folder
async fn handle_session_command(
    bot: &Bot,
    chat_id: ChatId,
    workspace: &Workspace,
    state: &SharedState,
) -> ResponseResult<()> {
    let msg = format!(
        "Your session folder: <code>{}</code>",
        html_escape(&workspace.root().display().to_string())
    );
    shared_rate_limit_wait(state, chat_id).await;
    tg!(
        "send_message",
        bot.send_message(chat_id, msg).parse_mode(ParseMode::Html).await
    )?;
    Ok(())
}

/// Handle /ghlogin <token> - non-interactive GitHub CLI login with
/// per-user credential isolation
async fn handle_ghlogin_command(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    workspace: &Workspace,
    state: &SharedState,
) -> ResponseResult<()> {
    let token = text.strip_prefix("/ghlogin").unwrap_or("").trim();

    if token.is_empty() {
        shared_rate_limit_wait(state, chat_id).await;
        tg!(
            "send_message",
            bot.send_message(chat_id, "Usage: /ghlogin YOUR_PERSONAL_ACCESS_TOKEN").await
        )?;
        return Ok(());
    }
    if !token.starts_with("gh") && !token.starts_with("github_pat_") {
        shared_rate_limit_wait(state, chat_id).await;
        tg!("send_message", bot.send_message(chat_id, "Invalid token format.").await)?;
        return Ok(());
    }

    let timeout_secs = {
        let data = state.lock().await;
        data.command_timeout_secs
    };
    let reply = match workspace.gh_env() {
        Ok(envs) => {
            let req = ExecRequest {
                command: "gh auth login --with-token",
                working_dir: workspace.root(),
                envs: &envs,
                stdin: Some(token),
                timeout_secs,
            };
            match exec::run_command(req).await {
                Ok(output) => {
                    let combined = output.combined();
                    if combined.is_empty() {
                        "Logged in successfully (no output from GH CLI)".to_string()
                    } else {
                        combined
                    }
                }
                Err(e) => format!("Error logging in: {e}"),
            }
        }
        Err(e) => format!("Error logging in: {e}"),
    };

    shared_rate_limit_wait(state, chat_id).await;
    tg!("send_message", bot.send_message(chat_id, reply).await)?;
    Ok(())
}

/// Handle /down <path> - send a file from inside the workspace
async fn handle_down_command(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    workspace: &Workspace,
    state: &SharedState,
) -> ResponseResult<()> {
    let file_path = text.strip_prefix("/down").unwrap_or("").trim();

    if file_path.is_empty() {
        shared_rate_limit_wait(state, chat_id).await;
        tg!(
            "send_message",
            bot.send_message(chat_id, "Usage: /down <path>\nExample: /down build/out.txt").await
        )?;
        return Ok(());
    }

    let resolved = if Path::new(file_path).is_absolute() {
        PathBuf::from(file_path)
    } else {
        workspace.current_dir().join(file_path)
    };

    if !workspace.contains(&resolved) {
        shared_rate_limit_wait(state, chat_id).await;
        tg!(
            "send_message",
            bot.send_message(chat_id, "File not found in your workspace.").await
        )?;
        return Ok(());
    }
    if !resolved.is_file() {
        shared_rate_limit_wait(state, chat_id).await;
        tg!(
            "send_message",
            bot.send_message(chat_id, format!("Not a file: {}", workspace.display_name(&resolved))).await
        )?;
        return Ok(());
    }

    shared_rate_limit_wait(state, chat_id).await;
    tg!(
        "send_document",
        bot.send_document(chat_id, teloxide::types::InputFile::file(&resolved)).await
    )?;
    Ok(())
}

/// Handle file/photo upload - save into the user's current directory
async fn handle_file_upload(
    bot: &Bot,
    chat_id: ChatId,
    msg: &Message,
    workspace: &Workspace,
    state: &SharedState,
) -> ResponseResult<()> {
    let (file_id, file_name) = if let Some(doc) = msg.document() {
        let name = doc.file_name.clone().unwrap_or_else(|| "uploaded_file".to_string());
        (doc.file.id.clone(), name)
    } else if let Some(photos) = msg.photo() {
        // largest rendition
        match photos.last() {
            Some(photo) => {
                let name = format!("photo_{}.jpg", photo.file.unique_id);
                (photo.file.id.clone(), name)
            }
            None => return Ok(()),
        }
    } else {
        return Ok(());
    };

    // Download file from Telegram via HTTP
    shared_rate_limit_wait(state, chat_id).await;
    let file = tg!("get_file", bot.get_file(&file_id).await)?;
    let url = format!("https://api.telegram.org/file/bot{}/{}", bot.token(), file.path);
    let buf = match reqwest::get(&url).await {
        Ok(resp) => match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                shared_rate_limit_wait(state, chat_id).await;
                tg!("send_message", bot.send_message(chat_id, format!("Download failed: {e}")).await)?;
                return Ok(());
            }
        },
        Err(e) => {
            shared_rate_limit_wait(state, chat_id).await;
            tg!("send_message", bot.send_message(chat_id, format!("Download failed: {e}")).await)?;
            return Ok(());
        }
    };

    // Sanitize file_name to prevent path traversal out of the jail
    let safe_name = Path::new(&file_name)
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("uploaded_file"));
    let dest = workspace.current_dir().join(safe_name);
    let file_size = buf.len();
    let reply = match fs::write(&dest, &buf) {
        Ok(_) => format!("Saved: {} ({} bytes)", workspace.display_name(&dest), file_size),
        Err(e) => format!("Failed to save file: {e}"),
    };
    shared_rate_limit_wait(state, chat_id).await;
    tg!("send_message", bot.send_message(chat_id, reply).await)?;
    Ok(())
}

/// Handle the `cd` special case through the workspace resolver
async fn handle_cd_command(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    workspace: &Workspace,
    state: &SharedState,
) -> ResponseResult<()> {
    let target = text.strip_prefix("cd").unwrap_or("").trim();

    let reply = match workspace.change_dir(target) {
        Ok(ChangeDir::Changed { display, .. }) => {
            format!("Changed directory to <code>{}</code>", html_escape(&display))
        }
        Ok(ChangeDir::NotFound) => "Directory not found.".to_string(),
        Err(e) => format!("Error: {e}"),
    };

    shared_rate_limit_wait(state, chat_id).await;
    tg!(
        "send_message",
        bot.send_message(chat_id, reply).parse_mode(ParseMode::Html).await
    )?;
    Ok(())
}

/// Handle free text - safety filter, then execute in the jailed workspace
async fn handle_shell_command(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    workspace: &Workspace,
    state: &SharedState,
) -> ResponseResult<()> {
    // Interactive gh login would hang the launcher; point at /ghlogin
    let lowered = text.to_lowercase();
    if lowered.starts_with("gh auth login") && !text.contains("--with-token") {
        shared_rate_limit_wait(state, chat_id).await;
        tg!(
            "send_message",
            bot.send_message(
                chat_id,
                "Interactive `gh auth login` is not allowed. Use /ghlogin YOUR_TOKEN instead.",
            )
            .await
        )?;
        return Ok(());
    }

    // Safety checks: a rejected command never reaches the launcher
    if let Err(reason) = safety::screen(text) {
        shared_rate_limit_wait(state, chat_id).await;
        tg!("send_message", bot.send_message(chat_id, format!("Not allowed: {reason}")).await)?;
        return Ok(());
    }

    let timeout_secs = {
        let data = state.lock().await;
        data.command_timeout_secs
    };
    let cwd = workspace.current_dir();
    let envs = workspace.gh_env().unwrap_or_default();

    let output = match exec::run_command(ExecRequest {
        command: text,
        working_dir: &cwd,
        envs: &envs,
        stdin: None,
        timeout_secs,
    })
    .await
    {
        Ok(output) => {
            let combined = output.combined();
            if combined.is_empty() {
                "(no output)".to_string()
            } else {
                combined
            }
        }
        Err(e) => e.to_string(),
    };

    send_output(bot, chat_id, &output, state).await?;

    let ts = chrono::Local::now().format("%H:%M:%S");
    println!("  [{ts}] ▶ Command completed: {text}");
    Ok(())
}

/// Handle /debug command - toggle API debug logging
async fn handle_debug_command(
    bot: &Bot,
    chat_id: ChatId,
    state: &SharedState,
    token: &str,
) -> ResponseResult<()> {
    let prev = TG_DEBUG.load(Ordering::Relaxed);
    let next = !prev;
    TG_DEBUG.store(next, Ordering::Relaxed);
    {
        let mut data = state.lock().await;
        data.settings.debug = next;
        save_bot_settings(token, &data.settings);
    }
    let status = if next { "ON" } else { "OFF" };
    shared_rate_limit_wait(state, chat_id).await;
    tg!("send_message", bot.send_message(chat_id, format!("Debug logging: {status}")).await)?;
    Ok(())
}

/// Enforce a minimum gap between Telegram API calls per chat.
/// Reserves the next send slot under the lock, then sleeps outside it.
async fn shared_rate_limit_wait(state: &SharedState, chat_id: ChatId) {
    let sleep_until = {
        let mut data = state.lock().await;
        let min_gap = tokio::time::Duration::from_millis(data.polling_time_ms);
        let last = data
            .api_timestamps
            .entry(chat_id)
            .or_insert_with(|| tokio::time::Instant::now() - tokio::time::Duration::from_secs(10));
        let earliest_next = *last + min_gap;
        let now = tokio::time::Instant::now();
        let target = if earliest_next > now { earliest_next } else { now };
        *last = target; // Reserve this slot
        target
    }; // Mutex released here
    tokio::time::sleep_until(sleep_until).await;
}

/// Relay captured output, chunked under the Telegram message limit.
/// Chunks are cut on the raw text so their concatenation reproduces the
/// output exactly; HTML escaping and the <pre> wrapper are per-message.
async fn send_output(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    state: &SharedState,
) -> ResponseResult<()> {
    for chunk in chunk_str(text, CHUNK) {
        let wrapped = format!("<pre>{}</pre>", html_escape(chunk));
        shared_rate_limit_wait(state, chat_id).await;
        if wrapped.len() <= TELEGRAM_MSG_LIMIT {
            if tg!(
                "send_message",
                bot.send_message(chat_id, &wrapped).parse_mode(ParseMode::Html).await
            )
            .is_ok()
            {
                continue;
            }
        }
        // escaping pushed the message over the limit, or HTML send failed:
        // fall back to plain text for this chunk
        shared_rate_limit_wait(state, chat_id).await;
        tg!("send_message", bot.send_message(chat_id, chunk).await)?;
    }
    Ok(())
}

/// Escape special HTML characters for Telegram HTML parse mode
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
