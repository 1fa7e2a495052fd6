use std::sync::OnceLock;
use regex::Regex;

/// Glyphs that are never allowed in a command line
const DISALLOWED_CHARS: &[char] = &['✓'];

/// Executable basenames that are always refused, regardless of arguments
/// or pipeline position. Covers privileged/system binaries and interactive
/// GUI/TUI programs that would wedge a non-interactive shell.
const BANNED_COMMANDS: &[&str] = &[
    // privileged / system
    "passwd", "sudo", "su", "reboot", "shutdown", "poweroff", "halt",
    "telinit", "init", "mkfs", "dd", "systemctl", "chown", "mount",
    "umount", "iptables", "docker", "podman", "ssh", "scp", "rsync",
    "nc", "netcat", "nmap", "pkexec", "skill",
    // interactive GUI / TUI
    "nano", "vi", "vim", "less", "more", "top", "htop", "man", "mc",
    "dialog", "whiptail", "fzf", "lynx",
];

/// Non-numeric kill targets that name system processes
const SYSTEM_KILL_TARGETS: &[&str] = &["init", "systemd", "systemctl", "root"];

/// One pipeline stage: the raw text plus its shell-word tokens
struct Segment<'a> {
    raw: &'a str,
    tokens: Vec<String>,
}

/// A banned-pattern rule. Returns the rejection reason when it fires.
type RuleFn = fn(&Segment) -> Option<String>;

/// Ordered rule pipeline. Evaluation stops at the first rule that fires,
/// so more specific rules run before the broad safety net.
const RULES: &[RuleFn] = &[
    banned_basename,
    killall_family,
    kill_targets,
    xargs_kill,
    kill_keyword_net,
];

/// Whitespace-delimited unsigned integers in a raw segment
fn plain_int_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\s)(\d+)(?:\s|$)").expect("Invalid integer regex pattern"))
}

/// `-9` as a standalone word, or the SIGKILL name in any casing
fn sigkill_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:^|\s)-9(?:\s|$)|sigkill").expect("Invalid sigkill regex pattern"))
}

fn kill_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:killall|pkill|kill)\b").expect("Invalid kill-word regex pattern"))
}

fn dangerous_target_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\s)-1(?:\s|$)|(?:^|\s)1(?:\s|$)|\b(?:init|systemd|root)\b")
            .expect("Invalid kill-target regex pattern")
    })
}

/// Final path component of an executable reference, lowercased
fn basename(token: &str) -> String {
    token.rsplit('/').next().unwrap_or(token).to_lowercase()
}

/// Scan for disallowed glyphs. Returns the rejection reason if one is found.
pub fn check_disallowed_chars(line: &str) -> Option<String> {
    for &c in DISALLOWED_CHARS {
        if line.contains(c) {
            return Some(format!("Symbol not allowed: {}", c));
        }
    }
    None
}

/// Check a command line against the banned-pattern rule set.
///
/// The line is split on `|` into pipeline segments; each segment is
/// tokenized with shell-word semantics and run through the rule pipeline.
/// Anything ambiguous rejects: empty segments, unparseable quoting, and
/// every rule below resolve toward refusal.
pub fn check_banned(line: &str) -> Option<String> {
    if line.trim().is_empty() {
        return Some("Empty command".to_string());
    }

    for seg in line.split('|') {
        let seg = seg.trim();
        if seg.is_empty() {
            return Some("Empty command segment".to_string());
        }
        let Ok(tokens) = shell_words::split(seg) else {
            return Some("Can't parse command".to_string());
        };
        if tokens.is_empty() {
            return Some("No valid command".to_string());
        }

        let segment = Segment { raw: seg, tokens };
        for rule in RULES {
            if let Some(reason) = rule(&segment) {
                return Some(reason);
            }
        }
    }

    None
}

/// Run both checks; `Err` carries the rejection reason.
pub fn screen(line: &str) -> Result<(), String> {
    if let Some(reason) = check_disallowed_chars(line) {
        return Err(reason);
    }
    if let Some(reason) = check_banned(line) {
        return Err(reason);
    }
    Ok(())
}

/// Rule 1: direct banned binaries, matched on basename
fn banned_basename(seg: &Segment) -> Option<String> {
    let base = basename(&seg.tokens[0]);
    if BANNED_COMMANDS.contains(&base.as_str()) {
        return Some(format!("Command '{}' is banned", base));
    }
    None
}

/// Rule 2: killall / pkill are refused outright. They address processes
/// by name and can reach system-wide.
fn killall_family(seg: &Segment) -> Option<String> {
    let base = basename(&seg.tokens[0]);
    if base == "killall" || base == "pkill" {
        return Some(format!("Command '{}' is disallowed here (system-wide kill)", base));
    }
    None
}

/// Rule 3: `kill` with dangerous targets.
///
/// Candidate targets are collected from non-option tokens and from a
/// secondary scan of the raw text for whitespace-delimited integers
/// (covers the multi-form signal/pid syntaxes). A dash-numeric token is a
/// signal spec except for the broadcast forms `-1`/`-0`, which always count
/// as targets. Any target ≤ 1 hits process groups or every process the
/// user can signal; named system processes are refused as well. SIGKILL
/// with no concrete pid ≥ 2 is refused as having no safe target.
fn kill_targets(seg: &Segment) -> Option<String> {
    if basename(&seg.tokens[0]) != "kill" {
        return None;
    }

    let mut candidates: Vec<String> = Vec::new();
    let mut i = 1;
    while i < seg.tokens.len() {
        let t = &seg.tokens[i];
        if let Some(stripped) = t.strip_prefix('-') {
            if t == "-s" || t == "--signal" {
                // consume the following signal name
                i += 1;
            } else if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
                let v: i64 = stripped.parse().unwrap_or(0);
                if v <= 1 {
                    // -1 / -0 broadcast to process groups, never a signal choice
                    candidates.push(t.clone());
                }
            }
            // any other option is ignored
        } else {
            candidates.push(t.clone());
        }
        i += 1;
    }
    for cap in plain_int_regex().captures_iter(seg.raw) {
        candidates.push(cap[1].to_string());
    }

    let mut safe_pid = false;
    for target in &candidates {
        if let Ok(v) = target.parse::<i64>() {
            if v <= 1 {
                return Some(format!(
                    "Blocked dangerous kill target '{}' (would affect system processes)",
                    target
                ));
            }
            safe_pid = true;
        } else if SYSTEM_KILL_TARGETS.contains(&target.to_lowercase().as_str()) {
            return Some(format!(
                "Blocked dangerous kill target '{}' (system process)",
                target
            ));
        }
    }

    if sigkill_regex().is_match(seg.raw) && !safe_pid {
        return Some("SIGKILL without a safe target pid is blocked".to_string());
    }

    None
}

/// Rule 4: `xargs kill` turns arbitrary piped input into mass termination
fn xargs_kill(seg: &Segment) -> Option<String> {
    if basename(&seg.tokens[0]) != "xargs" {
        return None;
    }
    if let Some(first_arg) = seg.tokens.get(1) {
        if basename(first_arg) == "kill" {
            return Some("Use of xargs to call kill is blocked (could be system-wide)".to_string());
        }
    }
    None
}

/// Rule 5: broad safety net. A kill-family word together with `-1`, a
/// standalone `1`, or a system-process name anywhere in the segment.
/// Known over-broad: a segment that merely mentions e.g. "kill" and "root"
/// in unrelated text is refused too. Not a bug to tighten silently.
fn kill_keyword_net(seg: &Segment) -> Option<String> {
    if kill_word_regex().is_match(seg.raw) && dangerous_target_regex().is_match(seg.raw) {
        return Some("Potentially dangerous kill pattern blocked".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_banned_names() {
        for cmd in ["sudo ls", "ssh host", "docker ps", "vim file.txt", "/usr/bin/sudo id"] {
            assert!(check_banned(cmd).is_some(), "{} should be rejected", cmd);
        }
    }

    #[test]
    fn test_banned_anywhere_in_pipeline() {
        assert!(check_banned("echo hi | sudo tee /etc/hosts").is_some());
        assert!(check_banned("cat file | ssh host 'cat'").is_some());
    }

    #[test]
    fn test_case_insensitive_basename() {
        assert!(check_banned("SUDO ls").is_some());
        assert!(check_banned("Docker ps").is_some());
    }

    #[test]
    fn test_plain_commands_pass() {
        for cmd in ["ls -la", "echo hello", "git status", "grep -r foo .", "python3 x.py"] {
            assert!(check_banned(cmd).is_none(), "{} should be accepted", cmd);
        }
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert_eq!(check_banned("").as_deref(), Some("Empty command"));
        assert_eq!(check_banned("   ").as_deref(), Some("Empty command"));
        assert_eq!(check_banned("ls | | wc").as_deref(), Some("Empty command segment"));
        assert_eq!(check_banned("ls |").as_deref(), Some("Empty command segment"));
    }

    #[test]
    fn test_unparseable_quoting_rejected() {
        assert_eq!(check_banned("echo \"unterminated").as_deref(), Some("Can't parse command"));
    }

    #[test]
    fn test_killall_and_pkill_always_rejected() {
        assert!(check_banned("killall anything").is_some());
        assert!(check_banned("pkill foo").is_some());
        assert!(check_banned("ls | pkill -f server").is_some());
    }

    #[test]
    fn test_kill_safe_pid_accepted() {
        assert!(check_banned("kill 5000").is_none());
        assert!(check_banned("kill -9 5000").is_none());
        assert!(check_banned("kill -s SIGKILL 4000").is_none());
        assert!(check_banned("kill -15 1234").is_none());
    }

    #[test]
    fn test_kill_dangerous_pids_rejected() {
        assert!(check_banned("kill 1").is_some());
        assert!(check_banned("kill 0").is_some());
        assert!(check_banned("kill -1").is_some());
        assert!(check_banned("kill -9 -1").is_some());
        assert!(check_banned("kill -s SIGKILL 1").is_some());
    }

    #[test]
    fn test_kill_named_system_targets_rejected() {
        assert!(check_banned("kill systemd").is_some());
        assert!(check_banned("kill Init").is_some());
    }

    #[test]
    fn test_sigkill_without_safe_pid_rejected() {
        assert!(check_banned("kill -9").is_some());
        assert!(check_banned("kill -s SIGKILL").is_some());
    }

    #[test]
    fn test_xargs_kill_rejected() {
        assert!(check_banned("echo x | xargs kill").is_some());
        assert!(check_banned("echo x | xargs /bin/kill -9").is_some());
    }

    #[test]
    fn test_xargs_other_commands_accepted() {
        assert!(check_banned("echo x | xargs ls").is_none());
        assert!(check_banned("find . -name '*.log' | xargs wc -l").is_none());
    }

    #[test]
    fn test_keyword_net_overblocks_by_design() {
        // benign mention of a kill word next to a system name still rejects
        assert!(check_banned("echo kill root").is_some());
        assert!(check_banned("grep kill notes.txt").is_none());
    }

    #[test]
    fn test_disallowed_chars() {
        assert!(check_disallowed_chars("echo ✓ done").is_some());
        assert!(check_disallowed_chars("echo done").is_none());
    }

    #[test]
    fn test_screen_combines_checks() {
        assert!(screen("ls -la").is_ok());
        assert!(screen("echo ✓").is_err());
        assert!(screen("sudo id").is_err());
    }
}
