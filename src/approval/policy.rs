// ABOUTME: Safety classification for arbitrary shell commands.
// ABOUTME: Forbidden patterns first, then a read-only prefix allowlist, then sink/redirect downgrades.

use regex::RegexSet;

use super::analysis::{CommandAnalysis, CommandSegment, analyze_command, basename};
use super::types::SafetyLevel;

/// Commands that are never run, whatever the user says.
pub const FORBIDDEN_PATTERNS: &[&str] = &[
    // rm -rf / and friends, including `/*` and the home directory
    r"\brm\s+(--?[a-zA-Z-]*\s+)*(-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)\s+(--?[a-zA-Z-]*\s+)*(/\*?|~/?|\$HOME/?)(\s|;|&|\||$)",
    r"--no-preserve-root",
    r"\bmkfs(\.[a-z0-9]+)?\b",
    r"\bwipefs\b",
    r"\bdd\b[^|;&]*\bof=/dev/",
    r">\s*/dev/(sd|hd|vd|xvd|nvme|mmcblk)[a-z0-9]*",
    r"\bshred\b[^|;&]*/dev/",
    // fork bomb
    r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
    r"\bchmod\s+(-[a-zA-Z]+\s+)*[0-7]?777\s+/(\s|$)",
    r"\bchown\s+(-[a-zA-Z]+\s+)*\S+\s+/(\s|$)",
];

/// Read-only command prefixes that run without confirmation.
///
/// A segment matches when its words equal the prefix or start with it.
pub const SAFE_PREFIXES: &[&str] = &[
    "cat", "head", "tail", "less", "grep", "egrep", "zgrep", "wc", "sort", "uniq", "cut", "tr",
    "ls", "stat", "file", "du", "df", "free", "uptime", "uname", "hostname", "hostnamectl status",
    "whoami", "id", "groups", "w", "who", "last", "date", "pwd", "echo", "printf", "which",
    "nproc", "lscpu", "lsblk", "lsmem", "lsof", "lsmod", "lspci", "lsusb", "vmstat", "iostat",
    "mpstat", "ps", "pgrep", "pstree", "top -b", "ss", "netstat", "ping -c", "dig", "nslookup",
    "ip addr", "ip a", "ip route show", "ip r", "ip link show", "ip -s link", "dmesg",
    "journalctl", "systemctl status", "systemctl is-active", "systemctl is-enabled",
    "systemctl list-units", "systemctl list-timers", "docker ps", "docker images",
    "docker logs", "docker stats --no-stream", "getent", "printenv", "true", "false",
];

/// Executables that make a pipeline dangerous when they receive its output.
pub const DANGEROUS_SINKS: &[&str] = &[
    "sh", "bash", "zsh", "dash", "ksh", "fish", "sudo", "su", "doas", "rm", "dd", "tee",
    "xargs", "python", "python3", "perl", "ruby", "node", "php", "lua", "mv", "cp", "chmod",
    "chown", "kill", "crontab", "eval", "exec", "source",
];

/// Options and subcommand words that make an otherwise read-only command change state.
///
/// Long options also match as `--opt=value`; single-letter options also match
/// inside a cluster such as `-rc`. Plain words must match exactly.
pub const RISKY_ARGUMENTS: &[(&str, &[&str])] = &[
    ("ip", &["add", "append", "change", "replace", "del", "delete", "flush", "set"]),
    ("date", &["-s", "--set"]),
    ("sort", &["-o", "--output"]),
    ("file", &["-C", "--compile"]),
    ("hostname", &["-F", "--file", "-b", "--boot"]),
    ("ss", &["-K", "--kill"]),
    (
        "dmesg",
        &[
            "-c",
            "-C",
            "-n",
            "-D",
            "-E",
            "--clear",
            "--read-clear",
            "--console-level",
            "--console-off",
            "--console-on",
        ],
    ),
    (
        "journalctl",
        &[
            "--vacuum-size",
            "--vacuum-time",
            "--vacuum-files",
            "--rotate",
            "--flush",
            "--sync",
            "--relinquish-var",
            "--smart-relinquish-var",
            "--setup-keys",
            "--update-catalog",
        ],
    ),
];

/// Commands that write or reconfigure when given more operands than this.
const MAX_OPERANDS: &[(&str, usize)] = &[("hostname", 0), ("uniq", 1)];

/// Redirect targets that do not write anything meaningful.
const HARMLESS_REDIRECTS: &[&str] = &["/dev/null"];

/// Classifies `run_command` invocations.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    forbidden: RegexSet,
}

impl CommandPolicy {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            forbidden: RegexSet::new(FORBIDDEN_PATTERNS)?,
        })
    }

    /// Classify a shell command.
    ///
    /// Rules are evaluated in order; the first match wins.
    pub fn classify(&self, command: &str) -> SafetyLevel {
        let command = command.trim();
        let analysis = analyze_command(command);

        // Rule 1: destructive patterns block, regardless of anything else.
        if self.is_forbidden(command, &analysis) {
            return SafetyLevel::Forbidden;
        }

        if analysis.segments.is_empty() {
            return SafetyLevel::NeedsConfirmation;
        }

        // Rule 2: anything the prefix check cannot see through asks.
        if analysis.has_substitution || writes_somewhere(&analysis) || pipes_into_sink(&analysis) {
            return SafetyLevel::NeedsConfirmation;
        }

        // Rule 3: every chained and piped segment must be read-only.
        if analysis.segments.iter().all(is_safe_segment) {
            SafetyLevel::Safe
        } else {
            SafetyLevel::NeedsConfirmation
        }
    }
}

impl CommandPolicy {
    /// Check the raw text and each segment with its quoting removed, so
    /// `rm -rf "/"` is caught like `rm -rf /`.
    fn is_forbidden(&self, command: &str, analysis: &CommandAnalysis) -> bool {
        self.forbidden.is_match(command)
            || analysis.segments.iter().any(|seg| {
                let mut words = vec![seg.executable.as_str()];
                words.extend(seg.args.iter().map(String::as_str));
                self.forbidden.is_match(&words.join(" "))
            })
    }
}

fn writes_somewhere(analysis: &CommandAnalysis) -> bool {
    analysis
        .redirect_targets
        .iter()
        .any(|t| !HARMLESS_REDIRECTS.contains(&t.as_str()))
}

fn pipes_into_sink(analysis: &CommandAnalysis) -> bool {
    analysis
        .segments
        .iter()
        .filter(|seg| seg.stdin_only)
        .any(|seg| DANGEROUS_SINKS.contains(&basename(&seg.executable)))
}

/// Whether a segment starts with one of the read-only prefixes and passes
/// no arguments that would make it write.
pub fn is_safe_segment(segment: &CommandSegment) -> bool {
    let mut words = vec![basename(&segment.executable)];
    words.extend(segment.args.iter().map(String::as_str));
    let prefixed = SAFE_PREFIXES.iter().any(|prefix| {
        let prefix_words: Vec<&str> = prefix.split_whitespace().collect();
        words.len() >= prefix_words.len() && words[..prefix_words.len()] == prefix_words[..]
    });
    prefixed && !has_risky_arguments(segment)
}

fn has_risky_arguments(segment: &CommandSegment) -> bool {
    let name = basename(&segment.executable);
    let risky_option = RISKY_ARGUMENTS
        .iter()
        .filter(|(cmd, _)| *cmd == name)
        .flat_map(|(_, options)| options.iter())
        .any(|option| segment.args.iter().any(|arg| matches_option(arg, option)));

    let operands: Vec<&String> = segment.args.iter().filter(|arg| !arg.starts_with('-')).collect();
    // `hostnamectl set-hostname`, `timedatectl set-time` and the like.
    let sets_something = operands.first().is_some_and(|op| op.starts_with("set-"));
    let too_many_operands = MAX_OPERANDS
        .iter()
        .any(|(cmd, max)| *cmd == name && operands.len() > *max);

    risky_option || sets_something || too_many_operands
}

fn matches_option(arg: &str, option: &str) -> bool {
    if !option.starts_with('-') {
        return arg == option;
    }
    if option.starts_with("--") {
        return arg
            .strip_prefix(option)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('='));
    }
    let letter = &option[1..];
    arg.starts_with('-') && !arg.starts_with("--") && arg[1..].contains(letter)
}
