//! Raw-record normalization
//!
//! Archives are noisy: tool inputs can be malformed JSON, prompts embed
//! URLs and absolute paths, file paths differ per machine. Everything here
//! folds that noise into canonical keys so occurrences of the same
//! behavior aggregate together. Nothing in this module fails; unusable
//! input degrades to a sentinel or passes through untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ToolCall;

/// Command-line tools whose first subcommand is part of the behavior
/// identity (`git status` and `git push` are different workflows).
pub const SUBCOMMAND_TOOLS: &[&str] = &[
    "git",
    "docker",
    "kubectl",
    "npm",
    "yarn",
    "pip",
    "cargo",
    "go",
    "gh",
    "aws",
    "gcloud",
    "az",
    "terraform",
    "make",
    "poetry",
    "uv",
    "pnpm",
    "bun",
    "deno",
    "rustup",
    "conda",
];

/// Sentinel key for shell commands that cannot be normalized.
pub const UNKNOWN_COMMAND: &str = "unknown";

/// Tool name of the shell-execution tool.
pub const BASH_TOOL: &str = "Bash";

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/[\w\-./]+)+").expect("valid regex"));

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["'][\w\-./]+["']"#).expect("valid regex"));

static HOME_PREFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^/Users/[^/]+/",
        r"^/home/[^/]+/",
        r"^/mnt/c/Users/[^/]+/",
        r"^C:\\Users\\[^\\]+\\",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Reduce a shell tool input to a stable command key.
///
/// The input is the raw JSON text of the tool call arguments. The key is
/// the command's base word, or `{base}-{subcommand}` when the base is in
/// [`SUBCOMMAND_TOOLS`] and the second word is not a flag or a path.
/// Unparseable input, a missing or empty `command` field, and an empty
/// split all yield [`UNKNOWN_COMMAND`].
pub fn normalize_command(input_json: &str) -> String {
    let command = match serde_json::from_str::<serde_json::Value>(input_json) {
        Ok(value) => value
            .get("command")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
        Err(_) => String::new(),
    };
    if command.is_empty() {
        return UNKNOWN_COMMAND.to_string();
    }

    let words = match split_command_words(&command) {
        Some(words) => words,
        None => command.split_whitespace().map(str::to_string).collect(),
    };
    let Some(base) = words.first() else {
        return UNKNOWN_COMMAND.to_string();
    };

    if SUBCOMMAND_TOOLS.contains(&base.as_str()) {
        if let Some(sub) = words.get(1) {
            if !sub.starts_with('-') && !sub.starts_with('/') {
                return format!("{}-{}", base, sub);
            }
        }
    }
    base.clone()
}

/// Canonical name for a tool call.
///
/// Shell invocations become `Bash:{command key}` so different commands
/// count as different tools; every other tool name passes through.
pub fn normalize_tool_name(call: &ToolCall) -> String {
    if call.tool_name == BASH_TOOL {
        format!("{}:{}", BASH_TOOL, normalize_command(&call.input_json))
    } else {
        call.tool_name.clone()
    }
}

/// Canonical form of a user prompt.
///
/// Lowercases, then replaces URLs with `<url>`, absolute-path shapes with
/// `<path>`, quoted tokens with `<name>`, and collapses whitespace runs.
/// Idempotent on its own output.
pub fn normalize_prompt(text: &str) -> String {
    let lowered = text.to_lowercase();
    let replaced = URL_RE.replace_all(&lowered, "<url>");
    let replaced = PATH_RE.replace_all(&replaced, "<path>");
    let replaced = QUOTED_RE.replace_all(&replaced, "<name>");
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrite one recognized home-directory prefix to `~/`.
///
/// Prefix shapes are tried in order; the first match wins and at most one
/// rewrite is applied. Paths without a recognized prefix pass through.
pub fn normalize_file_path(path: &str) -> String {
    for re in HOME_PREFIXES.iter() {
        if re.is_match(path) {
            return re.replace(path, "~/").into_owned();
        }
    }
    path.to_string()
}

/// Split a command line into words, honoring single and double quotes.
///
/// Returns `None` on an unclosed quote; callers fall back to plain
/// whitespace splitting.
fn split_command_words(command: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in command.chars() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_word = true;
                }
                ch if ch.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                ch => {
                    current.push(ch);
                    in_word = true;
                }
            },
        }
    }

    if quote.is_some() {
        return None;
    }
    if in_word {
        words.push(current);
    }
    Some(words)
}
