// ABOUTME: Shell command analysis: quote-aware splitting into chained and piped segments.
// ABOUTME: Also detects output redirection and command substitution, which defeat prefix checks.

/// A single segment of a parsed command (one executable with its arguments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSegment {
    /// The executable name or path.
    pub executable: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Whether this segment receives piped input from the previous one.
    pub stdin_only: bool,
}

/// The result of analyzing a shell command string.
#[derive(Debug, Clone, Default)]
pub struct CommandAnalysis {
    /// All parsed command segments across pipes and chains.
    pub segments: Vec<CommandSegment>,
    /// Targets of unquoted `>` / `>>` redirections.
    pub redirect_targets: Vec<String>,
    /// Whether `$(...)` or backticks appear outside single quotes.
    pub has_substitution: bool,
}

/// Shell operators recognized outside quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    /// `&&`, `||`, `;`, `&`, or a newline: the next command starts fresh.
    Chain,
    /// `|`: the next command reads this one's output.
    Pipe,
}

/// Walks a command tracking quote state, so callers only see unquoted characters.
struct QuoteScanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    single: bool,
    double: bool,
}

impl<'a> QuoteScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            single: false,
            double: false,
        }
    }

    /// Next character and whether it is outside any quotes.
    ///
    /// Backslash escapes are returned as a quoted pair so they never read as operators.
    fn next_char(&mut self) -> Option<(char, bool)> {
        let c = self.chars.next()?;
        if self.single {
            if c == '\'' {
                self.single = false;
            }
            return Some((c, false));
        }
        if c == '\\' {
            return Some((c, false));
        }
        if self.double {
            if c == '"' {
                self.double = false;
            }
            return Some((c, false));
        }
        match c {
            '\'' => self.single = true,
            '"' => self.double = true,
            _ => return Some((c, true)),
        }
        Some((c, false))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Consume the character after a backslash without interpreting it.
    fn take_escaped(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn in_single_quotes(&self) -> bool {
        self.single
    }
}

/// Split a command on unquoted operators, keeping each piece's raw text.
fn split_operators(input: &str) -> Vec<(String, Option<Operator>)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut scanner = QuoteScanner::new(input);

    while let Some((c, unquoted)) = scanner.next_char() {
        if c == '\\' && !scanner.in_single_quotes() {
            current.push(c);
            if let Some(next) = scanner.take_escaped() {
                current.push(next);
            }
            continue;
        }
        if !unquoted {
            current.push(c);
            continue;
        }
        let op = match c {
            '&' if scanner.peek() == Some('&') => {
                scanner.take_escaped();
                Some(Operator::Chain)
            }
            // `>&2` and `&>` are redirections, not background markers.
            '&' if current.ends_with('>') || scanner.peek() == Some('>') => None,
            '&' => Some(Operator::Chain),
            '|' if scanner.peek() == Some('|') => {
                scanner.take_escaped();
                Some(Operator::Chain)
            }
            '|' => Some(Operator::Pipe),
            ';' | '\n' => Some(Operator::Chain),
            _ => None,
        };
        match op {
            Some(op) => parts.push((std::mem::take(&mut current), Some(op))),
            None => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push((current, None));
    }
    parts
}

/// Split a segment into words, falling back to whitespace splitting on unbalanced quotes.
fn split_words(text: &str) -> Vec<String> {
    shell_words::split(text)
        .unwrap_or_else(|_| text.split_whitespace().map(str::to_string).collect())
}

/// Parse a shell command string into pipeline segments.
///
/// Chained commands (`&&`, `||`, `;`) start fresh; commands after `|` are stdin-only.
pub fn parse_pipeline(command: &str) -> Vec<CommandSegment> {
    let mut segments = Vec::new();
    let mut piped = false;
    for (text, op) in split_operators(command) {
        let text = text.trim();
        let words = split_words(text);
        if let Some((executable, args)) = words.split_first() {
            segments.push(CommandSegment {
                executable: executable.clone(),
                args: args.to_vec(),
                stdin_only: piped,
            });
        }
        piped = op == Some(Operator::Pipe);
    }
    segments
}

/// Collect the targets of unquoted output redirections.
///
/// File-descriptor duplications such as `2>&1` are not reported.
pub fn redirect_targets(command: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut scanner = QuoteScanner::new(command);
    while let Some((c, unquoted)) = scanner.next_char() {
        if c == '\\' && !scanner.in_single_quotes() {
            scanner.take_escaped();
            continue;
        }
        if !(unquoted && c == '>') {
            continue;
        }
        if scanner.peek() == Some('>') {
            scanner.take_escaped();
        }
        if scanner.peek() == Some('&') {
            continue;
        }
        let mut target = String::new();
        while let Some(next) = scanner.peek() {
            if next.is_whitespace() && target.is_empty() {
                scanner.take_escaped();
                continue;
            }
            if next.is_whitespace() || matches!(next, ';' | '|' | '&' | '<' | '>') {
                break;
            }
            target.push(next);
            scanner.take_escaped();
        }
        targets.push(target.trim_matches(['"', '\'']).to_string());
    }
    targets
}

/// Whether the command uses `$(...)` or backticks outside single quotes.
pub fn has_command_substitution(command: &str) -> bool {
    let mut scanner = QuoteScanner::new(command);
    let mut previous = None;
    while let Some((c, _)) = scanner.next_char() {
        if scanner.in_single_quotes() && c != '\'' {
            previous = Some(c);
            continue;
        }
        if c == '\\' {
            scanner.take_escaped();
            previous = None;
            continue;
        }
        if c == '`' || (previous == Some('$') && c == '(') {
            return true;
        }
        previous = Some(c);
    }
    false
}

/// Analyze a shell command string.
pub fn analyze_command(command: &str) -> CommandAnalysis {
    CommandAnalysis {
        segments: parse_pipeline(command),
        redirect_targets: redirect_targets(command),
        has_substitution: has_command_substitution(command),
    }
}

/// Strip any directory from an executable path.
pub fn basename(executable: &str) -> &str {
    executable.rsplit('/').next().unwrap_or(executable)
}
