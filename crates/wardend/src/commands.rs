//! Reserved chat commands routed to task executors instead of the backend.

/// A chat prompt resolved to its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/imagine <prompt>` - image executor
    Imagine(&'a str),
    /// `/code <task>` - code executor
    Code(&'a str),
    /// Anything else - firewall then backend
    Chat(&'a str),
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Imagine,
    Code,
}

const PREFIXES: &[(&str, Kind)] = &[("/imagine", Kind::Imagine), ("/code", Kind::Code)];

impl<'a> Command<'a> {
    /// Resolve a prompt by its leading word. Prefixes match case-insensitively
    /// and must be followed by whitespace or the end of input.
    pub fn parse(input: &'a str) -> Self {
        let input = input.trim();

        for (prefix, kind) in PREFIXES {
            if let Some(rest) = strip_command(input, prefix) {
                let arg = rest.trim();
                return match kind {
                    Kind::Imagine => Command::Imagine(arg),
                    Kind::Code => Command::Code(arg),
                };
            }
        }

        Command::Chat(input)
    }
}

fn strip_command<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &input[prefix.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}
