//! Command parsing, registry, and built-in console commands.

pub mod swap;

use std::collections::HashMap;

/// Context passed to a command handler.
pub struct CommandContext {
    /// Name of the player (or `CONSOLE`) executing the command.
    pub sender_name: String,
    /// Arguments after the command name.
    pub args: Vec<String>,
}

/// Result returned by a command handler.
pub struct CommandResult {
    /// Whether the command executed successfully.
    pub success: bool,
    /// Messages to send back to the command sender.
    pub messages: Vec<String>,
    /// If true, the host should shut down.
    pub should_stop: bool,
}

impl CommandResult {
    /// Create a successful result with a single message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            messages: vec![message.into()],
            should_stop: false,
        }
    }

    /// Create a failed result with a single message.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![message.into()],
            should_stop: false,
        }
    }
}

/// Function pointer type for command handlers.
pub type CommandFn = fn(&CommandContext) -> CommandResult;

/// A registered command.
pub struct CommandEntry {
    pub name: String,
    pub description: String,
    pub handler: CommandFn,
}

/// Registry of available console commands.
pub struct CommandRegistry {
    commands: HashMap<String, CommandEntry>,
}

impl CommandRegistry {
    /// Create a new registry with the 3 built-in commands.
    pub fn new() -> Self {
        let mut registry = Self {
            commands: HashMap::new(),
        };
        registry.register("help", "List available commands", cmd_help);
        registry.register("list", "Show online players", cmd_list);
        registry.register("stop", "Stop the host", cmd_stop);
        registry
    }

    /// Register a command for help output only (no-op handler).
    /// Used for commands the host handles directly against its world state.
    pub fn register_stub(&mut self, name: &str, description: &str) {
        self.register(name, description, |_| {
            CommandResult::err("This command is handled internally.")
        });
    }

    fn register(&mut self, name: &str, description: &str, handler: CommandFn) {
        self.commands.insert(
            name.to_string(),
            CommandEntry {
                name: name.to_string(),
                description: description.to_string(),
                handler,
            },
        );
    }

    /// Execute a command by name.
    pub fn execute(&self, name: &str, ctx: &CommandContext) -> CommandResult {
        match self.commands.get(name) {
            Some(entry) => (entry.handler)(ctx),
            None => CommandResult::err(format!(
                "Unknown command: {name}. Type help for a list of commands."
            )),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// `name:description` pairs sorted by name, in the form `help` expects.
    pub fn help_args(&self) -> Vec<String> {
        let mut entries: Vec<&CommandEntry> = self.commands.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
            .into_iter()
            .map(|e| format!("{}:{}", e.name, e.description))
            .collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a raw command line into a lowercase command name and its arguments.
///
/// A leading `/` is ignored. Returns `None` for a blank line.
pub fn split_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut parts = line.split_whitespace();
    let name = parts.next()?.to_lowercase();
    Some((name, parts.map(String::from).collect()))
}

// ---------------------------------------------------------------------------
// Built-in commands
// ---------------------------------------------------------------------------

fn cmd_help(ctx: &CommandContext) -> CommandResult {
    // The help command receives the command list via args as "name:description" pairs.
    let mut lines = vec!["Available commands:".to_string()];
    for arg in &ctx.args {
        if let Some((name, desc)) = arg.split_once(':') {
            lines.push(format!("  {name} - {desc}"));
        }
    }
    CommandResult {
        success: true,
        messages: lines,
        should_stop: false,
    }
}

fn cmd_list(ctx: &CommandContext) -> CommandResult {
    // args contains the list of online player names (injected by the host).
    let count = ctx.args.len();
    let names = if ctx.args.is_empty() {
        String::new()
    } else {
        format!(": {}", ctx.args.join(", "))
    };
    CommandResult::ok(format!(
        "There {verb} {count} player{s} online{names}",
        verb = if count == 1 { "is" } else { "are" },
        s = if count == 1 { "" } else { "s" },
    ))
}

fn cmd_stop(_ctx: &CommandContext) -> CommandResult {
    CommandResult {
        success: true,
        messages: vec!["Stopping the host...".to_string()],
        should_stop: true,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
