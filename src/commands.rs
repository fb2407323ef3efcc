/// Command-line (`:`) commands and autocomplete

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Inventory,
  Listing,
  Refresh,
  Export,
  Publish,
  Logout,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub kind: CommandKind,
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    kind: CommandKind::Inventory,
    name: "inventory",
    aliases: &["i", "inv", "search", "home"],
    description: "Search a plate and move it",
  },
  Command {
    kind: CommandKind::Listing,
    name: "listing",
    aliases: &["l", "list", "all"],
    description: "Browse every vehicle",
  },
  Command {
    kind: CommandKind::Refresh,
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Reload data from the table",
  },
  Command {
    kind: CommandKind::Export,
    name: "export",
    aliases: &["x", "report"],
    description: "Save this session's changes as CSV",
  },
  Command {
    kind: CommandKind::Publish,
    name: "publish",
    aliases: &["p", "write"],
    description: "Write the CSV inventory with pending edits",
  },
  Command {
    kind: CommandKind::Logout,
    name: "logout",
    aliases: &["switch", "user"],
    description: "Switch operator",
  },
  Command {
    kind: CommandKind::Quit,
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit yardloc",
  },
];

/// Exact lookup by name or alias.
pub fn lookup(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| {
      let priority = if cmd.name == input_lower {
        0
      } else if cmd.aliases.contains(&input_lower.as_str()) {
        1
      } else if cmd.name.starts_with(&input_lower) {
        2
      } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
        3
      } else if cmd.name.contains(&input_lower) {
        4
      } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
        5
      } else {
        return None;
      };
      Some((cmd, priority))
    })
    .collect();

  // Stable sort keeps declaration order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
