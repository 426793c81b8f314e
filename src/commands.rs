/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "home", "stats"],
    description: "Platform overview",
  },
  Command {
    name: "users",
    aliases: &["u", "user", "customers"],
    description: "Manage user accounts",
  },
  Command {
    name: "vehicles",
    aliases: &["v", "vehicle", "fleet"],
    description: "Manage the fleet",
  },
  Command {
    name: "bookings",
    aliases: &["b", "booking", "rentals"],
    description: "Browse and cancel bookings",
  },
  Command {
    name: "notifications",
    aliases: &["n", "notification", "inbox"],
    description: "Outgoing notifications",
  },
  Command {
    name: "health",
    aliases: &["h", "status"],
    description: "Backend service health",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit rentdash",
  },
];

/// Resolve typed input to a command: exact name or exact alias only.
pub fn find(input: &str) -> Option<&'static Command> {
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

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let rank = if cmd.name == input_lower {
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
      continue;
    };
    matches.push((cmd, rank));
  }

  // Stable sort keeps declaration order within a rank
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("vehicles");
    assert_eq!(suggestions[0].name, "vehicles");
  }

  #[test]
  fn test_alias_beats_prefix() {
    // "b" is an alias of bookings and no name starts with it otherwise
    let suggestions = get_suggestions("b");
    assert_eq!(suggestions[0].name, "bookings");

    // "u" is the users alias even though "quit" contains it
    let suggestions = get_suggestions("u");
    assert_eq!(suggestions[0].name, "users");
    assert!(suggestions.iter().any(|c| c.name == "quit"));
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("noti");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].name, "notifications");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("hicl");
    assert_eq!(suggestions[0].name, "vehicles");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }

  #[test]
  fn test_find() {
    assert_eq!(find("fleet").map(|c| c.name), Some("vehicles"));
    assert_eq!(find(" Users ").map(|c| c.name), Some("users"));
    assert!(find("veh").is_none());
  }
}
