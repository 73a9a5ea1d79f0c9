use std::sync::OnceLock;

#[macro_export]
macro_rules! warning {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).yellow());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!("{}", $expr).yellow());
    }};
}

#[macro_export]
macro_rules! error {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).red());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!("{}", $expr).red());
    }};
}

#[macro_export]
macro_rules! status {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", format!($fmt $(, $($arg)*)?).green());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", format!("{}", $expr).green());
    }};
}

#[macro_export]
macro_rules! info {
    () => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout());
    }};
    // format string literal (with or without inline formatting or args)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), $fmt $(, $($arg)*)?);
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", $expr);
    }};
}

/// dimmed diagnostics on stderr, only shown when `GOA_DEBUG` is set
#[macro_export]
macro_rules! debug {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        if $crate::ui::debug_enabled() {
            use colored::Colorize;
            use std::io::{self, Write};
            let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).dimmed());
        }
    }};
}

/// whether debug output was requested, read once per process
pub fn debug_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var_os(crate::constants::DEBUG_ENV_VAR).is_some_and(|value| !value.is_empty())
    })
}
