use std::{fmt::Write, io::IsTerminal, sync::LazyLock};

use clap::builder::styling::{AnsiColor, Effects, Style, Styles};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Whether stdout is an interactive terminal that can render ANSI escapes.
static IS_ANSI_TERMINAL: LazyLock<bool> =
    LazyLock::new(|| std::io::stdout().is_terminal() && std::env::var("TERM").as_deref() != Ok("dumb"));

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns a `Styles` object with the default styles for the CLI.
pub fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Green.on_default() | Effects::BOLD)
        .invalid(AnsiColor::Red.on_default() | Effects::BOLD)
}

/// Wraps `text` in `style` when `ansi` is set.
fn apply_style(text: String, style: &Style, ansi: bool) -> String {
    if !ansi {
        return text;
    }

    let mut styled = String::with_capacity(text.len() + 20); // Reserve extra space for ANSI codes
    let _ = write!(styled, "{}", style);
    styled.push_str(&text);
    let _ = write!(styled, "{}", style.render_reset());
    styled
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// A trait for applying Styles defined in [`styles`] to text.
pub trait AnsiStyles {
    /// Apply header style to text
    fn header(&self) -> String;

    /// Apply literal style to text
    fn literal(&self) -> String;

    /// Apply placeholder style to text
    fn placeholder(&self) -> String;

    /// Apply error style to text
    fn error(&self) -> String;

    /// Apply valid style to text
    fn valid(&self) -> String;
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<S> AnsiStyles for S
where
    S: AsRef<str> + ?Sized,
{
    fn header(&self) -> String {
        apply_style(self.as_ref().to_string(), styles().get_header(), *IS_ANSI_TERMINAL)
    }

    fn literal(&self) -> String {
        apply_style(self.as_ref().to_string(), styles().get_literal(), *IS_ANSI_TERMINAL)
    }

    fn placeholder(&self) -> String {
        apply_style(
            self.as_ref().to_string(),
            styles().get_placeholder(),
            *IS_ANSI_TERMINAL,
        )
    }

    fn error(&self) -> String {
        apply_style(self.as_ref().to_string(), styles().get_error(), *IS_ANSI_TERMINAL)
    }

    fn valid(&self) -> String {
        apply_style(self.as_ref().to_string(), styles().get_valid(), *IS_ANSI_TERMINAL)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
