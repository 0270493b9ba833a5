//! # cairo-hold CLI
//!
//! The command-line interface for cairo-hold, which compiles only the Cairo
//! contracts whose sources or dependencies changed since their last
//! successful compile.
//!
//! ## Commands
//!
//! - **compile**: Main CI command - compiles every stale source
//! - **survey**: Lists stale sources and why, without compiling
//! - **bilge**: Removes the build cache for a fresh start
//!
//! ## Quick Start
//!
//! ```bash
//! cairo-hold compile
//! cairo-hold compile --abi --cairo-path lib,vendor -j 4
//! ```
//!
//! ## Environment Variables
//!
//! - `CAIRO_HOLD_SOURCES_DIR`: Sources directory (default: ./contracts)
//! - `CAIRO_HOLD_ARTIFACTS_DIR`: Artifacts directory (default:
//!   ./artifacts-starknet)
//! - `CAIRO_HOLD_CACHE_PATH`: Build cache file (default:
//!   ./cache/cairo-files-cache.json)
//! - `CAIRO_HOLD_COMPILER`: Compiler executable (default: starknet-compile)
//! - `CAIRO_HOLD_VERBOSE`: Enable verbose output
//! - `CAIRO_HOLD_QUIET`: Silence all output except errors
//!
//! See `cairo-hold --help` for the remaining options.

use std::io::IsTerminal;

use cairo_hold::cli::Cli;

fn main() -> miette::Result<()> {
    miette::set_panic_hook();

    // CI logs get plain reports without context lines
    let interactive = std::io::stderr().is_terminal();
    miette::set_hook(Box::new(move |_| {
        let (theme, context_lines) = if interactive {
            (miette::GraphicalTheme::unicode_nocolor(), 3)
        } else {
            (miette::GraphicalTheme::none(), 0)
        };
        Box::new(
            miette::GraphicalReportHandler::new()
                .with_theme(theme)
                .with_context_lines(context_lines),
        )
    }))?;

    let cli = Cli::parse_args();
    cairo_hold::commands::execute(&cli).map_err(Into::into)
}
