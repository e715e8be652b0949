//! `volta list`: browse the reference library.

use volta_elaborate::LibraryRegistry;

use crate::library::reference_library;
use crate::GlobalArgs;

/// One listing line per element in `module`.
pub fn listing(library: &LibraryRegistry, module: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut lines = Vec::new();
    for name in library.list_library_elements(module) {
        let def = library.get_library_element(&name)?;
        let mut line = format!("{name:<22} {}", def.description());
        if let Some(default) = library.default_of(&name) {
            line.push_str(&format!(" [abstract, default {default}]"));
        } else if def.is_abstract() {
            line.push_str(" [abstract]");
        }
        if !def.capabilities().is_empty() {
            line.push_str(&format!(" ({})", def.capabilities().join(", ")));
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Runs the `volta list` command.
pub fn run(module: Option<&str>, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let library = reference_library()?;
    let module = module.unwrap_or_default();
    let lines = listing(&library, module)?;
    if lines.is_empty() {
        if !global.quiet {
            eprintln!("warning: no library elements in module `{module}`");
        }
        return Ok(1);
    }
    for line in lines {
        println!("{line}");
    }
    Ok(0)
}
