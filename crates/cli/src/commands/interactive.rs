//! Menu-driven session

use super::list::probe_workloads;
use super::patch::{apply, confirm, select};
use super::{prompt, prompt_line, Session};
use crate::output::{print_error, print_warning, print_workloads};
use anyhow::Result;
use armshift_lib::BatchDirective;
use colored::Colorize;

/// Menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Show,
    Batch(BatchDirective),
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Show),
            "2" => Some(Self::Batch(BatchDirective::Migrate)),
            "3" => Some(Self::Batch(BatchDirective::RollbackMigrate)),
            "4" => Some(Self::Batch(BatchDirective::ArmPatch)),
            "5" => Some(Self::Batch(BatchDirective::RollbackArmPatch)),
            "6" | "q" | "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// What one line typed at the menu asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuInput {
    Choice(MenuChoice),
    /// Empty line, show the menu again
    Blank,
    Unknown(String),
    /// Input closed
    Closed,
}

impl MenuInput {
    pub fn from_line(line: Option<&str>) -> Self {
        match line.map(str::trim) {
            None => Self::Closed,
            Some("") => Self::Blank,
            Some(input) => match MenuChoice::parse(input) {
                Some(choice) => Self::Choice(choice),
                None => Self::Unknown(input.to_string()),
            },
        }
    }
}

fn print_menu(context: &str) {
    println!();
    println!("{} {}", "armshift".bold(), format!("({})", context).dimmed());
    println!("  1. Show workloads");
    println!("  2. Migrate workloads");
    println!("  3. Rollback migrated workloads");
    println!("  4. ARM patch workloads");
    println!("  5. Rollback ARM patch");
    println!("  6. Exit");
}

/// Loop over the menu until the operator exits or stdin closes
pub async fn run(session: &Session, namespace: Option<&str>) -> Result<()> {
    loop {
        print_menu(session.logger.context());
        let line = prompt_line("Select an option: ")?;
        let choice = match MenuInput::from_line(line.as_deref()) {
            MenuInput::Choice(choice) => choice,
            MenuInput::Blank => continue,
            MenuInput::Unknown(input) => {
                print_warning(&format!("Unknown option '{}'", input));
                continue;
            }
            MenuInput::Closed => return Ok(()),
        };

        let outcome = match choice {
            MenuChoice::Exit => return Ok(()),
            MenuChoice::Show => show(session, namespace).await,
            MenuChoice::Batch(directive) => batch(session, namespace, directive).await,
        };

        // A failed step reports and returns to the menu
        if let Err(e) = outcome {
            print_error(&format!("{:#}", e));
        }
    }
}

async fn show(session: &Session, namespace: Option<&str>) -> Result<()> {
    let filter = prompt("Namespace (empty for all): ")?;
    let namespace = if filter.is_empty() {
        session.namespace(namespace)
    } else {
        Some(filter.as_str())
    };
    let workloads = session.workloads(namespace).await?;

    let check = prompt("Check ARM64 image support? [y/N]: ")?;
    let outcomes = if check.eq_ignore_ascii_case("y") && !workloads.is_empty() {
        Some(probe_workloads(session, &workloads, None).await?)
    } else {
        None
    };

    print_workloads(&workloads, outcomes.as_deref(), session.format)
}

async fn batch(session: &Session, namespace: Option<&str>, directive: BatchDirective) -> Result<()> {
    let workloads = session.workloads(session.namespace(namespace)).await?;
    if workloads.is_empty() {
        print_warning("No workloads found");
        return Ok(());
    }
    print_workloads(&workloads, None, session.format)?;

    let input = prompt("Workload IDs (e.g. 0,2-4): ")?;
    let selected = select(&workloads, &input)?;
    confirm(directive, &selected)?;
    apply(session, directive, &selected).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_choice_parse() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::Show));
        assert_eq!(
            MenuChoice::parse(" 2 "),
            Some(MenuChoice::Batch(BatchDirective::Migrate))
        );
        assert_eq!(
            MenuChoice::parse("5"),
            Some(MenuChoice::Batch(BatchDirective::RollbackArmPatch))
        );
        assert_eq!(MenuChoice::parse("6"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("7"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[test]
    fn test_blank_line_does_not_leave_the_menu() {
        assert_eq!(MenuInput::from_line(Some("")), MenuInput::Blank);
        assert_eq!(MenuInput::from_line(Some("   ")), MenuInput::Blank);
        assert_eq!(MenuInput::from_line(None), MenuInput::Closed);
        assert_eq!(
            MenuInput::from_line(Some("4")),
            MenuInput::Choice(MenuChoice::Batch(BatchDirective::ArmPatch))
        );
        assert_eq!(
            MenuInput::from_line(Some("9")),
            MenuInput::Unknown("9".to_string())
        );
    }
}
