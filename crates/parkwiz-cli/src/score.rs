//! `parkwiz score` — password strength meter.

use anyhow::Result;
use clap::Args;

use parkwiz_validation::{report, StrengthReport, MIN_LENGTH_FOR_POINT};

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Password to score. Never logged.
    pub password: String,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run_score(args: &ScoreArgs) -> Result<u8> {
    let report = report(&args.password);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }
    Ok(0)
}

/// Checklist text, one criterion per line, strength last.
pub fn render(report: &StrengthReport) -> String {
    let mark = |met: bool| if met { "[x]" } else { "[ ]" };
    let min_length = format!("at least {MIN_LENGTH_FOR_POINT} characters");
    let mut out = String::new();
    for (met, label) in [
        (report.has_min_length, min_length.as_str()),
        (report.has_uppercase, "an uppercase letter"),
        (report.has_lowercase, "a lowercase letter"),
        (report.has_digit, "a digit"),
        (report.has_symbol, "a symbol"),
    ] {
        out.push_str(&format!("{} {label}\n", mark(met)));
    }
    out.push_str(&format!(
        "strength: {} ({}/5)\n",
        report.level,
        report.points()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_checklist() {
        let text = render(&report("abc"));
        assert!(text.contains("[ ] at least 8 characters"));
        assert!(text.contains("[x] a lowercase letter"));
        assert!(text.ends_with("strength: weak (1/5)\n"));
    }

    #[test]
    fn render_very_strong() {
        let text = render(&report("Abcdefg1!"));
        assert!(!text.contains("[ ]"));
        assert!(text.contains("(5/5)"));
    }
}
