use console::style;

const RULE_WIDTH: usize = 50;

/// Boxed section title printed before a lifecycle step.
pub fn headline(text: &str) -> String {
    let rule = format!("|{}|", "-".repeat(RULE_WIDTH));
    let body = format!("| {:<width$}|", text, width = RULE_WIDTH - 1);
    format!(
        "{}\n{}\n{}",
        style(&rule).dim(),
        style(body).bold(),
        style(&rule).dim()
    )
}
