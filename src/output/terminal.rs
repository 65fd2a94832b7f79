use crate::models::ResultEnvelope;
use colored::*;

pub fn print_envelope(envelope: &ResultEnvelope, language: &str) {
    print_header(envelope, language);
    print_logs_section(&envelope.logs);
    print_output_section(&envelope.output);

    if let Some(ref error) = envelope.error {
        print_error(error);
    }
}

fn print_header(envelope: &ResultEnvelope, language: &str) {
    println!("{}", "┌─────────────────────────────────────────────────────────────┐".bright_black());

    let status = if envelope.success {
        "OK".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!("│  Language: {:<49}│", language.bold());
    println!("│  Status: {:<51}│", status);
    println!("{}", "└─────────────────────────────────────────────────────────────┘".bright_black());
    println!();
}

fn print_logs_section(logs: &[String]) {
    if logs.is_empty() {
        return;
    }

    println!("{}", "── Logs ─────────────────────────────────────────────────────".bright_black());

    for line in logs {
        print_log_line(line);
    }

    println!();
}

fn print_log_line(line: &str) {
    let styled = if line.starts_with("[ERROR]") || line.starts_with("[ASSERT FAILED]") {
        line.red()
    } else if line.starts_with("[WARN]") {
        line.yellow()
    } else if line.starts_with("[INFO]") {
        line.blue()
    } else if line.starts_with("[DEBUG]") {
        line.bright_black()
    } else if line.starts_with("[DOM]")
        || line.starts_with("[ALERT]")
        || line.starts_with("[CONFIRM]")
        || line.starts_with("[PROMPT]")
    {
        line.cyan()
    } else {
        line.normal()
    };

    println!("  {}", styled);
}

fn print_output_section(output: &str) {
    if output.is_empty() {
        return;
    }

    println!("{}", "── Output ───────────────────────────────────────────────────".bright_black());

    for line in output.lines() {
        println!("  {}", line.bright_cyan());
    }

    println!();
}

fn print_error(error: &str) {
    println!("{}", "── Error ────────────────────────────────────────────────────".bright_black());
    println!("  {} {}", "✖".red(), error.red());
    println!();
}
