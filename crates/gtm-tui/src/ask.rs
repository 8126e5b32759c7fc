//! One-shot `ask` command: print a single answer to stdout.

use anyhow::{Context, Result};
use colored::*;
use gtm_core::markdown::StyledSpan;
use gtm_core::{filter_citations, render, Agent, Pricing, RenderBlock, WebhookClient};

pub async fn ask(webhook_url: &str, question: &str, pricing: &Pricing) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("question is empty");
    }

    let client = WebhookClient::new(webhook_url);
    println!("{} {}", "Asking".bold().blue(), client.url().dimmed());

    let response = client
        .ask_question(question)
        .await
        .with_context(|| format!("could not get an answer from {}", webhook_url))?;

    println!();
    for block in render(&filter_citations(&response.answer)) {
        print_block(&block, "");
    }

    if !response.sources.is_empty() {
        println!();
        println!("{}", "Sources".bold());
        for source in &response.sources {
            match &source.url {
                Some(url) => println!("  {} {}", source.badge_label().blue(), url.dimmed()),
                None => println!("  {}", source.badge_label().blue()),
            }
        }
    }

    if let Some(cost) = &response.cost {
        println!();
        println!("{} {}", "Cost".bold(), cost.label(pricing).green());
    }

    Ok(())
}

fn print_block(block: &RenderBlock, prefix: &str) {
    match block {
        RenderBlock::SectionHeader { label, divider } => {
            if *divider {
                println!("{}{}", prefix, "─".repeat(40).dimmed());
            }
            println!("{}{}", prefix, format!(" {} ", plain(label)).bold().white().on_magenta());
        }
        RenderBlock::Heading { level, spans } => {
            let text = plain(spans);
            let heading = match level {
                1 => text.bold().underline().magenta(),
                2 => text.bold().cyan(),
                3 => text.bold().blue(),
                _ => text.bold().italic(),
            };
            println!("{}{}", prefix, heading);
        }
        RenderBlock::Paragraph { indent, spans } => {
            println!("{}{}{}", prefix, "  ".repeat(*indent), styled(spans));
        }
        RenderBlock::Bullet { depth, marker, spans } => {
            let marker = match (marker.as_str(), *depth) {
                ("", 0) => "•",
                ("", _) => "◦",
                (numbered, _) => numbered,
            };
            println!("{}{}{} {}", prefix, "  ".repeat(*depth), marker.cyan(), styled(spans));
        }
        RenderBlock::Quote { blocks } => {
            let quoted = format!("{}{} ", prefix, "│".dimmed());
            for inner in blocks {
                print_block(inner, &quoted);
            }
        }
        RenderBlock::Table { header, rows } => {
            println!("{}{}", prefix, row_text(header).bold());
            for row in rows {
                println!("{}{}", prefix, row_text(row));
            }
        }
        RenderBlock::Code { lines, .. } => {
            for line in lines {
                println!("{}  {}", prefix, line.yellow());
            }
        }
        RenderBlock::Rule => println!("{}{}", prefix, "─".repeat(40).dimmed()),
    }
}

fn plain(spans: &[StyledSpan]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

fn row_text(cells: &[Vec<StyledSpan>]) -> String {
    cells.iter().map(|c| plain(c)).collect::<Vec<_>>().join(" | ")
}

/// Apply inline emphasis with ANSI styles.
fn styled(spans: &[StyledSpan]) -> String {
    spans
        .iter()
        .map(|span| {
            let mut text = span.text.normal();
            if span.style.bold {
                text = text.bold();
            }
            if span.style.italic {
                text = text.italic();
            }
            if span.style.strikethrough {
                text = text.strikethrough();
            }
            if span.style.code {
                text = text.yellow();
            }
            if span.style.link {
                text = text.blue().underline();
            }
            text.to_string()
        })
        .collect()
}
