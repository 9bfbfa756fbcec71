//! Interactive menu mode.

use anyhow::Result;
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use serde_json::{json, Map, Value};

use seoforge_mcp::dispatch::{Dispatcher, ToolCallRequest};
use seoforge_mcp::upstream::HttpSender;

use super::output::render_envelope;
use super::run::call_until_interrupted;
use super::split_list;

const ACTIONS: &[&str] = &[
    "Check server status",
    "Generate content",
    "Analyze SEO",
    "Chat with AI",
    "Generate image",
    "Generate blog with images",
    "Exit",
];

/// Loop over the action menu until the user picks "Exit".
pub async fn run(dispatcher: &Dispatcher<HttpSender>) -> Result<()> {
    println!("{}", "SEO Forge interactive mode".bold().cyan());
    println!("{} {}\n", "→".green(), dispatcher.base_url().dimmed());

    loop {
        let theme = ColorfulTheme::default();
        let choice = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(ACTIONS)
            .default(0)
            .interact()?;

        let Some((tool, arguments)) = prompt_action(&theme, choice)? else {
            println!("{}", "Goodbye!".green());
            return Ok(());
        };

        let envelope = call_until_interrupted(dispatcher, ToolCallRequest::new(tool, arguments)).await;
        println!("\n{}", render_envelope(&envelope));
    }
}

fn prompt_action(theme: &ColorfulTheme, choice: usize) -> Result<Option<(&'static str, Value)>> {
    let call = match choice {
        0 => ("get_server_status", json!({})),
        1 => {
            let mut args = Map::new();
            args.insert("topic".into(), required(theme, "Content topic")?.into());
            put_list(&mut args, "keywords", optional(theme, "Keywords (comma-separated)")?);
            put_text(&mut args, "language", optional(theme, "Language")?);
            ("generate_content", Value::Object(args))
        }
        2 => {
            let mut args = Map::new();
            args.insert("content".into(), required(theme, "Content to analyze")?.into());
            put_list(&mut args, "keywords", optional(theme, "Target keywords (comma-separated)")?);
            ("analyze_seo", Value::Object(args))
        }
        3 => {
            let mut args = Map::new();
            args.insert("message".into(), required(theme, "Your message")?.into());
            put_text(&mut args, "website_url", optional(theme, "Website URL")?);
            ("chat", Value::Object(args))
        }
        4 => {
            let mut args = Map::new();
            args.insert("prompt".into(), required(theme, "Image prompt")?.into());
            put_text(&mut args, "style", optional(theme, "Style")?);
            ("generate_image", Value::Object(args))
        }
        5 => {
            let mut args = Map::new();
            args.insert("topic".into(), required(theme, "Blog topic")?.into());
            put_list(&mut args, "keywords", optional(theme, "Keywords (comma-separated)")?);
            put_text(&mut args, "image_count", optional(theme, "Number of images")?);
            ("generate_blog", Value::Object(args))
        }
        _ => return Ok(None),
    };
    Ok(Some(call))
}

fn required(theme: &ColorfulTheme, prompt: &str) -> Result<String> {
    Ok(Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .interact_text()?)
}

fn optional(theme: &ColorfulTheme, prompt: &str) -> Result<String> {
    Ok(Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?)
}

// Numeric answers such as the image count stay strings; the validator coerces them.
fn put_text(args: &mut Map<String, Value>, key: &str, value: String) {
    let value = value.trim();
    if !value.is_empty() {
        args.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn put_list(args: &mut Map<String, Value>, key: &str, value: String) {
    let items = split_list(&value);
    if !items.is_empty() {
        args.insert(key.to_string(), json!(items));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_answers_are_omitted() {
        let mut args = Map::new();
        put_text(&mut args, "language", "   ".into());
        put_list(&mut args, "keywords", " , ".into());
        assert!(args.is_empty());
    }

    #[test]
    fn test_answers_are_trimmed_and_split() {
        let mut args = Map::new();
        put_text(&mut args, "image_count", " 3 ".into());
        put_list(&mut args, "keywords", "seo, rust".into());
        assert_eq!(Value::Object(args), json!({"image_count": "3", "keywords": ["seo", "rust"]}));
    }

    #[test]
    fn test_last_action_exits() {
        assert_eq!(ACTIONS.last(), Some(&"Exit"));
    }
}
