//! Human-readable rendering of dispatch envelopes.

use colored::Colorize;
use serde_json::Value;

use seoforge_mcp::dispatch::ApiResponseEnvelope;
use seoforge_mcp::tools::ToolRegistry;

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "━".repeat(RULE_WIDTH)
}

/// Render an envelope for the terminal.
pub fn render_envelope(envelope: &ApiResponseEnvelope) -> String {
    let mut out = String::new();

    if let Some(error) = &envelope.error {
        out.push_str(&format!("{} {} failed\n", "✗".red(), envelope.tool.bold()));
        out.push_str(&format!("{}\n", format!("Error [{}]: {}", error.code, error.message).red()));
        if let Some(field) = &error.field {
            out.push_str(&format!("{}\n", format!("Field: {field}").dimmed()));
        }
        return out;
    }

    out.push_str(&format!(
        "{} {} {}\n",
        "✓".green(),
        envelope.tool.bold(),
        format!("({}ms)", envelope.duration_ms).dimmed()
    ));

    let data = envelope.data.as_ref().unwrap_or(&Value::Null);
    let body = match envelope.tool.as_str() {
        "get_server_status" => render_status(data),
        "generate_content" => data.get("content").filter(|c| c.is_object()).map(render_content),
        "analyze_seo" => data.get("analysis").map(render_analysis),
        "chat" => data.get("response").map(render_chat),
        "generate_image" => data.get("image").map(render_image),
        "generate_blog" => data.get("blog").map(render_blog),
        _ => None,
    };

    out.push_str(&body.unwrap_or_else(|| pretty(data)));
    out
}

/// Render the tool table of a registry.
pub fn render_tools(registry: &ToolRegistry) -> String {
    let mut out = String::new();
    for tool in registry.list() {
        out.push_str(&format!(
            "  {:<22} {:<5} {}\n",
            tool.name.green(),
            tool.method.to_string().cyan(),
            tool.endpoint.dimmed()
        ));
        out.push_str(&format!("  {:<22} {}\n", "", tool.description));
        let required = tool.input_schema.required_fields();
        if !required.is_empty() {
            out.push_str(&format!(
                "  {:<22} {}\n",
                "",
                format!("required: {}", required.join(", ")).yellow()
            ));
        }
    }
    out
}

fn render_status(data: &Value) -> Option<String> {
    let mut out = String::from("Server is online\n");
    out.push_str(&format!("   Version: {}\n", text(data, "version")));
    out.push_str(&format!("   Status: {}\n", text(data, "status")));
    out.push_str(&format!("   Features: {}\n", list(data, "features")));
    out.push_str(&format!("   Timestamp: {}\n", text(data, "timestamp")));
    Some(out)
}

fn render_content(content: &Value) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", rule()));
    out.push_str(&format!("{}\n", format!("Title: {}", text(content, "title")).bold().yellow()));
    out.push_str(&format!("{}\n", rule()));
    out.push_str(&format!("{}\n", text(content, "body")));
    out.push_str(&format!("{}\n", rule()));
    out.push_str(&format!(
        "{}\n",
        format!(
            "Stats: {} words, {} min read",
            text(content, "word_count"),
            text(content, "reading_time")
        )
        .dimmed()
    ));
    out.push_str(&format!("{}\n", format!("Keywords: {}", list(content, "keywords")).dimmed()));
    out.push_str(&format!("{}\n", format!("Meta: {}", text(content, "meta_description")).dimmed()));
    out
}

fn render_analysis(analysis: &Value) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", rule()));
    out.push_str(&format!("{}\n", format!("SEO Score: {}/100", text(analysis, "seo_score")).bold().yellow()));
    out.push_str(&format!("{}\n", format!("Word Count: {}", text(analysis, "word_count")).bold()));
    out.push_str(&format!(
        "{}\n",
        format!("Readability: {}/100", text(analysis, "readability_score")).bold().green()
    ));

    if let Some(Value::Object(densities)) = analysis.get("keyword_analysis") {
        out.push_str(&format!("\n{}\n", "Keyword Analysis:".cyan()));
        for (keyword, density) in densities {
            match density.as_f64() {
                Some(d) => out.push_str(&format!("   {keyword}: {d:.2}%\n")),
                None => out.push_str(&format!("   {keyword}: {density}\n")),
            }
        }
    }

    if let Some(Value::Array(recs)) = analysis.get("recommendations") {
        out.push_str(&format!("\n{}\n", "Recommendations:".cyan()));
        for (i, rec) in recs.iter().enumerate() {
            out.push_str(&format!("{}\n", format!("   {}. {}", i + 1, scalar(rec)).yellow()));
        }
    }
    out.push_str(&format!("{}\n", rule()));
    out
}

fn render_chat(response: &Value) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "AI Assistant:".cyan()));
    out.push_str(&format!("{}\n", rule()));
    out.push_str(&format!("{}\n", text(response, "text")));
    out.push_str(&format!("{}\n", rule()));

    if let Some(Value::Array(suggestions)) = response.get("suggestions") {
        if !suggestions.is_empty() {
            out.push_str(&format!("\n{}\n", "Suggestions:".cyan()));
            for (i, s) in suggestions.iter().enumerate() {
                let label = s.get("text").map(scalar).unwrap_or_else(|| scalar(s));
                out.push_str(&format!("{}\n", format!("   {}. {label}", i + 1).yellow()));
            }
        }
    }
    out
}

fn render_image(image: &Value) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", rule()));
    out.push_str(&format!("{}\n", format!("URL: {}", text(image, "url")).bold().yellow()));
    for key in ["prompt", "style", "size"] {
        let label = format!("{}{}", key[..1].to_uppercase(), &key[1..]);
        out.push_str(&format!("{}\n", format!("{label}: {}", text(image, key)).dimmed()));
    }
    out.push_str(&format!("{}\n", rule()));
    out
}

fn render_blog(blog: &Value) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", rule()));
    out.push_str(&format!("{}\n", format!("Title: {}", text(blog, "title")).bold().yellow()));
    out.push_str(&format!("{}\n", rule()));
    out.push_str(&format!("{}\n", text(blog, "content")));
    out.push_str(&format!("{}\n", rule()));

    if let Some(Value::Array(images)) = blog.get("images") {
        if !images.is_empty() {
            out.push_str(&format!("\n{}\n", "Generated Images:".cyan()));
            for (i, image) in images.iter().enumerate() {
                out.push_str(&format!("{}\n", format!("   {}. {}", i + 1, text(image, "url")).yellow()));
                out.push_str(&format!("{}\n", format!("      Alt: {}", text(image, "alt")).dimmed()));
            }
        }
    }

    out.push_str(&format!(
        "{}\n",
        format!(
            "\nStats: {} words, {} min read",
            text(blog, "word_count"),
            text(blog, "reading_time")
        )
        .dimmed()
    ));
    out.push_str(&format!("{}\n", format!("Keywords: {}", list(blog, "keywords")).dimmed()));
    out
}

fn pretty(data: &Value) -> String {
    let mut s = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    s.push('\n');
    s
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
    }
}

fn text(value: &Value, key: &str) -> String {
    value.get(key).map(scalar).unwrap_or_else(|| "N/A".to_string())
}

fn list(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::Array(items)) if !items.is_empty() => {
            items.iter().map(scalar).collect::<Vec<_>>().join(", ")
        }
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seoforge_mcp::dispatch::{EnvelopeError, ErrorCode};
    use serde_json::json;

    #[test]
    fn test_render_generated_content() {
        let env = ApiResponseEnvelope::success(
            "generate_content",
            json!({"content": {
                "title": "Async Rust",
                "body": "Futures are lazy.",
                "word_count": 3,
                "reading_time": 1,
                "keywords": ["rust", "async"],
                "meta_description": "About futures"
            }}),
        );
        let out = render_envelope(&env);
        assert!(out.contains("Title: Async Rust"));
        assert!(out.contains("Futures are lazy."));
        assert!(out.contains("Keywords: rust, async"));
    }

    #[test]
    fn test_render_analysis() {
        let env = ApiResponseEnvelope::success(
            "analyze_seo",
            json!({"analysis": {
                "seo_score": 72,
                "word_count": 400,
                "readability_score": 65,
                "keyword_analysis": {"rust": 1.5},
                "recommendations": ["Add a meta description"]
            }}),
        );
        let out = render_envelope(&env);
        assert!(out.contains("SEO Score: 72/100"));
        assert!(out.contains("rust: 1.50%"));
        assert!(out.contains("1. Add a meta description"));
    }

    #[test]
    fn test_unknown_shape_falls_back_to_json() {
        let env = ApiResponseEnvelope::success("chat", json!({"reply": "hi"}));
        let out = render_envelope(&env);
        assert!(out.contains("\"reply\": \"hi\""));
    }

    #[test]
    fn test_render_failure() {
        let env = ApiResponseEnvelope::failure(
            "image",
            EnvelopeError {
                code: ErrorCode::InvalidArguments,
                message: "missing required field: 'prompt'".into(),
                field: Some("prompt".into()),
            },
        );
        let out = render_envelope(&env);
        assert!(out.contains("Error [InvalidArguments]"));
        assert!(out.contains("Field: prompt"));
    }

    #[test]
    fn test_status_missing_fields() {
        let env = ApiResponseEnvelope::success("get_server_status", json!({"status": "ok"}));
        let out = render_envelope(&env);
        assert!(out.contains("Status: ok"));
        assert!(out.contains("Version: N/A"));
        assert!(out.contains("Features: N/A"));
    }
}
