//! CLI command definitions using clap.

pub mod interactive;
pub mod output;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use seoforge_mcp::config::ConfigOverrides;
use seoforge_mcp::tools::Catalog;

/// SEO Forge MCP proxy: AI content generation, SEO analysis and images
#[derive(Debug, Parser)]
#[command(name = "seoforge-mcp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML configuration file (also SEOFORGE_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Upstream server URL
    #[arg(short = 's', long = "server", global = true)]
    pub server: Option<String>,

    /// API key sent as Bearer token and X-API-Key
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Total attempts per call
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Tool catalog for `serve`, `call` and `tools`
    #[arg(long, global = true, value_enum)]
    pub catalog: Option<Catalog>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print the raw response envelope as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.server.clone(),
            api_key: self.api_key.clone(),
            timeout_ms: self.timeout_ms,
            max_retries: self.retries,
            catalog: self.catalog,
            log_level: self.verbose.then(|| "seoforge_mcp=debug,info".to_string()),
            log_file: self.log_file.clone(),
        }
    }
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check server status
    Status,

    /// Generate AI content
    Generate {
        /// Content topic
        #[arg(short, long)]
        topic: String,

        /// Keywords (comma-separated)
        #[arg(short, long)]
        keywords: Option<String>,

        /// Language code
        #[arg(short, long)]
        language: Option<String>,

        /// Content tone
        #[arg(long)]
        tone: Option<String>,

        /// Content length (short, medium, long)
        #[arg(long)]
        length: Option<String>,

        /// Content type
        #[arg(long = "type")]
        content_type: Option<String>,
    },

    /// Analyze content for SEO
    Analyze {
        /// Content to analyze
        #[arg(short, long)]
        content: String,

        /// Target keywords (comma-separated)
        #[arg(short, long)]
        keywords: Option<String>,

        /// Language code
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Chat with the AI assistant
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,

        /// Website URL for context
        #[arg(short, long)]
        website: Option<String>,
    },

    /// Generate an AI image
    Image {
        /// Image prompt
        #[arg(short, long)]
        prompt: String,

        /// Image style
        #[arg(long)]
        style: Option<String>,

        /// Image size, e.g. 1024x1024
        #[arg(long)]
        size: Option<String>,
    },

    /// Generate a complete blog post with images
    Blog {
        /// Blog topic
        #[arg(short, long)]
        topic: String,

        /// Keywords (comma-separated)
        #[arg(short, long)]
        keywords: Option<String>,

        /// Language code
        #[arg(short, long)]
        language: Option<String>,

        /// Number of images
        #[arg(long)]
        images: Option<u32>,
    },

    /// Call any tool of the configured catalog with JSON arguments
    Call {
        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// List the tools of the configured catalog
    Tools,

    /// Run the MCP server on stdin/stdout
    Serve,

    /// Start interactive mode
    #[command(alias = "i")]
    Interactive,
}

impl Commands {
    /// Tool name and arguments for the named `client` catalog commands.
    pub fn client_call(&self) -> Option<(&'static str, Value)> {
        let mut args = Map::new();
        let tool = match self {
            Self::Status => "get_server_status",
            Self::Generate {
                topic,
                keywords,
                language,
                tone,
                length,
                content_type,
            } => {
                put(&mut args, "topic", Some(topic.clone()));
                put(&mut args, "keywords", keywords.as_deref().map(split_list));
                put(&mut args, "language", language.clone());
                put(&mut args, "tone", tone.clone());
                put(&mut args, "length", length.clone());
                put(&mut args, "content_type", content_type.clone());
                "generate_content"
            }
            Self::Analyze {
                content,
                keywords,
                language,
            } => {
                put(&mut args, "content", Some(content.clone()));
                put(&mut args, "keywords", keywords.as_deref().map(split_list));
                put(&mut args, "language", language.clone());
                "analyze_seo"
            }
            Self::Chat { message, website } => {
                put(&mut args, "message", Some(message.clone()));
                put(&mut args, "website_url", website.clone());
                "chat"
            }
            Self::Image {
                prompt,
                style,
                size,
            } => {
                put(&mut args, "prompt", Some(prompt.clone()));
                put(&mut args, "style", style.clone());
                put(&mut args, "size", size.clone());
                "generate_image"
            }
            Self::Blog {
                topic,
                keywords,
                language,
                images,
            } => {
                put(&mut args, "topic", Some(topic.clone()));
                put(&mut args, "keywords", keywords.as_deref().map(split_list));
                put(&mut args, "language", language.clone());
                put(&mut args, "image_count", *images);
                "generate_blog"
            }
            Self::Call { .. } | Self::Tools | Self::Serve | Self::Interactive => return None,
        };
        Some((tool, Value::Object(args)))
    }
}

fn put<T: Into<Value>>(args: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        args.insert(key.to_string(), v.into());
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
