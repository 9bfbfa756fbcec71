//! Shipped tool tables, one per deployment variant.
//!
//! Tool names, schemas and endpoints are the wire-visible API surface. Any
//! change to a table must bump [`CATALOG_VERSION`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::registry::{RequestBody, ToolDefinition};
use super::schema::{FieldSpec, Schema};

/// Version of the tool catalogs below.
pub const CATALOG_VERSION: &str = "1.2.0";

const ALL_LANGUAGES: &[&str] = &["en", "th", "es", "fr", "de", "it", "pt", "ru", "ja", "ko", "zh"];
const CORE_LANGUAGES: &[&str] = &["en", "th", "es", "fr", "de"];
const CONTENT_TYPES: &[&str] = &[
    "blog_post",
    "product_description",
    "landing_page",
    "how_to_guide",
    "news_article",
];
const TONES: &[&str] = &[
    "professional",
    "casual",
    "friendly",
    "authoritative",
    "conversational",
];
const LENGTHS: &[&str] = &["short", "medium", "long"];
const IMAGE_STYLES: &[&str] = &[
    "professional",
    "artistic",
    "photorealistic",
    "minimalist",
    "commercial",
    "cinematic",
];
const FLUX_STYLES: &[&str] = &[
    "professional",
    "artistic",
    "photorealistic",
    "minimalist",
    "commercial",
    "cinematic",
    "illustration",
    "fantasy",
    "modern",
];
const FLUX_MODELS: &[&str] = &["flux-schnell", "flux-dev", "flux-pro"];

/// Multiplexed execute endpoint used by the unified deployment.
const UNIFIED_EXECUTE: &str = "/mcp/tools/execute";

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// The deployment variant whose tool table a process serves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Catalog {
    /// Standalone SEO Forge MCP server with Flux image tools.
    #[default]
    SeoForge,
    /// Unified server: every tool goes through one execute endpoint.
    Unified,
    /// Tools behind the command-line client subcommands.
    Client,
}

impl Catalog {
    pub fn name(self) -> &'static str {
        match self {
            Self::SeoForge => "seo-forge",
            Self::Unified => "unified",
            Self::Client => "client",
        }
    }

    /// The tool table for this variant, in declaration order.
    pub fn definitions(self) -> Vec<ToolDefinition> {
        match self {
            Self::SeoForge => seo_forge_tools(),
            Self::Unified => unified_tools(),
            Self::Client => client_tools(),
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Catalog {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seo-forge" | "seo_forge" | "seoforge" => Ok(Self::SeoForge),
            "unified" => Ok(Self::Unified),
            "client" => Ok(Self::Client),
            other => Err(format!(
                "unknown catalog '{other}' (expected seo-forge, unified or client)"
            )),
        }
    }
}

// ─── Shared fields ───────────────────────────────────────────────────────────

fn keywords_field(description: &'static str) -> FieldSpec {
    FieldSpec::string_array("keywords", description).default_value(json!([]))
}

fn language_field(allowed: &'static [&'static str], description: &'static str) -> FieldSpec {
    FieldSpec::enumeration("language", description, allowed).default_value(json!("en"))
}

fn dimension_field(name: &'static str, description: &'static str) -> FieldSpec {
    FieldSpec::bounded_number(name, description, 256.0, 2048.0)
}

fn seed_keywords_field() -> FieldSpec {
    FieldSpec::string_array("seed_keywords", "Initial keywords to expand from")
        .items_between(Some(1), None)
        .required()
}

fn status_tool(endpoint: &'static str) -> ToolDefinition {
    ToolDefinition::get(
        "get_server_status",
        "Get the current status and capabilities of the SEO Forge server",
        endpoint,
        Schema::empty(),
    )
}

// ─── seo-forge ───────────────────────────────────────────────────────────────

fn seo_forge_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::post(
            "generate_content",
            "Generate SEO-optimized content using AI with optional Flux image generation",
            "/universal-mcp/generate-content",
            Schema::new(vec![
                FieldSpec::string("topic", "Main topic for content generation"),
                keywords_field("Target keywords for SEO optimization"),
                FieldSpec::enumeration("content_type", "Type of content to generate", CONTENT_TYPES)
                    .default_value(json!("blog_post")),
                language_field(ALL_LANGUAGES, "Language for content generation"),
                FieldSpec::enumeration("tone", "Tone of the generated content", TONES)
                    .default_value(json!("professional")),
                FieldSpec::enumeration("length", "Length of the generated content", LENGTHS)
                    .default_value(json!("medium")),
                FieldSpec::string("industry", "Industry or niche for specialized content")
                    .default_value(json!("general")),
                FieldSpec::boolean("include_images", "Whether to generate images with content")
                    .default_value(json!(false)),
                FieldSpec::bounded_number("image_count", "Number of images to generate", 1.0, 10.0)
                    .default_value(json!(3)),
                FieldSpec::enumeration("image_style", "Style for generated images", IMAGE_STYLES)
                    .default_value(json!("professional")),
            ]),
        ),
        ToolDefinition::post(
            "generate_flux_image",
            "Generate high-quality images using state-of-the-art Flux AI models",
            "/universal-mcp/generate-flux-image",
            Schema::new(vec![
                FieldSpec::non_empty_string("prompt", "Text description of the image to generate")
                    .required(),
                FieldSpec::string("negative_prompt", "What to avoid in the generated image")
                    .default_value(json!("")),
                dimension_field("width", "Image width in pixels").default_value(json!(1024)),
                dimension_field("height", "Image height in pixels").default_value(json!(1024)),
                FieldSpec::bounded_number(
                    "guidance_scale",
                    "How closely to follow the prompt (1.0-20.0)",
                    1.0,
                    20.0,
                )
                .default_value(json!(7.5)),
                FieldSpec::bounded_number(
                    "num_inference_steps",
                    "Quality vs speed tradeoff (1-50 steps)",
                    1.0,
                    50.0,
                )
                .default_value(json!(20)),
                FieldSpec::number("seed", "Random seed for reproducible results"),
                FieldSpec::enumeration("model", "Flux model variant to use", FLUX_MODELS)
                    .default_value(json!("flux-schnell")),
                FieldSpec::enumeration("style", "Image style enhancement", FLUX_STYLES)
                    .default_value(json!("professional")),
                FieldSpec::boolean("enhance_prompt", "Whether to enhance the prompt with AI")
                    .default_value(json!(true)),
            ]),
        ),
        ToolDefinition::post(
            "generate_flux_batch",
            "Generate multiple images using Flux models in batch",
            "/universal-mcp/generate-flux-batch",
            Schema::new(vec![
                FieldSpec::string_array("prompts", "Array of prompts for batch generation")
                    .items_between(Some(1), Some(10))
                    .required(),
                FieldSpec::enumeration("model", "Flux model variant to use", FLUX_MODELS),
                FieldSpec::enumeration("style", "Image style for all images", IMAGE_STYLES),
                dimension_field("width", "Image width in pixels"),
                dimension_field("height", "Image height in pixels"),
            ]),
        ),
        ToolDefinition::post(
            "analyze_seo",
            "Analyze content for SEO optimization with actionable recommendations",
            "/universal-mcp/analyze-seo",
            Schema::new(vec![
                FieldSpec::string("content", "Content to analyze for SEO").required(),
                keywords_field("Target keywords for analysis"),
                language_field(CORE_LANGUAGES, "Language of the content"),
                FieldSpec::string("url", "URL of the content (optional)"),
            ]),
        ),
        ToolDefinition::post(
            "research_keywords",
            "Research keywords with search volume, difficulty, and competition data",
            "/universal-mcp/research-keywords",
            Schema::new(vec![
                seed_keywords_field(),
                language_field(CORE_LANGUAGES, "Language for keyword research"),
                FieldSpec::string("location", "Geographic location for localized results")
                    .default_value(json!("global")),
                FieldSpec::bounded_number("limit", "Maximum number of keywords to return", 1.0, 100.0)
                    .default_value(json!(50)),
            ]),
        ),
        status_tool("/universal-mcp/status"),
        ToolDefinition::get(
            "get_flux_models",
            "Get information about available Flux models and their capabilities",
            "/universal-mcp/flux-models",
            Schema::empty(),
        ),
    ]
}

// ─── unified ─────────────────────────────────────────────────────────────────

fn unified_tools() -> Vec<ToolDefinition> {
    let tools = vec![
        ToolDefinition::post(
            "generate_content",
            "Generate SEO-optimized content for various purposes",
            UNIFIED_EXECUTE,
            Schema::new(vec![
                FieldSpec::enumeration("type", "Kind of content", &["blog", "product", "category", "meta"])
                    .required(),
                FieldSpec::string("topic", "Main topic").required(),
                keywords_field("Target keywords"),
                FieldSpec::string("language", "Content language").default_value(json!("en")),
                FieldSpec::string("tone", "Writing tone").default_value(json!("professional")),
                FieldSpec::enumeration("length", "Content length", LENGTHS)
                    .default_value(json!("medium")),
            ]),
        ),
        ToolDefinition::post(
            "analyze_seo",
            "Perform comprehensive SEO analysis",
            UNIFIED_EXECUTE,
            Schema::new(vec![
                FieldSpec::string("url", "Page to analyze").required(),
                FieldSpec::string("content", "Page content, if already fetched"),
                keywords_field("Target keywords"),
                FieldSpec::string_array("competitors", "Competitor URLs"),
            ]),
        ),
        ToolDefinition::post(
            "generate_image",
            "Generate images using AI models",
            UNIFIED_EXECUTE,
            Schema::new(vec![
                FieldSpec::non_empty_string("prompt", "Image description").required(),
                FieldSpec::string("style", "Visual style").default_value(json!("realistic")),
                FieldSpec::enumeration("size", "Output size", &["512x512", "1024x1024", "1024x768"])
                    .default_value(json!("1024x1024")),
                FieldSpec::enumeration("model", "Image model", &["flux", "dalle", "midjourney"])
                    .default_value(json!("flux")),
            ]),
        ),
        ToolDefinition::post(
            "wordpress_sync",
            "Sync content with WordPress sites",
            UNIFIED_EXECUTE,
            Schema::new(vec![
                FieldSpec::string("site_url", "WordPress site URL").required(),
                FieldSpec::enumeration("action", "Sync action", &["create", "update", "delete"])
                    .required(),
                FieldSpec::enumeration("content_type", "WordPress object type", &["post", "page", "product"])
                    .required(),
                FieldSpec::object("content", "Content payload", Schema::empty()),
                FieldSpec::string("auth_token", "WordPress application token"),
            ]),
        ),
        ToolDefinition::post(
            "translate_thai",
            "Translate and localize content for Thai market",
            UNIFIED_EXECUTE,
            Schema::new(vec![
                FieldSpec::string("text", "Text to translate").required(),
                FieldSpec::string("source_language", "Source language").default_value(json!("en")),
                FieldSpec::string("target_language", "Target language").default_value(json!("th")),
                FieldSpec::string("context", "Domain context for the translation"),
                FieldSpec::boolean("cultural_adaptation", "Adapt idioms for the Thai market")
                    .default_value(json!(true)),
            ]),
        ),
        ToolDefinition::post(
            "research_keywords",
            "Research and analyze keywords for SEO",
            UNIFIED_EXECUTE,
            Schema::new(vec![
                seed_keywords_field(),
                FieldSpec::string("market", "Target market").default_value(json!("global")),
                FieldSpec::string("language", "Keyword language").default_value(json!("en")),
                FieldSpec::string("industry", "Industry vertical"),
                FieldSpec::enumeration("competition_level", "Desired competition", &["low", "medium", "high"])
                    .default_value(json!("medium")),
            ]),
        ),
    ];

    tools
        .into_iter()
        .map(|t| t.with_body(RequestBody::ToolEnvelope))
        .collect()
}

// ─── client ──────────────────────────────────────────────────────────────────

fn client_tools() -> Vec<ToolDefinition> {
    vec![
        status_tool("/universal-mcp/status"),
        ToolDefinition::post(
            "generate_content",
            "Generate AI content",
            "/universal-mcp/generate-content",
            Schema::new(vec![
                FieldSpec::non_empty_string("topic", "Content topic").required(),
                keywords_field("Target keywords"),
                language_field(ALL_LANGUAGES, "Content language"),
                FieldSpec::enumeration("tone", "Content tone", TONES)
                    .default_value(json!("professional")),
                FieldSpec::enumeration("length", "Content length", LENGTHS)
                    .default_value(json!("medium")),
                FieldSpec::enumeration("content_type", "Content type", CONTENT_TYPES)
                    .default_value(json!("blog_post")),
            ]),
        ),
        ToolDefinition::post(
            "analyze_seo",
            "Analyze content for SEO",
            "/universal-mcp/analyze-seo",
            Schema::new(vec![
                FieldSpec::non_empty_string("content", "Content to analyze").required(),
                keywords_field("Target keywords"),
                language_field(CORE_LANGUAGES, "Content language"),
            ]),
        ),
        ToolDefinition::post(
            "chat",
            "Chat with the AI assistant, optionally grounded on a website",
            "/universal-mcp/chatbot",
            Schema::new(vec![
                FieldSpec::non_empty_string("message", "Message to send").required(),
                FieldSpec::string("website_url", "Website URL for context"),
                FieldSpec::object_array("chat_history", "Previous messages ({sender, text})"),
            ]),
        ),
        ToolDefinition::post(
            "generate_image",
            "Generate an AI image",
            "/universal-mcp/generate-image",
            Schema::new(vec![
                FieldSpec::non_empty_string("prompt", "Image prompt").required(),
                FieldSpec::enumeration("style", "Image style", IMAGE_STYLES)
                    .default_value(json!("professional")),
                FieldSpec::string("size", "Image size as WIDTHxHEIGHT")
                    .default_value(json!("1024x1024")),
            ]),
        ),
        ToolDefinition::post(
            "generate_blog",
            "Generate a complete blog post with images",
            "/universal-mcp/generate-blog-with-images",
            Schema::new(vec![
                FieldSpec::non_empty_string("topic", "Blog topic").required(),
                keywords_field("Target keywords"),
                language_field(ALL_LANGUAGES, "Blog language"),
                FieldSpec::boolean("include_images", "Generate images for the post")
                    .default_value(json!(true)),
                FieldSpec::bounded_number("image_count", "Number of images", 1.0, 10.0)
                    .default_value(json!(2)),
            ]),
        ),
    ]
}

// ─── Tests ───────────────────────────────────────────────────────────────────
