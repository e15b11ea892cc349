use std::path::PathBuf;

use chunk_index::Result;
use chunk_index::commands::{
    check, delete_section, embed, index_profile, index_section, save_config, search, show_config,
    show_status,
};
use chunk_index::config::{Config, get_config_dir};
use chunk_index::database::models::Namespace;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chunk-index")]
#[command(about = "Durable chunk store with per-user exact vector search")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.chunk-index)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the configuration file, or show it
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Replace a user's profile chunks with the text fields of a profile JSON file
    IndexProfile {
        user_id: String,
        profile: PathBuf,
    },
    /// Index (or re-index) an edited section
    IndexSection {
        user_id: String,
        section_id: String,
        text: String,
    },
    /// Delete every chunk of a section
    DeleteSection { user_id: String, section_id: String },
    /// Search a user's chunks
    Search {
        user_id: String,
        query: String,
        /// Namespace to search: profile or edited-section
        #[arg(long, default_value = "profile")]
        namespace: Namespace,
        /// Number of results (defaults to search.default_top_k)
        #[arg(long)]
        top_k: Option<usize>,
        /// Only keep results from these section ids
        #[arg(long = "section")]
        sections: Vec<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the normalized embedding of a text
    Embed { text: String },
    /// Show stored and indexed chunk counts per shard
    Status,
    /// Compare the store with the in-memory index
    Check {
        /// Rebuild inconsistent shards
        #[arg(long)]
        repair: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| chunk_index::IndexError::Config(e.to_string()))?,
    };
    let config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                save_config(&config)?;
            }
        }
        Commands::IndexProfile { user_id, profile } => {
            index_profile(&config, &user_id, &profile).await?;
        }
        Commands::IndexSection {
            user_id,
            section_id,
            text,
        } => {
            index_section(&config, &user_id, &section_id, &text).await?;
        }
        Commands::DeleteSection {
            user_id,
            section_id,
        } => {
            delete_section(&config, &user_id, &section_id).await?;
        }
        Commands::Search {
            user_id,
            query,
            namespace,
            top_k,
            sections,
            json,
        } => {
            search(
                &config, &user_id, &query, namespace, top_k, &sections, json,
            )
            .await?;
        }
        Commands::Embed { text } => {
            embed(&config, &text).await?;
        }
        Commands::Status => {
            show_status(&config).await?;
        }
        Commands::Check { repair } => {
            check(&config, repair).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_command() {
        let cli = Cli::try_parse_from(["chunk-index", "status"]).expect("should parse");
        assert!(matches!(cli.command, Commands::Status));
        assert!(cli.config_dir.is_none());
    }

    #[test]
    fn global_config_dir() {
        let cli = Cli::try_parse_from(["chunk-index", "status", "--config-dir", "/tmp/ci"])
            .expect("should parse");
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/ci")));
    }

    #[test]
    fn search_defaults() {
        let cli = Cli::try_parse_from(["chunk-index", "search", "u1", "rust"])
            .expect("should parse");

        if let Commands::Search {
            user_id,
            query,
            namespace,
            top_k,
            sections,
            json,
        } = cli.command
        {
            assert_eq!(user_id, "u1");
            assert_eq!(query, "rust");
            assert_eq!(namespace, Namespace::Profile);
            assert_eq!(top_k, None);
            assert!(sections.is_empty());
            assert!(!json);
        } else {
            panic!("expected search command");
        }
    }

    #[test]
    fn search_with_filters() {
        let cli = Cli::try_parse_from([
            "chunk-index",
            "search",
            "u1",
            "rust",
            "--namespace",
            "edited-section",
            "--top-k",
            "3",
            "--section",
            "a",
            "--section",
            "b",
            "--json",
        ])
        .expect("should parse");

        if let Commands::Search {
            namespace,
            top_k,
            sections,
            json,
            ..
        } = cli.command
        {
            assert_eq!(namespace, Namespace::EditedSection);
            assert_eq!(top_k, Some(3));
            assert_eq!(sections, vec!["a".to_string(), "b".to_string()]);
            assert!(json);
        } else {
            panic!("expected search command");
        }
    }

    #[test]
    fn unknown_namespace_is_rejected() {
        let result =
            Cli::try_parse_from(["chunk-index", "search", "u1", "q", "--namespace", "resume"]);
        assert!(result.is_err());
    }

    #[test]
    fn section_commands() {
        let cli = Cli::try_parse_from(["chunk-index", "index-section", "u1", "s1", "Some text."])
            .expect("should parse");
        assert!(matches!(cli.command, Commands::IndexSection { .. }));

        let cli = Cli::try_parse_from(["chunk-index", "delete-section", "u1", "s1"])
            .expect("should parse");
        assert!(matches!(cli.command, Commands::DeleteSection { .. }));
    }

    #[test]
    fn check_repair_flag() {
        let cli = Cli::try_parse_from(["chunk-index", "check", "--repair"]).expect("should parse");
        assert!(matches!(cli.command, Commands::Check { repair: true }));
    }
}
