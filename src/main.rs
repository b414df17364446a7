//! Paperlib command line.
//!
//! A minimal view layer over the library stores: every subcommand loads the
//! library, dispatches one intent and prints the resulting state.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paperlib::config::Config;
use paperlib::errors::{ClientError, ErrorKind};
use paperlib::export::ExportFormat;
use paperlib::models::{CitationStyle, Paper, PaperSummary, Tag};
use paperlib::search::{SearchFilters, SortBy};
use paperlib::Library;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true, disable_help_subcommand = true)]
struct Args {
    /// Backend base URL (overrides PAPERLIB_API_URL)
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Search for papers and optionally save some of the results
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
        /// Earliest publication year to show
        #[arg(long)]
        year_min: Option<i32>,
        /// Latest publication year to show
        #[arg(long)]
        year_max: Option<i32>,
        /// relevance, date-desc or date-asc
        #[arg(long, default_value = "relevance")]
        sort: String,
        /// Result numbers to save (1-based)
        #[arg(long, value_delimiter = ',')]
        save: Vec<usize>,
    },

    /// List saved papers
    Saved {
        /// Only papers carrying this tag (name or id)
        #[arg(long)]
        tag: Option<String>,
    },

    /// Remove a saved paper
    Unsave { paper_id: String },

    /// Remove every saved paper
    Clear,

    /// List tags
    Tags,

    /// Create a tag
    TagCreate {
        name: String,
        /// Hex color, defaults to the next palette color
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a tag (name or id)
    TagDelete { tag: String },

    /// Assign a tag (name or id) to a saved paper
    Tag { paper_id: String, tag: String },

    /// Remove a tag (name or id) from a saved paper
    Untag { paper_id: String, tag: String },

    /// Show a paper's note
    Note { paper_id: String },

    /// Create or replace a paper's note
    NoteSet { paper_id: String, content: String },

    /// Delete a paper's note
    NoteDelete { paper_id: String },

    /// Attach a PDF to a saved paper
    UploadPdf { paper_id: String, path: PathBuf },

    /// Print the URL of a paper's stored PDF
    PdfUrl { paper_id: String },

    /// Format a citation for a saved paper
    Cite {
        paper_id: String,
        /// apa, mla or chicago
        #[arg(long, default_value = "apa")]
        style: String,
    },

    /// Show or edit the search history
    History {
        /// Remove one query
        #[arg(long, conflicts_with = "clear")]
        remove: Option<String>,
        /// Remove every query
        #[arg(long)]
        clear: bool,
    },

    /// Export the library as bibtex, csv or json
    Export {
        format: String,
        /// Output directory (overrides PAPERLIB_EXPORT_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Fetch every paper's note before exporting
        #[arg(long)]
        with_notes: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_env();
    if let Some(url) = args.api_url.clone() {
        config.api_url = url;
    }

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Backend: {}", config.api_url);
    tracing::debug!("History path: {:?}", config.history_path);

    let result = match Library::new(&config) {
        Ok(library) => run(&library, &config, args.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{}", e.user_message());
        let code = exit_code(&e);
        if code != 0 {
            std::process::exit(code);
        }
    }
}

/// Process status for a failed command. An empty search is informational.
fn exit_code(err: &ClientError) -> i32 {
    match err.kind() {
        ErrorKind::EmptyResult => 0,
        _ => 1,
    }
}

async fn run(library: &Library, config: &Config, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Search {
            query,
            year_min,
            year_max,
            sort,
            save,
        } => {
            let sort_by = SortBy::parse(&sort)
                .ok_or_else(|| ClientError::Validation(format!("Unknown sort order: {}", sort)))?;
            let defaults = SearchFilters::default();
            let filters = SearchFilters {
                year_min: year_min.unwrap_or(defaults.year_min),
                year_max: year_max.unwrap_or(defaults.year_max),
                sort_by,
            };

            let results = filters.apply(&library.search(&query).await?);
            if results.is_empty() {
                return Err(ClientError::EmptyResult(query));
            }

            library.papers().load().await?;
            for (i, paper) in results.iter().enumerate() {
                let marker = if library.papers().is_saved(&paper.id) { "*" } else { " " };
                println!("{:>2}.{} {}", i + 1, marker, summary_line(paper));
            }

            for number in save {
                let paper = number
                    .checked_sub(1)
                    .and_then(|i| results.get(i))
                    .ok_or_else(|| ClientError::Validation(format!("No result number {}", number)))?;
                library.papers().save(paper).await?;
                println!("Saved: {}", paper.title);
            }
        }

        Command::Saved { tag } => {
            library.load().await?;
            let tag_id = match tag {
                Some(t) => Some(resolve_tag(library, &t)?.id),
                None => None,
            };
            let papers = library.filter_by_tag(tag_id.as_deref());
            for paper in &papers {
                println!("{}", paper_line(paper));
            }
            println!("{} saved paper(s)", papers.len());
        }

        Command::Unsave { paper_id } => {
            library.papers().load().await?;
            library.papers().unsave(&paper_id).await?;
            println!("{} paper(s) remaining", library.papers().count());
        }

        Command::Clear => {
            library.papers().load().await?;
            library.papers().clear_all().await?;
            println!("Library cleared");
        }

        Command::Tags => {
            library.tags().load().await?;
            for tag in library.tags().list() {
                println!("{}", tag_line(&tag));
            }
        }

        Command::TagCreate { name, color } => {
            library.tags().load().await?;
            let tag = library.tags().create(&name, color.as_deref()).await?;
            println!("Created {}", tag_line(&tag));
        }

        Command::TagDelete { tag } => {
            library.load().await?;
            let tag = resolve_tag(library, &tag)?;
            library.delete_tag(&tag.id).await?;
            println!("Deleted tag {}", tag.name);
        }

        Command::Tag { paper_id, tag } => {
            library.tags().load().await?;
            let tag = resolve_tag(library, &tag)?;
            library.tag_paper(&paper_id, &tag.id).await?;
            print_paper_tags(library, &paper_id);
        }

        Command::Untag { paper_id, tag } => {
            library.tags().load().await?;
            let tag = resolve_tag(library, &tag)?;
            library.untag_paper(&paper_id, &tag.id).await?;
            print_paper_tags(library, &paper_id);
        }

        Command::Note { paper_id } => match library.notes().get(&paper_id).await? {
            Some(note) => {
                println!("{}", note.content);
                if let Some(updated) = note.updated_at {
                    println!("-- updated {}", updated);
                }
            }
            None => println!("No note for {}", paper_id),
        },

        Command::NoteSet { paper_id, content } => {
            let note = library.notes().save(&paper_id, &content).await?;
            println!("Saved note ({} characters)", note.content.chars().count());
        }

        Command::NoteDelete { paper_id } => {
            library.notes().delete(&paper_id).await?;
            println!("Deleted note for {}", paper_id);
        }

        Command::UploadPdf { paper_id, path } => {
            let response = library.upload_pdf(&paper_id, &path).await?;
            println!(
                "Uploaded {} ({})",
                response.filename.as_deref().unwrap_or("PDF"),
                library.pdf_url(&paper_id)?
            );
        }

        Command::PdfUrl { paper_id } => {
            println!("{}", library.pdf_url(&paper_id)?);
        }

        Command::Cite { paper_id, style } => {
            let style = CitationStyle::parse(&style)
                .ok_or_else(|| ClientError::Validation(format!("Unknown citation style: {}", style)))?;
            library.papers().load().await?;
            let paper = library
                .papers()
                .get(&paper_id)
                .ok_or_else(|| ClientError::NotFound(format!("Paper {} is not saved", paper_id)))?;
            let citation = library.cite(&PaperSummary::from(&paper), style).await?;
            println!("{} citation:\n{}", style.display_name(), citation);
        }

        Command::History { remove, clear } => {
            if clear {
                library.history().clear();
            } else if let Some(query) = remove {
                library.history().remove(&query);
            }
            for (i, query) in library.history().entries().iter().enumerate() {
                println!("{:>2}. {}", i + 1, query);
            }
        }

        Command::Export {
            format,
            dir,
            with_notes,
        } => {
            let format: ExportFormat = format.parse()?;
            library.papers().load().await?;
            if with_notes {
                let found = library.prefetch_notes().await?;
                tracing::info!("Fetched {} note(s) for export", found);
            }
            let dir = dir.unwrap_or_else(|| config.export_dir.clone());
            let path = library.export_to_dir(format, &dir)?;
            println!(
                "Exported {} paper(s) to {} ({})",
                library.papers().count(),
                path.display(),
                format.mime_type()
            );
        }
    }

    Ok(())
}

fn resolve_tag(library: &Library, name_or_id: &str) -> Result<Tag, ClientError> {
    library
        .tags()
        .get(name_or_id)
        .or_else(|| library.tags().find_by_name(name_or_id))
        .ok_or_else(|| ClientError::NotFound(format!("No tag named {}", name_or_id)))
}

fn print_paper_tags(library: &Library, paper_id: &str) {
    if let Some(paper) = library.papers().get(paper_id) {
        let names: Vec<String> = library
            .tags()
            .tags_for_paper(&paper)
            .into_iter()
            .map(|t| t.name)
            .collect();
        println!("{}: [{}]", paper.title, names.join(", "));
    }
}

fn format_authors(authors: &[String]) -> String {
    match authors {
        [] => "Unknown Authors".to_string(),
        [a] => a.clone(),
        [a, b] => format!("{} & {}", a, b),
        [a, b, c] => format!("{}, {}, & {}", a, b, c),
        [a, b, c, ..] => format!("{}, {}, {}, et al.", a, b, c),
    }
}

fn summary_line(paper: &PaperSummary) -> String {
    format!(
        "{} ({}) - {} [{}]",
        paper.title,
        paper.year,
        format_authors(&paper.authors),
        paper.id
    )
}

fn paper_line(paper: &Paper) -> String {
    let tags: Vec<&str> = paper.tags.iter().map(|t| t.name.as_str()).collect();
    format!(
        "{} ({}) - {} [{}]{}{}",
        paper.title,
        paper.year,
        format_authors(&paper.authors),
        paper.id,
        if tags.is_empty() {
            String::new()
        } else {
            format!(" #{}", tags.join(" #"))
        },
        if paper.has_pdf() { " (pdf)" } else { "" }
    )
}

fn tag_line(tag: &Tag) -> String {
    format!(
        "{} {} [{}]",
        tag.color.as_deref().unwrap_or("-"),
        tag.name,
        tag.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_api_url_is_a_readable_failure() {
        let args = Args::try_parse_from(["paperlib", "--api-url", "ftp://example.com", "tags"]).unwrap();
        let config = Config {
            api_url: args.api_url.unwrap(),
            ..Config::default()
        };

        let err = Library::new(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
        assert_eq!(err.user_message(), "API URL must be an http(s) URL: ftp://example.com");
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_empty_result_exits_cleanly() {
        let err = ClientError::EmptyResult("No papers found".to_string());
        assert_eq!(exit_code(&err), 0);
        assert_eq!(exit_code(&ClientError::Network("refused".to_string())), 1);
    }

    #[test]
    fn test_search_save_numbers_are_comma_separated() {
        let args = Args::try_parse_from(["paperlib", "search", "transformers", "--save", "1,3"]).unwrap();
        match args.command {
            Command::Search { query, save, .. } => {
                assert_eq!(query, "transformers");
                assert_eq!(save, vec![1, 3]);
            }
            other => panic!("Expected Search command, got {other:?}"),
        }
    }
}
